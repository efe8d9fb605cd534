// Text scanner — splits source into text parts separated by delimiter marks.
//
// The scanner knows nothing about tags: each call to `next_part` advances to
// the next opening/closing delimiter (or EOF) and reports the text in
// between. The parser pairs marks up and interprets the bytes inside them.

use memchr::{memchr2, memchr_iter};

use crate::template::{Delimiters, Span};

/// Fixed unescaped-interpolation marks. These do not change when custom
/// delimiters are installed.
const UNESCAPED_OPEN: &[u8] = b"{{{";
const UNESCAPED_CLOSE: &[u8] = b"}}}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MarkKind {
    Opening,
    Closing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DelimiterStyle {
    Regular,
    Unescaped,
}

/// What terminated a text part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    Mark {
        kind: MarkKind,
        style: DelimiterStyle,
        len: usize,
    },
    Eof,
}

/// A run of text and the mark (or EOF) that ended it. `row`/`col` are the
/// 1-based position of the mark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TextPart {
    pub tail: Span,
    pub event: Event,
    pub row: u32,
    pub col: u32,
}

pub(crate) struct Scanner<'s> {
    source: &'s str,
    pos: usize,
    row: u32,
    col: u32,
    delimiters: Delimiters,
}

impl<'s> Scanner<'s> {
    pub fn new(source: &'s str, delimiters: Delimiters) -> Self {
        Scanner {
            source,
            pos: 0,
            row: 1,
            col: 1,
            delimiters,
        }
    }

    /// Byte offset just past the last consumed mark.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Current 1-based position, used for EOF diagnostics.
    pub fn position(&self) -> (u32, u32) {
        (self.row, self.col)
    }

    /// Install a new delimiter pair, effective from the next `next_part`.
    pub fn set_delimiters(&mut self, delimiters: Delimiters) {
        self.delimiters = delimiters;
    }

    /// Advance past the next delimiter mark (or to EOF) and return the text
    /// part in between. Total: after EOF it keeps returning empty EOF parts.
    pub fn next_part(&mut self) -> TextPart {
        let start = self.pos;
        let mut at = self.pos;

        while let Some(candidate) = self.next_candidate(at) {
            if let Some((kind, style, len)) = self.match_at(candidate) {
                self.advance(start, candidate);
                let (row, col) = (self.row, self.col);
                // Delimiters are validated whitespace-free, so the mark
                // bytes never contain a newline.
                self.col += len as u32;
                self.pos = candidate + len;
                return TextPart {
                    tail: start..candidate,
                    event: Event::Mark { kind, style, len },
                    row,
                    col,
                };
            }
            at = candidate + 1;
        }

        let end = self.source.len();
        self.advance(start, end);
        self.pos = end;
        TextPart {
            tail: start..end,
            event: Event::Eof,
            row: self.row,
            col: self.col,
        }
    }

    /// First position at or after `from` whose byte could start a mark.
    fn next_candidate(&self, from: usize) -> Option<usize> {
        let hay = &self.source.as_bytes()[from..];
        let braces = memchr2(b'{', b'}', hay);
        if self.delimiters.is_default() {
            return braces.map(|i| from + i);
        }
        let open0 = self.delimiters.open.as_bytes()[0];
        let close0 = self.delimiters.close.as_bytes()[0];
        let custom = memchr2(open0, close0, hay);
        match (braces, custom) {
            (Some(a), Some(b)) => Some(from + a.min(b)),
            (Some(a), None) => Some(from + a),
            (None, Some(b)) => Some(from + b),
            (None, None) => None,
        }
    }

    /// Try each mark at `at`, unescaped forms first. The first match wins
    /// and consumes exactly its own bytes.
    fn match_at(&self, at: usize) -> Option<(MarkKind, DelimiterStyle, usize)> {
        let rest = &self.source.as_bytes()[at..];
        if rest.starts_with(UNESCAPED_OPEN) {
            return Some((MarkKind::Opening, DelimiterStyle::Unescaped, UNESCAPED_OPEN.len()));
        }
        if rest.starts_with(UNESCAPED_CLOSE) {
            return Some((MarkKind::Closing, DelimiterStyle::Unescaped, UNESCAPED_CLOSE.len()));
        }
        if rest.starts_with(self.delimiters.open.as_bytes()) {
            return Some((MarkKind::Opening, DelimiterStyle::Regular, self.delimiters.open.len()));
        }
        if rest.starts_with(self.delimiters.close.as_bytes()) {
            return Some((MarkKind::Closing, DelimiterStyle::Regular, self.delimiters.close.len()));
        }
        None
    }

    /// Fold the bytes in `from..to` into the row/col counters. Rows advance
    /// on `\n`; columns count bytes, so UTF-8 continuation bytes each count.
    fn advance(&mut self, from: usize, to: usize) {
        let chunk = &self.source.as_bytes()[from..to];
        let mut last_newline = None;
        let mut newlines = 0u32;
        for i in memchr_iter(b'\n', chunk) {
            newlines += 1;
            last_newline = Some(i);
        }
        match last_newline {
            Some(i) => {
                self.row += newlines;
                self.col = (chunk.len() - i) as u32;
            }
            None => self.col += chunk.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(source: &str) -> Vec<TextPart> {
        let mut scanner = Scanner::new(source, Delimiters::default());
        let mut parts = Vec::new();
        loop {
            let part = scanner.next_part();
            let done = part.event == Event::Eof;
            parts.push(part);
            if done {
                break;
            }
        }
        parts
    }

    #[test]
    fn plain_text_is_one_eof_part() {
        let parts = scan_all("just text");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].tail, 0..9);
        assert_eq!(parts[0].event, Event::Eof);
    }

    #[test]
    fn finds_regular_marks() {
        let parts = scan_all("Hello {{name}}!");
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].tail, 0..6);
        assert_eq!(
            parts[0].event,
            Event::Mark {
                kind: MarkKind::Opening,
                style: DelimiterStyle::Regular,
                len: 2
            }
        );
        assert_eq!(parts[1].tail, 8..12); // "name"
        assert_eq!(
            parts[1].event,
            Event::Mark {
                kind: MarkKind::Closing,
                style: DelimiterStyle::Regular,
                len: 2
            }
        );
        assert_eq!(parts[2].tail, 14..15); // "!"
    }

    #[test]
    fn unescaped_marks_take_priority() {
        let parts = scan_all("{{{raw}}}");
        assert_eq!(
            parts[0].event,
            Event::Mark {
                kind: MarkKind::Opening,
                style: DelimiterStyle::Unescaped,
                len: 3
            }
        );
        assert_eq!(
            parts[1].event,
            Event::Mark {
                kind: MarkKind::Closing,
                style: DelimiterStyle::Unescaped,
                len: 3
            }
        );
    }

    #[test]
    fn unescaped_marks_survive_custom_delimiters() {
        let mut scanner = Scanner::new("<%a%> {{{b}}}", Delimiters::new("<%", "%>"));
        let open = scanner.next_part();
        assert_eq!(
            open.event,
            Event::Mark {
                kind: MarkKind::Opening,
                style: DelimiterStyle::Regular,
                len: 2
            }
        );
        let close = scanner.next_part();
        assert_eq!(
            close.event,
            Event::Mark {
                kind: MarkKind::Closing,
                style: DelimiterStyle::Regular,
                len: 2
            }
        );
        let raw_open = scanner.next_part();
        assert_eq!(
            raw_open.event,
            Event::Mark {
                kind: MarkKind::Opening,
                style: DelimiterStyle::Unescaped,
                len: 3
            }
        );
    }

    #[test]
    fn single_braces_are_text() {
        let parts = scan_all("a { b } c");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].event, Event::Eof);
    }

    #[test]
    fn tracks_rows_and_columns() {
        let parts = scan_all("line\nmore {{x}}");
        assert_eq!(parts[0].row, 2);
        assert_eq!(parts[0].col, 6);
        // Closing mark sits right after the one-byte body.
        assert_eq!(parts[1].row, 2);
        assert_eq!(parts[1].col, 9);
    }

    #[test]
    fn delimiter_change_mid_scan() {
        let mut scanner = Scanner::new("{{a}}<%b%>", Delimiters::default());
        scanner.next_part(); // {{
        scanner.next_part(); // }}
        scanner.set_delimiters(Delimiters::new("<%", "%>"));
        let part = scanner.next_part();
        assert_eq!(
            part.event,
            Event::Mark {
                kind: MarkKind::Opening,
                style: DelimiterStyle::Regular,
                len: 2
            }
        );
        assert_eq!(part.tail, 5..5);
    }
}
