// Source text → element tree.
//
// Pull parser over the scanner: each opening mark is followed by a body part
// whose terminating mark closes the tag. Standalone-line handling needs one
// part of lookahead, so an eligible tag on a clean line is held, together
// with its unflushed preceding text, until the next part shows whether the
// line ends right after the tag.

pub(crate) mod scanner;
pub(crate) mod tag;

use std::borrow::Cow;

use crate::error::ParseError;
use crate::template::{Delimiters, Element, Path, Span, Template};
use crate::ParseOptions;

use scanner::{DelimiterStyle, Event, MarkKind, Scanner};
use tag::TagKind;

/// Parse `source` into a template borrowing it.
pub(crate) fn parse_template<'t>(
    source: &'t str,
    options: &ParseOptions,
) -> Result<Template<'t>, ParseError> {
    let delimiters = options.delimiters.clone();
    if !delimiters.is_default() {
        validate_delimiters(&delimiters)?;
    }

    #[cfg(feature = "tracing")]
    tracing::trace!(len = source.len(), "parsing template");

    let mut parser = Parser {
        source,
        scanner: Scanner::new(source, delimiters.clone()),
        delimiters,
        frames: Vec::new(),
        root: Vec::new(),
        pending_text: None,
        held: None,
        line_clean: true,
        carry_start: None,
        capacity_hint: 0,
    };
    parser.run()?;

    let template = Template {
        source: Cow::Borrowed(source),
        elements: parser.root,
        capacity_hint: parser.capacity_hint,
    };
    if options.copy_strings {
        // Detach from the caller's buffer; the `'t` parameter then only
        // exists to keep one return type for both modes.
        Ok(template.into_owned())
    } else {
        Ok(template)
    }
}

/// Initial delimiters set through `ParseOptions` follow the same rules as a
/// `{{=a b=}}` change: non-empty and whitespace-free.
fn validate_delimiters(delimiters: &Delimiters) -> Result<(), ParseError> {
    let ok = |d: &str| !d.is_empty() && !d.bytes().any(|b| b.is_ascii_whitespace());
    if ok(&delimiters.open) && ok(&delimiters.close) {
        Ok(())
    } else {
        Err(ParseError::InvalidDelimiters { row: 1, col: 1 })
    }
}

/// An open `{{#...}}`/`{{^...}}` awaiting its close tag.
struct Frame {
    path: Path,
    inverted: bool,
    delimiters: Delimiters,
    inner_start: usize,
    children: Vec<Element>,
    row: u32,
    col: u32,
}

/// A classified tag held until the following part resolves whether it owns
/// its whole line.
struct Held {
    tag: TagKind,
    row: u32,
    col: u32,
    /// Byte offset of the opening mark (a close tag's `inner` end).
    mark_start: usize,
    /// Byte offset just past the closing mark (an open tag's `inner` start).
    after_end: usize,
    /// Delimiters active at the tag site.
    delimiters: Delimiters,
}

struct Parser<'s> {
    source: &'s str,
    scanner: Scanner<'s>,
    delimiters: Delimiters,
    frames: Vec<Frame>,
    root: Vec<Element>,
    /// Text preceding a held tag, not yet emitted (its end may still be
    /// trimmed away).
    pending_text: Option<Span>,
    held: Option<Held>,
    /// Whether the current line contains only whitespace so far.
    line_clean: bool,
    /// Start offset carried over a stray closing mark treated as text.
    carry_start: Option<usize>,
    capacity_hint: usize,
}

impl<'s> Parser<'s> {
    fn run(&mut self) -> Result<(), ParseError> {
        loop {
            let part = self.scanner.next_part();
            let mut tail = part.tail.clone();
            if let Some(start) = self.carry_start.take() {
                tail.start = start;
            }
            let at_eof = part.event == Event::Eof;

            if let Some(held) = self.held.take() {
                let text = &self.source[tail.clone()];
                match standalone_right(text, at_eof) {
                    Some(consumed) => {
                        // The line holds nothing but this tag: erase it,
                        // terminator included. The whitespace trimmed off
                        // the left side is a standalone partial's
                        // inherited indentation.
                        let indent = self.trim_pending_right();
                        self.flush_pending();
                        self.apply_tag(held, indent)?;
                        tail.start += consumed;
                        self.line_clean = true;
                    }
                    None => {
                        self.flush_pending();
                        self.apply_tag(held, 0..0)?;
                        self.line_clean = false;
                    }
                }
            }

            match part.event {
                Event::Eof => {
                    self.emit_text(tail);
                    break;
                }
                Event::Mark {
                    kind: MarkKind::Closing,
                    ..
                } => {
                    // A closing mark outside a tag is literal text; keep the
                    // span open so the delimiter bytes merge with the next
                    // part's tail.
                    self.carry_start = Some(tail.start);
                }
                Event::Mark {
                    kind: MarkKind::Opening,
                    style,
                    ..
                } => {
                    self.read_tag(tail, part.row, part.col, style)?;
                }
            }
        }

        if let Some(frame) = self.frames.last() {
            return Err(ParseError::UnexpectedEof {
                row: frame.row,
                col: frame.col,
            });
        }
        Ok(())
    }

    /// Consume the body part of a tag whose opening mark was just scanned.
    fn read_tag(
        &mut self,
        text_before: Span,
        row: u32,
        col: u32,
        style: DelimiterStyle,
    ) -> Result<(), ParseError> {
        let mark_start = text_before.end;
        let body = self.scanner.next_part();
        let closes = match body.event {
            Event::Mark {
                kind: MarkKind::Closing,
                ..
            } => true,
            // With an identical open/close pair (`{{=| |=}}`) every mark
            // scans as opening; inside a tag it is the terminator.
            Event::Mark {
                kind: MarkKind::Opening,
                style: DelimiterStyle::Regular,
                ..
            } => self.delimiters.open == self.delimiters.close,
            _ => false,
        };
        if !closes {
            // EOF or a second opening mark before this tag closed.
            return Err(ParseError::UnclosedTag { row, col });
        }

        let kind = tag::classify(self.source, body.tail.clone(), style, row, col)?;
        if matches!(kind, TagKind::Inheritance) {
            return Err(ParseError::UnsupportedInheritance { row, col });
        }
        if let TagKind::SetDelimiters(ref new) = kind {
            // Effective immediately: the next part is scanned with the new
            // pair, while this tag's own close mark used the old one.
            self.delimiters = new.clone();
            self.scanner.set_delimiters(new.clone());
        }

        let held = Held {
            tag: kind,
            row,
            col,
            mark_start,
            after_end: self.scanner.pos(),
            delimiters: self.delimiters.clone(),
        };

        let left_clean = fold_clean(self.line_clean, &self.source[text_before.clone()]);
        if held.tag.is_standalone_eligible() && left_clean {
            self.pending_text = Some(text_before);
            self.held = Some(held);
        } else {
            self.emit_text(text_before);
            self.apply_tag(held, 0..0)?;
            self.line_clean = false;
        }
        Ok(())
    }

    /// Emit the element (if any) for a classified tag. `indent` is the
    /// whitespace trimmed from a standalone line, empty otherwise.
    fn apply_tag(&mut self, held: Held, indent: Span) -> Result<(), ParseError> {
        match held.tag {
            TagKind::Comment | TagKind::SetDelimiters(_) => {}
            TagKind::Inheritance => unreachable!("rejected in read_tag"),
            TagKind::Interpolation { path, escape } => {
                self.current().push(Element::Interpolate {
                    path,
                    escape,
                    delimiters: held.delimiters,
                });
            }
            TagKind::SectionOpen { path, inverted } => {
                self.frames.push(Frame {
                    path,
                    inverted,
                    delimiters: held.delimiters,
                    inner_start: held.after_end,
                    children: Vec::new(),
                    row: held.row,
                    col: held.col,
                });
            }
            TagKind::SectionClose { path } => {
                let Some(frame) = self.frames.pop() else {
                    return Err(ParseError::UnexpectedCloseSection {
                        row: held.row,
                        col: held.col,
                    });
                };
                if !self.paths_equal(&frame.path, &path) {
                    return Err(ParseError::ClosingTagMismatch {
                        row: held.row,
                        col: held.col,
                    });
                }
                let element = if frame.inverted {
                    Element::Inverted {
                        path: frame.path,
                        children: frame.children,
                    }
                } else {
                    Element::Section {
                        path: frame.path,
                        children: frame.children,
                        inner: frame.inner_start..held.mark_start,
                        delimiters: frame.delimiters,
                    }
                };
                self.current().push(element);
            }
            TagKind::Partial { name } => {
                self.current().push(Element::Partial { name, indent });
            }
        }
        Ok(())
    }

    fn current(&mut self) -> &mut Vec<Element> {
        match self.frames.last_mut() {
            Some(frame) => &mut frame.children,
            None => &mut self.root,
        }
    }

    fn emit_text(&mut self, span: Span) {
        if span.is_empty() {
            return;
        }
        self.capacity_hint += span.len();
        self.current().push(Element::Text(span));
    }

    fn flush_pending(&mut self) {
        if let Some(span) = self.pending_text.take() {
            self.emit_text(span);
        }
    }

    /// Drop the pending text's trailing spaces and tabs, returning the
    /// removed span. The left-clean check already guaranteed everything
    /// after the last newline is whitespace.
    fn trim_pending_right(&mut self) -> Span {
        let Some(span) = self.pending_text.as_mut() else {
            return 0..0;
        };
        let bytes = self.source.as_bytes();
        let mut end = span.end;
        while end > span.start && matches!(bytes[end - 1], b' ' | b'\t') {
            end -= 1;
        }
        let indent = end..span.end;
        span.end = end;
        indent
    }

    fn paths_equal(&self, a: &Path, b: &Path) -> bool {
        a.segments.len() == b.segments.len()
            && a.segments
                .iter()
                .zip(&b.segments)
                .all(|(x, y)| self.source[x.clone()] == self.source[y.clone()])
    }
}

/// Whether `text` starts with optional spaces/tabs followed by a line
/// terminator (`\r?\n`, or EOF when `at_eof`). Returns the byte count to
/// consume, terminator included.
fn standalone_right(text: &str, at_eof: bool) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t') {
        i += 1;
    }
    match bytes.get(i) {
        Some(b'\n') => Some(i + 1),
        Some(b'\r') if bytes.get(i + 1) == Some(&b'\n') => Some(i + 2),
        Some(_) => None,
        None if at_eof => Some(i),
        None => None,
    }
}

/// Fold a text chunk into the only-whitespace-so-far flag for its line.
fn fold_clean(clean: bool, text: &str) -> bool {
    let is_blank = |s: &str| s.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r'));
    match text.rfind('\n') {
        Some(i) => is_blank(&text[i + 1..]),
        None => clean && is_blank(text),
    }
}
