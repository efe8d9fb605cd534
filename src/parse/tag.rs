// Tag classifier — interprets the bytes between an opening and closing mark.
//
// The first non-space character of a tag body selects its kind: `!` comment,
// `#` section, `^` inverted section, `/` close, `>` partial, `&` unescaped,
// `=` delimiter change, `<`/`$` inheritance (recognized, unsupported). A tag
// scanned with the unescaped marks is always an unescaped interpolation and
// gets no sigil handling.

use crate::error::ParseError;
use crate::template::{Delimiters, Escape, Path, Span};

use super::scanner::DelimiterStyle;

/// A classified tag, carrying spans into the template source.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TagKind {
    Comment,
    SetDelimiters(Delimiters),
    Interpolation { path: Path, escape: Escape },
    SectionOpen { path: Path, inverted: bool },
    SectionClose { path: Path },
    Partial { name: Span },
    Inheritance,
}

impl TagKind {
    /// Interpolations are the only tags that never disappear with their
    /// line; everything else is standalone-eligible.
    pub fn is_standalone_eligible(&self) -> bool {
        !matches!(self, TagKind::Interpolation { .. })
    }
}

/// Classify the tag body at `body` (the raw bytes between the marks).
/// `row`/`col` locate the opening mark for diagnostics.
pub(crate) fn classify(
    source: &str,
    body: Span,
    style: DelimiterStyle,
    row: u32,
    col: u32,
) -> Result<TagKind, ParseError> {
    let trimmed = trim_ascii(source, body);

    if style == DelimiterStyle::Unescaped {
        let path = parse_path(source, trimmed, row, col)?;
        return Ok(TagKind::Interpolation {
            path,
            escape: Escape::None,
        });
    }

    if trimmed.is_empty() {
        return Err(ParseError::InvalidIdentifier { row, col });
    }

    let sigil = source.as_bytes()[trimmed.start];
    let rest = trim_ascii(source, trimmed.start + 1..trimmed.end);
    match sigil {
        b'!' => Ok(TagKind::Comment),
        b'#' => Ok(TagKind::SectionOpen {
            path: parse_path(source, rest, row, col)?,
            inverted: false,
        }),
        b'^' => Ok(TagKind::SectionOpen {
            path: parse_path(source, rest, row, col)?,
            inverted: true,
        }),
        b'/' => Ok(TagKind::SectionClose {
            path: parse_path(source, rest, row, col)?,
        }),
        b'>' => {
            if rest.is_empty() {
                return Err(ParseError::InvalidIdentifier { row, col });
            }
            Ok(TagKind::Partial { name: rest })
        }
        b'<' | b'$' => Ok(TagKind::Inheritance),
        b'&' => Ok(TagKind::Interpolation {
            path: parse_path(source, rest, row, col)?,
            escape: Escape::None,
        }),
        b'=' => parse_delimiters(source, trimmed, row, col),
        _ => Ok(TagKind::Interpolation {
            path: parse_path(source, trimmed, row, col)?,
            escape: Escape::Html,
        }),
    }
}

/// Parse `=open close=` (the leading `=` is `trimmed`'s first byte).
fn parse_delimiters(
    source: &str,
    trimmed: Span,
    row: u32,
    col: u32,
) -> Result<TagKind, ParseError> {
    let bytes = source.as_bytes();
    // Both `=` markers must be present and distinct.
    if trimmed.len() < 2 || bytes[trimmed.end - 1] != b'=' {
        return Err(ParseError::InvalidDelimiters { row, col });
    }
    let inner = &source[trimmed.start + 1..trimmed.end - 1];
    let mut tokens = inner.split_ascii_whitespace();
    let (Some(open), Some(close), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(ParseError::InvalidDelimiters { row, col });
    };
    if open.contains('=') || close.contains('=') {
        return Err(ParseError::InvalidDelimiters { row, col });
    }
    Ok(TagKind::SetDelimiters(Delimiters::new(open, close)))
}

/// Split a trimmed tag body on `.` into a path. A bare `.` is the implicit
/// iterator; an empty body or empty segment is invalid.
fn parse_path(source: &str, span: Span, row: u32, col: u32) -> Result<Path, ParseError> {
    let text = &source[span.clone()];
    if text.is_empty() {
        return Err(ParseError::InvalidIdentifier { row, col });
    }
    if text == "." {
        return Ok(Path::implicit());
    }

    let mut segments = Vec::new();
    let mut cursor = span.start;
    for part in text.split('.') {
        let part_span = cursor..cursor + part.len();
        cursor = part_span.end + 1; // skip the dot
        let segment = trim_ascii(source, part_span);
        if segment.is_empty() {
            return Err(ParseError::InvalidIdentifier { row, col });
        }
        segments.push(segment);
    }
    Ok(Path { segments })
}

/// Shrink a span past ASCII whitespace on both ends.
pub(crate) fn trim_ascii(source: &str, mut span: Span) -> Span {
    let bytes = source.as_bytes();
    while span.start < span.end && bytes[span.start].is_ascii_whitespace() {
        span.start += 1;
    }
    while span.end > span.start && bytes[span.end - 1].is_ascii_whitespace() {
        span.end -= 1;
    }
    span
}
