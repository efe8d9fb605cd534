// Output sinks.
//
// One abstraction serves all three render modes: a caller-provided
// `io::Write`, a fixed byte buffer, and an owned growable string. The sink
// also owns the two pieces of line state the renderer needs: a line-start
// flag and the partial-indentation prefix stack.

use std::fmt;
use std::io;
use std::mem;

use crate::error::RenderError;
use crate::template::Escape;

use super::escape::escape_html;

enum Sink<'o> {
    Writer(&'o mut dyn io::Write),
    Buffer(&'o mut [u8]),
    String(&'o mut String),
}

pub(crate) struct Out<'o> {
    sink: Sink<'o>,
    written: usize,
    line_start: bool,
    /// Concatenated indentation prefixes of the active partials.
    indent: String,
    /// Prefix lengths before each `push_indent`, for popping.
    indent_stops: Vec<usize>,
}

impl<'o> Out<'o> {
    pub fn writer(writer: &'o mut dyn io::Write) -> Self {
        Out::new(Sink::Writer(writer))
    }

    pub fn buffer(buffer: &'o mut [u8]) -> Self {
        Out::new(Sink::Buffer(buffer))
    }

    pub fn string(buffer: &'o mut String) -> Self {
        Out::new(Sink::String(buffer))
    }

    fn new(sink: Sink<'o>) -> Self {
        Out {
            sink,
            written: 0,
            line_start: true,
            indent: String::new(),
            indent_stops: Vec::new(),
        }
    }

    /// Total bytes emitted so far (also the fill level in buffer mode).
    pub fn written(&self) -> usize {
        self.written
    }

    /// Literal template text. The active indentation prefix is inserted at
    /// the start of every non-empty line; a trailing newline leaves the
    /// prefix pending for whoever writes next.
    pub fn write_text(&mut self, text: &str) -> Result<(), RenderError> {
        if text.is_empty() {
            return Ok(());
        }
        if self.indent.is_empty() {
            return self.raw(text);
        }
        let mut rest = text;
        while !rest.is_empty() {
            if self.line_start && !rest.starts_with('\n') && !rest.starts_with("\r\n") {
                self.write_indent()?;
            }
            match rest.find('\n') {
                Some(i) => {
                    self.raw(&rest[..=i])?;
                    rest = &rest[i + 1..];
                }
                None => {
                    self.raw(rest)?;
                    break;
                }
            }
        }
        Ok(())
    }

    /// Interpolated bytes. Indented once if the line is empty so far;
    /// newlines inside the value do not restart the prefix — indentation
    /// belongs to the partial's own lines, not to line breaks its data
    /// happens to contain.
    pub fn write_value(&mut self, text: &str, escape: Escape) -> Result<(), RenderError> {
        if text.is_empty() {
            return Ok(());
        }
        if self.line_start && !self.indent.is_empty() {
            self.write_indent()?;
        }
        match escape {
            Escape::Html => self.raw(&escape_html(text)),
            Escape::None => self.raw(text),
        }
    }

    pub fn push_indent(&mut self, prefix: &str) {
        self.indent_stops.push(self.indent.len());
        self.indent.push_str(prefix);
    }

    pub fn pop_indent(&mut self) {
        let stop = self.indent_stops.pop().unwrap_or(0);
        self.indent.truncate(stop);
    }

    fn write_indent(&mut self) -> Result<(), RenderError> {
        // Take/put dance so the prefix can be fed to our own writer.
        let indent = mem::take(&mut self.indent);
        let result = self.raw(&indent);
        self.indent = indent;
        result
    }

    fn raw(&mut self, text: &str) -> Result<(), RenderError> {
        if text.is_empty() {
            return Ok(());
        }
        match &mut self.sink {
            Sink::Writer(writer) => writer.write_all(text.as_bytes())?,
            Sink::Buffer(buffer) => {
                let end = self.written + text.len();
                if end > buffer.len() {
                    return Err(RenderError::BufferTooSmall);
                }
                buffer[self.written..end].copy_from_slice(text.as_bytes());
            }
            Sink::String(buffer) => {
                buffer
                    .try_reserve(text.len())
                    .map_err(|_| RenderError::OutOfMemory)?;
                buffer.push_str(text);
            }
        }
        self.written += text.len();
        self.line_start = text.ends_with('\n');
        Ok(())
    }
}

/// The sink handed to [`DataSource::interpolate`]. The escape mode of the
/// triggering tag is already wired in, so adapters just write their scalar
/// form — lambdas and custom records cannot get escaping wrong.
///
/// [`DataSource::interpolate`]: crate::DataSource::interpolate
pub struct Output<'a, 'o> {
    out: &'a mut Out<'o>,
    escape: Escape,
}

impl<'a, 'o> Output<'a, 'o> {
    pub(crate) fn new(out: &'a mut Out<'o>, escape: Escape) -> Self {
        Output { out, escape }
    }

    pub fn write_str(&mut self, text: &str) -> Result<(), RenderError> {
        self.out.write_value(text, self.escape)
    }

    pub fn write_display(&mut self, value: &dyn fmt::Display) -> Result<(), RenderError> {
        self.write_str(&value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(f: impl FnOnce(&mut Out<'_>)) -> String {
        let mut buf = String::new();
        let mut out = Out::string(&mut buf);
        f(&mut out);
        buf
    }

    #[test]
    fn counts_written_bytes() {
        let mut buf = String::new();
        let mut out = Out::string(&mut buf);
        out.write_text("hello").unwrap();
        out.write_value(" <world>", Escape::Html).unwrap();
        assert_eq!(out.written(), "hello &lt;world&gt;".len());
        assert_eq!(buf, "hello &lt;world&gt;");
    }

    #[test]
    fn buffer_mode_fails_on_overflow() {
        let mut buffer = [0u8; 4];
        let mut out = Out::buffer(&mut buffer);
        assert!(matches!(
            out.write_text("too long"),
            Err(RenderError::BufferTooSmall)
        ));
    }

    #[test]
    fn indents_each_text_line() {
        let text = collect(|out| {
            out.push_indent("  ");
            out.write_text("A\nB").unwrap();
        });
        assert_eq!(text, "  A\n  B");
    }

    #[test]
    fn empty_lines_are_not_indented() {
        let text = collect(|out| {
            out.push_indent("  ");
            out.write_text("A\n\nB").unwrap();
        });
        assert_eq!(text, "  A\n\n  B");
    }

    #[test]
    fn values_are_indented_once() {
        let text = collect(|out| {
            out.push_indent(" ");
            out.write_text("|\n").unwrap();
            out.write_value("<\n->", Escape::None).unwrap();
            out.write_text("\n|\n").unwrap();
        });
        assert_eq!(text, " |\n <\n->\n |\n");
    }

    #[test]
    fn indents_nest_and_pop() {
        let text = collect(|out| {
            out.push_indent("  ");
            out.write_text("a\n").unwrap();
            out.push_indent("> ");
            out.write_text("b\n").unwrap();
            out.pop_indent();
            out.write_text("c\n").unwrap();
            out.pop_indent();
            out.write_text("d\n").unwrap();
        });
        assert_eq!(text, "  a\n  > b\n  c\nd\n");
    }

    #[test]
    fn writer_mode_streams() {
        let mut sink = Vec::new();
        {
            let mut out = Out::writer(&mut sink);
            out.write_text("streamed").unwrap();
            assert_eq!(out.written(), 8);
        }
        assert_eq!(sink, b"streamed");
    }
}
