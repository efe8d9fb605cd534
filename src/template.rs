// Template representation — the element tree consumed by the renderer.
//
// Elements do not borrow from the source text; they carry byte spans into it.
// This lets one element type serve both lifetime modes: a `Template` parsed
// from a `&str` borrows it (no copies), and `into_owned` detaches the
// template by copying the source exactly once. Spans stay valid either way.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io;
use std::ops::Range;

use crate::data::DataSource;
use crate::error::{ParseError, RenderError};
use crate::render::{self, writer::Out};

/// A byte range into a template's source text.
pub(crate) type Span = Range<usize>;

pub(crate) const DEFAULT_OPEN: &str = "{{";
pub(crate) const DEFAULT_CLOSE: &str = "}}";

/// A delimiter pair. The unescaped forms (`{{{`/`}}}`) are fixed and do not
/// change when a custom pair is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Delimiters {
    pub open: Box<str>,
    pub close: Box<str>,
}

impl Default for Delimiters {
    fn default() -> Self {
        Delimiters {
            open: DEFAULT_OPEN.into(),
            close: DEFAULT_CLOSE.into(),
        }
    }
}

impl Delimiters {
    pub fn new(open: &str, close: &str) -> Self {
        Delimiters {
            open: open.into(),
            close: close.into(),
        }
    }

    pub fn is_default(&self) -> bool {
        &*self.open == DEFAULT_OPEN && &*self.close == DEFAULT_CLOSE
    }
}

/// A dotted name, stored as one span per segment.
///
/// The empty segment list is the implicit iterator (`.`), which resolves to
/// the top of the context stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Path {
    pub segments: Vec<Span>,
}

impl Path {
    pub fn implicit() -> Self {
        Path { segments: Vec::new() }
    }

    pub fn is_implicit(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Whether interpolated output is HTML-escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    /// Replace `&`, `<`, `>`, `"`, `'` with named entities.
    Html,
    /// Write raw bytes (`{{{...}}}` or `{{&...}}`).
    None,
}

// ---------------------------------------------------------------------------
// Elements
// ---------------------------------------------------------------------------

/// One node of the parsed tree. Section children are owned arrays; the tree
/// is acyclic and owned by its `Template`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Element {
    /// Literal text, with standalone-line trimming already applied to the span.
    Text(Span),
    /// Variable output. The delimiters active at the tag site are kept so a
    /// lambda result can be re-parsed the way the caller wrote it.
    Interpolate {
        path: Path,
        escape: Escape,
        delimiters: Delimiters,
    },
    /// Conditional/iterating block. `inner` is the verbatim source between
    /// the open and close tags, handed to section lambdas.
    Section {
        path: Path,
        children: Vec<Element>,
        inner: Span,
        delimiters: Delimiters,
    },
    /// Renders its children iff the value is falsy or absent.
    Inverted { path: Path, children: Vec<Element> },
    /// Included sub-template. `indent` is the whitespace that preceded the
    /// tag on its (standalone) line, re-applied to each expanded line.
    Partial { name: Span, indent: Span },
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// A parsed template, ready to render any number of times.
///
/// Immutable after construction, so it can be shared freely across threads.
/// Parsing borrows the source text; call [`Template::into_owned`] (or parse
/// with `copy_strings`) to detach it.
#[derive(Debug, Clone)]
pub struct Template<'t> {
    pub(crate) source: Cow<'t, str>,
    pub(crate) elements: Vec<Element>,
    pub(crate) capacity_hint: usize,
}

impl<'t> Template<'t> {
    /// The source text this template was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Advisory output size: the sum of the template's static text, before
    /// any data is interpolated.
    pub fn capacity_hint(&self) -> usize {
        self.capacity_hint
    }

    /// Copy the source into the template, removing the borrow.
    pub fn into_owned(self) -> Template<'static> {
        Template {
            source: Cow::Owned(self.source.into_owned()),
            elements: self.elements,
            capacity_hint: self.capacity_hint,
        }
    }

    /// Render into a new `String`.
    pub fn render(&self, data: &dyn DataSource) -> Result<String, RenderError> {
        self.render_with_partials(data, &Partials::new())
    }

    /// Render into a new `String`, resolving `{{>name}}` tags from `partials`.
    pub fn render_with_partials(
        &self,
        data: &dyn DataSource,
        partials: &Partials<'_>,
    ) -> Result<String, RenderError> {
        let mut buf = String::new();
        let hint = self.capacity_hint + data.capacity_hint();
        // Extra 25% for HTML escapes and repeated variable use.
        buf.try_reserve(hint + hint / 4)
            .map_err(|_| RenderError::OutOfMemory)?;
        let mut out = Out::string(&mut buf);
        render::render_template(self, data, partials, &mut out)?;
        Ok(buf)
    }

    /// Render to an `io::Write` sink. Returns the number of bytes written.
    pub fn render_to_writer(
        &self,
        data: &dyn DataSource,
        writer: &mut dyn io::Write,
    ) -> Result<usize, RenderError> {
        self.render_to_writer_with_partials(data, &Partials::new(), writer)
    }

    /// Render to an `io::Write` sink with partials. Returns bytes written.
    ///
    /// Output is streamed: bytes already written stay on the sink when an
    /// error aborts the render.
    pub fn render_to_writer_with_partials(
        &self,
        data: &dyn DataSource,
        partials: &Partials<'_>,
        writer: &mut dyn io::Write,
    ) -> Result<usize, RenderError> {
        let mut out = Out::writer(writer);
        render::render_template(self, data, partials, &mut out)?;
        Ok(out.written())
    }

    /// Render into a caller-provided buffer. Returns the filled length, or
    /// [`RenderError::BufferTooSmall`] if the output does not fit.
    pub fn render_to_buffer(
        &self,
        data: &dyn DataSource,
        buffer: &mut [u8],
    ) -> Result<usize, RenderError> {
        self.render_to_buffer_with_partials(data, &Partials::new(), buffer)
    }

    /// Render into a caller-provided buffer with partials.
    pub fn render_to_buffer_with_partials(
        &self,
        data: &dyn DataSource,
        partials: &Partials<'_>,
        buffer: &mut [u8],
    ) -> Result<usize, RenderError> {
        let mut out = Out::buffer(buffer);
        render::render_template(self, data, partials, &mut out)?;
        Ok(out.written())
    }
}

// ---------------------------------------------------------------------------
// Partials
// ---------------------------------------------------------------------------

/// A name → template map consulted by `{{>name}}` tags.
///
/// Lookups that miss render as empty output by default; flip [`strict`] to
/// turn a miss into [`RenderError::PartialNotFound`].
///
/// [`strict`]: Partials::strict
#[derive(Debug, Default)]
pub struct Partials<'t> {
    map: HashMap<String, Template<'t>>,
    strict: bool,
}

impl<'t> Partials<'t> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make unresolved partials a render error instead of empty output.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Register a parsed template under `name`.
    pub fn add(&mut self, name: impl Into<String>, template: Template<'t>) {
        self.map.insert(name.into(), template);
    }

    /// Parse `source` with default options and register it under `name`.
    pub fn add_source(
        &mut self,
        name: impl Into<String>,
        source: &'t str,
    ) -> Result<(), ParseError> {
        let template = crate::parse(source)?;
        self.map.insert(name.into(), template);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Template<'t>> {
        self.map.get(name)
    }

    pub(crate) fn is_strict(&self) -> bool {
        self.strict
    }
}
