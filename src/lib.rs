// stache — a spec-compliant Mustache template engine.
//
// Architecture:
//   source text → scanner → parser → element tree → renderer → sink
//
// Reference: the Mustache specification (https://github.com/mustache/spec).
// Comments, delimiters, interpolation, sections, inverted sections,
// partials and lambdas are implemented; inheritance is recognized and
// rejected as unsupported.

mod data;
mod error;
mod parse;
mod render;
mod template;

use template::Delimiters;

pub use data::{DataSource, Iteration, Lambda, Value};
pub use error::{Error, ParseError, RenderError};
pub use render::writer::Output;
pub use template::{Escape, Partials, Template};

/// Parsing options.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Copy the source into the template instead of borrowing it.
    pub(crate) copy_strings: bool,
    /// Initial delimiter pair (`{{`/`}}` unless overridden).
    pub(crate) delimiters: Delimiters,
}

impl ParseOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the source text into the template. The returned template no
    /// longer depends on the caller's buffer (same effect as
    /// [`Template::into_owned`]).
    pub fn with_copy_strings(mut self, copy: bool) -> Self {
        self.copy_strings = copy;
        self
    }

    /// Start parsing with a custom delimiter pair, as if the template began
    /// with `{{=open close=}}`. Both must be non-empty and whitespace-free.
    pub fn with_delimiters(mut self, open: &str, close: &str) -> Self {
        self.delimiters = Delimiters::new(open, close);
        self
    }
}

/// Parse a template with default options, borrowing the source.
///
/// # Examples
///
/// ```
/// let template = stache::parse("Hello {{name}}!").unwrap();
/// let data = serde_json::json!({"name": "world"});
/// assert_eq!(template.render(&data).unwrap(), "Hello world!");
/// ```
pub fn parse(source: &str) -> Result<Template<'_>, ParseError> {
    parse::parse_template(source, &ParseOptions::default())
}

/// Parse a template with custom options.
///
/// # Examples
///
/// ```
/// use stache::{parse_with, ParseOptions};
///
/// let options = ParseOptions::new().with_delimiters("<%", "%>");
/// let template = parse_with("Hello <%name%>!", &options).unwrap();
/// let data = serde_json::json!({"name": "X"});
/// assert_eq!(template.render(&data).unwrap(), "Hello X!");
/// ```
pub fn parse_with<'t>(source: &'t str, options: &ParseOptions) -> Result<Template<'t>, ParseError> {
    parse::parse_template(source, options)
}

/// Parse and render in one call, without retaining the template.
///
/// # Examples
///
/// ```
/// let data = serde_json::json!({"user": {"name": "Ada"}});
/// let text = stache::render_str("Hi {{user.name}}", &data).unwrap();
/// assert_eq!(text, "Hi Ada");
/// ```
pub fn render_str(source: &str, data: &dyn DataSource) -> Result<String, Error> {
    render_str_with(source, data, &Partials::new())
}

/// Parse and render in one call, resolving `{{>name}}` tags from `partials`.
pub fn render_str_with(
    source: &str,
    data: &dyn DataSource,
    partials: &Partials<'_>,
) -> Result<String, Error> {
    let template = parse(source)?;
    Ok(template.render_with_partials(data, partials)?)
}

/// Parse and render straight to an `io::Write` sink. Returns bytes written.
pub fn render_str_to_writer(
    source: &str,
    data: &dyn DataSource,
    partials: &Partials<'_>,
    writer: &mut dyn std::io::Write,
) -> Result<usize, Error> {
    let template = parse(source)?;
    Ok(template.render_to_writer_with_partials(data, partials, writer)?)
}
