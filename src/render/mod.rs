// Element tree → output bytes.
//
// The renderer walks elements depth-first, resolving paths against the
// context stack and streaming everything through `writer::Out`. It never
// materializes a second copy of the output; the only intermediate strings
// are lambda expansions, which are re-parsed as templates by definition.

pub(crate) mod context;
pub(crate) mod escape;
pub(crate) mod writer;

use crate::data::{DataSource, Iteration};
use crate::error::RenderError;
use crate::parse;
use crate::template::{Delimiters, Element, Escape, Partials, Path, Span, Template};
use crate::ParseOptions;

use context::{ContextStack, Resolution};
use writer::{Out, Output};

/// Bound on template nesting (partials within partials, lambdas whose
/// output contains more tags) so pathological inputs fail instead of
/// overflowing the call stack.
const MAX_DEPTH: usize = 64;

pub(crate) fn render_template(
    template: &Template<'_>,
    data: &dyn DataSource,
    partials: &Partials<'_>,
    out: &mut Out<'_>,
) -> Result<(), RenderError> {
    #[cfg(feature = "tracing")]
    tracing::trace!(elements = template.elements.len(), "rendering template");

    let mut renderer = Renderer {
        partials,
        stack: ContextStack::new(data),
        depth: 0,
    };
    renderer.render_elements(template.source(), &template.elements, out)
}

struct Renderer<'p, 'd> {
    partials: &'p Partials<'p>,
    stack: ContextStack<'d>,
    depth: usize,
}

impl<'p, 'd> Renderer<'p, 'd> {
    fn render_elements(
        &mut self,
        source: &str,
        elements: &[Element],
        out: &mut Out<'_>,
    ) -> Result<(), RenderError> {
        for element in elements {
            match element {
                Element::Text(span) => out.write_text(&source[span.clone()])?,
                Element::Interpolate {
                    path,
                    escape,
                    delimiters,
                } => self.interpolate(source, path, *escape, delimiters, out)?,
                Element::Section {
                    path,
                    children,
                    inner,
                    delimiters,
                } => self.section(source, path, children, inner, delimiters, out)?,
                Element::Inverted { path, children } => {
                    if self.resolves_falsy(source, path) {
                        self.render_elements(source, children, out)?;
                    }
                }
                Element::Partial { name, indent } => self.partial(source, name, indent, out)?,
            }
        }
        Ok(())
    }

    /// `{{name}}` / `{{{name}}}`. Missing names render as nothing; lambdas
    /// are called with empty inner text, their output re-rendered in the
    /// tag's delimiters, and the result escaped as the tag demands.
    fn interpolate(
        &mut self,
        source: &str,
        path: &Path,
        escape: Escape,
        delimiters: &Delimiters,
        out: &mut Out<'_>,
    ) -> Result<(), RenderError> {
        match self.stack.resolve(source, path) {
            Resolution::Field(value) => {
                let mut output = Output::new(out, escape);
                value.interpolate(&mut output)
            }
            Resolution::Lambda(lambda) => {
                let expanded = lambda.expand("").map_err(RenderError::Interpolation)?;
                let rendered = self.render_fragment(&expanded, delimiters)?;
                out.write_value(&rendered, escape)
            }
            Resolution::NotFound | Resolution::ChainBroken => Ok(()),
        }
    }

    /// `{{#name}}...{{/name}}`.
    fn section(
        &mut self,
        source: &str,
        path: &Path,
        children: &[Element],
        inner: &Span,
        delimiters: &Delimiters,
        out: &mut Out<'_>,
    ) -> Result<(), RenderError> {
        match self.stack.resolve(source, path) {
            Resolution::Lambda(lambda) => {
                // The lambda sees the verbatim inner source; its output is
                // a template in the delimiters that were active when this
                // section opened.
                let expanded = lambda
                    .expand(&source[inner.clone()])
                    .map_err(RenderError::Interpolation)?;
                let rendered = self.render_fragment(&expanded, delimiters)?;
                out.write_value(&rendered, Escape::None)
            }
            Resolution::Field(value) => {
                if !value.is_truthy() {
                    return Ok(());
                }
                match value.iterate() {
                    Iteration::Empty => Ok(()),
                    Iteration::Once => self.render_elements(source, children, out),
                    Iteration::Single(item) => self.render_scope(source, children, item, out),
                    Iteration::List(items) => {
                        for item in items {
                            self.render_scope(source, children, item, out)?;
                        }
                        Ok(())
                    }
                }
            }
            Resolution::NotFound | Resolution::ChainBroken => Ok(()),
        }
    }

    fn render_scope(
        &mut self,
        source: &str,
        children: &[Element],
        item: &'d dyn DataSource,
        out: &mut Out<'_>,
    ) -> Result<(), RenderError> {
        self.stack.push(item);
        let result = self.render_elements(source, children, out);
        self.stack.pop();
        result
    }

    fn resolves_falsy(&self, source: &str, path: &Path) -> bool {
        match self.stack.resolve(source, path) {
            Resolution::Field(value) => !value.is_truthy(),
            Resolution::Lambda(_) => false,
            Resolution::NotFound | Resolution::ChainBroken => true,
        }
    }

    /// `{{>name}}`. The partial renders against the current stack with its
    /// call-site indentation installed; it carries its own delimiter state,
    /// starting from the defaults it was parsed with.
    fn partial(
        &mut self,
        source: &str,
        name: &Span,
        indent: &Span,
        out: &mut Out<'_>,
    ) -> Result<(), RenderError> {
        let name = &source[name.clone()];
        let Some(template) = self.partials.get(name) else {
            if self.partials.is_strict() {
                return Err(RenderError::PartialNotFound(name.to_string()));
            }
            return Ok(());
        };
        if self.depth >= MAX_DEPTH {
            return Err(RenderError::DepthLimitExceeded);
        }

        let indent = &source[indent.clone()];
        if !indent.is_empty() {
            out.push_indent(indent);
        }
        self.depth += 1;
        let result = self.render_elements(template.source(), &template.elements, out);
        self.depth -= 1;
        if !indent.is_empty() {
            out.pop_indent();
        }
        result
    }

    /// Parse a lambda's output with the caller's delimiters and render it
    /// against the current stack into a fresh string.
    fn render_fragment(
        &mut self,
        fragment: &str,
        delimiters: &Delimiters,
    ) -> Result<String, RenderError> {
        if self.depth >= MAX_DEPTH {
            return Err(RenderError::DepthLimitExceeded);
        }
        let options = ParseOptions {
            copy_strings: false,
            delimiters: delimiters.clone(),
        };
        let template = parse::parse_template(fragment, &options).map_err(RenderError::Lambda)?;

        let mut buf = String::new();
        let mut out = Out::string(&mut buf);
        self.depth += 1;
        let result = self.render_elements(template.source(), &template.elements, &mut out);
        self.depth -= 1;
        result?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;

    fn render(source: &str, data: &dyn DataSource) -> String {
        crate::parse(source).unwrap().render(data).unwrap()
    }

    fn map(entries: &[(&str, Value)]) -> Value {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn missing_names_render_empty() {
        assert_eq!(render("a{{ghost}}b", &map(&[])), "ab");
        assert_eq!(render("a{{g.h.i}}b", &map(&[])), "ab");
    }

    #[test]
    fn lambda_interpolation_is_rendered_then_escaped() {
        let data = map(&[
            ("planet", Value::from("world")),
            ("greet", Value::lambda(|_| String::from("<{{planet}}>"))),
        ]);
        assert_eq!(render("{{greet}}", &data), "&lt;world&gt;");
        assert_eq!(render("{{{greet}}}", &data), "<world>");
    }

    #[test]
    fn section_lambda_receives_verbatim_inner_source() {
        let data = map(&[(
            "wrap",
            Value::lambda(|inner| format!("[{inner}]")),
        )]);
        // The inner tags reach the lambda untouched, then the wrapped
        // result is rendered: {{y}} is absent and disappears.
        assert_eq!(render("{{#wrap}}x{{y}}z{{/wrap}}", &data), "[xz]");
    }

    #[test]
    fn failing_lambda_surfaces_as_interpolation_error() {
        let data = map(&[(
            "bad",
            Value::fallible_lambda(|_| Err(String::from("nope"))),
        )]);
        let err = crate::parse("{{bad}}").unwrap().render(&data).unwrap_err();
        assert!(matches!(err, RenderError::Interpolation(_)));
    }

    #[test]
    fn runaway_lambda_hits_the_depth_limit() {
        let data = map(&[(
            "loop",
            Value::lambda(|_| String::from("{{loop}}")),
        )]);
        let err = crate::parse("{{loop}}").unwrap().render(&data).unwrap_err();
        assert!(matches!(err, RenderError::DepthLimitExceeded));
    }

    #[test]
    fn strict_partials_error_on_miss() {
        let tpl = crate::parse("{{>ghost}}").unwrap();
        let strict = Partials::new().strict(true);
        let err = tpl.render_with_partials(&map(&[]), &strict).unwrap_err();
        assert!(matches!(err, RenderError::PartialNotFound(name) if name == "ghost"));

        // Default mode: a miss is empty output.
        assert_eq!(tpl.render(&map(&[])).unwrap(), "");
    }

    #[test]
    fn self_referential_partials_are_bounded() {
        let mut partials = Partials::new();
        partials.add_source("p", "{{>p}}").unwrap();
        let tpl = crate::parse("{{>p}}").unwrap();
        let err = tpl.render_with_partials(&map(&[]), &partials).unwrap_err();
        assert!(matches!(err, RenderError::DepthLimitExceeded));
    }
}
