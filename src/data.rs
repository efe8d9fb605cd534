// Data adapters — the polymorphic bridge between the renderer and host data.
//
// Everything a template can render against implements `DataSource`: the
// crate's own `Value` tree, `serde_json::Value`, plain scalars and
// collections, and user-defined records. The renderer only ever talks to the
// capability set, never to concrete types.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::RenderError;
use crate::render::writer::Output;

/// How `{{#section}}` iterates a value.
pub enum Iteration<'a> {
    /// Falsy: zero iterations.
    Empty,
    /// Boolean true: render the block once without pushing a scope.
    Once,
    /// Scalar or map: a one-element sequence wrapping the value itself.
    Single(&'a dyn DataSource),
    /// List: one iteration per item, in the adapter's order.
    List(Box<dyn Iterator<Item = &'a dyn DataSource> + 'a>),
}

/// The capability set every render context provides.
///
/// Implement this on your own types to render static records without an
/// intermediate [`Value`] tree:
///
/// ```
/// use stache::{DataSource, Iteration, Output, RenderError};
///
/// struct Page {
///     title: String,
///     draft: bool,
/// }
///
/// impl DataSource for Page {
///     fn get(&self, segment: &str) -> Option<&dyn DataSource> {
///         match segment {
///             "title" => Some(&self.title),
///             "draft" => Some(&self.draft),
///             _ => None,
///         }
///     }
///
///     fn is_truthy(&self) -> bool {
///         true
///     }
///
///     fn interpolate(&self, _out: &mut Output<'_, '_>) -> Result<(), RenderError> {
///         Ok(())
///     }
///
///     fn iterate(&self) -> Iteration<'_> {
///         Iteration::Single(self)
///     }
/// }
///
/// let page = Page { title: "Home".into(), draft: false };
/// let rendered = stache::render_str("<h1>{{title}}</h1>", &page).unwrap();
/// assert_eq!(rendered, "<h1>Home</h1>");
/// ```
pub trait DataSource {
    /// Child lookup for one path segment. Scalars return `None` for every
    /// name; maps return `Some` even when the stored value is null, which
    /// stops parent traversal.
    fn get(&self, _segment: &str) -> Option<&dyn DataSource> {
        None
    }

    /// Section truthiness. Mustache rules: numeric zero and empty strings
    /// are truthy; `false`, null and empty lists are not.
    fn is_truthy(&self) -> bool;

    /// Write the scalar form of this value. Escaping is already wired into
    /// `out` according to the tag being rendered.
    fn interpolate(&self, out: &mut Output<'_, '_>) -> Result<(), RenderError>;

    /// Iteration behavior inside `{{#section}}`. Only consulted after
    /// [`is_truthy`] returned `true`.
    ///
    /// [`is_truthy`]: DataSource::is_truthy
    fn iterate(&self) -> Iteration<'_>;

    fn as_lambda(&self) -> Option<&Lambda> {
        None
    }

    /// Advisory byte count used to pre-size alloc-mode output buffers.
    fn capacity_hint(&self) -> usize {
        0
    }
}

// ---------------------------------------------------------------------------
// Lambdas
// ---------------------------------------------------------------------------

type LambdaFn = dyn Fn(&str) -> Result<String, String> + Send + Sync;

/// A callable value. Receives the section's verbatim inner source (or `""`
/// for interpolations); its output is rendered again as a template.
#[derive(Clone)]
pub struct Lambda {
    f: Arc<LambdaFn>,
}

impl Lambda {
    pub fn new(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Lambda {
            f: Arc::new(move |inner| Ok(f(inner))),
        }
    }

    /// A lambda that may fail; the error surfaces as
    /// [`RenderError::Interpolation`].
    pub fn fallible(f: impl Fn(&str) -> Result<String, String> + Send + Sync + 'static) -> Self {
        Lambda { f: Arc::new(f) }
    }

    pub(crate) fn expand(&self, inner: &str) -> Result<String, String> {
        (self.f)(inner)
    }
}

impl fmt::Debug for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Lambda(..)")
    }
}

// ---------------------------------------------------------------------------
// Value — the built-in dynamic tree
// ---------------------------------------------------------------------------

/// A JSON-like union of the context shapes Mustache knows about, plus
/// lambdas (which JSON cannot carry).
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    Lambda(Lambda),
}

impl Value {
    pub fn lambda(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Value {
        Value::Lambda(Lambda::new(f))
    }

    pub fn fallible_lambda(
        f: impl Fn(&str) -> Result<String, String> + Send + Sync + 'static,
    ) -> Value {
        Value::Lambda(Lambda::fallible(f))
    }
}

impl DataSource for Value {
    fn get(&self, segment: &str) -> Option<&dyn DataSource> {
        match self {
            Value::Map(map) => map.get(segment).map(|v| v as &dyn DataSource),
            _ => None,
        }
    }

    fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::List(items) => !items.is_empty(),
            Value::Number(_) | Value::String(_) | Value::Map(_) | Value::Lambda(_) => true,
        }
    }

    fn interpolate(&self, out: &mut Output<'_, '_>) -> Result<(), RenderError> {
        match self {
            Value::Null | Value::List(_) | Value::Map(_) | Value::Lambda(_) => Ok(()),
            Value::Bool(b) => out.write_display(b),
            Value::Number(n) => out.write_display(n),
            Value::String(s) => out.write_str(s),
        }
    }

    fn iterate(&self) -> Iteration<'_> {
        match self {
            Value::Null | Value::Bool(false) => Iteration::Empty,
            Value::Bool(true) => Iteration::Once,
            Value::List(items) => {
                Iteration::List(Box::new(items.iter().map(|v| v as &dyn DataSource)))
            }
            _ => Iteration::Single(self),
        }
    }

    fn as_lambda(&self) -> Option<&Lambda> {
        match self {
            Value::Lambda(lambda) => Some(lambda),
            _ => None,
        }
    }

    fn capacity_hint(&self) -> usize {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 5,
            Value::Number(_) => 8,
            Value::String(s) => s.len(),
            Value::List(items) => items.iter().map(Value::capacity_hint).sum(),
            Value::Map(map) => map.values().map(Value::capacity_hint).sum(),
            Value::Lambda(_) => 16,
        }
    }
}

// --- Conversions into Value ---

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::String(s)
    }
}

macro_rules! value_from_number {
    ($($t:ty),*) => {$(
        impl From<$t> for Value {
            fn from(n: $t) -> Value {
                Value::Number(n as f64)
            }
        }
    )*};
}

value_from_number!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize, f32, f64);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Value {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(option: Option<T>) -> Value {
        option.map_or(Value::Null, Into::into)
    }
}

impl<K: Into<String>, T: Into<Value>> FromIterator<(K, T)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Value {
        Value::Map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// serde_json::Value as a context, without conversion
// ---------------------------------------------------------------------------

impl DataSource for serde_json::Value {
    fn get(&self, segment: &str) -> Option<&dyn DataSource> {
        self.as_object()
            .and_then(|map| map.get(segment))
            .map(|v| v as &dyn DataSource)
    }

    fn is_truthy(&self) -> bool {
        match self {
            serde_json::Value::Null => false,
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::Array(items) => !items.is_empty(),
            _ => true,
        }
    }

    fn interpolate(&self, out: &mut Output<'_, '_>) -> Result<(), RenderError> {
        match self {
            serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                Ok(())
            }
            serde_json::Value::Bool(b) => out.write_display(b),
            // serde_json preserves the integer/float distinction; let its
            // Display produce the exact digits.
            serde_json::Value::Number(n) => out.write_display(n),
            serde_json::Value::String(s) => out.write_str(s),
        }
    }

    fn iterate(&self) -> Iteration<'_> {
        match self {
            serde_json::Value::Null | serde_json::Value::Bool(false) => Iteration::Empty,
            serde_json::Value::Bool(true) => Iteration::Once,
            serde_json::Value::Array(items) => {
                Iteration::List(Box::new(items.iter().map(|v| v as &dyn DataSource)))
            }
            _ => Iteration::Single(self),
        }
    }

    fn capacity_hint(&self) -> usize {
        match self {
            serde_json::Value::String(s) => s.len(),
            serde_json::Value::Array(items) => {
                items.iter().map(DataSource::capacity_hint).sum()
            }
            serde_json::Value::Object(map) => {
                map.values().map(DataSource::capacity_hint).sum()
            }
            _ => 8,
        }
    }
}

// ---------------------------------------------------------------------------
// Scalars and collections
// ---------------------------------------------------------------------------

impl<T: DataSource + ?Sized> DataSource for &T {
    fn get(&self, segment: &str) -> Option<&dyn DataSource> {
        (**self).get(segment)
    }

    fn is_truthy(&self) -> bool {
        (**self).is_truthy()
    }

    fn interpolate(&self, out: &mut Output<'_, '_>) -> Result<(), RenderError> {
        (**self).interpolate(out)
    }

    fn iterate(&self) -> Iteration<'_> {
        (**self).iterate()
    }

    fn as_lambda(&self) -> Option<&Lambda> {
        (**self).as_lambda()
    }

    fn capacity_hint(&self) -> usize {
        (**self).capacity_hint()
    }
}

impl DataSource for str {
    fn is_truthy(&self) -> bool {
        true
    }

    fn interpolate(&self, out: &mut Output<'_, '_>) -> Result<(), RenderError> {
        out.write_str(self)
    }

    fn iterate(&self) -> Iteration<'_> {
        Iteration::Single(self)
    }

    fn capacity_hint(&self) -> usize {
        self.len()
    }
}

impl DataSource for String {
    fn is_truthy(&self) -> bool {
        true
    }

    fn interpolate(&self, out: &mut Output<'_, '_>) -> Result<(), RenderError> {
        out.write_str(self)
    }

    fn iterate(&self) -> Iteration<'_> {
        Iteration::Single(self)
    }

    fn capacity_hint(&self) -> usize {
        self.len()
    }
}

impl DataSource for bool {
    fn is_truthy(&self) -> bool {
        *self
    }

    fn interpolate(&self, out: &mut Output<'_, '_>) -> Result<(), RenderError> {
        out.write_display(self)
    }

    fn iterate(&self) -> Iteration<'_> {
        if *self {
            Iteration::Once
        } else {
            Iteration::Empty
        }
    }
}

macro_rules! data_source_for_number {
    ($($t:ty),*) => {$(
        impl DataSource for $t {
            fn is_truthy(&self) -> bool {
                true
            }

            fn interpolate(&self, out: &mut Output<'_, '_>) -> Result<(), RenderError> {
                out.write_display(self)
            }

            fn iterate(&self) -> Iteration<'_> {
                Iteration::Single(self)
            }

            fn capacity_hint(&self) -> usize {
                8
            }
        }
    )*};
}

data_source_for_number!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize, f32, f64);

impl<T: DataSource> DataSource for Vec<T> {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }

    fn interpolate(&self, _out: &mut Output<'_, '_>) -> Result<(), RenderError> {
        Ok(())
    }

    fn iterate(&self) -> Iteration<'_> {
        Iteration::List(Box::new(self.iter().map(|v| v as &dyn DataSource)))
    }

    fn capacity_hint(&self) -> usize {
        self.iter().map(DataSource::capacity_hint).sum()
    }
}

impl<T: DataSource> DataSource for Option<T> {
    fn get(&self, segment: &str) -> Option<&dyn DataSource> {
        self.as_ref().and_then(|v| v.get(segment))
    }

    fn is_truthy(&self) -> bool {
        self.as_ref().is_some_and(DataSource::is_truthy)
    }

    fn interpolate(&self, out: &mut Output<'_, '_>) -> Result<(), RenderError> {
        match self {
            Some(v) => v.interpolate(out),
            None => Ok(()),
        }
    }

    fn iterate(&self) -> Iteration<'_> {
        match self {
            Some(v) => v.iterate(),
            None => Iteration::Empty,
        }
    }

    fn as_lambda(&self) -> Option<&Lambda> {
        self.as_ref().and_then(DataSource::as_lambda)
    }

    fn capacity_hint(&self) -> usize {
        self.as_ref().map_or(0, DataSource::capacity_hint)
    }
}

impl<T: DataSource> DataSource for HashMap<String, T> {
    fn get(&self, segment: &str) -> Option<&dyn DataSource> {
        HashMap::get(self, segment).map(|v| v as &dyn DataSource)
    }

    fn is_truthy(&self) -> bool {
        true
    }

    fn interpolate(&self, _out: &mut Output<'_, '_>) -> Result<(), RenderError> {
        Ok(())
    }

    fn iterate(&self) -> Iteration<'_> {
        Iteration::Single(self)
    }

    fn capacity_hint(&self) -> usize {
        self.values().map(DataSource::capacity_hint).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_falsiness_follows_mustache_rules() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        // Zero and the empty string are truthy.
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::String(String::new()).is_truthy());
        assert!(Value::from(vec![1]).is_truthy());
    }

    #[test]
    fn map_lookup_sees_explicit_nulls() {
        let value: Value = [("gone", Value::Null)].into_iter().collect();
        assert!(value.get("gone").is_some());
        assert!(value.get("missing").is_none());
    }

    #[test]
    fn json_numbers_keep_their_digits() {
        let json: serde_json::Value = serde_json::json!({"int": 85, "float": 1.21});
        let int = json.get("int").unwrap();
        let float = json.get("float").unwrap();
        let mut buf = String::new();
        {
            let mut out = crate::render::writer::Out::string(&mut buf);
            let mut output = Output::new(&mut out, crate::Escape::None);
            int.interpolate(&mut output).unwrap();
            output.write_str(" ").unwrap();
            float.interpolate(&mut output).unwrap();
        }
        assert_eq!(buf, "85 1.21");
    }

    #[test]
    fn conversions_build_trees() {
        let value: Value = [
            ("name".to_string(), Value::from("a")),
            ("tags".to_string(), Value::from(vec!["x", "y"])),
            ("count".to_string(), Value::from(3)),
        ]
        .into_iter()
        .collect();
        assert!(value.get("tags").is_some());
        assert_eq!(value.capacity_hint(), 1 + 2 + 8);
    }
}
