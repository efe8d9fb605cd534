uniffi::setup_scaffolding!();

use std::collections::HashMap;

/// Errors surfaced across the FFI boundary.
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum StacheError {
    #[error("data is not valid JSON: {message}")]
    InvalidData { message: String },
    #[error("parse error at {row}:{col}: {message}")]
    Parse { row: u32, col: u32, message: String },
    #[error("render error: {message}")]
    Render { message: String },
}

/// Render a Mustache template against a JSON data string.
#[uniffi::export]
pub fn render(template: String, data_json: String) -> Result<String, StacheError> {
    render_with_partials(template, data_json, HashMap::new(), false)
}

/// Render a Mustache template with partials, each given as raw template
/// source keyed by name. With `strict_partials`, an unresolved `{{>name}}`
/// is an error instead of empty output.
#[uniffi::export]
pub fn render_with_partials(
    template: String,
    data_json: String,
    partials: HashMap<String, String>,
    strict_partials: bool,
) -> Result<String, StacheError> {
    let data: serde_json::Value =
        serde_json::from_str(&data_json).map_err(|e| StacheError::InvalidData {
            message: e.to_string(),
        })?;

    let mut map = stache::Partials::new().strict(strict_partials);
    for (name, source) in &partials {
        map.add_source(name.clone(), source).map_err(parse_error)?;
    }

    match stache::render_str_with(&template, &data, &map) {
        Ok(text) => Ok(text),
        Err(stache::Error::Parse(e)) => Err(parse_error(e)),
        Err(stache::Error::Render(e)) => Err(StacheError::Render {
            message: e.to_string(),
        }),
        Err(e) => Err(StacheError::Render {
            message: e.to_string(),
        }),
    }
}

fn parse_error(e: stache::ParseError) -> StacheError {
    let (row, col) = e.position();
    StacheError::Parse {
        row,
        col,
        message: e.to_string(),
    }
}
