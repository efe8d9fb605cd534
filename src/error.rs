use std::io;

/// Errors raised while parsing a template.
///
/// Every variant carries the 1-based source position of the offending tag.
/// Positions are byte-oriented: multi-byte UTF-8 sequences advance the column
/// once per byte, which is good enough for diagnostics.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ParseError {
    #[error("unexpected end of input at {row}:{col}")]
    UnexpectedEof { row: u32, col: u32 },

    #[error("tag opened at {row}:{col} is never closed")]
    UnclosedTag { row: u32, col: u32 },

    #[error("malformed delimiter change at {row}:{col}")]
    InvalidDelimiters { row: u32, col: u32 },

    #[error("empty or invalid name at {row}:{col}")]
    InvalidIdentifier { row: u32, col: u32 },

    #[error("closing tag at {row}:{col} does not match the open section")]
    ClosingTagMismatch { row: u32, col: u32 },

    #[error("closing tag at {row}:{col} has no matching open section")]
    UnexpectedCloseSection { row: u32, col: u32 },

    #[error("template inheritance at {row}:{col} is not supported")]
    UnsupportedInheritance { row: u32, col: u32 },
}

impl ParseError {
    /// The 1-based `(row, col)` source position the error refers to.
    pub fn position(&self) -> (u32, u32) {
        match *self {
            ParseError::UnexpectedEof { row, col }
            | ParseError::UnclosedTag { row, col }
            | ParseError::InvalidDelimiters { row, col }
            | ParseError::InvalidIdentifier { row, col }
            | ParseError::ClosingTagMismatch { row, col }
            | ParseError::UnexpectedCloseSection { row, col }
            | ParseError::UnsupportedInheritance { row, col } => (row, col),
        }
    }
}

/// Errors raised while rendering a template.
///
/// A name that resolves to nothing is never an error — it renders as empty
/// output. Rendering fails only when the sink fails, a lambda misbehaves, or
/// a resource limit is hit.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RenderError {
    #[error("write failed: {0}")]
    Io(#[from] io::Error),

    #[error("output buffer is too small")]
    BufferTooSmall,

    #[error("allocation failed while growing the output")]
    OutOfMemory,

    #[error("interpolation failed: {0}")]
    Interpolation(String),

    #[error("partial {0:?} is not registered")]
    PartialNotFound(String),

    #[error("template nesting exceeded the depth limit")]
    DepthLimitExceeded,

    #[error("lambda output failed to parse: {0}")]
    Lambda(#[source] ParseError),
}

/// Any failure from the one-shot parse-and-render entry points.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Render(#[from] RenderError),
}
