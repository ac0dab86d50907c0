use std::fmt;

/// Failure classes of a render. Every one of them aborts the current render.
///
/// Functions in this crate return `anyhow::Result` and attach a `RenderError` either as the error
/// itself or as context, so callers can classify a failure with
/// `err.downcast_ref::<RenderError>()`.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Invalid render parameters: non-positive temperature, unknown color space, unsupported
    /// bit depth or container combination.
    Configuration(String),
    /// The cube is malformed: bad magic, truncated header, inconsistent band table.
    SourceFormat(String),
    /// Reading a scanline or writing output failed.
    Io(String),
    /// Observer and illuminant do not overlap, so the normalization constant is not positive.
    NumericDegeneracy(String),
}

impl RenderError {
    pub fn kind(&self) -> &'static str {
        match self {
            RenderError::Configuration(_) => "configuration error",
            RenderError::SourceFormat(_) => "source format error",
            RenderError::Io(_) => "I/O error",
            RenderError::NumericDegeneracy(_) => "numeric degeneracy",
        }
    }

    fn message(&self) -> &str {
        match self {
            RenderError::Configuration(msg)
            | RenderError::SourceFormat(msg)
            | RenderError::Io(msg)
            | RenderError::NumericDegeneracy(msg) => msg,
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::error::Error for RenderError {}

/// Finds the `RenderError` attached to an error, looking through context layers.
pub fn classify(err: &anyhow::Error) -> Option<&RenderError> {
    err.downcast_ref::<RenderError>()
}
