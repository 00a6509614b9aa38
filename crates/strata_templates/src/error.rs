//! Error types for template resolution.

use thiserror::Error;

use strata_config::ConfigError;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur while resolving documents.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// No document exists at the computed `{environment}/{version}/{path}` location.
    #[error("can not find {path}")]
    NotFound { path: String },

    #[error("Invalid template request: {0}")]
    InvalidRequest(String),

    #[error("Unknown {kind} '{value}'; expected one of: {}", .expected.join(", "))]
    UnknownVariant {
        kind: &'static str,
        value: String,
        expected: Vec<String>,
    },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
