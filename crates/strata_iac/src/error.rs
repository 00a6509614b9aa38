//! Error types for the infrastructure layer.

use thiserror::Error;

use strata_config::ConfigError;
use strata_core::CoreError;
use strata_templates::TemplateError;

/// Result type alias for infrastructure operations.
pub type IacResult<T> = Result<T, IacError>;

/// Errors that can occur while turning documents into resource units.
#[derive(Error, Debug)]
pub enum IacError {
    /// A naming helper needed a context value that is not set.
    #[error("Missing context value: {0}")]
    MissingContext(&'static str),

    #[error("Invalid manifest {document}: {message}")]
    InvalidManifest { document: String, message: String },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl IacError {
    pub fn invalid_manifest(document: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidManifest {
            document: document.into(),
            message: message.into(),
        }
    }
}
