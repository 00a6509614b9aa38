//! Error types for the core module.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while validating or building resource units.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Duplicate resource unit: {0}")]
    DuplicateUnit(String),

    #[error("Unit '{unit}' depends on unknown unit '{dependency}'")]
    UnknownDependency { unit: String, dependency: String },

    #[error("Circular dependency detected: {}", .units.join(" → "))]
    CyclicDependency { units: Vec<String> },

    #[error("No builder registered for kind '{kind}' (unit '{unit}')")]
    BuilderNotFound { unit: String, kind: String },

    #[error("Unit not found: {0}")]
    UnitNotFound(String),

    #[error("Build failed for unit '{unit}': {message}")]
    BuildFailure { unit: String, message: String },

    #[error("Unit '{unit}' was not built because dependency '{dependency}' failed")]
    DependencyFailed { unit: String, dependency: String },

    #[error("Unit '{0}' has weight 0; weights must be at least 1")]
    InvalidWeight(String),

    #[error("Partition ceiling must be at least 1")]
    InvalidCeiling,

    #[error("Invalid partition plan: {0}")]
    InvalidPlan(String),

    #[error("Invalid unit config for '{unit}': {source}")]
    Config {
        unit: String,
        #[source]
        source: strata_config::ConfigError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Shorthand for a builder reporting that `unit` could not be built.
    pub fn build_failure(unit: impl Into<String>, message: impl ToString) -> Self {
        Self::BuildFailure {
            unit: unit.into(),
            message: message.to_string(),
        }
    }

    /// Whether the error is raised by graph validation, before any builder runs.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateUnit(_)
                | Self::UnknownDependency { .. }
                | Self::CyclicDependency { .. }
                | Self::BuilderNotFound { .. }
                | Self::InvalidWeight(_)
                | Self::InvalidCeiling
                | Self::InvalidPlan(_)
        )
    }
}
