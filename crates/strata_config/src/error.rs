//! Error types for configuration materialization.

use std::fmt;

use thiserror::Error;

/// Result type alias for materializer operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while turning documents into typed configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse {document}{}: {message}", location(.path, .line, .column))]
    Parse {
        document: String,
        path: Option<String>,
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },

    #[error(
        "Unknown value '{value}' in {document} at {path}; expected one of: {}",
        .expected.join(", ")
    )]
    UnknownVariant {
        document: String,
        path: String,
        value: String,
        expected: Vec<String>,
    },

    #[error("IO error reading {document}: {source}")]
    Io {
        document: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ConfigError {
    /// The document label the error refers to, if any.
    pub fn document(&self) -> Option<&str> {
        match self {
            Self::Parse { document, .. }
            | Self::UnknownVariant { document, .. }
            | Self::Io { document, .. } => Some(document),
            Self::Json(_) | Self::Yaml(_) => None,
        }
    }
}

fn location(path: &Option<String>, line: &Option<usize>, column: &Option<usize>) -> String {
    let mut out = String::new();
    if let Some(path) = path {
        out.push_str(&format!(" at {}", path));
    }
    match (line, column) {
        (Some(line), Some(column)) => out.push_str(&format!(" (line {}, column {})", line, column)),
        (Some(line), None) => out.push_str(&format!(" (line {})", line)),
        _ => {}
    }
    out
}

/// One step in the path to an offending value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Key(String),
    Index(usize),
}

/// Renders segments outermost-first, e.g. `nodeGroups[1].capacityType`.
pub(crate) struct PathDisplay<'a>(pub(crate) &'a [Segment]);

impl fmt::Display for PathDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{}", key)?,
                Segment::Key(key) => write!(f, ".{}", key)?,
                Segment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}
