//! Turning resolved document text into typed configuration.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult, PathDisplay};
use crate::tree::{TreeDeserializer, TreeError};

/// Syntax a document is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Guess the format from the content itself.
    ///
    /// A document whose first non-blank character opens an object or array
    /// looks like JSON; everything else is read as YAML. Flow-style YAML looks
    /// like JSON too, so a JSON guess is only a parse attempt.
    pub fn detect(text: &str) -> Self {
        match text.trim_start().chars().next() {
            Some('{') | Some('[') => Self::Json,
            _ => Self::Yaml,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

/// Materializes JSON or YAML documents into typed shapes.
pub struct Materializer;

impl Materializer {
    /// Parse `text` and map it onto `T`.
    ///
    /// `document` is only used to label errors.
    pub fn materialize<T: DeserializeOwned>(document: &str, text: &str) -> ConfigResult<T> {
        let tree = Self::parse_tree(document, text)?;
        Self::materialize_value(document, tree)
    }

    /// Parse `text` into an untyped tree without mapping it.
    pub fn parse_tree(document: &str, text: &str) -> ConfigResult<Value> {
        let format = DocumentFormat::detect(text);
        debug!("Parsing {} as {}", document, format);

        if text.trim().is_empty() {
            return Err(ConfigError::Parse {
                document: document.to_string(),
                path: None,
                line: None,
                column: None,
                message: "document is empty".to_string(),
            });
        }

        match format {
            DocumentFormat::Json => match serde_json::from_str(text) {
                Ok(tree) => Ok(tree),
                Err(json) => {
                    debug!("{} is not JSON ({}), retrying as yaml", document, json);
                    Self::parse_yaml(document, text).map_err(|_| ConfigError::Parse {
                        document: document.to_string(),
                        path: None,
                        line: (json.line() > 0).then(|| json.line()),
                        column: (json.column() > 0).then(|| json.column()),
                        message: json.to_string(),
                    })
                }
            },
            DocumentFormat::Yaml => Self::parse_yaml(document, text),
        }
    }

    fn parse_yaml(document: &str, text: &str) -> ConfigResult<Value> {
        serde_yaml::from_str(text).map_err(|e| {
            let location = e.location();
            ConfigError::Parse {
                document: document.to_string(),
                path: None,
                line: location.as_ref().map(|l| l.line()),
                column: location.as_ref().map(|l| l.column()),
                message: e.to_string(),
            }
        })
    }

    /// Map an already parsed tree onto `T`.
    pub fn materialize_value<T: DeserializeOwned>(document: &str, tree: Value) -> ConfigResult<T> {
        T::deserialize(TreeDeserializer::new(tree)).map_err(|e| Self::tree_error(document, e))
    }

    /// Read and materialize a file from disk.
    pub fn read_path<T: DeserializeOwned>(path: impl AsRef<Path>) -> ConfigResult<T> {
        let path = path.as_ref();
        let document = path.display().to_string();
        debug!("Reading configuration from {:?}", path);

        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            document: document.clone(),
            source,
        })?;
        Self::materialize(&document, &text)
    }

    /// Serialize `value` into a tree with every null-valued field removed.
    pub fn to_tree<T: Serialize>(value: &T) -> ConfigResult<Value> {
        let mut tree = serde_json::to_value(value)?;
        strip_nulls(&mut tree);
        Ok(tree)
    }

    /// Serialize `value` as pretty JSON, omitting null-valued fields.
    pub fn to_json<T: Serialize>(value: &T) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(&Self::to_tree(value)?)?)
    }

    /// Serialize `value` as YAML, omitting null-valued fields.
    pub fn to_yaml<T: Serialize>(value: &T) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(&Self::to_tree(value)?)?)
    }

    fn tree_error(document: &str, error: TreeError) -> ConfigError {
        let path = PathDisplay(&error.path()).to_string();
        match error {
            TreeError::UnknownVariant {
                value, expected, ..
            } => ConfigError::UnknownVariant {
                document: document.to_string(),
                path,
                value,
                expected,
            },
            TreeError::Custom { message, .. } => ConfigError::Parse {
                document: document.to_string(),
                path: Some(path),
                line: None,
                column: None,
                message,
            },
        }
    }
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}
