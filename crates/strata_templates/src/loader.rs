//! Where template documents come from.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::context::{Environment, Version};
use crate::error::{TemplateError, TemplateResult};

const DOCUMENT_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// A source of template documents addressed by relative path.
pub trait Loader: Send + Sync {
    /// Open the document at `path`, or fail with [`TemplateError::NotFound`].
    fn open(&self, path: &str) -> TemplateResult<Box<dyn Read + Send + '_>>;
}

/// Loads documents from a directory tree laid out as `{environment}/{version}/...`.
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// List the documents available for one environment and version.
    ///
    /// Paths are relative to `{environment}/{version}` and use `/` separators.
    pub fn documents(&self, environment: Environment, version: Version) -> Vec<String> {
        let dir = self.root.join(environment.as_str()).join(version.as_str());
        if !dir.is_dir() {
            warn!("Document directory does not exist: {:?}", dir);
            return Vec::new();
        }

        let mut documents: Vec<String> = WalkDir::new(&dir)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path().extension().map_or(false, |ext| {
                    DOCUMENT_EXTENSIONS.contains(&ext.to_string_lossy().to_lowercase().as_str())
                })
            })
            .filter_map(|e| {
                e.path().strip_prefix(&dir).ok().map(|relative| {
                    relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect::<Vec<_>>()
                        .join("/")
                })
            })
            .collect();
        documents.sort();
        documents
    }
}

impl Loader for FsLoader {
    fn open(&self, path: &str) -> TemplateResult<Box<dyn Read + Send + '_>> {
        let full = self.root.join(path);
        debug!("Opening {:?}", full);

        if !full.is_file() {
            return Err(TemplateError::NotFound {
                path: path.to_string(),
            });
        }
        match File::open(&full) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(TemplateError::NotFound {
                path: path.to_string(),
            }),
            Err(source) => Err(TemplateError::Io {
                path: path.to_string(),
                source,
            }),
        }
    }
}

/// Serves documents from memory, for embedded defaults and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    documents: BTreeMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.documents.insert(path.into(), text.into());
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl Loader for MemoryLoader {
    fn open(&self, path: &str) -> TemplateResult<Box<dyn Read + Send + '_>> {
        self.documents
            .get(path)
            .map(|text| Box::new(Cursor::new(text.as_bytes())) as Box<dyn Read + Send + '_>)
            .ok_or_else(|| TemplateError::NotFound {
                path: path.to_string(),
            })
    }
}
