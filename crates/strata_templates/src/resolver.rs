//! Resolving environment/version documents into substituted text.
//!
//! The resolver handles:
//! - Computing the `{environment}/{version}/{path}` location of a document
//! - Layering request overrides on top of the context defaults
//! - Rendering the document against the merged variables

use std::fmt;
use std::io::Read;
use std::path::{Component, Path};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use strata_config::Materializer;

use crate::context::{merge, Environment, VariableContext, Variables, Version};
use crate::error::{TemplateError, TemplateResult};
use crate::loader::Loader;
use crate::renderer::TemplateRenderer;

/// Which document to resolve, and with what overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRequest {
    pub environment: Environment,
    pub version: Version,
    pub document_path: String,
    pub overrides: Variables,
}

impl TemplateRequest {
    pub fn new(environment: Environment, version: Version, document_path: impl Into<String>) -> Self {
        Self {
            environment,
            version,
            document_path: document_path.into(),
            overrides: Variables::new(),
        }
    }

    /// A request for the environment and version the context's host is set to.
    pub fn from_context(
        context: &VariableContext,
        document_path: impl Into<String>,
    ) -> TemplateResult<Self> {
        let environment = context.host().environment.ok_or_else(|| {
            TemplateError::InvalidRequest("context has no host environment".to_string())
        })?;
        let version = context.host().version.ok_or_else(|| {
            TemplateError::InvalidRequest("context has no host version".to_string())
        })?;
        Ok(Self::new(environment, version, document_path))
    }

    pub fn with_override(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.insert(name.into(), value.into());
        self
    }

    pub fn with_overrides(mut self, overrides: Variables) -> Self {
        self.overrides.extend(overrides);
        self
    }

    /// The computed location, `{environment}/{version}/{document_path}`.
    pub fn path(&self) -> String {
        format!("{}/{}/{}", self.environment, self.version, self.document_path)
    }

    fn validate(&self) -> TemplateResult<()> {
        if self.document_path.trim().is_empty() {
            return Err(TemplateError::InvalidRequest(
                "document path must not be empty".to_string(),
            ));
        }
        let path = Path::new(&self.document_path);
        let escapes = path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes || self.document_path.starts_with(['/', '\\']) {
            return Err(TemplateError::InvalidRequest(format!(
                "document path must be relative without '..': {}",
                self.document_path
            )));
        }
        Ok(())
    }
}

/// Substituted document text and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDocument {
    pub path: String,
    pub text: String,
}

impl ResolvedDocument {
    /// Map the text onto `T`.
    pub fn materialize<T: DeserializeOwned>(&self) -> TemplateResult<T> {
        Ok(Materializer::materialize(&self.path, &self.text)?)
    }
}

impl fmt::Display for ResolvedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Resolves requests against a [`Loader`].
pub struct TemplateResolver {
    loader: Arc<dyn Loader>,
    renderer: TemplateRenderer,
}

impl TemplateResolver {
    pub fn new(loader: Arc<dyn Loader>) -> Self {
        Self {
            loader,
            renderer: TemplateRenderer::new(),
        }
    }

    /// Locate, merge and render the requested document.
    pub fn resolve(
        &self,
        request: &TemplateRequest,
        context: &VariableContext,
    ) -> TemplateResult<ResolvedDocument> {
        request.validate()?;
        let path = request.path();

        let mut text = String::new();
        self.loader
            .open(&path)?
            .read_to_string(&mut text)
            .map_err(|source| TemplateError::Io {
                path: path.clone(),
                source,
            })?;

        let variables = merge(&context.defaults(), &request.overrides);
        let unresolved = self.renderer.unresolved(&text, &variables);
        if !unresolved.is_empty() {
            debug!("{} keeps unresolved placeholders: {}", path, unresolved.join(", "));
        }

        debug!("Resolved {} with {} variables", path, variables.len());
        Ok(ResolvedDocument {
            text: self.renderer.render(&text, &variables),
            path,
        })
    }

    /// Resolve the document and materialize it as `T`.
    pub fn resolve_as<T: DeserializeOwned>(
        &self,
        request: &TemplateRequest,
        context: &VariableContext,
    ) -> TemplateResult<T> {
        self.resolve(request, context)?.materialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Scope;
    use crate::loader::MemoryLoader;

    fn resolver() -> TemplateResolver {
        let loader = MemoryLoader::new()
            .with_document("production/v2/network.yaml", "name: {{hosted:id}}-vpc\ncidr: {{cidr}}\n")
            .with_document("bootstrap/v1/plain.yaml", "plain: true");
        TemplateResolver::new(Arc::new(loader))
    }

    fn context() -> VariableContext {
        VariableContext::new(
            Scope::default(),
            Scope {
                id: Some("shop".to_string()),
                ..Scope::default()
            },
        )
        .with_variable("cidr", "10.0.0.0/16")
    }

    #[test]
    fn test_request_path() {
        let request = TemplateRequest::new(Environment::Production, Version::V2, "eks/cluster.yaml");
        assert_eq!(request.path(), "production/v2/eks/cluster.yaml");
    }

    #[test]
    fn test_resolve_substitutes_defaults_and_overrides() {
        let request = TemplateRequest::new(Environment::Production, Version::V2, "network.yaml");
        let doc = resolver().resolve(&request, &context()).unwrap();
        assert_eq!(doc.path, "production/v2/network.yaml");
        assert_eq!(doc.text, "name: shop-vpc\ncidr: 10.0.0.0/16\n");

        let request = request.with_override("cidr", "172.16.0.0/12");
        let doc = resolver().resolve(&request, &context()).unwrap();
        assert!(doc.text.contains("cidr: 172.16.0.0/12"));
    }

    #[test]
    fn test_invalid_paths_rejected() {
        for path in ["", "  ", "../secrets.yaml", "a/../../b.yaml", "/etc/passwd"] {
            let request = TemplateRequest::new(Environment::Bootstrap, Version::V1, path);
            assert!(
                matches!(resolver().resolve(&request, &context()), Err(TemplateError::InvalidRequest(_))),
                "path {:?} should be rejected",
                path
            );
        }
    }

    #[test]
    fn test_from_context_requires_environment() {
        let err = TemplateRequest::from_context(&context(), "network.yaml").unwrap_err();
        assert!(matches!(err, TemplateError::InvalidRequest(_)));

        let ctx = VariableContext::new(
            Scope {
                environment: Some(Environment::Bootstrap),
                version: Some(Version::V1),
                ..Scope::default()
            },
            Scope::default(),
        );
        let request = TemplateRequest::from_context(&ctx, "plain.yaml").unwrap();
        assert_eq!(request.path(), "bootstrap/v1/plain.yaml");
    }
}
