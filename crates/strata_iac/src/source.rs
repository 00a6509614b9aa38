//! Resolving documents for one environment and version.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use strata_config::Materializer;
use strata_templates::{
    Environment, TemplateError, TemplateRequest, TemplateResolver, VariableContext, Variables,
    Version,
};

use crate::error::IacResult;

/// A resolver bound to a context, environment and version.
///
/// Every document a manifest or blueprint refers to is read through the same
/// source, so they all see the same variables.
pub struct DocumentSource<'a> {
    resolver: &'a TemplateResolver,
    context: &'a VariableContext,
    environment: Environment,
    version: Version,
    overrides: Variables,
}

impl<'a> DocumentSource<'a> {
    pub fn new(
        resolver: &'a TemplateResolver,
        context: &'a VariableContext,
        environment: Environment,
        version: Version,
    ) -> Self {
        Self {
            resolver,
            context,
            environment,
            version,
            overrides: Variables::new(),
        }
    }

    /// Use the context's host environment and version.
    pub fn from_context(
        resolver: &'a TemplateResolver,
        context: &'a VariableContext,
    ) -> IacResult<Self> {
        let host = context.host();
        match (host.environment, host.version) {
            (Some(environment), Some(version)) => {
                Ok(Self::new(resolver, context, environment, version))
            }
            _ => Err(TemplateError::InvalidRequest(
                "context has no host environment and version".to_string(),
            )
            .into()),
        }
    }

    /// Overrides applied to every document this source resolves.
    pub fn with_overrides(mut self, overrides: Variables) -> Self {
        self.overrides.extend(overrides);
        self
    }

    pub fn context(&self) -> &VariableContext {
        self.context
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn request(&self, document_path: &str) -> TemplateRequest {
        TemplateRequest::new(self.environment, self.version, document_path)
            .with_overrides(self.overrides.clone())
    }

    /// Resolve `document_path` and materialize it as `T`.
    pub fn typed<T: DeserializeOwned>(&self, document_path: &str) -> IacResult<T> {
        debug!("Loading {} for {}/{}", document_path, self.environment, self.version);
        Ok(self
            .resolver
            .resolve_as(&self.request(document_path), self.context)?)
    }

    /// Resolve `document_path` into an untyped tree.
    pub fn tree(&self, document_path: &str) -> IacResult<Value> {
        let document = self
            .resolver
            .resolve(&self.request(document_path), self.context)?;
        Ok(Materializer::parse_tree(&document.path, &document.text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use strata_templates::{MemoryLoader, Scope};

    use crate::error::IacError;

    #[test]
    fn test_source_from_context() {
        let loader = MemoryLoader::new().with_document(
            "prototype/v1/queue.yaml",
            "name: {{hosted:id}}-{{suffix}}\nretention: 5",
        );
        let resolver = TemplateResolver::new(Arc::new(loader));
        let context = VariableContext::new(
            Scope {
                environment: Some(Environment::Prototype),
                version: Some(Version::V1),
                ..Scope::default()
            },
            Scope {
                id: Some("shop".to_string()),
                ..Scope::default()
            },
        );

        let mut overrides = Variables::new();
        overrides.insert("suffix".to_string(), "events".into());
        let source = DocumentSource::from_context(&resolver, &context)
            .unwrap()
            .with_overrides(overrides);

        let tree = source.tree("queue.yaml").unwrap();
        assert_eq!(tree["name"], "shop-events");
        assert_eq!(tree["retention"], 5);
    }

    #[test]
    fn test_source_requires_host_environment() {
        let resolver = TemplateResolver::new(Arc::new(MemoryLoader::new()));
        let context = VariableContext::default();
        assert!(matches!(
            DocumentSource::from_context(&resolver, &context),
            Err(IacError::Template(TemplateError::InvalidRequest(_)))
        ));
    }
}
