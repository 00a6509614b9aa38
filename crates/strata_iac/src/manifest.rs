//! Stack manifests: explicit lists of resource units.
//!
//! ```yaml
//! name: shop
//! ceiling: 200
//! units:
//!   - id: network
//!     kind: network
//!     document: network.yaml
//!     weight: 12
//!   - id: cluster
//!     kind: kubernetes
//!     document: eks/cluster.yaml
//!     dependsOn: [network]
//!   - id: audit-bucket
//!     kind: storage
//!     config: { name: audit }
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use strata_core::{ResourceKind, ResourceUnit};

use crate::error::{IacError, IacResult};
use crate::source::DocumentSource;

/// One unit entry of a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestUnit {
    pub id: String,
    pub kind: ResourceKind,
    /// Document whose resolved tree becomes the unit's config.
    pub document: Option<String>,
    /// Inline config, used when there is no document.
    pub config: Option<Value>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub weight: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackManifest {
    pub name: Option<String>,
    pub ceiling: Option<usize>,
    #[serde(default)]
    pub units: Vec<ManifestUnit>,
}

impl StackManifest {
    /// Resolve and materialize the manifest at `document_path`.
    pub fn load(source: &DocumentSource<'_>, document_path: &str) -> IacResult<Self> {
        let manifest: Self = source.typed(document_path)?;
        manifest.check(document_path)?;
        Ok(manifest)
    }

    /// Turn every entry into a [`ResourceUnit`], resolving unit documents
    /// through `source`.
    ///
    /// Graph checks (unknown dependencies, cycles) are left to the build
    /// graph.
    pub fn units(&self, source: &DocumentSource<'_>) -> IacResult<Vec<ResourceUnit>> {
        let units = self
            .units
            .iter()
            .map(|entry| -> IacResult<ResourceUnit> {
                let config = match (&entry.document, &entry.config) {
                    (Some(document), _) => {
                        debug!("Resolving {} for unit {}", document, entry.id);
                        source.tree(document)?
                    }
                    (None, Some(config)) => config.clone(),
                    (None, None) => Value::Null,
                };

                let mut unit = ResourceUnit::new(entry.id.clone(), entry.kind.clone())
                    .with_config(config)
                    .with_dependencies(entry.depends_on.iter().cloned());
                if let Some(weight) = entry.weight {
                    unit = unit.with_weight(weight);
                }
                Ok(unit)
            })
            .collect::<IacResult<Vec<_>>>()?;

        info!(
            "Manifest {} produced {} units",
            self.name.as_deref().unwrap_or("<unnamed>"),
            units.len()
        );
        Ok(units)
    }

    fn check(&self, document: &str) -> IacResult<()> {
        let mut seen = HashSet::new();
        for entry in &self.units {
            if entry.id.trim().is_empty() {
                return Err(IacError::invalid_manifest(document, "unit id must not be empty"));
            }
            if entry.document.is_some() && entry.config.is_some() {
                return Err(IacError::invalid_manifest(
                    document,
                    format!("unit '{}' sets both document and config", entry.id),
                ));
            }
            if entry.weight == Some(0) {
                return Err(IacError::invalid_manifest(
                    document,
                    format!("unit '{}' has weight 0; weights must be at least 1", entry.id),
                ));
            }
            if !seen.insert(entry.id.as_str()) {
                return Err(IacError::invalid_manifest(
                    document,
                    format!("unit '{}' is declared twice", entry.id),
                ));
            }
        }
        if self.ceiling == Some(0) {
            return Err(IacError::invalid_manifest(document, "ceiling must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use strata_templates::{Environment, MemoryLoader, TemplateResolver, VariableContext, Version};

    fn resolver(manifest: &str) -> TemplateResolver {
        let loader = MemoryLoader::new()
            .with_document("bootstrap/v1/stack.yaml", manifest)
            .with_document("bootstrap/v1/network.yaml", "name: {{name}}\ncidr: 10.0.0.0/16\n");
        TemplateResolver::new(Arc::new(loader))
    }

    #[test]
    fn test_manifest_units() {
        let resolver = resolver(
            "UNITS:\n  - id: network\n    kind: Network\n    document: network.yaml\n    weight: 3\n  - id: bucket\n    kind: storage\n    config: {name: audit}\n    dependsOn: [network]\n  - id: marker\n    kind: dns-zone\n    dependsOn: null\n",
        );
        let context = VariableContext::default().with_variable("name", "core");
        let source = DocumentSource::new(&resolver, &context, Environment::Bootstrap, Version::V1);

        let manifest = StackManifest::load(&source, "stack.yaml").unwrap();
        let units = manifest.units(&source).unwrap();

        assert_eq!(units.len(), 3);
        assert_eq!(units[0].kind, ResourceKind::Network);
        assert_eq!(units[0].weight, 3);
        assert_eq!(units[0].config["name"], "core");
        assert_eq!(units[1].config["name"], "audit");
        assert!(units[1].depends_on.contains("network"));
        assert_eq!(units[2].kind, ResourceKind::Custom("dns-zone".to_string()));
        assert!(units[2].depends_on.is_empty());
        assert_eq!(units[2].weight, 1);
    }

    #[test]
    fn test_manifest_rejects_document_and_config() {
        let resolver = resolver(
            "units:\n  - id: network\n    kind: network\n    document: network.yaml\n    config: {}\n",
        );
        let context = VariableContext::default();
        let source = DocumentSource::new(&resolver, &context, Environment::Bootstrap, Version::V1);

        let err = StackManifest::load(&source, "stack.yaml").unwrap_err();
        assert!(matches!(err, IacError::InvalidManifest { .. }));
        assert!(err.to_string().contains("both document and config"));
    }

    #[test]
    fn test_manifest_rejects_duplicate_ids() {
        let resolver = resolver(
            "units:\n  - id: a\n    kind: storage\n  - id: a\n    kind: storage\n",
        );
        let context = VariableContext::default();
        let source = DocumentSource::new(&resolver, &context, Environment::Bootstrap, Version::V1);

        let err = StackManifest::load(&source, "stack.yaml").unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_manifest_rejects_zero_weight() {
        let resolver = resolver(
            "ceiling: 2\nunits:\n  - id: a\n    kind: storage\n    weight: 0\n  - id: b\n    kind: storage\n    weight: 0\n  - id: c\n    kind: storage\n    weight: 0\n",
        );
        let context = VariableContext::default();
        let source = DocumentSource::new(&resolver, &context, Environment::Bootstrap, Version::V1);

        let err = StackManifest::load(&source, "stack.yaml").unwrap_err();
        assert!(matches!(err, IacError::InvalidManifest { .. }));
        assert!(err.to_string().contains("unit 'a' has weight 0"));
    }
}
