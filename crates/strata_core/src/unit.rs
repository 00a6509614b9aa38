//! Resource units and the handles their builders produce.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use strata_config::{same_name, Materializer};

use crate::error::{CoreError, CoreResult};

/// What a unit provisions. Builders are registered per kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceKind {
    Network,
    Compute,
    Identity,
    Messaging,
    Storage,
    Kubernetes,
    Addon,
    Observability,
    Custom(String),
}

impl ResourceKind {
    const KNOWN: [ResourceKind; 8] = [
        Self::Network,
        Self::Compute,
        Self::Identity,
        Self::Messaging,
        Self::Storage,
        Self::Kubernetes,
        Self::Addon,
        Self::Observability,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Network => "network",
            Self::Compute => "compute",
            Self::Identity => "identity",
            Self::Messaging => "messaging",
            Self::Storage => "storage",
            Self::Kubernetes => "kubernetes",
            Self::Addon => "addon",
            Self::Observability => "observability",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::KNOWN
            .iter()
            .find(|kind| same_name(kind.as_str(), s))
            .cloned()
            .unwrap_or_else(|| Self::Custom(s.to_string())))
    }
}

impl From<String> for ResourceKind {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for ResourceKind {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        kind.as_str().to_string()
    }
}

fn default_weight() -> usize {
    1
}

/// A named, independently buildable piece of infrastructure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUnit {
    pub id: String,
    pub kind: ResourceKind,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub depends_on: BTreeSet<String>,
    /// Share of the partition ceiling this unit consumes.
    #[serde(default = "default_weight")]
    pub weight: usize,
}

impl ResourceUnit {
    pub fn new(id: impl Into<String>, kind: impl Into<ResourceKind>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            config: Value::Null,
            depends_on: BTreeSet::new(),
            weight: default_weight(),
        }
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    pub fn with_dependency(mut self, id: impl Into<String>) -> Self {
        self.depends_on.insert(id.into());
        self
    }

    pub fn with_dependencies<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_weight(mut self, weight: usize) -> Self {
        self.weight = weight;
        self
    }

    /// Materialize the unit's config as `T`.
    pub fn config_as<T: DeserializeOwned>(&self) -> CoreResult<T> {
        Materializer::materialize_value(&self.id, self.config.clone()).map_err(|source| {
            CoreError::Config {
                unit: self.id.clone(),
                source,
            }
        })
    }
}

/// What a builder hands back for a unit it provisioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedHandle {
    pub unit_id: String,
    pub kind: ResourceKind,
    pub identifier: String,
    #[serde(default)]
    pub outputs: BTreeMap<String, Value>,
}

impl ProvisionedHandle {
    pub fn new(unit: &ResourceUnit, identifier: impl Into<String>) -> Self {
        Self {
            unit_id: unit.id.clone(),
            kind: unit.kind.clone(),
            identifier: identifier.into(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn with_output(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.outputs.insert(name.into(), value.into());
        self
    }

    pub fn output(&self, name: &str) -> Option<&Value> {
        self.outputs.get(name)
    }
}

/// Handles of a unit's direct dependencies, keyed by unit id.
#[derive(Debug, Clone, Default)]
pub struct ResolvedDependencies {
    handles: BTreeMap<String, Arc<ProvisionedHandle>>,
}

impl ResolvedDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: Arc<ProvisionedHandle>) {
        self.handles.insert(handle.unit_id.clone(), handle);
    }

    pub fn get(&self, id: &str) -> Option<&ProvisionedHandle> {
        self.handles.get(id).map(Arc::as_ref)
    }

    /// The shared handle itself, for builders that keep it.
    pub fn shared(&self, id: &str) -> Option<Arc<ProvisionedHandle>> {
        self.handles.get(id).cloned()
    }

    /// Handles of a given kind, in id order.
    pub fn of_kind<'a>(
        &'a self,
        kind: &'a ResourceKind,
    ) -> impl Iterator<Item = &'a ProvisionedHandle> + 'a {
        self.handles
            .values()
            .map(Arc::as_ref)
            .filter(move |h| &h.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProvisionedHandle> {
        self.handles.values().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_parse() {
        assert_eq!(ResourceKind::from("Network"), ResourceKind::Network);
        assert_eq!(ResourceKind::from("KUBERNETES"), ResourceKind::Kubernetes);
        assert_eq!(
            ResourceKind::from("dns-zone"),
            ResourceKind::Custom("dns-zone".to_string())
        );
        assert_eq!(ResourceKind::Custom("dns-zone".to_string()).to_string(), "dns-zone");
    }

    #[test]
    fn test_unit_defaults_from_yaml() {
        let unit: ResourceUnit = Materializer::materialize(
            "unit.yaml",
            "id: vpc\nkind: network\nDEPENDS_ON: null",
        )
        .unwrap();
        assert_eq!(unit.kind, ResourceKind::Network);
        assert!(unit.depends_on.is_empty());
        assert_eq!(unit.weight, 1);
        assert_eq!(unit.config, Value::Null);
    }

    #[test]
    fn test_config_as() {
        #[derive(Deserialize)]
        struct Queue {
            retention: u32,
        }
        let unit = ResourceUnit::new("queue", ResourceKind::Messaging)
            .with_config(json!({"Retention": 4}));
        assert_eq!(unit.config_as::<Queue>().unwrap().retention, 4);

        let bad = ResourceUnit::new("queue", ResourceKind::Messaging).with_config(json!({}));
        let err = bad.config_as::<Queue>().err().unwrap();
        assert!(err.to_string().contains("queue"));
    }

    #[test]
    fn test_resolved_dependencies() {
        let vpc = ResourceUnit::new("vpc", ResourceKind::Network);
        let role = ResourceUnit::new("role", ResourceKind::Identity);
        let mut deps = ResolvedDependencies::new();
        deps.insert(Arc::new(ProvisionedHandle::new(&vpc, "vpc-123").with_output("cidr", "10.0.0.0/16")));
        deps.insert(Arc::new(ProvisionedHandle::new(&role, "role-1")));

        assert_eq!(deps.len(), 2);
        assert_eq!(deps.get("vpc").unwrap().output("cidr"), Some(&json!("10.0.0.0/16")));
        assert_eq!(deps.of_kind(&ResourceKind::Identity).count(), 1);
    }
}
