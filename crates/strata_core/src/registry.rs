//! Builder registry mapping resource kinds to implementations.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::builder::ResourceBuilder;
use crate::error::{CoreError, CoreResult};
use crate::unit::{ResourceKind, ResourceUnit};

/// A registry of builder implementations.
///
/// Units are routed to a builder by their [`ResourceKind`]. An optional
/// fallback builder takes every kind without a dedicated registration.
#[derive(Default)]
pub struct BuilderRegistry {
    builders: HashMap<ResourceKind, Arc<dyn ResourceBuilder>>,
    fallback: Option<Arc<dyn ResourceBuilder>>,
}

impl BuilderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a builder for a kind, replacing any previous one.
    pub fn register(&mut self, kind: impl Into<ResourceKind>, builder: Arc<dyn ResourceBuilder>) {
        let kind = kind.into();
        debug!("Registering builder {} for kind {}", builder.name(), kind);
        self.builders.insert(kind, builder);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, kind: impl Into<ResourceKind>, builder: Arc<dyn ResourceBuilder>) -> Self {
        self.register(kind, builder);
        self
    }

    /// Use `builder` for every kind without its own registration.
    pub fn with_fallback(mut self, builder: Arc<dyn ResourceBuilder>) -> Self {
        debug!("Registering fallback builder {}", builder.name());
        self.fallback = Some(builder);
        self
    }

    /// Get the builder for a kind.
    pub fn get(&self, kind: &ResourceKind) -> Option<Arc<dyn ResourceBuilder>> {
        self.builders
            .get(kind)
            .or(self.fallback.as_ref())
            .cloned()
    }

    /// Get the builder for a unit, returning an error if none is registered.
    pub fn get_required(&self, unit: &ResourceUnit) -> CoreResult<Arc<dyn ResourceBuilder>> {
        self.get(&unit.kind).ok_or_else(|| CoreError::BuilderNotFound {
            unit: unit.id.clone(),
            kind: unit.kind.to_string(),
        })
    }

    /// Check if a kind can be built.
    pub fn contains(&self, kind: &ResourceKind) -> bool {
        self.builders.contains_key(kind) || self.fallback.is_some()
    }

    /// Get all kinds with a dedicated builder.
    pub fn kinds(&self) -> Vec<&ResourceKind> {
        let mut kinds: Vec<_> = self.builders.keys().collect();
        kinds.sort();
        kinds
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty() && self.fallback.is_none()
    }
}

impl std::fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuilderRegistry")
            .field("kinds", &self.kinds())
            .field("fallback", &self.fallback.as_ref().map(|b| b.name().to_string()))
            .finish()
    }
}
