//! The provisioning seam.
//!
//! A [`ResourceBuilder`] is the only place that talks to an external
//! provisioning API. The executor hands it a fully resolved unit plus the
//! handles of everything the unit depends on, and expects a handle back.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use strata_core::{CoreResult, ProvisionedHandle, ResolvedDependencies, ResourceBuilder, ResourceUnit};
//!
//! struct EchoBuilder;
//!
//! #[async_trait]
//! impl ResourceBuilder for EchoBuilder {
//!     fn name(&self) -> &str { "echo" }
//!
//!     async fn build(&self, unit: &ResourceUnit, _deps: &ResolvedDependencies) -> CoreResult<ProvisionedHandle> {
//!         Ok(ProvisionedHandle::new(unit, format!("echo:{}", unit.id)))
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::unit::{ProvisionedHandle, ResolvedDependencies, ResourceUnit};

/// Provisions one unit.
///
/// Implementations must be safe to call concurrently for independent units.
/// The executor calls `build` at most once per unit.
#[async_trait]
pub trait ResourceBuilder: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Provision `unit`. `dependencies` holds a handle for every id in
    /// `unit.depends_on`.
    async fn build(
        &self,
        unit: &ResourceUnit,
        dependencies: &ResolvedDependencies,
    ) -> CoreResult<ProvisionedHandle>;
}
