//! # strata_iac
//!
//! Infrastructure documents as resource units.
//!
//! This crate holds the typed configuration models of a network and
//! Kubernetes platform and two ways of turning documents into
//! [`ResourceUnit`](strata_core::ResourceUnit)s for the build engine:
//!
//! - [`StackManifest`]: an explicit list of units, each with a kind,
//!   a document or inline config, and its dependencies
//! - [`PlatformBlueprint`]: a platform document whose network, cluster,
//!   node group, addon and observability documents are wired automatically
//!
//! Both resolve their documents through a [`DocumentSource`]. The
//! [`DryRunBuilder`] stands in for a cloud provisioner and returns
//! ARN-style identifiers without calling any API.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use strata_iac::{DocumentSource, PlatformBlueprint};
//! use strata_templates::{FsLoader, TemplateResolver, VariableContext};
//!
//! let context = VariableContext::from_path("context.yaml").unwrap();
//! let resolver = TemplateResolver::new(Arc::new(FsLoader::new("resources")));
//! let source = DocumentSource::from_context(&resolver, &context).unwrap();
//!
//! let units = PlatformBlueprint::new(&source).units("platform.yaml").unwrap();
//! ```

pub mod blueprint;
pub mod dry_run;
pub mod error;
pub mod manifest;
pub mod models;
pub mod naming;
pub mod source;

pub use blueprint::{PlatformBlueprint, ResolvedKubernetes, ResolvedPlatform};
pub use dry_run::DryRunBuilder;
pub use error::{IacError, IacResult};
pub use manifest::{ManifestUnit, StackManifest};
pub use models::{
    AddonsConf, AlarmConf, CapacityType, DashboardConf, EndpointAccess, HelmChart,
    InstanceTenancy, IpProtocol, KubernetesConf, ManagedAddon, ManagedAddons, MetricFilterConf,
    NetworkConf, NodeGroup, ObservabilityConf, PlatformConf, SecurityGroup, SqsConf, SqsRule,
    Subnet, SubnetType, Tags,
};
pub use source::DocumentSource;
