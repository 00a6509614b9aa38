//! # strata_core
//!
//! Dependency-ordered build engine for Strata.
//!
//! This crate turns a set of named resource units into a validated build
//! graph and runs their builders in topological order, optionally split into
//! partitions bounded by a weight ceiling.
//!
//! # Architecture
//!
//! - **Units**: [`ResourceUnit`]s declare an id, a kind, a config tree and the ids they depend on
//! - **Graph**: [`BuildGraph`] rejects duplicates, unknown dependencies and cycles up front
//! - **Partitions**: [`partition`] cuts the build order greedily under a ceiling
//! - **Registry**: [`BuilderRegistry`] maps resource kinds to [`ResourceBuilder`]s
//! - **Executor**: [`BuildExecutor`] runs builders concurrently and produces a [`BuildReport`]
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use strata_core::{partition, BuildExecutor, BuildGraph, BuilderRegistry, ResourceKind, ResourceUnit};
//!
//! let registry = BuilderRegistry::new().with(ResourceKind::Network, Arc::new(VpcBuilder));
//! let executor = BuildExecutor::new(Arc::new(registry));
//!
//! let graph = BuildGraph::new(vec![
//!     ResourceUnit::new("network", ResourceKind::Network),
//!     ResourceUnit::new("cluster", ResourceKind::Kubernetes).with_dependency("network"),
//! ])?;
//! let plan = partition(&graph, 200)?;
//! let report = executor.build_partitioned(&graph, &plan).await?;
//! ```

pub mod builder;
pub mod error;
pub mod executor;
pub mod graph;
pub mod partition;
pub mod registry;
pub mod report;
pub mod unit;

pub use builder::ResourceBuilder;
pub use error::{CoreError, CoreResult};
pub use executor::BuildExecutor;
pub use graph::BuildGraph;
pub use partition::{partition, Partition, PartitionOverflow, PartitionPlan};
pub use registry::BuilderRegistry;
pub use report::{BuildReport, BuildState, FailureReason, UnitFailure};
pub use unit::{ProvisionedHandle, ResolvedDependencies, ResourceKind, ResourceUnit};
