//! The network and Kubernetes platform as resource units.
//!
//! A [`PlatformConf`] names a network document and, optionally, a cluster
//! document whose own fields point at the node groups, addons, interrupt
//! queue and observability documents. [`PlatformBlueprint`] reads all of them
//! and wires the units:
//!
//! ```text
//! network
//!   └─ cluster
//!        ├─ interrupt-queue
//!        ├─ managed-addons
//!        └─ node-group-*            (cluster, interrupt-queue)
//!             └─ addon-*            (managed-addons, node groups, earlier addons)
//!                  └─ observability (managed-addons, node groups, addons)
//! ```

use serde::Serialize;
use tracing::{debug, info};

use strata_config::Materializer;
use strata_core::{ResourceKind, ResourceUnit};

use crate::error::IacResult;
use crate::models::{
    AddonsConf, KubernetesConf, NetworkConf, NodeGroup, ObservabilityConf, PlatformConf, SqsConf,
    Tags,
};
use crate::naming;
use crate::source::DocumentSource;

pub const NETWORK: &str = "network";
pub const CLUSTER: &str = "cluster";
pub const INTERRUPT_QUEUE: &str = "interrupt-queue";
pub const MANAGED_ADDONS: &str = "managed-addons";
pub const OBSERVABILITY: &str = "observability";

/// Unit id of the node group called `name`.
pub fn node_group_id(name: &str) -> String {
    format!("node-group-{}", naming::name(&[name]))
}

/// Unit id of the Helm addon called `name`.
pub fn addon_id(name: &str) -> String {
    format!("addon-{}", name)
}

/// The cluster documents, fully resolved.
#[derive(Debug, Clone)]
pub struct ResolvedKubernetes {
    pub cluster: KubernetesConf,
    pub interrupt_queue: Option<SqsConf>,
    pub node_groups: Vec<NodeGroup>,
    pub addons: Option<AddonsConf>,
    pub observability: Option<ObservabilityConf>,
}

/// A platform with every referenced document resolved.
#[derive(Debug, Clone)]
pub struct ResolvedPlatform {
    pub platform: PlatformConf,
    pub network: NetworkConf,
    pub kubernetes: Option<ResolvedKubernetes>,
}

impl ResolvedPlatform {
    pub fn ceiling(&self) -> Option<usize> {
        self.platform.ceiling
    }

    /// The units of this platform, in declaration order.
    pub fn units(&self) -> IacResult<Vec<ResourceUnit>> {
        let mut network = self.network.clone();
        network.tags = merge_tags(&self.platform.tags, &network.tags);
        let weight = 1 + network.subnets.len() + network.security_groups.len();
        let mut units = vec![unit(NETWORK, ResourceKind::Network, &network)?.with_weight(weight)];

        let Some(kubernetes) = &self.kubernetes else {
            return Ok(units);
        };

        let mut cluster = kubernetes.cluster.clone();
        cluster.tags = merge_tags(&self.platform.tags, &cluster.tags);
        cluster.logging_types = cluster.logging();
        units.push(unit(CLUSTER, ResourceKind::Kubernetes, &cluster)?.with_dependency(NETWORK));

        if let Some(queue) = &kubernetes.interrupt_queue {
            units.push(
                unit(INTERRUPT_QUEUE, ResourceKind::Messaging, queue)?.with_dependency(CLUSTER),
            );
        }

        let managed = kubernetes.addons.as_ref().map(|a| &a.managed);
        if let Some(managed) = managed {
            units.push(
                unit(MANAGED_ADDONS, ResourceKind::Addon, managed)?
                    .with_weight(managed.enabled().len().max(1))
                    .with_dependency(CLUSTER),
            );
        }

        let mut node_groups = Vec::new();
        for group in &kubernetes.node_groups {
            let id = node_group_id(&group.name);
            let mut node_unit =
                unit(&id, ResourceKind::Compute, group)?.with_dependency(CLUSTER);
            if kubernetes.interrupt_queue.is_some() {
                node_unit = node_unit.with_dependency(INTERRUPT_QUEUE);
            }
            units.push(node_unit);
            node_groups.push(id);
        }

        // Everything above the node groups waits for the managed addons and
        // every node group.
        let base: Vec<String> = managed
            .map(|_| MANAGED_ADDONS.to_string())
            .into_iter()
            .chain(node_groups.iter().cloned())
            .collect();

        let mut addons = Vec::new();
        if let Some(conf) = &kubernetes.addons {
            for (name, chart) in conf.charts() {
                let id = addon_id(name);
                units.push(
                    unit(&id, ResourceKind::Addon, chart)?
                        .with_dependencies(base.iter().cloned())
                        .with_dependencies(addons.iter().cloned()),
                );
                addons.push(id);
            }
        }

        if let Some(observability) = &kubernetes.observability {
            let weight = 1
                + observability.metrics.len()
                + observability.alarms.len()
                + observability.dashboards.len();
            units.push(
                unit(OBSERVABILITY, ResourceKind::Observability, observability)?
                    .with_weight(weight)
                    .with_dependencies(base.iter().cloned())
                    .with_dependencies(addons.iter().cloned()),
            );
        }

        debug!(
            "Platform wired {} node groups and {} addons",
            node_groups.len(),
            addons.len()
        );
        Ok(units)
    }
}

/// Reads a platform document and everything it references.
pub struct PlatformBlueprint<'s, 'a> {
    source: &'s DocumentSource<'a>,
}

impl<'s, 'a> PlatformBlueprint<'s, 'a> {
    pub fn new(source: &'s DocumentSource<'a>) -> Self {
        Self { source }
    }

    pub fn resolve(&self, document_path: &str) -> IacResult<ResolvedPlatform> {
        let platform: PlatformConf = self.source.typed(document_path)?;
        let network: NetworkConf = self.source.typed(&platform.network)?;

        let kubernetes = match &platform.kubernetes {
            Some(path) => Some(self.resolve_kubernetes(path)?),
            None => None,
        };

        info!(
            "Resolved platform {} for {}/{}",
            document_path,
            self.source.environment(),
            self.source.version()
        );
        Ok(ResolvedPlatform {
            platform,
            network,
            kubernetes,
        })
    }

    /// Resolve `document_path` and wire its units.
    pub fn units(&self, document_path: &str) -> IacResult<Vec<ResourceUnit>> {
        self.resolve(document_path)?.units()
    }

    fn resolve_kubernetes(&self, path: &str) -> IacResult<ResolvedKubernetes> {
        let cluster: KubernetesConf = self.source.typed(path)?;
        Ok(ResolvedKubernetes {
            interrupt_queue: self.optional(cluster.sqs.as_deref())?,
            node_groups: self
                .optional::<Vec<NodeGroup>>(cluster.node_groups.as_deref())?
                .unwrap_or_default(),
            addons: self.optional(cluster.addons.as_deref())?,
            observability: self.optional(cluster.observability.as_deref())?,
            cluster,
        })
    }

    fn optional<T: serde::de::DeserializeOwned>(&self, path: Option<&str>) -> IacResult<Option<T>> {
        path.map(|p| self.source.typed(p)).transpose()
    }
}

fn unit<T: Serialize>(id: &str, kind: ResourceKind, conf: &T) -> IacResult<ResourceUnit> {
    Ok(ResourceUnit::new(id, kind).with_config(Materializer::to_tree(conf)?))
}

/// Platform-wide tags overlaid by the resource's own.
fn merge_tags(common: &Tags, own: &Tags) -> Tags {
    let mut tags = common.clone();
    tags.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
    tags
}
