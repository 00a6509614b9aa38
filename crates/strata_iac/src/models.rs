//! Typed infrastructure configuration.
//!
//! Every collection field carries `#[serde(default)]`, so an absent list or
//! map reads as empty just like an explicit `null` does. Fields that hold a
//! document path (for example [`KubernetesConf::node_groups`]) name another
//! document under the same environment and version.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type Tags = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubnetType {
    PrivateIsolated,
    PrivateWithEgress,
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IpProtocol {
    Ipv4Only,
    DualStack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceTenancy {
    Default,
    Dedicated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    pub name: String,
    pub subnet_type: SubnetType,
    pub cidr_mask: u8,
    #[serde(default)]
    pub reserved: bool,
    #[serde(default)]
    pub map_public_ip_on_launch: bool,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroup {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub disable_inline_rules: bool,
    #[serde(default)]
    pub allow_all_outbound: bool,
    #[serde(default)]
    pub ingress_rules: Vec<Value>,
    #[serde(default)]
    pub egress_rules: Vec<Value>,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConf {
    pub name: String,
    pub cidr: String,
    pub ip_protocol: Option<IpProtocol>,
    #[serde(default)]
    pub nat_gateways: u32,
    #[serde(default)]
    pub security_groups: Vec<SecurityGroup>,
    #[serde(default)]
    pub subnets: Vec<Subnet>,
    #[serde(default)]
    pub availability_zones: Vec<String>,
    pub default_instance_tenancy: Option<InstanceTenancy>,
    #[serde(default)]
    pub create_internet_gateway: bool,
    #[serde(default)]
    pub enable_dns_hostnames: bool,
    #[serde(default)]
    pub enable_dns_support: bool,
    #[serde(default)]
    pub tags: Tags,
}

// ---------------------------------------------------------------------------
// Kubernetes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndpointAccess {
    #[default]
    PublicAndPrivate,
    Private,
    Public,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapacityType {
    #[default]
    OnDemand,
    Spot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesConf {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub endpoint_access: EndpointAccess,
    #[serde(default)]
    pub prune: bool,
    /// Document path of the RBAC configuration.
    pub rbac: Option<String>,
    /// Document path of the tenancy configuration.
    pub tenancy: Option<String>,
    #[serde(default)]
    pub logging_types: Vec<String>,
    #[serde(default)]
    pub vpc_subnet_types: Vec<SubnetType>,
    /// Document path of a list of [`NodeGroup`]s.
    pub node_groups: Option<String>,
    /// Document path of an [`AddonsConf`].
    pub addons: Option<String>,
    /// Document path of the interrupt queue's [`SqsConf`].
    pub sqs: Option<String>,
    /// Document path of an [`ObservabilityConf`].
    pub observability: Option<String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: Tags,
}

impl KubernetesConf {
    /// Control plane log types, upper-cased.
    pub fn logging(&self) -> Vec<String> {
        self.logging_types
            .iter()
            .map(|t| t.to_ascii_uppercase())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeGroup {
    pub name: String,
    pub ami_type: Option<String>,
    #[serde(default)]
    pub force_update: bool,
    #[serde(default)]
    pub capacity_type: CapacityType,
    pub instance_class: String,
    pub instance_size: String,
    pub min_size: u32,
    pub max_size: u32,
    pub desired_size: u32,
    pub role: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: Tags,
}

impl NodeGroup {
    /// `{class}.{size}`, e.g. `m5a.large`.
    pub fn instance_type(&self) -> String {
        format!("{}.{}", self.instance_class, self.instance_size)
    }
}

// ---------------------------------------------------------------------------
// Messaging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsRule {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    pub event_pattern: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsConf {
    pub name: String,
    /// Message retention in minutes.
    pub retention: Option<u32>,
    #[serde(default)]
    pub rules: Vec<SqsRule>,
    #[serde(default)]
    pub custom_policies: Vec<Value>,
    #[serde(default)]
    pub tags: Tags,
}

// ---------------------------------------------------------------------------
// Addons
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedAddon {
    pub name: String,
    pub version: Option<String>,
    pub configuration_values: Option<String>,
    #[serde(default)]
    pub preserve_on_delete: bool,
    pub resolve_conflicts: Option<String>,
    pub service_account: Option<String>,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedAddons {
    pub aws_ebs_csi: Option<ManagedAddon>,
    pub aws_vpc_cni: Option<ManagedAddon>,
    pub core_dns: Option<ManagedAddon>,
    pub kube_proxy: Option<ManagedAddon>,
    pub container_insights: Option<ManagedAddon>,
    pub pod_identity_agent: Option<ManagedAddon>,
}

impl ManagedAddons {
    /// The configured addons, in install order.
    pub fn enabled(&self) -> Vec<&ManagedAddon> {
        [
            &self.aws_vpc_cni,
            &self.kube_proxy,
            &self.core_dns,
            &self.pod_identity_agent,
            &self.aws_ebs_csi,
            &self.container_insights,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmChart {
    pub name: String,
    pub namespace: String,
    pub release: String,
    pub repository: String,
    /// Document path of the chart values.
    pub values: Option<String>,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonsConf {
    #[serde(default)]
    pub managed: ManagedAddons,
    pub grafana: Option<HelmChart>,
    pub cert_manager: Option<HelmChart>,
    pub csi_secrets_store: Option<HelmChart>,
    pub aws_secrets_store: Option<HelmChart>,
    pub karpenter: Option<HelmChart>,
    pub aws_load_balancer: Option<HelmChart>,
}

impl AddonsConf {
    /// Configured charts with their unit names, in install order.
    ///
    /// Each chart is installed after every chart before it.
    pub fn charts(&self) -> Vec<(&'static str, &HelmChart)> {
        [
            ("grafana", &self.grafana),
            ("cert-manager", &self.cert_manager),
            ("csi-secrets-store", &self.csi_secrets_store),
            ("aws-secrets-store", &self.aws_secrets_store),
            ("karpenter", &self.karpenter),
            ("aws-load-balancer", &self.aws_load_balancer),
        ]
        .into_iter()
        .filter_map(|(name, chart)| chart.as_ref().map(|c| (name, c)))
        .collect()
    }
}

// ---------------------------------------------------------------------------
// Observability
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricFilterConf {
    pub filter_name: String,
    pub log_group_name: String,
    pub filter_pattern: String,
    pub metric_namespace: String,
    pub metric_name: String,
    pub metric_value: String,
    pub default_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmConf {
    pub name: String,
    pub description: Option<String>,
    pub metric_namespace: String,
    pub metric_name: String,
    pub statistic: Option<String>,
    #[serde(default)]
    pub dimensions: BTreeMap<String, String>,
    pub period_minutes: Option<u32>,
    pub evaluation_periods: Option<u32>,
    pub threshold: f64,
    pub comparison_operator: String,
    pub treat_missing_data: Option<String>,
    #[serde(default)]
    pub alarm_actions: Vec<String>,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConf {
    pub name: String,
    pub body: String,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservabilityConf {
    /// Topic name to subscriber endpoints.
    #[serde(default)]
    pub topics: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub metrics: Vec<MetricFilterConf>,
    #[serde(default)]
    pub alarms: Vec<AlarmConf>,
    #[serde(default)]
    pub dashboards: Vec<DashboardConf>,
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// Entry document of a platform deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConf {
    /// Document path of the [`NetworkConf`].
    pub network: String,
    /// Document path of the [`KubernetesConf`]; no cluster when absent.
    pub kubernetes: Option<String>,
    /// Partition ceiling for the generated units.
    pub ceiling: Option<usize>,
    #[serde(default)]
    pub tags: Tags,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_config::{ConfigError, Materializer};

    #[test]
    fn test_node_group_case_insensitive() {
        let group: NodeGroup = Materializer::materialize(
            "nodes.yaml",
            "Name: core\nINSTANCE_CLASS: m5a\ninstanceSize: large\ncapacityType: spot\nminSize: 1\nmaxSize: 3\ndesiredSize: '2'\nlabels: null\n",
        )
        .unwrap();
        assert_eq!(group.capacity_type, CapacityType::Spot);
        assert_eq!(group.instance_type(), "m5a.large");
        assert_eq!(group.desired_size, 2);
        assert!(group.labels.is_empty());
        assert!(group.tags.is_empty());
    }

    #[test]
    fn test_unknown_endpoint_access() {
        let err = Materializer::materialize::<KubernetesConf>(
            "eks.yaml",
            "name: eks\nversion: '1.30'\nendpointAccess: everywhere\n",
        )
        .unwrap_err();
        match err {
            ConfigError::UnknownVariant { path, expected, .. } => {
                assert_eq!(path, "endpointAccess");
                assert!(expected.contains(&"PUBLIC_AND_PRIVATE".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_kubernetes_logging_uppercased() {
        let conf: KubernetesConf = Materializer::materialize(
            "eks.json",
            r#"{"name": "eks", "version": "1.30", "loggingTypes": ["api", "Audit"], "vpcSubnetTypes": ["private_with_egress"]}"#,
        )
        .unwrap();
        assert_eq!(conf.logging(), vec!["API", "AUDIT"]);
        assert_eq!(conf.vpc_subnet_types, vec![SubnetType::PrivateWithEgress]);
        assert_eq!(conf.endpoint_access, EndpointAccess::PublicAndPrivate);
    }

    #[test]
    fn test_addon_chart_order() {
        let chart = |name: &str| HelmChart {
            name: name.to_string(),
            namespace: "kube-system".to_string(),
            release: name.to_string(),
            repository: "https://charts.example.com".to_string(),
            values: None,
            version: "1.0.0".to_string(),
        };
        let addons = AddonsConf {
            karpenter: Some(chart("karpenter")),
            grafana: Some(chart("k8s-monitoring")),
            aws_load_balancer: Some(chart("aws-load-balancer-controller")),
            ..AddonsConf::default()
        };
        let names: Vec<_> = addons.charts().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["grafana", "karpenter", "aws-load-balancer"]);
    }

    #[test]
    fn test_serialization_omits_absent_fields() {
        let sqs = SqsConf {
            name: "interrupts".to_string(),
            retention: None,
            rules: vec![],
            custom_policies: vec![],
            tags: Tags::new(),
        };
        let json = Materializer::to_json(&sqs).unwrap();
        assert!(!json.contains("retention"));
    }
}
