//! A builder that provisions nothing.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use strata_core::{
    CoreError, CoreResult, ProvisionedHandle, ResolvedDependencies, ResourceBuilder, ResourceKind,
    ResourceUnit,
};
use strata_templates::VariableContext;

use crate::naming;

/// Produces deterministic ARN-style identifiers from the hosted scope.
///
/// The resource name is the unit config's `name` when it has one, otherwise
/// the unit id, prefixed with [`naming::named`]. Every handle carries the
/// identifiers of its dependencies as the `dependsOn` output.
pub struct DryRunBuilder {
    context: Arc<VariableContext>,
}

impl DryRunBuilder {
    pub fn new(context: Arc<VariableContext>) -> Self {
        Self { context }
    }

    /// The identifier `unit` would get.
    pub fn identifier(&self, unit: &ResourceUnit) -> CoreResult<String> {
        let base = unit
            .config
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(&unit.id);
        let name = naming::named(&self.context, &naming::name(&[base]))
            .map_err(|e| CoreError::build_failure(&unit.id, e))?;

        let hosted = self.context.hosted();
        let region = hosted.region.as_deref().unwrap_or("");
        let account = hosted.account.as_deref().unwrap_or("");

        Ok(match &unit.kind {
            ResourceKind::Network => format!("arn:aws:ec2:{region}:{account}:vpc/{name}"),
            ResourceKind::Compute => format!("arn:aws:eks:{region}:{account}:nodegroup/{name}"),
            ResourceKind::Identity => format!("arn:aws:iam::{account}:role/{name}"),
            ResourceKind::Messaging => format!("arn:aws:sqs:{region}:{account}:{name}"),
            ResourceKind::Storage => format!("arn:aws:s3:::{name}"),
            ResourceKind::Kubernetes => format!("arn:aws:eks:{region}:{account}:cluster/{name}"),
            ResourceKind::Addon => format!("arn:aws:eks:{region}:{account}:addon/{name}"),
            ResourceKind::Observability => {
                format!("arn:aws:cloudwatch::{account}:dashboard/{name}")
            }
            ResourceKind::Custom(kind) => format!("arn:aws:{kind}:{region}:{account}:{name}"),
        })
    }
}

#[async_trait]
impl ResourceBuilder for DryRunBuilder {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn build(
        &self,
        unit: &ResourceUnit,
        dependencies: &ResolvedDependencies,
    ) -> CoreResult<ProvisionedHandle> {
        let identifier = self.identifier(unit)?;
        debug!("Dry run of {} as {}", unit.id, identifier);

        let depends_on: Vec<Value> = dependencies
            .iter()
            .map(|h| Value::String(h.identifier.clone()))
            .collect();
        Ok(ProvisionedHandle::new(unit, identifier)
            .with_output(
                "description",
                naming::describe(&self.context, &[unit.kind.as_str(), unit.id.as_str()]),
            )
            .with_output("dependsOn", depends_on))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_templates::Scope;

    fn builder() -> DryRunBuilder {
        DryRunBuilder::new(Arc::new(VariableContext::new(
            Scope {
                id: Some("ops".to_string()),
                ..Scope::default()
            },
            Scope {
                id: Some("shop".to_string()),
                organization: Some("acme".to_string()),
                account: Some("123456789012".to_string()),
                region: Some("eu-west-1".to_string()),
                ..Scope::default()
            },
        )))
    }

    #[test]
    fn test_identifier_per_kind() {
        let builder = builder();
        let vpc = ResourceUnit::new("network", ResourceKind::Network)
            .with_config(json!({"name": "core.vpc"}));
        assert_eq!(
            builder.identifier(&vpc).unwrap(),
            "arn:aws:ec2:eu-west-1:123456789012:vpc/ops-shop-core-vpc"
        );

        let bucket = ResourceUnit::new("audit", ResourceKind::Storage);
        assert_eq!(builder.identifier(&bucket).unwrap(), "arn:aws:s3:::ops-shop-audit");
    }

    #[tokio::test]
    async fn test_build_records_dependencies() {
        let builder = builder();
        let queue = ResourceUnit::new("interrupt-queue", ResourceKind::Messaging);
        let queue_handle = builder
            .build(&queue, &ResolvedDependencies::new())
            .await
            .unwrap();
        assert_eq!(
            queue_handle.output("description"),
            Some(&json!("acme messaging interrupt-queue"))
        );

        let mut deps = ResolvedDependencies::new();
        deps.insert(Arc::new(queue_handle.clone()));
        let nodes = ResourceUnit::new("node-group-core", ResourceKind::Compute)
            .with_dependency("interrupt-queue");
        let handle = builder.build(&nodes, &deps).await.unwrap();
        assert_eq!(
            handle.output("dependsOn"),
            Some(&json!([queue_handle.identifier]))
        );
    }

    #[tokio::test]
    async fn test_build_fails_without_hosted_id() {
        let builder = DryRunBuilder::new(Arc::new(VariableContext::default()));
        let unit = ResourceUnit::new("network", ResourceKind::Network);
        let err = builder
            .build(&unit, &ResolvedDependencies::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::BuildFailure { unit, .. } if unit == "network"));
    }
}
