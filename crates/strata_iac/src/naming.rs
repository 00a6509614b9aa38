//! Resource naming conventions.
//!
//! Internal ids are dot-separated (`eks.node.group`), cloud resource names are
//! dash-separated (`eks-node-group`), and names that must be unique across
//! deployments are prefixed with the synthesizer name and the hosted id.

use strata_templates::VariableContext;

use crate::error::{IacError, IacResult};

/// Join `parts` with `.`, turning every `-` into `.` as well.
pub fn id(parts: &[&str]) -> String {
    parts.join(".").replace('-', ".")
}

/// Like [`id`], but dash-separated.
pub fn name(parts: &[&str]) -> String {
    id(parts).replace('.', "-")
}

/// `"{organization} {environment} {parts...}"` for the hosted scope.
///
/// Organization and environment fall back to the host scope; whatever is
/// still missing is left out.
pub fn describe(context: &VariableContext, parts: &[&str]) -> String {
    let organization = context
        .hosted()
        .organization
        .clone()
        .or_else(|| context.host().organization.clone());
    let environment = context
        .hosted()
        .environment
        .or(context.host().environment)
        .map(|e| e.to_string());

    organization
        .into_iter()
        .chain(environment)
        .chain(parts.iter().map(|p| p.to_string()))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Export name: synthesizer name, hosted id and suffix run together.
pub fn exported(context: &VariableContext, suffix: &str) -> IacResult<String> {
    let (prefix, hosted) = prefix_and_hosted(context)?;
    Ok(format!("{}{}{}", prefix, hosted, suffix))
}

/// Deployment-unique resource name, `{synthesizer}-{hosted id}-{suffix}`.
pub fn named(context: &VariableContext, suffix: &str) -> IacResult<String> {
    let (prefix, hosted) = prefix_and_hosted(context)?;
    Ok(format!("{}-{}-{}", prefix, hosted, suffix))
}

fn prefix_and_hosted(context: &VariableContext) -> IacResult<(&str, &str)> {
    let prefix = context
        .synthesizer_name()
        .ok_or(IacError::MissingContext("host:id"))?;
    let hosted = context
        .hosted()
        .id
        .as_deref()
        .ok_or(IacError::MissingContext("hosted:id"))?;
    Ok((prefix, hosted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_templates::{Environment, Scope};

    fn context() -> VariableContext {
        VariableContext::new(
            Scope {
                id: Some("ops".to_string()),
                organization: Some("acme".to_string()),
                ..Scope::default()
            },
            Scope {
                id: Some("shop".to_string()),
                environment: Some(Environment::Prototype),
                ..Scope::default()
            },
        )
    }

    #[test]
    fn test_id_and_name() {
        assert_eq!(id(&["eks", "node-group", "core"]), "eks.node.group.core");
        assert_eq!(name(&["eks", "node-group", "core"]), "eks-node-group-core");
        assert_eq!(id(&[]), "");
    }

    #[test]
    fn test_describe_falls_back_to_host() {
        assert_eq!(
            describe(&context(), &["interrupt", "queue"]),
            "acme prototype interrupt queue"
        );
        assert_eq!(describe(&VariableContext::default(), &["vpc"]), "vpc");
    }

    #[test]
    fn test_named_uses_host_id_without_synthesizer() {
        assert_eq!(named(&context(), "vpc").unwrap(), "ops-shop-vpc");
        assert_eq!(exported(&context(), "Arn").unwrap(), "opsshopArn");

        let synthesized = context().with_synthesizer("synth");
        assert_eq!(named(&synthesized, "vpc").unwrap(), "synth-shop-vpc");
    }

    #[test]
    fn test_named_requires_hosted_id() {
        let context = VariableContext::new(
            Scope {
                id: Some("ops".to_string()),
                ..Scope::default()
            },
            Scope::default(),
        );
        assert!(matches!(
            named(&context, "vpc"),
            Err(IacError::MissingContext("hosted:id"))
        ));
        assert!(matches!(
            exported(&VariableContext::default(), "x"),
            Err(IacError::MissingContext("host:id"))
        ));
    }
}
