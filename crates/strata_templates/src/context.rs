//! The ambient variables every template is rendered against.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use strata_config::Materializer;

use crate::error::{TemplateError, TemplateResult};

/// Flat variable map used for substitution.
pub type Variables = BTreeMap<String, Value>;

/// Prefix for environment variables that feed a [`VariableContext`].
pub const ENV_PREFIX: &str = "STRATA_";

/// Deployment environment a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Bootstrap,
    Prototype,
    Production,
}

impl Environment {
    pub const ALL: [Environment; 3] = [Self::Bootstrap, Self::Prototype, Self::Production];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bootstrap => "bootstrap",
            Self::Prototype => "prototype",
            Self::Production => "production",
        }
    }
}

/// Configuration layout version a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Version {
    V1,
    V2,
    V3,
}

impl Version {
    pub const ALL: [Version; 3] = [Self::V1, Self::V2, Self::V3];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
            Self::V3 => "v3",
        }
    }
}

macro_rules! lowercase_enum {
    ($ty:ident, $kind:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = TemplateError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s.trim();
                $ty::ALL
                    .into_iter()
                    .find(|v| v.as_str().eq_ignore_ascii_case(value))
                    .ok_or_else(|| TemplateError::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                        expected: $ty::ALL.iter().map(|v| v.as_str().to_string()).collect(),
                    })
            }
        }
    };
}

lowercase_enum!(Environment, "environment");
lowercase_enum!(Version, "version");

/// One side of the deployment: the account that runs the synthesis (`host`)
/// or the account being provisioned (`hosted`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub id: Option<String>,
    pub organization: Option<String>,
    pub account: Option<String>,
    pub region: Option<String>,
    pub name: Option<String>,
    pub alias: Option<String>,
    pub environment: Option<Environment>,
    pub version: Option<Version>,
    pub domain: Option<String>,
}

impl Scope {
    const FIELDS: [&'static str; 9] = [
        "id",
        "organization",
        "account",
        "region",
        "name",
        "alias",
        "environment",
        "version",
        "domain",
    ];

    fn get(&self, field: &str) -> Option<String> {
        match field {
            "id" => self.id.clone(),
            "organization" => self.organization.clone(),
            "account" => self.account.clone(),
            "region" => self.region.clone(),
            "name" => self.name.clone(),
            "alias" => self.alias.clone(),
            "environment" => self.environment.map(|e| e.to_string()),
            "version" => self.version.map(|v| v.to_string()),
            "domain" => self.domain.clone(),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: String) -> TemplateResult<()> {
        match field {
            "id" => self.id = Some(value),
            "organization" => self.organization = Some(value),
            "account" => self.account = Some(value),
            "region" => self.region = Some(value),
            "name" => self.name = Some(value),
            "alias" => self.alias = Some(value),
            "environment" => self.environment = Some(value.parse()?),
            "version" => self.version = Some(value.parse()?),
            "domain" => self.domain = Some(value),
            other => {
                return Err(TemplateError::InvalidRequest(format!(
                    "unknown scope field '{}'",
                    other
                )))
            }
        }
        Ok(())
    }

    fn insert_into(&self, prefix: &str, vars: &mut Variables) {
        for field in Self::FIELDS {
            if let Some(value) = self.get(field) {
                vars.insert(format!("{}:{}", prefix, field), Value::String(value));
            }
        }
    }
}

/// Immutable ambient context for template substitution.
///
/// Built once at startup, from a context file, the process environment, or
/// both, and then passed by reference into every resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableContext {
    #[serde(default)]
    host: Scope,
    #[serde(default)]
    hosted: Scope,
    home: Option<String>,
    synthesizer: Option<String>,
    #[serde(default)]
    variables: Variables,
}

impl VariableContext {
    pub fn new(host: Scope, hosted: Scope) -> Self {
        Self {
            host,
            hosted,
            ..Self::default()
        }
    }

    pub fn with_home(mut self, home: impl Into<String>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn with_synthesizer(mut self, name: impl Into<String>) -> Self {
        self.synthesizer = Some(name.into());
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Load a context from a JSON or YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> TemplateResult<Self> {
        Ok(Materializer::read_path(path)?)
    }

    /// Build a context from the `STRATA_*` variables of this process.
    pub fn from_env() -> TemplateResult<Self> {
        Self::default().with_env_overlay(std::env::vars())
    }

    /// Layer `STRATA_*` variables on top of this context.
    ///
    /// `STRATA_HOST_<FIELD>` and `STRATA_HOSTED_<FIELD>` set scope fields,
    /// `STRATA_HOME` and `STRATA_SYNTHESIZER` set their namesakes, and
    /// `STRATA_VAR_<NAME>` adds the extra variable `<name>`. Other variables
    /// are ignored.
    pub fn with_env_overlay<I, K, V>(mut self, vars: I) -> TemplateResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let Some(key) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.into();

            if let Some(field) = key.strip_prefix("HOSTED_") {
                self.hosted.set(&field.to_ascii_lowercase(), value)?;
            } else if let Some(field) = key.strip_prefix("HOST_") {
                self.host.set(&field.to_ascii_lowercase(), value)?;
            } else if let Some(name) = key.strip_prefix("VAR_") {
                self.variables
                    .insert(name.to_ascii_lowercase(), Value::String(value));
            } else if key == "HOME" {
                self.home = Some(value);
            } else if key == "SYNTHESIZER" {
                self.synthesizer = Some(value);
            } else {
                debug!("Ignoring environment variable {}{}", ENV_PREFIX, key);
            }
        }
        Ok(self)
    }

    pub fn host(&self) -> &Scope {
        &self.host
    }

    pub fn hosted(&self) -> &Scope {
        &self.hosted
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Name of the synthesizer, falling back to the host id.
    pub fn synthesizer_name(&self) -> Option<&str> {
        self.synthesizer.as_deref().or(self.host.id.as_deref())
    }

    /// The default variable map: `home` (`/` unless set), `synthesizer:name`, every set
    /// `host:<field>` and `hosted:<field>`, then the extra variables.
    pub fn defaults(&self) -> Variables {
        let mut vars = Variables::new();
        let home = self.home.as_deref().unwrap_or("/");
        vars.insert("home".to_string(), Value::String(home.to_string()));
        if let Some(name) = self.synthesizer_name() {
            vars.insert("synthesizer:name".to_string(), Value::String(name.to_string()));
        }
        self.host.insert_into("host", &mut vars);
        self.hosted.insert_into("hosted", &mut vars);
        merge(&vars, &self.variables)
    }
}

/// Layer `overrides` on top of `base`; on collision the override wins.
pub fn merge(base: &Variables, overrides: &Variables) -> Variables {
    let mut merged = base.clone();
    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Fold maps left to right, so the last map has the final say.
pub fn merge_all<'a>(maps: impl IntoIterator<Item = &'a Variables>) -> Variables {
    maps.into_iter()
        .fold(Variables::new(), |acc, next| merge(&acc, next))
}
