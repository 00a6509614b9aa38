//! Arguments and helpers shared by every command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use strata_core::ResourceUnit;
use strata_iac::{DocumentSource, PlatformBlueprint, StackManifest};
use strata_templates::{
    Environment, FsLoader, TemplateResolver, VariableContext, Variables, Version,
};

use super::CliError;

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Root directory of the `{environment}/{version}` document tree
    #[arg(short, long, env = "STRATA_RESOURCES", default_value = "resources")]
    pub resources: PathBuf,

    /// Context file (YAML or JSON) with the host and hosted scopes
    #[arg(short, long, env = "STRATA_CONTEXT")]
    pub context: Option<PathBuf>,

    /// Environment to resolve for (defaults to the context's host environment)
    #[arg(short, long)]
    pub environment: Option<String>,

    /// Configuration version to resolve for (defaults to the context's host version)
    #[arg(long = "version", value_name = "VERSION")]
    pub layout: Option<String>,

    /// Variable override, `name=value`; may be repeated
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub overrides: Vec<String>,
}

/// Everything needed to build a [`DocumentSource`].
pub struct Workspace {
    pub context: VariableContext,
    pub resolver: TemplateResolver,
    pub environment: Environment,
    pub version: Version,
    pub overrides: Variables,
}

impl Workspace {
    pub fn open(args: &SourceArgs) -> Result<Self> {
        let context = match &args.context {
            Some(path) => VariableContext::from_path(path)
                .with_context(|| format!("Failed to load context {}", path.display()))?,
            None => VariableContext::default(),
        }
        .with_env_overlay(std::env::vars())?;

        let environment: Environment = match &args.environment {
            Some(value) => value.parse()?,
            None => context.host().environment.ok_or_else(|| {
                CliError::InvalidInput(
                    "no environment given and the context has no host environment".to_string(),
                )
            })?,
        };
        let version: Version = match &args.layout {
            Some(value) => value.parse()?,
            None => context.host().version.ok_or_else(|| {
                CliError::InvalidInput(
                    "no version given and the context has no host version".to_string(),
                )
            })?,
        };

        let mut overrides = Variables::new();
        for pair in &args.overrides {
            let (name, value) = pair.split_once('=').ok_or_else(|| {
                CliError::InvalidInput(format!("override '{}' is not NAME=VALUE", pair))
            })?;
            overrides.insert(name.trim().to_string(), value.to_string().into());
        }

        debug!(
            "Resolving from {} for {}/{}",
            args.resources.display(),
            environment,
            version
        );
        Ok(Self {
            context,
            resolver: TemplateResolver::new(Arc::new(FsLoader::new(&args.resources))),
            environment,
            version,
            overrides,
        })
    }

    pub fn source(&self) -> DocumentSource<'_> {
        DocumentSource::new(&self.resolver, &self.context, self.environment, self.version)
            .with_overrides(self.overrides.clone())
    }

    /// Units and ceiling of a stack document.
    ///
    /// With `blueprint` the document is a platform document, otherwise a
    /// stack manifest.
    pub fn stack(&self, document: &str, blueprint: bool) -> Result<(Vec<ResourceUnit>, Option<usize>)> {
        let source = self.source();
        if blueprint {
            let platform = PlatformBlueprint::new(&source).resolve(document)?;
            Ok((platform.units()?, platform.ceiling()))
        } else {
            let manifest = StackManifest::load(&source, document)?;
            Ok((manifest.units(&source)?, manifest.ceiling))
        }
    }
}
