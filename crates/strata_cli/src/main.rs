//! Strata CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid input
//! - 3: Build failure

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use strata_config::ConfigError;
use strata_core::CoreError;
use strata_iac::IacError;
use strata_templates::TemplateError;

mod commands;

use commands::{Cli, CliError, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_INPUT: u8 = 2;
    pub const BUILD_FAILURE: u8 = 3;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("strata={},warn", level)));

    // Logging may already be initialized
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let result = match cli.command {
        Commands::Render(args) => commands::render::execute(args).await,
        Commands::Plan(args) => commands::plan::execute(args).await,
        Commands::Apply(args) => commands::apply::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<CliError>() {
            return match err {
                CliError::InvalidInput(_) => ExitCodes::INVALID_INPUT,
                CliError::BuildFailed { .. } => ExitCodes::BUILD_FAILURE,
            };
        }
        if let Some(err) = cause.downcast_ref::<IacError>() {
            return iac_code(err);
        }
        if let Some(err) = cause.downcast_ref::<CoreError>() {
            return core_code(err);
        }
        if let Some(err) = cause.downcast_ref::<TemplateError>() {
            return template_code(err);
        }
        if let Some(err) = cause.downcast_ref::<ConfigError>() {
            return config_code(err);
        }
    }
    ExitCodes::GENERAL_ERROR
}

// Transparent variants do not show up in `chain()`.

fn iac_code(err: &IacError) -> u8 {
    match err {
        IacError::MissingContext(_) | IacError::InvalidManifest { .. } => ExitCodes::INVALID_INPUT,
        IacError::Template(err) => template_code(err),
        IacError::Config(err) => config_code(err),
        IacError::Core(err) => core_code(err),
    }
}

fn core_code(err: &CoreError) -> u8 {
    match err {
        err if err.is_validation() => ExitCodes::INVALID_INPUT,
        CoreError::BuildFailure { .. } | CoreError::DependencyFailed { .. } => {
            ExitCodes::BUILD_FAILURE
        }
        _ => ExitCodes::GENERAL_ERROR,
    }
}

fn template_code(err: &TemplateError) -> u8 {
    match err {
        TemplateError::Io { .. } => ExitCodes::GENERAL_ERROR,
        TemplateError::Config(err) => config_code(err),
        _ => ExitCodes::INVALID_INPUT,
    }
}

fn config_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::Io { .. } => ExitCodes::GENERAL_ERROR,
        _ => ExitCodes::INVALID_INPUT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_typed_errors() {
        let missing = anyhow::Error::new(TemplateError::NotFound {
            path: "production/v2/network.yaml".to_string(),
        });
        assert_eq!(categorize_error(&missing), ExitCodes::INVALID_INPUT);

        let cycle = anyhow::Error::new(IacError::Core(CoreError::CyclicDependency {
            units: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        }));
        assert_eq!(categorize_error(&cycle), ExitCodes::INVALID_INPUT);

        let failed = anyhow::Error::new(CliError::BuildFailed { failed: 2, total: 5 });
        assert_eq!(categorize_error(&failed), ExitCodes::BUILD_FAILURE);

        let io = anyhow::Error::new(std::io::Error::other("disk"));
        assert_eq!(categorize_error(&io), ExitCodes::GENERAL_ERROR);
    }

    #[test]
    fn test_context_wrapped_errors_keep_category() {
        let err = anyhow::Error::new(ConfigError::Parse {
            document: "context.yaml".to_string(),
            path: None,
            line: Some(1),
            column: Some(1),
            message: "bad".to_string(),
        })
        .context("Failed to load context");
        assert_eq!(categorize_error(&err), ExitCodes::INVALID_INPUT);
    }
}
