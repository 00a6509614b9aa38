//! CLI command definitions.
//!
//! Each subcommand resolves documents through the same [`source::SourceArgs`]:
//! a resource directory laid out as `{environment}/{version}/...` and an
//! optional context file.

use clap::{Parser, Subcommand};

pub mod apply;
pub mod plan;
pub mod render;
pub mod source;

/// Strata - resolved configuration and dependency-ordered builds
#[derive(Parser)]
#[command(name = "strata")]
#[command(version, about = "Strata - resolved configuration and dependency-ordered builds")]
#[command(long_about = r#"
Strata resolves environment/version specific infrastructure documents and
builds the resources they describe in dependency order.

COMMANDS:
  render  → Print a resolved document
  plan    → Print the build order and partitions of a stack
  apply   → Build a stack (dry run only)

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid input
  3 - Build failure
"#)]
pub struct Cli {
    /// Enable debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print a resolved document
    Render(render::RenderArgs),

    /// Print the topological order and partitions of a stack
    Plan(plan::PlanArgs),

    /// Build a stack
    Apply(apply::ApplyArgs),
}

/// Errors the CLI maps onto exit codes.
#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Build failed: {failed} of {total} units have no handle")]
    BuildFailed { failed: usize, total: usize },
}
