//! Apply command - Build a stack with the dry-run builder.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

use strata_core::{BuildExecutor, BuildReport, BuilderRegistry, FailureReason};
use strata_iac::DryRunBuilder;

use super::plan::plan;
use super::source::{SourceArgs, Workspace};
use super::CliError;

#[derive(Args)]
pub struct ApplyArgs {
    /// Stack manifest, or platform document with `--blueprint`
    document: String,

    /// Read the document as a platform blueprint
    #[arg(long)]
    blueprint: bool,

    /// Build with identifiers derived from the context instead of a cloud API
    #[arg(long)]
    dry_run: bool,

    /// Partition ceiling; overrides the document's
    #[arg(long)]
    ceiling: Option<usize>,

    /// Maximum number of units built at the same time
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Write the build report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,

    #[command(flatten)]
    source: SourceArgs,
}

pub async fn execute(args: ApplyArgs) -> Result<()> {
    if !args.dry_run {
        return Err(CliError::InvalidInput(
            "no provisioner is configured; run with --dry-run".to_string(),
        )
        .into());
    }

    let workspace = Workspace::open(&args.source)?;
    let (units, ceiling) = workspace.stack(&args.document, args.blueprint)?;
    let (graph, plan) = plan(units, args.ceiling.or(ceiling))?;

    let builder = Arc::new(DryRunBuilder::new(Arc::new(workspace.context.clone())));
    let registry = BuilderRegistry::new().with_fallback(builder);
    let mut executor = BuildExecutor::new(Arc::new(registry));
    if let Some(limit) = args.max_concurrency {
        if limit == 0 {
            return Err(CliError::InvalidInput("max concurrency must be positive".to_string()).into());
        }
        executor = executor.with_max_concurrency(limit);
    }

    info!("Applying {} units (dry run)", graph.len());
    let report = executor.build_partitioned(&graph, &plan).await?;

    if let Some(path) = &args.report {
        report.save(path)?;
        info!("Report written to {}", path.display());
    }
    print_report(&report);

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::BuildFailed {
            failed: report.failed.len(),
            total: report.order.len(),
        }
        .into())
    }
}

fn print_report(report: &BuildReport) {
    println!("Build {} ({} partitions)", report.build_id, report.partitions);
    for handle in &report.succeeded {
        println!("  ok        {} -> {}", handle.unit_id, handle.identifier);
    }
    for failure in &report.failed {
        match &failure.reason {
            FailureReason::Failed { message } => {
                println!("  failed    {}: {}", failure.unit, message)
            }
            FailureReason::Panicked { message } => {
                println!("  panicked  {}: {}", failure.unit, message)
            }
            FailureReason::Cancelled { dependency } => {
                println!("  cancelled {} (after {})", failure.unit, dependency)
            }
        }
    }
    for overflow in &report.overflows {
        warn!("{}", overflow);
    }
}
