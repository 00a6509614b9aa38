//! Plan command - Print the build order and partitions of a stack.

use anyhow::Result;
use clap::Args;
use serde_json::json;
use tracing::info;

use strata_core::{partition, BuildGraph, PartitionPlan, ResourceUnit};

use super::source::{SourceArgs, Workspace};

#[derive(Args)]
pub struct PlanArgs {
    /// Stack manifest, or platform document with `--blueprint`
    document: String,

    /// Read the document as a platform blueprint
    #[arg(long)]
    blueprint: bool,

    /// Partition ceiling; overrides the document's
    #[arg(long)]
    ceiling: Option<usize>,

    /// Print the plan as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    source: SourceArgs,
}

/// Validate `units` into a graph and cut it under `ceiling`, if any.
pub fn plan(
    units: Vec<ResourceUnit>,
    ceiling: Option<usize>,
) -> Result<(BuildGraph, PartitionPlan)> {
    let graph = BuildGraph::new(units)?;
    let plan = match ceiling {
        Some(ceiling) => partition(&graph, ceiling)?,
        None => PartitionPlan::single(&graph),
    };
    Ok((graph, plan))
}

pub async fn execute(args: PlanArgs) -> Result<()> {
    let workspace = Workspace::open(&args.source)?;
    let (units, ceiling) = workspace.stack(&args.document, args.blueprint)?;
    let (graph, plan) = plan(units, args.ceiling.or(ceiling))?;
    info!(
        "Planned {} units in {} partitions",
        graph.len(),
        plan.len()
    );

    if args.json {
        let output = json!({
            "order": graph.order_ids(),
            "plan": plan,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Build order:");
    for (i, unit) in graph.order().iter().enumerate() {
        let deps: Vec<&str> = unit.depends_on.iter().map(String::as_str).collect();
        if deps.is_empty() {
            println!("  {:>3}. {} ({})", i + 1, unit.id, unit.kind);
        } else {
            println!(
                "  {:>3}. {} ({}) after {}",
                i + 1,
                unit.id,
                unit.kind,
                deps.join(", ")
            );
        }
    }

    println!();
    println!("Partitions (ceiling {}):", plan.ceiling);
    for partition in &plan.partitions {
        let marker = if partition.oversized { " [oversized]" } else { "" };
        println!(
            "  {} weight {}{}: {}",
            partition.name,
            partition.weight,
            marker,
            partition.units.join(", ")
        );
    }
    for overflow in &plan.overflows {
        println!("  note: {}", overflow);
    }
    Ok(())
}
