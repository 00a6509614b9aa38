//! Concurrent, dependency-ordered build execution.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::error::{CoreError, CoreResult};
use crate::graph::BuildGraph;
use crate::partition::{Partition, PartitionPlan};
use crate::registry::BuilderRegistry;
use crate::report::{BuildReport, BuildState, FailureReason, UnitFailure};
use crate::unit::{ProvisionedHandle, ResolvedDependencies, ResourceUnit};

/// Runs builders for a validated graph.
///
/// Within a partition, a unit is spawned as soon as every dependency has a
/// handle, so independent units build concurrently. Partitions run one after
/// another. A failed unit cancels everything that depends on it, while
/// unrelated units keep going.
pub struct BuildExecutor {
    registry: Arc<BuilderRegistry>,
    max_concurrency: Option<usize>,
}

/// Per-build bookkeeping shared across partitions.
struct BuildRun<'g> {
    graph: &'g BuildGraph,
    handles: HashMap<String, Arc<ProvisionedHandle>>,
    /// Failed or cancelled units.
    failed: HashSet<String>,
    report: BuildReport,
}

type TaskOutcome = (usize, Result<CoreResult<ProvisionedHandle>, JoinError>);

impl BuildExecutor {
    /// Create a new executor with the given registry.
    pub fn new(registry: Arc<BuilderRegistry>) -> Self {
        Self {
            registry,
            max_concurrency: None,
        }
    }

    /// Limit how many builders run at the same time.
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit.max(1));
        self
    }

    /// Validate `units` and build them all.
    ///
    /// Validation failures are returned as errors before any builder runs.
    /// Builder failures are recorded in the report.
    pub async fn build(&self, units: Vec<ResourceUnit>) -> CoreResult<BuildReport> {
        let graph = BuildGraph::new(units)?;
        self.build_graph(&graph).await
    }

    /// Build an already validated graph as a single partition.
    pub async fn build_graph(&self, graph: &BuildGraph) -> CoreResult<BuildReport> {
        self.build_partitioned(graph, &PartitionPlan::single(graph))
            .await
    }

    /// Build `graph` partition by partition, in plan order.
    pub async fn build_partitioned(
        &self,
        graph: &BuildGraph,
        plan: &PartitionPlan,
    ) -> CoreResult<BuildReport> {
        self.check_plan(graph, plan)?;
        for unit in graph.units() {
            self.registry.get_required(unit)?;
        }

        let order = graph.order_ids().into_iter().map(String::from).collect();
        let mut run = BuildRun {
            graph,
            handles: HashMap::new(),
            failed: HashSet::new(),
            report: BuildReport::new(order),
        };
        run.report.state = BuildState::Running;
        run.report.started_at = Some(Utc::now());
        run.report.partitions = plan.len();
        run.report.overflows = plan.overflows.clone();

        info!(
            "Starting build {} ({} units, {} partitions)",
            run.report.build_id,
            graph.len(),
            plan.len()
        );

        for partition in &plan.partitions {
            info!(
                "Building {} [{}/{}]: {} units",
                partition.name,
                partition.index + 1,
                plan.len(),
                partition.units.len()
            );
            self.run_partition(&mut run, partition).await?;
        }

        let mut report = run.report;
        report.sort_by_order();
        report.state = if report.failed.is_empty() {
            BuildState::Completed
        } else {
            BuildState::Failed
        };
        report.completed_at = Some(Utc::now());

        if report.is_success() {
            info!("Build {} completed: {} units", report.build_id, report.succeeded.len());
        } else {
            warn!(
                "Build {} finished with {} succeeded, {} failed",
                report.build_id,
                report.succeeded.len(),
                report.failed.len()
            );
        }
        Ok(report)
    }

    /// Every graph unit must appear in exactly one partition, after its dependencies.
    fn check_plan(&self, graph: &BuildGraph, plan: &PartitionPlan) -> CoreResult<()> {
        let mut placed: HashMap<&str, usize> = HashMap::new();
        for (position, partition) in plan.partitions.iter().enumerate() {
            for id in &partition.units {
                if graph.unit(id).is_none() {
                    return Err(CoreError::UnitNotFound(id.clone()));
                }
                if placed.insert(id.as_str(), position).is_some() {
                    return Err(CoreError::InvalidPlan(format!(
                        "unit '{}' appears in more than one partition",
                        id
                    )));
                }
            }
        }
        for unit in graph.units() {
            let own = *placed.get(unit.id.as_str()).ok_or_else(|| {
                CoreError::InvalidPlan(format!("unit '{}' is in no partition", unit.id))
            })?;
            if let Some(dep) = unit
                .depends_on
                .iter()
                .find(|dep| placed.get(dep.as_str()).map_or(true, |p| *p > own))
            {
                return Err(CoreError::InvalidPlan(format!(
                    "unit '{}' is placed before its dependency '{}'",
                    unit.id, dep
                )));
            }
        }
        Ok(())
    }

    async fn run_partition(&self, run: &mut BuildRun<'_>, partition: &Partition) -> CoreResult<()> {
        let graph = run.graph;
        let mut pending: Vec<&ResourceUnit> = partition
            .units
            .iter()
            .filter_map(|id| graph.unit(id))
            .collect();
        let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();
        let mut in_flight: HashMap<usize, &ResourceUnit> = HashMap::new();
        let mut next_task = 0usize;

        loop {
            let mut i = 0;
            while i < pending.len() {
                let unit = pending[i];

                if let Some(dep) = unit.depends_on.iter().find(|d| run.failed.contains(*d)) {
                    warn!("Cancelling {}: dependency {} failed", unit.id, dep);
                    run.cancel(unit, dep);
                    pending.remove(i);
                    continue;
                }

                let ready = unit.depends_on.iter().all(|d| run.handles.contains_key(d));
                let has_capacity = self.max_concurrency.map_or(true, |max| tasks.len() < max);
                if ready && has_capacity {
                    self.spawn(&mut tasks, next_task, unit, run)?;
                    in_flight.insert(next_task, unit);
                    next_task += 1;
                    pending.remove(i);
                    continue;
                }
                i += 1;
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };

            let (task, outcome) = match joined {
                Ok(joined) => joined,
                Err(e) => {
                    error!("Build task aborted: {}", e);
                    continue;
                }
            };
            let Some(unit) = in_flight.remove(&task) else {
                continue;
            };
            match outcome {
                Ok(Ok(handle)) => {
                    info!("Unit '{}' built: {}", unit.id, handle.identifier);
                    let handle = Arc::new(handle);
                    run.report.succeeded.push(handle.as_ref().clone());
                    run.handles.insert(unit.id.clone(), handle);
                }
                Ok(Err(e)) => {
                    error!("Unit '{}' failed: {}", unit.id, e);
                    run.fail(unit, FailureReason::Failed { message: e.to_string() });
                }
                Err(e) => {
                    let message = if e.is_panic() {
                        panic_message(e)
                    } else {
                        e.to_string()
                    };
                    error!("Unit '{}' builder panicked: {}", unit.id, message);
                    run.fail(unit, FailureReason::Panicked { message });
                }
            }
        }

        // Anything left never became ready; its missing dependency was not built.
        for unit in pending {
            let missing = unit
                .depends_on
                .iter()
                .find(|d| !run.handles.contains_key(*d))
                .cloned()
                .unwrap_or_default();
            warn!("Cancelling {}: dependency {} was not built", unit.id, missing);
            run.cancel(unit, &missing);
        }
        Ok(())
    }

    fn spawn(
        &self,
        tasks: &mut JoinSet<TaskOutcome>,
        task: usize,
        unit: &ResourceUnit,
        run: &BuildRun<'_>,
    ) -> CoreResult<()> {
        let builder = self.registry.get_required(unit)?;
        let mut dependencies = ResolvedDependencies::new();
        for dep in &unit.depends_on {
            if let Some(handle) = run.handles.get(dep) {
                dependencies.insert(Arc::clone(handle));
            }
        }

        debug!(
            "Spawning builder {} for unit '{}' with {} dependencies",
            builder.name(),
            unit.id,
            dependencies.len()
        );
        let unit = unit.clone();
        // The inner task isolates builder panics from the join set.
        let inner = tokio::spawn(async move { builder.build(&unit, &dependencies).await });
        tasks.spawn(async move { (task, inner.await) });
        Ok(())
    }
}

impl BuildRun<'_> {
    fn fail(&mut self, unit: &ResourceUnit, reason: FailureReason) {
        self.failed.insert(unit.id.clone());
        self.report.failed.push(UnitFailure {
            unit: unit.id.clone(),
            reason,
        });
    }

    fn cancel(&mut self, unit: &ResourceUnit, dependency: &str) {
        self.fail(
            unit,
            FailureReason::Cancelled {
                dependency: dependency.to_string(),
            },
        );
    }
}

fn panic_message(error: JoinError) -> String {
    let payload = error.into_panic();
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "builder panicked".to_string())
}
