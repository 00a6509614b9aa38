//! Build reports with persistence support.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::partition::PartitionOverflow;
use crate::unit::ProvisionedHandle;

/// Build state.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    /// Build has not started
    #[default]
    Pending,
    /// Units are being built
    Running,
    /// Every unit was built
    Completed,
    /// At least one unit failed or was cancelled
    Failed,
}

/// Why a unit has no handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    /// The builder returned an error.
    Failed { message: String },
    /// The builder panicked.
    Panicked { message: String },
    /// Never started because a dependency has no handle.
    Cancelled { dependency: String },
}

/// A unit that did not produce a handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    pub unit: String,
    #[serde(flatten)]
    pub reason: FailureReason,
}

impl UnitFailure {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.reason, FailureReason::Cancelled { .. })
    }

    /// The failure as a [`CoreError`].
    pub fn error(&self) -> CoreError {
        match &self.reason {
            FailureReason::Failed { message } | FailureReason::Panicked { message } => {
                CoreError::BuildFailure {
                    unit: self.unit.clone(),
                    message: message.clone(),
                }
            }
            FailureReason::Cancelled { dependency } => CoreError::DependencyFailed {
                unit: self.unit.clone(),
                dependency: dependency.clone(),
            },
        }
    }
}

/// Outcome of one build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub build_id: String,
    pub state: BuildState,
    /// Unit ids in topological order.
    pub order: Vec<String>,
    /// Number of partitions built, in sequence.
    pub partitions: usize,
    #[serde(default)]
    pub overflows: Vec<PartitionOverflow>,
    /// Handles of built units, in topological order.
    pub succeeded: Vec<ProvisionedHandle>,
    /// Failed and cancelled units, in topological order.
    pub failed: Vec<UnitFailure>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BuildReport {
    pub fn new(order: Vec<String>) -> Self {
        Self {
            build_id: Uuid::new_v4().to_string(),
            state: BuildState::Pending,
            order,
            partitions: 0,
            overflows: Vec::new(),
            succeeded: Vec::new(),
            failed: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == BuildState::Completed
    }

    pub fn handle(&self, id: &str) -> Option<&ProvisionedHandle> {
        self.succeeded.iter().find(|h| h.unit_id == id)
    }

    pub fn failure(&self, id: &str) -> Option<&UnitFailure> {
        self.failed.iter().find(|f| f.unit == id)
    }

    /// Units whose builder actually ran and failed, excluding cancellations.
    pub fn root_failures(&self) -> impl Iterator<Item = &UnitFailure> {
        self.failed.iter().filter(|f| !f.is_cancelled())
    }

    /// Put handles and failures back into topological order.
    pub(crate) fn sort_by_order(&mut self) {
        let position = |id: &str| self.order.iter().position(|o| o == id).unwrap_or(usize::MAX);
        let mut succeeded = std::mem::take(&mut self.succeeded);
        let mut failed = std::mem::take(&mut self.failed);
        succeeded.sort_by_key(|h| position(&h.unit_id));
        failed.sort_by_key(|f| position(&f.unit));
        self.succeeded = succeeded;
        self.failed = failed;
    }

    /// Save the report as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> CoreResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::Serialization(e.to_string()))?;
        fs::write(path, json)?;
        debug!("Saved build report to {:?}", path);
        Ok(())
    }

    /// Load a report saved with [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| CoreError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{ResourceKind, ResourceUnit};
    use tempfile::TempDir;

    #[test]
    fn test_report_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("reports").join("build.json");

        let mut report = BuildReport::new(vec!["vpc".to_string(), "cluster".to_string()]);
        report.state = BuildState::Failed;
        report.succeeded.push(ProvisionedHandle::new(
            &ResourceUnit::new("vpc", ResourceKind::Network),
            "vpc-1",
        ));
        report.failed.push(UnitFailure {
            unit: "cluster".to_string(),
            reason: FailureReason::Failed {
                message: "quota exceeded".to_string(),
            },
        });
        report.save(&path).unwrap();

        let loaded = BuildReport::load(&path).unwrap();
        assert_eq!(loaded.build_id, report.build_id);
        assert_eq!(loaded.state, BuildState::Failed);
        assert_eq!(loaded.handle("vpc").unwrap().identifier, "vpc-1");
        assert_eq!(loaded.failed, report.failed);

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"reason\": \"failed\""));
    }

    #[test]
    fn test_failure_error_mapping() {
        let cancelled = UnitFailure {
            unit: "nodes".to_string(),
            reason: FailureReason::Cancelled {
                dependency: "cluster".to_string(),
            },
        };
        assert!(cancelled.is_cancelled());
        assert!(matches!(
            cancelled.error(),
            CoreError::DependencyFailed { unit, dependency } if unit == "nodes" && dependency == "cluster"
        ));
    }
}
