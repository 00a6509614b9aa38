//! Splitting a build into bounded partitions.
//!
//! Provisioning platforms cap how much one deployment unit may contain. The
//! build order is cut greedily into consecutive partitions whose summed unit
//! weight stays within a ceiling. Because the cut follows the topological
//! order, every dependency lands in the same or an earlier partition.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::graph::BuildGraph;

/// One bounded slice of the build order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
    pub index: usize,
    pub name: String,
    pub units: Vec<String>,
    pub weight: usize,
    /// Holds a single unit heavier than the ceiling.
    pub oversized: bool,
}

impl Partition {
    fn open(index: usize) -> Self {
        Self {
            index,
            name: format!("partition-{}", index),
            units: Vec::new(),
            weight: 0,
            oversized: false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.units.iter().any(|u| u == id)
    }
}

/// Notice that a unit alone exceeds the ceiling. Not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionOverflow {
    pub unit: String,
    pub weight: usize,
    pub ceiling: usize,
    pub partition: usize,
}

impl std::fmt::Display for PartitionOverflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unit '{}' has weight {} above the ceiling of {}; placed alone in partition {}",
            self.unit, self.weight, self.ceiling, self.partition
        )
    }
}

/// The partitions of a build, in the order they must be built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionPlan {
    pub ceiling: usize,
    pub partitions: Vec<Partition>,
    #[serde(default)]
    pub overflows: Vec<PartitionOverflow>,
}

impl PartitionPlan {
    /// One partition holding the whole graph.
    pub fn single(graph: &BuildGraph) -> Self {
        let mut partition = Partition::open(0);
        for unit in graph.order() {
            partition.units.push(unit.id.clone());
            partition.weight += unit.weight;
        }
        Self {
            ceiling: partition.weight.max(1),
            partitions: if partition.units.is_empty() {
                Vec::new()
            } else {
                vec![partition]
            },
            overflows: Vec::new(),
        }
    }

    /// Index of the partition holding `id`.
    pub fn partition_of(&self, id: &str) -> Option<usize> {
        self.partitions
            .iter()
            .find(|p| p.contains(id))
            .map(|p| p.index)
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

/// Cut `graph`'s build order into partitions of at most `ceiling` weight.
///
/// A unit heavier than the ceiling is placed alone in a partition flagged
/// `oversized` and reported in [`PartitionPlan::overflows`].
pub fn partition(graph: &BuildGraph, ceiling: usize) -> CoreResult<PartitionPlan> {
    if ceiling == 0 {
        return Err(CoreError::InvalidCeiling);
    }

    let mut partitions: Vec<Partition> = Vec::new();
    let mut overflows = Vec::new();
    let mut current = Partition::open(0);

    for unit in graph.order() {
        if unit.weight > ceiling {
            if !current.units.is_empty() {
                let next = Partition::open(current.index + 1);
                partitions.push(std::mem::replace(&mut current, next));
            }
            let overflow = PartitionOverflow {
                unit: unit.id.clone(),
                weight: unit.weight,
                ceiling,
                partition: current.index,
            };
            warn!("Partition overflow: {}", overflow);
            overflows.push(overflow);

            current.units.push(unit.id.clone());
            current.weight = unit.weight;
            current.oversized = true;
            let next = Partition::open(current.index + 1);
            partitions.push(std::mem::replace(&mut current, next));
            continue;
        }

        if current.weight + unit.weight > ceiling && !current.units.is_empty() {
            let next = Partition::open(current.index + 1);
            partitions.push(std::mem::replace(&mut current, next));
        }
        current.units.push(unit.id.clone());
        current.weight += unit.weight;
    }

    if !current.units.is_empty() {
        partitions.push(current);
    }

    debug!(
        "Partitioned {} units into {} partitions (ceiling {})",
        graph.len(),
        partitions.len(),
        ceiling
    );
    Ok(PartitionPlan {
        ceiling,
        partitions,
        overflows,
    })
}
