//! Validated dependency graph over resource units.
//!
//! Edges run from a dependency to its dependent. Construction checks, in
//! order, for duplicate ids and zero weights, then dependencies on unknown
//! ids, then cycles, so a [`BuildGraph`] value is always a DAG with a fixed
//! topological order whose units each carry a positive weight.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::unit::ResourceUnit;

/// A validated DAG of resource units with a deterministic build order.
#[derive(Debug, Clone)]
pub struct BuildGraph {
    /// Units in declaration order; node `i` of `graph` is `units[i]`.
    units: Vec<ResourceUnit>,
    node_map: HashMap<String, NodeIndex>,
    graph: DiGraph<usize, ()>,
    /// Declaration indices in topological order.
    order: Vec<usize>,
}

impl BuildGraph {
    /// Validate `units` and compute their build order.
    ///
    /// Ties between units that become ready at the same time are broken by
    /// declaration order, so the same input always yields the same order.
    pub fn new(units: Vec<ResourceUnit>) -> CoreResult<Self> {
        let mut graph = DiGraph::with_capacity(units.len(), 0);
        let mut node_map = HashMap::with_capacity(units.len());

        for (i, unit) in units.iter().enumerate() {
            if node_map.contains_key(&unit.id) {
                return Err(CoreError::DuplicateUnit(unit.id.clone()));
            }
            if unit.weight == 0 {
                return Err(CoreError::InvalidWeight(unit.id.clone()));
            }
            node_map.insert(unit.id.clone(), graph.add_node(i));
        }

        for unit in &units {
            let to = node_map[&unit.id];
            for dependency in &unit.depends_on {
                let from = node_map.get(dependency).ok_or_else(|| {
                    CoreError::UnknownDependency {
                        unit: unit.id.clone(),
                        dependency: dependency.clone(),
                    }
                })?;
                graph.add_edge(*from, to, ());
            }
        }

        let mut built = Self {
            units,
            node_map,
            graph,
            order: Vec::new(),
        };
        built.check_acyclic()?;
        built.order = built.topological_order();
        debug!("Build order: {}", built.order_ids().join(", "));
        Ok(built)
    }

    fn check_acyclic(&self) -> CoreResult<()> {
        let cyclic = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0])
            })
            .min_by_key(|scc| scc.iter().map(|n| n.index()).min());

        match cyclic {
            Some(scc) => Err(CoreError::CyclicDependency {
                units: self.cycle_path(&scc),
            }),
            None => Ok(()),
        }
    }

    /// Walk one concrete cycle inside a strongly connected component,
    /// returned as ids with the first id repeated at the end.
    fn cycle_path(&self, scc: &[NodeIndex]) -> Vec<String> {
        let members: HashSet<NodeIndex> = scc.iter().copied().collect();
        let mut path: Vec<NodeIndex> = Vec::new();
        let mut current = scc.iter().copied().min_by_key(|n| n.index());

        while let Some(node) = current {
            if let Some(start) = path.iter().position(|n| *n == node) {
                let mut ids: Vec<String> = path[start..]
                    .iter()
                    .map(|n| self.units[n.index()].id.clone())
                    .collect();
                ids.push(self.units[node.index()].id.clone());
                return ids;
            }
            path.push(node);
            current = self
                .graph
                .neighbors_directed(node, Direction::Outgoing)
                .filter(|n| members.contains(n))
                .min_by_key(|n| n.index());
        }

        path.iter()
            .map(|n| self.units[n.index()].id.clone())
            .collect()
    }

    /// Kahn's algorithm with a min-heap on declaration index.
    fn topological_order(&self) -> Vec<usize> {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|n| self.graph.neighbors_directed(n, Direction::Incoming).count())
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(self.units.len());
        while let Some(Reverse(i)) = ready.pop() {
            order.push(i);
            for next in self
                .graph
                .neighbors_directed(NodeIndex::new(i), Direction::Outgoing)
            {
                let degree = &mut in_degree[next.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(next.index()));
                }
            }
        }
        order
    }

    /// Units in topological order.
    pub fn order(&self) -> Vec<&ResourceUnit> {
        self.order.iter().map(|i| &self.units[*i]).collect()
    }

    /// Unit ids in topological order.
    pub fn order_ids(&self) -> Vec<&str> {
        self.order.iter().map(|i| self.units[*i].id.as_str()).collect()
    }

    /// Units in declaration order.
    pub fn units(&self) -> &[ResourceUnit] {
        &self.units
    }

    pub fn unit(&self, id: &str) -> Option<&ResourceUnit> {
        self.node_map.get(id).map(|n| &self.units[n.index()])
    }

    /// Position of `id` in the topological order.
    pub fn position(&self, id: &str) -> Option<usize> {
        let node = self.node_map.get(id)?;
        self.order.iter().position(|i| *i == node.index())
    }

    /// Direct dependencies of `id`, in declaration order.
    pub fn dependencies(&self, id: &str) -> CoreResult<Vec<&str>> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Units that directly depend on `id`, in declaration order.
    pub fn dependents(&self, id: &str) -> CoreResult<Vec<&str>> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Every unit that depends on `id` directly or indirectly, in topological order.
    pub fn transitive_dependents(&self, id: &str) -> CoreResult<Vec<&str>> {
        let start = *self
            .node_map
            .get(id)
            .ok_or_else(|| CoreError::UnitNotFound(id.to_string()))?;

        let mut seen: HashSet<usize> = HashSet::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
                if seen.insert(next.index()) {
                    stack.push(next);
                }
            }
        }

        Ok(self
            .order
            .iter()
            .filter(|i| seen.contains(i))
            .map(|i| self.units[*i].id.as_str())
            .collect())
    }

    fn neighbors(&self, id: &str, direction: Direction) -> CoreResult<Vec<&str>> {
        let node = *self
            .node_map
            .get(id)
            .ok_or_else(|| CoreError::UnitNotFound(id.to_string()))?;
        let mut indices: Vec<usize> = self
            .graph
            .neighbors_directed(node, direction)
            .map(|n| n.index())
            .collect();
        indices.sort_unstable();
        indices.dedup();
        Ok(indices
            .into_iter()
            .map(|i| self.units[i].id.as_str())
            .collect())
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::ResourceKind;

    fn unit(id: &str, deps: &[&str]) -> ResourceUnit {
        ResourceUnit::new(id, ResourceKind::Network).with_dependencies(deps.iter().copied())
    }

    #[test]
    fn test_order_respects_dependencies() {
        let graph = BuildGraph::new(vec![
            unit("addons", &["cluster", "nodes"]),
            unit("cluster", &["network"]),
            unit("nodes", &["cluster"]),
            unit("network", &[]),
        ])
        .unwrap();
        assert_eq!(graph.order_ids(), vec!["network", "cluster", "nodes", "addons"]);
    }

    #[test]
    fn test_ties_follow_declaration_order() {
        let graph = BuildGraph::new(vec![
            unit("c", &[]),
            unit("a", &[]),
            unit("b", &["c"]),
            unit("d", &[]),
        ])
        .unwrap();
        assert_eq!(graph.order_ids(), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_duplicate_unit() {
        let err = BuildGraph::new(vec![unit("a", &[]), unit("a", &[])]).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateUnit(id) if id == "a"));
    }

    #[test]
    fn test_zero_weight_rejected() {
        let units: Vec<ResourceUnit> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|id| unit(id, &[]).with_weight(0))
            .collect();
        let err = BuildGraph::new(units).unwrap_err();
        assert!(matches!(&err, CoreError::InvalidWeight(id) if id == "a"));
        assert!(err.is_validation());
    }

    #[test]
    fn test_unknown_dependency() {
        let err = BuildGraph::new(vec![unit("a", &["ghost"])]).unwrap_err();
        match err {
            CoreError::UnknownDependency { unit, dependency } => {
                assert_eq!(unit, "a");
                assert_eq!(dependency, "ghost");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cycle_lists_participants() {
        let err = BuildGraph::new(vec![
            unit("root", &[]),
            unit("a", &["root", "c"]),
            unit("b", &["a"]),
            unit("c", &["b"]),
        ])
        .unwrap_err();
        match &err {
            CoreError::CyclicDependency { units } => {
                assert_eq!(units, &vec!["a", "b", "c", "a"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.to_string(), "Circular dependency detected: a → b → c → a");
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let err = BuildGraph::new(vec![unit("a", &["a"])]).unwrap_err();
        assert!(matches!(err, CoreError::CyclicDependency { units } if units == vec!["a", "a"]));
    }

    #[test]
    fn test_queries() {
        let graph = BuildGraph::new(vec![
            unit("network", &[]),
            unit("cluster", &["network"]),
            unit("queue", &["cluster"]),
            unit("nodes", &["cluster", "queue"]),
            unit("dns", &[]),
        ])
        .unwrap();

        assert_eq!(graph.len(), 5);
        assert_eq!(graph.dependencies("nodes").unwrap(), vec!["cluster", "queue"]);
        assert_eq!(graph.dependents("cluster").unwrap(), vec!["queue", "nodes"]);
        assert_eq!(
            graph.transitive_dependents("network").unwrap(),
            vec!["cluster", "queue", "nodes"]
        );
        assert!(graph.transitive_dependents("dns").unwrap().is_empty());
        assert_eq!(graph.position("dns"), Some(4));
        assert!(matches!(graph.dependents("nope"), Err(CoreError::UnitNotFound(_))));
    }
}
