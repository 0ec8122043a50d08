// Deterministic linearisation of the blocks reachable from the Input
use crate::engine::error::{GraphError, Result};
use crate::engine::graph::LayerGraph;
use crate::engine::node::{LayerNode, NodeId};
use petgraph::Direction;
use petgraph::visit::Bfs;
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

/// Kahn's algorithm over the subgraph reachable from `root`. Ready nodes are
/// taken in ascending id order. Unreachable blocks are dropped silently.
pub fn topological_sort(graph: &LayerGraph, root: NodeId) -> Result<Vec<NodeId>> {
    graph.get(root)?;
    let dag = graph.dag();

    // 1. Reachability
    let mut reachable = BTreeSet::new();
    let mut bfs = Bfs::new(&dag, root);
    while let Some(id) = bfs.next(&dag) {
        reachable.insert(id);
    }

    // 2. In-degrees restricted to reachable parents
    let mut in_degree: HashMap<NodeId, usize> = reachable
        .iter()
        .map(|id| {
            let degree = dag
                .neighbors_directed(*id, Direction::Incoming)
                .filter(|parent| reachable.contains(parent))
                .count();
            (*id, degree)
        })
        .collect();

    // 3. Drain zero in-degree nodes, smallest id first
    let mut ready: BinaryHeap<Reverse<NodeId>> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| Reverse(*id))
        .collect();
    let mut sorted = Vec::with_capacity(reachable.len());

    while let Some(Reverse(id)) = ready.pop() {
        sorted.push(id);
        for child in dag.neighbors_directed(id, Direction::Outgoing) {
            if let Some(degree) = in_degree.get_mut(&child) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(child));
                }
            }
        }
    }

    if sorted.len() < reachable.len() {
        let remaining: Vec<NodeId> = reachable
            .into_iter()
            .filter(|id| !sorted.contains(id))
            .collect();
        log::error!("Topological sort stalled with {} nodes left", remaining.len());
        return Err(GraphError::CycleDetected { remaining });
    }

    Ok(sorted)
}

/// Sorted ids resolved to their blocks, the form the shape engine and code generator consume.
pub fn sorted_nodes(graph: &LayerGraph, root: NodeId) -> Result<Vec<&LayerNode>> {
    topological_sort(graph, root)?
        .into_iter()
        .map(|id| graph.get(id))
        .collect()
}
