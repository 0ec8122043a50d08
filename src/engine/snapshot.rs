// JSON snapshots of the raw graph state, used for share links and templates
use crate::engine::error::{GraphError, Result};
use crate::engine::graph::LayerGraph;
use crate::engine::node::{NodeId, Position};
use crate::engine::params;
use crate::engine::presets::ModelTemplate;
use crate::engine::types::DatasetDescriptor;
use crate::schemas::graph::{GraphSnapshot, NodeSnapshot};
use std::collections::BTreeSet;

pub fn to_snapshot(graph: &LayerGraph) -> GraphSnapshot {
    let nodes = graph
        .nodes()
        .map(|node| NodeSnapshot {
            id: node.id(),
            kind: node.kind(),
            parent_ids: node.parents().iter().copied().collect(),
            child_ids: node.children().iter().copied().collect(),
            params: node.explicit_params().clone(),
            x: node.position.x,
            y: node.position.y,
            activation: node.activation(),
        })
        .collect();

    GraphSnapshot {
        nodes,
        circular_edges: graph.circular_edges().to_vec(),
        input: graph.input(),
        output: graph.output(),
    }
}

pub fn to_json(graph: &LayerGraph) -> Result<String> {
    Ok(serde_json::to_string(&to_snapshot(graph))?)
}

pub fn parse(json: &str) -> Result<GraphSnapshot> {
    Ok(serde_json::from_str(json)?)
}

/// Rebuilds `target` from `snapshot` with the recorded ids. Wires are replayed
/// through `connect`, so a snapshot describing an invalid graph is rejected.
/// `target` is only replaced once the whole snapshot has loaded.
pub fn from_snapshot(snapshot: &GraphSnapshot, target: &mut LayerGraph) -> Result<()> {
    let mut staged = LayerGraph::new();

    for node in &snapshot.nodes {
        staged.insert_node(node.id, node.kind, Position::new(node.x, node.y))?;
        for (name, value) in node.params.iter() {
            if params::spec(node.kind, name).is_none() {
                log::warn!(
                    "Ignoring unknown parameter `{}` on {} node {}",
                    name,
                    node.kind,
                    node.id
                );
                continue;
            }
            staged.set_param(node.id, name, value.clone())?;
        }
        staged.set_activation(node.id, node.activation)?;
    }

    // Each wire may be listed on either end or both
    let mut edges: BTreeSet<(NodeId, NodeId)> = BTreeSet::new();
    for node in &snapshot.nodes {
        edges.extend(node.parent_ids.iter().map(|p| (*p, node.id)));
        edges.extend(node.child_ids.iter().map(|c| (node.id, *c)));
    }
    for (source, dest) in edges {
        if !staged.contains(source) || !staged.contains(dest) {
            return Err(GraphError::MalformedSnapshot(format!(
                "wire {} -> {} references a missing node",
                source, dest
            )));
        }
        staged.connect(source, dest)?;
    }

    for edge in &snapshot.circular_edges {
        staged.add_circular_edge(edge.source, edge.dest, edge.label.clone())?;
    }

    for (recorded, actual, role) in [
        (snapshot.input, staged.input(), "input"),
        (snapshot.output, staged.output(), "output"),
    ] {
        if recorded.is_some() && recorded != actual {
            return Err(GraphError::MalformedSnapshot(format!(
                "recorded {} {:?} does not match the loaded blocks",
                role, recorded
            )));
        }
    }

    *target = staged;
    Ok(())
}

/// Loads `json`, or the default template when it cannot be loaded.
pub fn load_or_default(json: &str, dataset: &DatasetDescriptor) -> LayerGraph {
    let mut graph = LayerGraph::new();
    let loaded = parse(json).and_then(|snapshot| from_snapshot(&snapshot, &mut graph));
    if let Err(e) = loaded {
        log::warn!("Snapshot rejected, loading the default template: {}", e);
        if let Err(e) = ModelTemplate::Default.build(&mut graph, dataset) {
            log::error!("Default template failed to build: {}", e);
            graph.clear();
        }
    }
    graph
}
