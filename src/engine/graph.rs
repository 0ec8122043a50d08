// Mutable layer graph and the editing operations that keep it a DAG
use crate::engine::error::{GraphError, Result};
use crate::engine::node::{CircularEdge, LayerNode, NodeId, Position};
use crate::engine::params::ParamValue;
use crate::engine::types::{ActivationType, LayerKind};
use petgraph::algo::{has_path_connecting, is_cyclic_directed};
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which side of the anchor a spliced block is interposed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpliceSide {
    Parent,
    Child,
}

#[derive(Debug, Clone, Default)]
pub struct LayerGraph {
    nodes: BTreeMap<NodeId, LayerNode>,
    circular: Vec<CircularEdge>,
    input: Option<NodeId>,
    output: Option<NodeId>,
}

impl LayerGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Store ---

    pub fn add_node(&mut self, kind: LayerKind, position: Position) -> Result<NodeId> {
        let id = NodeId::fresh();
        self.insert_node(id, kind, position)?;
        Ok(id)
    }

    /// Places a block under a caller-chosen id; used when restoring snapshots.
    pub(crate) fn insert_node(
        &mut self,
        id: NodeId,
        kind: LayerKind,
        position: Position,
    ) -> Result<()> {
        if self.nodes.contains_key(&id) {
            return Err(GraphError::MalformedSnapshot(format!("duplicate node id {}", id)));
        }
        match kind {
            LayerKind::Input if self.input.is_some() => {
                return Err(GraphError::DuplicateEndpoint(kind));
            }
            LayerKind::Output if self.output.is_some() => {
                return Err(GraphError::DuplicateEndpoint(kind));
            }
            LayerKind::Input => self.input = Some(id),
            LayerKind::Output => self.output = Some(id),
            _ => {}
        }
        NodeId::reserve_through(id);
        self.nodes.insert(id, LayerNode::new(id, kind, position));
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&LayerNode> {
        self.nodes.get(&id)
    }

    pub fn get(&self, id: NodeId) -> Result<&LayerNode> {
        self.nodes.get(&id).ok_or(GraphError::UnknownNode(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut LayerNode> {
        self.nodes.get_mut(&id).ok_or(GraphError::UnknownNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Blocks in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &LayerNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn input(&self) -> Option<NodeId> {
        self.input
    }

    pub fn output(&self) -> Option<NodeId> {
        self.output
    }

    pub fn circular_edges(&self) -> &[CircularEdge] {
        &self.circular
    }

    /// Drops every block and circular edge. Ids already minted stay retired.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.circular.clear();
        self.input = None;
        self.output = None;
    }

    // --- Node properties ---

    pub fn set_param(&mut self, id: NodeId, name: &str, value: ParamValue) -> Result<()> {
        self.get_mut(id)?.set_param(name, value)
    }

    pub fn set_activation(&mut self, id: NodeId, activation: Option<ActivationType>) -> Result<()> {
        let node = self.get_mut(id)?;
        if activation.is_some() && !node.kind().accepts_activation() {
            return Err(GraphError::UnsupportedCombination {
                node: id,
                message: format!("{} blocks do not take an activation", node.kind()),
            });
        }
        node.set_activation(activation);
        Ok(())
    }

    pub fn move_to(&mut self, id: NodeId, position: Position) -> Result<()> {
        self.get_mut(id)?.position = position;
        Ok(())
    }

    // --- DAG view ---

    /// Snapshot of the wire relation as a petgraph map. Circular edges are never included.
    pub fn dag(&self) -> DiGraphMap<NodeId, ()> {
        let mut dag = DiGraphMap::with_capacity(self.nodes.len(), self.nodes.len());
        for id in self.nodes.keys() {
            dag.add_node(*id);
        }
        for node in self.nodes.values() {
            for child in &node.children {
                dag.add_edge(node.id(), *child, ());
            }
        }
        dag
    }

    pub fn is_acyclic(&self) -> bool {
        !is_cyclic_directed(&self.dag())
    }

    pub fn has_edge(&self, source: NodeId, dest: NodeId) -> bool {
        self.nodes
            .get(&source)
            .is_some_and(|node| node.children.contains(&dest))
    }

    fn link(&mut self, source: NodeId, dest: NodeId) {
        if let Some(node) = self.nodes.get_mut(&source) {
            node.children.insert(dest);
        }
        if let Some(node) = self.nodes.get_mut(&dest) {
            node.parents.insert(source);
        }
    }

    /// Bypasses every check; lets tests fabricate a corrupted graph.
    #[cfg(test)]
    pub(crate) fn force_link(&mut self, source: NodeId, dest: NodeId) {
        self.link(source, dest);
    }

    fn unlink(&mut self, source: NodeId, dest: NodeId) {
        if let Some(node) = self.nodes.get_mut(&source) {
            node.children.remove(&dest);
        }
        if let Some(node) = self.nodes.get_mut(&dest) {
            node.parents.remove(&source);
        }
    }

    // --- Editing ---

    /// Adds the wire `source -> dest`. Returns `false` when a wire between the
    /// two already exists in either direction.
    pub fn connect(&mut self, source: NodeId, dest: NodeId) -> Result<bool> {
        let source_kind = self.get(source)?.kind();
        let dest_kind = self.get(dest)?.kind();

        if source == dest {
            return Err(GraphError::invalid_edge(source, dest, "a block cannot wire to itself"));
        }
        if self.has_edge(source, dest) || self.has_edge(dest, source) {
            return Ok(false);
        }
        if !dest_kind.accepts_parents() {
            return Err(GraphError::invalid_edge(source, dest, "Input blocks cannot receive wires"));
        }
        if !source_kind.emits_children() {
            return Err(GraphError::invalid_edge(source, dest, "Output blocks cannot emit wires"));
        }
        if has_path_connecting(&self.dag(), dest, source, None) {
            return Err(GraphError::invalid_edge(source, dest, "the wire would close a cycle"));
        }

        self.link(source, dest);
        Ok(true)
    }

    /// Removes the single wire `source -> dest`, returning whether it existed.
    pub fn disconnect(&mut self, source: NodeId, dest: NodeId) -> Result<bool> {
        self.get(source)?;
        self.get(dest)?;
        let existed = self.has_edge(source, dest);
        self.unlink(source, dest);
        Ok(existed)
    }

    pub fn disconnect_all(&mut self, id: NodeId) -> Result<()> {
        let node = self.get(id)?;
        let parents: Vec<_> = node.parents.iter().copied().collect();
        let children: Vec<_> = node.children.iter().copied().collect();
        for parent in parents {
            self.unlink(parent, id);
        }
        for child in children {
            self.unlink(id, child);
        }
        Ok(())
    }

    /// Interposes `new` between `anchor` and all of its neighbours on `side`.
    /// The whole reroute is applied or nothing is.
    pub fn splice_between(&mut self, new: NodeId, anchor: NodeId, side: SpliceSide) -> Result<()> {
        let new_kind = self.get(new)?.kind();
        let anchor_node = self.get(anchor)?;
        let anchor_kind = anchor_node.kind();

        if new == anchor {
            return Err(GraphError::invalid_edge(new, anchor, "a block cannot be spliced onto itself"));
        }
        if !new_kind.accepts_parents() || !new_kind.emits_children() {
            return Err(GraphError::invalid_edge(
                new,
                anchor,
                format!("{} blocks cannot sit between two others", new_kind),
            ));
        }

        let mut scratch = self.clone();
        match side {
            SpliceSide::Child => {
                if !anchor_kind.emits_children() {
                    return Err(GraphError::invalid_edge(anchor, new, "Output blocks cannot emit wires"));
                }
                let children: Vec<_> = anchor_node.children.iter().copied().filter(|c| *c != new).collect();
                for child in children {
                    scratch.unlink(anchor, child);
                    scratch.link(new, child);
                }
                scratch.unlink(new, anchor);
                scratch.link(anchor, new);
            }
            SpliceSide::Parent => {
                if !anchor_kind.accepts_parents() {
                    return Err(GraphError::invalid_edge(new, anchor, "Input blocks cannot receive wires"));
                }
                let parents: Vec<_> = anchor_node.parents.iter().copied().filter(|p| *p != new).collect();
                for parent in parents {
                    scratch.unlink(parent, anchor);
                    scratch.link(parent, new);
                }
                scratch.unlink(anchor, new);
                scratch.link(new, anchor);
            }
        }

        if !scratch.is_acyclic() {
            return Err(GraphError::invalid_edge(new, anchor, "the splice would close a cycle"));
        }
        *self = scratch;
        Ok(())
    }

    /// Removes a block, its wires and every circular edge touching it. Former
    /// neighbours are left orphaned on that side.
    pub fn delete(&mut self, id: NodeId) -> Result<()> {
        self.get(id)?;
        if self.input == Some(id) || self.output == Some(id) {
            return Err(GraphError::ProtectedNode(id));
        }

        self.disconnect_all(id)?;
        self.circular.retain(|edge| !edge.touches(id));

        if let Some(holder) = self
            .nodes
            .values()
            .find(|node| node.parents.contains(&id) || node.children.contains(&id))
        {
            log::error!("Node {} still referenced by {} after disconnect", id, holder.id());
            return Err(GraphError::DanglingReference {
                node: id,
                holder: holder.id(),
            });
        }

        self.nodes.remove(&id);
        Ok(())
    }

    /// Deletes a block and bridges each former parent to each former child.
    pub fn delete_with_rewire(&mut self, id: NodeId) -> Result<()> {
        let node = self.get(id)?;
        let parents: Vec<_> = node.parents.iter().copied().collect();
        let children: Vec<_> = node.children.iter().copied().collect();

        self.delete(id)?;

        for parent in &parents {
            for child in &children {
                if let Err(e) = self.connect(*parent, *child) {
                    log::debug!("Skipping bridge {} -> {}: {}", parent, child, e);
                }
            }
        }
        Ok(())
    }

    /// Records a recurrence arrow. Self-loops are allowed; a duplicate pair is a no-op.
    pub fn add_circular_edge(
        &mut self,
        source: NodeId,
        dest: NodeId,
        label: Option<String>,
    ) -> Result<bool> {
        self.get(source)?;
        self.get(dest)?;
        if self
            .circular
            .iter()
            .any(|edge| edge.source == source && edge.dest == dest)
        {
            return Ok(false);
        }
        self.circular.push(CircularEdge {
            source,
            dest,
            label,
        });
        Ok(true)
    }

    pub fn remove_circular_edge(&mut self, source: NodeId, dest: NodeId) -> bool {
        let before = self.circular.len();
        self.circular
            .retain(|edge| !(edge.source == source && edge.dest == dest));
        self.circular.len() != before
    }
}
