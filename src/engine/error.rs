// Error taxonomy for the layer graph, sorter and code generator
use crate::engine::node::NodeId;
use crate::engine::types::LayerKind;

#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    #[error("invalid edge {from} -> {to}: {reason}")]
    InvalidEdge {
        from: NodeId,
        to: NodeId,
        reason: String,
    },

    #[error("node {node} has {parents} parents; only Add, Concatenate and Multiply may merge inputs")]
    MultiParentViolation { node: NodeId, parents: usize },

    #[error("graph contains a cycle through nodes {remaining:?}")]
    CycleDetected { remaining: Vec<NodeId> },

    #[error("unsupported combination on node {node}: {message}")]
    UnsupportedCombination { node: NodeId, message: String },

    #[error("the graph has no Input block")]
    MissingInput,

    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("node {0} is an Input or Output block and cannot be removed")]
    ProtectedNode(NodeId),

    #[error("the graph already has an {0} block")]
    DuplicateEndpoint(LayerKind),

    #[error("invalid parameter `{name}` on {kind}: {message}")]
    InvalidParameter {
        kind: String,
        name: String,
        message: String,
    },

    #[error("node {node} references parent {parent} which was not emitted before it")]
    MissingParent { node: NodeId, parent: NodeId },

    #[error("node {node} is still referenced by {holder} after disconnecting")]
    DanglingReference { node: NodeId, holder: NodeId },

    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("no built-in template named `{0}`")]
    UnknownTemplate(String),

    #[error("snapshot could not be parsed")]
    Snapshot(#[from] serde_json::Error),

    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("template rendering failed")]
    Template(#[from] tera::Error),
}

impl GraphError {
    pub fn invalid_edge(source: NodeId, dest: NodeId, reason: impl Into<String>) -> Self {
        GraphError::InvalidEdge {
            from: source,
            to: dest,
            reason: reason.into(),
        }
    }

    /// Errors that can only come from a broken invariant elsewhere, never from user input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            GraphError::CycleDetected { .. }
                | GraphError::DanglingReference { .. }
                | GraphError::Template(_)
        )
    }
}

pub type Result<T, E = GraphError> = std::result::Result<T, E>;
