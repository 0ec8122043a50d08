// Layer blocks placed on the canvas
use crate::engine::error::Result;
use crate::engine::params::{self, ParamValue, Parameters, ResolvedParams};
use crate::engine::types::{ActivationType, LayerKind};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique block identity. Fresh ids increase monotonically and are never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn fresh() -> Self {
        NodeId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Makes sure ids restored from a snapshot are never minted again.
    pub fn reserve_through(id: NodeId) {
        NEXT_ID.fetch_max(id.0.saturating_add(1), Ordering::Relaxed);
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone)]
pub struct LayerNode {
    id: NodeId,
    kind: LayerKind,
    params: Parameters,
    pub(crate) parents: BTreeSet<NodeId>,
    pub(crate) children: BTreeSet<NodeId>,
    pub position: Position,
    activation: Option<ActivationType>,
}

impl LayerNode {
    pub(crate) fn new(id: NodeId, kind: LayerKind, position: Position) -> Self {
        Self {
            id,
            kind,
            params: Parameters::default(),
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
            position,
            activation: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn parents(&self) -> &BTreeSet<NodeId> {
        &self.parents
    }

    pub fn children(&self) -> &BTreeSet<NodeId> {
        &self.children
    }

    /// Values set explicitly, without defaults.
    pub fn explicit_params(&self) -> &Parameters {
        &self.params
    }

    /// Shape-relevant parameter snapshot with defaults for anything never set.
    pub fn resolved_params(&self) -> ResolvedParams {
        ResolvedParams::resolve(self.kind, &self.params)
    }

    pub fn activation(&self) -> Option<ActivationType> {
        self.activation
    }

    pub fn activation_text(&self) -> Option<&'static str> {
        self.activation.map(ActivationType::keras_name)
    }

    pub(crate) fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        let value = params::coerce(self.kind, name, value)?;
        self.params.insert(name, value);
        Ok(())
    }

    pub(crate) fn set_activation(&mut self, activation: Option<ActivationType>) {
        self.activation = activation;
    }

    /// The single parent of a non-merge node, if it has exactly one.
    pub fn sole_parent(&self) -> Option<NodeId> {
        if self.parents.len() == 1 {
            self.parents.first().copied()
        } else {
            None
        }
    }
}

// Identity, not structure
impl PartialEq for LayerNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for LayerNode {}

/// Visual-only recurrence arrow. Kept out of the DAG adjacency entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CircularEdge {
    pub source: NodeId,
    pub dest: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl CircularEdge {
    pub fn touches(&self, id: NodeId) -> bool {
        self.source == id || self.dest == id
    }
}
