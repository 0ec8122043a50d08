// Graph definitions for the Frontend
use crate::engine::node::{CircularEdge, NodeId};
use crate::engine::params::Parameters;
use crate::engine::types::{ActivationType, DatasetDescriptor, Hyperparameters, LayerKind};
use crate::engine::validator::Shape;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One block as stored in share links and templates. Wires are listed on both ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub id: NodeId,
    #[serde(alias = "layer_name")]
    pub kind: LayerKind,
    #[serde(default, alias = "parent_ids")]
    pub parent_ids: Vec<NodeId>,
    #[serde(default, alias = "children_ids")]
    pub child_ids: Vec<NodeId>,
    #[serde(default)]
    pub params: Parameters,
    #[serde(default, alias = "xPosition")]
    pub x: f64,
    #[serde(default, alias = "yPosition")]
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation: Option<ActivationType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    pub nodes: Vec<NodeSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub circular_edges: Vec<CircularEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<NodeId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShapesRequest {
    pub snapshot: GraphSnapshot,
    #[serde(default)]
    pub dataset: Option<DatasetDescriptor>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShapesResponse {
    pub order: Vec<NodeId>,
    pub shapes: BTreeMap<NodeId, Option<Shape>>,
    pub violations: Vec<NodeId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub snapshot: GraphSnapshot,
    #[serde(default)]
    pub dataset: Option<DatasetDescriptor>,
    #[serde(default)]
    pub hyperparameters: Hyperparameters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateQuery {
    pub dataset: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateResponse {
    pub dataset: DatasetDescriptor,
    pub hyperparameters: Hyperparameters,
    pub snapshot: GraphSnapshot,
}
