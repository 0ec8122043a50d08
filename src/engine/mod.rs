pub mod error;
pub mod graph;
pub mod node;
pub mod params;
pub mod presets;
pub mod snapshot;
pub mod sorter;
pub mod transpiler;
pub mod types;
pub mod validator;
pub mod workspace;

pub use error::{GraphError, Result};
pub use graph::{LayerGraph, SpliceSide};
pub use node::{CircularEdge, LayerNode, NodeId, Position};
pub use workspace::Workspace;
