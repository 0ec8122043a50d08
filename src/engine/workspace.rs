// One editable graph together with the settings it is evaluated against
use crate::engine::error::{GraphError, Result};
use crate::engine::graph::LayerGraph;
use crate::engine::node::NodeId;
use crate::engine::presets::ModelTemplate;
use crate::engine::snapshot;
use crate::engine::sorter;
use crate::engine::transpiler;
use crate::engine::types::{DatasetDescriptor, Hyperparameters};
use crate::engine::validator::{Shape, ShapeEngine, ShapeReport};
use crate::schemas::graph::GraphSnapshot;

#[derive(Debug, Default)]
pub struct Workspace {
    pub graph: LayerGraph,
    pub dataset: DatasetDescriptor,
    pub hyperparameters: Hyperparameters,
    shapes: ShapeEngine,
    order: Vec<NodeId>,
    report: ShapeReport,
}

impl Workspace {
    pub fn new(dataset: DatasetDescriptor) -> Self {
        Self {
            dataset,
            ..Self::default()
        }
    }

    /// Recomputes the order and shapes after any mutation. A graph without an
    /// Input block, or one whose order cannot be computed, reads as empty.
    pub fn rebuild(&mut self) -> &ShapeReport {
        let sorted = match self.graph.input() {
            Some(root) => sorter::sorted_nodes(&self.graph, root),
            None => Err(GraphError::MissingInput),
        };
        match sorted {
            Ok(sorted) => {
                self.order = sorted.iter().map(|n| n.id()).collect();
                self.report = self.shapes.infer(&sorted, &self.dataset);
            }
            Err(e) => {
                log::debug!("Rebuild found nothing to evaluate: {}", e);
                self.order.clear();
                self.report = ShapeReport::default();
            }
        }
        &self.report
    }

    /// Order computed by the last rebuild.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn report(&self) -> &ShapeReport {
        &self.report
    }

    /// Shape of `id` as of the last rebuild; `None` when unknown.
    pub fn shape_of(&self, id: NodeId) -> Option<&Shape> {
        self.report.shape(id)
    }

    /// Blocks whose shape the last rebuild actually recomputed.
    pub fn recomputed(&self) -> usize {
        self.shapes.recomputed()
    }

    pub fn set_dataset(&mut self, dataset: DatasetDescriptor) {
        self.dataset = dataset;
        self.rebuild();
    }

    pub fn export_code(&self) -> Result<String> {
        transpiler::transpile(&self.graph, &self.hyperparameters, &self.dataset)
    }

    pub fn load_template(&mut self, template: ModelTemplate) -> Result<()> {
        let dataset = template.dataset(&self.dataset);
        let mut graph = LayerGraph::new();
        template.build(&mut graph, &dataset)?;
        template.tune(&mut self.hyperparameters, &dataset);
        self.graph = graph;
        self.dataset = dataset;
        self.rebuild();
        Ok(())
    }

    pub fn load_snapshot(&mut self, snapshot: &GraphSnapshot) -> Result<()> {
        snapshot::from_snapshot(snapshot, &mut self.graph)?;
        self.rebuild();
        Ok(())
    }

    pub fn load_snapshot_or_default(&mut self, json: &str) {
        self.graph = snapshot::load_or_default(json, &self.dataset);
        self.rebuild();
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        snapshot::to_snapshot(&self.graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::node::Position;
    use crate::engine::params::ParamValue;
    use crate::engine::types::LayerKind;

    #[test]
    fn rebuild_tracks_edits() {
        let mut ws = Workspace::new(DatasetDescriptor::mnist());
        ws.load_template(ModelTemplate::Default).unwrap();
        let output = ws.graph.output().unwrap();
        assert_eq!(ws.shape_of(output), Some(&Shape::batched(&[10])));
        assert_eq!(ws.order().len(), 5);

        let input = ws.graph.input().unwrap();
        let dropout = ws
            .graph
            .add_node(LayerKind::Dropout, Position::default())
            .unwrap();
        ws.graph.disconnect_all(output).unwrap();
        ws.rebuild();
        assert_eq!(ws.shape_of(output), None);
        assert!(!ws.order().contains(&output));

        ws.graph.connect(input, dropout).unwrap();
        ws.graph.connect(dropout, output).unwrap();
        ws.rebuild();
        assert_eq!(ws.shape_of(dropout), Some(&Shape::batched(&[28, 28, 1])));
        assert_eq!(ws.shape_of(output), Some(&Shape::batched(&[28, 28, 10])));
    }

    #[test]
    fn rebuild_only_recomputes_what_changed() {
        let mut ws = Workspace::new(DatasetDescriptor::mnist());
        ws.load_template(ModelTemplate::Resnet).unwrap();
        ws.rebuild();
        assert_eq!(ws.recomputed(), 0);

        let dropout = ws
            .graph
            .nodes()
            .find(|n| n.kind() == LayerKind::Dropout)
            .map(|n| n.id())
            .unwrap();
        ws.graph
            .set_param(dropout, "rate", ParamValue::Float(0.3))
            .unwrap();
        ws.rebuild();
        assert_eq!(ws.recomputed(), 1);
    }

    #[test]
    fn recurrent_template_switches_the_dataset() {
        let mut ws = Workspace::new(DatasetDescriptor::mnist());
        ws.load_template(ModelTemplate::Rnn).unwrap();
        assert!(ws.dataset.is_sequence);
        assert_eq!(ws.hyperparameters.epochs, 100);

        let code = ws.export_code().unwrap();
        assert!(code.contains("airpassengers.load_pandas()"));
        assert!(!code.contains("x_reshape_"));
    }

    #[test]
    fn switching_datasets_reshapes_the_graph() {
        let mut ws = Workspace::new(DatasetDescriptor::mnist());
        ws.load_template(ModelTemplate::Default).unwrap();
        let input = ws.graph.input().unwrap();
        assert_eq!(ws.shape_of(input), Some(&Shape::batched(&[28, 28, 1])));

        ws.set_dataset(DatasetDescriptor::cifar10());
        assert_eq!(ws.shape_of(input), Some(&Shape::batched(&[32, 32, 3])));
    }

    #[test]
    fn bad_share_link_loads_the_default_template() {
        let mut ws = Workspace::new(DatasetDescriptor::mnist());
        ws.load_snapshot_or_default("%7B%22nodes");
        assert_eq!(ws.graph.len(), 5);
        let output = ws.graph.output().unwrap();
        assert_eq!(ws.shape_of(output), Some(&Shape::batched(&[10])));
    }

    #[test]
    fn empty_workspace_rebuilds_to_nothing() {
        let mut ws = Workspace::default();
        assert!(ws.rebuild().shapes.is_empty());
        assert!(matches!(ws.export_code(), Err(GraphError::MissingInput)));
    }

    #[test]
    fn snapshot_round_trips_through_the_workspace() {
        let mut ws = Workspace::new(DatasetDescriptor::cifar10());
        ws.load_template(ModelTemplate::Complex).unwrap();
        let before = ws.snapshot();

        let mut other = Workspace::new(DatasetDescriptor::cifar10());
        other.load_snapshot(&before).unwrap();
        assert_eq!(other.snapshot(), before);
        assert_eq!(other.report().shapes, ws.report().shapes);
    }
}
