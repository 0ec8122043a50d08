// Built-in starting architectures offered by the load-template action
use crate::engine::error::{GraphError, Result};
use crate::engine::graph::LayerGraph;
use crate::engine::node::{NodeId, Position};
use crate::engine::params::ParamValue;
use crate::engine::types::{ActivationType, DatasetDescriptor, Hyperparameters, LayerKind};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Templates are laid out on a nominal canvas of this size
const WIDTH: f64 = 1200.0;
const HEIGHT: f64 = 600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ModelTemplate {
    Default,
    Blank,
    Resnet,
    Complex,
    Rnn,
    Lstm,
}

impl ModelTemplate {
    pub const ALL: [ModelTemplate; 6] = [
        ModelTemplate::Default,
        ModelTemplate::Blank,
        ModelTemplate::Resnet,
        ModelTemplate::Complex,
        ModelTemplate::Rnn,
        ModelTemplate::Lstm,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModelTemplate::Default => "default",
            ModelTemplate::Blank => "blank",
            ModelTemplate::Resnet => "resnet",
            ModelTemplate::Complex => "complex",
            ModelTemplate::Rnn => "rnn",
            ModelTemplate::Lstm => "lstm",
        }
    }

    /// Dataset the workspace switches to when this template is loaded.
    pub fn dataset(self, current: &DatasetDescriptor) -> DatasetDescriptor {
        match self {
            ModelTemplate::Rnn | ModelTemplate::Lstm => DatasetDescriptor::air_passengers(),
            _ => current.clone(),
        }
    }

    /// Training settings some templates ship with.
    pub fn tune(self, hyperparameters: &mut Hyperparameters, dataset: &DatasetDescriptor) {
        match self {
            ModelTemplate::Default if dataset.name == "cifar" => {
                hyperparameters.learning_rate = 0.001;
            }
            ModelTemplate::Rnn if dataset.is_sequence => {
                hyperparameters.epochs = 100;
                hyperparameters.learning_rate = 0.0005;
            }
            ModelTemplate::Lstm if dataset.is_sequence => {
                hyperparameters.epochs = 20;
            }
            _ => {}
        }
    }

    /// Replaces the contents of `graph` with this architecture.
    pub fn build(self, graph: &mut LayerGraph, dataset: &DatasetDescriptor) -> Result<()> {
        graph.clear();
        let mut b = Builder { graph };
        let input = b.layer(LayerKind::Input, 100.0 / WIDTH, 0.5)?;
        let output = b.layer(LayerKind::Output, (WIDTH - 100.0) / WIDTH, 0.5)?;
        if DatasetDescriptor::PRESETS.contains(&dataset.name.as_str()) {
            b.set(input, "dataset", ParamValue::Text(dataset.name.clone()))?;
        }
        let head_units = dataset.output_units() as i64;

        match self {
            ModelTemplate::Blank => {}

            ModelTemplate::Default if dataset.name == "cifar" => {
                let mut prev = input;
                for (i, filters) in [32, 64, 128].into_iter().enumerate() {
                    let conv = b.layer(LayerKind::Conv2D, 0.15 + 0.2 * i as f64, 0.5)?;
                    b.set(conv, "filters", ParamValue::Int(filters))?;
                    b.set(conv, "padding", ParamValue::Text("same".into()))?;
                    b.relu(conv)?;
                    b.wire(prev, conv)?;
                    prev = conv;
                    if i < 2 {
                        let pool = b.layer(LayerKind::MaxPooling2D, 0.25 + 0.2 * i as f64, 0.5)?;
                        b.wire(prev, pool)?;
                        prev = pool;
                    }
                }
                let flat = b.layer(LayerKind::Flatten, 0.7, 0.5)?;
                let dropout = b.layer(LayerKind::Dropout, 0.8, 0.5)?;
                b.set(dropout, "rate", ParamValue::Float(0.5))?;
                let dense = b.layer(LayerKind::Dense, 0.9, 0.5)?;
                b.set(dense, "units", ParamValue::Int(10))?;
                b.relu(dense)?;
                b.chain(&[prev, flat, dropout, dense, output])?;
            }

            ModelTemplate::Default => {
                let conv = b.layer(LayerKind::Conv2D, 0.25, 0.4)?;
                b.relu(conv)?;
                let flat = b.layer(LayerKind::Flatten, 0.57, 0.4)?;
                let dense = b.layer(LayerKind::Dense, 0.77, 0.4)?;
                b.set(dense, "units", ParamValue::Int(10))?;
                b.relu(dense)?;
                b.chain(&[input, conv, flat, dense, output])?;
            }

            ModelTemplate::Resnet => {
                let conv0 = b.conv_same(0.26, 0.57)?;
                let conv1 = b.conv_same(0.26, 0.37)?;
                let conv2 = b.conv_same(0.4, 0.37)?;
                let conv3 = b.conv_same(0.4, 0.78)?;
                let conv4 = b.conv_same(0.54, 0.78)?;
                let add1 = b.layer(LayerKind::Add, 0.39, 0.55)?;
                let add2 = b.layer(LayerKind::Add, 0.52, 0.55)?;
                let flat = b.layer(LayerKind::Flatten, 0.7, 0.6)?;
                let dense = b.layer(LayerKind::Dense, 0.7, 0.57)?;
                let dropout = b.layer(LayerKind::Dropout, 0.78, 0.48)?;
                b.set(dense, "units", ParamValue::Int(head_units))?;
                for id in [conv1, conv3, add1, add2, dense] {
                    b.relu(id)?;
                }

                b.wire(input, conv0)?;
                b.chain(&[conv0, conv1, conv2, add1])?;
                b.wire(conv0, add1)?;
                b.chain(&[add1, conv3, conv4, add2])?;
                b.wire(add1, add2)?;
                b.chain(&[add2, flat, dense, dropout, output])?;
            }

            ModelTemplate::Complex => {
                let conv = b.layer(LayerKind::Conv2D, 0.29, 0.33)?;
                let pool = b.layer(LayerKind::MaxPooling2D, 0.4, 0.33)?;
                let flat1 = b.layer(LayerKind::Flatten, 0.59, 0.45)?;
                let conv2 = b.layer(LayerKind::Conv2D, 0.29, 0.67)?;
                let batch = b.layer(LayerKind::BatchNorm, 0.4, 0.67)?;
                let flat2 = b.layer(LayerKind::Flatten, 0.59, 0.67)?;
                let concat = b.layer(LayerKind::Concatenate, 0.67, 0.53)?;
                let dense = b.layer(LayerKind::Dense, 0.75, 0.5)?;
                b.set(dense, "units", ParamValue::Int(head_units))?;
                for id in [conv, batch, dense] {
                    b.relu(id)?;
                }

                b.chain(&[input, conv, pool, flat1, concat])?;
                b.chain(&[input, conv2, batch, flat2, concat])?;
                b.chain(&[concat, dense, output])?;
            }

            ModelTemplate::Rnn if dataset.is_sequence => {
                let rnn = b.layer(LayerKind::Recurrent, 0.5, 0.5)?;
                b.set(rnn, "units", ParamValue::Int(128))?;
                b.set(rnn, "dropout", ParamValue::Float(0.2))?;
                b.set(rnn, "recurrentDropout", ParamValue::Float(0.1))?;
                b.graph.set_activation(rnn, Some(ActivationType::Tanh))?;
                let dense = b.layer(LayerKind::Dense, 0.75, 0.5)?;
                b.set(dense, "units", ParamValue::Int(1))?;
                b.chain(&[input, rnn, dense, output])?;
            }

            ModelTemplate::Rnn => {
                let flat = b.layer(LayerKind::Flatten, 0.25, 0.5)?;
                let dense1 = b.layer(LayerKind::Dense, 0.4, 0.5)?;
                b.set(dense1, "units", ParamValue::Int(64))?;
                b.relu(dense1)?;
                let dropout = b.layer(LayerKind::Dropout, 0.83, 0.5)?;
                b.set(dropout, "rate", ParamValue::Float(0.2))?;
                let dense2 = b.layer(LayerKind::Dense, 0.67, 0.5)?;
                b.set(dense2, "units", ParamValue::Int(head_units))?;
                b.chain(&[input, flat, dense1, dropout, dense2, output])?;
            }

            ModelTemplate::Lstm => {
                let lstm = b.layer(LayerKind::Lstm, 0.4, 0.5)?;
                let dense = b.layer(LayerKind::Dense, 0.67, 0.5)?;
                b.set(dense, "units", ParamValue::Int(head_units))?;
                if !dataset.is_sequence {
                    b.relu(lstm)?;
                    b.relu(dense)?;
                }
                b.chain(&[input, lstm, dense, output])?;
            }
        }

        log::debug!("Built template {} with {} blocks", self, b.graph.len());
        Ok(())
    }
}

impl fmt::Display for ModelTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelTemplate {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        ModelTemplate::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| GraphError::UnknownTemplate(s.to_string()))
    }
}

struct Builder<'g> {
    graph: &'g mut LayerGraph,
}

impl Builder<'_> {
    fn layer(&mut self, kind: LayerKind, x: f64, y: f64) -> Result<NodeId> {
        self.graph
            .add_node(kind, Position::new(x * WIDTH, y * HEIGHT))
    }

    fn conv_same(&mut self, x: f64, y: f64) -> Result<NodeId> {
        let conv = self.layer(LayerKind::Conv2D, x, y)?;
        self.set(conv, "padding", ParamValue::Text("same".into()))?;
        Ok(conv)
    }

    fn set(&mut self, id: NodeId, name: &str, value: ParamValue) -> Result<()> {
        self.graph.set_param(id, name, value)
    }

    fn relu(&mut self, id: NodeId) -> Result<()> {
        self.graph.set_activation(id, Some(ActivationType::Relu))
    }

    fn wire(&mut self, source: NodeId, dest: NodeId) -> Result<()> {
        self.graph.connect(source, dest).map(|_| ())
    }

    fn chain(&mut self, ids: &[NodeId]) -> Result<()> {
        for pair in ids.windows(2) {
            self.wire(pair[0], pair[1])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sorter;
    use crate::engine::transpiler;
    use crate::engine::validator::infer_shapes;

    #[test]
    fn names_parse_back() {
        for template in ModelTemplate::ALL {
            assert_eq!(template.name().parse::<ModelTemplate>().unwrap(), template);
        }
        assert!(matches!(
            "vgg".parse::<ModelTemplate>(),
            Err(GraphError::UnknownTemplate(_))
        ));
    }

    #[test]
    fn every_template_infers_an_output_shape() {
        for template in ModelTemplate::ALL {
            if template == ModelTemplate::Blank {
                continue;
            }
            for dataset in [DatasetDescriptor::mnist(), DatasetDescriptor::cifar10()] {
                let dataset = template.dataset(&dataset);
                let mut graph = LayerGraph::new();
                template.build(&mut graph, &dataset).unwrap();

                let input = graph.input().unwrap();
                let output = graph.output().unwrap();
                let report = infer_shapes(&graph, input, &dataset);
                assert!(
                    report.shape(output).is_some(),
                    "{} on {} left the output shape unknown",
                    template,
                    dataset.name
                );
                assert!(report.violations.is_empty());
            }
        }
    }

    #[test]
    fn every_template_generates_code() {
        for template in ModelTemplate::ALL {
            if template == ModelTemplate::Blank {
                continue;
            }
            let dataset = template.dataset(&DatasetDescriptor::mnist());
            let mut graph = LayerGraph::new();
            template.build(&mut graph, &dataset).unwrap();
            let code =
                transpiler::transpile(&graph, &Hyperparameters::default(), &dataset).unwrap();
            assert!(code.contains("model = Model(inputs="));
        }
    }

    #[test]
    fn blank_leaves_the_endpoints_unwired() {
        let mut graph = LayerGraph::new();
        ModelTemplate::Blank
            .build(&mut graph, &DatasetDescriptor::mnist())
            .unwrap();
        assert_eq!(graph.len(), 2);
        let input = graph.input().unwrap();
        assert_eq!(sorter::topological_sort(&graph, input).unwrap(), vec![input]);
    }

    #[test]
    fn rebuilding_clears_the_previous_contents() {
        let mut graph = LayerGraph::new();
        let dataset = DatasetDescriptor::mnist();
        ModelTemplate::Resnet.build(&mut graph, &dataset).unwrap();
        let first_input = graph.input().unwrap();
        ModelTemplate::Default.build(&mut graph, &dataset).unwrap();

        assert_eq!(graph.len(), 5);
        assert!(graph.input().unwrap() > first_input);
        assert!(!graph.contains(first_input));
    }

    #[test]
    fn recurrent_templates_switch_to_the_time_series() {
        let dataset = ModelTemplate::Rnn.dataset(&DatasetDescriptor::mnist());
        assert!(dataset.is_sequence);

        let mut hyper = Hyperparameters::default();
        ModelTemplate::Rnn.tune(&mut hyper, &dataset);
        assert_eq!(hyper.epochs, 100);
        assert_eq!(hyper.learning_rate, 0.0005);
    }
}
