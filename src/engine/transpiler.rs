// Keras script generation from the sorted layer sequence
use crate::engine::error::{GraphError, Result};
use crate::engine::graph::LayerGraph;
use crate::engine::node::{LayerNode, NodeId};
use crate::engine::sorter;
use crate::engine::types::{ActivationType, DatasetDescriptor, Hyperparameters, LayerKind};
use crate::engine::validator::{Shape, ShapeEngine, timestep_window};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tera::Tera;

const DEFAULT_TIMESTEP: usize = 12;

#[derive(Serialize)]
struct ClassificationContext<'a> {
    model_code: String,
    dataset_module: &'a str,
    num_classes: usize,
    img_rows: usize,
    img_cols: usize,
    channels: usize,
    batch_size: u32,
    epochs: u32,
    loss: &'static str,
    optimizer: &'static str,
    learning_rate: String,
}

#[derive(Serialize)]
struct TimeSeriesContext {
    model_code: String,
    batch_size: u32,
    epochs: u32,
    timestep: usize,
    optimizer: &'static str,
    learning_rate: String,
}

fn var(id: NodeId) -> String {
    format!("x{}", id)
}

fn py_bool(b: bool) -> &'static str {
    if b { "True" } else { "False" }
}

fn activation_arg(node: &LayerNode) -> String {
    node.activation_text()
        .map(|a| format!(", activation='{}'", a))
        .unwrap_or_default()
}

/// Layer constructor expression, without the call on its inputs.
fn layer_call(
    node: &LayerNode,
    dataset: &DatasetDescriptor,
    inferred: Option<&Shape>,
) -> Result<String> {
    let p = node.resolved_params();
    let call = match node.kind() {
        LayerKind::Input => "Input(shape=input_shape)".to_string(),
        LayerKind::Output if dataset.is_sequence => "Dense(1)".to_string(),
        LayerKind::Output => format!("Dense({}, activation='softmax')", dataset.output_units()),
        LayerKind::Dense => format!("Dense({}{})", p.dim("units")?, activation_arg(node)),
        LayerKind::Conv2D => {
            let k = p.dim("kernelSize")?;
            let s = p.dim("strides")?;
            format!(
                "Conv2D({}, ({}, {}), strides=({}, {}), padding='{}'{})",
                p.dim("filters")?,
                k,
                k,
                s,
                s,
                p.text("padding")?,
                activation_arg(node)
            )
        }
        LayerKind::MaxPooling2D => {
            let pool = p.dim("poolSize")?;
            let s = p.dim("strides")?;
            format!(
                "MaxPooling2D(pool_size=({}, {}), strides=({}, {}))",
                pool, pool, s, s
            )
        }
        LayerKind::Flatten => "Flatten()".to_string(),
        LayerKind::Reshape => {
            // Same target the shape engine settled on, fallback included
            let (t1, t2) = match inferred.map(Shape::features).as_deref() {
                Some(&[a, b]) => (a, b),
                _ => (p.dim("targetShape1")?, p.dim("targetShape2")?),
            };
            format!("Reshape(({}, {}))", t1, t2)
        }
        LayerKind::Dropout => format!("Dropout({})", p.float("rate")?),
        LayerKind::BatchNorm => format!("BatchNormalization(momentum={})", p.float("momentum")?),
        LayerKind::Add => "Add()".to_string(),
        LayerKind::Concatenate => "Concatenate()".to_string(),
        LayerKind::Multiply => "Multiply()".to_string(),
        LayerKind::Recurrent | LayerKind::Lstm => {
            let class = if node.kind() == LayerKind::Lstm {
                "LSTM"
            } else {
                "SimpleRNN"
            };
            let mut call = format!("{}({}{}", class, p.dim("units")?, activation_arg(node));
            if p.flag("returnSequences")? {
                call.push_str(", return_sequences=True");
            }
            let dropout = p.float("dropout")?;
            if dropout > 0.0 {
                call.push_str(&format!(", dropout={}", dropout));
            }
            let recurrent_dropout = p.float("recurrentDropout")?;
            if recurrent_dropout > 0.0 {
                call.push_str(&format!(", recurrent_dropout={}", recurrent_dropout));
            }
            call.push(')');
            call
        }
        LayerKind::Gru => format!(
            "GRU({}, return_sequences={}{})",
            p.dim("units")?,
            py_bool(p.flag("returnSequences")?),
            activation_arg(node)
        ),
    };
    Ok(call)
}

/// The `x<id> = ...` body of the script, ending with the `Model(...)` binding.
pub fn emit_model_lines(sorted: &[&LayerNode], dataset: &DatasetDescriptor) -> Result<Vec<String>> {
    let first = match sorted.first() {
        Some(node) if node.kind() == LayerKind::Input => node.id(),
        _ => return Err(GraphError::MissingInput),
    };
    let kinds: HashMap<NodeId, LayerKind> =
        sorted.iter().map(|n| (n.id(), n.kind())).collect();
    let shapes = ShapeEngine::new().infer(sorted, dataset);

    let mut emitted: HashSet<NodeId> = HashSet::new();
    let mut lines = Vec::with_capacity(sorted.len() + 1);

    for node in sorted {
        let id = node.id();
        let kind = node.kind();
        let parents: Vec<NodeId> = node.parents().iter().copied().collect();

        for parent in &parents {
            if !emitted.contains(parent) {
                return Err(GraphError::MissingParent {
                    node: id,
                    parent: *parent,
                });
            }
        }
        if kind.is_merge() {
            if parents.len() < 2 {
                return Err(GraphError::UnsupportedCombination {
                    node: id,
                    message: format!("{} needs at least two inputs", kind),
                });
            }
        } else if parents.len() > 1 {
            return Err(GraphError::MultiParentViolation {
                node: id,
                parents: parents.len(),
            });
        }
        if kind == LayerKind::BatchNorm
            && node.activation().is_some_and(|a| a != ActivationType::Relu)
        {
            return Err(GraphError::UnsupportedCombination {
                node: id,
                message: "Batch Normalization does not support activations other than ReLU"
                    .to_string(),
            });
        }

        let call = layer_call(node, dataset, shapes.shape(id))?;
        match parents.as_slice() {
            [] => lines.push(format!("{} = {}", var(id), call)),
            [parent]
                if kind.is_recurrent()
                    && !dataset.is_sequence
                    && kinds.get(parent) == Some(&LayerKind::Input) =>
            {
                let features = dataset
                    .features_or_width
                    .checked_mul(dataset.channels)
                    .ok_or_else(|| GraphError::UnsupportedCombination {
                        node: id,
                        message: format!("dataset `{}` is too wide to reshape", dataset.name),
                    })?;
                lines.push("# Reshape layer for RNN input".to_string());
                lines.push(format!(
                    "x_reshape_{} = Reshape(({}, {}))({})",
                    id,
                    dataset.time_steps_or_height,
                    features,
                    var(*parent)
                ));
                lines.push(format!("{} = {}(x_reshape_{})", var(id), call, id));
            }
            [parent] => lines.push(format!("{} = {}({})", var(id), call, var(*parent))),
            many => {
                let refs: Vec<String> = many.iter().map(|p| var(*p)).collect();
                lines.push(format!("{} = {}([{}])", var(id), call, refs.join(", ")));
            }
        }

        if let Some(activation) = node.activation() {
            if kind == LayerKind::BatchNorm {
                lines.push(format!("{0} = ReLU()({0})", var(id)));
            } else if kind.is_merge() {
                lines.push(format!(
                    "{0} = Activation('{1}')({0})",
                    var(id),
                    activation.keras_name()
                ));
            }
        }

        emitted.insert(id);
    }

    // Prefer the Output block; partial graphs end wherever the walk ends
    let last = sorted
        .iter()
        .find(|n| n.kind() == LayerKind::Output)
        .or(sorted.last())
        .map(|n| n.id())
        .unwrap_or(first);
    lines.push(format!(
        "model = Model(inputs={}, outputs={})",
        var(first),
        var(last)
    ));
    Ok(lines)
}

fn templates() -> Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_template(
        "classification.py",
        include_str!("../../templates/classification.py.j2"),
    )?;
    tera.add_raw_template(
        "time_series.py",
        include_str!("../../templates/time_series.py.j2"),
    )?;
    Ok(tera)
}

/// Image classification script: dataset load, one-hot labels, cross-entropy style compile.
pub fn generate_classification(
    sorted: &[&LayerNode],
    hyperparameters: &Hyperparameters,
    dataset: &DatasetDescriptor,
) -> Result<String> {
    let model_code = emit_model_lines(sorted, dataset)?.join("\n");
    let context = ClassificationContext {
        model_code,
        dataset_module: dataset.python_module(),
        num_classes: dataset.num_classes,
        img_rows: dataset.time_steps_or_height,
        img_cols: dataset.features_or_width,
        channels: dataset.channels,
        batch_size: hyperparameters.batch_size,
        epochs: hyperparameters.epochs,
        loss: hyperparameters.loss.python_name(),
        optimizer: hyperparameters.optimizer.python_name(),
        learning_rate: hyperparameters.learning_rate.to_string(),
    };
    Ok(templates()?.render("classification.py", &tera::Context::from_serialize(&context)?)?)
}

/// Sliding-window regression script over AirPassengers with MSE loss and MAE metric.
pub fn generate_time_series(
    sorted: &[&LayerNode],
    hyperparameters: &Hyperparameters,
    dataset: &DatasetDescriptor,
) -> Result<String> {
    let model_code = emit_model_lines(sorted, dataset)?.join("\n");
    let context = TimeSeriesContext {
        model_code,
        batch_size: hyperparameters.batch_size,
        epochs: hyperparameters.epochs,
        timestep: timestep_window(sorted).unwrap_or(DEFAULT_TIMESTEP),
        optimizer: hyperparameters.optimizer.python_name(),
        learning_rate: hyperparameters.learning_rate.to_string(),
    };
    Ok(templates()?.render("time_series.py", &tera::Context::from_serialize(&context)?)?)
}

pub fn generate_python(
    sorted: &[&LayerNode],
    hyperparameters: &Hyperparameters,
    dataset: &DatasetDescriptor,
) -> Result<String> {
    if dataset.is_sequence {
        generate_time_series(sorted, hyperparameters, dataset)
    } else {
        generate_classification(sorted, hyperparameters, dataset)
    }
}

/// Sorts `graph` from its Input block and renders the matching skeleton.
pub fn transpile(
    graph: &LayerGraph,
    hyperparameters: &Hyperparameters,
    dataset: &DatasetDescriptor,
) -> Result<String> {
    dataset.validate().map_err(GraphError::InvalidDataset)?;
    let root = graph.input().ok_or(GraphError::MissingInput)?;
    let sorted = sorter::sorted_nodes(graph, root)?;
    log::debug!("Transpiling {} layers for {}", sorted.len(), dataset.name);
    generate_python(&sorted, hyperparameters, dataset)
}
