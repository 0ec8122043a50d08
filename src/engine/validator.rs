// Speculative shape propagation over the sorted layer sequence.
// Failures never escape: a block whose shape cannot be derived reads as unknown.
use crate::engine::graph::LayerGraph;
use crate::engine::node::{LayerNode, NodeId};
use crate::engine::params::Parameters;
use crate::engine::sorter;
use crate::engine::types::{DatasetDescriptor, LayerKind};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dim {
    Batch,
    Fixed(usize),
}

impl Serialize for Dim {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Dim::Batch => serializer.serialize_none(),
            Dim::Fixed(n) => serializer.serialize_u64(*n as u64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Shape(pub Vec<Dim>);

impl Shape {
    /// Batch axis followed by the given fixed dims.
    pub fn batched(dims: &[usize]) -> Self {
        let mut out = Vec::with_capacity(dims.len() + 1);
        out.push(Dim::Batch);
        out.extend(dims.iter().copied().map(Dim::Fixed));
        Shape(out)
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Fixed dims after the batch axis.
    pub fn features(&self) -> Vec<usize> {
        self.0
            .iter()
            .filter_map(|dim| match dim {
                Dim::Fixed(n) => Some(*n),
                Dim::Batch => None,
            })
            .collect()
    }

    /// Product of the fixed dims; `None` when it overflows.
    pub fn element_count(&self) -> Option<usize> {
        self.features()
            .iter()
            .try_fold(1usize, |acc, n| acc.checked_mul(*n))
    }

    fn with_last(&self, value: usize) -> Result<Shape, String> {
        let mut dims = self.0.clone();
        match dims.last_mut() {
            Some(last @ Dim::Fixed(_)) => *last = Dim::Fixed(value),
            _ => return Err(format!("shape {} has no feature axis", self)),
        }
        Ok(Shape(dims))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self
            .0
            .iter()
            .map(|dim| match dim {
                Dim::Batch => "None".to_string(),
                Dim::Fixed(n) => n.to_string(),
            })
            .collect();
        write!(f, "({})", dims.join(", "))
    }
}

/// Facts a block needs besides its own parameters and its parents' shapes.
pub struct ShapeContext<'a> {
    pub dataset: &'a DatasetDescriptor,
    pub parent_kinds: &'a [LayerKind],
    /// Sequence length fed to the Input block on sequence datasets.
    pub window: usize,
}

pub trait ShapeValidator {
    fn validate_and_propagate(
        &self,
        ctx: &ShapeContext<'_>,
        input_shapes: &[Shape],
    ) -> Result<Shape, String>;
}

fn single<'s>(kind: LayerKind, input_shapes: &'s [Shape]) -> Result<&'s Shape, String> {
    match input_shapes {
        [shape] => Ok(shape),
        [] => Err(format!("{} layer has no input", kind)),
        _ => Err(format!("{} layer accepts a single input", kind)),
    }
}

fn spatial(kind: LayerKind, shape: &Shape) -> Result<(usize, usize, usize), String> {
    match shape.features()[..] {
        [h, w, c] if shape.rank() == 4 => Ok((h, w, c)),
        _ => Err(format!(
            "{} expects a (batch, height, width, channels) input, got {}",
            kind, shape
        )),
    }
}

fn product(a: usize, b: usize) -> Result<usize, String> {
    a.checked_mul(b)
        .ok_or_else(|| format!("{} x {} elements do not fit in a tensor", a, b))
}

fn window_out(size: usize, window: usize, stride: usize, same: bool) -> Result<usize, String> {
    if same {
        return Ok(size.div_ceil(stride));
    }
    if size < window {
        return Err(format!("window {} is larger than input extent {}", window, size));
    }
    Ok((size - window) / stride + 1)
}

impl ShapeValidator for LayerNode {
    fn validate_and_propagate(
        &self,
        ctx: &ShapeContext<'_>,
        input_shapes: &[Shape],
    ) -> Result<Shape, String> {
        let kind = self.kind();
        let params = self.resolved_params();
        let read = |e: crate::engine::error::GraphError| e.to_string();

        match kind {
            LayerKind::Input => {
                let d = ctx.dataset;
                if d.is_sequence {
                    Ok(Shape::batched(&[ctx.window, d.features_or_width]))
                } else {
                    Ok(Shape::batched(&[
                        d.time_steps_or_height,
                        d.features_or_width,
                        d.channels,
                    ]))
                }
            }

            LayerKind::Dense => {
                let input = single(kind, input_shapes)?;
                input.with_last(params.dim("units").map_err(read)?)
            }

            // The user's units are ignored: the task decides the width
            LayerKind::Output => {
                let input = single(kind, input_shapes)?;
                input.with_last(ctx.dataset.output_units())
            }

            LayerKind::Conv2D => {
                let (h, w, _) = spatial(kind, single(kind, input_shapes)?)?;
                let filters = params.dim("filters").map_err(read)?;
                let k = params.dim("kernelSize").map_err(read)?;
                let s = params.dim("strides").map_err(read)?;
                let same = params.text("padding").map_err(read)? == "same";
                Ok(Shape::batched(&[
                    window_out(h, k, s, same)?,
                    window_out(w, k, s, same)?,
                    filters,
                ]))
            }

            LayerKind::MaxPooling2D => {
                let (h, w, c) = spatial(kind, single(kind, input_shapes)?)?;
                let pool = params.dim("poolSize").map_err(read)?;
                let s = params.dim("strides").map_err(read)?;
                Ok(Shape::batched(&[
                    window_out(h, pool, s, false)?,
                    window_out(w, pool, s, false)?,
                    c,
                ]))
            }

            LayerKind::Flatten => {
                let input = single(kind, input_shapes)?;
                if input.rank() < 2 {
                    return Err(format!("cannot flatten {}", input));
                }
                let count = input
                    .element_count()
                    .ok_or_else(|| format!("{} has too many elements to flatten", input))?;
                Ok(Shape::batched(&[count]))
            }

            LayerKind::Reshape => {
                let input = single(kind, input_shapes)?;
                let t1 = params.dim("targetShape1").map_err(read)?;
                let t2 = params.dim("targetShape2").map_err(read)?;
                let count = input
                    .element_count()
                    .ok_or_else(|| format!("{} has too many elements to reshape", input))?;
                if t1.checked_mul(t2) == Some(count) {
                    return Ok(Shape::batched(&[t1, t2]));
                }
                // Mismatched targets on an image fall back to (height, width * channels)
                match spatial(kind, input) {
                    Ok((h, w, c)) => Ok(Shape::batched(&[h, product(w, c)?])),
                    Err(_) => Err(format!(
                        "cannot reshape {} into ({}, {})",
                        input, t1, t2
                    )),
                }
            }

            LayerKind::Dropout | LayerKind::BatchNorm => Ok(single(kind, input_shapes)?.clone()),

            LayerKind::Add | LayerKind::Multiply => {
                if input_shapes.len() < 2 {
                    return Err(format!("{} layer requires at least two inputs", kind));
                }
                let base = &input_shapes[0];
                for (i, shape) in input_shapes.iter().enumerate().skip(1) {
                    if shape != base {
                        return Err(format!(
                            "Shape mismatch in {}! Input 0 has shape {} but input {} has shape {}",
                            kind, base, i, shape
                        ));
                    }
                }
                Ok(base.clone())
            }

            LayerKind::Concatenate => {
                if input_shapes.len() < 2 {
                    return Err("Concatenate layer requires at least two inputs".to_string());
                }
                let base = &input_shapes[0];
                let axis = base.rank() - 1;
                let mut concat_dim = 0;

                for (i, shape) in input_shapes.iter().enumerate() {
                    if shape.rank() != base.rank() {
                        return Err(format!(
                            "Rank mismatch in Concatenate! Input 0 has {} dims, but input {} has {} dims",
                            base.rank(),
                            i,
                            shape.rank()
                        ));
                    }
                    for (dim_idx, dim) in shape.0.iter().enumerate() {
                        if dim_idx == axis {
                            match dim {
                                Dim::Fixed(n) => {
                                    concat_dim = usize::checked_add(concat_dim, *n).ok_or_else(
                                        || "Concatenated axis does not fit in a tensor".to_string(),
                                    )?;
                                }
                                Dim::Batch => {
                                    return Err(
                                        "Cannot concatenate along the batch dimension".to_string()
                                    );
                                }
                            }
                        } else if *dim != base.0[dim_idx] {
                            return Err(format!(
                                "Shape mismatch in Concatenate at dimension {}! Input 0 has {} but input {} has {}",
                                dim_idx, base, i, shape
                            ));
                        }
                    }
                }

                base.with_last(concat_dim)
            }

            LayerKind::Recurrent | LayerKind::Lstm | LayerKind::Gru => {
                let input = single(kind, input_shapes)?;
                let units = params.dim("units").map_err(read)?;
                let return_sequences = params.flag("returnSequences").map_err(read)?;

                let from_input = ctx.parent_kinds.first() == Some(&LayerKind::Input);
                let sequence = if from_input && !ctx.dataset.is_sequence {
                    // Implicit reshape: height becomes time, width * channels the features
                    let (h, w, c) = spatial(kind, input)?;
                    Shape::batched(&[h, product(w, c)?])
                } else {
                    input.clone()
                };

                match sequence.features()[..] {
                    [steps, _] if sequence.rank() == 3 => {
                        if return_sequences {
                            Ok(Shape::batched(&[steps, units]))
                        } else {
                            Ok(Shape::batched(&[units]))
                        }
                    }
                    _ => Err(format!(
                        "{} expects a (batch, timesteps, features) input, got {}",
                        kind, sequence
                    )),
                }
            }
        }
    }
}

/// Window from the first Recurrent/LSTM block in sort order, if any.
pub fn timestep_window(sorted: &[&LayerNode]) -> Option<usize> {
    sorted
        .iter()
        .find(|node| node.kind().carries_timestep())
        .and_then(|node| node.resolved_params().dim("timestep").ok())
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ShapeReport {
    pub shapes: BTreeMap<NodeId, Option<Shape>>,
    /// Non-merge blocks found with more than one parent.
    pub violations: Vec<NodeId>,
}

impl ShapeReport {
    pub fn shape(&self, id: NodeId) -> Option<&Shape> {
        self.shapes.get(&id).and_then(Option::as_ref)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ShapeKey {
    kind: LayerKind,
    params: Parameters,
    parents: Vec<(NodeId, LayerKind, Option<Shape>)>,
    dataset: DatasetDescriptor,
    window: usize,
}

#[derive(Debug, Clone)]
struct CachedShape {
    key: ShapeKey,
    shape: Option<Shape>,
}

/// Incremental shape propagation: a block is recomputed only when its own
/// parameters, its parents or their shapes changed since the previous pass.
#[derive(Debug, Default)]
pub struct ShapeEngine {
    cache: HashMap<NodeId, CachedShape>,
    recomputed: usize,
}

impl ShapeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks whose shape was recomputed during the last pass.
    pub fn recomputed(&self) -> usize {
        self.recomputed
    }

    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    pub fn infer(&mut self, sorted: &[&LayerNode], dataset: &DatasetDescriptor) -> ShapeReport {
        let window = timestep_window(sorted).unwrap_or(dataset.time_steps_or_height);
        let by_id: HashMap<NodeId, &LayerNode> = sorted.iter().map(|n| (n.id(), *n)).collect();
        let mut report = ShapeReport::default();
        self.recomputed = 0;

        for node in sorted {
            let id = node.id();
            let parents: Vec<(NodeId, LayerKind, Option<Shape>)> = node
                .parents()
                .iter()
                .map(|p| {
                    let kind = by_id.get(p).map(|n| n.kind());
                    let shape = report.shapes.get(p).cloned().flatten();
                    (*p, kind.unwrap_or(LayerKind::Input), shape.filter(|_| kind.is_some()))
                })
                .collect();

            if parents.len() > 1 && !node.kind().is_merge() {
                log::warn!(
                    "Node {} ({}) has {} parents; shape unknown",
                    id,
                    node.kind(),
                    parents.len()
                );
                report.violations.push(id);
            }

            let key = ShapeKey {
                kind: node.kind(),
                params: node.explicit_params().clone(),
                parents,
                dataset: dataset.clone(),
                window,
            };

            let shape = match self.cache.get(&id) {
                Some(cached) if cached.key == key => cached.shape.clone(),
                _ => {
                    self.recomputed += 1;
                    let shape = Self::propagate(node, &key, dataset, window);
                    self.cache.insert(
                        id,
                        CachedShape {
                            key,
                            shape: shape.clone(),
                        },
                    );
                    shape
                }
            };
            report.shapes.insert(id, shape);
        }

        self.cache.retain(|id, _| by_id.contains_key(id));
        report
    }

    fn propagate(
        node: &LayerNode,
        key: &ShapeKey,
        dataset: &DatasetDescriptor,
        window: usize,
    ) -> Option<Shape> {
        if key.parents.len() > 1 && !node.kind().is_merge() {
            return None;
        }

        let mut input_shapes = Vec::with_capacity(key.parents.len());
        for (parent, _, shape) in &key.parents {
            match shape {
                Some(shape) => input_shapes.push(shape.clone()),
                None => {
                    log::debug!("Node {} missing input shape from {}", node.id(), parent);
                    return None;
                }
            }
        }
        if node.kind() != LayerKind::Input && input_shapes.is_empty() {
            log::debug!("Node {} has no inputs", node.id());
            return None;
        }

        let parent_kinds: Vec<LayerKind> = key.parents.iter().map(|(_, kind, _)| *kind).collect();
        let ctx = ShapeContext {
            dataset,
            parent_kinds: &parent_kinds,
            window,
        };

        match node.validate_and_propagate(&ctx, &input_shapes) {
            Ok(shape) => Some(shape),
            Err(e) => {
                log::debug!("Shape of node {} unknown: {}", node.id(), e);
                None
            }
        }
    }
}

/// One-shot inference from `root`. A graph that cannot even be sorted yields an empty report.
pub fn infer_shapes(graph: &LayerGraph, root: NodeId, dataset: &DatasetDescriptor) -> ShapeReport {
    match sorter::sorted_nodes(graph, root) {
        Ok(sorted) => ShapeEngine::new().infer(&sorted, dataset),
        Err(e) => {
            log::debug!("Shape inference skipped: {}", e);
            ShapeReport::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::node::Position;
    use crate::engine::params::ParamValue;

    fn add(graph: &mut LayerGraph, kind: LayerKind) -> NodeId {
        graph.add_node(kind, Position::default()).unwrap()
    }

    fn chain(graph: &mut LayerGraph, kinds: &[LayerKind]) -> Vec<NodeId> {
        let ids: Vec<NodeId> = kinds.iter().map(|k| add(graph, *k)).collect();
        for pair in ids.windows(2) {
            graph.connect(pair[0], pair[1]).unwrap();
        }
        ids
    }

    #[test]
    fn conv_stack_on_mnist() {
        let mut graph = LayerGraph::new();
        let ids = chain(
            &mut graph,
            &[
                LayerKind::Input,
                LayerKind::Conv2D,
                LayerKind::MaxPooling2D,
                LayerKind::Flatten,
                LayerKind::Dense,
                LayerKind::Output,
            ],
        );
        let report = infer_shapes(&graph, ids[0], &DatasetDescriptor::mnist());

        assert_eq!(report.shape(ids[0]), Some(&Shape::batched(&[28, 28, 1])));
        assert_eq!(report.shape(ids[1]), Some(&Shape::batched(&[26, 26, 16])));
        assert_eq!(report.shape(ids[2]), Some(&Shape::batched(&[13, 13, 16])));
        assert_eq!(report.shape(ids[3]), Some(&Shape::batched(&[2704])));
        assert_eq!(report.shape(ids[4]), Some(&Shape::batched(&[32])));
        assert_eq!(report.shape(ids[5]), Some(&Shape::batched(&[10])));
    }

    #[test]
    fn output_units_follow_the_dataset_not_the_parameter() {
        let mut graph = LayerGraph::new();
        let ids = chain(
            &mut graph,
            &[LayerKind::Input, LayerKind::Recurrent, LayerKind::Output],
        );
        graph.set_param(ids[2], "units", ParamValue::Int(99)).unwrap();

        let report = infer_shapes(&graph, ids[0], &DatasetDescriptor::air_passengers());
        assert_eq!(report.shape(ids[0]), Some(&Shape::batched(&[12, 1])));
        assert_eq!(report.shape(ids[1]), Some(&Shape::batched(&[64])));
        assert_eq!(report.shape(ids[2]), Some(&Shape::batched(&[1])));
    }

    #[test]
    fn recurrent_after_image_input_gets_an_implicit_reshape() {
        let mut graph = LayerGraph::new();
        let ids = chain(&mut graph, &[LayerKind::Input, LayerKind::Lstm]);
        graph
            .set_param(ids[1], "returnSequences", ParamValue::Bool(true))
            .unwrap();

        let report = infer_shapes(&graph, ids[0], &DatasetDescriptor::cifar10());
        assert_eq!(report.shape(ids[1]), Some(&Shape::batched(&[32, 32])));
    }

    #[test]
    fn sequence_window_comes_from_the_first_recurrent_block() {
        let mut graph = LayerGraph::new();
        let ids = chain(&mut graph, &[LayerKind::Input, LayerKind::Lstm]);
        graph.set_param(ids[1], "timestep", ParamValue::Int(24)).unwrap();
        graph
            .set_param(ids[1], "returnSequences", ParamValue::Bool(true))
            .unwrap();

        let report = infer_shapes(&graph, ids[0], &DatasetDescriptor::air_passengers());
        assert_eq!(report.shape(ids[0]), Some(&Shape::batched(&[24, 1])));
        assert_eq!(report.shape(ids[1]), Some(&Shape::batched(&[24, 32])));
    }

    #[test]
    fn reshape_falls_back_to_height_by_width_times_channels() {
        let mut graph = LayerGraph::new();
        let ids = chain(&mut graph, &[LayerKind::Input, LayerKind::Reshape]);

        let report = infer_shapes(&graph, ids[0], &DatasetDescriptor::cifar10());
        assert_eq!(report.shape(ids[1]), Some(&Shape::batched(&[32, 96])));

        let report = infer_shapes(&graph, ids[0], &DatasetDescriptor::mnist());
        assert_eq!(report.shape(ids[1]), Some(&Shape::batched(&[28, 28])));
    }

    #[test]
    fn incompatible_shapes_read_as_unknown_downstream() {
        let mut graph = LayerGraph::new();
        let ids = chain(
            &mut graph,
            &[
                LayerKind::Input,
                LayerKind::Flatten,
                LayerKind::Conv2D,
                LayerKind::Dense,
            ],
        );
        let report = infer_shapes(&graph, ids[0], &DatasetDescriptor::mnist());

        assert!(report.shape(ids[1]).is_some());
        assert_eq!(report.shape(ids[2]), None);
        assert_eq!(report.shape(ids[3]), None);
    }

    #[test]
    fn multi_parent_non_merge_is_reported() {
        let mut graph = LayerGraph::new();
        let input = add(&mut graph, LayerKind::Input);
        let a = add(&mut graph, LayerKind::Flatten);
        let b = add(&mut graph, LayerKind::Flatten);
        let dense = add(&mut graph, LayerKind::Dense);
        graph.connect(input, a).unwrap();
        graph.connect(input, b).unwrap();
        graph.connect(a, dense).unwrap();
        graph.connect(b, dense).unwrap();

        let report = infer_shapes(&graph, input, &DatasetDescriptor::mnist());
        assert_eq!(report.violations, vec![dense]);
        assert_eq!(report.shape(dense), None);
    }

    #[test]
    fn concatenate_sums_the_feature_axis() {
        let mut graph = LayerGraph::new();
        let input = add(&mut graph, LayerKind::Input);
        let a = add(&mut graph, LayerKind::Flatten);
        let conv = add(&mut graph, LayerKind::Conv2D);
        let b = add(&mut graph, LayerKind::Flatten);
        let concat = add(&mut graph, LayerKind::Concatenate);
        graph.connect(input, a).unwrap();
        graph.connect(input, conv).unwrap();
        graph.connect(conv, b).unwrap();
        graph.connect(a, concat).unwrap();
        graph.connect(b, concat).unwrap();

        let report = infer_shapes(&graph, input, &DatasetDescriptor::mnist());
        assert_eq!(report.shape(concat), Some(&Shape::batched(&[784 + 26 * 26 * 16])));
    }

    #[test]
    fn add_rejects_mismatched_inputs() {
        let mut graph = LayerGraph::new();
        let input = add(&mut graph, LayerKind::Input);
        let conv = add(&mut graph, LayerKind::Conv2D);
        let merge = add(&mut graph, LayerKind::Add);
        graph.connect(input, conv).unwrap();
        graph.connect(input, merge).unwrap();
        graph.connect(conv, merge).unwrap();

        let report = infer_shapes(&graph, input, &DatasetDescriptor::mnist());
        assert_eq!(report.shape(merge), None);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn second_pass_reuses_cached_shapes() {
        let mut graph = LayerGraph::new();
        let ids = chain(
            &mut graph,
            &[
                LayerKind::Input,
                LayerKind::Conv2D,
                LayerKind::Flatten,
                LayerKind::Dense,
                LayerKind::Output,
            ],
        );
        let dataset = DatasetDescriptor::mnist();
        let mut engine = ShapeEngine::new();

        let sorted = sorter::sorted_nodes(&graph, ids[0]).unwrap();
        let first = engine.infer(&sorted, &dataset);
        assert_eq!(engine.recomputed(), 5);

        let second = engine.infer(&sorted, &dataset);
        assert_eq!(engine.recomputed(), 0);
        assert_eq!(first.shapes, second.shapes);

        graph.set_param(ids[3], "units", ParamValue::Int(64)).unwrap();
        let sorted = sorter::sorted_nodes(&graph, ids[0]).unwrap();
        let third = engine.infer(&sorted, &dataset);
        // Dense and the Output fed by it; the convolution prefix is reused
        assert_eq!(engine.recomputed(), 2);
        assert_eq!(third.shape(ids[3]), Some(&Shape::batched(&[64])));
        assert_eq!(third.shape(ids[4]), Some(&Shape::batched(&[10])));

        graph.set_param(ids[4], "units", ParamValue::Int(3)).unwrap();
        let sorted = sorter::sorted_nodes(&graph, ids[0]).unwrap();
        engine.infer(&sorted, &dataset);
        assert_eq!(engine.recomputed(), 1);
    }

    #[test]
    fn oversized_reshape_targets_fall_back_instead_of_overflowing() {
        let mut graph = LayerGraph::new();
        let ids = chain(&mut graph, &[LayerKind::Input, LayerKind::Reshape]);
        let huge = ParamValue::Int(1 << 33);
        graph.set_param(ids[1], "targetShape1", huge.clone()).unwrap();
        graph.set_param(ids[1], "targetShape2", huge).unwrap();

        let report = infer_shapes(&graph, ids[0], &DatasetDescriptor::mnist());
        assert_eq!(report.shape(ids[1]), Some(&Shape::batched(&[28, 28])));
    }

    #[test]
    fn flattening_too_many_elements_reads_as_unknown() {
        let mut graph = LayerGraph::new();
        let ids = chain(
            &mut graph,
            &[
                LayerKind::Input,
                LayerKind::Dense,
                LayerKind::Flatten,
                LayerKind::Output,
            ],
        );
        graph.set_param(ids[1], "units", ParamValue::Int(1 << 62)).unwrap();

        let report = infer_shapes(&graph, ids[0], &DatasetDescriptor::mnist());
        assert_eq!(report.shape(ids[1]), Some(&Shape::batched(&[28, 28, 1 << 62])));
        assert_eq!(report.shape(ids[2]), None);
        assert_eq!(report.shape(ids[3]), None);
    }

    #[test]
    fn huge_image_descriptor_leaves_the_recurrent_shape_unknown() {
        let mut graph = LayerGraph::new();
        let ids = chain(&mut graph, &[LayerKind::Input, LayerKind::Recurrent]);
        let dataset = DatasetDescriptor::image("wide", 4, 1 << 32, 1 << 32, 10);

        let report = infer_shapes(&graph, ids[0], &dataset);
        assert!(report.shape(ids[0]).is_some());
        assert_eq!(report.shape(ids[1]), None);
    }

    #[test]
    fn element_count_reports_overflow() {
        assert_eq!(Shape::batched(&[2, 3, 4]).element_count(), Some(24));
        assert_eq!(Shape::batched(&[usize::MAX, 2]).element_count(), None);
    }

    #[test]
    fn shapes_display_like_keras() {
        assert_eq!(Shape::batched(&[28, 28, 1]).to_string(), "(None, 28, 28, 1)");
        assert_eq!(
            serde_json::to_string(&Shape::batched(&[10])).unwrap(),
            "[null,10]"
        );
    }
}
