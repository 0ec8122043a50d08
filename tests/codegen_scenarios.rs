//! End-to-end export scenarios: build a graph, sort it, generate the script.

use visual_keras::engine::params::ParamValue;
use visual_keras::engine::sorter::{sorted_nodes, topological_sort};
use visual_keras::engine::transpiler::{emit_model_lines, generate_python, transpile};
use visual_keras::engine::types::{
    ActivationType, DatasetDescriptor, Hyperparameters, LayerKind,
};
use visual_keras::engine::{GraphError, LayerGraph, NodeId, Position};

fn chain(kinds: &[LayerKind]) -> (LayerGraph, Vec<NodeId>) {
    let mut graph = LayerGraph::new();
    let ids: Vec<NodeId> = kinds
        .iter()
        .map(|k| graph.add_node(*k, Position::default()).unwrap())
        .collect();
    for pair in ids.windows(2) {
        graph.connect(pair[0], pair[1]).unwrap();
    }
    (graph, ids)
}

fn model_lines(graph: &LayerGraph, dataset: &DatasetDescriptor) -> Vec<String> {
    let sorted = sorted_nodes(graph, graph.input().unwrap()).unwrap();
    emit_model_lines(&sorted, dataset).unwrap()
}

#[test]
fn mnist_conv_stack_emits_five_assignments() {
    let (mut graph, ids) = chain(&[
        LayerKind::Input,
        LayerKind::Conv2D,
        LayerKind::Flatten,
        LayerKind::Dense,
        LayerKind::Output,
    ]);
    graph
        .set_param(ids[1], "filters", ParamValue::Int(16))
        .unwrap();
    graph.set_param(ids[3], "units", ParamValue::Int(10)).unwrap();

    assert_eq!(topological_sort(&graph, ids[0]).unwrap(), ids);

    let lines = model_lines(&graph, &DatasetDescriptor::mnist());
    let assignments: Vec<&String> = lines.iter().filter(|l| l.starts_with('x')).collect();
    assert_eq!(assignments.len(), 5);
    assert_eq!(
        assignments,
        vec![
            &format!("x{} = Input(shape=input_shape)", ids[0]),
            &format!(
                "x{} = Conv2D(16, (3, 3), strides=(1, 1), padding='valid')(x{})",
                ids[1], ids[0]
            ),
            &format!("x{} = Flatten()(x{})", ids[2], ids[1]),
            &format!("x{} = Dense(10)(x{})", ids[3], ids[2]),
            &format!("x{} = Dense(10, activation='softmax')(x{})", ids[4], ids[3]),
        ]
    );
    assert_eq!(
        lines.last().unwrap(),
        &format!("model = Model(inputs=x{}, outputs=x{})", ids[0], ids[4])
    );
}

#[test]
fn recurrent_on_a_sequence_needs_no_reshape() {
    let (graph, ids) = chain(&[
        LayerKind::Input,
        LayerKind::Recurrent,
        LayerKind::Flatten,
        LayerKind::Dense,
        LayerKind::Output,
    ]);
    let sequence = DatasetDescriptor::sequence("airpassengers", 12, 1);
    let lines = model_lines(&graph, &sequence);

    assert!(lines.iter().all(|l| !l.contains("Reshape")));
    assert_eq!(
        lines[1],
        format!(
            "x{} = SimpleRNN(64, dropout=0.2, recurrent_dropout=0.2)(x{})",
            ids[1], ids[0]
        )
    );
}

#[test]
fn recurrent_on_an_image_gets_exactly_one_reshape_before_it() {
    let (graph, ids) = chain(&[
        LayerKind::Input,
        LayerKind::Recurrent,
        LayerKind::Flatten,
        LayerKind::Dense,
        LayerKind::Output,
    ]);
    let lines = model_lines(&graph, &DatasetDescriptor::mnist());

    let reshapes: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.contains("Reshape("))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(reshapes.len(), 1);

    let at = reshapes[0];
    assert_eq!(
        lines[at],
        format!("x_reshape_{} = Reshape((28, 28))(x{})", ids[1], ids[0])
    );
    assert!(lines[at + 1].starts_with(&format!("x{} = SimpleRNN(", ids[1])));
    assert!(lines[at + 1].ends_with(&format!("(x_reshape_{})", ids[1])));
}

#[test]
fn cifar_reshape_folds_channels_into_features() {
    let (graph, ids) = chain(&[LayerKind::Input, LayerKind::Gru, LayerKind::Output]);
    let lines = model_lines(&graph, &DatasetDescriptor::cifar10());
    assert!(lines.contains(&format!("x_reshape_{} = Reshape((32, 96))(x{})", ids[1], ids[0])));
}

#[test]
fn user_reshape_suppresses_the_automatic_one() {
    let (graph, _) = chain(&[
        LayerKind::Input,
        LayerKind::Reshape,
        LayerKind::Lstm,
        LayerKind::Output,
    ]);
    let lines = model_lines(&graph, &DatasetDescriptor::mnist());
    assert_eq!(lines.iter().filter(|l| l.contains("Reshape(")).count(), 1);
    assert!(lines.iter().all(|l| !l.contains("x_reshape_")));
}

#[test]
fn batch_norm_with_sigmoid_aborts_the_export() {
    let (mut graph, ids) = chain(&[
        LayerKind::Input,
        LayerKind::BatchNorm,
        LayerKind::Flatten,
        LayerKind::Output,
    ]);
    graph
        .set_activation(ids[1], Some(ActivationType::Sigmoid))
        .unwrap();
    let before = graph.clone();

    let result = transpile(
        &graph,
        &Hyperparameters::default(),
        &DatasetDescriptor::mnist(),
    );
    assert!(matches!(
        result,
        Err(GraphError::UnsupportedCombination { node, .. }) if node == ids[1]
    ));
    assert_eq!(graph.len(), before.len());
    assert_eq!(graph.get(ids[1]).unwrap().activation(), Some(ActivationType::Sigmoid));
}

#[test]
fn time_series_window_comes_from_the_first_recurrent_block() {
    let (mut graph, ids) = chain(&[
        LayerKind::Input,
        LayerKind::Lstm,
        LayerKind::Recurrent,
        LayerKind::Output,
    ]);
    graph
        .set_param(ids[1], "returnSequences", ParamValue::Bool(true))
        .unwrap();
    graph.set_param(ids[1], "timestep", ParamValue::Int(9)).unwrap();
    graph.set_param(ids[2], "timestep", ParamValue::Int(30)).unwrap();

    let dataset = DatasetDescriptor::air_passengers();
    let sorted = sorted_nodes(&graph, ids[0]).unwrap();
    let code = generate_python(&sorted, &Hyperparameters::default(), &dataset).unwrap();
    assert!(code.contains("time_step = 9\n"));
    assert!(code.contains("input_shape = (time_step, 1)"));
}

#[test]
fn time_series_window_defaults_to_twelve() {
    let (graph, ids) = chain(&[LayerKind::Input, LayerKind::Gru, LayerKind::Output]);
    let dataset = DatasetDescriptor::air_passengers();
    let sorted = sorted_nodes(&graph, ids[0]).unwrap();
    let code = generate_python(&sorted, &Hyperparameters::default(), &dataset).unwrap();
    assert!(code.contains("time_step = 12\n"));
}

#[test]
fn generation_is_repeatable() {
    let (graph, _) = chain(&[
        LayerKind::Input,
        LayerKind::Conv2D,
        LayerKind::MaxPooling2D,
        LayerKind::Flatten,
        LayerKind::Dropout,
        LayerKind::Output,
    ]);
    let hyper = Hyperparameters::default();
    let dataset = DatasetDescriptor::mnist();
    let first = transpile(&graph, &hyper, &dataset).unwrap();
    let second = transpile(&graph, &hyper, &dataset).unwrap();
    assert_eq!(first, second);
    assert!(first.contains("MaxPooling2D(pool_size=(2, 2), strides=(2, 2))"));
    assert!(first.contains("Dropout(0.5)"));
    assert!(first.contains("loss=keras.losses.categorical_crossentropy"));
}

#[test]
fn orphaned_blocks_are_not_exported() {
    let (mut graph, ids) = chain(&[LayerKind::Input, LayerKind::Flatten, LayerKind::Output]);
    let scratch = graph.add_node(LayerKind::Dense, Position::default()).unwrap();
    let lines = model_lines(&graph, &DatasetDescriptor::mnist());
    assert!(lines.iter().all(|l| !l.contains(&format!("x{} ", scratch))));
    assert_eq!(lines.len(), ids.len() + 1);
}
