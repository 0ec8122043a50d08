// Types used in the engine module
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema,
)]
pub enum LayerKind {
    Input,
    Output,
    Dense,
    Conv2D,
    MaxPooling2D,
    Flatten,
    Reshape,
    Dropout,
    BatchNorm,
    Add,
    Concatenate,
    Multiply,
    #[serde(alias = "SimpleRNN")]
    Recurrent,
    #[serde(rename = "LSTM")]
    Lstm,
    #[serde(rename = "GRU")]
    Gru,
}

impl LayerKind {
    pub const ALL: [LayerKind; 15] = [
        LayerKind::Input,
        LayerKind::Output,
        LayerKind::Dense,
        LayerKind::Conv2D,
        LayerKind::MaxPooling2D,
        LayerKind::Flatten,
        LayerKind::Reshape,
        LayerKind::Dropout,
        LayerKind::BatchNorm,
        LayerKind::Add,
        LayerKind::Concatenate,
        LayerKind::Multiply,
        LayerKind::Recurrent,
        LayerKind::Lstm,
        LayerKind::Gru,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LayerKind::Input => "Input",
            LayerKind::Output => "Output",
            LayerKind::Dense => "Dense",
            LayerKind::Conv2D => "Conv2D",
            LayerKind::MaxPooling2D => "MaxPooling2D",
            LayerKind::Flatten => "Flatten",
            LayerKind::Reshape => "Reshape",
            LayerKind::Dropout => "Dropout",
            LayerKind::BatchNorm => "BatchNorm",
            LayerKind::Add => "Add",
            LayerKind::Concatenate => "Concatenate",
            LayerKind::Multiply => "Multiply",
            LayerKind::Recurrent => "Recurrent",
            LayerKind::Lstm => "LSTM",
            LayerKind::Gru => "GRU",
        }
    }

    /// Input blocks never receive wires.
    pub fn accepts_parents(self) -> bool {
        self != LayerKind::Input
    }

    /// Output blocks never emit wires.
    pub fn emits_children(self) -> bool {
        self != LayerKind::Output
    }

    /// Kinds allowed to have more than one parent.
    pub fn is_merge(self) -> bool {
        matches!(
            self,
            LayerKind::Add | LayerKind::Concatenate | LayerKind::Multiply
        )
    }

    pub fn is_recurrent(self) -> bool {
        matches!(self, LayerKind::Recurrent | LayerKind::Lstm | LayerKind::Gru)
    }

    /// Kinds whose `timestep` parameter drives the sequence window.
    pub fn carries_timestep(self) -> bool {
        matches!(self, LayerKind::Recurrent | LayerKind::Lstm)
    }

    pub fn accepts_activation(self) -> bool {
        matches!(
            self,
            LayerKind::Dense
                | LayerKind::Conv2D
                | LayerKind::BatchNorm
                | LayerKind::Add
                | LayerKind::Concatenate
                | LayerKind::Multiply
                | LayerKind::Recurrent
                | LayerKind::Lstm
                | LayerKind::Gru
        )
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActivationType {
    Relu,
    Sigmoid,
    Tanh,
    Softmax,
}

impl ActivationType {
    /// Name understood by `keras.layers` and `keras.activations`.
    pub fn keras_name(self) -> &'static str {
        match self {
            ActivationType::Relu => "relu",
            ActivationType::Sigmoid => "sigmoid",
            ActivationType::Tanh => "tanh",
            ActivationType::Softmax => "softmax",
        }
    }
}

/// Scalar facts about the active dataset. Every image/sequence branch in the
/// engine switches on `is_sequence`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatasetDescriptor {
    #[serde(default = "DatasetDescriptor::default_name")]
    pub name: String,
    pub time_steps_or_height: usize,
    pub features_or_width: usize,
    pub channels: usize,
    pub num_classes: usize,
    pub is_sequence: bool,
}

impl DatasetDescriptor {
    pub const PRESETS: [&'static str; 3] = ["mnist", "cifar", "airpassengers"];

    fn default_name() -> String {
        "custom".to_string()
    }

    pub fn mnist() -> Self {
        Self::image("mnist", 28, 28, 1, 10)
    }

    pub fn cifar10() -> Self {
        Self::image("cifar", 32, 32, 3, 10)
    }

    pub fn air_passengers() -> Self {
        Self::sequence("airpassengers", 12, 1)
    }

    pub fn image(name: &str, height: usize, width: usize, channels: usize, classes: usize) -> Self {
        Self {
            name: name.to_string(),
            time_steps_or_height: height,
            features_or_width: width,
            channels,
            num_classes: classes,
            is_sequence: false,
        }
    }

    pub fn sequence(name: &str, time_steps: usize, features: usize) -> Self {
        Self {
            name: name.to_string(),
            time_steps_or_height: time_steps,
            features_or_width: features,
            channels: 1,
            num_classes: 1,
            is_sequence: true,
        }
    }

    /// Looks up one of the datasets selectable on the Input block.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "mnist" => Some(Self::mnist()),
            "cifar" | "cifar10" => Some(Self::cifar10()),
            "airpassengers" => Some(Self::air_passengers()),
            _ => None,
        }
    }

    /// Units of the final Dense: class count for classification, 1 for regression.
    pub fn output_units(&self) -> usize {
        if self.is_sequence { 1 } else { self.num_classes }
    }

    /// Checks a descriptor that came from outside: every extent must be
    /// positive, classification needs a class, and an image must have a
    /// representable element count.
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("timeStepsOrHeight", self.time_steps_or_height),
            ("featuresOrWidth", self.features_or_width),
            ("channels", self.channels),
        ] {
            if value == 0 {
                return Err(format!("dataset `{}` has zero {}", self.name, field));
            }
        }
        if !self.is_sequence && self.num_classes == 0 {
            return Err(format!("dataset `{}` has no classes", self.name));
        }
        self.time_steps_or_height
            .checked_mul(self.features_or_width)
            .and_then(|n| n.checked_mul(self.channels))
            .map(|_| ())
            .ok_or_else(|| format!("dataset `{}` is too large", self.name))
    }

    /// Module under `keras.datasets` that loads this dataset.
    pub fn python_module(&self) -> &str {
        match self.name.as_str() {
            "cifar" => "cifar10",
            name => name,
        }
    }
}

impl Default for DatasetDescriptor {
    fn default() -> Self {
        Self::mnist()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerType {
    Sgd,
    #[serde(rename = "rmsprop")]
    RmsProp,
    Adagrad,
    Adam,
}

impl OptimizerType {
    /// Class name under `keras.optimizers`.
    pub fn python_name(self) -> &'static str {
        match self {
            OptimizerType::Sgd => "SGD",
            OptimizerType::RmsProp => "RMSprop",
            OptimizerType::Adagrad => "Adagrad",
            OptimizerType::Adam => "Adam",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum LossType {
    CategoricalCrossentropy,
    Hinge,
    MeanSquaredError,
    MeanAbsoluteError,
}

impl LossType {
    /// Function name under `keras.losses`.
    pub fn python_name(self) -> &'static str {
        match self {
            LossType::CategoricalCrossentropy => "categorical_crossentropy",
            LossType::Hinge => "hinge",
            LossType::MeanSquaredError => "mean_squared_error",
            LossType::MeanAbsoluteError => "mean_absolute_error",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Hyperparameters {
    pub learning_rate: f64,
    pub batch_size: u32,
    pub epochs: u32,
    pub optimizer: OptimizerType,
    pub loss: LossType,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            batch_size: 64,
            epochs: 1200,
            optimizer: OptimizerType::Adam,
            loss: LossType::CategoricalCrossentropy,
        }
    }
}
