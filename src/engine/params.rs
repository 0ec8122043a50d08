// Declared parameter schema per layer kind and schema-driven coercion
use crate::engine::error::{GraphError, Result};
use crate::engine::types::LayerKind;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ParamType {
    Int {
        default: i64,
        min: i64,
    },
    Float {
        default: f64,
        min: f64,
        max: f64,
        /// `max` itself is out of range.
        #[serde(rename = "exclusiveMax")]
        exclusive_max: bool,
    },
    Bool {
        default: bool,
    },
    Choice {
        default: &'static str,
        options: &'static [&'static str],
    },
}

impl ParamType {
    pub fn default_value(&self) -> ParamValue {
        match *self {
            ParamType::Int { default, .. } => ParamValue::Int(default),
            ParamType::Float { default, .. } => ParamValue::Float(default),
            ParamType::Bool { default } => ParamValue::Bool(default),
            ParamType::Choice { default, .. } => ParamValue::Text(default.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    #[serde(flatten)]
    pub ty: ParamType,
}

const fn int(name: &'static str, default: i64) -> ParamSpec {
    ParamSpec {
        name,
        ty: ParamType::Int { default, min: 1 },
    }
}

const fn fraction(name: &'static str, default: f64) -> ParamSpec {
    ParamSpec {
        name,
        ty: ParamType::Float {
            default,
            min: 0.0,
            max: 1.0,
            exclusive_max: false,
        },
    }
}

/// Fraction in [0, 1); a dropout rate of 1 would drop everything.
const fn rate(name: &'static str, default: f64) -> ParamSpec {
    ParamSpec {
        name,
        ty: ParamType::Float {
            default,
            min: 0.0,
            max: 1.0,
            exclusive_max: true,
        },
    }
}

const fn flag(name: &'static str, default: bool) -> ParamSpec {
    ParamSpec {
        name,
        ty: ParamType::Bool { default },
    }
}

const INPUT: &[ParamSpec] = &[ParamSpec {
    name: "dataset",
    ty: ParamType::Choice {
        default: "mnist",
        options: &["mnist", "cifar", "airpassengers"],
    },
}];
const OUTPUT: &[ParamSpec] = &[int("units", 10)];
const DENSE: &[ParamSpec] = &[int("units", 32)];
const CONV2D: &[ParamSpec] = &[
    int("filters", 16),
    int("kernelSize", 3),
    int("strides", 1),
    ParamSpec {
        name: "padding",
        ty: ParamType::Choice {
            default: "valid",
            options: &["valid", "same"],
        },
    },
];
const MAX_POOLING: &[ParamSpec] = &[int("poolSize", 2), int("strides", 2)];
const RESHAPE: &[ParamSpec] = &[int("targetShape1", 28), int("targetShape2", 28)];
const DROPOUT: &[ParamSpec] = &[rate("rate", 0.5)];
const BATCH_NORM: &[ParamSpec] = &[fraction("momentum", 0.99)];
const RECURRENT: &[ParamSpec] = &[
    int("units", 64),
    flag("returnSequences", false),
    fraction("dropout", 0.2),
    fraction("recurrentDropout", 0.2),
    int("timestep", 12),
];
const LSTM: &[ParamSpec] = &[
    int("units", 32),
    flag("returnSequences", false),
    fraction("dropout", 0.2),
    fraction("recurrentDropout", 0.2),
    int("timestep", 12),
];
const GRU: &[ParamSpec] = &[int("units", 32), flag("returnSequences", false)];

/// Ordered parameter declarations for `kind`.
pub fn schema(kind: LayerKind) -> &'static [ParamSpec] {
    match kind {
        LayerKind::Input => INPUT,
        LayerKind::Output => OUTPUT,
        LayerKind::Dense => DENSE,
        LayerKind::Conv2D => CONV2D,
        LayerKind::MaxPooling2D => MAX_POOLING,
        LayerKind::Reshape => RESHAPE,
        LayerKind::Dropout => DROPOUT,
        LayerKind::BatchNorm => BATCH_NORM,
        LayerKind::Recurrent => RECURRENT,
        LayerKind::Lstm => LSTM,
        LayerKind::Gru => GRU,
        LayerKind::Flatten | LayerKind::Add | LayerKind::Concatenate | LayerKind::Multiply => &[],
    }
}

pub fn spec(kind: LayerKind, name: &str) -> Option<&'static ParamSpec> {
    schema(kind).iter().find(|spec| spec.name == name)
}

fn invalid(kind: LayerKind, name: &str, message: impl Into<String>) -> GraphError {
    GraphError::InvalidParameter {
        kind: kind.to_string(),
        name: name.to_string(),
        message: message.into(),
    }
}

/// Checks `value` against the declaration for `name` and normalises it to the
/// declared type. Text boxes on the front end send numbers as strings, so
/// numeric text is accepted for int and float parameters.
pub fn coerce(kind: LayerKind, name: &str, value: ParamValue) -> Result<ParamValue> {
    let spec = spec(kind, name).ok_or_else(|| invalid(kind, name, "unknown parameter"))?;

    match spec.ty {
        ParamType::Int { min, .. } => {
            let parsed = match value {
                ParamValue::Int(i) => i,
                ParamValue::Float(x) if x.is_finite() && x.fract() == 0.0 => x as i64,
                ParamValue::Text(ref s) => s
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| invalid(kind, name, format!("`{}` is not an integer", s)))?,
                other => {
                    return Err(invalid(kind, name, format!("expected an integer, got {}", other)));
                }
            };
            if parsed < min {
                return Err(invalid(kind, name, format!("must be at least {}", min)));
            }
            Ok(ParamValue::Int(parsed))
        }
        ParamType::Float {
            min,
            max,
            exclusive_max,
            ..
        } => {
            let parsed = match value {
                ParamValue::Float(x) => x,
                ParamValue::Int(i) => i as f64,
                ParamValue::Text(ref s) => s
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| invalid(kind, name, format!("`{}` is not a number", s)))?,
                ParamValue::Bool(b) => {
                    return Err(invalid(kind, name, format!("expected a number, got {}", b)));
                }
            };
            let above = if exclusive_max {
                parsed >= max
            } else {
                parsed > max
            };
            if !parsed.is_finite() || parsed < min || above {
                let close = if exclusive_max { ")" } else { "]" };
                return Err(invalid(
                    kind,
                    name,
                    format!("must lie within [{}, {}{}", min, max, close),
                ));
            }
            Ok(ParamValue::Float(parsed))
        }
        ParamType::Bool { .. } => match value {
            ParamValue::Bool(b) => Ok(ParamValue::Bool(b)),
            ParamValue::Text(ref s) if s.eq_ignore_ascii_case("true") => Ok(ParamValue::Bool(true)),
            ParamValue::Text(ref s) if s.eq_ignore_ascii_case("false") => {
                Ok(ParamValue::Bool(false))
            }
            other => Err(invalid(kind, name, format!("expected true or false, got {}", other))),
        },
        ParamType::Choice { options, .. } => match value {
            ParamValue::Text(s) if options.contains(&s.as_str()) => Ok(ParamValue::Text(s)),
            other => Err(invalid(
                kind,
                name,
                format!("`{}` is not one of {:?}", other, options),
            )),
        },
    }
}

/// Explicitly set parameter values; anything absent reads as its declared default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, ParamValue>);

impl Parameters {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: &str, value: ParamValue) {
        self.0.insert(name.to_string(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Typed view over a node's parameters with schema defaults filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParams {
    kind: LayerKind,
    values: Vec<(&'static str, ParamValue)>,
}

impl ResolvedParams {
    pub fn resolve(kind: LayerKind, explicit: &Parameters) -> Self {
        let values = schema(kind)
            .iter()
            .map(|spec| {
                let value = explicit
                    .get(spec.name)
                    .cloned()
                    .unwrap_or_else(|| spec.ty.default_value());
                (spec.name, value)
            })
            .collect();
        Self { kind, values }
    }

    pub fn entries(&self) -> &[(&'static str, ParamValue)] {
        &self.values
    }

    fn lookup(&self, name: &str) -> Result<&ParamValue> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| invalid(self.kind, name, "unknown parameter"))
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        match self.lookup(name)? {
            ParamValue::Int(i) => Ok(*i),
            other => Err(invalid(self.kind, name, format!("expected an integer, got {}", other))),
        }
    }

    /// Positive integer read used for dimensions and unit counts.
    pub fn dim(&self, name: &str) -> Result<usize> {
        let value = self.int(name)?;
        usize::try_from(value)
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| invalid(self.kind, name, "must be positive"))
    }

    pub fn float(&self, name: &str) -> Result<f64> {
        match self.lookup(name)? {
            ParamValue::Float(x) => Ok(*x),
            ParamValue::Int(i) => Ok(*i as f64),
            other => Err(invalid(self.kind, name, format!("expected a number, got {}", other))),
        }
    }

    pub fn flag(&self, name: &str) -> Result<bool> {
        match self.lookup(name)? {
            ParamValue::Bool(b) => Ok(*b),
            other => Err(invalid(self.kind, name, format!("expected a flag, got {}", other))),
        }
    }

    pub fn text(&self, name: &str) -> Result<&str> {
        match self.lookup(name)? {
            ParamValue::Text(s) => Ok(s.as_str()),
            other => Err(invalid(self.kind, name, format!("expected text, got {}", other))),
        }
    }
}
