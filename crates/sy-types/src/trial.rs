//! Trial and assignment value objects exchanged with the experiment controller.

use serde::{Deserialize, Serialize};

/// A concrete value assigned to one parameter.
///
/// The runtime variant matches the owning [`ParameterKind`](crate::ParameterKind):
/// `Int` for integer ranges, `Double` for continuous ranges, `Str` for
/// categorical and discrete draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int(i64),
    Double(f64),
    Str(String),
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
        }
    }
}

/// One (parameter name, value) pair; a full set of assignments is one point
/// in the search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub name: String,
    pub value: ParameterValue,
}

impl Assignment {
    pub fn new(name: impl Into<String>, value: ParameterValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl std::fmt::Display for Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// A historical trial reported by the experiment controller.
///
/// The name is an opaque identity assigned by the caller, not by this
/// system. The metric is absent while the trial is still being evaluated;
/// controllers may resend the same trial (same name) on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub name: String,
    pub assignments: Vec<Assignment>,
    /// Observed objective value, once the trial has been evaluated.
    pub metric: Option<f64>,
}

impl Trial {
    pub fn new(name: impl Into<String>, assignments: Vec<Assignment>) -> Self {
        Self {
            name: name.into(),
            assignments,
            metric: None,
        }
    }

    pub fn with_metric(mut self, value: f64) -> Self {
        self.metric = Some(value);
        self
    }
}
