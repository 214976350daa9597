//! Search-space definitions: parameter specs, bounds, and the optimization goal.

use serde::{Deserialize, Serialize};

use crate::{config_error, SyResult};

/// Whether the experiment maximizes or minimizes its objective metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Goal {
    Maximize,
    Minimize,
}

impl Default for Goal {
    fn default() -> Self {
        Self::Maximize
    }
}

/// Describes how a single tunable parameter is bounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Integer range [min, max] inclusive.
    Int { min: i64, max: i64 },
    /// Continuous range [min, max] inclusive.
    Double { min: f64, max: f64 },
    /// Unordered set of choices, drawn as-is.
    Categorical { values: Vec<String> },
    /// Ordered list of allowed values (numeric on the caller's side, but
    /// carried and drawn as opaque strings, same as categorical).
    Discrete { values: Vec<String> },
}

/// A single parameter dimension in the search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Parameter name, unique within its search space (e.g. "learning_rate").
    pub name: String,
    /// The kind of range the parameter is drawn from.
    pub kind: ParameterKind,
}

/// The full search space: an ordered list of parameter specs plus the goal.
///
/// Order is irrelevant to correctness but kept stable so that downstream
/// key generation is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub parameters: Vec<ParameterSpec>,
    pub goal: Goal,
}

impl SearchSpace {
    pub fn new(goal: Goal) -> Self {
        Self {
            parameters: Vec::new(),
            goal,
        }
    }

    pub fn add_int(mut self, name: impl Into<String>, min: i64, max: i64) -> Self {
        self.parameters.push(ParameterSpec {
            name: name.into(),
            kind: ParameterKind::Int { min, max },
        });
        self
    }

    pub fn add_double(mut self, name: impl Into<String>, min: f64, max: f64) -> Self {
        self.parameters.push(ParameterSpec {
            name: name.into(),
            kind: ParameterKind::Double { min, max },
        });
        self
    }

    pub fn add_categorical(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.parameters.push(ParameterSpec {
            name: name.into(),
            kind: ParameterKind::Categorical { values },
        });
        self
    }

    pub fn add_discrete(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.parameters.push(ParameterSpec {
            name: name.into(),
            kind: ParameterKind::Discrete { values },
        });
        self
    }

    /// Checks the structural invariants: unique names, min <= max for numeric
    /// kinds, non-empty value lists for enumerated kinds.
    pub fn validate(&self) -> SyResult<()> {
        let mut seen = std::collections::HashSet::new();
        for param in &self.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(config_error!("duplicate parameter name: {}", param.name));
            }
            match &param.kind {
                ParameterKind::Int { min, max } => {
                    if min > max {
                        return Err(config_error!(
                            "parameter {}: min {} exceeds max {}",
                            param.name,
                            min,
                            max
                        ));
                    }
                }
                ParameterKind::Double { min, max } => {
                    if !min.is_finite() || !max.is_finite() || min > max {
                        return Err(config_error!(
                            "parameter {}: invalid range [{}, {}]",
                            param.name,
                            min,
                            max
                        ));
                    }
                }
                ParameterKind::Categorical { values } | ParameterKind::Discrete { values } => {
                    if values.is_empty() {
                        return Err(config_error!("parameter {}: empty value list", param.name));
                    }
                }
            }
        }
        Ok(())
    }
}
