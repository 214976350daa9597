//! Conversion from the externally-declared experiment to a [`SearchSpace`].
//!
//! The declaration carries feasible-space bounds as strings, exactly as the
//! experiment controller transmits them; numeric parsing happens here and
//! malformed bounds surface as configuration errors.

use serde::{Deserialize, Serialize};

use sy_types::{config_error, Goal, SearchSpace, SyResult};

/// The experiment declaration sent with every request (only the first one
/// received by a service instance is acted upon).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSpec {
    pub algorithm: AlgorithmSpec,
    pub objective: ObjectiveSpec,
    pub parameters: Vec<ParameterDecl>,
}

/// Which sampling algorithm the experiment requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmSpec {
    /// Algorithm identifier, e.g. "tpe" or "multivariate-tpe".
    pub name: String,
}

/// Objective declaration: the optimization direction and the metric it
/// applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveSpec {
    pub goal: Goal,
    /// Name of the objective metric (e.g. "validation-accuracy").
    #[serde(default)]
    pub metric_name: String,
}

/// One declared tunable parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDecl {
    pub name: String,
    /// Declared type: "int", "double", "categorical", or "discrete".
    #[serde(rename = "type")]
    pub parameter_type: String,
    pub feasible_space: FeasibleSpace,
}

/// Bounds as carried on the wire: strings for numeric ranges, a string list
/// for enumerated parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeasibleSpace {
    #[serde(default)]
    pub min: String,
    #[serde(default)]
    pub max: String,
    #[serde(default)]
    pub list: Vec<String>,
}

/// Builds a validated [`SearchSpace`] from the experiment declaration.
///
/// Pure and deterministic; fails with [`SyError::Config`](sy_types::SyError)
/// on an unrecognized parameter type or malformed bounds.
pub fn convert_search_space(experiment: &ExperimentSpec) -> SyResult<SearchSpace> {
    let mut space = SearchSpace::new(experiment.objective.goal);

    for param in &experiment.parameters {
        let feasible = &param.feasible_space;
        space = match param.parameter_type.as_str() {
            "int" => space.add_int(
                &param.name,
                parse_bound(&param.name, "min", &feasible.min)?,
                parse_bound(&param.name, "max", &feasible.max)?,
            ),
            "double" => space.add_double(
                &param.name,
                parse_bound(&param.name, "min", &feasible.min)?,
                parse_bound(&param.name, "max", &feasible.max)?,
            ),
            "categorical" => space.add_categorical(&param.name, feasible.list.clone()),
            "discrete" => space.add_discrete(&param.name, feasible.list.clone()),
            other => {
                return Err(config_error!(
                    "parameter {}: unrecognized type \"{}\"",
                    param.name,
                    other
                ))
            }
        };
    }

    space.validate()?;
    Ok(space)
}

fn parse_bound<T: std::str::FromStr>(name: &str, which: &str, raw: &str) -> SyResult<T> {
    raw.parse()
        .map_err(|_| config_error!("parameter {name}: {which} bound \"{raw}\" is not numeric"))
}
