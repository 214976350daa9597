//! Sampler trait and shared machinery for the sampling strategies.

pub mod multivariate;
pub mod random;
pub mod tpe;

use std::collections::HashMap;

use sy_types::{ParameterKind, ParameterValue, SearchSpace};

/// One completed observation: the parameter values of a told candidate and
/// its objective, normalized so that lower loss is always better.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// The study-assigned candidate sequence number.
    pub number: u64,
    /// Sampled values keyed by parameter name.
    pub params: HashMap<String, ParameterValue>,
    /// Direction-normalized objective (maximizing studies negate).
    pub loss: f64,
}

/// Pluggable sampling strategy driven by the [`Study`](crate::Study).
///
/// `sample_relative` gives a sampler the chance to draw the whole point
/// jointly when a candidate is opened; samplers that model parameters
/// independently return `None` and are called once per parameter through
/// `sample_independent` instead.
pub trait Sampler: Send {
    /// Joint draw over the full search space, or `None` to defer to
    /// per-parameter sampling.
    fn sample_relative(
        &mut self,
        _space: &SearchSpace,
        _history: &[Observation],
    ) -> Option<HashMap<String, ParameterValue>> {
        None
    }

    /// Draws a single parameter value from its declared range.
    fn sample_independent(
        &mut self,
        name: &str,
        kind: &ParameterKind,
        history: &[Observation],
    ) -> ParameterValue;
}

/// Splits observations into (good, bad) at the gamma quantile of loss.
///
/// Guarantees at least one observation on each side, so callers need two or
/// more observations for a meaningful split.
pub(crate) fn split_observations(
    history: &[Observation],
    gamma: f64,
) -> (Vec<&Observation>, Vec<&Observation>) {
    if history.len() < 2 {
        return (history.iter().collect(), Vec::new());
    }
    let mut order: Vec<usize> = (0..history.len()).collect();
    order.sort_by(|&a, &b| {
        history[a]
            .loss
            .partial_cmp(&history[b].loss)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let gamma = gamma.clamp(f64::EPSILON, 1.0 - f64::EPSILON);
    let n_good = ((history.len() as f64 * gamma).ceil() as usize)
        .max(1)
        .min(history.len() - 1);

    let good = order[..n_good].iter().map(|&i| &history[i]).collect();
    let bad = order[n_good..].iter().map(|&i| &history[i]).collect();
    (good, bad)
}

/// Position of a drawn value inside an enumerated value list.
pub(crate) fn choice_index(values: &[String], value: &ParameterValue) -> Option<usize> {
    match value {
        ParameterValue::Str(s) => values.iter().position(|v| v == s),
        _ => None,
    }
}
