//! Multivariate TPE: joint draws over the whole search space.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sy_types::{ParameterKind, ParameterValue, SearchSpace};

use super::random::uniform_draw;
use super::{choice_index, split_observations, Observation, Sampler};
use crate::kde::GaussianKde;

/// Per-dimension density model used while scoring joint candidates.
enum DimModel {
    Numeric {
        l_kde: GaussianKde,
        g_kde: GaussianKde,
        min: f64,
        max: f64,
        integer: bool,
    },
    Choice {
        values: Vec<String>,
        /// Laplace-smoothed probability of each choice in the good group.
        l_probs: Vec<f64>,
        /// Laplace-smoothed probability of each choice in the bad group.
        g_probs: Vec<f64>,
    },
}

/// TPE sampler that models parameter correlations by drawing whole vectors
/// jointly from the good-group densities and scoring candidates with the
/// product of per-dimension density ratios.
///
/// The joint draw happens through [`Sampler::sample_relative`] when a
/// candidate is opened; during the startup phase (or when history is too
/// thin to fit densities) it declines and per-parameter uniform draws take
/// over.
pub struct MultivariateTpeSampler {
    gamma: f64,
    n_startup_trials: usize,
    n_ei_candidates: usize,
    rng: StdRng,
}

impl MultivariateTpeSampler {
    /// Defaults match [`TpeSampler`](super::tpe::TpeSampler): gamma 0.25,
    /// 10 startup trials, 24 EI candidates.
    pub fn new() -> Self {
        Self {
            gamma: 0.25,
            n_startup_trials: 10,
            n_ei_candidates: 24,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new()
        }
    }

    pub fn n_startup_trials(mut self, n: usize) -> Self {
        self.n_startup_trials = n;
        self
    }

    fn numeric_values(group: &[&Observation], name: &str) -> Vec<f64> {
        group
            .iter()
            .filter_map(|obs| match obs.params.get(name) {
                Some(ParameterValue::Double(v)) => Some(*v),
                Some(ParameterValue::Int(v)) => Some(*v as f64),
                _ => None,
            })
            .collect()
    }

    fn choice_probs(group: &[&Observation], name: &str, values: &[String]) -> Vec<f64> {
        let n = values.len();
        let mut counts = vec![0usize; n];
        for obs in group {
            if let Some(i) = obs.params.get(name).and_then(|v| choice_index(values, v)) {
                counts[i] += 1;
            }
        }
        let total = (group.len() + n) as f64;
        counts.iter().map(|&c| (c as f64 + 1.0) / total).collect()
    }

    /// Fits one density model per dimension; `None` if any numeric dimension
    /// lacks data on either side of the split.
    fn fit_models(
        space: &SearchSpace,
        good: &[&Observation],
        bad: &[&Observation],
    ) -> Option<Vec<(String, DimModel)>> {
        let mut models = Vec::with_capacity(space.parameters.len());
        for param in &space.parameters {
            let model = match &param.kind {
                ParameterKind::Double { min, max } => DimModel::Numeric {
                    l_kde: GaussianKde::fit(Self::numeric_values(good, &param.name))?,
                    g_kde: GaussianKde::fit(Self::numeric_values(bad, &param.name))?,
                    min: *min,
                    max: *max,
                    integer: false,
                },
                ParameterKind::Int { min, max } => DimModel::Numeric {
                    l_kde: GaussianKde::fit(Self::numeric_values(good, &param.name))?,
                    g_kde: GaussianKde::fit(Self::numeric_values(bad, &param.name))?,
                    min: *min as f64,
                    max: *max as f64,
                    integer: true,
                },
                ParameterKind::Categorical { values } | ParameterKind::Discrete { values } => {
                    DimModel::Choice {
                        values: values.clone(),
                        l_probs: Self::choice_probs(good, &param.name, values),
                        g_probs: Self::choice_probs(bad, &param.name, values),
                    }
                }
            };
            models.push((param.name.clone(), model));
        }
        Some(models)
    }

    /// Draws one joint candidate from the good-group densities and returns
    /// it with its log density-ratio score.
    fn draw_candidate(&mut self, models: &[(String, DimModel)]) -> (Vec<f64>, f64) {
        let mut point = Vec::with_capacity(models.len());
        let mut log_ratio = 0.0;
        for (_, model) in models {
            match model {
                DimModel::Numeric {
                    l_kde,
                    g_kde,
                    min,
                    max,
                    ..
                } => {
                    let x = l_kde.sample(&mut self.rng).clamp(*min, *max);
                    let l = l_kde.pdf(x).max(f64::MIN_POSITIVE);
                    let g = g_kde.pdf(x).max(f64::MIN_POSITIVE);
                    log_ratio += l.ln() - g.ln();
                    point.push(x);
                }
                DimModel::Choice {
                    l_probs, g_probs, ..
                } => {
                    let threshold = self.rng.gen::<f64>() * l_probs.iter().sum::<f64>();
                    let mut cumulative = 0.0;
                    let mut idx = l_probs.len() - 1;
                    for (i, p) in l_probs.iter().enumerate() {
                        cumulative += p;
                        if cumulative >= threshold {
                            idx = i;
                            break;
                        }
                    }
                    log_ratio += l_probs[idx].ln() - g_probs[idx].ln();
                    point.push(idx as f64);
                }
            }
        }
        (point, log_ratio)
    }
}

impl Default for MultivariateTpeSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for MultivariateTpeSampler {
    fn sample_relative(
        &mut self,
        space: &SearchSpace,
        history: &[Observation],
    ) -> Option<HashMap<String, ParameterValue>> {
        if history.len() < self.n_startup_trials.max(2) || space.parameters.is_empty() {
            return None;
        }
        let (good, bad) = split_observations(history, self.gamma);
        let models = Self::fit_models(space, &good, &bad)?;

        let mut best: Option<(Vec<f64>, f64)> = None;
        for _ in 0..self.n_ei_candidates {
            let (point, score) = self.draw_candidate(&models);
            if best.as_ref().map_or(true, |(_, s)| score > *s) {
                best = Some((point, score));
            }
        }
        let (point, _) = best?;

        let mut result = HashMap::with_capacity(models.len());
        for ((name, model), raw) in models.iter().zip(point) {
            let value = match model {
                DimModel::Numeric {
                    min, max, integer, ..
                } => {
                    if *integer {
                        ParameterValue::Int((raw.round() as i64).clamp(*min as i64, *max as i64))
                    } else {
                        ParameterValue::Double(raw.clamp(*min, *max))
                    }
                }
                DimModel::Choice { values, .. } => {
                    ParameterValue::Str(values[raw as usize].clone())
                }
            };
            result.insert(name.clone(), value);
        }
        Some(result)
    }

    fn sample_independent(
        &mut self,
        _name: &str,
        kind: &ParameterKind,
        _history: &[Observation],
    ) -> ParameterValue {
        uniform_draw(kind, &mut self.rng)
    }
}
