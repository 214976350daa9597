//! Tree-structured Parzen Estimator sampling, one parameter at a time.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sy_types::{ParameterKind, ParameterValue};

use super::random::uniform_draw;
use super::{choice_index, split_observations, Observation, Sampler};
use crate::kde::GaussianKde;

/// TPE sampler modeling each parameter independently.
///
/// Completed observations are split into a "good" group (losses below the
/// gamma quantile) and a "bad" group. A Gaussian KDE is fitted to each
/// group's values for the parameter being sampled, and the draw with the
/// highest l(x)/g(x) density ratio among `n_ei_candidates` candidates wins.
/// Until `n_startup_trials` observations exist the sampler draws uniformly.
pub struct TpeSampler {
    gamma: f64,
    n_startup_trials: usize,
    n_ei_candidates: usize,
    rng: StdRng,
}

impl TpeSampler {
    /// Defaults: gamma 0.25, 10 startup trials, 24 EI candidates.
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

    pub fn gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Observed values of one parameter within a group, as floats.
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

    /// Continuous TPE draw: fit KDEs to both groups, draw candidates from
    /// the good-group density, keep the best ratio.
    fn sample_float(&mut self, min: f64, max: f64, good: Vec<f64>, bad: Vec<f64>) -> f64 {
        let (Some(l_kde), Some(g_kde)) = (GaussianKde::fit(good), GaussianKde::fit(bad)) else {
            return self.rng.gen_range(min..=max);
        };

        let mut best = min;
        let mut best_ratio = f64::NEG_INFINITY;
        for _ in 0..self.n_ei_candidates {
            let candidate = l_kde.sample(&mut self.rng).clamp(min, max);
            let l = l_kde.pdf(candidate);
            let g = g_kde.pdf(candidate);
            let ratio = if g < f64::EPSILON {
                if l > f64::EPSILON {
                    f64::INFINITY
                } else {
                    0.0
                }
            } else {
                l / g
            };
            if ratio > best_ratio {
                best_ratio = ratio;
                best = candidate;
            }
        }
        best
    }

    /// Enumerated TPE draw: weight each choice by its Laplace-smoothed
    /// good/bad frequency ratio and sample proportionally.
    fn sample_choice(
        &mut self,
        values: &[String],
        good: &[&Observation],
        bad: &[&Observation],
        name: &str,
    ) -> String {
        let n = values.len();
        let mut good_counts = vec![0usize; n];
        let mut bad_counts = vec![0usize; n];
        for obs in good {
            if let Some(i) = obs.params.get(name).and_then(|v| choice_index(values, v)) {
                good_counts[i] += 1;
            }
        }
        for obs in bad {
            if let Some(i) = obs.params.get(name).and_then(|v| choice_index(values, v)) {
                bad_counts[i] += 1;
            }
        }

        let good_total = (good.len() + n) as f64;
        let bad_total = (bad.len() + n) as f64;
        let weights: Vec<f64> = (0..n)
            .map(|i| {
                let l = (good_counts[i] as f64 + 1.0) / good_total;
                let g = (bad_counts[i] as f64 + 1.0) / bad_total;
                l / g
            })
            .collect();

        let total: f64 = weights.iter().sum();
        let threshold = self.rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        for (i, w) in weights.iter().enumerate() {
            cumulative += w;
            if cumulative >= threshold {
                return values[i].clone();
            }
        }
        values[n - 1].clone()
    }
}

impl Default for TpeSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for TpeSampler {
    fn sample_independent(
        &mut self,
        name: &str,
        kind: &ParameterKind,
        history: &[Observation],
    ) -> ParameterValue {
        if history.len() < self.n_startup_trials.max(2) {
            return uniform_draw(kind, &mut self.rng);
        }
        let (good, bad) = split_observations(history, self.gamma);

        match kind {
            ParameterKind::Double { min, max } => {
                let good_vals = Self::numeric_values(&good, name);
                let bad_vals = Self::numeric_values(&bad, name);
                ParameterValue::Double(self.sample_float(*min, *max, good_vals, bad_vals))
            }
            ParameterKind::Int { min, max } => {
                let good_vals = Self::numeric_values(&good, name);
                let bad_vals = Self::numeric_values(&bad, name);
                let drawn = self.sample_float(*min as f64, *max as f64, good_vals, bad_vals);
                ParameterValue::Int((drawn.round() as i64).clamp(*min, *max))
            }
            ParameterKind::Categorical { values } | ParameterKind::Discrete { values } => {
                ParameterValue::Str(self.sample_choice(values, &good, &bad, name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn obs_double(number: u64, name: &str, value: f64, loss: f64) -> Observation {
        let mut params = HashMap::new();
        params.insert(name.to_string(), ParameterValue::Double(value));
        Observation {
            number,
            params,
            loss,
        }
    }

    fn obs_choice(number: u64, name: &str, value: &str, loss: f64) -> Observation {
        let mut params = HashMap::new();
        params.insert(name.to_string(), ParameterValue::Str(value.to_string()));
        Observation {
            number,
            params,
            loss,
        }
    }

    #[test]
    fn startup_phase_draws_uniformly_in_bounds() {
        let mut sampler = TpeSampler::with_seed(11);
        let kind = ParameterKind::Double { min: 0.0, max: 1.0 };
        for _ in 0..50 {
            match sampler.sample_independent("x", &kind, &[]) {
                ParameterValue::Double(v) => assert!((0.0..=1.0).contains(&v)),
                other => panic!("unexpected value: {other:?}"),
            }
        }
    }

    #[test]
    fn informed_phase_stays_in_bounds() {
        let mut sampler = TpeSampler::with_seed(12).n_startup_trials(5);
        let kind = ParameterKind::Double { min: -2.0, max: 2.0 };
        // Quadratic loss centered at 0.5
        let history: Vec<_> = (0..20)
            .map(|i| {
                let x = -2.0 + 4.0 * (i as f64 / 19.0);
                obs_double(i, "x", x, (x - 0.5) * (x - 0.5))
            })
            .collect();
        for _ in 0..50 {
            match sampler.sample_independent("x", &kind, &history) {
                ParameterValue::Double(v) => assert!((-2.0..=2.0).contains(&v)),
                other => panic!("unexpected value: {other:?}"),
            }
        }
    }

    #[test]
    fn informed_phase_concentrates_near_good_region() {
        let mut sampler = TpeSampler::with_seed(13).n_startup_trials(5);
        let kind = ParameterKind::Double {
            min: 0.0,
            max: 10.0,
        };
        let history: Vec<_> = (0..30)
            .map(|i| {
                let x = 10.0 * (i as f64 / 29.0);
                obs_double(i, "x", x, (x - 2.0).abs())
            })
            .collect();

        let draws: Vec<f64> = (0..100)
            .map(|_| match sampler.sample_independent("x", &kind, &history) {
                ParameterValue::Double(v) => v,
                other => panic!("unexpected value: {other:?}"),
            })
            .collect();
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        assert!(
            mean < 5.0,
            "draws should lean toward the low-loss region, mean = {mean}"
        );
    }

    #[test]
    fn int_draws_are_integers_in_bounds() {
        let mut sampler = TpeSampler::with_seed(14).n_startup_trials(2);
        let kind = ParameterKind::Int { min: 1, max: 8 };
        let history: Vec<_> = (0..10)
            .map(|i| {
                let mut params = HashMap::new();
                params.insert("layers".to_string(), ParameterValue::Int(1 + (i % 8) as i64));
                Observation {
                    number: i,
                    params,
                    loss: i as f64,
                }
            })
            .collect();
        for _ in 0..50 {
            match sampler.sample_independent("layers", &kind, &history) {
                ParameterValue::Int(v) => assert!((1..=8).contains(&v)),
                other => panic!("unexpected value: {other:?}"),
            }
        }
    }

    #[test]
    fn categorical_prefers_choices_seen_in_good_group() {
        let mut sampler = TpeSampler::with_seed(15).n_startup_trials(2);
        let kind = ParameterKind::Categorical {
            values: vec!["sgd".into(), "adam".into()],
        };
        // "adam" dominates the low-loss group.
        let mut history = Vec::new();
        for i in 0..10 {
            history.push(obs_choice(i, "opt", "adam", 0.1));
        }
        for i in 10..20 {
            history.push(obs_choice(i, "opt", "sgd", 5.0));
        }

        let adam_draws = (0..200)
            .filter(|_| {
                matches!(
                    sampler.sample_independent("opt", &kind, &history),
                    ParameterValue::Str(ref s) if s == "adam"
                )
            })
            .count();
        assert!(
            adam_draws > 100,
            "adam should be favored, drawn {adam_draws}/200"
        );
    }
}
