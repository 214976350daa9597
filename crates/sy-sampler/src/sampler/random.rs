//! Uniform random sampling across the search space.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sy_types::{ParameterKind, ParameterValue};

use super::{Observation, Sampler};

/// Draws one value uniformly from a parameter's declared range.
///
/// Shared by [`RandomSampler`] and the TPE samplers' startup phase.
pub(crate) fn uniform_draw<R: Rng>(kind: &ParameterKind, rng: &mut R) -> ParameterValue {
    match kind {
        ParameterKind::Int { min, max } => ParameterValue::Int(rng.gen_range(*min..=*max)),
        ParameterKind::Double { min, max } => ParameterValue::Double(rng.gen_range(*min..=*max)),
        ParameterKind::Categorical { values } | ParameterKind::Discrete { values } => {
            ParameterValue::Str(values[rng.gen_range(0..values.len())].clone())
        }
    }
}

/// Independent uniform sampling; ignores history entirely.
pub struct RandomSampler {
    rng: StdRng,
}

impl RandomSampler {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for RandomSampler {
    fn sample_independent(
        &mut self,
        _name: &str,
        kind: &ParameterKind,
        _history: &[Observation],
    ) -> ParameterValue {
        uniform_draw(kind, &mut self.rng)
    }
}
