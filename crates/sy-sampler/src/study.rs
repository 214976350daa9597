//! The optimization study: ask/suggest/tell over a search space.

use std::collections::HashMap;

use tracing::debug;

use sy_types::{internal_error, Goal, ParameterValue, SearchSpace, SyResult};

use crate::sampler::{Observation, Sampler};

/// Opaque handle for a candidate opened by [`Study::ask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// The study-assigned sequence number, unique for the study's lifetime.
    pub number: u64,
}

/// A candidate that has been asked but not yet told.
struct PendingCandidate {
    /// Joint draw cached from the sampler, served by `suggest_*`.
    relative: HashMap<String, ParameterValue>,
    /// Values actually handed out for this candidate so far.
    drawn: HashMap<String, ParameterValue>,
}

/// A single-objective optimization study bound to one sampler.
///
/// `ask` opens a fresh candidate and gives the sampler a chance to draw the
/// whole point jointly; the typed `suggest_*` methods then hand out one
/// value per parameter (from the joint draw when available, otherwise from
/// the sampler's per-parameter path). `tell` closes a candidate with its
/// observed objective, normalized so the samplers always minimize.
pub struct Study {
    space: SearchSpace,
    sampler: Box<dyn Sampler>,
    next_number: u64,
    pending: HashMap<u64, PendingCandidate>,
    observations: Vec<Observation>,
}

impl Study {
    pub fn new(space: SearchSpace, sampler: Box<dyn Sampler>) -> Self {
        Self {
            space,
            sampler,
            next_number: 0,
            pending: HashMap::new(),
            observations: Vec::new(),
        }
    }

    pub fn goal(&self) -> Goal {
        self.space.goal
    }

    /// Number of candidates told so far.
    pub fn n_observations(&self) -> usize {
        self.observations.len()
    }

    /// Opens a new candidate with a fresh sequence number.
    pub fn ask(&mut self) -> Candidate {
        let number = self.next_number;
        self.next_number += 1;

        let relative = self
            .sampler
            .sample_relative(&self.space, &self.observations)
            .unwrap_or_default();
        self.pending.insert(
            number,
            PendingCandidate {
                relative,
                drawn: HashMap::new(),
            },
        );
        debug!(number, "opened candidate");
        Candidate { number }
    }

    pub fn suggest_int(
        &mut self,
        candidate: Candidate,
        name: &str,
        min: i64,
        max: i64,
    ) -> SyResult<i64> {
        let kind = sy_types::ParameterKind::Int { min, max };
        match self.suggest(candidate, name, &kind)? {
            ParameterValue::Int(v) => Ok(v),
            other => Err(internal_error!(
                "sampler returned {other:?} for integer parameter {name}"
            )),
        }
    }

    pub fn suggest_double(
        &mut self,
        candidate: Candidate,
        name: &str,
        min: f64,
        max: f64,
    ) -> SyResult<f64> {
        let kind = sy_types::ParameterKind::Double { min, max };
        match self.suggest(candidate, name, &kind)? {
            ParameterValue::Double(v) => Ok(v),
            other => Err(internal_error!(
                "sampler returned {other:?} for double parameter {name}"
            )),
        }
    }

    pub fn suggest_categorical(
        &mut self,
        candidate: Candidate,
        name: &str,
        values: &[String],
    ) -> SyResult<String> {
        let kind = sy_types::ParameterKind::Categorical {
            values: values.to_vec(),
        };
        match self.suggest(candidate, name, &kind)? {
            ParameterValue::Str(v) => Ok(v),
            other => Err(internal_error!(
                "sampler returned {other:?} for categorical parameter {name}"
            )),
        }
    }

    /// Draws one parameter value for a pending candidate, preferring the
    /// cached joint draw when it matches the requested kind and bounds.
    fn suggest(
        &mut self,
        candidate: Candidate,
        name: &str,
        kind: &sy_types::ParameterKind,
    ) -> SyResult<ParameterValue> {
        let pending = self.pending.get(&candidate.number).ok_or_else(|| {
            internal_error!("suggest for unknown candidate number {}", candidate.number)
        })?;

        let value = match pending.relative.get(name) {
            Some(cached) if value_fits(cached, kind) => cached.clone(),
            _ => self
                .sampler
                .sample_independent(name, kind, &self.observations),
        };

        // Borrow again mutably; the entry is known to exist.
        if let Some(pending) = self.pending.get_mut(&candidate.number) {
            pending.drawn.insert(name.to_string(), value.clone());
        }
        Ok(value)
    }

    /// Records the observed objective for a pending candidate.
    ///
    /// Telling a number that was never asked, or telling the same number
    /// twice, is an error.
    pub fn tell(&mut self, number: u64, value: f64) -> SyResult<()> {
        let pending = self
            .pending
            .remove(&number)
            .ok_or_else(|| internal_error!("tell for unknown or already told candidate {number}"))?;

        let loss = match self.space.goal {
            Goal::Minimize => value,
            Goal::Maximize => -value,
        };
        self.observations.push(Observation {
            number,
            params: pending.drawn,
            loss,
        });
        debug!(number, value, "closed candidate");
        Ok(())
    }
}

/// Whether a cached joint-draw value is usable for the requested kind.
fn value_fits(value: &ParameterValue, kind: &sy_types::ParameterKind) -> bool {
    match (value, kind) {
        (ParameterValue::Int(v), sy_types::ParameterKind::Int { min, max }) => {
            (min..=max).contains(&v)
        }
        (ParameterValue::Double(v), sy_types::ParameterKind::Double { min, max }) => {
            (min..=max).contains(&v)
        }
        (
            ParameterValue::Str(v),
            sy_types::ParameterKind::Categorical { values }
            | sy_types::ParameterKind::Discrete { values },
        ) => values.contains(v),
        _ => false,
    }
}
