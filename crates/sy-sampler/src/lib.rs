//! # sy-sampler
//!
//! The optimization-study capability consumed by the suggestion layer.
//!
//! A [`Study`] owns a [`Sampler`] and exposes the ask/suggest/tell protocol:
//! `ask` opens a fresh candidate, the typed `suggest_*` methods draw one
//! value per parameter, and `tell` feeds the observed objective back so
//! adaptive samplers can learn. Shipping samplers: uniform random, TPE, and
//! multivariate TPE.

mod kde;
pub mod sampler;
mod study;

pub use sampler::multivariate::MultivariateTpeSampler;
pub use sampler::random::RandomSampler;
pub use sampler::tpe::TpeSampler;
pub use sampler::{Observation, Sampler};
pub use study::{Candidate, Study};
