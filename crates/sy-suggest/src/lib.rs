//! # sy-suggest
//!
//! The suggestion orchestration layer: converts an externally-declared
//! experiment into a search space, lazily builds the optimization study for
//! the requested algorithm, and drives the tell-then-ask cycle that turns
//! accumulated trial history into new parameter assignments.
//!
//! The wire transport sits above this crate; [`SuggestionService`] is the
//! unit a transport handler delegates to, one instance per experiment run.

mod convert;
mod correlate;
mod service;

pub use convert::{
    convert_search_space, AlgorithmSpec, ExperimentSpec, FeasibleSpace, ObjectiveSpec,
    ParameterDecl,
};
pub use correlate::{assignments_key, TrialCorrelator};
pub use service::{SuggestionReply, SuggestionRequest, SuggestionService};
