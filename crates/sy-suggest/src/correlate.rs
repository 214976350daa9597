//! Identity correlation between caller-named trials and study candidates.
//!
//! The controller names trials; the study numbers candidates. The two are
//! reconciled purely by assignment content: a deterministic key derived
//! from the (name, value) pairs of a point.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, warn};

use sy_types::Assignment;

/// Deterministic, order-independent key for a set of assignments.
///
/// Assignments are sorted by parameter name (case-sensitive), rendered as
/// `name=value`, and joined with `,`. Ask and Tell build their assignment
/// collections independently, so identity must come from content alone; the
/// exact format is load-bearing for anything that stores these keys.
pub fn assignments_key(assignments: &[Assignment]) -> String {
    let mut sorted: Vec<&Assignment> = assignments.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    sorted
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Bidirectional ledger between proposed points and told results.
///
/// Each proposed candidate queues its sequence number under its content key;
/// a told result consumes the oldest queued number for its key. Keeping a
/// queue (rather than a single slot) means a numerically identical point
/// re-proposed before the first is told does not orphan the first entry.
/// Recorded trial names are append-only for the correlator's lifetime and
/// make result ingestion idempotent.
#[derive(Debug, Default)]
pub struct TrialCorrelator {
    key_to_numbers: HashMap<String, VecDeque<u64>>,
    recorded_names: HashSet<String>,
}

impl TrialCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a freshly proposed candidate under its content key.
    pub fn record_candidate(&mut self, key: String, number: u64) {
        let queue = self.key_to_numbers.entry(key).or_default();
        if !queue.is_empty() {
            warn!(
                number,
                pending = queue.len(),
                "identical point proposed again before the earlier one was told"
            );
        }
        queue.push_back(number);
    }

    /// Consumes the oldest candidate number recorded for `key`, if any.
    pub fn consume(&mut self, key: &str) -> Option<u64> {
        let queue = self.key_to_numbers.get_mut(key)?;
        let number = queue.pop_front();
        if queue.is_empty() {
            self.key_to_numbers.remove(key);
        }
        number
    }

    /// Whether a trial name has already been told to the study.
    pub fn is_recorded(&self, name: &str) -> bool {
        self.recorded_names.contains(name)
    }

    /// Marks a trial name as told; later resends of the name are skipped.
    pub fn mark_recorded(&mut self, name: String) {
        debug!(trial = %name, "trial recorded");
        self.recorded_names.insert(name);
    }

    /// Number of proposed-but-untold candidates.
    pub fn n_pending(&self) -> usize {
        self.key_to_numbers.values().map(VecDeque::len).sum()
    }
}
