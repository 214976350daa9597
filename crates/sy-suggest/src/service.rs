//! The top-level suggestion service: lazy initialization plus the
//! tell-then-ask cycle, one instance per experiment run.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sy_sampler::{MultivariateTpeSampler, Sampler, Study, TpeSampler};
use sy_types::{
    internal_error, Assignment, ParameterKind, ParameterValue, SearchSpace, SyError, SyResult,
    Trial,
};

use crate::convert::{convert_search_space, ExperimentSpec};
use crate::correlate::{assignments_key, TrialCorrelator};

/// One suggestion round: the experiment declaration (honored only on the
/// first request a service instance sees), the trial history accumulated so
/// far, and how many new candidates to propose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionRequest {
    pub experiment: ExperimentSpec,
    #[serde(default)]
    pub trials: Vec<Trial>,
    pub request_number: usize,
}

/// The proposed points, exactly `request_number` of them, in generation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionReply {
    pub assignments: Vec<Vec<Assignment>>,
}

/// Builds the study for the requested algorithm identifier.
fn create_study(algorithm: &str, space: SearchSpace) -> SyResult<Study> {
    let sampler: Box<dyn Sampler> = match algorithm {
        "tpe" => Box::new(TpeSampler::new()),
        "multivariate-tpe" => Box::new(MultivariateTpeSampler::new()),
        other => return Err(SyError::UnsupportedAlgorithm(other.to_string())),
    };
    Ok(Study::new(space, sampler))
}

/// Everything a ready service owns: the converted space, the study bound to
/// the chosen sampler, and the name/number correlation state.
struct ReadyState {
    space: SearchSpace,
    study: Study,
    correlator: TrialCorrelator,
}

impl ReadyState {
    /// Reports every not-yet-recorded evaluated trial to the study.
    ///
    /// Trials whose name is already recorded are skipped (idempotence);
    /// trials without a metric are in flight and left for a later round. A
    /// trial whose point was never proposed by this service is a
    /// correlation error and aborts the request; earlier trials in the
    /// batch stay recorded.
    fn tell(&mut self, trials: &[Trial]) -> SyResult<()> {
        for trial in trials {
            if self.correlator.is_recorded(&trial.name) {
                debug!(trial = %trial.name, "already recorded, skipping");
                continue;
            }
            let Some(metric) = trial.metric else {
                debug!(trial = %trial.name, "no observed metric yet, skipping");
                continue;
            };

            let key = assignments_key(&trial.assignments);
            let number = self.correlator.consume(&key).ok_or_else(|| {
                SyError::Correlation(format!(
                    "trial {} reports a point this service never proposed (key: {key})",
                    trial.name
                ))
            })?;
            self.study.tell(number, metric)?;
            self.correlator.mark_recorded(trial.name.clone());
        }
        Ok(())
    }

    /// Proposes `count` new points, each covering every parameter of the
    /// space, and queues their correlation entries.
    fn ask(&mut self, count: usize) -> SyResult<Vec<Vec<Assignment>>> {
        let mut proposals = Vec::with_capacity(count);
        for _ in 0..count {
            let candidate = self.study.ask();
            let mut assignments = Vec::with_capacity(self.space.parameters.len());

            for param in &self.space.parameters {
                let value = match &param.kind {
                    ParameterKind::Int { min, max } => ParameterValue::Int(
                        self.study.suggest_int(candidate, &param.name, *min, *max)?,
                    ),
                    ParameterKind::Double { min, max } => ParameterValue::Double(
                        self.study
                            .suggest_double(candidate, &param.name, *min, *max)?,
                    ),
                    ParameterKind::Categorical { values } | ParameterKind::Discrete { values } => {
                        ParameterValue::Str(self.study.suggest_categorical(
                            candidate,
                            &param.name,
                            values,
                        )?)
                    }
                };
                assignments.push(Assignment::new(&param.name, value));
            }

            self.correlator
                .record_candidate(assignments_key(&assignments), candidate.number);
            proposals.push(assignments);
        }
        Ok(proposals)
    }
}

/// Service lifecycle: the one-time transition to `Ready` happens on the
/// first request, inside the same critical section as normal operation.
enum ServiceState {
    Uninitialized,
    Ready(ReadyState),
}

/// Stateful suggestion engine for one experiment run.
///
/// Requests are served under a single exclusive lock spanning the entire
/// tell-then-ask sequence, so concurrent callers cannot interleave their
/// phases and corrupt the correlation state.
pub struct SuggestionService {
    state: Mutex<ServiceState>,
}

impl SuggestionService {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ServiceState::Uninitialized),
        }
    }

    /// Serves one optimization round: reconcile history, then propose
    /// `request_number` new points.
    ///
    /// On failure the request is a no-op for the caller (no partial
    /// proposal list), though history recorded before the failure stays
    /// recorded; idempotent tell makes a retry with corrected input safe.
    pub fn get_suggestions(&self, request: &SuggestionRequest) -> SyResult<SuggestionReply> {
        let mut state = self.state.lock();

        if let ServiceState::Uninitialized = *state {
            let space = convert_search_space(&request.experiment)?;
            let study = create_study(&request.experiment.algorithm.name, space.clone())?;
            info!(
                algorithm = %request.experiment.algorithm.name,
                parameters = space.parameters.len(),
                goal = ?space.goal,
                "suggestion service initialized"
            );
            *state = ServiceState::Ready(ReadyState {
                space,
                study,
                correlator: TrialCorrelator::new(),
            });
        }

        let ready = match &mut *state {
            ServiceState::Ready(ready) => ready,
            ServiceState::Uninitialized => {
                return Err(internal_error!("service failed to initialize"))
            }
        };

        if !request.trials.is_empty() {
            debug!(trials = request.trials.len(), "reconciling history");
            ready.tell(&request.trials)?;
        }
        let assignments = ready.ask(request.request_number)?;
        debug!(proposed = assignments.len(), "request served");

        Ok(SuggestionReply { assignments })
    }
}

impl Default for SuggestionService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use sy_types::Goal;

    use super::*;
    use crate::convert::{AlgorithmSpec, FeasibleSpace, ObjectiveSpec, ParameterDecl};

    fn experiment(algorithm: &str) -> ExperimentSpec {
        ExperimentSpec {
            algorithm: AlgorithmSpec {
                name: algorithm.into(),
            },
            objective: ObjectiveSpec {
                goal: Goal::Minimize,
                metric_name: "loss".into(),
            },
            parameters: vec![
                ParameterDecl {
                    name: "lr".into(),
                    parameter_type: "double".into(),
                    feasible_space: FeasibleSpace {
                        min: "0.0".into(),
                        max: "1.0".into(),
                        list: vec![],
                    },
                },
                ParameterDecl {
                    name: "batch".into(),
                    parameter_type: "categorical".into(),
                    feasible_space: FeasibleSpace {
                        list: vec!["16".into(), "32".into()],
                        ..Default::default()
                    },
                },
            ],
        }
    }

    fn request(algorithm: &str, trials: Vec<Trial>, request_number: usize) -> SuggestionRequest {
        SuggestionRequest {
            experiment: experiment(algorithm),
            trials,
            request_number,
        }
    }

    fn assert_point_is_valid(assignments: &[Assignment]) {
        assert_eq!(assignments.len(), 2);
        match &assignments[0].value {
            ParameterValue::Double(v) => assert!((0.0..=1.0).contains(v)),
            other => panic!("unexpected lr value: {other:?}"),
        }
        assert_eq!(assignments[0].name, "lr");
        match &assignments[1].value {
            ParameterValue::Str(s) => assert!(s == "16" || s == "32"),
            other => panic!("unexpected batch value: {other:?}"),
        }
        assert_eq!(assignments[1].name, "batch");
    }

    fn n_observations(service: &SuggestionService) -> usize {
        match &*service.state.lock() {
            ServiceState::Ready(ready) => ready.study.n_observations(),
            ServiceState::Uninitialized => 0,
        }
    }

    fn n_pending(service: &SuggestionService) -> usize {
        match &*service.state.lock() {
            ServiceState::Ready(ready) => ready.correlator.n_pending(),
            ServiceState::Uninitialized => 0,
        }
    }

    #[test]
    fn ask_returns_exactly_n_valid_points() {
        let service = SuggestionService::new();
        for n in [0usize, 1, 5] {
            let reply = service.get_suggestions(&request("tpe", vec![], n)).unwrap();
            assert_eq!(reply.assignments.len(), n);
            for point in &reply.assignments {
                assert_point_is_valid(point);
            }
        }
    }

    #[test]
    fn unsupported_algorithm_fails_before_any_work() {
        let service = SuggestionService::new();
        let err = service
            .get_suggestions(&request("random-grid", vec![], 1))
            .unwrap_err();
        assert!(matches!(err, SyError::UnsupportedAlgorithm(_)));
        // No partially-built state left behind.
        assert!(matches!(
            &*service.state.lock(),
            ServiceState::Uninitialized
        ));
    }

    #[test]
    fn malformed_declaration_fails_before_any_work() {
        let service = SuggestionService::new();
        let mut req = request("tpe", vec![], 1);
        req.experiment.parameters[0].feasible_space.min = "tiny".into();
        assert!(matches!(
            service.get_suggestions(&req).unwrap_err(),
            SyError::Config(_)
        ));
    }

    #[test]
    fn later_declarations_are_ignored() {
        let service = SuggestionService::new();
        service.get_suggestions(&request("tpe", vec![], 1)).unwrap();
        // A different (even bogus) algorithm on the second call must not
        // reconfigure or fail the already-initialized service.
        let reply = service
            .get_suggestions(&request("random-grid", vec![], 1))
            .unwrap();
        assert_eq!(reply.assignments.len(), 1);
    }

    #[test]
    fn minimize_tpe_scenario_two_rounds() {
        let service = SuggestionService::new();

        let first = service.get_suggestions(&request("tpe", vec![], 2)).unwrap();
        assert_eq!(first.assignments.len(), 2);
        for point in &first.assignments {
            assert_point_is_valid(point);
        }
        assert_eq!(n_pending(&service), 2);

        let trials = vec![
            Trial::new("trial-1", first.assignments[0].clone()).with_metric(0.5),
            Trial::new("trial-2", first.assignments[1].clone()).with_metric(0.3),
        ];
        let second = service.get_suggestions(&request("tpe", trials, 1)).unwrap();
        assert_eq!(second.assignments.len(), 1);
        assert_point_is_valid(&second.assignments[0]);

        // Both prior points consumed; only the new proposal is pending.
        assert_eq!(n_observations(&service), 2);
        assert_eq!(n_pending(&service), 1);
    }

    #[test]
    fn tell_is_idempotent_per_trial_name() {
        let service = SuggestionService::new();
        let first = service.get_suggestions(&request("tpe", vec![], 1)).unwrap();
        let trial = Trial::new("trial-1", first.assignments[0].clone()).with_metric(0.7);

        service
            .get_suggestions(&request("tpe", vec![trial.clone()], 0))
            .unwrap();
        assert_eq!(n_observations(&service), 1);

        // Resending the same trial (twice, even) must not raise or
        // double-record.
        service
            .get_suggestions(&request("tpe", vec![trial.clone(), trial], 0))
            .unwrap();
        assert_eq!(n_observations(&service), 1);
    }

    #[test]
    fn unknown_point_is_a_correlation_error_without_study_mutation() {
        let service = SuggestionService::new();
        service.get_suggestions(&request("tpe", vec![], 1)).unwrap();

        let rogue = Trial::new(
            "rogue",
            vec![
                Assignment::new("lr", ParameterValue::Double(0.123)),
                Assignment::new("batch", ParameterValue::Str("64".into())),
            ],
        )
        .with_metric(0.1);
        let err = service
            .get_suggestions(&request("tpe", vec![rogue], 1))
            .unwrap_err();
        assert!(matches!(err, SyError::Correlation(_)));
        assert_eq!(n_observations(&service), 0);
    }

    #[test]
    fn trials_recorded_before_a_failure_stay_recorded() {
        let service = SuggestionService::new();
        let first = service.get_suggestions(&request("tpe", vec![], 1)).unwrap();

        let good = Trial::new("good", first.assignments[0].clone()).with_metric(0.2);
        let rogue = Trial::new(
            "rogue",
            vec![
                Assignment::new("lr", ParameterValue::Double(0.999)),
                Assignment::new("batch", ParameterValue::Str("64".into())),
            ],
        )
        .with_metric(0.1);

        let err = service
            .get_suggestions(&request("tpe", vec![good.clone(), rogue], 1))
            .unwrap_err();
        assert!(matches!(err, SyError::Correlation(_)));
        // "good" was told before the batch failed and is not rolled back;
        // resending it is safely skipped.
        assert_eq!(n_observations(&service), 1);
        service
            .get_suggestions(&request("tpe", vec![good], 0))
            .unwrap();
        assert_eq!(n_observations(&service), 1);
    }

    #[test]
    fn in_flight_trials_without_metric_are_left_pending() {
        let service = SuggestionService::new();
        let first = service.get_suggestions(&request("tpe", vec![], 1)).unwrap();

        let in_flight = Trial::new("trial-1", first.assignments[0].clone());
        service
            .get_suggestions(&request("tpe", vec![in_flight.clone()], 0))
            .unwrap();
        assert_eq!(n_observations(&service), 0);
        assert_eq!(n_pending(&service), 1);

        // Once evaluated, the same name is recorded normally.
        service
            .get_suggestions(&request("tpe", vec![in_flight.with_metric(0.4)], 0))
            .unwrap();
        assert_eq!(n_observations(&service), 1);
        assert_eq!(n_pending(&service), 0);
    }

    #[test]
    fn identical_points_correlate_oldest_first() {
        // A single-choice space forces every proposal onto the same key.
        let experiment = ExperimentSpec {
            algorithm: AlgorithmSpec { name: "tpe".into() },
            objective: ObjectiveSpec {
                goal: Goal::Maximize,
                metric_name: "acc".into(),
            },
            parameters: vec![ParameterDecl {
                name: "batch".into(),
                parameter_type: "categorical".into(),
                feasible_space: FeasibleSpace {
                    list: vec!["32".into()],
                    ..Default::default()
                },
            }],
        };
        let service = SuggestionService::new();
        let reply = service
            .get_suggestions(&SuggestionRequest {
                experiment: experiment.clone(),
                trials: vec![],
                request_number: 2,
            })
            .unwrap();
        assert_eq!(reply.assignments[0], reply.assignments[1]);
        assert_eq!(n_pending(&service), 2);

        let trials = vec![
            Trial::new("a", reply.assignments[0].clone()).with_metric(1.0),
            Trial::new("b", reply.assignments[1].clone()).with_metric(2.0),
        ];
        service
            .get_suggestions(&SuggestionRequest {
                experiment,
                trials,
                request_number: 0,
            })
            .unwrap();
        assert_eq!(n_observations(&service), 2);
        assert_eq!(n_pending(&service), 0);
    }

    #[test]
    fn multivariate_tpe_full_control_loop() {
        let service = SuggestionService::new();
        let mut history: Vec<Trial> = Vec::new();

        for round in 0..15 {
            let reply = service
                .get_suggestions(&request("multivariate-tpe", history.clone(), 1))
                .unwrap();
            assert_eq!(reply.assignments.len(), 1);
            assert_point_is_valid(&reply.assignments[0]);

            let lr = match &reply.assignments[0][0].value {
                ParameterValue::Double(v) => *v,
                _ => unreachable!(),
            };
            history.push(
                Trial::new(format!("trial-{round}"), reply.assignments[0].clone())
                    .with_metric((lr - 0.25).abs()),
            );
        }
        assert_eq!(n_observations(&service), 14);
    }
}
