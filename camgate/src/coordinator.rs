//! Permission acquisition state machine
//!
//! The coordinator decides what to do next from the current OS grant state,
//! the OS denial history and its own position in the acquisition flow. It
//! performs no side effects: every decision is returned as an [`Action`]
//! which the lifecycle adapter carries out against the host.
//!
//! # States
//!
//! ```text
//!            start / resume
//!   Idle ───────────────────────► AwaitingOsResponse
//!    │  all granted                    │
//!    ▼                                 │ result callback
//!   Resolved(AllGranted) ◄─────────────┤ all granted
//!    ▲                                 │ denied, rationale allowed
//!    │                                 ├──────────────► ExplainingRationale ──ack──► Idle
//!    │ all granted                     │ denied, "don't ask again"
//!    └──────── AwaitingSettingsReturn ◄┘
//!                      │ still missing
//!                      ▼
//!              Resolved(PartiallyDenied)
//! ```
//!
//! Any (state, trigger) pair without a transition is an explicit no-op.

use camgate_api::{Capability, CapabilityRequest, GrantStatus, Outcome, RequestToken};
use tracing::{debug, warn};

use crate::oracle::PermissionOracle;

/// Position of the coordinator in the acquisition flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Nothing in flight
    Idle,
    /// An OS permission dialog is outstanding
    AwaitingOsResponse { request: CapabilityRequest },
    /// A rationale is on screen, waiting for the user
    ExplainingRationale { denied: Vec<Capability> },
    /// The app settings page was offered, waiting for control to return
    AwaitingSettingsReturn {
        token: RequestToken,
        missing: Vec<Capability>,
    },
    /// Acquisition finished
    Resolved(Outcome),
}

impl CoordinatorState {
    /// Whether the coordinator is parked on an asynchronous host operation
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            Self::AwaitingOsResponse { .. }
                | Self::ExplainingRationale { .. }
                | Self::AwaitingSettingsReturn { .. }
        )
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Self::Resolved(outcome) => Some(*outcome),
            _ => None,
        }
    }
}

/// External event fed into the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Application start (fires once per process)
    Start,
    /// The app regained the foreground
    Resume,
    /// The OS answered a permission request
    ///
    /// `capabilities` and `results` are parallel arrays as delivered by the OS.
    PermissionResult {
        token: RequestToken,
        capabilities: Vec<Capability>,
        results: Vec<GrantStatus>,
    },
    /// Control came back from the settings page
    SettingsReturn { token: RequestToken },
    /// The user dismissed the rationale
    RationaleAcknowledged,
    /// The user explicitly asked for the feature again
    UserRetry,
}

impl Trigger {
    fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Resume => "resume",
            Self::PermissionResult { .. } => "permission_result",
            Self::SettingsReturn { .. } => "settings_return",
            Self::RationaleAcknowledged => "rationale_acknowledged",
            Self::UserRetry => "user_retry",
        }
    }
}

/// Side effect the host must perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Issue an OS permission request
    Request(CapabilityRequest),
    /// Explain why the denied capabilities are needed; a request may follow
    ExplainRationale { denied: Vec<Capability> },
    /// Offer the application settings page
    OpenSettings {
        token: RequestToken,
        missing: Vec<Capability>,
    },
    /// Acquisition finished; announce the outcome
    Proceed(Outcome),
    NoOp,
}

/// Outcome of folding an OS result callback against the outstanding request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEvaluation {
    pub outcome: Outcome,
    /// Requested capabilities that did not come back granted, in request order
    pub denied: Vec<Capability>,
}

/// Fold an OS result callback into an outcome
///
/// Fails closed: mismatched array lengths deny everything, and a requested
/// capability missing from the callback counts as denied.
pub fn evaluate_result(
    request: &CapabilityRequest,
    capabilities: &[Capability],
    results: &[GrantStatus],
) -> ResultEvaluation {
    if capabilities.len() != results.len() {
        warn!(
            capabilities = capabilities.len(),
            results = results.len(),
            "Permission result arrays differ in length, treating as denied"
        );
        return ResultEvaluation {
            outcome: Outcome::PartiallyDenied,
            denied: request.capabilities().to_vec(),
        };
    }

    let denied: Vec<Capability> = request
        .capabilities()
        .iter()
        .copied()
        .filter(|cap| {
            let granted = capabilities
                .iter()
                .zip(results)
                .any(|(c, r)| c == cap && r.is_granted());
            !granted
        })
        .collect();

    let outcome = if denied.is_empty() {
        Outcome::AllGranted
    } else {
        Outcome::PartiallyDenied
    };
    ResultEvaluation { outcome, denied }
}

/// The permission acquisition state machine
#[derive(Debug, Clone)]
pub struct Coordinator {
    state: CoordinatorState,
    required: Vec<Capability>,
    request_token: RequestToken,
    settings_token: RequestToken,
}

impl Coordinator {
    /// Create an idle coordinator for the given required capability set
    pub fn new(
        required: Vec<Capability>,
        request_token: RequestToken,
        settings_token: RequestToken,
    ) -> Self {
        Self {
            state: CoordinatorState::Idle,
            required,
            request_token,
            settings_token,
        }
    }

    pub fn state(&self) -> &CoordinatorState {
        &self.state
    }

    pub fn required(&self) -> &[Capability] {
        &self.required
    }

    pub fn request_token(&self) -> RequestToken {
        self.request_token
    }

    pub fn settings_token(&self) -> RequestToken {
        self.settings_token
    }

    /// Feed a trigger and get the single action it calls for
    pub fn handle(&mut self, trigger: Trigger, oracle: &dyn PermissionOracle) -> Action {
        let name = trigger.name();
        let before = self.state.clone();
        let action = self.step(trigger, oracle);

        if before != self.state {
            debug!(trigger = name, from = ?before, to = ?self.state, "Permission state transition");
        } else {
            debug!(trigger = name, state = ?self.state, action = ?action, "Permission state unchanged");
        }
        action
    }

    fn step(&mut self, trigger: Trigger, oracle: &dyn PermissionOracle) -> Action {
        match trigger {
            Trigger::Start => {
                self.state = CoordinatorState::Idle;
                self.evaluate(oracle)
            }
            Trigger::Resume => self.on_resume(oracle),
            Trigger::UserRetry => match self.state {
                CoordinatorState::Idle | CoordinatorState::Resolved(Outcome::PartiallyDenied) => {
                    self.evaluate(oracle)
                }
                _ => Action::NoOp,
            },
            Trigger::PermissionResult {
                token,
                capabilities,
                results,
            } => {
                let CoordinatorState::AwaitingOsResponse { request } = &self.state else {
                    return Action::NoOp;
                };
                if token != request.token() {
                    warn!(%token, expected = %request.token(), "Ignoring permission result with stale token");
                    return Action::NoOp;
                }
                let evaluation = evaluate_result(request, &capabilities, &results);
                self.after_result(evaluation, oracle)
            }
            Trigger::SettingsReturn { token } => {
                let CoordinatorState::AwaitingSettingsReturn { token: expected, .. } = self.state
                else {
                    return Action::NoOp;
                };
                if token != expected {
                    warn!(%token, %expected, "Ignoring settings return with stale token");
                    return Action::NoOp;
                }
                self.settle(oracle)
            }
            Trigger::RationaleAcknowledged => {
                if let CoordinatorState::ExplainingRationale { .. } = self.state {
                    self.state = CoordinatorState::Idle;
                }
                Action::NoOp
            }
        }
    }

    fn on_resume(&mut self, oracle: &dyn PermissionOracle) -> Action {
        let all_granted = oracle.missing(&self.required).is_empty();
        match self.state {
            CoordinatorState::Idle => self.evaluate(oracle),
            // The dialog may still be on screen; never stack a second one.
            CoordinatorState::AwaitingOsResponse { .. }
            | CoordinatorState::ExplainingRationale { .. }
            | CoordinatorState::Resolved(Outcome::PartiallyDenied) => {
                if all_granted {
                    self.resolve(Outcome::AllGranted)
                } else {
                    Action::NoOp
                }
            }
            CoordinatorState::AwaitingSettingsReturn { .. } => self.settle(oracle),
            CoordinatorState::Resolved(Outcome::AllGranted) => {
                if all_granted {
                    Action::NoOp
                } else {
                    self.evaluate(oracle)
                }
            }
        }
    }

    /// Decide from scratch, as if idle
    fn evaluate(&mut self, oracle: &dyn PermissionOracle) -> Action {
        let missing = oracle.missing(&self.required);
        if missing.is_empty() {
            if self.state == CoordinatorState::Resolved(Outcome::AllGranted) {
                return Action::NoOp;
            }
            return self.resolve(Outcome::AllGranted);
        }

        let request = CapabilityRequest::new(self.request_token, missing);
        self.state = CoordinatorState::AwaitingOsResponse {
            request: request.clone(),
        };
        Action::Request(request)
    }

    fn after_result(
        &mut self,
        evaluation: ResultEvaluation,
        oracle: &dyn PermissionOracle,
    ) -> Action {
        if evaluation.outcome == Outcome::AllGranted {
            return self.resolve(Outcome::AllGranted);
        }

        let denied = evaluation.denied;
        // A fail-closed result can list capabilities the OS holds as granted;
        // their rationale flag is false too, which must not read as suppressed.
        let missing: Vec<Capability> = denied
            .iter()
            .copied()
            .filter(|c| !oracle.status(*c).is_granted())
            .collect();
        let history = oracle.denial_history(&missing);
        if history.any_suppressed(&missing) {
            self.state = CoordinatorState::AwaitingSettingsReturn {
                token: self.settings_token,
                missing: missing.clone(),
            };
            Action::OpenSettings {
                token: self.settings_token,
                missing,
            }
        } else {
            self.state = CoordinatorState::ExplainingRationale {
                denied: denied.clone(),
            };
            Action::ExplainRationale { denied }
        }
    }

    /// Final re-check after the settings page; no further escalation
    fn settle(&mut self, oracle: &dyn PermissionOracle) -> Action {
        if oracle.missing(&self.required).is_empty() {
            self.resolve(Outcome::AllGranted)
        } else {
            self.resolve(Outcome::PartiallyDenied)
        }
    }

    fn resolve(&mut self, outcome: Outcome) -> Action {
        self.state = CoordinatorState::Resolved(outcome);
        Action::Proceed(outcome)
    }
}
