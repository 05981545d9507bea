//! Acquisition state machine, independent of any runtime.
//!
//! Every attempt gets a fresh [`AttemptId`]. Outcomes are applied only for the
//! current attempt and only while it is still pending, so at most one
//! transition lands per attempt and completions from superseded attempts are
//! dropped.

use medfinder_core::{Coordinate, UnresolvedPolicy};

use crate::state::{LocationError, LocationResult, PermissionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttemptId(u64);

impl std::fmt::Display for AttemptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How an attempt ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Position(Coordinate),
    Failed(LocationError),
}

#[derive(Debug)]
pub struct LocationMachine {
    policy: UnresolvedPolicy,
    result: LocationResult,
    current: u64,
    pending: bool,
}

impl LocationMachine {
    /// Machine in the initial `Prompt` state with no attempt started yet.
    #[must_use]
    pub fn new(policy: UnresolvedPolicy) -> Self {
        Self {
            policy,
            result: LocationResult::initial(),
            current: 0,
            pending: false,
        }
    }

    #[must_use]
    pub fn result(&self) -> &LocationResult {
        &self.result
    }

    #[must_use]
    pub fn policy(&self) -> UnresolvedPolicy {
        self.policy
    }

    /// True while an attempt is outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    #[must_use]
    pub fn is_current(&self, attempt: AttemptId) -> bool {
        self.pending && attempt.0 == self.current
    }

    /// A retry is accepted only once the previous attempt has resolved.
    #[must_use]
    pub fn can_retry(&self) -> bool {
        !self.pending
    }

    /// Starts a new attempt, superseding any outstanding one.
    ///
    /// Moves to `Prompt` with `is_loading` set and the previous error cleared.
    /// A fallback coordinate stays visible while loading; a real one does not,
    /// since it is no longer backed by a granted state.
    pub fn begin(&mut self) -> AttemptId {
        self.current += 1;
        self.pending = true;

        if !self.result.is_default_location {
            self.result.coordinate = None;
        }
        self.result.is_loading = true;
        self.result.error = None;
        self.result.permission_state = PermissionState::Prompt;

        AttemptId(self.current)
    }

    /// Applies `outcome` if `attempt` is the current, still-pending attempt.
    ///
    /// Returns `false` when the outcome was ignored.
    pub fn resolve(&mut self, attempt: AttemptId, outcome: Outcome) -> bool {
        if !self.is_current(attempt) {
            return false;
        }
        self.pending = false;
        self.apply(outcome);
        true
    }

    /// Manual entry: supersedes any outstanding attempt and grants `coordinate`.
    pub fn resolve_manual(&mut self, coordinate: Coordinate) {
        self.supersede();
        self.apply(Outcome::Position(coordinate));
    }

    /// Out-of-band refusal reported by the host's permission watcher.
    pub fn revoke(&mut self) {
        self.supersede();
        self.apply(Outcome::Failed(LocationError::PermissionDenied));
    }

    fn supersede(&mut self) {
        self.current += 1;
        self.pending = false;
    }

    fn apply(&mut self, outcome: Outcome) {
        self.result.is_loading = false;
        match outcome {
            Outcome::Position(coordinate) => {
                self.result.coordinate = Some(coordinate);
                self.result.error = None;
                self.result.permission_state = PermissionState::Granted;
                self.result.is_default_location = false;
            }
            Outcome::Failed(err) => {
                self.result.permission_state = err.permission_state();
                self.result.error = Some(err.to_string());
                match self.policy {
                    UnresolvedPolicy::UseFallbackCoordinate(fallback) => {
                        self.result.coordinate = Some(fallback);
                        self.result.is_default_location = true;
                    }
                    UnresolvedPolicy::ReportAbsent => {
                        self.result.coordinate = None;
                        self.result.is_default_location = false;
                    }
                }
            }
        }
    }
}
