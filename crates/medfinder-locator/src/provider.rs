//! Tokio driver for the acquisition state machine.
//!
//! Each attempt runs on its own task, bounded by `tokio::time::timeout`. The
//! task handle is aborted when the attempt is superseded or the provider is
//! dropped, which also drops the attempt's timer. Results are published on a
//! `watch` channel after every transition.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use medfinder_core::{AppConfig, Coordinate, CoreError, UnresolvedPolicy};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::machine::{AttemptId, LocationMachine, Outcome};
use crate::source::{
    HostPermission, NoPermissionQuery, PermissionQuery, PositionError, PositionOptions,
    PositionSource,
};
use crate::state::{LocationError, LocationResult, PermissionState};

/// Default bound on one acquisition attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationConfig {
    /// Upper bound for one attempt, including the permission query.
    pub timeout: Duration,
    pub on_unresolved: UnresolvedPolicy,
    pub enable_high_accuracy: bool,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            on_unresolved: UnresolvedPolicy::default(),
            enable_high_accuracy: true,
        }
    }
}

impl LocationConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.location_timeout_secs),
            on_unresolved: config.on_unresolved,
            enable_high_accuracy: true,
        }
    }

    fn position_options(&self) -> PositionOptions {
        PositionOptions {
            enable_high_accuracy: self.enable_high_accuracy,
            timeout: self.timeout,
            maximum_age: Duration::ZERO,
        }
    }
}

struct Inner<S, Q> {
    source: S,
    permissions: Q,
    config: LocationConfig,
    machine: Mutex<LocationMachine>,
    tx: watch::Sender<LocationResult>,
    /// Task of the most recently spawned attempt, tagged with its id.
    attempt_task: Mutex<Option<(AttemptId, JoinHandle<()>)>>,
}

/// Acquires and caches the caller's position.
///
/// Construction starts the first attempt immediately, so it must happen inside
/// a tokio runtime. Nothing on this type returns an error for acquisition
/// failures; they surface through [`LocationResult`].
pub struct LocationProvider<S, Q = NoPermissionQuery>
where
    S: PositionSource,
    Q: PermissionQuery,
{
    inner: Arc<Inner<S, Q>>,
    permission_watcher: Option<JoinHandle<()>>,
}

impl<S: PositionSource> LocationProvider<S, NoPermissionQuery> {
    /// Starts a provider for a host without a permission-query capability.
    pub fn start(source: S, config: LocationConfig) -> Self {
        Self::start_with_permissions(source, NoPermissionQuery, config)
    }
}

impl<S, Q> LocationProvider<S, Q>
where
    S: PositionSource,
    Q: PermissionQuery,
{
    /// Starts a provider that consults `permissions` before every request and
    /// follows its change notifications when the host offers them.
    pub fn start_with_permissions(source: S, permissions: Q, config: LocationConfig) -> Self {
        let (tx, _rx) = watch::channel(LocationResult::initial());
        let changes = permissions.watch();
        let inner = Arc::new(Inner {
            source,
            permissions,
            config,
            machine: Mutex::new(LocationMachine::new(config.on_unresolved)),
            tx,
            attempt_task: Mutex::new(None),
        });

        let permission_watcher = changes.map(|rx| spawn_permission_watcher(Arc::clone(&inner), rx));

        let attempt = inner.with_machine(LocationMachine::begin);
        spawn_attempt(&inner, attempt);

        Self {
            inner,
            permission_watcher,
        }
    }

    /// Latest state, resolved or in flight.
    #[must_use]
    pub fn current_result(&self) -> LocationResult {
        self.inner.tx.borrow().clone()
    }

    /// Change feed; the receiver sees every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LocationResult> {
        self.inner.tx.subscribe()
    }

    /// Starts a new attempt once the previous one has resolved.
    ///
    /// A no-op while an attempt is still in flight.
    pub fn retry(&self) {
        let attempt = self.inner.with_machine(|machine| {
            if machine.can_retry() {
                Some(machine.begin())
            } else {
                None
            }
        });

        match attempt {
            Some(attempt) => spawn_attempt(&self.inner, attempt),
            None => tracing::debug!("retry ignored: acquisition already in flight"),
        }
    }

    /// Replaces the position with one entered by the user.
    ///
    /// Any in-flight attempt is cancelled and its result discarded.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidCoordinate`] if `coordinate` is out of range;
    /// the state is left untouched in that case.
    pub fn set_manual(&self, coordinate: Coordinate) -> Result<(), CoreError> {
        coordinate.validate()?;
        self.inner.with_machine(|machine| machine.resolve_manual(coordinate));
        self.inner.abort_superseded_attempt();
        tracing::info!(%coordinate, "using manually entered location");
        Ok(())
    }

    /// Waits until no attempt is in flight and returns that state.
    pub async fn wait_resolved(&self) -> LocationResult {
        let mut rx = self.subscribe();
        let resolved = match rx.wait_for(|result| !result.is_loading).await {
            Ok(result) => result.clone(),
            Err(_) => self.current_result(),
        };
        resolved
    }
}

impl<S, Q> Drop for LocationProvider<S, Q>
where
    S: PositionSource,
    Q: PermissionQuery,
{
    fn drop(&mut self) {
        if let Some(watcher) = self.permission_watcher.take() {
            watcher.abort();
        }
        self.inner.abort_attempt();
    }
}

impl<S, Q> Inner<S, Q>
where
    S: PositionSource,
    Q: PermissionQuery,
{
    /// Runs `f` under the state lock and publishes the resulting snapshot.
    fn with_machine<T>(&self, f: impl FnOnce(&mut LocationMachine) -> T) -> T {
        let mut machine = self.lock_machine();
        let value = f(&mut machine);
        self.tx.send_replace(machine.result().clone());
        value
    }

    fn lock_machine(&self) -> MutexGuard<'_, LocationMachine> {
        // The guarded section never panics midway, so a poisoned lock still
        // holds a consistent machine.
        self.machine
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn lock_attempt_task(&self) -> MutexGuard<'_, Option<(AttemptId, JoinHandle<()>)>> {
        self.attempt_task
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Aborts the stored attempt task unconditionally.
    fn abort_attempt(&self) {
        if let Some((_, handle)) = self.lock_attempt_task().take() {
            handle.abort();
        }
    }

    /// Aborts the stored attempt task unless it is still the pending attempt.
    ///
    /// The machine lock is held while the task slot is inspected, so an
    /// attempt begun by a concurrent `retry` is never mistaken for the one
    /// that was just superseded.
    fn abort_superseded_attempt(&self) {
        let machine = self.lock_machine();
        let mut slot = self.lock_attempt_task();
        let stale = slot
            .as_ref()
            .is_some_and(|(attempt, _)| !machine.is_current(*attempt));
        if stale {
            if let Some((_, handle)) = slot.take() {
                handle.abort();
            }
        }
    }

    /// Stores `handle` unless a newer attempt's task is already stored, and
    /// aborts whichever of the two is older.
    fn store_attempt(&self, attempt: AttemptId, handle: JoinHandle<()>) {
        let mut slot = self.lock_attempt_task();
        let newer_stored = slot.as_ref().is_some_and(|(stored, _)| *stored > attempt);
        if newer_stored {
            handle.abort();
        } else if let Some((_, previous)) = slot.replace((attempt, handle)) {
            previous.abort();
        }
    }

    fn finish(&self, attempt: AttemptId, outcome: Outcome) {
        let summary = match &outcome {
            Outcome::Position(coordinate) => Ok(*coordinate),
            Outcome::Failed(err) => Err(err.clone()),
        };

        let applied = self.with_machine(|machine| machine.resolve(attempt, outcome));
        if !applied {
            tracing::debug!(%attempt, "ignoring completion of superseded location attempt");
            return;
        }

        match summary {
            Ok(coordinate) => tracing::info!(%attempt, %coordinate, "location acquired"),
            // Refusal is an expected user choice, not a failure worth a warning.
            Err(LocationError::PermissionDenied) => {
                tracing::info!(%attempt, "location access denied");
            }
            Err(err) => tracing::warn!(%attempt, error = %err, "location unavailable"),
        }
    }

    async fn acquire(&self) -> Outcome {
        if !self.source.is_supported() {
            return Outcome::Failed(LocationError::NotSupported);
        }

        if self.permissions.query().await == Some(HostPermission::Denied) {
            return Outcome::Failed(LocationError::PermissionDenied);
        }

        let options = self.config.position_options();
        match self.source.current_position(&options).await {
            Ok(coordinate) => match coordinate.validate() {
                Ok(()) => Outcome::Position(coordinate),
                Err(e) => Outcome::Failed(LocationError::Unknown(e.to_string())),
            },
            Err(err) => Outcome::Failed(self.map_position_error(err)),
        }
    }

    fn map_position_error(&self, err: PositionError) -> LocationError {
        match err {
            PositionError::PermissionDenied => LocationError::PermissionDenied,
            PositionError::PositionUnavailable => LocationError::PositionUnavailable,
            PositionError::Timeout => LocationError::Timeout(self.config.timeout),
            PositionError::Unknown(message) => LocationError::Unknown(message),
        }
    }
}

fn spawn_attempt<S, Q>(inner: &Arc<Inner<S, Q>>, attempt: AttemptId)
where
    S: PositionSource,
    Q: PermissionQuery,
{
    tracing::debug!(%attempt, "starting location attempt");

    let task_inner = Arc::clone(inner);
    let handle = tokio::spawn(async move {
        let timeout = task_inner.config.timeout;
        let outcome = match tokio::time::timeout(timeout, task_inner.acquire()).await {
            Ok(outcome) => outcome,
            Err(_) => Outcome::Failed(LocationError::Timeout(timeout)),
        };
        task_inner.finish(attempt, outcome);
    });

    inner.store_attempt(attempt, handle);
}

fn spawn_permission_watcher<S, Q>(
    inner: Arc<Inner<S, Q>>,
    mut changes: watch::Receiver<HostPermission>,
) -> JoinHandle<()>
where
    S: PositionSource,
    Q: PermissionQuery,
{
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let permission = *changes.borrow_and_update();
            tracing::debug!(?permission, "host permission changed");

            match permission {
                HostPermission::Denied => {
                    inner.with_machine(LocationMachine::revoke);
                    inner.abort_superseded_attempt();
                    tracing::info!("location access revoked by host");
                }
                HostPermission::Granted => {
                    let attempt = inner.with_machine(|machine| {
                        let state = machine.result().permission_state;
                        let unresolved = matches!(
                            state,
                            PermissionState::Denied | PermissionState::Unavailable
                        );
                        (unresolved && machine.can_retry()).then(|| machine.begin())
                    });
                    if let Some(attempt) = attempt {
                        spawn_attempt(&inner, attempt);
                    }
                }
                HostPermission::Prompt => {}
            }
        }
    })
}
