//! Integration tests for `LocationProvider`.
//!
//! The host is simulated with a scripted position source whose requests stay
//! pending until the test answers them, and tokio's paused clock drives the
//! attempt timeout deterministically.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use medfinder_core::{Coordinate, UnresolvedPolicy};
use medfinder_locator::{
    HostPermission, LocationConfig, LocationProvider, PermissionQuery, PermissionState,
    PositionError, PositionOptions, PositionSource, Remediation, UnsupportedHost,
};
use tokio::sync::{oneshot, watch};

type Reply = Result<Coordinate, PositionError>;

/// Position source that records every request and lets the test answer it.
#[derive(Clone, Default)]
struct ScriptedSource {
    requests: Arc<Mutex<Vec<Option<oneshot::Sender<Reply>>>>>,
}

impl ScriptedSource {
    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Answers request `index`; `false` if nobody is listening any more.
    fn respond(&self, index: usize, reply: Reply) -> bool {
        let sender = self.requests.lock().unwrap()[index].take();
        sender.is_some_and(|tx| tx.send(reply).is_ok())
    }

    fn is_abandoned(&self, index: usize) -> bool {
        self.requests.lock().unwrap()[index]
            .as_ref()
            .map_or(true, oneshot::Sender::is_closed)
    }
}

impl PositionSource for ScriptedSource {
    fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> impl Future<Output = Reply> + Send {
        let (tx, rx) = oneshot::channel();
        self.requests.lock().unwrap().push(Some(tx));
        async move {
            rx.await
                .unwrap_or_else(|_| Err(PositionError::Unknown("request dropped".to_string())))
        }
    }
}

/// Permission capability backed by a watch channel the test can drive.
#[derive(Clone)]
struct HostPermissions {
    tx: Arc<watch::Sender<HostPermission>>,
    queryable: bool,
}

impl HostPermissions {
    fn new(initial: HostPermission) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx: Arc::new(tx),
            queryable: true,
        }
    }

    fn set(&self, permission: HostPermission) {
        self.tx.send_replace(permission);
    }
}

impl PermissionQuery for HostPermissions {
    async fn query(&self) -> Option<HostPermission> {
        self.queryable.then(|| *self.tx.borrow())
    }

    fn watch(&self) -> Option<watch::Receiver<HostPermission>> {
        Some(self.tx.subscribe())
    }
}

fn config(on_unresolved: UnresolvedPolicy) -> LocationConfig {
    LocationConfig {
        timeout: Duration::from_secs(10),
        on_unresolved,
        enable_high_accuracy: true,
    }
}

fn meir() -> Coordinate {
    Coordinate::new(51.2204, 4.4051).unwrap()
}

fn groenplaats() -> Coordinate {
    Coordinate::new(51.2184, 4.3995).unwrap()
}

/// Lets spawned attempt tasks run without advancing the paused clock.
async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

// ---------------------------------------------------------------------------
// Initial state and successful acquisition
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn starts_in_prompt_and_loading() {
    let source = ScriptedSource::default();
    let provider = LocationProvider::start(source.clone(), config(UnresolvedPolicy::ReportAbsent));

    let result = provider.current_result();
    assert_eq!(result.permission_state, PermissionState::Prompt);
    assert!(result.is_loading);
    assert!(result.coordinate.is_none());

    settle().await;
    assert_eq!(source.calls(), 1, "construction should issue exactly one request");
}

#[tokio::test(start_paused = true)]
async fn success_resolves_to_granted() {
    let source = ScriptedSource::default();
    let provider = LocationProvider::start(source.clone(), config(UnresolvedPolicy::ReportAbsent));
    settle().await;

    assert!(source.respond(0, Ok(meir())));
    let result = provider.wait_resolved().await;

    assert_eq!(result.permission_state, PermissionState::Granted);
    assert_eq!(result.coordinate, Some(meir()));
    assert!(!result.is_loading);
    assert!(result.error.is_none());
    assert!(!result.is_default_location);
    assert_eq!(result.remediation(), Remediation::None);
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_the_resolution() {
    let source = ScriptedSource::default();
    let provider = LocationProvider::start(source.clone(), config(UnresolvedPolicy::ReportAbsent));
    let mut rx = provider.subscribe();
    settle().await;

    source.respond(0, Ok(meir()));
    rx.changed().await.expect("provider alive");
    assert!(rx.borrow_and_update().is_granted());
}

// ---------------------------------------------------------------------------
// Failure paths
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn denial_resolves_to_denied_without_coordinate() {
    let source = ScriptedSource::default();
    let provider = LocationProvider::start(source.clone(), config(UnresolvedPolicy::ReportAbsent));
    settle().await;

    source.respond(0, Err(PositionError::PermissionDenied));
    let result = provider.wait_resolved().await;

    assert_eq!(result.permission_state, PermissionState::Denied);
    assert!(!result.is_loading);
    assert!(result.coordinate.is_none());
    assert!(result.error.as_deref().is_some_and(|e| !e.is_empty()));
    assert_eq!(result.remediation(), Remediation::EnableAccessAndRetry);
}

#[tokio::test(start_paused = true)]
async fn denial_with_fallback_policy_reports_default_location() {
    let source = ScriptedSource::default();
    let provider = LocationProvider::start(
        source.clone(),
        config(UnresolvedPolicy::UseFallbackCoordinate(Coordinate::ANTWERP_CENTER)),
    );
    settle().await;

    source.respond(0, Err(PositionError::PermissionDenied));
    let result = provider.wait_resolved().await;

    assert_eq!(result.permission_state, PermissionState::Denied);
    assert_eq!(result.coordinate, Some(Coordinate::ANTWERP_CENTER));
    assert!(result.is_default_location);
}

#[tokio::test(start_paused = true)]
async fn position_unavailable_resolves_to_unavailable() {
    let source = ScriptedSource::default();
    let provider = LocationProvider::start(source.clone(), config(UnresolvedPolicy::ReportAbsent));
    settle().await;

    source.respond(0, Err(PositionError::PositionUnavailable));
    let result = provider.wait_resolved().await;

    assert_eq!(result.permission_state, PermissionState::Unavailable);
    assert_eq!(
        result.error.as_deref(),
        Some("your position could not be determined")
    );
    assert_eq!(result.remediation(), Remediation::RetryOrEnterManually);
}

#[tokio::test(start_paused = true)]
async fn host_timeout_maps_to_timeout_error() {
    let source = ScriptedSource::default();
    let provider = LocationProvider::start(source.clone(), config(UnresolvedPolicy::ReportAbsent));
    settle().await;

    source.respond(0, Err(PositionError::Timeout));
    let result = provider.wait_resolved().await;

    assert_eq!(result.permission_state, PermissionState::Unavailable);
    assert!(result.error.unwrap().contains("timed out"));
}

#[tokio::test(start_paused = true)]
async fn out_of_range_fix_from_host_is_unavailable() {
    let source = ScriptedSource::default();
    let provider = LocationProvider::start(source.clone(), config(UnresolvedPolicy::ReportAbsent));
    settle().await;

    let bogus = Coordinate {
        latitude: 512.0,
        longitude: 4.0,
    };
    source.respond(0, Ok(bogus));
    let result = provider.wait_resolved().await;

    assert_eq!(result.permission_state, PermissionState::Unavailable);
    assert!(result.coordinate.is_none());
}

#[tokio::test(start_paused = true)]
async fn unsupported_host_is_unavailable() {
    let provider = LocationProvider::start(UnsupportedHost, config(UnresolvedPolicy::ReportAbsent));
    let result = provider.wait_resolved().await;

    assert_eq!(result.permission_state, PermissionState::Unavailable);
    assert_eq!(
        result.error.as_deref(),
        Some("geolocation is not supported by this host")
    );
}

// ---------------------------------------------------------------------------
// Timeout
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn timeout_without_response_resolves_to_unavailable() {
    let source = ScriptedSource::default();
    let provider = LocationProvider::start(source.clone(), config(UnresolvedPolicy::ReportAbsent));

    // Nothing answers; the paused clock jumps to the attempt deadline.
    let result = provider.wait_resolved().await;

    assert_eq!(result.permission_state, PermissionState::Unavailable);
    assert_eq!(
        result.error.as_deref(),
        Some("timed out after 10s waiting for a position")
    );
}

#[tokio::test(start_paused = true)]
async fn late_success_after_timeout_is_ignored() {
    let source = ScriptedSource::default();
    let provider = LocationProvider::start(source.clone(), config(UnresolvedPolicy::ReportAbsent));
    let timed_out = provider.wait_resolved().await;
    assert_eq!(timed_out.permission_state, PermissionState::Unavailable);

    let delivered = source.respond(0, Ok(meir()));
    settle().await;

    assert!(!delivered, "timed-out request should have been abandoned");
    assert_eq!(provider.current_result(), timed_out);
}

#[tokio::test(start_paused = true)]
async fn timer_after_resolution_is_a_no_op() {
    let source = ScriptedSource::default();
    let provider = LocationProvider::start(source.clone(), config(UnresolvedPolicy::ReportAbsent));
    settle().await;

    source.respond(0, Ok(meir()));
    let granted = provider.wait_resolved().await;

    tokio::time::advance(Duration::from_secs(30)).await;
    settle().await;
    assert_eq!(provider.current_result(), granted);
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn retry_reenters_loading_then_grants_new_coordinate() {
    let source = ScriptedSource::default();
    let provider = LocationProvider::start(source.clone(), config(UnresolvedPolicy::ReportAbsent));
    settle().await;
    source.respond(0, Err(PositionError::PermissionDenied));
    provider.wait_resolved().await;

    provider.retry();
    let loading = provider.current_result();
    assert!(loading.is_loading);
    assert!(loading.error.is_none());
    assert_eq!(loading.permission_state, PermissionState::Prompt);

    settle().await;
    assert_eq!(source.calls(), 2);
    source.respond(1, Ok(groenplaats()));
    let result = provider.wait_resolved().await;

    assert_eq!(result.permission_state, PermissionState::Granted);
    assert_eq!(result.coordinate, Some(groenplaats()));
    assert!(result.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn retry_while_in_flight_is_a_no_op() {
    let source = ScriptedSource::default();
    let provider = LocationProvider::start(source.clone(), config(UnresolvedPolicy::ReportAbsent));
    settle().await;

    provider.retry();
    settle().await;

    assert_eq!(source.calls(), 1);
    assert!(!source.is_abandoned(0));
    assert!(provider.current_result().is_loading);
}

// ---------------------------------------------------------------------------
// Manual override and teardown
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn manual_entry_supersedes_pending_attempt() {
    let source = ScriptedSource::default();
    let provider = LocationProvider::start(source.clone(), config(UnresolvedPolicy::ReportAbsent));
    settle().await;

    provider.set_manual(groenplaats()).unwrap();
    let result = provider.current_result();
    assert_eq!(result.permission_state, PermissionState::Granted);
    assert_eq!(result.coordinate, Some(groenplaats()));
    assert!(!result.is_loading);

    settle().await;
    assert!(source.is_abandoned(0));
    assert!(!source.respond(0, Err(PositionError::PermissionDenied)));
    assert_eq!(provider.current_result(), result);
}

#[tokio::test(start_paused = true)]
async fn invalid_manual_entry_is_rejected() {
    let source = ScriptedSource::default();
    let provider = LocationProvider::start(source.clone(), config(UnresolvedPolicy::ReportAbsent));

    let bogus = Coordinate {
        latitude: 0.0,
        longitude: 190.0,
    };
    assert!(provider.set_manual(bogus).is_err());
    assert!(provider.current_result().is_loading);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_provider_cancels_the_pending_attempt() {
    let source = ScriptedSource::default();
    let provider = LocationProvider::start(source.clone(), config(UnresolvedPolicy::ReportAbsent));
    settle().await;
    assert!(!source.is_abandoned(0));

    drop(provider);
    settle().await;

    assert!(source.is_abandoned(0));
}

// ---------------------------------------------------------------------------
// Permission query capability
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn denied_permission_query_skips_the_request() {
    let source = ScriptedSource::default();
    let permissions = HostPermissions::new(HostPermission::Denied);
    let provider = LocationProvider::start_with_permissions(
        source.clone(),
        permissions,
        config(UnresolvedPolicy::ReportAbsent),
    );

    let result = provider.wait_resolved().await;
    assert_eq!(result.permission_state, PermissionState::Denied);
    assert_eq!(source.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn unanswerable_permission_query_falls_back_to_request() {
    let source = ScriptedSource::default();
    let mut permissions = HostPermissions::new(HostPermission::Denied);
    permissions.queryable = false;
    let provider = LocationProvider::start_with_permissions(
        source.clone(),
        permissions,
        config(UnresolvedPolicy::ReportAbsent),
    );
    settle().await;

    assert_eq!(source.calls(), 1);
    source.respond(0, Ok(meir()));
    assert!(provider.wait_resolved().await.is_granted());
}

#[tokio::test(start_paused = true)]
async fn permission_changes_drive_the_same_state_machine() {
    let source = ScriptedSource::default();
    let permissions = HostPermissions::new(HostPermission::Prompt);
    let provider = LocationProvider::start_with_permissions(
        source.clone(),
        permissions.clone(),
        config(UnresolvedPolicy::ReportAbsent),
    );
    settle().await;
    source.respond(0, Ok(meir()));
    assert!(provider.wait_resolved().await.is_granted());

    permissions.set(HostPermission::Denied);
    settle().await;
    let revoked = provider.current_result();
    assert_eq!(revoked.permission_state, PermissionState::Denied);
    assert!(revoked.coordinate.is_none());

    permissions.set(HostPermission::Granted);
    settle().await;
    assert!(provider.current_result().is_loading);
    assert_eq!(source.calls(), 2);

    source.respond(1, Ok(groenplaats()));
    let result = provider.wait_resolved().await;
    assert_eq!(result.permission_state, PermissionState::Granted);
    assert_eq!(result.coordinate, Some(groenplaats()));
}

#[tokio::test(start_paused = true)]
async fn prompt_notification_is_ignored() {
    let source = ScriptedSource::default();
    let permissions = HostPermissions::new(HostPermission::Granted);
    let provider = LocationProvider::start_with_permissions(
        source.clone(),
        permissions.clone(),
        config(UnresolvedPolicy::ReportAbsent),
    );
    settle().await;
    source.respond(0, Ok(meir()));
    let granted = provider.wait_resolved().await;

    permissions.set(HostPermission::Prompt);
    settle().await;

    assert_eq!(provider.current_result(), granted);
    assert_eq!(source.calls(), 1);
}

// ---------------------------------------------------------------------------
// Concurrent callers on a multi-threaded runtime
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_manual_entry_and_retry_always_resolve() {
    let bound = Duration::from_secs(2);

    for round in 0..100 {
        let source = ScriptedSource::default();
        let provider = Arc::new(LocationProvider::start(
            source,
            LocationConfig {
                timeout: Duration::from_millis(20),
                ..config(UnresolvedPolicy::ReportAbsent)
            },
        ));
        let first = provider.wait_resolved().await;
        assert_eq!(first.permission_state, PermissionState::Unavailable);

        let manual = {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.set_manual(Coordinate::ANTWERP_CENTER) })
        };
        let retry = {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.retry() })
        };
        manual.await.unwrap().unwrap();
        retry.await.unwrap();

        let resolved = tokio::time::timeout(bound, provider.wait_resolved())
            .await
            .unwrap_or_else(|_| panic!("round {round}: provider still loading after its timeout"));
        assert!(!resolved.is_loading);

        // Whatever won the race, a later retry must still start and finish.
        provider.retry();
        let again = tokio::time::timeout(bound, provider.wait_resolved())
            .await
            .unwrap_or_else(|_| panic!("round {round}: retry after the race never resolved"));
        assert_eq!(again.permission_state, PermissionState::Unavailable);
    }
}
