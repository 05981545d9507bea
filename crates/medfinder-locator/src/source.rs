//! Host capabilities the provider depends on.
//!
//! A host supplies a [`PositionSource`] (the "get current position"
//! primitive) and optionally a [`PermissionQuery`] that reports the
//! authorization status ahead of a request and notifies on changes.

use std::future::Future;
use std::time::Duration;

use medfinder_core::Coordinate;
use tokio::sync::watch;

/// Request options forwarded to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout: Duration,
    /// Maximum age of a cached position the host may return.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::ZERO,
        }
    }
}

/// Failure reported by the host's positioning service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("timeout")]
    Timeout,
    #[error("{0}")]
    Unknown(String),
}

/// The host's asynchronous "get current position" primitive.
pub trait PositionSource: Send + Sync + 'static {
    /// Whether the host has a positioning capability at all.
    fn is_supported(&self) -> bool {
        true
    }

    /// Resolves with one position fix or the host's error.
    fn current_position(
        &self,
        options: &PositionOptions,
    ) -> impl Future<Output = Result<Coordinate, PositionError>> + Send;
}

/// Authorization status as reported by the host's permission query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPermission {
    Granted,
    Prompt,
    Denied,
}

/// Optional permission-query capability.
pub trait PermissionQuery: Send + Sync + 'static {
    /// Current status, or `None` when the host cannot answer.
    fn query(&self) -> impl Future<Output = Option<HostPermission>> + Send;

    /// Change notifications, if the host offers them.
    fn watch(&self) -> Option<watch::Receiver<HostPermission>> {
        None
    }
}

/// Host without a permission-query capability; requests go out directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPermissionQuery;

impl PermissionQuery for NoPermissionQuery {
    async fn query(&self) -> Option<HostPermission> {
        None
    }
}

/// Host without any positioning capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedHost;

impl PositionSource for UnsupportedHost {
    fn is_supported(&self) -> bool {
        false
    }

    async fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<Coordinate, PositionError> {
        Err(PositionError::PositionUnavailable)
    }
}
