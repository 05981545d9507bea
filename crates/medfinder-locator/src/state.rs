//! Observable location state.
//!
//! - [`PermissionState`] - host authorization status as seen by the caller
//! - [`LocationError`] - why an acquisition attempt did not produce a position
//! - [`LocationResult`] - snapshot exposed to callers after every transition
//! - [`Remediation`] - what a UI should offer for the current state

use std::time::Duration;

use medfinder_core::Coordinate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    /// No decision yet; an attempt is in flight.
    #[default]
    Prompt,
    /// A real position was acquired.
    Granted,
    /// The user explicitly refused location access.
    Denied,
    /// Acquisition failed for any reason other than an explicit refusal.
    Unavailable,
}

impl std::fmt::Display for PermissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prompt => write!(f, "prompt"),
            Self::Granted => write!(f, "granted"),
            Self::Denied => write!(f, "denied"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("geolocation is not supported by this host")]
    NotSupported,

    #[error("location access was denied")]
    PermissionDenied,

    #[error("your position could not be determined")]
    PositionUnavailable,

    #[error("timed out after {0:?} waiting for a position")]
    Timeout(Duration),

    #[error("could not retrieve your location: {0}")]
    Unknown(String),
}

impl LocationError {
    /// The resolved permission state this error leaves the provider in.
    #[must_use]
    pub fn permission_state(&self) -> PermissionState {
        match self {
            Self::PermissionDenied => PermissionState::Denied,
            Self::NotSupported
            | Self::PositionUnavailable
            | Self::Timeout(_)
            | Self::Unknown(_) => PermissionState::Unavailable,
        }
    }
}

/// What the caller should offer the user to get out of the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Remediation {
    None,
    /// Still acquiring.
    Wait,
    /// Access was refused: the user has to re-enable it before retrying.
    EnableAccessAndRetry,
    /// Retrying may work; entering coordinates by hand always does.
    RetryOrEnterManually,
}

/// Snapshot of the provider's state.
///
/// `permission_state == Granted` exactly when `coordinate` holds a position
/// that came from a real acquisition or a manual entry. A fallback coordinate
/// is only ever reported with `is_default_location` set and a non-granted
/// permission state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationResult {
    pub coordinate: Option<Coordinate>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub permission_state: PermissionState,
    pub is_default_location: bool,
}

impl LocationResult {
    /// State before the first attempt resolves.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            coordinate: None,
            is_loading: true,
            error: None,
            permission_state: PermissionState::Prompt,
            is_default_location: false,
        }
    }

    #[must_use]
    pub fn is_granted(&self) -> bool {
        self.permission_state == PermissionState::Granted
    }

    #[must_use]
    pub fn remediation(&self) -> Remediation {
        if self.is_loading {
            return Remediation::Wait;
        }
        match self.permission_state {
            PermissionState::Granted => Remediation::None,
            PermissionState::Prompt => Remediation::Wait,
            PermissionState::Denied => Remediation::EnableAccessAndRetry,
            PermissionState::Unavailable => Remediation::RetryOrEnterManually,
        }
    }
}

impl Default for LocationResult {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_permission_denied_maps_to_denied() {
        assert_eq!(
            LocationError::PermissionDenied.permission_state(),
            PermissionState::Denied
        );
        for err in [
            LocationError::NotSupported,
            LocationError::PositionUnavailable,
            LocationError::Timeout(Duration::from_secs(10)),
            LocationError::Unknown("boom".to_string()),
        ] {
            assert_eq!(err.permission_state(), PermissionState::Unavailable, "{err}");
        }
    }

    #[test]
    fn error_messages_distinguish_reasons() {
        assert!(LocationError::NotSupported.to_string().contains("not supported"));
        assert!(LocationError::PositionUnavailable
            .to_string()
            .contains("could not be determined"));
        assert_eq!(
            LocationError::Timeout(Duration::from_secs(10)).to_string(),
            "timed out after 10s waiting for a position"
        );
    }

    #[test]
    fn initial_result_is_prompt_and_loading() {
        let result = LocationResult::initial();
        assert_eq!(result.permission_state, PermissionState::Prompt);
        assert!(result.is_loading);
        assert!(result.coordinate.is_none());
        assert_eq!(result.remediation(), Remediation::Wait);
    }

    #[test]
    fn remediation_differs_between_denied_and_unavailable() {
        let mut result = LocationResult::initial();
        result.is_loading = false;
        result.permission_state = PermissionState::Denied;
        assert_eq!(result.remediation(), Remediation::EnableAccessAndRetry);
        result.permission_state = PermissionState::Unavailable;
        assert_eq!(result.remediation(), Remediation::RetryOrEnterManually);
    }

    #[test]
    fn result_serializes_permission_state_lowercase() {
        let json = serde_json::to_value(LocationResult::initial()).unwrap();
        assert_eq!(json["permission_state"], "prompt");
        assert_eq!(json["is_loading"], true);
    }
}
