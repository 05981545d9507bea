//! Permission-gated location acquisition.
//!
//! [`LocationProvider`] drives one acquisition attempt at a time against a
//! host [`PositionSource`], bounded by a timeout, and reports the outcome as a
//! [`LocationResult`]. Failures never surface as errors: they become a
//! `Denied` or `Unavailable` permission state with a human-readable message,
//! optionally paired with a fallback coordinate.

pub mod machine;
pub mod provider;
pub mod source;
pub mod state;

pub use machine::{AttemptId, LocationMachine, Outcome};
pub use provider::{LocationConfig, LocationProvider, DEFAULT_TIMEOUT};
pub use source::{
    HostPermission, NoPermissionQuery, PermissionQuery, PositionError, PositionOptions,
    PositionSource, UnsupportedHost,
};
pub use state::{LocationError, LocationResult, PermissionState, Remediation};
