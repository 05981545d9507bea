use std::path::PathBuf;

use crate::Coordinate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    /// Production output is read by log collectors rather than a terminal:
    /// no ANSI colour and no module targets.
    #[must_use]
    pub fn plain_logs(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// What a location provider reports when no real position could be acquired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnresolvedPolicy {
    /// Report the given coordinate, flagged as a default location.
    UseFallbackCoordinate(Coordinate),
    /// Report no coordinate at all.
    ReportAbsent,
}

impl Default for UnresolvedPolicy {
    fn default() -> Self {
        Self::UseFallbackCoordinate(Coordinate::ANTWERP_CENTER)
    }
}

impl std::fmt::Display for UnresolvedPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnresolvedPolicy::UseFallbackCoordinate(c) => write!(f, "fallback ({c})"),
            UnresolvedPolicy::ReportAbsent => write!(f, "absent"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub catalog_path: PathBuf,
    pub catalog_url: Option<String>,
    pub location_timeout_secs: u64,
    pub on_unresolved: UnresolvedPolicy,
    pub http_timeout_secs: u64,
    pub http_user_agent: String,
    pub http_max_retries: u32,
    pub http_retry_backoff_base_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("catalog_path", &self.catalog_path)
            .field(
                "catalog_url",
                &self.catalog_url.as_ref().map(|_| "[redacted]"),
            )
            .field("location_timeout_secs", &self.location_timeout_secs)
            .field("on_unresolved", &self.on_unresolved)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("http_user_agent", &self.http_user_agent)
            .field("http_max_retries", &self.http_max_retries)
            .field(
                "http_retry_backoff_base_secs",
                &self.http_retry_backoff_base_secs,
            )
            .finish()
    }
}
