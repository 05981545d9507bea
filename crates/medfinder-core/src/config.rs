use std::path::PathBuf;

use crate::app_config::{AppConfig, Environment, UnresolvedPolicy};
use crate::{ConfigError, Coordinate};

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_f64 = |var: &str, default: f64| -> Result<f64, ConfigError> {
        match lookup(var) {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .map_err(|e| invalid(var, e.to_string())),
            Err(_) => Ok(default),
        }
    };

    let env = parse_environment(&or_default("MEDFINDER_ENV", "development"));
    let log_level = or_default("MEDFINDER_LOG_LEVEL", "info");
    let catalog_path = PathBuf::from(or_default(
        "MEDFINDER_CATALOG_PATH",
        "./config/amenities.yaml",
    ));
    let catalog_url = lookup("MEDFINDER_CATALOG_URL")
        .ok()
        .filter(|s| !s.trim().is_empty());

    let location_timeout_secs = parse_u64("MEDFINDER_LOCATION_TIMEOUT_SECS", "10")?;
    if location_timeout_secs == 0 {
        return Err(invalid(
            "MEDFINDER_LOCATION_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }

    let fallback_lat = parse_f64(
        "MEDFINDER_FALLBACK_LAT",
        Coordinate::ANTWERP_CENTER.latitude,
    )?;
    let fallback_lon = parse_f64(
        "MEDFINDER_FALLBACK_LON",
        Coordinate::ANTWERP_CENTER.longitude,
    )?;
    let fallback = Coordinate::new(fallback_lat, fallback_lon)
        .map_err(|e| invalid("MEDFINDER_FALLBACK_LAT/MEDFINDER_FALLBACK_LON", e.to_string()))?;
    let policy_raw = or_default("MEDFINDER_ON_UNRESOLVED", "fallback");
    let on_unresolved = parse_unresolved_policy(&policy_raw, fallback)
        .ok_or_else(|| {
            invalid(
                "MEDFINDER_ON_UNRESOLVED",
                "expected \"fallback\" or \"absent\"".to_string(),
            )
        })?;

    let http_timeout_secs = parse_u64("MEDFINDER_HTTP_TIMEOUT_SECS", "30")?;
    let http_user_agent = or_default(
        "MEDFINDER_HTTP_USER_AGENT",
        "medfinder/0.1 (facility-finder)",
    );
    let http_max_retries = parse_u32("MEDFINDER_HTTP_MAX_RETRIES", "3")?;
    let http_retry_backoff_base_secs = parse_u64("MEDFINDER_HTTP_RETRY_BACKOFF_BASE_SECS", "1")?;

    Ok(AppConfig {
        env,
        log_level,
        catalog_path,
        catalog_url,
        location_timeout_secs,
        on_unresolved,
        http_timeout_secs,
        http_user_agent,
        http_max_retries,
        http_retry_backoff_base_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

fn parse_unresolved_policy(s: &str, fallback: Coordinate) -> Option<UnresolvedPolicy> {
    match s.trim().to_ascii_lowercase().as_str() {
        "fallback" | "use_fallback_coordinate" => {
            Some(UnresolvedPolicy::UseFallbackCoordinate(fallback))
        }
        "absent" | "report_absent" => Some(UnresolvedPolicy::ReportAbsent),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
