use crate::app_config::{AppConfig, Environment};
use crate::{ConfigError, Coordinate};

pub(crate) const DEFAULT_GEOCODE_BASE_URL: &str = "https://maps.googleapis.com/maps/api/";
pub(crate) const DEFAULT_USER_AGENT: &str = "doorstep/0.1 (address-picker)";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
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
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        match lookup(var) {
            Ok(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(ConfigError::MissingEnvVar(var.to_string())),
        }
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let geocode_api_key = require("DOORSTEP_GEOCODE_API_KEY")?;

    let env = parse_environment(&or_default("DOORSTEP_ENV", "development"))?;
    let log_level = or_default("DOORSTEP_LOG_LEVEL", "info");
    let geocode_base_url = or_default("DOORSTEP_GEOCODE_BASE_URL", DEFAULT_GEOCODE_BASE_URL);
    let user_agent = or_default("DOORSTEP_USER_AGENT", DEFAULT_USER_AGENT);

    let geocode_timeout_secs = parse_u64("DOORSTEP_GEOCODE_TIMEOUT_SECS", "10")?;
    if geocode_timeout_secs == 0 {
        return Err(invalid(
            "DOORSTEP_GEOCODE_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }

    let debounce_ms = parse_u64("DOORSTEP_DEBOUNCE_MS", "1000")?;
    let min_query_chars = parse_usize("DOORSTEP_MIN_QUERY_CHARS", "5")?;
    let auth_delay_ms = parse_u64("DOORSTEP_AUTH_DELAY_MS", "1000")?;

    let map_default_zoom = or_default("DOORSTEP_MAP_DEFAULT_ZOOM", "15")
        .parse::<u8>()
        .map_err(|e| invalid("DOORSTEP_MAP_DEFAULT_ZOOM", e.to_string()))?;
    if !(1..=21).contains(&map_default_zoom) {
        return Err(invalid(
            "DOORSTEP_MAP_DEFAULT_ZOOM",
            format!("zoom {map_default_zoom} outside 1..=21"),
        ));
    }

    let map_default_center = or_default("DOORSTEP_MAP_DEFAULT_CENTER", "0,0")
        .parse::<Coordinate>()
        .map_err(|e| invalid("DOORSTEP_MAP_DEFAULT_CENTER", e.to_string()))?;

    Ok(AppConfig {
        env,
        log_level,
        geocode_api_key,
        geocode_base_url,
        geocode_timeout_secs,
        user_agent,
        debounce_ms,
        min_query_chars,
        map_default_zoom,
        map_default_center,
        auth_delay_ms,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "DOORSTEP_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
