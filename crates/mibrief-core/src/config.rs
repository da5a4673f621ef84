use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

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
/// Decoupled from the process environment so tests can drive it with a
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("MIBRIEF_ENV", "development"))?;
    let bind_addr = parse_addr("MIBRIEF_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("MIBRIEF_LOG_LEVEL", "info");
    let pillars_path = PathBuf::from(or_default("MIBRIEF_PILLARS_PATH", "./config/pillars.yaml"));

    let perplexity_api_key = lookup("PERPLEXITY_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty());
    let perplexity_base_url = or_default("PERPLEXITY_BASE_URL", "https://api.perplexity.ai");
    let search_model = or_default("MIBRIEF_SEARCH_MODEL", "sonar-pro");
    let summary_model = or_default("MIBRIEF_SUMMARY_MODEL", "sonar");
    let llm_timeout_secs = parse_u64("MIBRIEF_LLM_TIMEOUT_SECS", "60")?;
    let llm_max_retries = parse_u32("MIBRIEF_LLM_MAX_RETRIES", "2")?;
    let llm_retry_backoff_ms = parse_u64("MIBRIEF_LLM_RETRY_BACKOFF_MS", "1000")?;
    let slot_timeout_secs = parse_u64("MIBRIEF_SLOT_TIMEOUT_SECS", "180")?;
    let ingest_cron = or_default("MIBRIEF_INGEST_CRON", "0 0 11 * * *");

    let db_max_connections = parse_u32("MIBRIEF_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("MIBRIEF_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("MIBRIEF_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    if slot_timeout_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "MIBRIEF_SLOT_TIMEOUT_SECS".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        pillars_path,
        perplexity_api_key,
        perplexity_base_url,
        search_model,
        summary_model,
        llm_timeout_secs,
        llm_max_retries,
        llm_retry_backoff_ms,
        slot_timeout_secs,
        ingest_cron,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "MIBRIEF_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}
