//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::SkipLotConfig;
use crate::config::secret::secret_string;
use crate::domain::errors::SkipLotError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into SkipLotConfig
/// 4. Applies environment variable overrides (SKIPLOT_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - Environment variable substitution fails
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use skiplot::config::loader::load_config;
///
/// let config = load_config("skiplot.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<SkipLotConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(SkipLotError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        SkipLotError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses and validates configuration from a TOML string
///
/// Applies the same substitution, overrides and validation as [`load_config`].
pub fn parse_config(contents: &str) -> Result<SkipLotConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: SkipLotConfig = toml::from_str(&contents)
        .map_err(|e| SkipLotError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        SkipLotError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| SkipLotError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim_start();

        // Don't process env vars in comments
        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(SkipLotError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using SKIPLOT_* prefix
///
/// Environment variables follow the pattern: SKIPLOT_<SECTION>_<KEY>
/// For example: SKIPLOT_LIMS_BASE_URL, SKIPLOT_POSTGRESQL_MAX_CONNECTIONS
fn apply_env_overrides(config: &mut SkipLotConfig) -> Result<()> {
    if let Ok(val) = std::env::var("SKIPLOT_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    if let Ok(val) = std::env::var("SKIPLOT_STORE_TARGET") {
        config.store_target = match val.as_str() {
            "postgresql" => super::schema::StoreTarget::PostgreSQL,
            "memory" => super::schema::StoreTarget::Memory,
            other => {
                return Err(SkipLotError::Configuration(format!(
                    "Invalid SKIPLOT_STORE_TARGET '{other}'. Must be one of: postgresql, memory"
                )))
            }
        };
    }

    // PostgreSQL overrides (only if PostgreSQL is configured)
    if let Some(ref mut pg_config) = config.postgresql {
        if let Ok(val) = std::env::var("SKIPLOT_POSTGRESQL_CONNECTION_STRING") {
            pg_config.connection_string = secret_string(val);
        }
        if let Ok(val) = std::env::var("SKIPLOT_POSTGRESQL_MAX_CONNECTIONS") {
            if let Ok(max) = val.parse() {
                pg_config.max_connections = max;
            }
        }
        if let Ok(val) = std::env::var("SKIPLOT_POSTGRESQL_SSL_MODE") {
            pg_config.ssl_mode = val;
        }
    }

    // LIMS API overrides
    if let Some(ref mut lims_config) = config.lims {
        if let Ok(val) = std::env::var("SKIPLOT_LIMS_BASE_URL") {
            lims_config.base_url = val;
        }
        if let Ok(val) = std::env::var("SKIPLOT_LIMS_AUTH_TYPE") {
            lims_config.auth_type = val;
        }
        if let Ok(val) = std::env::var("SKIPLOT_LIMS_USERNAME") {
            lims_config.username = Some(val);
        }
        if let Ok(val) = std::env::var("SKIPLOT_LIMS_PASSWORD") {
            lims_config.password = Some(secret_string(val));
        }
        if let Ok(val) = std::env::var("SKIPLOT_LIMS_TOKEN") {
            lims_config.token = Some(secret_string(val));
        }
        if let Ok(val) = std::env::var("SKIPLOT_LIMS_TIMEOUT_SECONDS") {
            if let Ok(timeout) = val.parse() {
                lims_config.timeout_seconds = timeout;
            }
        }
    }

    // Memory store overrides
    if let Some(ref mut memory_config) = config.memory {
        if let Ok(val) = std::env::var("SKIPLOT_MEMORY_FIXTURE_PATH") {
            memory_config.fixture_path = val;
        }
        if let Ok(val) = std::env::var("SKIPLOT_MEMORY_PERSIST") {
            memory_config.persist = val.parse().unwrap_or(false);
        }
    }

    // Logging overrides
    if let Ok(val) = std::env::var("SKIPLOT_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("SKIPLOT_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("SKIPLOT_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}
