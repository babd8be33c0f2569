//! Configuration loader
//!
//! Loads engine configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the process environment when one exists
//! 2. Loads from environment variables when `SKILLTRAIL_DB_PATH` is set
//! 3. Otherwise probes the standard locations for a config file
//! 4. Falls back to [`Config::default`] when no source exists
//!
//! ## Environment Variables
//! - `SKILLTRAIL_DB_PATH`: Database file path (required for env loading)
//! - `SKILLTRAIL_DB_POOL_SIZE`: Connection pool size
//! - `SKILLTRAIL_IDLE_GAP_SECS`: Silence that splits two sessions
//! - `SKILLTRAIL_UTC_OFFSET_MINUTES`: Offset used for session dates
//! - `SKILLTRAIL_OPENAI_API_KEY`: Enables generated summaries
//! - `SKILLTRAIL_OPENAI_MODEL`: Chat model used for summaries
//! - `SKILLTRAIL_LOG_LEVEL`: Default log filter
//! - `SKILLTRAIL_LOG_JSON`: JSON log output (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./skilltrail.{toml,json}` or `./config.{toml,json}`
//! 2. The same names in the parent and grandparent directories
//! 3. The same names relative to the executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use skilltrail_domain::{Config, Result, SkillTrailError};
use tracing::{debug, info, warn};

pub const ENV_DB_PATH: &str = "SKILLTRAIL_DB_PATH";
pub const ENV_DB_POOL_SIZE: &str = "SKILLTRAIL_DB_POOL_SIZE";
pub const ENV_IDLE_GAP_SECS: &str = "SKILLTRAIL_IDLE_GAP_SECS";
pub const ENV_UTC_OFFSET_MINUTES: &str = "SKILLTRAIL_UTC_OFFSET_MINUTES";
pub const ENV_OPENAI_API_KEY: &str = "SKILLTRAIL_OPENAI_API_KEY";
pub const ENV_OPENAI_MODEL: &str = "SKILLTRAIL_OPENAI_MODEL";
pub const ENV_LOG_LEVEL: &str = "SKILLTRAIL_LOG_LEVEL";
pub const ENV_LOG_JSON: &str = "SKILLTRAIL_LOG_JSON";

const CONFIG_FILE_NAMES: [&str; 4] =
    ["skilltrail.toml", "skilltrail.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `SkillTrailError::Config` if the selected source is invalid.
/// A missing source is not an error.
pub fn load() -> Result<Config> {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            warn!(error = %err, "ignoring unreadable .env file");
        }
    }

    if std::env::var_os(ENV_DB_PATH).is_some() {
        let config = load_from_env()?;
        info!("Configuration loaded from environment variables");
        return Ok(config);
    }

    match probe_config_paths() {
        Some(path) => load_from_file(Some(path)),
        None => {
            info!("No configuration source found; using defaults");
            Ok(Config::default())
        }
    }
}

/// Load configuration from environment variables
///
/// `SKILLTRAIL_DB_PATH` is required; every other variable overrides the
/// matching default when present.
///
/// # Errors
/// Returns `SkillTrailError::Config` if the database path is missing or a
/// variable holds an invalid value.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();
    config.database.path = env_var(ENV_DB_PATH)?;

    if let Some(pool_size) = env_parse(ENV_DB_POOL_SIZE)? {
        config.database.pool_size = pool_size;
    }
    if let Some(idle_gap) = env_parse(ENV_IDLE_GAP_SECS)? {
        config.segmentation.idle_gap_secs = idle_gap;
    }
    if let Some(offset) = env_parse(ENV_UTC_OFFSET_MINUTES)? {
        config.segmentation.utc_offset_minutes = offset;
    }
    if let Ok(api_key) = std::env::var(ENV_OPENAI_API_KEY) {
        config.llm.api_key = Some(api_key);
    }
    if let Ok(model) = std::env::var(ENV_OPENAI_MODEL) {
        config.llm.model = model;
    }
    if let Ok(level) = std::env::var(ENV_LOG_LEVEL) {
        config.logging.level = level;
    }
    config.logging.json = env_bool(ENV_LOG_JSON, config.logging.json);

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations via
/// [`probe_config_paths`]. TOML and JSON are detected by extension.
///
/// # Errors
/// Returns `SkillTrailError::Config` if the file is missing, unreadable,
/// malformed or fails validation.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SkillTrailError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SkillTrailError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SkillTrailError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SkillTrailError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SkillTrailError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(SkillTrailError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// Returns the first existing candidate, or `None`.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.extend([exe_dir.to_path_buf(), exe_dir.join("..")]);
        }
    }

    let found = roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.is_file());
    debug!(found = ?found, "probed configuration paths");
    found
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        SkillTrailError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Parse an optional variable; unset yields `None`, garbage is an error.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| SkillTrailError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off`
/// (case-insensitive).
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
