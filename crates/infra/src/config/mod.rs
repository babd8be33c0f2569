//! Configuration loading
//!
//! Builds a [`skilltrail_domain::Config`] from environment variables,
//! configuration files or defaults.

pub mod loader;

pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
