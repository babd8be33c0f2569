//! Error types used throughout the engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for SkillTrail
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum SkillTrailError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),
}

impl SkillTrailError {
    /// Returns true for errors raised by a storage collaborator.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Result type alias for SkillTrail operations
pub type Result<T> = std::result::Result<T, SkillTrailError>;
