//! # SkillTrail Domain
//!
//! Business domain types and models for SkillTrail.
//!
//! This crate contains:
//! - Evidence, session and skill data types
//! - Domain error types and Result definitions
//! - Configuration structures
//! - The skill key normalizer and metadata accessors
//!
//! ## Architecture
//! - No dependencies on other SkillTrail crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::{normalize_skill_key, resolve_skill_key, ResolvedSkillKey};
