//! # SkillTrail Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - SQLite repositories for evidence, sessions, skills and the ledger
//! - Configuration loading (env, TOML, JSON)
//! - The retrying HTTP client and the OpenAI session summarizer
//! - Cron scheduling of the engine's background jobs
//! - Tracing bootstrap and engine wiring
//!
//! ## Architecture
//! - Implements traits defined in `skilltrail-core`
//! - Depends on `skilltrail-domain` and `skilltrail-core`
//! - Contains all "impure" code (I/O, network, timers)

pub mod config;
pub mod database;
pub mod engine;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod observability;
pub mod scheduling;

// Re-export commonly used items
pub use database::{
    DbManager, SqliteEventStore, SqliteSessionRepository, SqliteSkillActivityRepository,
    SqliteSkillRepository,
};
pub use engine::SkillTrailEngine;
pub use errors::InfraError;
pub use http::HttpClient;
pub use integrations::openai::{OpenAIError, OpenAISessionSummarizer};
pub use scheduling::{EngineScheduler, SchedulerError};
