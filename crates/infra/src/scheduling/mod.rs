//! Background scheduling
//!
//! One cron scheduler drives the engine's periodic work:
//! - incremental session building
//! - incremental enrichment
//! - the daily skill decay sweep
//!
//! Lifecycle is explicit (`start`/`stop`), every run is wrapped in a
//! timeout and observes a cancellation token.

pub mod engine_scheduler;
pub mod error;
pub mod jobs;

pub use engine_scheduler::{EngineJob, EngineScheduler, EngineSchedulerConfig, ScheduledJob};
pub use error::{SchedulerError, SchedulerResult};
pub use jobs::{DecayJob, EnrichmentJob, SessionBuildJob};
