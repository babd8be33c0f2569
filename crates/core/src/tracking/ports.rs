//! Event-source ports
//!
//! Collectors own the raw evidence tables; the engine only reads them, with
//! the single exception of the one-time diff analysis write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skilltrail_domain::{BrowserVisitEvidence, CodeChangeEvidence, RawWindowEvent, Result};

/// Source of window-focus samples.
#[async_trait]
pub trait WindowEventSource: Send + Sync {
    /// Events with `start <= timestamp < end`, ascending by timestamp.
    async fn get_window_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawWindowEvent>>;
}

/// Source of code-change evidence.
#[async_trait]
pub trait DiffRepository: Send + Sync {
    /// Diffs with `start <= timestamp < end`, ascending by timestamp.
    async fn get_diffs(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CodeChangeEvidence>>;

    /// Diffs with the given ids, ascending by timestamp. Unknown ids are
    /// skipped.
    async fn get_diffs_by_ids(&self, ids: &[i64]) -> Result<Vec<CodeChangeEvidence>>;

    /// Store the analysis result for a diff that has none yet.
    ///
    /// Returns `false` when the diff was already analysed (or is unknown);
    /// the stored values are then left untouched.
    async fn record_diff_analysis(
        &self,
        diff_id: i64,
        insight: &str,
        skills: &[String],
    ) -> Result<bool>;
}

/// Source of browser visits.
#[async_trait]
pub trait BrowserEventSource: Send + Sync {
    /// Visits with `start <= timestamp < end`, ascending by timestamp.
    async fn get_browser_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BrowserVisitEvidence>>;

    /// Visits with the given ids, ascending by timestamp.
    async fn get_browser_events_by_ids(&self, ids: &[i64]) -> Result<Vec<BrowserVisitEvidence>>;
}
