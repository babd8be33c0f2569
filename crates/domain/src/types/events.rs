//! Raw activity evidence consumed by the engine
//!
//! These records are produced by external collectors and are read-only from
//! the engine's perspective, except for the one-time diff analysis fields.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Window-focus sample with the dwell time computed by the collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawWindowEvent {
    pub timestamp: DateTime<Utc>,
    /// Dwell time in milliseconds.
    pub duration_ms: i64,
    pub app_name: String,
    pub title: String,
    pub source: String,
}

impl RawWindowEvent {
    /// Dwell time, never negative.
    pub fn duration(&self) -> Duration {
        Duration::milliseconds(self.duration_ms.max(0))
    }

    /// Moment the focus left this window.
    pub fn end_time(&self) -> DateTime<Utc> {
        self.timestamp + self.duration()
    }
}

/// Code-change evidence ("diff").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeChangeEvidence {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub file_path: String,
    pub file_name: String,
    pub language: String,
    pub lines_added: i64,
    pub lines_deleted: i64,
    pub diff_content: String,
    /// Filled once by the asynchronous analysis step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_insight: Option<String>,
    /// Filled once by the asynchronous analysis step.
    #[serde(default)]
    pub skills_detected: Vec<String>,
}

impl CodeChangeEvidence {
    pub fn changed_lines(&self) -> i64 {
        self.lines_added.max(0) + self.lines_deleted.max(0)
    }

    /// Number of unified-diff hunks (`@@` headers) in the stored patch.
    pub fn hunk_count(&self) -> usize {
        self.diff_content.lines().filter(|line| line.starts_with("@@")).count()
    }

    /// True once the analysis step has recorded its result.
    pub fn is_analyzed(&self) -> bool {
        self.ai_insight.is_some() || !self.skills_detected.is_empty()
    }
}

/// Browser visit evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserVisitEvidence {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub domain: String,
    pub title: String,
    pub url: String,
}
