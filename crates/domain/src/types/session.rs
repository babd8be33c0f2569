//! Session records and the partial update applied by enrichment

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::metadata::SessionMetadata;
use crate::impl_label_conversions;

/// Coarse activity category assigned to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionCategory {
    Technical,
    Learning,
    Exploration,
    Other,
}

impl_label_conversions!(SessionCategory {
    Technical => "technical",
    Learning => "learning",
    Exploration => "exploration",
    Other => "other",
});

impl SessionCategory {
    /// Category implied by the evidence a session carries.
    pub const fn from_evidence(has_diffs: bool, has_browser: bool) -> Self {
        match (has_diffs, has_browser) {
            (true, true) => Self::Exploration,
            (true, false) => Self::Technical,
            (false, true) => Self::Learning,
            (false, false) => Self::Other,
        }
    }
}

/// Label summarizing which evidence a session carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvidenceHint {
    #[serde(rename = "diff+browser")]
    DiffAndBrowser,
    #[serde(rename = "diff")]
    Diff,
    #[serde(rename = "browser")]
    Browser,
    #[serde(rename = "window_only")]
    WindowOnly,
}

impl_label_conversions!(EvidenceHint {
    DiffAndBrowser => "diff+browser",
    Diff => "diff",
    Browser => "browser",
    WindowOnly => "window_only",
});

impl EvidenceHint {
    pub const fn from_evidence(has_diffs: bool, has_browser: bool) -> Self {
        match (has_diffs, has_browser) {
            (true, true) => Self::DiffAndBrowser,
            (true, false) => Self::Diff,
            (false, true) => Self::Browser,
            (false, false) => Self::WindowOnly,
        }
    }
}

/// A persisted, evidence-anchored unit of activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub primary_app: String,
    pub session_version: i64,
    /// Local `HH:MM-HH:MM` label.
    pub time_range: String,
    pub category: String,
    pub summary: String,
    pub skills_involved: Vec<String>,
    pub metadata: SessionMetadata,
}

impl Session {
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    pub fn has_diff_evidence(&self) -> bool {
        !self.metadata.diff_ids().is_empty()
    }

    pub fn has_browser_evidence(&self) -> bool {
        !self.metadata.browser_event_ids().is_empty()
    }

    pub fn evidence_hint(&self) -> EvidenceHint {
        EvidenceHint::from_evidence(self.has_diff_evidence(), self.has_browser_evidence())
    }

    /// A session is due for enrichment until it has a summary and a skill
    /// index.
    pub fn needs_enrichment(&self) -> bool {
        self.summary.trim().is_empty() || !self.metadata.has_skill_index()
    }

    /// True when `timestamp` falls inside `[start_time, end_time]`.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start_time && timestamp <= self.end_time
    }
}

/// Insert payload for the session store's create-if-absent operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSession {
    pub date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub primary_app: String,
    pub session_version: i64,
    pub time_range: String,
    pub metadata: SessionMetadata,
}

impl NewSession {
    pub fn diff_ids(&self) -> Vec<i64> {
        self.metadata.diff_ids()
    }

    pub fn browser_event_ids(&self) -> Vec<i64> {
        self.metadata.browser_event_ids()
    }
}

/// Fields written back by enrichment. `None` leaves the stored value as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSemanticUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills_involved: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SessionMetadata>,
}

impl SessionSemanticUpdate {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.summary.is_none()
            && self.skills_involved.is_none()
            && self.metadata.is_none()
    }

    /// Apply the update to an in-memory copy of the session.
    pub fn apply_to(&self, session: &mut Session) {
        if let Some(category) = &self.category {
            session.category.clone_from(category);
        }
        if let Some(summary) = &self.summary {
            session.summary.clone_from(summary);
        }
        if let Some(skills) = &self.skills_involved {
            session.skills_involved.clone_from(skills);
        }
        if let Some(metadata) = &self.metadata {
            session.metadata = metadata.clone();
        }
    }
}
