//! Claim-to-session evidence views (computed on read, never persisted)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::session::{EvidenceHint, Session};

/// Compact reference to a session supporting a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSessionRef {
    pub id: i64,
    pub date: NaiveDate,
    pub time_range: String,
    pub category: String,
    pub summary: String,
    pub evidence_hint: EvidenceHint,
}

impl From<&Session> for EvidenceSessionRef {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            date: session.date,
            time_range: session.time_range.clone(),
            category: session.category.clone(),
            summary: session.summary.clone(),
            evidence_hint: session.evidence_hint(),
        }
    }
}

/// A claim with the sessions that support it, best first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimEvidence {
    pub claim: String,
    pub sessions: Vec<EvidenceSessionRef>,
}
