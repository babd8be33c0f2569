//! Skill progression state and the experience ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_label_conversions;

/// Mutable level/experience state of one skill.
///
/// `exp_to_next` is derived from `level` by the leveling curve and is
/// recomputed whenever the level changes or a node is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillNode {
    pub key: String,
    pub name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_key: Option<String>,
    pub level: u32,
    pub exp: f64,
    pub exp_to_next: f64,
    pub last_active: DateTime<Utc>,
}

/// Kind of evidence that granted experience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionSource {
    Diff,
    Session,
    Manual,
}

impl_label_conversions!(ContributionSource {
    Diff => "diff",
    Session => "session",
    Manual => "manual",
});

/// A single request to grant experience to a named skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillContribution {
    pub skill_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    pub exp: f64,
    pub source: ContributionSource,
    /// Identifier of the diff/session that justifies the grant. Without it
    /// (or without `timestamp`) the grant is applied but not recorded in the
    /// ledger, so it cannot be deduplicated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl SkillContribution {
    pub fn new(skill_name: impl Into<String>, exp: f64, source: ContributionSource) -> Self {
        Self {
            skill_name: skill_name.into(),
            category: None,
            parent_name: None,
            exp,
            source,
            evidence_id: None,
            timestamp: None,
        }
    }

    pub fn with_evidence(mut self, evidence_id: i64, timestamp: DateTime<Utc>) -> Self {
        self.evidence_id = Some(evidence_id);
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_parent(mut self, parent_name: impl Into<String>) -> Self {
        self.parent_name = Some(parent_name.into());
        self
    }
}

/// Composite idempotency key of a ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LedgerKey {
    pub source: ContributionSource,
    pub evidence_id: i64,
    pub skill_key: String,
}

/// Ledger row to be inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSkillActivity {
    pub skill_key: String,
    pub source: ContributionSource,
    pub evidence_id: i64,
    pub exp: f64,
    pub timestamp: DateTime<Utc>,
}

impl NewSkillActivity {
    pub fn ledger_key(&self) -> LedgerKey {
        LedgerKey {
            source: self.source,
            evidence_id: self.evidence_id,
            skill_key: self.skill_key.clone(),
        }
    }
}

/// Persisted ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillActivity {
    pub id: i64,
    pub skill_key: String,
    pub source: ContributionSource,
    pub evidence_id: i64,
    pub exp: f64,
    pub timestamp: DateTime<Utc>,
}
