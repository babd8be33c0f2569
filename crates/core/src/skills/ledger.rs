//! Contribution bookkeeping for the experience ledger
//!
//! Pure helpers used by [`super::service::SkillProgressService`]: key
//! resolution, dedup against the ledger and per-skill aggregation.
//!
//! Contributions without an evidence id or timestamp cannot be expressed as
//! a ledger row, and neither can names without a normalized key (CJK skill
//! names, for example, which are keyed by their fallback form). Both are
//! still applied to skill state ("untracked") and therefore cannot be
//! protected against double counting.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use skilltrail_domain::{
    resolve_skill_key, LedgerKey, NewSkillActivity, SkillContribution, SkillNode,
};

/// A contribution paired with its normalized skill key.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedContribution {
    pub skill_key: String,
    pub contribution: SkillContribution,
}

impl KeyedContribution {
    pub fn ledger_key(&self) -> Option<LedgerKey> {
        self.contribution.evidence_id.map(|evidence_id| LedgerKey {
            source: self.contribution.source,
            evidence_id,
            skill_key: self.skill_key.clone(),
        })
    }

    /// Ledger row for a tracked contribution.
    pub fn to_activity(&self) -> Option<NewSkillActivity> {
        let evidence_id = self.contribution.evidence_id?;
        let timestamp = self.contribution.timestamp?;
        Some(NewSkillActivity {
            skill_key: self.skill_key.clone(),
            source: self.contribution.source,
            evidence_id,
            exp: self.contribution.exp,
            timestamp,
        })
    }
}

/// A contribution batch split by how it can be accounted for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerBatch {
    /// Carries a full ledger key; deduplicated within the batch.
    pub tracked: Vec<KeyedContribution>,
    /// Applied to skill state without a ledger row.
    pub untracked: Vec<KeyedContribution>,
    /// Tracked contributions repeated inside the same batch.
    pub batch_duplicates: usize,
    /// Blank name or no positive experience.
    pub rejected: usize,
}

impl LedgerBatch {
    pub fn partition(contributions: Vec<SkillContribution>) -> Self {
        let mut batch = Self::default();
        let mut seen = HashSet::new();

        for contribution in contributions {
            let usable_exp = contribution.exp.is_finite() && contribution.exp > 0.0;
            let Some(resolved) =
                resolve_skill_key(&contribution.skill_name).filter(|_| usable_exp)
            else {
                batch.rejected += 1;
                continue;
            };

            let ledger_ready = resolved.is_normalized();
            let keyed = KeyedContribution { skill_key: resolved.into_key(), contribution };
            let ledger_key = match (keyed.ledger_key(), keyed.contribution.timestamp) {
                (Some(key), Some(_)) if ledger_ready => key,
                _ => {
                    batch.untracked.push(keyed);
                    continue;
                }
            };

            if seen.insert(ledger_key) {
                batch.tracked.push(keyed);
            } else {
                batch.batch_duplicates += 1;
            }
        }
        batch
    }

    pub fn ledger_keys(&self) -> Vec<LedgerKey> {
        self.tracked.iter().filter_map(KeyedContribution::ledger_key).collect()
    }

    /// Drop tracked contributions whose key is already in the ledger.
    /// Returns how many were dropped.
    pub fn retain_new(&mut self, existing: &HashSet<LedgerKey>) -> usize {
        let before = self.tracked.len();
        self.tracked
            .retain(|keyed| keyed.ledger_key().map_or(true, |key| !existing.contains(&key)));
        before - self.tracked.len()
    }

    pub fn activities(&self) -> Vec<NewSkillActivity> {
        self.tracked.iter().filter_map(KeyedContribution::to_activity).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty() && self.untracked.is_empty()
    }

    /// Sum experience per skill key over tracked and untracked entries.
    pub fn aggregate(&self) -> BTreeMap<String, SkillGrant> {
        let mut grants: BTreeMap<String, SkillGrant> = BTreeMap::new();
        for keyed in self.tracked.iter().chain(&self.untracked) {
            let c = &keyed.contribution;
            let grant = grants.entry(keyed.skill_key.clone()).or_insert_with(|| SkillGrant {
                name: c.skill_name.trim().to_string(),
                ..SkillGrant::default()
            });
            grant.exp += c.exp;
            grant.contributions += 1;
            if grant.category.is_none() {
                grant.category = non_blank(c.category.as_deref());
            }
            if grant.parent_name.is_none() {
                grant.parent_name = non_blank(c.parent_name.as_deref());
            }
            if let Some(ts) = c.timestamp {
                grant.latest_evidence = Some(grant.latest_evidence.map_or(ts, |prev| prev.max(ts)));
            }
        }
        grants
    }
}

/// Experience owed to one skill after aggregation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillGrant {
    /// Display name from the first contribution seen.
    pub name: String,
    pub category: Option<String>,
    pub parent_name: Option<String>,
    pub exp: f64,
    pub contributions: usize,
    pub latest_evidence: Option<DateTime<Utc>>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned)
}

/// Resolve a parent skill name to a key.
///
/// A persisted node whose display name matches wins over re-normalizing the
/// name, so differently spelled parents keep pointing at the stored key. A
/// parent never resolves to the child's own key.
pub fn resolve_parent_key(
    parent_name: &str,
    own_key: &str,
    known: &HashMap<String, SkillNode>,
) -> Option<String> {
    let trimmed = parent_name.trim();
    if trimmed.is_empty() {
        return None;
    }

    let by_name = known
        .values()
        .filter(|node| node.name.trim().eq_ignore_ascii_case(trimmed))
        .map(|node| node.key.as_str())
        .min();

    let resolved = by_name.map_or_else(
        || resolve_skill_key(trimmed).map(|key| key.into_key()).unwrap_or_default(),
        str::to_owned,
    );

    (!resolved.is_empty() && resolved != own_key).then_some(resolved)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use skilltrail_domain::ContributionSource;

    use super::*;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn tracked(name: &str, evidence_id: i64, exp: f64) -> SkillContribution {
        SkillContribution::new(name, exp, ContributionSource::Diff).with_evidence(evidence_id, ts())
    }

    fn node(key: &str, name: &str) -> SkillNode {
        SkillNode {
            key: key.into(),
            name: name.into(),
            category: "language".into(),
            parent_key: None,
            level: 1,
            exp: 0.0,
            exp_to_next: 150.0,
            last_active: ts(),
        }
    }

    #[test]
    fn test_partition_separates_tracked_untracked_and_rejected() {
        let batch = LedgerBatch::partition(vec![
            tracked("Go", 42, 3.0),
            SkillContribution::new("Rust", 2.0, ContributionSource::Manual),
            tracked("!!!", 1, 3.0),
            tracked("SQL", 2, 0.0),
        ]);

        assert_eq!(batch.tracked.len(), 1);
        assert_eq!(batch.untracked.len(), 1);
        assert_eq!(batch.rejected, 2);
    }

    #[test]
    fn test_names_without_slug_are_applied_untracked() {
        let batch = LedgerBatch::partition(vec![tracked("数据库", 7, 5.0), tracked("Go", 7, 1.0)]);

        assert_eq!(batch.rejected, 0);
        assert_eq!(batch.untracked.len(), 1);
        assert_eq!(batch.untracked[0].skill_key, "数据库");
        assert_eq!(batch.ledger_keys().len(), 1);
        assert_eq!(batch.aggregate()["数据库"].name, "数据库");
    }

    #[test]
    fn test_in_batch_duplicates_are_counted_once() {
        let batch = LedgerBatch::partition(vec![tracked("Go", 42, 3.0), tracked("go", 42, 3.0)]);

        assert_eq!(batch.tracked.len(), 1);
        assert_eq!(batch.batch_duplicates, 1);
    }

    #[test]
    fn test_retain_new_drops_existing_keys() {
        let mut batch =
            LedgerBatch::partition(vec![tracked("Go", 42, 3.0), tracked("Rust", 42, 3.0)]);
        let existing: HashSet<_> = [LedgerKey {
            source: ContributionSource::Diff,
            evidence_id: 42,
            skill_key: "go".into(),
        }]
        .into_iter()
        .collect();

        assert_eq!(batch.retain_new(&existing), 1);
        assert_eq!(batch.tracked[0].skill_key, "rust");
        assert_eq!(batch.activities().len(), 1);
    }

    #[test]
    fn test_aggregate_sums_per_key() {
        let batch = LedgerBatch::partition(vec![
            tracked("React.js", 1, 2.0).with_category("framework"),
            tracked("react.js", 2, 3.0),
            tracked("Rust", 3, 1.5),
        ]);

        let grants = batch.aggregate();

        assert_eq!(grants.len(), 2);
        assert_eq!(grants["reactjs"].exp, 5.0);
        assert_eq!(grants["reactjs"].contributions, 2);
        assert_eq!(grants["reactjs"].category.as_deref(), Some("framework"));
    }

    #[test]
    fn test_parent_prefers_persisted_name_match() {
        let known: HashMap<_, _> =
            [("js".to_string(), node("js", "JavaScript"))].into_iter().collect();

        assert_eq!(resolve_parent_key("javascript", "reactjs", &known), Some("js".into()));
        assert_eq!(resolve_parent_key("Web Dev", "reactjs", &known), Some("web-dev".into()));
    }

    #[test]
    fn test_parent_never_resolves_to_self_or_blank() {
        let known = HashMap::new();
        assert_eq!(resolve_parent_key("Rust", "rust", &known), None);
        assert_eq!(resolve_parent_key("  ", "rust", &known), None);
    }
}
