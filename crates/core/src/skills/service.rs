//! Skill progress service - the only writer of skill node state

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use skilltrail_domain::constants::DEFAULT_SKILL_CATEGORY;
use skilltrail_domain::{
    CodeChangeEvidence, Result, SkillActivity, SkillContribution, SkillCurveConfig, SkillNode,
};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::experience::ExperiencePolicy;
use super::ledger::{resolve_parent_key, LedgerBatch};
use super::ports::{SkillActivityRepository, SkillRepository};
use super::progression::SkillCurve;

/// Accounting of one `apply_contributions` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerOutcome {
    /// Contributions that changed skill state.
    pub applied: usize,
    /// Dropped because the ledger (or the same batch) already had the key.
    pub duplicates: usize,
    /// Applied without a ledger row.
    pub untracked: usize,
    pub rejected: usize,
    pub ledger_rows: usize,
    pub skills_touched: usize,
    pub levels_gained: u32,
}

/// Routes every experience grant through the ledger before touching nodes.
pub struct SkillProgressService {
    skills: Arc<dyn SkillRepository>,
    ledger: Arc<dyn SkillActivityRepository>,
    curve: SkillCurve,
    policy: ExperiencePolicy,
    write_lock: Mutex<()>,
}

impl SkillProgressService {
    pub fn new(
        skills: Arc<dyn SkillRepository>,
        ledger: Arc<dyn SkillActivityRepository>,
        config: SkillCurveConfig,
    ) -> Self {
        Self {
            skills,
            ledger,
            policy: ExperiencePolicy::from_config(&config),
            curve: SkillCurve::new(config),
            write_lock: Mutex::new(()),
        }
    }

    pub fn curve(&self) -> &SkillCurve {
        &self.curve
    }

    pub fn policy(&self) -> &ExperiencePolicy {
        &self.policy
    }

    /// Dedup `contributions` against the ledger, aggregate per skill, level
    /// the nodes and commit nodes plus ledger rows together.
    #[instrument(skip(self, contributions), fields(count = contributions.len()))]
    pub async fn apply_contributions(
        &self,
        contributions: Vec<SkillContribution>,
        now: DateTime<Utc>,
    ) -> Result<LedgerOutcome> {
        let _guard = self.write_lock.lock().await;

        let mut batch = LedgerBatch::partition(contributions);
        let mut outcome = LedgerOutcome {
            rejected: batch.rejected,
            duplicates: batch.batch_duplicates,
            ..LedgerOutcome::default()
        };

        let keys = batch.ledger_keys();
        if !keys.is_empty() {
            let existing = self.ledger.list_existing_keys(&keys).await?;
            outcome.duplicates += batch.retain_new(&existing);
        }
        if batch.is_empty() {
            debug!(duplicates = outcome.duplicates, "no new experience to apply");
            return Ok(outcome);
        }

        let mut known: HashMap<String, SkillNode> = self
            .skills
            .get_all()
            .await?
            .into_iter()
            .map(|node| (node.key.clone(), node))
            .collect();

        let grants = batch.aggregate();
        let mut touched = Vec::with_capacity(grants.len());
        for (key, grant) in grants {
            let parent_key = grant
                .parent_name
                .as_deref()
                .and_then(|parent| resolve_parent_key(parent, &key, &known));

            let mut node = match known.remove(&key) {
                Some(mut node) => {
                    if node.parent_key.is_none() {
                        node.parent_key = parent_key;
                    }
                    if node.category == DEFAULT_SKILL_CATEGORY {
                        if let Some(category) = grant.category.clone() {
                            node.category = category;
                        }
                    }
                    node
                }
                None => self.curve.new_node(&key, grant.name, grant.category, parent_key, now),
            };

            outcome.levels_gained += self.curve.add_experience(&mut node, grant.exp, now);
            outcome.applied += grant.contributions;
            known.insert(key, node.clone());
            touched.push(node);
        }

        outcome.untracked = batch.untracked.len();
        outcome.skills_touched = touched.len();
        outcome.ledger_rows = self.ledger.commit_progress(&touched, &batch.activities()).await?;

        info!(
            applied = outcome.applied,
            duplicates = outcome.duplicates,
            skills = outcome.skills_touched,
            levels_gained = outcome.levels_gained,
            "skill experience applied"
        );
        Ok(outcome)
    }

    /// Grant experience for analysed diffs (source `diff`, evidence = diff id).
    pub async fn apply_diff_evidence(
        &self,
        diffs: &[CodeChangeEvidence],
        now: DateTime<Utc>,
    ) -> Result<LedgerOutcome> {
        let contributions: Vec<SkillContribution> =
            diffs.iter().flat_map(|diff| self.policy.contributions_for_diff(diff)).collect();
        if contributions.is_empty() {
            return Ok(LedgerOutcome::default());
        }
        self.apply_contributions(contributions, now).await
    }

    /// Apply inactivity decay to every node. Returns how many nodes lost
    /// experience.
    #[instrument(skip(self))]
    pub async fn decay_sweep(&self, now: DateTime<Utc>) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        let mut decayed = Vec::new();
        for mut node in self.skills.get_all().await? {
            self.curve.refresh(&mut node);
            if self.curve.decay(&mut node, now).is_some() {
                decayed.push(node);
            }
        }

        if !decayed.is_empty() {
            self.skills.upsert_batch(&decayed).await?;
        }
        info!(decayed = decayed.len(), "decay sweep finished");
        Ok(decayed.len())
    }

    pub async fn skill(&self, key: &str) -> Result<Option<SkillNode>> {
        Ok(self.skills.get_by_key(key).await?.map(|mut node| {
            self.curve.refresh(&mut node);
            node
        }))
    }

    /// All nodes, highest level first.
    pub async fn skills(&self) -> Result<Vec<SkillNode>> {
        let mut nodes = self.skills.get_all().await?;
        for node in &mut nodes {
            self.curve.refresh(node);
        }
        nodes.sort_by(|a, b| {
            b.level
                .cmp(&a.level)
                .then_with(|| b.exp.total_cmp(&a.exp))
                .then_with(|| a.key.cmp(&b.key))
        });
        Ok(nodes)
    }

    pub async fn activities_for_skill(
        &self,
        key: &str,
        limit: usize,
    ) -> Result<Vec<SkillActivity>> {
        self.ledger.list_by_skill(key, limit).await
    }
}
