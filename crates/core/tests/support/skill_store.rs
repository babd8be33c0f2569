//! In-memory skill node store and experience ledger.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use skilltrail_core::skills::{SkillActivityRepository, SkillRepository};
use skilltrail_domain::{
    LedgerKey, NewSkillActivity, Result as DomainResult, SkillActivity, SkillNode,
    SkillTrailError,
};

#[derive(Default, Clone)]
pub struct InMemorySkillRepository {
    nodes: Arc<Mutex<BTreeMap<String, SkillNode>>>,
}

impl InMemorySkillRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(self, node: SkillNode) -> Self {
        self.nodes.lock().insert(node.key.clone(), node);
        self
    }

    pub fn node(&self, key: &str) -> Option<SkillNode> {
        self.nodes.lock().get(key).cloned()
    }

    fn upsert(&self, nodes: &[SkillNode]) {
        let mut stored = self.nodes.lock();
        for node in nodes {
            stored.insert(node.key.clone(), node.clone());
        }
    }
}

#[async_trait]
impl SkillRepository for InMemorySkillRepository {
    async fn get_by_key(&self, key: &str) -> DomainResult<Option<SkillNode>> {
        Ok(self.node(key))
    }

    async fn get_all(&self) -> DomainResult<Vec<SkillNode>> {
        Ok(self.nodes.lock().values().cloned().collect())
    }

    async fn upsert_batch(&self, nodes: &[SkillNode]) -> DomainResult<()> {
        self.upsert(nodes);
        Ok(())
    }
}

/// Ledger that commits node upserts into a shared [`InMemorySkillRepository`].
#[derive(Clone)]
pub struct InMemorySkillActivityRepository {
    skills: InMemorySkillRepository,
    rows: Arc<Mutex<Vec<SkillActivity>>>,
    fail_commits: Arc<AtomicBool>,
}

impl InMemorySkillActivityRepository {
    pub fn new(skills: InMemorySkillRepository) -> Self {
        Self { skills, rows: Arc::default(), fail_commits: Arc::default() }
    }

    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<SkillActivity> {
        self.rows.lock().clone()
    }

    fn insert(&self, entries: &[NewSkillActivity]) -> usize {
        let mut rows = self.rows.lock();
        let mut inserted = 0;
        for entry in entries {
            let duplicate = rows.iter().any(|row| {
                row.source == entry.source
                    && row.evidence_id == entry.evidence_id
                    && row.skill_key == entry.skill_key
            });
            if duplicate {
                continue;
            }
            let id = i64::try_from(rows.len()).unwrap_or(i64::MAX) + 1;
            rows.push(SkillActivity {
                id,
                skill_key: entry.skill_key.clone(),
                source: entry.source,
                evidence_id: entry.evidence_id,
                exp: entry.exp,
                timestamp: entry.timestamp,
            });
            inserted += 1;
        }
        inserted
    }
}

#[async_trait]
impl SkillActivityRepository for InMemorySkillActivityRepository {
    async fn batch_insert(&self, entries: &[NewSkillActivity]) -> DomainResult<usize> {
        Ok(self.insert(entries))
    }

    async fn list_existing_keys(&self, keys: &[LedgerKey]) -> DomainResult<HashSet<LedgerKey>> {
        let rows = self.rows.lock();
        Ok(keys
            .iter()
            .filter(|key| {
                rows.iter().any(|row| {
                    row.source == key.source
                        && row.evidence_id == key.evidence_id
                        && row.skill_key == key.skill_key
                })
            })
            .cloned()
            .collect())
    }

    async fn commit_progress(
        &self,
        nodes: &[SkillNode],
        entries: &[NewSkillActivity],
    ) -> DomainResult<usize> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(SkillTrailError::Database("ledger commit failed".to_string()));
        }
        self.skills.upsert(nodes);
        Ok(self.insert(entries))
    }

    async fn list_by_skill(
        &self,
        skill_key: &str,
        limit: usize,
    ) -> DomainResult<Vec<SkillActivity>> {
        let mut rows: Vec<_> =
            self.rows.lock().iter().filter(|row| row.skill_key == skill_key).cloned().collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        rows.truncate(limit);
        Ok(rows)
    }
}
