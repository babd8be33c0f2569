//! Skill store and ledger ports

use std::collections::HashSet;

use async_trait::async_trait;
use skilltrail_domain::{LedgerKey, NewSkillActivity, Result, SkillActivity, SkillNode};

/// Persistent skill node store.
#[async_trait]
pub trait SkillRepository: Send + Sync {
    async fn get_by_key(&self, key: &str) -> Result<Option<SkillNode>>;

    async fn get_all(&self) -> Result<Vec<SkillNode>>;

    /// Insert or replace the given nodes by key.
    async fn upsert_batch(&self, nodes: &[SkillNode]) -> Result<()>;
}

/// Append-only experience ledger.
#[async_trait]
pub trait SkillActivityRepository: Send + Sync {
    /// Insert entries, silently skipping duplicates of an existing
    /// `(source, evidence_id, skill_key)`. Returns the number inserted.
    async fn batch_insert(&self, entries: &[NewSkillActivity]) -> Result<usize>;

    /// Subset of `keys` already present in the ledger.
    async fn list_existing_keys(&self, keys: &[LedgerKey]) -> Result<HashSet<LedgerKey>>;

    /// Upsert `nodes` and insert `entries` as one unit of work. Returns the
    /// number of ledger rows inserted.
    async fn commit_progress(
        &self,
        nodes: &[SkillNode],
        entries: &[NewSkillActivity],
    ) -> Result<usize>;

    /// Ledger rows of one skill, newest first.
    async fn list_by_skill(&self, skill_key: &str, limit: usize) -> Result<Vec<SkillActivity>>;
}
