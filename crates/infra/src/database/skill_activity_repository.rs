//! Append-only skill experience ledger.
//!
//! The `(source, evidence_id, skill_key)` unique index is the idempotency
//! guard; inserts use `INSERT OR IGNORE` and count affected rows, so a
//! duplicate is never an error.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use skilltrail_core::skills::SkillActivityRepository;
use skilltrail_domain::{
    ContributionSource, LedgerKey, NewSkillActivity, Result, SkillActivity, SkillNode,
};
use tracing::{debug, instrument};

use super::manager::DbManager;
use super::skill_repository::upsert_nodes;
use super::sql::{from_millis, map_sql_error, now_millis, run_blocking, to_millis, usize_to_i64};

pub struct SqliteSkillActivityRepository {
    db: Arc<DbManager>,
}

impl SqliteSkillActivityRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SkillActivityRepository for SqliteSkillActivityRepository {
    async fn batch_insert(&self, entries: &[NewSkillActivity]) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }
        let entries = entries.to_vec();
        run_blocking(&self.db, move |conn| {
            let tx = conn.transaction().map_err(map_sql_error)?;
            let inserted = insert_entries(&tx, &entries)?;
            tx.commit().map_err(map_sql_error)?;
            Ok(inserted)
        })
        .await
    }

    async fn list_existing_keys(&self, keys: &[LedgerKey]) -> Result<HashSet<LedgerKey>> {
        if keys.is_empty() {
            return Ok(HashSet::new());
        }
        let keys = keys.to_vec();
        run_blocking(&self.db, move |conn| {
            let mut stmt = conn.prepare(ACTIVITY_EXISTS_SQL).map_err(map_sql_error)?;
            let mut existing = HashSet::new();
            for key in keys {
                let found = stmt
                    .exists(params![key.source.as_label(), key.evidence_id, key.skill_key])
                    .map_err(map_sql_error)?;
                if found {
                    existing.insert(key);
                }
            }
            Ok(existing)
        })
        .await
    }

    #[instrument(skip(self, nodes, entries), fields(nodes = nodes.len(), entries = entries.len()))]
    async fn commit_progress(
        &self,
        nodes: &[SkillNode],
        entries: &[NewSkillActivity],
    ) -> Result<usize> {
        let nodes = nodes.to_vec();
        let entries = entries.to_vec();
        run_blocking(&self.db, move |conn| {
            let tx = conn.transaction().map_err(map_sql_error)?;
            upsert_nodes(&tx, &nodes)?;
            let inserted = insert_entries(&tx, &entries)?;
            tx.commit().map_err(map_sql_error)?;
            debug!(inserted, "skill progress committed");
            Ok(inserted)
        })
        .await
    }

    async fn list_by_skill(&self, skill_key: &str, limit: usize) -> Result<Vec<SkillActivity>> {
        let skill_key = skill_key.to_string();
        let limit = usize_to_i64(limit);
        run_blocking(&self.db, move |conn| {
            let mut stmt = conn.prepare(ACTIVITY_BY_SKILL_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![skill_key, limit], map_activity_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
    }
}

fn insert_entries(conn: &Connection, entries: &[NewSkillActivity]) -> Result<usize> {
    let mut stmt = conn.prepare_cached(ACTIVITY_INSERT_SQL).map_err(map_sql_error)?;
    let now = now_millis();
    let mut inserted = 0;
    for entry in entries {
        inserted += stmt
            .execute(params![
                entry.skill_key,
                entry.source.as_label(),
                entry.evidence_id,
                entry.exp,
                to_millis(entry.timestamp),
                now
            ])
            .map_err(map_sql_error)?;
    }
    Ok(inserted)
}

const ACTIVITY_INSERT_SQL: &str = "INSERT OR IGNORE INTO skill_activities (
        skill_key, source, evidence_id, exp, timestamp, created_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const ACTIVITY_EXISTS_SQL: &str = "SELECT 1 FROM skill_activities
    WHERE source = ?1 AND evidence_id = ?2 AND skill_key = ?3";

const ACTIVITY_BY_SKILL_SQL: &str = "SELECT id, skill_key, source, evidence_id, exp, timestamp
    FROM skill_activities
    WHERE skill_key = ?1
    ORDER BY timestamp DESC, id DESC
    LIMIT ?2";

fn map_activity_row(row: &Row<'_>) -> rusqlite::Result<SkillActivity> {
    let source_raw: String = row.get(2)?;
    let source = source_raw.parse::<ContributionSource>().map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::<
            dyn std::error::Error + Send + Sync,
        >::from(err))
    })?;
    Ok(SkillActivity {
        id: row.get(0)?,
        skill_key: row.get(1)?,
        source,
        evidence_id: row.get(3)?,
        exp: row.get(4)?,
        timestamp: from_millis(row.get(5)?, 5)?,
    })
}
