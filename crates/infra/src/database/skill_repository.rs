//! Skill node store.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use skilltrail_core::skills::SkillRepository;
use skilltrail_domain::{Result, SkillNode};

use super::manager::DbManager;
use super::sql::{from_millis, map_sql_error, now_millis, run_blocking, to_millis};

pub struct SqliteSkillRepository {
    db: Arc<DbManager>,
}

impl SqliteSkillRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SkillRepository for SqliteSkillRepository {
    async fn get_by_key(&self, key: &str) -> Result<Option<SkillNode>> {
        let key = key.to_string();
        run_blocking(&self.db, move |conn| {
            conn.query_row(SKILL_BY_KEY_SQL, params![key], map_skill_row)
                .optional()
                .map_err(map_sql_error)
        })
        .await
    }

    async fn get_all(&self) -> Result<Vec<SkillNode>> {
        run_blocking(&self.db, move |conn| {
            let mut stmt = conn.prepare(SKILL_ALL_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map([], map_skill_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
    }

    async fn upsert_batch(&self, nodes: &[SkillNode]) -> Result<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        let nodes = nodes.to_vec();
        run_blocking(&self.db, move |conn| {
            let tx = conn.transaction().map_err(map_sql_error)?;
            upsert_nodes(&tx, &nodes)?;
            tx.commit().map_err(map_sql_error)
        })
        .await
    }
}

/// Write `nodes` on `conn`. Callers own the surrounding transaction.
pub(crate) fn upsert_nodes(conn: &Connection, nodes: &[SkillNode]) -> Result<()> {
    let mut stmt = conn.prepare_cached(SKILL_UPSERT_SQL).map_err(map_sql_error)?;
    let now = now_millis();
    for node in nodes {
        stmt.execute(params![
            node.key,
            node.name,
            node.category,
            node.parent_key,
            node.level,
            node.exp,
            node.exp_to_next,
            to_millis(node.last_active),
            now
        ])
        .map_err(map_sql_error)?;
    }
    Ok(())
}

const SKILL_BY_KEY_SQL: &str = "SELECT skill_key, name, category, parent_key, level, exp,
        exp_to_next, last_active
    FROM skill_nodes
    WHERE skill_key = ?1";

const SKILL_ALL_SQL: &str = "SELECT skill_key, name, category, parent_key, level, exp,
        exp_to_next, last_active
    FROM skill_nodes
    ORDER BY skill_key";

const SKILL_UPSERT_SQL: &str = "INSERT INTO skill_nodes (
        skill_key, name, category, parent_key, level, exp, exp_to_next, last_active, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    ON CONFLICT(skill_key) DO UPDATE SET
        name = excluded.name,
        category = excluded.category,
        parent_key = excluded.parent_key,
        level = excluded.level,
        exp = excluded.exp,
        exp_to_next = excluded.exp_to_next,
        last_active = excluded.last_active,
        updated_at = excluded.updated_at";

fn map_skill_row(row: &Row<'_>) -> rusqlite::Result<SkillNode> {
    Ok(SkillNode {
        key: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        parent_key: row.get(3)?,
        level: row.get(4)?,
        exp: row.get(5)?,
        exp_to_next: row.get(6)?,
        last_active: from_millis(row.get(7)?, 7)?,
    })
}
