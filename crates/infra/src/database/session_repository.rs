//! Versioned session store over SQLite.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};
use skilltrail_core::sessions::SessionRepository;
use skilltrail_domain::{
    NewSession, Result, Session, SessionMetadata, SessionSemanticUpdate, SkillTrailError,
};
use tracing::{debug, instrument};

use super::manager::DbManager;
use super::sql::{
    format_date, from_json, from_millis, map_sql_error, now_millis, parse_date, run_blocking,
    to_json, to_millis, usize_to_i64,
};

pub struct SqliteSessionRepository {
    db: Arc<DbManager>,
}

impl SqliteSessionRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    async fn query_sessions<P>(&self, sql: &'static str, params: P) -> Result<Vec<Session>>
    where
        P: rusqlite::Params + Send + 'static,
    {
        run_blocking(&self.db, move |conn| {
            let mut stmt = conn.prepare(sql).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params, map_session_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
    }

    async fn query_session<P>(&self, sql: &'static str, params: P) -> Result<Option<Session>>
    where
        P: rusqlite::Params + Send + 'static,
    {
        run_blocking(&self.db, move |conn| {
            conn.query_row(sql, params, map_session_row).optional().map_err(map_sql_error)
        })
        .await
    }
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    #[instrument(
        skip(self, session),
        fields(start = %session.start_time, version = session.session_version)
    )]
    async fn create_if_absent(&self, session: &NewSession) -> Result<(i64, bool)> {
        let session = session.clone();
        let metadata = to_json(&session.metadata)?;
        run_blocking(&self.db, move |conn| {
            let now = now_millis();
            let start = to_millis(session.start_time);
            let end = to_millis(session.end_time);
            let inserted = conn
                .execute(
                    SESSION_INSERT_SQL,
                    params![
                        format_date(session.date),
                        start,
                        end,
                        session.primary_app,
                        session.session_version,
                        session.time_range,
                        metadata,
                        now
                    ],
                )
                .map_err(map_sql_error)?;
            let id: i64 = conn
                .query_row(
                    SESSION_ID_BY_SLOT_SQL,
                    params![start, end, session.session_version],
                    |row| row.get(0),
                )
                .map_err(map_sql_error)?;
            debug!(id, created = inserted == 1, "session slot resolved");
            Ok((id, inserted == 1))
        })
        .await
    }

    async fn attach_evidence(
        &self,
        session_id: i64,
        diff_ids: &[i64],
        browser_event_ids: &[i64],
    ) -> Result<()> {
        if diff_ids.is_empty() && browser_event_ids.is_empty() {
            return Ok(());
        }
        let diff_ids = diff_ids.to_vec();
        let browser_ids = browser_event_ids.to_vec();
        run_blocking(&self.db, move |conn| {
            let tx = conn.transaction().map_err(map_sql_error)?;
            {
                let mut diff_stmt = tx.prepare(SESSION_DIFF_LINK_SQL).map_err(map_sql_error)?;
                for diff_id in &diff_ids {
                    diff_stmt.execute(params![session_id, diff_id]).map_err(map_sql_error)?;
                }
                let mut browser_stmt =
                    tx.prepare(SESSION_BROWSER_LINK_SQL).map_err(map_sql_error)?;
                for browser_id in &browser_ids {
                    browser_stmt.execute(params![session_id, browser_id]).map_err(map_sql_error)?;
                }
            }
            tx.commit().map_err(map_sql_error)
        })
        .await
    }

    async fn get_max_version(&self, date: NaiveDate) -> Result<i64> {
        let date = format_date(date);
        run_blocking(&self.db, move |conn| {
            conn.query_row(SESSION_MAX_VERSION_SQL, params![date], |row| row.get(0))
                .map_err(map_sql_error)
        })
        .await
    }

    #[instrument(skip(self, update))]
    async fn update_semantic_fields(&self, id: i64, update: &SessionSemanticUpdate) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }
        let skills = update.skills_involved.as_ref().map(to_json).transpose()?;
        let metadata = update.metadata.as_ref().map(to_json).transpose()?;
        let category = update.category.clone();
        let summary = update.summary.clone();
        run_blocking(&self.db, move |conn| {
            let changed = conn
                .execute(
                    SESSION_UPDATE_SEMANTIC_SQL,
                    params![id, category, summary, skills, metadata, now_millis()],
                )
                .map_err(map_sql_error)?;
            if changed == 0 {
                return Err(SkillTrailError::NotFound(format!("session {id}")));
            }
            Ok(())
        })
        .await
    }

    async fn get_by_date(&self, date: NaiveDate) -> Result<Vec<Session>> {
        self.query_sessions(SESSION_BY_DATE_SQL, (format_date(date),)).await
    }

    async fn get_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Session>> {
        if start >= end {
            return Ok(Vec::new());
        }
        self.query_sessions(SESSION_BY_RANGE_SQL, (to_millis(start), to_millis(end))).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Session>> {
        self.query_session(SESSION_BY_ID_SQL, (id,)).await
    }

    async fn get_last(&self) -> Result<Option<Session>> {
        self.query_session(SESSION_LAST_SQL, ()).await
    }

    async fn get_by_skill_key(&self, skill_key: &str, limit: usize) -> Result<Vec<Session>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.query_sessions(SESSION_BY_SKILL_SQL, (skill_key.to_string(), usize_to_i64(limit)))
            .await
    }
}

const SESSION_INSERT_SQL: &str = "INSERT OR IGNORE INTO sessions (
        date, start_time, end_time, primary_app, session_version, time_range, metadata,
        created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)";

const SESSION_ID_BY_SLOT_SQL: &str = "SELECT id FROM sessions
    WHERE start_time = ?1 AND end_time = ?2 AND session_version = ?3";

const SESSION_DIFF_LINK_SQL: &str =
    "INSERT OR IGNORE INTO session_diffs (session_id, diff_id) VALUES (?1, ?2)";

const SESSION_BROWSER_LINK_SQL: &str =
    "INSERT OR IGNORE INTO session_browser_events (session_id, browser_event_id) VALUES (?1, ?2)";

const SESSION_MAX_VERSION_SQL: &str =
    "SELECT COALESCE(MAX(session_version), 0) FROM sessions WHERE date = ?1";

// NULL parameters keep the stored column.
const SESSION_UPDATE_SEMANTIC_SQL: &str = "UPDATE sessions SET
        category = COALESCE(?2, category),
        summary = COALESCE(?3, summary),
        skills_involved = COALESCE(?4, skills_involved),
        metadata = COALESCE(?5, metadata),
        updated_at = ?6
    WHERE id = ?1";

const SESSION_BY_DATE_SQL: &str = "SELECT s.id, s.date, s.start_time, s.end_time, s.primary_app,
        s.session_version, s.time_range, s.category, s.summary, s.skills_involved, s.metadata
    FROM sessions s
    WHERE s.date = ?1
      AND s.session_version = (SELECT MAX(m.session_version) FROM sessions m WHERE m.date = s.date)
    ORDER BY s.start_time, s.id";

const SESSION_BY_RANGE_SQL: &str = "SELECT s.id, s.date, s.start_time, s.end_time, s.primary_app,
        s.session_version, s.time_range, s.category, s.summary, s.skills_involved, s.metadata
    FROM sessions s
    WHERE s.start_time >= ?1 AND s.start_time < ?2
      AND s.session_version = (SELECT MAX(m.session_version) FROM sessions m WHERE m.date = s.date)
    ORDER BY s.start_time, s.id";

const SESSION_BY_ID_SQL: &str = "SELECT id, date, start_time, end_time, primary_app,
        session_version, time_range, category, summary, skills_involved, metadata
    FROM sessions
    WHERE id = ?1";

const SESSION_LAST_SQL: &str = "SELECT s.id, s.date, s.start_time, s.end_time, s.primary_app,
        s.session_version, s.time_range, s.category, s.summary, s.skills_involved, s.metadata
    FROM sessions s
    WHERE s.session_version = (SELECT MAX(m.session_version) FROM sessions m WHERE m.date = s.date)
    ORDER BY s.end_time DESC, s.id DESC
    LIMIT 1";

const SESSION_BY_SKILL_SQL: &str = "SELECT s.id, s.date, s.start_time, s.end_time, s.primary_app,
        s.session_version, s.time_range, s.category, s.summary, s.skills_involved, s.metadata
    FROM sessions s
    WHERE EXISTS (
            SELECT 1 FROM json_each(s.metadata, '$.skill_keys') k WHERE k.value = ?1
        )
      AND s.session_version = (SELECT MAX(m.session_version) FROM sessions m WHERE m.date = s.date)
    ORDER BY s.start_time DESC, s.id DESC
    LIMIT ?2";

fn map_session_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    let date_raw: String = row.get(1)?;
    let skills_raw: String = row.get(9)?;
    let metadata_raw: String = row.get(10)?;
    Ok(Session {
        id: row.get(0)?,
        date: parse_date(&date_raw, 1)?,
        start_time: from_millis(row.get(2)?, 2)?,
        end_time: from_millis(row.get(3)?, 3)?,
        primary_app: row.get(4)?,
        session_version: row.get(5)?,
        time_range: row.get(6)?,
        category: row.get(7)?,
        summary: row.get(8)?,
        skills_involved: from_json(&skills_raw, 9)?,
        metadata: SessionMetadata::from_value(from_json(&metadata_raw, 10)?),
    })
}
