//! SQLite-backed evidence tables.
//!
//! Implements the three event-source ports over the tables collectors
//! write to. Range queries use half-open `[start, end)` predicates on the
//! millisecond timestamp columns so they stay on the timestamp indexes.
//! Id lookups bind the id list as one JSON array and expand it with
//! `json_each`, which keeps every statement static.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use skilltrail_core::tracking::{BrowserEventSource, DiffRepository, WindowEventSource};
use skilltrail_domain::{BrowserVisitEvidence, CodeChangeEvidence, RawWindowEvent, Result};
use tracing::debug;

use super::manager::DbManager;
use super::sql::{from_json, from_millis, map_sql_error, run_blocking, to_json, to_millis};

/// Evidence store shared by collectors (writes) and the engine (reads).
pub struct SqliteEventStore {
    db: Arc<DbManager>,
}

impl SqliteEventStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Append a window-focus sample and return its row id.
    pub async fn insert_window_event(&self, event: &RawWindowEvent) -> Result<i64> {
        let event = event.clone();
        run_blocking(&self.db, move |conn| {
            conn.execute(
                WINDOW_INSERT_SQL,
                params![
                    to_millis(event.timestamp),
                    event.duration_ms,
                    event.app_name,
                    event.title,
                    event.source
                ],
            )
            .map_err(map_sql_error)?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Append a diff and return its row id. The `id` field of `diff` is
    /// ignored.
    pub async fn insert_diff(&self, diff: &CodeChangeEvidence) -> Result<i64> {
        let diff = diff.clone();
        let skills = to_json(&diff.skills_detected)?;
        run_blocking(&self.db, move |conn| {
            conn.execute(
                DIFF_INSERT_SQL,
                params![
                    to_millis(diff.timestamp),
                    diff.file_path,
                    diff.file_name,
                    diff.language,
                    diff.lines_added,
                    diff.lines_deleted,
                    diff.diff_content,
                    diff.ai_insight,
                    skills
                ],
            )
            .map_err(map_sql_error)?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Append a browser visit and return its row id. The `id` field of
    /// `visit` is ignored.
    pub async fn insert_browser_event(&self, visit: &BrowserVisitEvidence) -> Result<i64> {
        let visit = visit.clone();
        run_blocking(&self.db, move |conn| {
            conn.execute(
                BROWSER_INSERT_SQL,
                params![to_millis(visit.timestamp), visit.domain, visit.title, visit.url],
            )
            .map_err(map_sql_error)?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }
}

#[async_trait]
impl WindowEventSource for SqliteEventStore {
    async fn get_window_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawWindowEvent>> {
        let (start, end) = (to_millis(start), to_millis(end));
        run_blocking(&self.db, move |conn| {
            let mut stmt = conn.prepare(WINDOW_RANGE_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![start, end], map_window_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            debug!(count = rows.len(), "loaded window events");
            Ok(rows)
        })
        .await
    }
}

#[async_trait]
impl DiffRepository for SqliteEventStore {
    async fn get_diffs(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CodeChangeEvidence>> {
        let (start, end) = (to_millis(start), to_millis(end));
        run_blocking(&self.db, move |conn| {
            let mut stmt = conn.prepare(DIFF_RANGE_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![start, end], map_diff_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
    }

    async fn get_diffs_by_ids(&self, ids: &[i64]) -> Result<Vec<CodeChangeEvidence>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = to_json(ids)?;
        run_blocking(&self.db, move |conn| {
            let mut stmt = conn.prepare(DIFF_BY_IDS_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![ids], map_diff_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
    }

    async fn record_diff_analysis(
        &self,
        diff_id: i64,
        insight: &str,
        skills: &[String],
    ) -> Result<bool> {
        let insight = insight.to_string();
        let skills = to_json(skills)?;
        run_blocking(&self.db, move |conn| {
            let changed = conn
                .execute(DIFF_RECORD_ANALYSIS_SQL, params![diff_id, insight, skills])
                .map_err(map_sql_error)?;
            Ok(changed == 1)
        })
        .await
    }
}

#[async_trait]
impl BrowserEventSource for SqliteEventStore {
    async fn get_browser_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BrowserVisitEvidence>> {
        let (start, end) = (to_millis(start), to_millis(end));
        run_blocking(&self.db, move |conn| {
            let mut stmt = conn.prepare(BROWSER_RANGE_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![start, end], map_browser_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
    }

    async fn get_browser_events_by_ids(&self, ids: &[i64]) -> Result<Vec<BrowserVisitEvidence>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = to_json(ids)?;
        run_blocking(&self.db, move |conn| {
            let mut stmt = conn.prepare(BROWSER_BY_IDS_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![ids], map_browser_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
    }
}

const WINDOW_INSERT_SQL: &str = "INSERT INTO window_events
    (timestamp, duration_ms, app_name, title, source)
    VALUES (?1, ?2, ?3, ?4, ?5)";

const WINDOW_RANGE_SQL: &str = "SELECT timestamp, duration_ms, app_name, title, source
    FROM window_events
    WHERE timestamp >= ?1 AND timestamp < ?2
    ORDER BY timestamp, id";

const DIFF_INSERT_SQL: &str = "INSERT INTO code_diffs (
        timestamp, file_path, file_name, language, lines_added, lines_deleted, diff_content,
        ai_insight, skills_detected
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

const DIFF_RANGE_SQL: &str = "SELECT id, timestamp, file_path, file_name, language, lines_added,
        lines_deleted, diff_content, ai_insight, skills_detected
    FROM code_diffs
    WHERE timestamp >= ?1 AND timestamp < ?2
    ORDER BY timestamp, id";

const DIFF_BY_IDS_SQL: &str = "SELECT id, timestamp, file_path, file_name, language, lines_added,
        lines_deleted, diff_content, ai_insight, skills_detected
    FROM code_diffs
    WHERE id IN (SELECT value FROM json_each(?1))
    ORDER BY timestamp, id";

const DIFF_RECORD_ANALYSIS_SQL: &str = "UPDATE code_diffs
    SET ai_insight = ?2, skills_detected = ?3
    WHERE id = ?1 AND ai_insight IS NULL AND skills_detected = '[]'";

const BROWSER_INSERT_SQL: &str = "INSERT INTO browser_events (timestamp, domain, title, url)
    VALUES (?1, ?2, ?3, ?4)";

const BROWSER_RANGE_SQL: &str = "SELECT id, timestamp, domain, title, url
    FROM browser_events
    WHERE timestamp >= ?1 AND timestamp < ?2
    ORDER BY timestamp, id";

const BROWSER_BY_IDS_SQL: &str = "SELECT id, timestamp, domain, title, url
    FROM browser_events
    WHERE id IN (SELECT value FROM json_each(?1))
    ORDER BY timestamp, id";

fn map_window_row(row: &Row<'_>) -> rusqlite::Result<RawWindowEvent> {
    Ok(RawWindowEvent {
        timestamp: from_millis(row.get(0)?, 0)?,
        duration_ms: row.get(1)?,
        app_name: row.get(2)?,
        title: row.get(3)?,
        source: row.get(4)?,
    })
}

fn map_diff_row(row: &Row<'_>) -> rusqlite::Result<CodeChangeEvidence> {
    let skills_raw: String = row.get(9)?;
    Ok(CodeChangeEvidence {
        id: row.get(0)?,
        timestamp: from_millis(row.get(1)?, 1)?,
        file_path: row.get(2)?,
        file_name: row.get(3)?,
        language: row.get(4)?,
        lines_added: row.get(5)?,
        lines_deleted: row.get(6)?,
        diff_content: row.get(7)?,
        ai_insight: row.get(8)?,
        skills_detected: from_json(&skills_raw, 9)?,
    })
}

fn map_browser_row(row: &Row<'_>) -> rusqlite::Result<BrowserVisitEvidence> {
    Ok(BrowserVisitEvidence {
        id: row.get(0)?,
        timestamp: from_millis(row.get(1)?, 1)?,
        domain: row.get(2)?,
        title: row.get(3)?,
        url: row.get(4)?,
    })
}
