//! Column codecs and error mapping shared by the SQLite repositories.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use serde::de::DeserializeOwned;
use serde::Serialize;
use skilltrail_domain::{Result, SkillTrailError};
use tokio::task::{self, JoinError};

use super::manager::{DbManager, SqliteConnection};
use crate::errors::InfraError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Run `op` on a pooled connection inside the blocking thread pool.
pub(crate) async fn run_blocking<T, F>(db: &Arc<DbManager>, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
{
    let db = Arc::clone(db);
    task::spawn_blocking(move || {
        let mut conn = db.get_connection()?;
        op(&mut conn)
    })
    .await
    .map_err(map_join_error)?
}

pub(crate) fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, ms))
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn parse_date(raw: &str, column: usize) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err)))
}

/// Decode a JSON text column.
pub(crate) fn from_json<T: DeserializeOwned>(raw: &str, column: usize) -> rusqlite::Result<T> {
    serde_json::from_str(raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err)))
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|err| SkillTrailError::from(InfraError::from(err)))
}

pub(crate) fn map_sql_error(err: rusqlite::Error) -> SkillTrailError {
    SkillTrailError::from(InfraError::from(err))
}

pub(crate) fn map_join_error(err: JoinError) -> SkillTrailError {
    if err.is_cancelled() {
        SkillTrailError::Internal("database task cancelled".into())
    } else {
        SkillTrailError::Internal(format!("database task panic: {err}"))
    }
}

pub(crate) fn usize_to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
