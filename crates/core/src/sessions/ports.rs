//! Session store port

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use skilltrail_domain::{NewSession, Result, Session, SessionSemanticUpdate};

/// Persistent session store.
///
/// Every read returns only rows at the maximum `session_version` of their
/// date; older versions stay in storage for audit.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert unless a row with the same `(start_time, end_time,
    /// session_version)` exists. Returns the row id and whether it was
    /// created by this call.
    async fn create_if_absent(&self, session: &NewSession) -> Result<(i64, bool)>;

    /// Record the session/evidence link rows for a freshly created session.
    async fn attach_evidence(
        &self,
        session_id: i64,
        diff_ids: &[i64],
        browser_event_ids: &[i64],
    ) -> Result<()>;

    /// Highest version stored for `date`, or 0 when the date has no rows.
    async fn get_max_version(&self, date: NaiveDate) -> Result<i64>;

    /// Write back only the fields present in `update`.
    async fn update_semantic_fields(&self, id: i64, update: &SessionSemanticUpdate)
        -> Result<()>;

    /// Current sessions of `date`, ascending by start time.
    async fn get_by_date(&self, date: NaiveDate) -> Result<Vec<Session>>;

    /// Current sessions starting in `[start, end)`, ascending by start time.
    async fn get_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Session>>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Session>>;

    /// Current session with the latest end time.
    async fn get_last(&self) -> Result<Option<Session>>;

    /// Current sessions whose `skill_keys` index contains `skill_key`,
    /// newest first.
    async fn get_by_skill_key(&self, skill_key: &str, limit: usize) -> Result<Vec<Session>>;
}
