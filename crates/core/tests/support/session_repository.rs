//! In-memory session store with version-aware reads.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use skilltrail_core::sessions::SessionRepository;
use skilltrail_domain::{
    NewSession, Result as DomainResult, Session, SessionSemanticUpdate, SkillTrailError,
};

#[derive(Default)]
struct SessionData {
    rows: Vec<Session>,
    diff_links: Vec<(i64, i64)>,
    browser_links: Vec<(i64, i64)>,
    next_id: i64,
}

impl SessionData {
    fn current_versions(&self) -> HashMap<NaiveDate, i64> {
        let mut versions = HashMap::new();
        for row in &self.rows {
            let entry = versions.entry(row.date).or_insert(row.session_version);
            *entry = (*entry).max(row.session_version);
        }
        versions
    }

    fn current(&self) -> Vec<Session> {
        let versions = self.current_versions();
        let mut rows: Vec<Session> = self
            .rows
            .iter()
            .filter(|row| versions.get(&row.date) == Some(&row.session_version))
            .cloned()
            .collect();
        rows.sort_by_key(|row| (row.start_time, row.id));
        rows
    }
}

#[derive(Default, Clone)]
pub struct InMemorySessionRepository {
    data: Arc<Mutex<SessionData>>,
    fail_creates: Arc<AtomicBool>,
    fail_updates: Arc<AtomicBool>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Every stored row, all versions.
    pub fn all_rows(&self) -> Vec<Session> {
        self.data.lock().rows.clone()
    }

    pub fn diff_link_count(&self) -> usize {
        self.data.lock().diff_links.len()
    }

    pub fn browser_link_count(&self) -> usize {
        self.data.lock().browser_links.len()
    }

    /// Insert a fully formed session directly, bypassing the build service.
    pub fn seed(&self, mut session: Session) -> i64 {
        let mut data = self.data.lock();
        data.next_id += 1;
        session.id = data.next_id;
        data.rows.push(session);
        data.next_id
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn create_if_absent(&self, session: &NewSession) -> DomainResult<(i64, bool)> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(SkillTrailError::Database("session insert failed".to_string()));
        }

        let mut data = self.data.lock();
        if let Some(existing) = data.rows.iter().find(|row| {
            row.start_time == session.start_time
                && row.end_time == session.end_time
                && row.session_version == session.session_version
        }) {
            return Ok((existing.id, false));
        }

        data.next_id += 1;
        let id = data.next_id;
        data.rows.push(Session {
            id,
            date: session.date,
            start_time: session.start_time,
            end_time: session.end_time,
            primary_app: session.primary_app.clone(),
            session_version: session.session_version,
            time_range: session.time_range.clone(),
            category: String::new(),
            summary: String::new(),
            skills_involved: Vec::new(),
            metadata: session.metadata.clone(),
        });
        Ok((id, true))
    }

    async fn attach_evidence(
        &self,
        session_id: i64,
        diff_ids: &[i64],
        browser_event_ids: &[i64],
    ) -> DomainResult<()> {
        let mut data = self.data.lock();
        for diff_id in diff_ids {
            if !data.diff_links.contains(&(session_id, *diff_id)) {
                data.diff_links.push((session_id, *diff_id));
            }
        }
        for visit_id in browser_event_ids {
            if !data.browser_links.contains(&(session_id, *visit_id)) {
                data.browser_links.push((session_id, *visit_id));
            }
        }
        Ok(())
    }

    async fn get_max_version(&self, date: NaiveDate) -> DomainResult<i64> {
        Ok(self.data.lock().current_versions().get(&date).copied().unwrap_or(0))
    }

    async fn update_semantic_fields(
        &self,
        id: i64,
        update: &SessionSemanticUpdate,
    ) -> DomainResult<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(SkillTrailError::Database("session update failed".to_string()));
        }
        let mut data = self.data.lock();
        let row = data
            .rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or_else(|| SkillTrailError::NotFound(format!("session {id}")))?;
        update.apply_to(row);
        Ok(())
    }

    async fn get_by_date(&self, date: NaiveDate) -> DomainResult<Vec<Session>> {
        Ok(self.data.lock().current().into_iter().filter(|row| row.date == date).collect())
    }

    async fn get_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<Session>> {
        Ok(self
            .data
            .lock()
            .current()
            .into_iter()
            .filter(|row| row.start_time >= start && row.start_time < end)
            .collect())
    }

    async fn get_by_id(&self, id: i64) -> DomainResult<Option<Session>> {
        Ok(self.data.lock().rows.iter().find(|row| row.id == id).cloned())
    }

    async fn get_last(&self) -> DomainResult<Option<Session>> {
        Ok(self.data.lock().current().into_iter().max_by_key(|row| (row.end_time, row.id)))
    }

    async fn get_by_skill_key(&self, skill_key: &str, limit: usize) -> DomainResult<Vec<Session>> {
        let mut rows: Vec<Session> = self
            .data
            .lock()
            .current()
            .into_iter()
            .filter(|row| row.metadata.skill_keys().iter().any(|key| key == skill_key))
            .collect();
        rows.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        rows.truncate(limit);
        Ok(rows)
    }
}
