//! In-memory evidence sources.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use skilltrail_core::tracking::{BrowserEventSource, DiffRepository, WindowEventSource};
use skilltrail_domain::{
    BrowserVisitEvidence, CodeChangeEvidence, RawWindowEvent, Result as DomainResult,
    SkillTrailError,
};

#[derive(Default)]
struct EventData {
    windows: Vec<RawWindowEvent>,
    diffs: Vec<CodeChangeEvidence>,
    browser: Vec<BrowserVisitEvidence>,
}

/// Implements all three evidence ports over shared vectors.
#[derive(Default, Clone)]
pub struct InMemoryEventSource {
    data: Arc<Mutex<EventData>>,
    diff_id_reads: Arc<AtomicUsize>,
}

impl InMemoryEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_windows(self, windows: Vec<RawWindowEvent>) -> Self {
        self.data.lock().windows.extend(windows);
        self
    }

    pub fn with_diffs(self, diffs: Vec<CodeChangeEvidence>) -> Self {
        self.data.lock().diffs.extend(diffs);
        self
    }

    pub fn with_browser(self, visits: Vec<BrowserVisitEvidence>) -> Self {
        self.data.lock().browser.extend(visits);
        self
    }

    pub fn push_window(&self, event: RawWindowEvent) {
        self.data.lock().windows.push(event);
    }

    pub fn diff(&self, id: i64) -> Option<CodeChangeEvidence> {
        self.data.lock().diffs.iter().find(|d| d.id == id).cloned()
    }

    /// Number of `get_diffs_by_ids` calls served.
    pub fn diff_id_reads(&self) -> usize {
        self.diff_id_reads.load(Ordering::SeqCst)
    }
}

fn in_range(ts: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    ts >= start && ts < end
}

#[async_trait]
impl WindowEventSource for InMemoryEventSource {
    async fn get_window_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<RawWindowEvent>> {
        let mut events: Vec<_> = self
            .data
            .lock()
            .windows
            .iter()
            .filter(|e| in_range(e.timestamp, start, end))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }
}

#[async_trait]
impl DiffRepository for InMemoryEventSource {
    async fn get_diffs(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<CodeChangeEvidence>> {
        let mut diffs: Vec<_> = self
            .data
            .lock()
            .diffs
            .iter()
            .filter(|d| in_range(d.timestamp, start, end))
            .cloned()
            .collect();
        diffs.sort_by_key(|d| (d.timestamp, d.id));
        Ok(diffs)
    }

    async fn get_diffs_by_ids(&self, ids: &[i64]) -> DomainResult<Vec<CodeChangeEvidence>> {
        self.diff_id_reads.fetch_add(1, Ordering::SeqCst);
        let mut diffs: Vec<_> =
            self.data.lock().diffs.iter().filter(|d| ids.contains(&d.id)).cloned().collect();
        diffs.sort_by_key(|d| (d.timestamp, d.id));
        Ok(diffs)
    }

    async fn record_diff_analysis(
        &self,
        diff_id: i64,
        insight: &str,
        skills: &[String],
    ) -> DomainResult<bool> {
        let mut data = self.data.lock();
        match data.diffs.iter_mut().find(|d| d.id == diff_id) {
            Some(diff) if !diff.is_analyzed() => {
                diff.ai_insight = Some(insight.to_string());
                diff.skills_detected = skills.to_vec();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl BrowserEventSource for InMemoryEventSource {
    async fn get_browser_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<BrowserVisitEvidence>> {
        let mut visits: Vec<_> = self
            .data
            .lock()
            .browser
            .iter()
            .filter(|v| in_range(v.timestamp, start, end))
            .cloned()
            .collect();
        visits.sort_by_key(|v| (v.timestamp, v.id));
        Ok(visits)
    }

    async fn get_browser_events_by_ids(
        &self,
        ids: &[i64],
    ) -> DomainResult<Vec<BrowserVisitEvidence>> {
        let mut visits: Vec<_> =
            self.data.lock().browser.iter().filter(|v| ids.contains(&v.id)).cloned().collect();
        visits.sort_by_key(|v| (v.timestamp, v.id));
        Ok(visits)
    }
}

/// Evidence source whose every read fails.
#[derive(Default, Clone)]
pub struct FailingEventSource;

fn unavailable<T>() -> DomainResult<T> {
    Err(SkillTrailError::Database("evidence store unavailable".to_string()))
}

#[async_trait]
impl WindowEventSource for FailingEventSource {
    async fn get_window_events(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> DomainResult<Vec<RawWindowEvent>> {
        unavailable()
    }
}

#[async_trait]
impl DiffRepository for FailingEventSource {
    async fn get_diffs(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> DomainResult<Vec<CodeChangeEvidence>> {
        unavailable()
    }

    async fn get_diffs_by_ids(&self, _ids: &[i64]) -> DomainResult<Vec<CodeChangeEvidence>> {
        unavailable()
    }

    async fn record_diff_analysis(
        &self,
        _diff_id: i64,
        _insight: &str,
        _skills: &[String],
    ) -> DomainResult<bool> {
        unavailable()
    }
}

#[async_trait]
impl BrowserEventSource for FailingEventSource {
    async fn get_browser_events(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> DomainResult<Vec<BrowserVisitEvidence>> {
        unavailable()
    }

    async fn get_browser_events_by_ids(
        &self,
        _ids: &[i64],
    ) -> DomainResult<Vec<BrowserVisitEvidence>> {
        unavailable()
    }
}
