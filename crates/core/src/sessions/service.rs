//! Session build service - segmentation plus idempotent, versioned persistence

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use ahash::AHashSet as HashSet;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use skilltrail_domain::{Result, SegmentationConfig, Session};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::locks::DateLocks;
use super::ports::SessionRepository;
use super::segmenter::{SessionCandidate, SessionSegmenter};
use crate::tracking::{BrowserEventSource, DiffRepository, WindowEventSource};
use crate::utils::time::local_day_bounds;

/// Counters reported by one build run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Candidates produced by the segmenter.
    pub candidates: usize,
    /// Rows inserted by this run.
    pub created: usize,
    /// Candidates that matched an existing row at the same version.
    pub reused: usize,
    /// Candidates whose write failed.
    pub failed: usize,
    /// True when the run stopped early on its cancellation token.
    pub cancelled: bool,
}

impl BuildOutcome {
    pub fn written(&self) -> usize {
        self.created + self.reused
    }
}

/// Result of an explicit per-date rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildOutcome {
    pub date: Option<NaiveDate>,
    /// Version that reads of the date now resolve to.
    pub version: i64,
    /// False when there was nothing to write and the version stayed put.
    pub bumped: bool,
    pub build: BuildOutcome,
}

/// Hours of extra evidence read on each side of the day by
/// [`SessionBuildService::rebuild_for_date`]. Sessions longer than this are
/// truncated at its edge.
pub const REBUILD_MARGIN_HOURS: i64 = 24;

/// Evidence ids already owned by a stored session.
///
/// An incremental run starts at the previous session's `end_time`, which is
/// often the timestamp of its last diff or visit; those rows are read again
/// and must not be attributed twice.
#[derive(Debug, Default)]
struct LinkedEvidence {
    diff_ids: HashSet<i64>,
    browser_event_ids: HashSet<i64>,
}

impl LinkedEvidence {
    fn of(session: &Session) -> Self {
        Self {
            diff_ids: session.metadata.diff_ids().into_iter().collect(),
            browser_event_ids: session.metadata.browser_event_ids().into_iter().collect(),
        }
    }
}

/// Turns raw evidence into persisted sessions.
pub struct SessionBuildService {
    windows: Arc<dyn WindowEventSource>,
    diffs: Arc<dyn DiffRepository>,
    browser: Arc<dyn BrowserEventSource>,
    sessions: Arc<dyn SessionRepository>,
    segmenter: SessionSegmenter,
    config: SegmentationConfig,
    locks: Arc<DateLocks>,
}

impl SessionBuildService {
    pub fn new(
        windows: Arc<dyn WindowEventSource>,
        diffs: Arc<dyn DiffRepository>,
        browser: Arc<dyn BrowserEventSource>,
        sessions: Arc<dyn SessionRepository>,
        config: SegmentationConfig,
    ) -> Self {
        Self {
            windows,
            diffs,
            browser,
            sessions,
            segmenter: SessionSegmenter::new(&config),
            config,
            locks: Arc::new(DateLocks::new()),
        }
    }

    /// Share a lock table with other writers of the same session store.
    pub fn with_locks(mut self, locks: Arc<DateLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn locks(&self) -> Arc<DateLocks> {
        Arc::clone(&self.locks)
    }

    fn offset(&self) -> FixedOffset {
        self.config.offset()
    }

    /// Segment `[start, end)` and persist the candidates at each touched
    /// date's current version (1 for a date without sessions).
    ///
    /// An empty or inverted window is a no-op. Evidence read failures abort
    /// the run before anything is written.
    #[instrument(skip(self, cancel))]
    pub async fn build_sessions_for_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<BuildOutcome> {
        self.build_window(start, end, &LinkedEvidence::default(), cancel).await
    }

    /// Build from the end of the latest stored session (or the cold-start
    /// lookback) up to `now`. Evidence already linked to that session is
    /// left out of the new window.
    pub async fn build_incremental(
        &self,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<BuildOutcome> {
        match self.sessions.get_last().await? {
            Some(last) => {
                let linked = LinkedEvidence::of(&last);
                self.build_window(last.end_time, now, &linked, cancel).await
            }
            None => {
                let start = now - self.config.cold_start_lookback();
                self.build_window(start, now, &LinkedEvidence::default(), cancel).await
            }
        }
    }

    async fn build_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        linked: &LinkedEvidence,
        cancel: &CancellationToken,
    ) -> Result<BuildOutcome> {
        if start >= end {
            debug!("empty build window; nothing to do");
            return Ok(BuildOutcome::default());
        }

        let candidates = self.segment_window(start, end, linked).await?;
        let mut outcome = BuildOutcome { candidates: candidates.len(), ..BuildOutcome::default() };
        if candidates.is_empty() {
            return Ok(outcome);
        }

        let offset = self.offset();
        let dates: BTreeSet<NaiveDate> = candidates.iter().map(|c| c.date(offset)).collect();
        let _guards = self.locks.lock_all(&dates).await;

        let mut versions = BTreeMap::new();
        for date in &dates {
            let current = self.sessions.get_max_version(*date).await?;
            versions.insert(*date, current.max(1));
        }

        for candidate in &candidates {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }
            let version = versions.get(&candidate.date(offset)).copied().unwrap_or(1);
            self.persist_candidate(candidate, version, &mut outcome).await;
        }

        info!(
            candidates = outcome.candidates,
            created = outcome.created,
            reused = outcome.reused,
            failed = outcome.failed,
            cancelled = outcome.cancelled,
            "session build finished"
        );
        Ok(outcome)
    }

    /// Recompute every session of `date` under version `max + 1`.
    ///
    /// Sessions belong to the date they start on. Evidence is read with a
    /// margin of [`REBUILD_MARGIN_HOURS`] on both sides of the local day, so a
    /// session crossing midnight keeps its full extent and the tail of one
    /// that started the day before is not rebuilt as a new session.
    ///
    /// Older rows stay stored; reads switch to the new version as soon as
    /// its first row lands. Cancellation is honoured only before the first
    /// write. A date whose evidence yields no sessions keeps its version.
    #[instrument(skip(self, cancel))]
    pub async fn rebuild_for_date(
        &self,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<RebuildOutcome> {
        let _guard = self.locks.lock(date).await;

        let offset = self.offset();
        let (day_start, day_end) = local_day_bounds(date, offset);
        let margin = Duration::hours(REBUILD_MARGIN_HOURS);
        let candidates: Vec<SessionCandidate> = self
            .segment_window(
                day_start - margin,
                day_end + margin,
                &LinkedEvidence::default(),
            )
            .await?
            .into_iter()
            .filter(|candidate| candidate.date(offset) == date)
            .collect();

        let current = self.sessions.get_max_version(date).await?;
        let mut outcome = RebuildOutcome {
            date: Some(date),
            version: current,
            bumped: false,
            build: BuildOutcome { candidates: candidates.len(), ..BuildOutcome::default() },
        };

        if cancel.is_cancelled() {
            outcome.build.cancelled = true;
            return Ok(outcome);
        }
        if candidates.is_empty() {
            info!(version = current, "rebuild found no sessions; version unchanged");
            return Ok(outcome);
        }

        let version = current + 1;
        for candidate in &candidates {
            self.persist_candidate(candidate, version, &mut outcome.build).await;
        }
        outcome.version = version;
        outcome.bumped = true;

        info!(
            version,
            created = outcome.build.created,
            failed = outcome.build.failed,
            "date rebuilt"
        );
        Ok(outcome)
    }

    async fn segment_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        linked: &LinkedEvidence,
    ) -> Result<Vec<SessionCandidate>> {
        let windows = self.windows.get_window_events(start, end).await?;
        let mut diffs = self.diffs.get_diffs(start, end).await?;
        diffs.retain(|diff| !linked.diff_ids.contains(&diff.id));
        let mut browser = self.browser.get_browser_events(start, end).await?;
        browser.retain(|visit| !linked.browser_event_ids.contains(&visit.id));

        debug!(
            windows = windows.len(),
            diffs = diffs.len(),
            browser = browser.len(),
            "segmenting evidence window"
        );
        Ok(self.segmenter.build(&windows, &diffs, &browser))
    }

    async fn persist_candidate(
        &self,
        candidate: &SessionCandidate,
        version: i64,
        outcome: &mut BuildOutcome,
    ) {
        let new_session = candidate.to_new_session(version, self.offset());

        let (session_id, created) = match self.sessions.create_if_absent(&new_session).await {
            Ok(result) => result,
            Err(err) => {
                warn!(
                    error = %err,
                    start = %candidate.start_time,
                    version,
                    "failed to persist session candidate"
                );
                outcome.failed += 1;
                return;
            }
        };

        if !created {
            outcome.reused += 1;
            return;
        }
        outcome.created += 1;

        if let Err(err) = self
            .sessions
            .attach_evidence(session_id, &candidate.diff_ids, &candidate.browser_event_ids)
            .await
        {
            warn!(error = %err, session_id, "failed to link session evidence");
        }
    }
}
