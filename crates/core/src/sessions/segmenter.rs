//! Session segmenter - turns an ordered event stream into session candidates
//!
//! # Algorithm
//! 1. Walk window events in timestamp order. Before each window event, drain
//!    the diffs that precede it.
//! 2. A window event or diff whose timestamp is at least `idle_gap` after
//!    the current session's `last_activity_end` closes that session and
//!    opens a new one anchored at its own timestamp.
//! 3. Diffs left after the last window event go through the same rule.
//! 4. Closed sessions without positive window dwell time are dropped, so a
//!    diff arriving during a real idle period never creates a session.
//! 5. Browser visits are attached afterwards in one forward sweep; they
//!    never move a boundary.
//!
//! The pass is a pure function of its inputs: identical inputs always give
//! identical candidates, which the idempotent persistence layer relies on.

use ahash::AHashMap as HashMap;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use skilltrail_domain::{
    AppUsage, BrowserVisitEvidence, CodeChangeEvidence, NewSession, RawWindowEvent,
    SegmentationConfig, SessionMetadata,
};

use crate::utils::time::{format_time_range, local_date};

/// A session boundary computed from raw events, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCandidate {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub primary_app: String,
    /// Summed dwell per application, longest first.
    pub app_usage: Vec<AppUsage>,
    pub diff_ids: Vec<i64>,
    pub browser_event_ids: Vec<i64>,
}

impl SessionCandidate {
    pub fn date(&self, offset: FixedOffset) -> NaiveDate {
        local_date(self.start_time, offset)
    }

    pub fn time_range(&self, offset: FixedOffset) -> String {
        format_time_range(self.start_time, self.end_time, offset)
    }

    /// Insert payload at the given version.
    pub fn to_new_session(&self, session_version: i64, offset: FixedOffset) -> NewSession {
        let mut metadata = SessionMetadata::new();
        metadata.set_diff_ids(&self.diff_ids);
        metadata.set_browser_event_ids(&self.browser_event_ids);

        NewSession {
            date: self.date(offset),
            start_time: self.start_time,
            end_time: self.end_time,
            primary_app: self.primary_app.clone(),
            session_version,
            time_range: self.time_range(offset),
            metadata,
        }
    }
}

/// Running state of the session currently being built.
struct SessionAccumulator {
    start: DateTime<Utc>,
    last_activity_end: DateTime<Utc>,
    app_dwell_ms: HashMap<String, i64>,
    diff_ids: Vec<i64>,
}

impl SessionAccumulator {
    fn open(at: DateTime<Utc>) -> Self {
        Self {
            start: at,
            last_activity_end: at,
            app_dwell_ms: HashMap::new(),
            diff_ids: Vec::new(),
        }
    }

    fn absorb_window(&mut self, event: &RawWindowEvent) {
        let dwell = event.duration_ms.max(0);
        if dwell > 0 {
            *self.app_dwell_ms.entry(event.app_name.clone()).or_insert(0) += dwell;
        }
        self.last_activity_end = self.last_activity_end.max(event.end_time());
    }

    fn absorb_diff(&mut self, diff: &CodeChangeEvidence) {
        if !self.diff_ids.contains(&diff.id) {
            self.diff_ids.push(diff.id);
        }
        self.last_activity_end = self.last_activity_end.max(diff.timestamp);
    }

    /// Close the session. Returns `None` when no window dwell was observed.
    fn finish(self) -> Option<SessionCandidate> {
        let mut app_usage: Vec<AppUsage> = self
            .app_dwell_ms
            .into_iter()
            .map(|(app_name, duration_ms)| AppUsage { app_name, duration_ms })
            .collect();
        // Longest dwell first; name breaks ties so output is deterministic.
        app_usage.sort_by(|a, b| {
            b.duration_ms.cmp(&a.duration_ms).then_with(|| a.app_name.cmp(&b.app_name))
        });

        let primary_app = app_usage.first()?.app_name.clone();

        Some(SessionCandidate {
            start_time: self.start,
            end_time: self.last_activity_end,
            primary_app,
            app_usage,
            diff_ids: self.diff_ids,
            browser_event_ids: Vec::new(),
        })
    }
}

/// Idle-gap session segmenter.
#[derive(Debug, Clone)]
pub struct SessionSegmenter {
    idle_gap: Duration,
}

impl SessionSegmenter {
    pub fn new(config: &SegmentationConfig) -> Self {
        Self::with_idle_gap(config.idle_gap())
    }

    pub fn with_idle_gap(idle_gap: Duration) -> Self {
        Self { idle_gap }
    }

    pub fn idle_gap(&self) -> Duration {
        self.idle_gap
    }

    /// Segment and attach browser evidence in one call.
    pub fn build(
        &self,
        window_events: &[RawWindowEvent],
        diffs: &[CodeChangeEvidence],
        browser_events: &[BrowserVisitEvidence],
    ) -> Vec<SessionCandidate> {
        let mut candidates = self.segment(window_events, diffs);
        attach_browser_events(&mut candidates, browser_events);
        candidates
    }

    /// Compute session boundaries from window events and diffs.
    pub fn segment(
        &self,
        window_events: &[RawWindowEvent],
        diffs: &[CodeChangeEvidence],
    ) -> Vec<SessionCandidate> {
        let mut windows: Vec<&RawWindowEvent> = window_events.iter().collect();
        windows.sort_by_key(|event| event.timestamp);
        let mut ordered_diffs: Vec<&CodeChangeEvidence> = diffs.iter().collect();
        ordered_diffs.sort_by_key(|diff| (diff.timestamp, diff.id));

        let mut closed = Vec::new();
        let mut current: Option<SessionAccumulator> = None;
        let mut pending_diffs = ordered_diffs.into_iter().peekable();

        for event in windows {
            while let Some(diff) = pending_diffs.next_if(|diff| diff.timestamp < event.timestamp) {
                self.absorb_diff(&mut current, &mut closed, diff);
            }

            match current.as_mut() {
                Some(acc) if !self.is_idle(acc, event.timestamp) => acc.absorb_window(event),
                _ => {
                    closed.extend(current.take());
                    let mut acc = SessionAccumulator::open(event.timestamp);
                    acc.absorb_window(event);
                    current = Some(acc);
                }
            }
        }

        for diff in pending_diffs {
            self.absorb_diff(&mut current, &mut closed, diff);
        }
        closed.extend(current.take());

        closed.into_iter().filter_map(SessionAccumulator::finish).collect()
    }

    fn absorb_diff(
        &self,
        current: &mut Option<SessionAccumulator>,
        closed: &mut Vec<SessionAccumulator>,
        diff: &CodeChangeEvidence,
    ) {
        match current.as_mut() {
            Some(acc) if !self.is_idle(acc, diff.timestamp) => acc.absorb_diff(diff),
            _ => {
                closed.extend(current.take());
                let mut acc = SessionAccumulator::open(diff.timestamp);
                acc.absorb_diff(diff);
                *current = Some(acc);
            }
        }
    }

    fn is_idle(&self, acc: &SessionAccumulator, timestamp: DateTime<Utc>) -> bool {
        timestamp - acc.last_activity_end >= self.idle_gap
    }
}

/// Attach each browser visit to the candidate whose `[start, end]` contains
/// it. Candidates must be sorted by start time and non-overlapping, which
/// [`SessionSegmenter::segment`] guarantees.
pub fn attach_browser_events(
    candidates: &mut [SessionCandidate],
    browser_events: &[BrowserVisitEvidence],
) {
    let mut visits: Vec<&BrowserVisitEvidence> = browser_events.iter().collect();
    visits.sort_by_key(|visit| (visit.timestamp, visit.id));

    let mut idx = 0;
    for visit in visits {
        while idx < candidates.len() && candidates[idx].end_time < visit.timestamp {
            idx += 1;
        }
        let Some(candidate) = candidates.get_mut(idx) else {
            break;
        };
        if candidate.start_time <= visit.timestamp
            && !candidate.browser_event_ids.contains(&visit.id)
        {
            candidate.browser_event_ids.push(visit.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, min, sec).unwrap()
    }

    fn window(app: &str, start: DateTime<Utc>, duration: Duration) -> RawWindowEvent {
        RawWindowEvent {
            timestamp: start,
            duration_ms: duration.num_milliseconds(),
            app_name: app.into(),
            title: format!("{app} window"),
            source: "test".into(),
        }
    }

    fn diff(id: i64, timestamp: DateTime<Utc>) -> CodeChangeEvidence {
        CodeChangeEvidence {
            id,
            timestamp,
            file_path: format!("src/file_{id}.rs"),
            file_name: format!("file_{id}.rs"),
            language: "rust".into(),
            lines_added: 10,
            lines_deleted: 2,
            diff_content: String::new(),
            ai_insight: None,
            skills_detected: vec![],
        }
    }

    fn visit(id: i64, timestamp: DateTime<Utc>) -> BrowserVisitEvidence {
        BrowserVisitEvidence {
            id,
            timestamp,
            domain: "docs.rs".into(),
            title: "tokio - Rust".into(),
            url: "https://docs.rs/tokio".into(),
        }
    }

    fn segmenter() -> SessionSegmenter {
        SessionSegmenter::with_idle_gap(Duration::minutes(6))
    }

    #[test]
    fn test_end_to_end_single_session_with_diff() {
        // 09:00-09:15, 09:15-09:28, gap of 2 minutes, 09:30-09:40
        let windows = vec![
            window("code.exe", at(9, 0, 0), Duration::minutes(15)),
            window("code.exe", at(9, 15, 0), Duration::minutes(13)),
            window("code.exe", at(9, 30, 0), Duration::minutes(10)),
        ];
        let diffs = vec![diff(42, at(9, 15, 0))];

        let sessions = segmenter().segment(&windows, &diffs);

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].start_time, at(9, 0, 0));
        assert_eq!(sessions[0].end_time, at(9, 40, 0));
        assert_eq!(sessions[0].primary_app, "code.exe");
        assert_eq!(sessions[0].diff_ids, vec![42]);
    }

    #[test]
    fn test_boundary_gap_equal_to_threshold_splits() {
        let windows = vec![
            window("code.exe", at(9, 0, 0), Duration::minutes(10)),
            window("code.exe", at(9, 16, 0), Duration::minutes(5)),
        ];

        let sessions = segmenter().segment(&windows, &[]);

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].end_time, at(9, 10, 0));
        assert_eq!(sessions[1].start_time, at(9, 16, 0));
    }

    #[test]
    fn test_boundary_gap_one_millisecond_below_threshold_merges() {
        let first_end = at(9, 10, 0);
        let windows = vec![
            window("code.exe", at(9, 0, 0), Duration::minutes(10)),
            window(
                "code.exe",
                first_end + Duration::minutes(6) - Duration::milliseconds(1),
                Duration::minutes(5),
            ),
        ];

        let sessions = segmenter().segment(&windows, &[]);

        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn test_diff_only_input_yields_no_sessions() {
        let diffs = vec![diff(1, at(9, 0, 0)), diff(2, at(9, 2, 0)), diff(3, at(13, 0, 0))];
        assert!(segmenter().segment(&[], &diffs).is_empty());
    }

    #[test]
    fn test_zero_duration_windows_do_not_anchor_sessions() {
        let windows = vec![window("explorer.exe", at(9, 0, 0), Duration::zero())];
        let diffs = vec![diff(1, at(9, 1, 0))];
        assert!(segmenter().segment(&windows, &diffs).is_empty());
    }

    #[test]
    fn test_idle_diff_is_discarded_and_does_not_bridge_sessions() {
        let windows = vec![
            window("code.exe", at(9, 0, 0), Duration::minutes(10)),
            window("code.exe", at(10, 0, 0), Duration::minutes(10)),
        ];
        // Lands 20 minutes after the first session ends and 30 before the next.
        let diffs = vec![diff(7, at(9, 30, 0))];

        let sessions = segmenter().segment(&windows, &diffs);

        assert_eq!(sessions.len(), 2);
        assert!(sessions.iter().all(|s| s.diff_ids.is_empty()));
    }

    #[test]
    fn test_diff_opened_session_is_kept_once_window_event_joins() {
        let windows = vec![window("code.exe", at(9, 3, 0), Duration::minutes(5))];
        let diffs = vec![diff(5, at(9, 0, 0))];

        let sessions = segmenter().segment(&windows, &diffs);

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].start_time, at(9, 0, 0));
        assert_eq!(sessions[0].diff_ids, vec![5]);
    }

    #[test]
    fn test_trailing_diff_extends_last_session() {
        let windows = vec![window("code.exe", at(9, 0, 0), Duration::minutes(10))];
        let diffs = vec![diff(9, at(9, 14, 0)), diff(10, at(11, 0, 0))];

        let sessions = segmenter().segment(&windows, &diffs);

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].diff_ids, vec![9]);
        assert_eq!(sessions[0].end_time, at(9, 14, 0));
    }

    #[test]
    fn test_primary_app_is_longest_total_dwell() {
        let windows = vec![
            window("chrome.exe", at(9, 0, 0), Duration::minutes(4)),
            window("code.exe", at(9, 4, 0), Duration::minutes(3)),
            window("chrome.exe", at(9, 7, 0), Duration::minutes(1)),
            window("code.exe", at(9, 8, 0), Duration::minutes(3)),
        ];

        let sessions = segmenter().segment(&windows, &[]);

        assert_eq!(sessions[0].primary_app, "code.exe");
        assert_eq!(sessions[0].app_usage[0].duration_ms, 6 * 60 * 1000);
        assert_eq!(sessions[0].app_usage[1].app_name, "chrome.exe");
    }

    #[test]
    fn test_unsorted_input_is_processed_in_timestamp_order() {
        let windows = vec![
            window("code.exe", at(9, 30, 0), Duration::minutes(10)),
            window("code.exe", at(9, 0, 0), Duration::minutes(28)),
        ];

        let sessions = segmenter().segment(&windows, &[]);

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].start_time, at(9, 0, 0));
    }

    #[test]
    fn test_browser_events_attach_by_containment_only() {
        let windows = vec![
            window("code.exe", at(9, 0, 0), Duration::minutes(10)),
            window("code.exe", at(10, 0, 0), Duration::minutes(10)),
        ];
        let visits = vec![
            visit(1, at(8, 59, 0)),
            visit(2, at(9, 0, 0)),
            visit(3, at(9, 10, 0)),
            visit(4, at(9, 30, 0)),
            visit(5, at(10, 5, 0)),
            visit(6, at(11, 0, 0)),
        ];

        let sessions = segmenter().build(&windows, &[], &visits);

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].browser_event_ids, vec![2, 3]);
        assert_eq!(sessions[1].browser_event_ids, vec![5]);
    }

    #[test]
    fn test_browser_events_never_move_boundaries() {
        let windows = vec![
            window("code.exe", at(9, 0, 0), Duration::minutes(10)),
            window("code.exe", at(9, 30, 0), Duration::minutes(10)),
        ];
        let visits: Vec<_> =
            (0..20).map(|i| visit(i, at(9, 10, 0) + Duration::minutes(i))).collect();

        let with_browser = segmenter().build(&windows, &[], &visits);
        let without = segmenter().segment(&windows, &[]);

        assert_eq!(with_browser.len(), without.len());
        assert_eq!(with_browser[0].end_time, without[0].end_time);
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let windows = vec![
            window("code.exe", at(9, 0, 0), Duration::minutes(10)),
            window("slack.exe", at(9, 10, 0), Duration::minutes(10)),
            window("code.exe", at(11, 0, 0), Duration::minutes(10)),
        ];
        let diffs = vec![diff(1, at(9, 5, 0)), diff(2, at(11, 5, 0))];
        let visits = vec![visit(1, at(9, 12, 0))];

        let first = segmenter().build(&windows, &diffs, &visits);
        let second = segmenter().build(&windows, &diffs, &visits);

        assert_eq!(first, second);
    }

    #[test]
    fn test_candidate_converts_to_new_session() {
        let windows = vec![window("code.exe", at(9, 0, 0), Duration::minutes(40))];
        let diffs = vec![diff(42, at(9, 15, 0))];
        let candidate = segmenter().segment(&windows, &diffs).remove(0);

        let offset = FixedOffset::east_opt(0).unwrap();
        let new_session = candidate.to_new_session(3, offset);

        assert_eq!(new_session.session_version, 3);
        assert_eq!(new_session.time_range, "09:00-09:40");
        assert_eq!(new_session.diff_ids(), vec![42]);
        assert_eq!(new_session.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }
}
