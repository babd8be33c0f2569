//! Claim-to-session linking over enriched sessions.

mod support;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use skilltrail_core::evidence::EvidenceLinker;
use skilltrail_domain::{CodeChangeEvidence, EvidenceHint, LinkerConfig, Session, SessionMetadata};
use support::*;

fn session(id: i64, start: DateTime<Utc>, summary: &str, skills: &[&str]) -> Session {
    let end = start + Duration::minutes(30);
    Session {
        id,
        date: day(),
        start_time: start,
        end_time: end,
        primary_app: "code.exe".to_string(),
        session_version: 1,
        time_range: format!("{}-{}", start.format("%H:%M"), end.format("%H:%M")),
        category: String::new(),
        summary: summary.to_string(),
        skills_involved: skills.iter().map(|s| (*s).to_string()).collect(),
        metadata: SessionMetadata::new(),
    }
}

fn scheduler_diff() -> CodeChangeEvidence {
    CodeChangeEvidence {
        file_path: "crates/engine/src/scheduler.rs".to_string(),
        file_name: "scheduler.rs".to_string(),
        ..diff(42, at(9, 10))
    }
}

/// Coding session with a diff, reading session with a visit, and a bare
/// chat session.
fn corpus_sessions() -> Vec<Session> {
    let mut coding = session(1, at(9, 0), "Refactored the ingestion worker", &["Rust"]);
    coding.category = "technical".to_string();
    coding.metadata.set_diff_ids(&[42]);

    let mut reading = session(2, at(11, 0), "Read about write-ahead logging", &["SQLite"]);
    reading.category = "learning".to_string();
    reading.metadata.set_browser_event_ids(&[7]);

    let mut chat = session(3, at(14, 0), "", &[]);
    chat.primary_app = "slack.exe".to_string();

    vec![coding, reading, chat]
}

fn linker(events: &InMemoryEventSource) -> EvidenceLinker {
    EvidenceLinker::new(Arc::new(events.clone()), &LinkerConfig::default())
}

fn ids(refs: &[skilltrail_domain::EvidenceSessionRef]) -> Vec<i64> {
    refs.iter().map(|r| r.id).collect()
}

#[tokio::test]
async fn test_claim_matches_diff_file_name() {
    // Arrange
    let events = InMemoryEventSource::new().with_diffs(vec![scheduler_diff()]);
    let sessions = corpus_sessions();

    // Act
    let linked =
        linker(&events).link_claim("Rewrote scheduler.rs", &sessions, None).await.unwrap();

    // Assert
    assert_eq!(linked.claim, "Rewrote scheduler.rs");
    assert_eq!(ids(&linked.sessions), vec![1]);
    assert_eq!(linked.sessions[0].evidence_hint, EvidenceHint::Diff);
    assert_eq!(linked.sessions[0].time_range, "09:00-09:30");
}

#[tokio::test]
async fn test_skill_tag_match_ranks_session() {
    let events = InMemoryEventSource::new().with_diffs(vec![scheduler_diff()]);

    let linked =
        linker(&events).link_claim("Tuned SQLite pragmas", &corpus_sessions(), None).await.unwrap();

    assert_eq!(ids(&linked.sessions), vec![2]);
}

#[tokio::test]
async fn test_many_claims_share_one_diff_read() {
    let events = InMemoryEventSource::new().with_diffs(vec![scheduler_diff()]);
    let claims = vec![
        "Rewrote scheduler.rs".to_string(),
        "Tuned SQLite pragmas".to_string(),
        "Shipped the ingestion worker".to_string(),
    ];

    let linked = linker(&events).link_claims(&claims, &corpus_sessions(), Some(2)).await.unwrap();

    assert_eq!(events.diff_id_reads(), 1);
    assert_eq!(linked.len(), 3);
    assert_eq!(linked[2].claim, "Shipped the ingestion worker");
    assert_eq!(ids(&linked[2].sessions), vec![1]);
}

#[tokio::test]
async fn test_unmatched_claim_falls_back_to_richest_sessions() {
    let events = InMemoryEventSource::new().with_diffs(vec![scheduler_diff()]);

    let linked = linker(&events)
        .link_claim("Quarterly budget review", &corpus_sessions(), Some(3))
        .await
        .unwrap();

    assert_eq!(ids(&linked.sessions), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_linking_is_deterministic() {
    let events = InMemoryEventSource::new().with_diffs(vec![scheduler_diff()]);
    let linker = linker(&events);
    let sessions = corpus_sessions();

    let first = linker.link_claim("ingestion worker scheduler", &sessions, None).await.unwrap();
    let second = linker.link_claim("ingestion worker scheduler", &sessions, None).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_explicit_references_take_precedence() {
    let events = InMemoryEventSource::new().with_diffs(vec![scheduler_diff()]);
    let sessions = corpus_sessions();
    let linker = linker(&events);

    let explicit =
        linker.resolve_claim("Rewrote scheduler.rs", &[3, 99, 3], &sessions, None).await.unwrap();
    let unknown_only =
        linker.resolve_claim("Rewrote scheduler.rs", &[99], &sessions, None).await.unwrap();

    assert_eq!(ids(&explicit.sessions), vec![3]);
    assert_eq!(ids(&unknown_only.sessions), vec![1]);
}

#[tokio::test]
async fn test_no_sessions_yields_no_references() {
    let events = InMemoryEventSource::new();

    let linked = linker(&events).link_claim("anything", &[], None).await.unwrap();

    assert!(linked.sessions.is_empty());
    assert_eq!(events.diff_id_reads(), 0);
}

#[tokio::test]
async fn test_diff_read_failure_propagates() {
    let linker = EvidenceLinker::new(Arc::new(FailingEventSource), &LinkerConfig::default());

    let err = linker.link_claim("scheduler", &corpus_sessions(), None).await.unwrap_err();

    assert!(err.is_storage());
}
