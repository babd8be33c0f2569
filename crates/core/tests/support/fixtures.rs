//! Fixture builders for evidence records.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use skilltrail_domain::{BrowserVisitEvidence, CodeChangeEvidence, RawWindowEvent};

/// Fixed test day.
pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

/// UTC timestamp on the test day.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0).unwrap()
}

pub fn window(app: &str, start: DateTime<Utc>, minutes: i64) -> RawWindowEvent {
    RawWindowEvent {
        timestamp: start,
        duration_ms: Duration::minutes(minutes).num_milliseconds(),
        app_name: app.to_string(),
        title: format!("{app} - main"),
        source: "fixture".to_string(),
    }
}

pub fn diff(id: i64, timestamp: DateTime<Utc>) -> CodeChangeEvidence {
    CodeChangeEvidence {
        id,
        timestamp,
        file_path: format!("src/module_{id}.rs"),
        file_name: format!("module_{id}.rs"),
        language: "rust".to_string(),
        lines_added: 20,
        lines_deleted: 5,
        diff_content: "@@ -1,3 +1,4 @@\n+use tokio;\n".to_string(),
        ai_insight: None,
        skills_detected: Vec::new(),
    }
}

pub fn analysed_diff(id: i64, timestamp: DateTime<Utc>, skills: &[&str]) -> CodeChangeEvidence {
    CodeChangeEvidence {
        ai_insight: Some("refined async error handling".to_string()),
        skills_detected: skills.iter().map(|s| (*s).to_string()).collect(),
        ..diff(id, timestamp)
    }
}

pub fn visit(id: i64, timestamp: DateTime<Utc>, domain: &str) -> BrowserVisitEvidence {
    BrowserVisitEvidence {
        id,
        timestamp,
        domain: domain.to_string(),
        title: format!("{domain} page"),
        url: format!("https://{domain}/page/{id}"),
    }
}
