//! Structured context exchanged with the text-generation and retrieval
//! collaborators

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Summed dwell time of one application inside a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppUsage {
    pub app_name: String,
    pub duration_ms: i64,
}

/// Diff fields relevant to a summary prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffDigest {
    pub file_name: String,
    pub language: String,
    pub lines_added: i64,
    pub lines_deleted: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insight: Option<String>,
}

/// Browser fields relevant to a summary prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserDigest {
    pub domain: String,
    pub title: String,
}

/// Snippet returned by the retrieval collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnippet {
    pub content: String,
    pub similarity: f64,
    #[serde(rename = "type")]
    pub snippet_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Capped evidence bundle handed to the text-generation collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummaryContext {
    pub session_id: i64,
    pub date: NaiveDate,
    pub time_range: String,
    pub primary_app: String,
    pub apps: Vec<AppUsage>,
    pub diffs: Vec<DiffDigest>,
    pub browser: Vec<BrowserDigest>,
    pub skills: Vec<String>,
    pub memories: Vec<MemorySnippet>,
}

/// Generated summary. Any field may come back empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSessionSummary {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}
