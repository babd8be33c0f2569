//! OpenAI integration for session summaries
//!
//! `OpenAISessionSummarizer` implements the enricher's text-generation port
//! over the Chat Completions API. Requests use a strict `json_schema`
//! response format so the reply deserializes directly into
//! `GeneratedSessionSummary`.
//!
//! Transport retries (timeouts, refused connections, 5xx) are handled by
//! [`HttpClient`](crate::http::HttpClient). Status handling:
//! - 401/403: `OpenAIError::Authentication`, surfaced as a config error
//! - 429: `OpenAIError::RateLimited`
//! - other non-success: `OpenAIError::Api`
//!
//! The enricher treats every failure as "no generated summary" and falls
//! back to its deterministic text, so none of these abort a run.

pub mod client;
pub mod types;

pub use client::OpenAISessionSummarizer;
pub use types::OpenAIError;
