//! Optional collaborators used by session enrichment
//!
//! Both collaborators may be absent and may fail at any time; the enricher
//! falls back to deterministic output instead of surfacing their errors.

use async_trait::async_trait;
use skilltrail_domain::{GeneratedSessionSummary, MemorySnippet, Result, SessionSummaryContext};

/// Text-generation backend producing session summaries.
#[async_trait]
pub trait SessionSummarizer: Send + Sync {
    /// False when the backend lacks credentials and should not be called.
    fn is_configured(&self) -> bool;

    async fn generate_session_summary(
        &self,
        context: &SessionSummaryContext,
    ) -> Result<GeneratedSessionSummary>;
}

/// Retrieval backend returning related memory snippets.
#[async_trait]
pub trait MemoryRetriever: Send + Sync {
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<MemorySnippet>>;
}
