//! Stub text-generation and retrieval collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use skilltrail_core::enrichment::{MemoryRetriever, SessionSummarizer};
use skilltrail_domain::{
    GeneratedSessionSummary, MemorySnippet, Result as DomainResult, SessionSummaryContext,
    SkillTrailError,
};

/// Summarizer returning a canned response (or error) and recording calls.
#[derive(Clone)]
pub struct StubSummarizer {
    configured: bool,
    response: Result<GeneratedSessionSummary, SkillTrailError>,
    calls: Arc<AtomicUsize>,
    contexts: Arc<Mutex<Vec<SessionSummaryContext>>>,
}

impl StubSummarizer {
    pub fn returning(summary: GeneratedSessionSummary) -> Self {
        Self {
            configured: true,
            response: Ok(summary),
            calls: Arc::default(),
            contexts: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: Err(SkillTrailError::Network("upstream timeout".to_string())),
            ..Self::returning(GeneratedSessionSummary::default())
        }
    }

    pub fn unconfigured() -> Self {
        Self { configured: false, ..Self::returning(GeneratedSessionSummary::default()) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_context(&self) -> Option<SessionSummaryContext> {
        self.contexts.lock().last().cloned()
    }
}

#[async_trait]
impl SessionSummarizer for StubSummarizer {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate_session_summary(
        &self,
        context: &SessionSummaryContext,
    ) -> DomainResult<GeneratedSessionSummary> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().push(context.clone());
        self.response.clone()
    }
}

/// Retriever returning fixed snippets.
#[derive(Default, Clone)]
pub struct StubRetriever {
    snippets: Vec<MemorySnippet>,
    fail: bool,
    queries: Arc<Mutex<Vec<String>>>,
}

impl StubRetriever {
    pub fn with_snippets(snippets: Vec<MemorySnippet>) -> Self {
        Self { snippets, ..Self::default() }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl MemoryRetriever for StubRetriever {
    async fn query(&self, text: &str, top_k: usize) -> DomainResult<Vec<MemorySnippet>> {
        self.queries.lock().push(text.to_string());
        if self.fail {
            return Err(SkillTrailError::Network("vector store offline".to_string()));
        }
        Ok(self.snippets.iter().take(top_k).cloned().collect())
    }
}
