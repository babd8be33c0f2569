//! Session semantic enrichment

pub mod fallback;
pub mod ports;
pub mod service;

pub use fallback::{fallback_category, fallback_summary, FallbackFacts};
pub use ports::{MemoryRetriever, SessionSummarizer};
pub use service::{EnrichmentOutcome, SessionEnricher};
