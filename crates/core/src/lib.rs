//! # SkillTrail Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for evidence, sessions and skills
//! - The session segmenter and the versioned session build service
//! - Experience policy, leveling curve and the skill activity ledger
//! - Session enrichment and the claim evidence linker
//!
//! ## Architecture Principles
//! - Only depends on `skilltrail-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod enrichment;
pub mod evidence;
pub mod sessions;
pub mod skills;
pub mod tracking;
pub mod utils;

// Re-export specific items to avoid ambiguity
pub use enrichment::{EnrichmentOutcome, MemoryRetriever, SessionEnricher, SessionSummarizer};
pub use evidence::{EvidenceLinker, LinkCorpus};
pub use sessions::{
    BuildOutcome, DateLocks, RebuildOutcome, SessionBuildService, SessionCandidate,
    SessionRepository, SessionSegmenter,
};
pub use skills::{
    AnalysisOutcome, DiffAnalysisRecorder, ExperiencePolicy, LedgerOutcome,
    SkillActivityRepository, SkillCurve, SkillProgressService, SkillRepository,
};
pub use tracking::{BrowserEventSource, DiffRepository, WindowEventSource};
