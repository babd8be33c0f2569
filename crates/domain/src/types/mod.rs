//! Domain types and models

pub mod enrichment;
pub mod events;
pub mod evidence;
pub mod metadata;
pub mod session;
pub mod skill;

pub use enrichment::{
    AppUsage, BrowserDigest, DiffDigest, GeneratedSessionSummary, MemorySnippet,
    SessionSummaryContext,
};
pub use events::{BrowserVisitEvidence, CodeChangeEvidence, RawWindowEvent};
pub use evidence::{ClaimEvidence, EvidenceSessionRef};
pub use metadata::{RagRef, SessionMetadata};
pub use session::{EvidenceHint, NewSession, Session, SessionCategory, SessionSemanticUpdate};
pub use skill::{
    ContributionSource, LedgerKey, NewSkillActivity, SkillActivity, SkillContribution, SkillNode,
};
