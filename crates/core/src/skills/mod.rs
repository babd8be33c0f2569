//! Skill progression: experience policy, leveling curve and ledger

pub mod analysis;
pub mod experience;
pub mod ledger;
pub mod ports;
pub mod progression;
pub mod service;

pub use analysis::{AnalysisOutcome, DiffAnalysisRecorder};
pub use experience::ExperiencePolicy;
pub use ledger::{resolve_parent_key, KeyedContribution, LedgerBatch, SkillGrant};
pub use ports::{SkillActivityRepository, SkillRepository};
pub use progression::SkillCurve;
pub use service::{LedgerOutcome, SkillProgressService};
