//! Claim-to-session evidence linking

pub mod linker;
pub mod tokenizer;

pub use linker::{explicit_refs, EvidenceLinker, LinkCorpus};
pub use tokenizer::tokenize;
