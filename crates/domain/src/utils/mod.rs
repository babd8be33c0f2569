//! Pure helpers shared by every layer

pub mod skill_key;

pub use skill_key::{
    fallback_skill_key, normalize_skill_key, resolve_skill_key, ResolvedSkillKey,
};
