//! Skill key normalization
//!
//! Skill keys are storage identifiers: the ledger, skill nodes and the
//! session `skill_keys` index all join on them. Changing
//! [`SUBSTITUTIONS`] or the character rules therefore changes persisted
//! keys and needs a data migration.

/// Compound names rewritten before character stripping. Longer and more
/// specific patterns come first so that, for example, `asp.net` never
/// becomes `aspdotnet` through the generic `.net` rule.
const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("asp.net", "aspnet"),
    ("objective-c++", "objective-cpp"),
    ("react.js", "reactjs"),
    ("vue.js", "vuejs"),
    ("node.js", "nodejs"),
    ("next.js", "nextjs"),
    ("nuxt.js", "nuxtjs"),
    ("express.js", "expressjs"),
    ("ember.js", "emberjs"),
    ("three.js", "threejs"),
    ("d3.js", "d3js"),
    ("c++", "cpp"),
    ("c#", "csharp"),
    ("f#", "fsharp"),
    (".net", "dotnet"),
    (".js", "js"),
];

/// Map a free-text skill name to its stable key.
///
/// Lower-cases, applies [`SUBSTITUTIONS`] in order, turns whitespace runs
/// into single hyphens and drops every character outside `[a-z0-9-]`.
/// Returns an empty string when nothing usable remains.
pub fn normalize_skill_key(name: &str) -> String {
    let mut lowered = name.trim().to_lowercase();
    for (pattern, replacement) in SUBSTITUTIONS {
        if lowered.contains(pattern) {
            lowered = lowered.replace(pattern, replacement);
        }
    }

    let hyphenated = lowered.split_whitespace().collect::<Vec<_>>().join("-");

    let mut key = String::with_capacity(hyphenated.len());
    for ch in hyphenated.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            key.push(ch);
        } else if ch == '-' && !key.is_empty() && !key.ends_with('-') {
            key.push('-');
        }
    }

    while key.ends_with('-') {
        key.pop();
    }
    key
}

/// Key for a name the slug rules cannot express, such as a CJK skill name.
///
/// Same shape as [`normalize_skill_key`] but keeps any Unicode
/// alphanumeric character. Such keys are never written to the ledger (see
/// [`resolve_skill_key`]).
pub fn fallback_skill_key(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .map(|word| word.chars().filter(|ch| ch.is_alphanumeric()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// How a skill name maps to a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSkillKey {
    /// Normalized slug; usable as a ledger key.
    Normalized(String),
    /// The slug was empty; keyed by [`fallback_skill_key`] instead.
    Fallback(String),
}

impl ResolvedSkillKey {
    pub fn key(&self) -> &str {
        match self {
            Self::Normalized(key) | Self::Fallback(key) => key,
        }
    }

    pub fn into_key(self) -> String {
        match self {
            Self::Normalized(key) | Self::Fallback(key) => key,
        }
    }

    pub fn is_normalized(&self) -> bool {
        matches!(self, Self::Normalized(_))
    }
}

/// Normalized key when one exists, otherwise the fallback key. `None` for
/// blank names.
pub fn resolve_skill_key(name: &str) -> Option<ResolvedSkillKey> {
    let normalized = normalize_skill_key(name);
    if !normalized.is_empty() {
        return Some(ResolvedSkillKey::Normalized(normalized));
    }
    let fallback = fallback_skill_key(name);
    (!fallback.is_empty()).then_some(ResolvedSkillKey::Fallback(fallback))
}
