//! Claim tokenizer for lexical evidence linking

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// CJK runs of two or more characters, or identifier-like ASCII tokens
    /// that may carry `+ # . -` inside (so `c++`, `c#`, `node.js` survive).
    static ref TOKEN_RE: Regex = Regex::new(
        r"[\p{Han}\p{Hiragana}\p{Katakana}\p{Hangul}]{2,}|[A-Za-z_][A-Za-z0-9_+#.\-]*[A-Za-z0-9_+#]"
    )
    .expect("claim token pattern is valid");
}

/// Filler words that would match almost every session document.
const STOPWORDS: &[&str] = &[
    "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "in", "into", "is",
    "it", "its", "of", "on", "or", "the", "this", "that", "to", "via", "was", "were", "with",
];

/// Lower-cased, case-insensitively deduplicated tokens in first-seen order.
pub fn tokenize(claim: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    TOKEN_RE
        .find_iter(claim)
        .map(|m| m.as_str().to_lowercase())
        .filter(|token| !STOPWORDS.contains(&token.as_str()))
        .filter(|token| seen.insert(token.clone()))
        .collect()
}
