//! Rule-based summary used when no text generation is available

use skilltrail_domain::SessionCategory;

/// Inputs for [`fallback_summary`], already ranked and capped.
#[derive(Debug, Clone, Default)]
pub struct FallbackFacts<'a> {
    pub top_skills: &'a [String],
    pub languages: &'a [String],
    pub primary_app: &'a str,
    pub top_domains: &'a [String],
}

const GENERIC_SUMMARY: &str = "general activity";

/// Deterministic one-line summary assembled from the strongest signals.
pub fn fallback_summary(facts: &FallbackFacts<'_>) -> String {
    let mut parts = Vec::with_capacity(4);
    if !facts.top_skills.is_empty() {
        parts.push(format!("centered on {}", facts.top_skills.join(", ")));
    }
    if !facts.languages.is_empty() {
        parts.push(format!("{} changes", facts.languages.join("/")));
    }
    let app = facts.primary_app.trim();
    if !app.is_empty() {
        parts.push(format!("mainly in {app}"));
    }
    if !facts.top_domains.is_empty() {
        parts.push(format!("browsed {}", facts.top_domains.join(", ")));
    }

    if parts.is_empty() {
        GENERIC_SUMMARY.to_string()
    } else {
        parts.join("; ")
    }
}

pub fn fallback_category(has_diffs: bool, has_browser: bool) -> SessionCategory {
    SessionCategory::from_evidence(has_diffs, has_browser)
}
