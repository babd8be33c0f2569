//! Experience policy for code-change evidence

use skilltrail_domain::constants::{EXP_PER_FILE, EXP_PER_HUNK, EXP_PER_TEN_LINES};
use skilltrail_domain::{
    resolve_skill_key, CodeChangeEvidence, ContributionSource, SkillContribution,
    SkillCurveConfig,
};

/// Maps diffs to a bounded experience value.
///
/// `exp = 1 + lines/10 + 0.5 * distinct_files + 0.2 * hunks`, clamped to
/// `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExperiencePolicy {
    min: f64,
    max: f64,
}

impl Default for ExperiencePolicy {
    fn default() -> Self {
        Self::from_config(&SkillCurveConfig::default())
    }
}

impl ExperiencePolicy {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max: max.max(min) }
    }

    pub fn from_config(config: &SkillCurveConfig) -> Self {
        Self::new(config.min_exp, config.max_exp)
    }

    /// Experience earned by a group of diffs treated as one contribution.
    pub fn experience_for(&self, diffs: &[&CodeChangeEvidence]) -> f64 {
        let lines: i64 = diffs.iter().map(|diff| diff.changed_lines()).sum();
        let hunks: usize = diffs.iter().map(|diff| diff.hunk_count()).sum();

        let mut files: Vec<&str> = diffs.iter().map(|diff| diff.file_path.as_str()).collect();
        files.sort_unstable();
        files.dedup();

        #[allow(clippy::cast_precision_loss)]
        let raw = 1.0
            + EXP_PER_TEN_LINES * (lines as f64 / 10.0)
            + EXP_PER_FILE * files.len() as f64
            + EXP_PER_HUNK * hunks as f64;
        raw.clamp(self.min, self.max)
    }

    /// Contributions for one analysed diff: its experience split evenly
    /// across the distinct skills it names.
    pub fn contributions_for_diff(&self, diff: &CodeChangeEvidence) -> Vec<SkillContribution> {
        let mut seen = Vec::new();
        let skills: Vec<&str> = diff
            .skills_detected
            .iter()
            .map(|name| name.trim())
            .filter(|name| match resolve_skill_key(name) {
                Some(key) if !seen.contains(&key) => {
                    seen.push(key);
                    true
                }
                _ => false,
            })
            .collect();

        if skills.is_empty() {
            return Vec::new();
        }

        #[allow(clippy::cast_precision_loss)]
        let share = self.experience_for(&[diff]) / skills.len() as f64;
        skills
            .into_iter()
            .map(|name| {
                SkillContribution::new(name, share, ContributionSource::Diff)
                    .with_evidence(diff.id, diff.timestamp)
            })
            .collect()
    }
}
