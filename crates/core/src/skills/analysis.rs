//! One-time diff analysis write-back

use std::sync::Arc;

use chrono::{DateTime, Utc};
use skilltrail_domain::{Result, SkillTrailError};
use tracing::{debug, info};

use super::service::{LedgerOutcome, SkillProgressService};
use crate::tracking::DiffRepository;

/// Result of [`DiffAnalysisRecorder::record`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// The diff already carried an analysis; nothing changed.
    AlreadyAnalyzed,
    Recorded(LedgerOutcome),
}

/// Stores a diff's insight/skills exactly once and pays out its experience.
pub struct DiffAnalysisRecorder {
    diffs: Arc<dyn DiffRepository>,
    progress: Arc<SkillProgressService>,
}

impl DiffAnalysisRecorder {
    pub fn new(diffs: Arc<dyn DiffRepository>, progress: Arc<SkillProgressService>) -> Self {
        Self { diffs, progress }
    }

    pub async fn record(
        &self,
        diff_id: i64,
        insight: &str,
        skills: &[String],
        now: DateTime<Utc>,
    ) -> Result<AnalysisOutcome> {
        let Some(mut diff) = self.diffs.get_diffs_by_ids(&[diff_id]).await?.into_iter().next()
        else {
            return Err(SkillTrailError::NotFound(format!("diff {diff_id}")));
        };

        if diff.is_analyzed() || !self.diffs.record_diff_analysis(diff_id, insight, skills).await?
        {
            debug!(diff_id, "diff already analysed");
            return Ok(AnalysisOutcome::AlreadyAnalyzed);
        }

        diff.ai_insight = Some(insight.to_string());
        diff.skills_detected = skills.to_vec();
        let outcome = self.progress.apply_diff_evidence(&[diff], now).await?;

        info!(diff_id, skills = skills.len(), applied = outcome.applied, "diff analysis recorded");
        Ok(AnalysisOutcome::Recorded(outcome))
    }
}
