//! Configuration structures
//!
//! Every section carries serde defaults so partial TOML/JSON files and
//! environment overrides compose without listing every field.

use chrono::{Duration, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DECAY_GRACE_DAYS, DECAY_PER_DAY, DEFAULT_COLD_START_LOOKBACK_HOURS,
    DEFAULT_ENRICH_BATCH_LIMIT, DEFAULT_ENRICH_DATE_LIMIT, DEFAULT_IDLE_GAP_SECS,
    DEFAULT_LINK_TOP_K, MAX_CONTEXT_APPS, MAX_CONTEXT_BROWSER_ITEMS, MAX_CONTEXT_DIFFS,
    MAX_CONTRIBUTION_EXP, MAX_DECAY_RATE, MAX_MEMORY_SNIPPETS, MAX_SUMMARY_SKILLS,
    MAX_TOP_DOMAINS, MIN_CONTRIBUTION_EXP, SKILL_BASE_COST, SKILL_LEVEL_MULTIPLIER,
    SKILL_MAX_LEVEL,
};
use crate::{Result, SkillTrailError};

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub skills: SkillCurveConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub linker: LinkerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values that would make the engine misbehave silently.
    pub fn validate(&self) -> Result<()> {
        if self.database.pool_size == 0 {
            return Err(SkillTrailError::Config("database.pool_size must be at least 1".into()));
        }
        if self.segmentation.idle_gap_secs == 0 {
            return Err(SkillTrailError::Config(
                "segmentation.idle_gap_secs must be greater than zero".into(),
            ));
        }
        if self.skills.multiplier <= 1.0 {
            return Err(SkillTrailError::Config("skills.multiplier must be greater than 1".into()));
        }
        if self.skills.max_level == 0 {
            return Err(SkillTrailError::Config("skills.max_level must be at least 1".into()));
        }
        if self.skills.min_exp > self.skills.max_exp {
            return Err(SkillTrailError::Config(format!(
                "skills.min_exp ({}) exceeds skills.max_exp ({})",
                self.skills.min_exp, self.skills.max_exp
            )));
        }
        Ok(())
    }
}

/// SQLite connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "skilltrail.db".into(), pool_size: 4 }
    }
}

/// Session segmentation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Silence (seconds) that forces a session boundary.
    pub idle_gap_secs: u64,
    /// How far back an incremental build reaches when no session exists yet.
    pub cold_start_lookback_hours: u64,
    /// Offset used to derive a session's calendar date and `time_range`.
    pub utc_offset_minutes: i32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            idle_gap_secs: DEFAULT_IDLE_GAP_SECS,
            cold_start_lookback_hours: DEFAULT_COLD_START_LOOKBACK_HOURS,
            utc_offset_minutes: 0,
        }
    }
}

impl SegmentationConfig {
    pub fn idle_gap(&self) -> Duration {
        i64::try_from(self.idle_gap_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or_else(|| Duration::seconds(DEFAULT_IDLE_GAP_SECS as i64))
    }

    pub fn cold_start_lookback(&self) -> Duration {
        i64::try_from(self.cold_start_lookback_hours)
            .ok()
            .and_then(Duration::try_hours)
            .unwrap_or_else(|| Duration::hours(24))
    }

    /// Local offset for calendar dates; out-of-range values fall back to UTC.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }
}

/// Leveling curve, decay and experience-policy bounds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SkillCurveConfig {
    pub base_cost: f64,
    pub multiplier: f64,
    pub max_level: u32,
    pub decay_grace_days: i64,
    pub decay_per_day: f64,
    pub max_decay: f64,
    pub min_exp: f64,
    pub max_exp: f64,
}

impl Default for SkillCurveConfig {
    fn default() -> Self {
        Self {
            base_cost: SKILL_BASE_COST,
            multiplier: SKILL_LEVEL_MULTIPLIER,
            max_level: SKILL_MAX_LEVEL,
            decay_grace_days: DECAY_GRACE_DAYS,
            decay_per_day: DECAY_PER_DAY,
            max_decay: MAX_DECAY_RATE,
            min_exp: MIN_CONTRIBUTION_EXP,
            max_exp: MAX_CONTRIBUTION_EXP,
        }
    }
}

/// Session enrichment settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Sessions processed per incremental run.
    pub batch_limit: usize,
    /// Sessions processed per per-date run.
    pub date_limit: usize,
    /// Window scanned by an incremental run.
    pub lookback_hours: u64,
    pub max_apps: usize,
    pub max_diffs: usize,
    pub max_browser_items: usize,
    pub max_memory_snippets: usize,
    pub max_summary_skills: usize,
    pub max_domains: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            batch_limit: DEFAULT_ENRICH_BATCH_LIMIT,
            date_limit: DEFAULT_ENRICH_DATE_LIMIT,
            lookback_hours: DEFAULT_COLD_START_LOOKBACK_HOURS,
            max_apps: MAX_CONTEXT_APPS,
            max_diffs: MAX_CONTEXT_DIFFS,
            max_browser_items: MAX_CONTEXT_BROWSER_ITEMS,
            max_memory_snippets: MAX_MEMORY_SNIPPETS,
            max_summary_skills: MAX_SUMMARY_SKILLS,
            max_domains: MAX_TOP_DOMAINS,
        }
    }
}

impl EnrichmentConfig {
    pub fn lookback(&self) -> Duration {
        i64::try_from(self.lookback_hours)
            .ok()
            .and_then(Duration::try_hours)
            .unwrap_or_else(|| Duration::hours(24))
    }
}

/// Evidence linker settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LinkerConfig {
    pub default_top_k: usize,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self { default_top_k: DEFAULT_LINK_TOP_K }
    }
}

/// Text-generation collaborator settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_url: String,
    pub timeout_secs: u64,
    pub max_attempts: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".into(),
            api_url: "https://api.openai.com/v1/chat/completions".into(),
            timeout_secs: 30,
            max_attempts: 2,
        }
    }
}

impl LlmConfig {
    /// True when an API key is present and non-blank.
    pub fn is_enabled(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }
}

/// Background job schedules (six-field cron expressions)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub session_cron: String,
    pub enrichment_cron: String,
    pub decay_cron: String,
    pub job_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            session_cron: "0 */5 * * * *".into(),
            enrichment_cron: "0 */10 * * * *".into(),
            decay_cron: "0 0 3 * * *".into(),
            job_timeout_secs: 300,
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into(), json: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.segmentation.idle_gap(), Duration::minutes(6));
        assert_eq!(config.skills.base_cost, 100.0);
        assert_eq!(config.enrichment.max_apps, 8);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [segmentation]
            idle_gap_secs = 600

            [llm]
            api_key = "sk-test"
            "#,
        )
        .unwrap();

        assert_eq!(config.segmentation.idle_gap_secs, 600);
        assert_eq!(config.segmentation.cold_start_lookback_hours, 24);
        assert_eq!(config.database.pool_size, 4);
        assert!(config.llm.is_enabled());
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn validate_rejects_flat_curve() {
        let mut config = Config::default();
        config.skills.multiplier = 1.0;
        assert!(matches!(config.validate(), Err(SkillTrailError::Config(_))));
    }

    #[test]
    fn validate_rejects_inverted_exp_bounds() {
        let mut config = Config::default();
        config.skills.min_exp = 30.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn blank_api_key_is_disabled() {
        let llm = LlmConfig { api_key: Some("   ".into()), ..LlmConfig::default() };
        assert!(!llm.is_enabled());
    }

    #[test]
    fn offset_converts_minutes() {
        let seg = SegmentationConfig { utc_offset_minutes: 480, ..SegmentationConfig::default() };
        assert_eq!(seg.offset().local_minus_utc(), 8 * 3600);
    }
}
