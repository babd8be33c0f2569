//! Engine constants
//!
//! Defaults shared by the configuration structs and the services that fall
//! back to them.

// Segmentation
pub const DEFAULT_IDLE_GAP_SECS: u64 = 360;
pub const DEFAULT_COLD_START_LOOKBACK_HOURS: u64 = 24;
pub const TIME_RANGE_FORMAT: &str = "%H:%M";

// Skill progression curve
pub const SKILL_BASE_COST: f64 = 100.0;
pub const SKILL_LEVEL_MULTIPLIER: f64 = 1.5;
pub const SKILL_MIN_LEVEL: u32 = 1;
pub const SKILL_MAX_LEVEL: u32 = 99;
pub const DECAY_GRACE_DAYS: i64 = 7;
pub const DECAY_PER_DAY: f64 = 0.02;
pub const MAX_DECAY_RATE: f64 = 0.5;
pub const DEFAULT_SKILL_CATEGORY: &str = "other";

// Experience policy
pub const MIN_CONTRIBUTION_EXP: f64 = 1.0;
pub const MAX_CONTRIBUTION_EXP: f64 = 20.0;
pub const EXP_PER_TEN_LINES: f64 = 1.0;
pub const EXP_PER_FILE: f64 = 0.5;
pub const EXP_PER_HUNK: f64 = 0.2;

// Enrichment caps
pub const MAX_CONTEXT_APPS: usize = 8;
pub const MAX_CONTEXT_DIFFS: usize = 12;
pub const MAX_CONTEXT_BROWSER_ITEMS: usize = 12;
pub const MAX_MEMORY_SNIPPETS: usize = 5;
pub const MAX_SUMMARY_SKILLS: usize = 3;
pub const MAX_TOP_DOMAINS: usize = 5;
pub const DEFAULT_ENRICH_BATCH_LIMIT: usize = 20;
pub const DEFAULT_ENRICH_DATE_LIMIT: usize = 200;

// Evidence linking
pub const DEFAULT_LINK_TOP_K: usize = 5;
