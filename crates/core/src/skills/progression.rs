//! Skill node state machine: leveling curve and decay

use chrono::{DateTime, Utc};
use skilltrail_domain::constants::{DEFAULT_SKILL_CATEGORY, SKILL_MIN_LEVEL};
use skilltrail_domain::{SkillCurveConfig, SkillNode};

/// Exponential leveling curve with inactivity decay.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillCurve {
    config: SkillCurveConfig,
}

impl Default for SkillCurve {
    fn default() -> Self {
        Self::new(SkillCurveConfig::default())
    }
}

impl SkillCurve {
    pub fn new(config: SkillCurveConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SkillCurveConfig {
        &self.config
    }

    pub fn max_level(&self) -> u32 {
        self.config.max_level.max(SKILL_MIN_LEVEL)
    }

    /// `base_cost * multiplier^level`
    pub fn exp_to_next(&self, level: u32) -> f64 {
        let exponent = i32::try_from(level).unwrap_or(i32::MAX);
        self.config.base_cost * self.config.multiplier.powi(exponent)
    }

    /// Fresh level-1 node.
    pub fn new_node(
        &self,
        key: impl Into<String>,
        name: impl Into<String>,
        category: Option<String>,
        parent_key: Option<String>,
        now: DateTime<Utc>,
    ) -> SkillNode {
        SkillNode {
            key: key.into(),
            name: name.into(),
            category: category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SKILL_CATEGORY.to_string()),
            parent_key,
            level: SKILL_MIN_LEVEL,
            exp: 0.0,
            exp_to_next: self.exp_to_next(SKILL_MIN_LEVEL),
            last_active: now,
        }
    }

    /// Add experience and roll over levels. Returns the number of levels
    /// gained. At the max level experience keeps accumulating without
    /// rollover. A grant stamped earlier than `last_active` never moves it
    /// back.
    pub fn add_experience(&self, node: &mut SkillNode, exp: f64, now: DateTime<Utc>) -> u32 {
        self.refresh(node);
        if exp.is_finite() && exp > 0.0 {
            node.exp += exp;
        }
        node.last_active = node.last_active.max(now);

        let start_level = node.level;
        let max_level = self.max_level();
        while node.level < max_level && node.exp >= node.exp_to_next {
            node.exp -= node.exp_to_next;
            node.level += 1;
            node.exp_to_next = self.exp_to_next(node.level);
        }
        node.level - start_level
    }

    /// Decay rate for a node as of `now`, or `None` while inside the grace
    /// period.
    pub fn decay_rate(&self, node: &SkillNode, now: DateTime<Utc>) -> Option<f64> {
        let days_inactive = (now - node.last_active).num_days();
        if days_inactive <= self.config.decay_grace_days {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let overdue = (days_inactive - self.config.decay_grace_days) as f64;
        Some((self.config.decay_per_day * overdue).min(self.config.max_decay))
    }

    /// Shrink `exp` according to inactivity. Level never drops. Returns the
    /// rate applied.
    pub fn decay(&self, node: &mut SkillNode, now: DateTime<Utc>) -> Option<f64> {
        let rate = self.decay_rate(node, now)?;
        if node.exp <= 0.0 || rate <= 0.0 {
            return None;
        }
        node.exp *= 1.0 - rate;
        Some(rate)
    }

    /// Re-derive `exp_to_next` and clamp the level into range.
    pub fn refresh(&self, node: &mut SkillNode) {
        node.level = node.level.clamp(SKILL_MIN_LEVEL, self.max_level());
        node.exp_to_next = self.exp_to_next(node.level);
        if !node.exp.is_finite() || node.exp < 0.0 {
            node.exp = 0.0;
        }
    }
}
