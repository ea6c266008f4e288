//! Engine tuning, loadable from JSON with per-field defaults.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    ALL_STAR_FLOOR, BIG_SPENDER_TOTAL, CLEAN_CLEANLINESS, CLEAN_COST, CLEAN_HAPPINESS, FEED_COST,
    FEED_HAPPINESS, FEED_HUNGER, OFFLINE_CLEANLINESS_PCT, OFFLINE_ENERGY_PCT,
    OFFLINE_HAPPINESS_PCT, OFFLINE_HEALTH_PCT, OFFLINE_HUNGER_PCT, OFFLINE_LOVE_PCT,
    OFFLINE_NEGLECT_THRESHOLD, PLAY_COST, PLAY_ENERGY, PLAY_HAPPINESS, PLAY_HUNGER,
    PLAY_MIN_ENERGY, REST_COST, REST_ENERGY, REST_HUNGER, REWARD_EASY, REWARD_HARD, REWARD_MEDIUM,
    SAVER_BALANCE, STAT_MAX, STREAK_BONUS, STREAK_BONUS_EVERY_DAYS, TASK_MASTER_COUNT,
    TICK_CLEANLINESS_LOSS, TICK_ENERGY_LOSS, TICK_HAPPINESS_CHANCE, TICK_HAPPINESS_LOSS,
    TICK_HEALTH_LOSS, TICK_HUNGER_LOSS, TICK_INTERVAL_MAX_SECS, TICK_INTERVAL_MIN_SECS,
    TICK_INTERVAL_SECS, TICK_LOVE_LOSS, TICK_MAX_LOSS, TICK_NEGLECT_THRESHOLD, TOY_COST,
    TOY_HAPPINESS, VET_COST, VET_HAPPINESS,
};
use crate::stats::{Stat, StatDelta};

/// Errors raised when engine configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("config is not valid JSON: {0}")]
    Parse(String),
    #[error("{field} must be between {min} and {max} (got {value})")]
    RangeViolation {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },
    #[error("{field} must be a probability in [0, 1] (got {value:.3})")]
    Probability { field: &'static str, value: f64 },
    #[error("streak bonus cadence must be at least one day")]
    StreakCadence,
}

fn check_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::RangeViolation {
            field,
            min,
            max,
            value,
        })
    }
}

/// Offline catch-up rates, as whole percentages of elapsed hours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecayConfig {
    #[serde(default = "DecayConfig::default_hunger_pct")]
    pub hunger_pct: u32,
    #[serde(default = "DecayConfig::default_happiness_pct")]
    pub happiness_pct: u32,
    #[serde(default = "DecayConfig::default_cleanliness_pct")]
    pub cleanliness_pct: u32,
    #[serde(default = "DecayConfig::default_energy_pct")]
    pub energy_pct: u32,
    #[serde(default = "DecayConfig::default_love_pct")]
    pub love_pct: u32,
    #[serde(default = "DecayConfig::default_health_pct")]
    pub health_pct: u32,
    /// Health decays only when hunger or cleanliness start below this.
    #[serde(default = "DecayConfig::default_neglect_threshold")]
    pub neglect_threshold: i32,
}

impl DecayConfig {
    const fn default_hunger_pct() -> u32 {
        OFFLINE_HUNGER_PCT
    }
    const fn default_happiness_pct() -> u32 {
        OFFLINE_HAPPINESS_PCT
    }
    const fn default_cleanliness_pct() -> u32 {
        OFFLINE_CLEANLINESS_PCT
    }
    const fn default_energy_pct() -> u32 {
        OFFLINE_ENERGY_PCT
    }
    const fn default_love_pct() -> u32 {
        OFFLINE_LOVE_PCT
    }
    const fn default_health_pct() -> u32 {
        OFFLINE_HEALTH_PCT
    }
    const fn default_neglect_threshold() -> i32 {
        OFFLINE_NEGLECT_THRESHOLD
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, pct) in [
            ("decay.hunger_pct", self.hunger_pct),
            ("decay.happiness_pct", self.happiness_pct),
            ("decay.cleanliness_pct", self.cleanliness_pct),
            ("decay.energy_pct", self.energy_pct),
            ("decay.love_pct", self.love_pct),
            ("decay.health_pct", self.health_pct),
        ] {
            check_range(field, i64::from(pct), 0, 100)?;
        }
        check_range(
            "decay.neglect_threshold",
            i64::from(self.neglect_threshold),
            0,
            i64::from(STAT_MAX),
        )
    }
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            hunger_pct: Self::default_hunger_pct(),
            happiness_pct: Self::default_happiness_pct(),
            cleanliness_pct: Self::default_cleanliness_pct(),
            energy_pct: Self::default_energy_pct(),
            love_pct: Self::default_love_pct(),
            health_pct: Self::default_health_pct(),
            neglect_threshold: Self::default_neglect_threshold(),
        }
    }
}

/// Live decay applied on each timer firing while a pet is on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickConfig {
    #[serde(default = "TickConfig::default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "TickConfig::default_hunger_loss")]
    pub hunger_loss: i32,
    #[serde(default = "TickConfig::default_cleanliness_loss")]
    pub cleanliness_loss: i32,
    #[serde(default = "TickConfig::default_energy_loss")]
    pub energy_loss: i32,
    #[serde(default = "TickConfig::default_love_loss")]
    pub love_loss: i32,
    #[serde(default = "TickConfig::default_happiness_loss")]
    pub happiness_loss: i32,
    #[serde(default = "TickConfig::default_happiness_chance")]
    pub happiness_chance: f64,
    #[serde(default = "TickConfig::default_health_loss")]
    pub health_loss: i32,
    #[serde(default = "TickConfig::default_neglect_threshold")]
    pub neglect_threshold: i32,
}

impl TickConfig {
    const fn default_interval_secs() -> u64 {
        TICK_INTERVAL_SECS
    }
    const fn default_hunger_loss() -> i32 {
        TICK_HUNGER_LOSS
    }
    const fn default_cleanliness_loss() -> i32 {
        TICK_CLEANLINESS_LOSS
    }
    const fn default_energy_loss() -> i32 {
        TICK_ENERGY_LOSS
    }
    const fn default_love_loss() -> i32 {
        TICK_LOVE_LOSS
    }
    const fn default_happiness_loss() -> i32 {
        TICK_HAPPINESS_LOSS
    }
    const fn default_happiness_chance() -> f64 {
        TICK_HAPPINESS_CHANCE
    }
    const fn default_health_loss() -> i32 {
        TICK_HEALTH_LOSS
    }
    const fn default_neglect_threshold() -> i32 {
        TICK_NEGLECT_THRESHOLD
    }

    #[must_use]
    pub const fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let interval = i64::try_from(self.interval_secs).unwrap_or(i64::MAX);
        check_range(
            "tick.interval_secs",
            interval,
            i64::try_from(TICK_INTERVAL_MIN_SECS).unwrap_or(0),
            i64::try_from(TICK_INTERVAL_MAX_SECS).unwrap_or(i64::MAX),
        )?;
        for (field, loss) in [
            ("tick.hunger_loss", self.hunger_loss),
            ("tick.cleanliness_loss", self.cleanliness_loss),
            ("tick.energy_loss", self.energy_loss),
            ("tick.love_loss", self.love_loss),
            ("tick.happiness_loss", self.happiness_loss),
            ("tick.health_loss", self.health_loss),
        ] {
            check_range(field, i64::from(loss), 0, i64::from(TICK_MAX_LOSS))?;
        }
        if !(0.0..=1.0).contains(&self.happiness_chance) {
            return Err(ConfigError::Probability {
                field: "tick.happiness_chance",
                value: self.happiness_chance,
            });
        }
        check_range(
            "tick.neglect_threshold",
            i64::from(self.neglect_threshold),
            0,
            i64::from(STAT_MAX),
        )
    }
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval_secs: Self::default_interval_secs(),
            hunger_loss: Self::default_hunger_loss(),
            cleanliness_loss: Self::default_cleanliness_loss(),
            energy_loss: Self::default_energy_loss(),
            love_loss: Self::default_love_loss(),
            happiness_loss: Self::default_happiness_loss(),
            happiness_chance: Self::default_happiness_chance(),
            health_loss: Self::default_health_loss(),
            neglect_threshold: Self::default_neglect_threshold(),
        }
    }
}

/// Price and stat effect of one care action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub cost: u64,
    #[serde(default)]
    pub effect: StatDelta,
}

impl ActionSpec {
    const fn new(cost: u64, effect: StatDelta) -> Self {
        Self { cost, effect }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionConfig {
    #[serde(default = "ActionConfig::default_feed")]
    pub feed: ActionSpec,
    #[serde(default = "ActionConfig::default_play")]
    pub play: ActionSpec,
    #[serde(default = "ActionConfig::default_clean")]
    pub clean: ActionSpec,
    #[serde(default = "ActionConfig::default_rest")]
    pub rest: ActionSpec,
    #[serde(default = "ActionConfig::default_vet")]
    pub vet: ActionSpec,
    #[serde(default = "ActionConfig::default_toy")]
    pub buy_toy: ActionSpec,
    /// Play is refused at or below this energy.
    #[serde(default = "ActionConfig::default_play_min_energy")]
    pub play_min_energy: i32,
}

impl ActionConfig {
    fn default_feed() -> ActionSpec {
        ActionSpec::new(
            FEED_COST,
            StatDelta::default()
                .with(Stat::Hunger, FEED_HUNGER)
                .with(Stat::Happiness, FEED_HAPPINESS),
        )
    }
    fn default_play() -> ActionSpec {
        ActionSpec::new(
            PLAY_COST,
            StatDelta::default()
                .with(Stat::Happiness, PLAY_HAPPINESS)
                .with(Stat::Energy, PLAY_ENERGY)
                .with(Stat::Hunger, PLAY_HUNGER),
        )
    }
    fn default_clean() -> ActionSpec {
        ActionSpec::new(
            CLEAN_COST,
            StatDelta::default()
                .with(Stat::Cleanliness, CLEAN_CLEANLINESS)
                .with(Stat::Happiness, CLEAN_HAPPINESS),
        )
    }
    fn default_rest() -> ActionSpec {
        ActionSpec::new(
            REST_COST,
            StatDelta::default()
                .with(Stat::Energy, REST_ENERGY)
                .with(Stat::Hunger, REST_HUNGER),
        )
    }
    fn default_vet() -> ActionSpec {
        ActionSpec::new(
            VET_COST,
            StatDelta {
                happiness: VET_HAPPINESS,
                health_override: Some(STAT_MAX),
                ..StatDelta::default()
            },
        )
    }
    fn default_toy() -> ActionSpec {
        ActionSpec::new(
            TOY_COST,
            StatDelta::default().with(Stat::Happiness, TOY_HAPPINESS),
        )
    }
    const fn default_play_min_energy() -> i32 {
        PLAY_MIN_ENERGY
    }
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            feed: Self::default_feed(),
            play: Self::default_play(),
            clean: Self::default_clean(),
            rest: Self::default_rest(),
            vet: Self::default_vet(),
            buy_toy: Self::default_toy(),
            play_min_energy: Self::default_play_min_energy(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardConfig {
    #[serde(default = "RewardConfig::default_easy")]
    pub easy: u64,
    #[serde(default = "RewardConfig::default_medium")]
    pub medium: u64,
    #[serde(default = "RewardConfig::default_hard")]
    pub hard: u64,
    #[serde(default = "RewardConfig::default_streak_bonus")]
    pub streak_bonus: u64,
    #[serde(default = "RewardConfig::default_streak_every")]
    pub streak_bonus_every_days: u32,
}

impl RewardConfig {
    const fn default_easy() -> u64 {
        REWARD_EASY
    }
    const fn default_medium() -> u64 {
        REWARD_MEDIUM
    }
    const fn default_hard() -> u64 {
        REWARD_HARD
    }
    const fn default_streak_bonus() -> u64 {
        STREAK_BONUS
    }
    const fn default_streak_every() -> u32 {
        STREAK_BONUS_EVERY_DAYS
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            easy: Self::default_easy(),
            medium: Self::default_medium(),
            hard: Self::default_hard(),
            streak_bonus: Self::default_streak_bonus(),
            streak_bonus_every_days: Self::default_streak_every(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementConfig {
    #[serde(default = "AchievementConfig::default_saver_balance")]
    pub saver_balance: u64,
    #[serde(default = "AchievementConfig::default_big_spender_total")]
    pub big_spender_total: u64,
    #[serde(default = "AchievementConfig::default_task_master_count")]
    pub task_master_count: u32,
    #[serde(default = "AchievementConfig::default_all_star_floor")]
    pub all_star_floor: i32,
}

impl AchievementConfig {
    const fn default_saver_balance() -> u64 {
        SAVER_BALANCE
    }
    const fn default_big_spender_total() -> u64 {
        BIG_SPENDER_TOTAL
    }
    const fn default_task_master_count() -> u32 {
        TASK_MASTER_COUNT
    }
    const fn default_all_star_floor() -> i32 {
        ALL_STAR_FLOOR
    }
}

impl Default for AchievementConfig {
    fn default() -> Self {
        Self {
            saver_balance: Self::default_saver_balance(),
            big_spender_total: Self::default_big_spender_total(),
            task_master_count: Self::default_task_master_count(),
            all_star_floor: Self::default_all_star_floor(),
        }
    }
}

/// Complete tuning for a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub decay: DecayConfig,
    #[serde(default)]
    pub tick: TickConfig,
    #[serde(default)]
    pub actions: ActionConfig,
    #[serde(default)]
    pub rewards: RewardConfig,
    #[serde(default)]
    pub achievements: AchievementConfig,
}

impl EngineConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the JSON is malformed or a value is out of range.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.decay.validate()?;
        self.tick.validate()?;
        check_range(
            "actions.play_min_energy",
            i64::from(self.actions.play_min_energy),
            0,
            i64::from(STAT_MAX),
        )?;
        if self.rewards.streak_bonus_every_days == 0 {
            return Err(ConfigError::StreakCadence);
        }
        Ok(())
    }
}
