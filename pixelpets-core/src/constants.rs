//! Centralized balance and tuning constants for the PixelPets care engine.
//!
//! These are the defaults behind [`crate::config::EngineConfig`]. Runtime
//! overrides go through the config layer; the numbers here are the canonical
//! six-stat tuning.

// Stat bounds ----------------------------------------------------------------
pub const STAT_MIN: i32 = 0;
pub const STAT_MAX: i32 = 100;
/// New pets start here rather than at the maximum so perfect-stat
/// achievements cannot unlock on adoption.
pub const STAT_NEUTRAL: i32 = 50;
/// Number of zeroed stats that ends a pet.
pub const PET_LOST_ZERO_STATS: usize = 3;
pub const PET_NAME_MAX_CHARS: usize = 24;

// Offline decay (percent of elapsed whole hours) -----------------------------
pub(crate) const OFFLINE_HUNGER_PCT: u32 = 100;
pub(crate) const OFFLINE_HAPPINESS_PCT: u32 = 50;
pub(crate) const OFFLINE_CLEANLINESS_PCT: u32 = 80;
pub(crate) const OFFLINE_ENERGY_PCT: u32 = 30;
pub(crate) const OFFLINE_LOVE_PCT: u32 = 40;
pub(crate) const OFFLINE_HEALTH_PCT: u32 = 20;
pub(crate) const OFFLINE_NEGLECT_THRESHOLD: i32 = 20;
pub const SECONDS_PER_HOUR: i64 = 3_600;

// Live tick decay -------------------------------------------------------------
pub(crate) const TICK_INTERVAL_SECS: u64 = 30;
pub(crate) const TICK_INTERVAL_MIN_SECS: u64 = 10;
pub(crate) const TICK_INTERVAL_MAX_SECS: u64 = 30;
pub(crate) const TICK_HUNGER_LOSS: i32 = 1;
pub(crate) const TICK_CLEANLINESS_LOSS: i32 = 1;
pub(crate) const TICK_ENERGY_LOSS: i32 = 1;
pub(crate) const TICK_LOVE_LOSS: i32 = 1;
pub(crate) const TICK_HAPPINESS_LOSS: i32 = 1;
pub(crate) const TICK_HAPPINESS_CHANCE: f64 = 0.3;
pub(crate) const TICK_HEALTH_LOSS: i32 = 1;
pub(crate) const TICK_NEGLECT_THRESHOLD: i32 = 15;
pub(crate) const TICK_MAX_LOSS: i32 = 5;

// Care actions ----------------------------------------------------------------
pub(crate) const FEED_COST: u64 = 10;
pub(crate) const FEED_HUNGER: i32 = 30;
pub(crate) const FEED_HAPPINESS: i32 = 5;
pub(crate) const PLAY_COST: u64 = 5;
pub(crate) const PLAY_HAPPINESS: i32 = 20;
pub(crate) const PLAY_ENERGY: i32 = -10;
pub(crate) const PLAY_HUNGER: i32 = -5;
pub(crate) const PLAY_MIN_ENERGY: i32 = 10;
pub(crate) const CLEAN_COST: u64 = 8;
pub(crate) const CLEAN_CLEANLINESS: i32 = 40;
pub(crate) const CLEAN_HAPPINESS: i32 = 10;
pub(crate) const REST_COST: u64 = 0;
pub(crate) const REST_ENERGY: i32 = 30;
pub(crate) const REST_HUNGER: i32 = -5;
pub(crate) const VET_COST: u64 = 50;
pub(crate) const VET_HAPPINESS: i32 = -10;
pub(crate) const TOY_COST: u64 = 25;
pub(crate) const TOY_HAPPINESS: i32 = 15;

// Rewards ---------------------------------------------------------------------
pub(crate) const REWARD_EASY: u64 = 5;
pub(crate) const REWARD_MEDIUM: u64 = 10;
pub(crate) const REWARD_HARD: u64 = 20;
pub(crate) const STREAK_BONUS: u64 = 25;
pub(crate) const STREAK_BONUS_EVERY_DAYS: u32 = 7;
pub const STARTING_BALANCE: u64 = 100;

// Achievements ----------------------------------------------------------------
pub(crate) const SAVER_BALANCE: u64 = 500;
pub(crate) const BIG_SPENDER_TOTAL: u64 = 500;
pub(crate) const TASK_MASTER_COUNT: u32 = 10;
pub(crate) const ALL_STAR_FLOOR: i32 = 90;
pub(crate) const STREAK_WEEK_DAYS: u32 = 7;

// Derived-state thresholds ----------------------------------------------------
pub(crate) const MOOD_SICK_HEALTH: i32 = 30;
pub(crate) const MOOD_SLEEPY_ENERGY: i32 = 20;
pub(crate) const MOOD_DISTRESSED_HUNGER: i32 = 20;
pub(crate) const MOOD_DIRTY_CLEANLINESS: i32 = 20;
pub(crate) const STATUS_CRITICAL_HEALTH: i32 = 20;
pub(crate) const STATUS_CRITICAL_OTHER: i32 = 15;
pub(crate) const STATUS_LOW_STAT: i32 = 30;
pub(crate) const STATUS_LOW_STAT_GATE: usize = 2;
