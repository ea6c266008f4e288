//! Pure projections from the stat vector and ledger to UI-facing values.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashSet;
use std::fmt;

use crate::config::AchievementConfig;
use crate::constants::{
    MOOD_DIRTY_CLEANLINESS, MOOD_DISTRESSED_HUNGER, MOOD_SICK_HEALTH, MOOD_SLEEPY_ENERGY,
    STAT_MAX, STATUS_CRITICAL_HEALTH, STATUS_CRITICAL_OTHER, STATUS_LOW_STAT,
    STATUS_LOW_STAT_GATE, STREAK_WEEK_DAYS,
};
use crate::ids::{PetId, UserId};
use crate::ledger::UserFinances;
use crate::stats::{Stat, StatVector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Sick,
    Sleepy,
    Distressed,
    Dirty,
    Ecstatic,
    Joyful,
    Happy,
    Content,
    Bored,
    Sad,
    Miserable,
}

impl Mood {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sick => "sick",
            Self::Sleepy => "sleepy",
            Self::Distressed => "distressed",
            Self::Dirty => "dirty",
            Self::Ecstatic => "ecstatic",
            Self::Joyful => "joyful",
            Self::Happy => "happy",
            Self::Content => "content",
            Self::Bored => "bored",
            Self::Sad => "sad",
            Self::Miserable => "miserable",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Descending average ladder; first strictly-greater threshold wins.
const MOOD_LADDER: [(f64, Mood); 6] = [
    (90.0, Mood::Ecstatic),
    (85.0, Mood::Joyful),
    (70.0, Mood::Happy),
    (50.0, Mood::Content),
    (30.0, Mood::Bored),
    (15.0, Mood::Sad),
];

#[must_use]
pub fn mood(stats: &StatVector) -> Mood {
    if stats.health < MOOD_SICK_HEALTH {
        return Mood::Sick;
    }
    if stats.energy < MOOD_SLEEPY_ENERGY {
        return Mood::Sleepy;
    }
    if stats.hunger < MOOD_DISTRESSED_HUNGER {
        return Mood::Distressed;
    }
    if stats.cleanliness < MOOD_DIRTY_CLEANLINESS {
        return Mood::Dirty;
    }
    let average = stats.care_average();
    MOOD_LADDER
        .iter()
        .find(|(threshold, _)| average > *threshold)
        .map_or(Mood::Miserable, |(_, mood)| *mood)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    NeedsVet,
    Starving,
    Filthy,
    Exhausted,
    NeedsAttention,
    Thriving,
    DoingWell,
    Okay,
    Struggling,
}

impl Status {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NeedsVet => "Feeling very sick. A vet visit would help!",
            Self::Starving => "Starving! Please feed me.",
            Self::Filthy => "Really needs a bath.",
            Self::Exhausted => "Too exhausted to do anything.",
            Self::NeedsAttention => "Needs some attention.",
            Self::Thriving => "Thriving and full of life!",
            Self::DoingWell => "Doing well.",
            Self::Okay => "Doing okay.",
            Self::Struggling => "Struggling a bit.",
        }
    }

    #[must_use]
    pub const fn is_critical(self) -> bool {
        matches!(
            self,
            Self::NeedsVet | Self::Starving | Self::Filthy | Self::Exhausted
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

const STATUS_LADDER: [(f64, Status); 3] = [
    (80.0, Status::Thriving),
    (60.0, Status::DoingWell),
    (40.0, Status::Okay),
];

#[must_use]
pub fn status(stats: &StatVector) -> Status {
    if stats.health < STATUS_CRITICAL_HEALTH {
        return Status::NeedsVet;
    }
    if stats.hunger < STATUS_CRITICAL_OTHER {
        return Status::Starving;
    }
    if stats.cleanliness < STATUS_CRITICAL_OTHER {
        return Status::Filthy;
    }
    if stats.energy < STATUS_CRITICAL_OTHER {
        return Status::Exhausted;
    }
    if stats.count_below(STATUS_LOW_STAT) >= STATUS_LOW_STAT_GATE {
        return Status::NeedsAttention;
    }
    let average = stats.care_average();
    STATUS_LADDER
        .iter()
        .find(|(threshold, _)| average > *threshold)
        .map_or(Status::Struggling, |(_, status)| *status)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementScope {
    Global,
    Pet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementId {
    FirstTask,
    TaskMaster,
    Saver,
    BigSpender,
    StreakWeek,
    LuckyFind,
    WellFed,
    Joyful,
    Spotless,
    WellRested,
    PictureOfHealth,
    Beloved,
    AllStar,
}

impl AchievementId {
    pub const ALL: [Self; 13] = [
        Self::FirstTask,
        Self::TaskMaster,
        Self::Saver,
        Self::BigSpender,
        Self::StreakWeek,
        Self::LuckyFind,
        Self::WellFed,
        Self::Joyful,
        Self::Spotless,
        Self::WellRested,
        Self::PictureOfHealth,
        Self::Beloved,
        Self::AllStar,
    ];

    #[must_use]
    pub const fn scope(self) -> AchievementScope {
        match self {
            Self::FirstTask
            | Self::TaskMaster
            | Self::Saver
            | Self::BigSpender
            | Self::StreakWeek
            | Self::LuckyFind => AchievementScope::Global,
            _ => AchievementScope::Pet,
        }
    }

    /// Stat-based achievements wait for a first completed task.
    #[must_use]
    pub const fn is_stat_based(self) -> bool {
        matches!(self.scope(), AchievementScope::Pet)
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::FirstTask => "First Task",
            Self::TaskMaster => "Task Master",
            Self::Saver => "Super Saver",
            Self::BigSpender => "Big Spender",
            Self::StreakWeek => "Week Streak",
            Self::LuckyFind => "Lucky Find",
            Self::WellFed => "Well Fed",
            Self::Joyful => "Pure Joy",
            Self::Spotless => "Spotless",
            Self::WellRested => "Well Rested",
            Self::PictureOfHealth => "Picture of Health",
            Self::Beloved => "Beloved",
            Self::AllStar => "All Star",
        }
    }

    fn satisfied(self, ctx: &AchievementContext<'_>, cfg: &AchievementConfig) -> bool {
        let stats = ctx.stats;
        match self {
            Self::FirstTask => ctx.tasks_completed >= 1,
            Self::TaskMaster => ctx.tasks_completed >= cfg.task_master_count,
            Self::Saver => ctx.finances.balance >= cfg.saver_balance,
            Self::BigSpender => ctx.finances.total_spent >= cfg.big_spender_total,
            Self::StreakWeek => ctx.longest_streak >= STREAK_WEEK_DAYS,
            Self::LuckyFind => ctx.owns_legendary,
            Self::WellFed => stats.hunger >= STAT_MAX,
            Self::Joyful => stats.happiness >= STAT_MAX,
            Self::Spotless => stats.cleanliness >= STAT_MAX,
            Self::WellRested => stats.energy >= STAT_MAX,
            Self::PictureOfHealth => stats.health >= STAT_MAX,
            Self::Beloved => stats.love >= STAT_MAX,
            Self::AllStar => Stat::ALL
                .iter()
                .all(|stat| stats.get(*stat) >= cfg.all_star_floor),
        }
    }
}

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Persisted unlock row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub owner: UserId,
    /// Set only for pet-scoped achievements.
    pub pet: Option<PetId>,
    pub id: AchievementId,
    pub unlocked_at: DateTime<Utc>,
}

impl Achievement {
    #[must_use]
    pub const fn key(&self) -> AchievementKey {
        AchievementKey {
            id: self.id,
            pet: self.pet,
        }
    }
}

/// Uniqueness key within one user: `(id)` for global, `(id, pet)` for pet-scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AchievementKey {
    pub id: AchievementId,
    pub pet: Option<PetId>,
}

impl AchievementKey {
    #[must_use]
    pub const fn for_pet(id: AchievementId, pet: PetId) -> Self {
        let pet = match id.scope() {
            AchievementScope::Global => None,
            AchievementScope::Pet => Some(pet),
        };
        Self { id, pet }
    }
}

/// Inputs the achievement table reads.
#[derive(Debug, Clone, Copy)]
pub struct AchievementContext<'a> {
    pub pet: PetId,
    pub stats: &'a StatVector,
    pub finances: &'a UserFinances,
    pub tasks_completed: u32,
    pub longest_streak: u32,
    pub owns_legendary: bool,
}

pub type Unlocks = SmallVec<[AchievementKey; 4]>;

/// Session-local memory of what is already recorded and already shown.
#[derive(Debug, Clone, Default)]
pub struct AchievementTracker {
    recorded: HashSet<AchievementKey>,
    shown: HashSet<AchievementKey>,
}

impl AchievementTracker {
    /// Seed from rows already persisted for this user; those are never re-notified.
    #[must_use]
    pub fn from_recorded<'a>(rows: impl IntoIterator<Item = &'a Achievement>) -> Self {
        let recorded: HashSet<_> = rows.into_iter().map(Achievement::key).collect();
        Self {
            shown: recorded.clone(),
            recorded,
        }
    }

    /// Newly satisfied keys not yet recorded. Marks them recorded.
    pub fn evaluate(&mut self, ctx: &AchievementContext<'_>, cfg: &AchievementConfig) -> Unlocks {
        let stat_gate_open = ctx.tasks_completed >= 1;
        let mut unlocks = Unlocks::new();
        for id in AchievementId::ALL {
            if id.is_stat_based() && !stat_gate_open {
                continue;
            }
            let key = AchievementKey::for_pet(id, ctx.pet);
            if self.recorded.contains(&key) || !id.satisfied(ctx, cfg) {
                continue;
            }
            self.recorded.insert(key);
            unlocks.push(key);
        }
        unlocks
    }

    /// Returns true the first time a key is shown this session.
    pub fn mark_shown(&mut self, key: AchievementKey) -> bool {
        self.shown.insert(key)
    }

    /// Forget a recorded key so a later evaluation can retry it.
    pub fn forget(&mut self, key: &AchievementKey) {
        self.recorded.remove(key);
    }
}
