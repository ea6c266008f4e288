//! Reward tasks earned through quiz answers, and the daily care streak.
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::RewardConfig;
use crate::error::ValidationError;
use crate::ids::{TaskId, UserId};
use crate::ledger::Coins;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    #[must_use]
    pub const fn reward(self, cfg: &RewardConfig) -> Coins {
        match self {
            Self::Easy => cfg.easy,
            Self::Medium => cfg.medium,
            Self::Hard => cfg.hard,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub owner: UserId,
    pub label: String,
    pub difficulty: Difficulty,
    pub reward: Coins,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a batch of pending tasks sharing one difficulty.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyTaskBatch`] when no non-blank label is given.
    pub fn batch<I, S>(
        owner: UserId,
        labels: I,
        difficulty: Difficulty,
        rewards: &RewardConfig,
        now: DateTime<Utc>,
    ) -> Result<Vec<Self>, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let reward = difficulty.reward(rewards);
        let tasks: Vec<Self> = labels
            .into_iter()
            .filter_map(|label| {
                let label = label.as_ref().trim();
                (!label.is_empty()).then(|| Self {
                    id: TaskId::new(),
                    owner,
                    label: label.to_string(),
                    difficulty,
                    reward,
                    completed: false,
                    completed_at: None,
                    created_at: now,
                })
            })
            .collect();
        if tasks.is_empty() {
            return Err(ValidationError::EmptyTaskBatch);
        }
        Ok(tasks)
    }

    /// Flip to completed exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TaskAlreadyCompleted`] on a second call.
    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.completed {
            return Err(ValidationError::TaskAlreadyCompleted);
        }
        self.completed = true;
        self.completed_at = Some(at);
        Ok(())
    }
}

/// Consecutive UTC days with at least one care action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CareStreak {
    pub current: u32,
    pub longest: u32,
    pub last_day: Option<NaiveDate>,
}

impl CareStreak {
    /// Record care on `day`. Returns true when the streak grew.
    pub fn record(&mut self, day: NaiveDate) -> bool {
        match self.last_day {
            Some(last) if last == day => return false,
            Some(last) if last.succ_opt() == Some(day) => self.current += 1,
            Some(last) if day < last => return false,
            _ => self.current = 1,
        }
        self.last_day = Some(day);
        self.longest = self.longest.max(self.current);
        true
    }

    /// Bonus owed when the streak just reached a multiple of the cadence.
    #[must_use]
    pub const fn bonus_due(&self, cfg: &RewardConfig) -> Option<Coins> {
        if self.current > 0
            && cfg.streak_bonus_every_days > 0
            && self.current % cfg.streak_bonus_every_days == 0
            && cfg.streak_bonus > 0
        {
            Some(cfg.streak_bonus)
        } else {
            None
        }
    }
}
