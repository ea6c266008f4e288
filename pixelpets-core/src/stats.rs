//! The six bounded attributes of a pet and the deltas that move them.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{STAT_MAX, STAT_MIN, STAT_NEUTRAL};
use crate::numbers::mean_i32;

/// Clamp a raw stat value into `[0, 100]`.
#[must_use]
pub const fn clamp_stat(value: i32) -> i32 {
    if value < STAT_MIN {
        STAT_MIN
    } else if value > STAT_MAX {
        STAT_MAX
    } else {
        value
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stat {
    Hunger,
    Happiness,
    Energy,
    Cleanliness,
    Health,
    Love,
}

impl Stat {
    pub const ALL: [Self; 6] = [
        Self::Hunger,
        Self::Happiness,
        Self::Energy,
        Self::Cleanliness,
        Self::Health,
        Self::Love,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hunger => "hunger",
            Self::Happiness => "happiness",
            Self::Energy => "energy",
            Self::Cleanliness => "cleanliness",
            Self::Health => "health",
            Self::Love => "love",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stat| stat.as_str() == s)
            .ok_or(())
    }
}

/// Hunger here is a fullness meter: 100 means fully fed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatVector {
    pub hunger: i32,
    pub happiness: i32,
    pub energy: i32,
    pub cleanliness: i32,
    pub health: i32,
    #[serde(default = "StatVector::neutral_value")]
    pub love: i32,
}

impl Default for StatVector {
    fn default() -> Self {
        Self::neutral()
    }
}

impl StatVector {
    const fn neutral_value() -> i32 {
        STAT_NEUTRAL
    }

    /// Every stat at the adoption value.
    #[must_use]
    pub const fn neutral() -> Self {
        Self::uniform(STAT_NEUTRAL)
    }

    #[must_use]
    pub const fn uniform(value: i32) -> Self {
        let value = clamp_stat(value);
        Self {
            hunger: value,
            happiness: value,
            energy: value,
            cleanliness: value,
            health: value,
            love: value,
        }
    }

    #[must_use]
    pub const fn get(&self, stat: Stat) -> i32 {
        match stat {
            Stat::Hunger => self.hunger,
            Stat::Happiness => self.happiness,
            Stat::Energy => self.energy,
            Stat::Cleanliness => self.cleanliness,
            Stat::Health => self.health,
            Stat::Love => self.love,
        }
    }

    /// Set a stat, clamping to bounds.
    pub const fn set(&mut self, stat: Stat, value: i32) {
        let value = clamp_stat(value);
        match stat {
            Stat::Hunger => self.hunger = value,
            Stat::Happiness => self.happiness = value,
            Stat::Energy => self.energy = value,
            Stat::Cleanliness => self.cleanliness = value,
            Stat::Health => self.health = value,
            Stat::Love => self.love = value,
        }
    }

    /// Clamp every field into bounds.
    pub fn clamp(&mut self) {
        for stat in Stat::ALL {
            self.set(stat, self.get(stat));
        }
    }

    /// Apply a delta and clamp. Returns the change actually applied after clamping.
    pub fn apply(&mut self, delta: &StatDelta) -> StatDelta {
        let before = *self;
        for stat in Stat::ALL {
            let change = delta.get(stat);
            if change != 0 {
                self.set(stat, self.get(stat).saturating_add(change));
            }
        }
        if let Some(value) = delta.health_override {
            self.health = clamp_stat(value);
        }
        self.diff_from(&before)
    }

    /// Field-wise `self - before`.
    #[must_use]
    pub fn diff_from(&self, before: &Self) -> StatDelta {
        let mut delta = StatDelta::default();
        for stat in Stat::ALL {
            delta.set(stat, self.get(stat) - before.get(stat));
        }
        delta
    }

    #[must_use]
    pub fn zeroed_count(&self) -> usize {
        Stat::ALL.iter().filter(|stat| self.get(**stat) == STAT_MIN).count()
    }

    #[must_use]
    pub fn count_below(&self, threshold: i32) -> usize {
        Stat::ALL
            .iter()
            .filter(|stat| self.get(**stat) < threshold)
            .count()
    }

    /// Mean of the five core care stats; love is excluded from mood math.
    #[must_use]
    pub fn care_average(&self) -> f64 {
        mean_i32(&[
            self.hunger,
            self.happiness,
            self.energy,
            self.cleanliness,
            self.health,
        ])
    }

    #[must_use]
    pub fn in_bounds(&self) -> bool {
        Stat::ALL
            .iter()
            .all(|stat| (STAT_MIN..=STAT_MAX).contains(&self.get(*stat)))
    }
}

/// Signed per-stat change. `health_override` sets health outright (vet visits).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatDelta {
    #[serde(default)]
    pub hunger: i32,
    #[serde(default)]
    pub happiness: i32,
    #[serde(default)]
    pub energy: i32,
    #[serde(default)]
    pub cleanliness: i32,
    #[serde(default)]
    pub health: i32,
    #[serde(default)]
    pub love: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_override: Option<i32>,
}

impl StatDelta {
    #[must_use]
    pub const fn get(&self, stat: Stat) -> i32 {
        match stat {
            Stat::Hunger => self.hunger,
            Stat::Happiness => self.happiness,
            Stat::Energy => self.energy,
            Stat::Cleanliness => self.cleanliness,
            Stat::Health => self.health,
            Stat::Love => self.love,
        }
    }

    pub const fn set(&mut self, stat: Stat, value: i32) {
        match stat {
            Stat::Hunger => self.hunger = value,
            Stat::Happiness => self.happiness = value,
            Stat::Energy => self.energy = value,
            Stat::Cleanliness => self.cleanliness = value,
            Stat::Health => self.health = value,
            Stat::Love => self.love = value,
        }
    }

    #[must_use]
    pub const fn with(mut self, stat: Stat, value: i32) -> Self {
        self.set(stat, value);
        self
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.health_override.is_none() && Stat::ALL.iter().all(|stat| self.get(*stat) == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_clamps_both_ends() {
        let mut stats = StatVector::uniform(95);
        let applied = stats.apply(&StatDelta::default().with(Stat::Hunger, 30));
        assert_eq!(stats.hunger, 100);
        assert_eq!(applied.hunger, 5);

        let mut stats = StatVector::uniform(3);
        stats.apply(&StatDelta::default().with(Stat::Energy, -10));
        assert_eq!(stats.energy, 0);
        assert!(stats.in_bounds());
    }

    #[test]
    fn health_override_wins_over_delta() {
        let mut stats = StatVector::uniform(40);
        let delta = StatDelta {
            health: -20,
            health_override: Some(100),
            ..StatDelta::default()
        };
        stats.apply(&delta);
        assert_eq!(stats.health, 100);
    }

    #[test]
    fn saturating_delta_does_not_overflow() {
        let mut stats = StatVector::neutral();
        stats.apply(&StatDelta::default().with(Stat::Love, i32::MAX));
        assert_eq!(stats.love, 100);
        stats.apply(&StatDelta::default().with(Stat::Love, i32::MIN));
        assert_eq!(stats.love, 0);
    }

    #[test]
    fn zero_count_and_average() {
        let stats = StatVector {
            hunger: 0,
            happiness: 0,
            energy: 0,
            cleanliness: 50,
            health: 100,
            love: 10,
        };
        assert_eq!(stats.zeroed_count(), 3);
        assert_eq!(stats.count_below(30), 4);
        assert!((stats.care_average() - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn legacy_rows_without_love_default_to_neutral() {
        let json = r#"{"hunger":10,"happiness":20,"energy":30,"cleanliness":40,"health":50}"#;
        let stats: StatVector = serde_json::from_str(json).unwrap();
        assert_eq!(stats.love, STAT_NEUTRAL);
    }

    #[test]
    fn stat_names_roundtrip_through_from_str() {
        for stat in Stat::ALL {
            assert_eq!(stat.as_str().parse::<Stat>(), Ok(stat));
        }
        assert!("mana".parse::<Stat>().is_err());
    }
}
