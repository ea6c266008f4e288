//! Stat loss from the passage of time.
//!
//! Two regimes share this module:
//!
//! * **Offline catch-up** runs once when a pet is loaded and charges whole
//!   elapsed hours since `last_updated`. The sub-hour remainder is carried
//!   forward by advancing `last_updated` by exactly the charged hours, so two
//!   loads inside the same hour never double-charge.
//! * **Live ticks** run on a fixed interval while the pet is on screen and
//!   apply small flat decrements, with happiness loss drawn at a configured
//!   probability.
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{DecayConfig, TickConfig};
use crate::constants::SECONDS_PER_HOUR;
use crate::numbers::{clamp_i64_to_u32, scale_units_floor};
use crate::pet::Pet;
use crate::stats::{StatDelta, StatVector};

/// Result of a catch-up pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineDecay {
    /// Whole hours charged.
    pub units: u32,
    /// Change actually applied after clamping.
    pub applied: StatDelta,
    /// Hunger or cleanliness was under the neglect threshold before the step,
    /// so health was charged (possibly zero for short absences).
    pub neglected: bool,
}

fn is_neglected(stats: &StatVector, threshold: i32) -> bool {
    stats.hunger < threshold || stats.cleanliness < threshold
}

/// Whole hours between `last_updated` and `now`. Clock skew counts as zero.
#[must_use]
pub fn elapsed_units(last_updated: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let seconds = (now - last_updated).num_seconds();
    clamp_i64_to_u32(seconds / SECONDS_PER_HOUR)
}

/// Raw (unclamped) catch-up delta for `units` elapsed hours.
#[must_use]
pub fn offline_delta(stats: &StatVector, units: u32, cfg: &DecayConfig) -> StatDelta {
    let neglected = is_neglected(stats, cfg.neglect_threshold);
    StatDelta {
        hunger: -scale_units_floor(units, cfg.hunger_pct),
        happiness: -scale_units_floor(units, cfg.happiness_pct),
        energy: -scale_units_floor(units, cfg.energy_pct),
        cleanliness: -scale_units_floor(units, cfg.cleanliness_pct),
        health: if neglected {
            -scale_units_floor(units, cfg.health_pct)
        } else {
            0
        },
        love: -scale_units_floor(units, cfg.love_pct),
        health_override: None,
    }
}

/// Apply catch-up decay to a freshly loaded pet.
///
/// Returns `None` when nothing was charged: `last_updated` was never set (it is
/// initialised to `now` instead), or less than one hour has passed.
pub fn apply_offline_decay(
    pet: &mut Pet,
    now: DateTime<Utc>,
    cfg: &DecayConfig,
) -> Option<OfflineDecay> {
    let Some(last_updated) = pet.last_updated else {
        pet.last_updated = Some(now);
        return None;
    };
    let units = elapsed_units(last_updated, now);
    if units == 0 {
        return None;
    }
    let neglected = is_neglected(&pet.stats, cfg.neglect_threshold);
    let delta = offline_delta(&pet.stats, units, cfg);
    let applied = pet.stats.apply(&delta);
    pet.last_updated = Some(last_updated + Duration::hours(i64::from(units)));
    log::debug!(
        "offline decay for pet {}: {units}h charged, applied {applied:?}",
        pet.id
    );
    Some(OfflineDecay {
        units,
        applied,
        neglected,
    })
}

/// Raw (unclamped) delta for one live tick.
pub fn tick_delta<R: Rng + ?Sized>(stats: &StatVector, cfg: &TickConfig, rng: &mut R) -> StatDelta {
    let neglected = is_neglected(stats, cfg.neglect_threshold);
    let sad = cfg.happiness_chance > 0.0 && rng.gen_bool(cfg.happiness_chance);
    StatDelta {
        hunger: -cfg.hunger_loss,
        happiness: if sad { -cfg.happiness_loss } else { 0 },
        energy: -cfg.energy_loss,
        cleanliness: -cfg.cleanliness_loss,
        health: if neglected { -cfg.health_loss } else { 0 },
        love: -cfg.love_loss,
        health_override: None,
    }
}

/// Apply one live tick and stamp `last_updated`. Returns the clamped change.
pub fn apply_tick<R: Rng + ?Sized>(
    pet: &mut Pet,
    now: DateTime<Utc>,
    cfg: &TickConfig,
    rng: &mut R,
) -> StatDelta {
    let delta = tick_delta(&pet.stats, cfg, rng);
    let applied = pet.stats.apply(&delta);
    pet.last_updated = Some(now);
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::UserId;
    use crate::pet::Species;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn pet_with(stats: StatVector, last_updated: DateTime<Utc>) -> Pet {
        let mut pet = Pet::adopt(UserId::new(), "Mochi", Species::Cat, last_updated).unwrap();
        pet.stats = stats;
        pet
    }

    #[test]
    fn three_hours_at_fifty() {
        let now = Utc::now();
        let mut pet = pet_with(StatVector::uniform(50), now - Duration::hours(3));
        let decay = apply_offline_decay(&mut pet, now, &DecayConfig::default()).unwrap();

        assert_eq!(decay.units, 3);
        assert_eq!(pet.stats.hunger, 47);
        assert_eq!(pet.stats.happiness, 49);
        assert_eq!(pet.stats.cleanliness, 48);
        assert_eq!(pet.stats.energy, 50);
        assert_eq!(pet.stats.love, 49);
        assert_eq!(pet.stats.health, 50);
        assert!(!decay.neglected);
        assert_eq!(pet.last_updated, Some(now));
    }

    #[test]
    fn health_decays_only_when_neglected_before_the_step() {
        let now = Utc::now();
        let stats = StatVector {
            hunger: 19,
            ..StatVector::uniform(60)
        };
        let mut pet = pet_with(stats, now - Duration::hours(10));
        let decay = apply_offline_decay(&mut pet, now, &DecayConfig::default()).unwrap();
        assert!(decay.neglected);
        assert_eq!(pet.stats.health, 58);
        assert_eq!(pet.stats.hunger, 9);

        // Hunger drops below 20 during the step but started above it.
        let stats = StatVector {
            hunger: 25,
            ..StatVector::uniform(60)
        };
        let mut pet = pet_with(stats, now - Duration::hours(10));
        apply_offline_decay(&mut pet, now, &DecayConfig::default()).unwrap();
        assert_eq!(pet.stats.hunger, 15);
        assert_eq!(pet.stats.health, 60);
    }

    #[test]
    fn short_neglect_is_flagged_before_health_moves() {
        let now = Utc::now();
        let stats = StatVector {
            cleanliness: 10,
            ..StatVector::uniform(60)
        };
        let mut pet = pet_with(stats, now - Duration::hours(3));
        let decay = apply_offline_decay(&mut pet, now, &DecayConfig::default()).unwrap();
        assert!(decay.neglected);
        assert_eq!(decay.applied.health, 0);
        assert_eq!(pet.stats.health, 60);
    }

    #[test]
    fn under_an_hour_is_a_no_op_and_keeps_the_timestamp() {
        let now = Utc::now();
        let last = now - Duration::minutes(59);
        let mut pet = pet_with(StatVector::uniform(50), last);
        assert!(apply_offline_decay(&mut pet, now, &DecayConfig::default()).is_none());
        assert_eq!(pet.last_updated, Some(last));
        assert_eq!(pet.stats, StatVector::uniform(50));
    }

    #[test]
    fn remainder_carries_so_reloads_do_not_double_charge() {
        let now = Utc::now();
        let mut pet = pet_with(StatVector::uniform(80), now - Duration::minutes(150));
        let first = apply_offline_decay(&mut pet, now, &DecayConfig::default()).unwrap();
        assert_eq!(first.units, 2);
        assert_eq!(pet.last_updated, Some(now - Duration::minutes(30)));

        let snapshot = pet.stats;
        assert!(
            apply_offline_decay(&mut pet, now + Duration::minutes(10), &DecayConfig::default())
                .is_none()
        );
        assert_eq!(pet.stats, snapshot);

        // The carried half hour completes an hour 30 minutes later.
        let later =
            apply_offline_decay(&mut pet, now + Duration::minutes(30), &DecayConfig::default())
                .unwrap();
        assert_eq!(later.units, 1);
    }

    #[test]
    fn uninitialised_timestamp_is_set_without_decay() {
        let now = Utc::now();
        let mut pet = pet_with(StatVector::uniform(50), now);
        pet.last_updated = None;
        assert!(apply_offline_decay(&mut pet, now, &DecayConfig::default()).is_none());
        assert_eq!(pet.last_updated, Some(now));
        assert_eq!(pet.stats, StatVector::uniform(50));
    }

    #[test]
    fn future_timestamp_is_ignored() {
        let now = Utc::now();
        let mut pet = pet_with(StatVector::uniform(50), now + Duration::hours(5));
        assert!(apply_offline_decay(&mut pet, now, &DecayConfig::default()).is_none());
    }

    #[test]
    fn long_absence_clamps_to_zero() {
        let now = Utc::now();
        let mut pet = pet_with(StatVector::uniform(50), now - Duration::days(30));
        apply_offline_decay(&mut pet, now, &DecayConfig::default()).unwrap();
        assert!(pet.stats.in_bounds());
        assert_eq!(pet.stats.hunger, 0);
        assert_eq!(pet.stats.cleanliness, 0);
    }

    #[test]
    fn tick_applies_flat_losses() {
        let cfg = TickConfig {
            happiness_chance: 0.0,
            ..TickConfig::default()
        };
        let mut rng = SmallRng::seed_from_u64(1);
        let now = Utc::now();
        let mut pet = pet_with(StatVector::uniform(50), now);
        let applied = apply_tick(&mut pet, now, &cfg, &mut rng);
        assert_eq!(applied.hunger, -1);
        assert_eq!(applied.cleanliness, -1);
        assert_eq!(applied.energy, -1);
        assert_eq!(applied.love, -1);
        assert_eq!(applied.happiness, 0);
        assert_eq!(applied.health, 0);
    }

    #[test]
    fn tick_hits_health_when_starving() {
        let cfg = TickConfig {
            happiness_chance: 1.0,
            ..TickConfig::default()
        };
        let mut rng = SmallRng::seed_from_u64(2);
        let stats = StatVector {
            cleanliness: 14,
            ..StatVector::uniform(50)
        };
        let delta = tick_delta(&stats, &cfg, &mut rng);
        assert_eq!(delta.health, -1);
        assert_eq!(delta.happiness, -1);
    }
}
