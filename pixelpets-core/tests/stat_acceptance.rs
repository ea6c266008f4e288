use chrono::{Duration, Utc};
use pixelpets_core::config::{ActionConfig, DecayConfig, TickConfig};
use pixelpets_core::decay::tick_delta;
use pixelpets_core::{
    CareAction, Pet, Rarity, Species, StatVector, UserId, apply_offline_decay, apply_tick,
    draw_toy, resolve_action, status,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::collections::BTreeMap;
use std::convert::TryFrom;

const SAMPLE_SIZE: usize = 5000;
const TOLERANCE: f64 = 0.025;

fn rate(hits: usize) -> f64 {
    let hits = u32::try_from(hits).expect("count fits");
    let total = u32::try_from(SAMPLE_SIZE).expect("sample size fits u32");
    f64::from(hits) / f64::from(total)
}

#[test]
fn tick_happiness_loss_tracks_configured_chance() {
    let cfg = TickConfig::default();
    let stats = StatVector::uniform(80);
    let mut rng = SmallRng::seed_from_u64(0xC0FFEE);
    let sad = (0..SAMPLE_SIZE)
        .filter(|_| tick_delta(&stats, &cfg, &mut rng).happiness < 0)
        .count();
    let observed = rate(sad);
    assert!(
        (observed - cfg.happiness_chance).abs() <= TOLERANCE,
        "happiness loss rate drifted: observed {observed:.4}"
    );
}

#[test]
fn toy_rarity_matches_weights() {
    let mut rng = SmallRng::seed_from_u64(2024);
    let mut counts: BTreeMap<Rarity, usize> = BTreeMap::new();
    for _ in 0..SAMPLE_SIZE {
        *counts.entry(draw_toy(&mut rng).rarity).or_default() += 1;
    }
    for (rarity, expected) in [
        (Rarity::Common, 0.50),
        (Rarity::Rare, 0.25),
        (Rarity::Epic, 0.15),
        (Rarity::Legendary, 0.10),
    ] {
        let observed = rate(counts.get(&rarity).copied().unwrap_or(0));
        assert!(
            (observed - expected).abs() <= TOLERANCE,
            "{rarity} rate drifted: observed {observed:.4}"
        );
    }
}

#[test]
fn random_care_never_leaves_bounds() {
    let actions = ActionConfig::default();
    let tick = TickConfig::default();
    let decay = DecayConfig::default();
    let mut rng = ChaCha20Rng::seed_from_u64(77);
    let start = Utc::now();
    let mut pet = Pet::adopt(UserId::new(), "Sweep", Species::Bird, start).unwrap();
    let mut now = start;

    for step in 0..SAMPLE_SIZE {
        match rng.gen_range(0..10) {
            0..=5 => {
                let action = CareAction::ALL[rng.gen_range(0..CareAction::ALL.len())];
                if let Ok(outcome) = resolve_action(action, &pet.stats, 1_000, &actions, &mut rng)
                {
                    pet.stats = outcome.stats;
                }
            }
            6..=8 => {
                now += Duration::seconds(30);
                apply_tick(&mut pet, now, &tick, &mut rng);
            }
            _ => {
                now += Duration::minutes(rng.gen_range(0..600));
                apply_offline_decay(&mut pet, now, &decay);
            }
        }
        assert!(pet.stats.in_bounds(), "out of bounds at step {step}: {:?}", pet.stats);
        let _ = status(&pet.stats);
    }
}

#[test]
fn rejected_actions_never_mutate() {
    let cfg = ActionConfig::default();
    let mut rng = SmallRng::seed_from_u64(5);
    let mut full = StatVector::uniform(70);
    full.hunger = 100;
    assert!(resolve_action(CareAction::Feed, &full, 100, &cfg, &mut rng).is_err());
    let mut tired = StatVector::uniform(70);
    tired.energy = 10;
    assert!(resolve_action(CareAction::Play, &tired, 100, &cfg, &mut rng).is_err());
    for action in CareAction::ALL {
        let cost = action.spec(&cfg).cost;
        if cost == 0 {
            continue;
        }
        let stats = StatVector::uniform(50);
        let result = resolve_action(action, &stats, cost - 1, &cfg, &mut rng);
        assert!(result.is_err(), "{action} accepted without funds");
        assert_eq!(stats, StatVector::uniform(50));
    }
}
