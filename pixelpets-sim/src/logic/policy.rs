use std::fmt;

use pixelpets_core::{CareAction, SessionView};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;

/// Decision returned by a [`CaretakerPolicy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CareDecision {
    pub action: Option<CareAction>,
    pub rationale: &'static str,
}

impl CareDecision {
    #[must_use]
    pub const fn act(action: CareAction, rationale: &'static str) -> Self {
        Self {
            action: Some(action),
            rationale,
        }
    }

    #[must_use]
    pub const fn wait(rationale: &'static str) -> Self {
        Self {
            action: None,
            rationale,
        }
    }
}

/// Policy interface for automated caretakers.
pub trait CaretakerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Pick the next care action, if any, from what the player would see.
    fn decide(&mut self, view: &SessionView) -> CareDecision;
}

/// Built-in caretaker behaviours for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum CareStrategy {
    Attentive,
    Frugal,
    Spendthrift,
    Neglectful,
    Erratic,
}

impl CareStrategy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Attentive => "Attentive",
            Self::Frugal => "Frugal",
            Self::Spendthrift => "Spendthrift",
            Self::Neglectful => "Neglectful",
            Self::Erratic => "Erratic",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn CaretakerPolicy + Send> {
        match self {
            Self::Attentive => Box::new(AttentivePolicy),
            Self::Frugal => Box::new(FrugalPolicy),
            Self::Spendthrift => Box::new(SpendthriftPolicy),
            Self::Neglectful => Box::new(NeglectfulPolicy),
            Self::Erratic => Box::new(ErraticPolicy::new(seed)),
        }
    }
}

impl fmt::Display for CareStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct AttentivePolicy;
struct FrugalPolicy;
struct SpendthriftPolicy;
struct NeglectfulPolicy;

struct ErraticPolicy {
    rng: ChaCha20Rng,
}

impl ErraticPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl CaretakerPolicy for AttentivePolicy {
    fn name(&self) -> &'static str {
        "Attentive"
    }

    fn decide(&mut self, view: &SessionView) -> CareDecision {
        let stats = &view.stats;
        if stats.health < 35 {
            CareDecision::act(CareAction::Vet, "health low")
        } else if stats.hunger < 60 {
            CareDecision::act(CareAction::Feed, "hungry")
        } else if stats.cleanliness < 50 {
            CareDecision::act(CareAction::Clean, "dirty")
        } else if stats.energy < 40 {
            CareDecision::act(CareAction::Rest, "tired")
        } else if stats.happiness < 50 {
            CareDecision::act(CareAction::Play, "bored")
        } else if stats.energy < 90 {
            CareDecision::act(CareAction::Rest, "topping up energy")
        } else {
            CareDecision::wait("content")
        }
    }
}

impl CaretakerPolicy for FrugalPolicy {
    fn name(&self) -> &'static str {
        "Frugal"
    }

    fn decide(&mut self, view: &SessionView) -> CareDecision {
        let stats = &view.stats;
        let balance = view.finances.balance;
        if stats.energy < 30 {
            CareDecision::act(CareAction::Rest, "free rest first")
        } else if stats.hunger < 30 {
            CareDecision::act(CareAction::Feed, "only when starving")
        } else if stats.cleanliness < 25 {
            CareDecision::act(CareAction::Clean, "only when filthy")
        } else if stats.health < 25 && balance >= 80 {
            CareDecision::act(CareAction::Vet, "vet with a reserve left")
        } else if stats.happiness < 25 {
            CareDecision::act(CareAction::Play, "cheap fun")
        } else {
            CareDecision::wait("saving")
        }
    }
}

impl CaretakerPolicy for SpendthriftPolicy {
    fn name(&self) -> &'static str {
        "Spendthrift"
    }

    fn decide(&mut self, view: &SessionView) -> CareDecision {
        if view.finances.balance >= 25 && view.stats.happiness < 100 {
            return CareDecision::act(CareAction::BuyToy, "treat");
        }
        AttentivePolicy.decide(view)
    }
}

impl CaretakerPolicy for NeglectfulPolicy {
    fn name(&self) -> &'static str {
        "Neglectful"
    }

    fn decide(&mut self, _view: &SessionView) -> CareDecision {
        CareDecision::wait("away")
    }
}

impl CaretakerPolicy for ErraticPolicy {
    fn name(&self) -> &'static str {
        "Erratic"
    }

    fn decide(&mut self, _view: &SessionView) -> CareDecision {
        if self.rng.gen_bool(0.5) {
            let action = CareAction::ALL[self.rng.gen_range(0..CareAction::ALL.len())];
            CareDecision::act(action, "whim")
        } else {
            CareDecision::wait("distracted")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelpets_core::{EngineConfig, MemoryStore, PetEngine, Species, StatVector, UserId};

    async fn view_with(stats: StatVector) -> SessionView {
        let engine = PetEngine::with_defaults(MemoryStore::new());
        let owner = UserId::new();
        let mut pet = engine.adopt(owner, "Probe", Species::Dog).await.unwrap();
        pet.stats = stats;
        pixelpets_core::PetStore::save_pet(engine.store(), &pet)
            .await
            .unwrap();
        let session = engine.open_session(owner, pet.id, 1).await.unwrap();
        assert_eq!(engine.config(), &EngineConfig::default());
        session.view()
    }

    #[tokio::test]
    async fn attentive_feeds_a_hungry_pet_first() {
        let mut stats = StatVector::uniform(80);
        stats.hunger = 20;
        stats.cleanliness = 10;
        let view = view_with(stats).await;
        let decision = AttentivePolicy.decide(&view);
        assert_eq!(decision.action, Some(CareAction::Feed));
    }

    #[tokio::test]
    async fn neglectful_never_acts_and_erratic_is_seeded() {
        let view = view_with(StatVector::uniform(10)).await;
        assert_eq!(NeglectfulPolicy.decide(&view).action, None);

        let mut a = CareStrategy::Erratic.create_policy(7);
        let mut b = CareStrategy::Erratic.create_policy(7);
        for _ in 0..20 {
            assert_eq!(a.decide(&view), b.decide(&view));
        }
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(CareStrategy::Spendthrift.to_string(), "Spendthrift");
        assert_eq!(CareStrategy::Attentive.create_policy(0).name(), "Attentive");
    }
}
