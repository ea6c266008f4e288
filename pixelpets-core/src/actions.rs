//! Care actions: preconditions, stat effects, prices, and the expense they leave.
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::{ActionConfig, ActionSpec};
use crate::constants::STAT_MAX;
use crate::error::ValidationError;
use crate::ids::{PetId, UserId};
use crate::ledger::{Coins, Expense, ExpenseCategory};
use crate::stats::{StatDelta, StatVector};
use crate::toys::{ToyItem, draw_toy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CareAction {
    Feed,
    Play,
    Clean,
    Rest,
    Vet,
    BuyToy,
}

impl CareAction {
    pub const ALL: [Self; 6] = [
        Self::Feed,
        Self::Play,
        Self::Clean,
        Self::Rest,
        Self::Vet,
        Self::BuyToy,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Play => "play",
            Self::Clean => "clean",
            Self::Rest => "rest",
            Self::Vet => "vet",
            Self::BuyToy => "buy_toy",
        }
    }

    #[must_use]
    pub const fn category(self) -> ExpenseCategory {
        match self {
            Self::Feed => ExpenseCategory::Feed,
            Self::Play => ExpenseCategory::Play,
            Self::Clean => ExpenseCategory::Clean,
            Self::Rest => ExpenseCategory::Rest,
            Self::Vet => ExpenseCategory::Vet,
            Self::BuyToy => ExpenseCategory::Toy,
        }
    }

    const fn item_label(self) -> &'static str {
        match self {
            Self::Feed => "Pet food",
            Self::Play => "Play session",
            Self::Clean => "Bath",
            Self::Rest => "Nap",
            Self::Vet => "Vet visit",
            Self::BuyToy => "Mystery toy",
        }
    }

    #[must_use]
    pub const fn spec(self, cfg: &ActionConfig) -> &ActionSpec {
        match self {
            Self::Feed => &cfg.feed,
            Self::Play => &cfg.play,
            Self::Clean => &cfg.clean,
            Self::Rest => &cfg.rest,
            Self::Vet => &cfg.vet,
            Self::BuyToy => &cfg.buy_toy,
        }
    }
}

impl fmt::Display for CareAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CareAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "feed" => Ok(Self::Feed),
            "play" => Ok(Self::Play),
            "clean" => Ok(Self::Clean),
            "rest" => Ok(Self::Rest),
            "vet" => Ok(Self::Vet),
            "buy_toy" | "buy-toy" | "toy" => Ok(Self::BuyToy),
            _ => Err(()),
        }
    }
}

/// What an accepted action does, before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub action: CareAction,
    pub stats: StatVector,
    /// Change actually applied after clamping.
    pub applied: StatDelta,
    pub cost: Coins,
    pub toy: Option<ToyItem>,
}

impl ActionOutcome {
    /// The spend record for a paid action; free actions leave none.
    #[must_use]
    pub fn expense(&self, pet: PetId, user: UserId, at: DateTime<Utc>) -> Option<Expense> {
        if self.cost == 0 {
            return None;
        }
        let item = self
            .toy
            .as_ref()
            .map_or_else(|| self.action.item_label().to_string(), |toy| toy.name.clone());
        Some(Expense {
            pet,
            user,
            category: self.action.category(),
            item,
            amount: self.cost,
            at,
        })
    }
}

/// Check preconditions in order: funds, then appetite, then energy.
///
/// # Errors
///
/// Returns the first [`ValidationError`] that applies.
pub fn check_action(
    action: CareAction,
    stats: &StatVector,
    balance: Coins,
    cfg: &ActionConfig,
) -> Result<(), ValidationError> {
    let spec = action.spec(cfg);
    if spec.cost > balance {
        return Err(ValidationError::InsufficientFunds {
            needed: spec.cost,
            available: balance,
        });
    }
    match action {
        CareAction::Feed if stats.hunger >= STAT_MAX => Err(ValidationError::NotHungry),
        CareAction::Play if stats.energy <= cfg.play_min_energy => Err(ValidationError::TooTired),
        _ => Ok(()),
    }
}

/// Validate and compute an action's effect without touching any store.
///
/// The rng is only drawn from for a toy purchase.
///
/// # Errors
///
/// Returns a [`ValidationError`] and leaves `stats` as they were.
pub fn resolve_action<R: Rng + ?Sized>(
    action: CareAction,
    stats: &StatVector,
    balance: Coins,
    cfg: &ActionConfig,
    rng: &mut R,
) -> Result<ActionOutcome, ValidationError> {
    check_action(action, stats, balance, cfg)?;
    let spec = action.spec(cfg);
    let mut next = *stats;
    let applied = next.apply(&spec.effect);
    let toy = matches!(action, CareAction::BuyToy).then(|| draw_toy(rng));
    Ok(ActionOutcome {
        action,
        stats: next,
        applied,
        cost: spec.cost,
        toy,
    })
}
