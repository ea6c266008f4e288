//! PixelPets care engine
//!
//! Platform-agnostic rules for a virtual pet that teaches budgeting: stat
//! decay over time, priced care actions backed by a coin ledger, quiz rewards,
//! and the mood, status and achievement projections shown to the player.
//! Persistence is abstracted behind [`PetStore`]; the display layer consumes
//! [`SessionView`] snapshots.

pub mod actions;
pub mod budget;
pub mod clock;
pub mod config;
pub mod constants;
pub mod decay;
pub mod derived;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod numbers;
pub mod pet;
pub mod question;
pub mod random;
pub mod session;
pub mod stats;
pub mod store;
pub mod tasks;
pub mod toys;

use std::sync::Arc;

// Re-export commonly used types
pub use actions::{ActionOutcome, CareAction, check_action, resolve_action};
pub use budget::{CategoryTotal, SavingsGoal, SavingsProgress, SpendingSummary};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AchievementConfig, ActionConfig, ActionSpec, ConfigError, DecayConfig, EngineConfig,
    RewardConfig, TickConfig,
};
pub use decay::{OfflineDecay, apply_offline_decay, apply_tick, elapsed_units, offline_delta};
pub use derived::{
    Achievement, AchievementContext, AchievementId, AchievementKey, AchievementScope,
    AchievementTracker, Mood, Status, mood, status,
};
pub use error::{PetError, PetResult, SessionError, ValidationError};
pub use ids::{PetId, TaskId, UserId};
pub use ledger::{Coins, Expense, ExpenseCategory, LedgerError, LedgerOp, UserFinances};
pub use pet::{Pet, Species};
pub use question::{
    GenerationError, LocalQuestions, QuestionSource, QuizQuestion, fallback_question,
    question_or_fallback,
};
pub use random::CareRng;
pub use session::{
    ActionReport, LiveSession, PetSession, SessionPhase, SessionView, SharedSession,
    TaskOutcome, TickOutcome, TickTimer,
};
pub use stats::{Stat, StatDelta, StatVector};
pub use store::{MemoryStore, PetStore, StoreError};
pub use tasks::{CareStreak, Difficulty, Task};
pub use toys::{Rarity, ToyCollection, ToyItem, draw_toy};

/// Entry point wiring a store, a clock and a tuning config together.
#[derive(Debug, Clone)]
pub struct PetEngine<S>
where
    S: PetStore + Clone,
{
    store: S,
    clock: Arc<dyn Clock>,
    cfg: Arc<EngineConfig>,
}

impl<S> PetEngine<S>
where
    S: PetStore + Clone,
{
    /// # Errors
    ///
    /// Rejects a config that fails [`EngineConfig::validate`].
    pub fn new(store: S, clock: Arc<dyn Clock>, cfg: EngineConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            store,
            clock,
            cfg: Arc::new(cfg),
        })
    }

    /// Engine on the system clock with default tuning.
    pub fn with_defaults(store: S) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            cfg: Arc::new(EngineConfig::default()),
        }
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    #[must_use]
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// # Errors
    ///
    /// Returns an error for an invalid name or a failed insert.
    pub async fn adopt(&self, owner: UserId, name: &str, species: Species) -> PetResult<Pet> {
        session::adopt(&self.store, self.clock.as_ref(), owner, name, species).await
    }

    /// # Errors
    ///
    /// Returns an error if the user's pets cannot be read.
    pub async fn pets(&self, owner: UserId) -> PetResult<Vec<Pet>> {
        Ok(self.store.pets_for(owner).await?)
    }

    /// Open a session without a timer; the caller drives ticks.
    ///
    /// # Errors
    ///
    /// See [`PetSession::open`].
    pub async fn open_session(
        &self,
        owner: UserId,
        pet: PetId,
        seed: u64,
    ) -> PetResult<PetSession<S>> {
        PetSession::open(
            self.store.clone(),
            Arc::clone(&self.clock),
            Arc::clone(&self.cfg),
            owner,
            pet,
            seed,
        )
        .await
    }

    /// Open a session with its live tick timer running.
    ///
    /// # Errors
    ///
    /// See [`PetSession::open`].
    pub async fn open_live(&self, owner: UserId, pet: PetId, seed: u64) -> PetResult<LiveSession<S>>
    where
        S: 'static,
    {
        LiveSession::open(
            self.store.clone(),
            Arc::clone(&self.clock),
            Arc::clone(&self.cfg),
            owner,
            pet,
            seed,
        )
        .await
    }
}
