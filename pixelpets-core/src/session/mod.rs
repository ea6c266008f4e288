//! The per-pet care session: loads state, applies decay, runs care actions and
//! quiz rewards, and republishes a [`SessionView`] after every change.
mod timer;

pub use timer::{LiveSession, SharedSession, TickTimer};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::actions::{ActionOutcome, CareAction, resolve_action};
use crate::budget::{SavingsGoal, SavingsProgress, SpendingSummary};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::decay::{OfflineDecay, apply_offline_decay, apply_tick};
use crate::derived::{Achievement, AchievementContext, AchievementTracker, Mood, Status, mood, status};
use crate::error::{PetError, PetResult, SessionError, ValidationError};
use crate::ids::{PetId, TaskId, UserId};
use crate::ledger::{Coins, Expense, LedgerOp, UserFinances};
use crate::pet::{Pet, Species};
use crate::question::QuizQuestion;
use crate::random::CareRng;
use crate::stats::{StatDelta, StatVector};
use crate::store::{PetStore, StoreError};
use crate::tasks::{CareStreak, Difficulty, Task};
use crate::toys::{Rarity, ToyCollection, ToyItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Loading,
    Ready,
    Active,
    PetLost,
    NavigatedAway,
}

impl SessionPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Active => "active",
            Self::PetLost => "pet_lost",
            Self::NavigatedAway => "navigated_away",
        }
    }

    /// Phases in which care actions, ticks and task events are accepted.
    #[must_use]
    pub const fn accepts_care(self) -> bool {
        matches!(self, Self::Ready | Self::Active)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TickOutcome {
    Decayed { applied: StatDelta, persisted: bool },
    PetLost { applied: StatDelta },
    /// The session no longer accepts ticks; the timer should stop.
    Stopped,
}

impl TickOutcome {
    #[must_use]
    pub const fn keeps_running(&self) -> bool {
        matches!(self, Self::Decayed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionReport {
    pub outcome: ActionOutcome,
    pub balance: Coins,
    pub streak_bonus: Option<Coins>,
    /// False when the stat write failed and will be retried.
    pub persisted: bool,
    pub phase: SessionPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskOutcome {
    Rewarded { reward: Coins, balance: Coins },
    /// Marked incorrect for this session only.
    Incorrect,
}

/// Snapshot handed to the display layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub pet_id: PetId,
    pub name: String,
    pub species: Species,
    pub stats: StatVector,
    pub mood: Mood,
    pub status: Status,
    pub status_message: &'static str,
    pub finances: UserFinances,
    pub savings: Option<SavingsProgress>,
    pub spending: SpendingSummary,
    pub tasks_pending: usize,
    pub tasks_completed: usize,
    pub tasks_incorrect: usize,
    pub streak: CareStreak,
    pub toys: ToyCollection,
    pub notifications: Vec<Achievement>,
    pub unsaved_changes: bool,
}

/// Writes that failed after the user already paid, replayed on the next tick or action.
#[derive(Debug, Clone, Default)]
struct PendingWrites {
    pet: bool,
    streak: bool,
    expenses: Vec<Expense>,
    credits: Vec<Coins>,
}

impl PendingWrites {
    fn is_empty(&self) -> bool {
        !self.pet && !self.streak && self.expenses.is_empty() && self.credits.is_empty()
    }
}

pub struct PetSession<S: PetStore> {
    store: S,
    clock: Arc<dyn Clock>,
    cfg: Arc<EngineConfig>,
    user: UserId,
    phase: SessionPhase,
    pet: Pet,
    finances: UserFinances,
    expenses: Vec<Expense>,
    tasks: Vec<Task>,
    incorrect: HashSet<TaskId>,
    savings_goal: Option<SavingsGoal>,
    streak: CareStreak,
    legendary_elsewhere: bool,
    tracker: AchievementTracker,
    notifications: Vec<Achievement>,
    rng: CareRng,
    pending: PendingWrites,
    offline: Option<OfflineDecay>,
}

impl<S: PetStore> fmt::Debug for PetSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PetSession")
            .field("user", &self.user)
            .field("pet", &self.pet.id)
            .field("phase", &self.phase)
            .field("stats", &self.pet.stats)
            .field("balance", &self.finances.balance)
            .finish_non_exhaustive()
    }
}

/// Create and persist a new pet at neutral stats.
///
/// # Errors
///
/// Returns a validation error for a bad name or a persistence error when the
/// insert fails.
pub async fn adopt<S: PetStore + ?Sized>(
    store: &S,
    clock: &dyn Clock,
    owner: UserId,
    name: &str,
    species: Species,
) -> PetResult<Pet> {
    let pet = Pet::adopt(owner, name, species, clock.now())?;
    store.insert_pet(&pet).await?;
    log::info!("user {owner} adopted {} the {species}", pet.name);
    Ok(pet)
}

impl<S: PetStore> PetSession<S> {
    /// Load everything the pet screen needs, apply catch-up decay once, and
    /// enter `Ready` (or `PetLost` if the pet did not survive the absence).
    ///
    /// # Errors
    ///
    /// Fails when the config is out of range, any read fails, the pet does
    /// not exist, or it belongs to another user.
    pub async fn open(
        store: S,
        clock: Arc<dyn Clock>,
        cfg: Arc<EngineConfig>,
        user: UserId,
        pet_id: PetId,
        seed: u64,
    ) -> PetResult<Self> {
        cfg.validate()?;
        log::debug!("session for pet {pet_id}: {}", SessionPhase::Loading);
        let (pet, finances, expenses, tasks, achievements, goals, streak, pets) = tokio::try_join!(
            store.load_pet(pet_id),
            store.load_finances(user),
            store.expenses_for(user),
            store.tasks_for(user),
            store.achievements_for(user),
            store.savings_goals_for(user, pet_id),
            store.load_streak(user),
            store.pets_for(user),
        )?;
        let mut pet = pet.ok_or(SessionError::PetNotFound)?;
        if pet.owner != user {
            return Err(SessionError::NotOwner.into());
        }
        // Rows may come from other clients; never decay from out-of-range stats.
        pet.stats.clamp();

        let now = clock.now();
        let stamped_before = pet.last_updated;
        let offline = apply_offline_decay(&mut pet, now, &cfg.decay);
        let legendary_elsewhere = pets
            .iter()
            .any(|other| other.id != pet_id && other.has_toy_of(Rarity::Legendary));

        let mut session = Self {
            tracker: AchievementTracker::from_recorded(&achievements),
            store,
            clock,
            cfg,
            user,
            phase: SessionPhase::Loading,
            pet,
            finances,
            expenses,
            tasks,
            incorrect: HashSet::new(),
            savings_goal: SavingsGoal::latest(&goals).cloned(),
            streak,
            legendary_elsewhere,
            notifications: Vec::new(),
            rng: CareRng::from_seed(seed),
            pending: PendingWrites::default(),
            offline,
        };

        if session.pet.last_updated != stamped_before {
            session.persist_pet().await;
        }
        if !session.check_lost() {
            session.phase = SessionPhase::Ready;
            session.evaluate_achievements(now).await;
        }
        log::info!(
            "session for pet {} ({}) is {}",
            session.pet.id,
            session.pet.name,
            session.phase
        );
        Ok(session)
    }

    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub const fn pet(&self) -> &Pet {
        &self.pet
    }

    #[must_use]
    pub const fn finances(&self) -> &UserFinances {
        &self.finances
    }

    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    #[must_use]
    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    #[must_use]
    pub const fn streak(&self) -> &CareStreak {
        &self.streak
    }

    #[must_use]
    pub const fn config(&self) -> &Arc<EngineConfig> {
        &self.cfg
    }

    /// Catch-up decay charged when the session opened, if any.
    #[must_use]
    pub const fn offline_decay(&self) -> Option<&OfflineDecay> {
        self.offline.as_ref()
    }

    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    #[must_use]
    pub fn is_incorrect(&self, task: TaskId) -> bool {
        self.incorrect.contains(&task)
    }

    /// One live decay step. Ticks after `PetLost` or close change nothing.
    pub async fn tick(&mut self) -> TickOutcome {
        if !self.phase.accepts_care() {
            return TickOutcome::Stopped;
        }
        self.phase = SessionPhase::Active;
        self.flush_pending().await;
        let now = self.clock.now();
        let applied = apply_tick(&mut self.pet, now, &self.cfg.tick, self.rng.tick());
        log::debug!("tick for pet {}: {applied:?}", self.pet.id);
        let persisted = self.persist_pet().await;
        if self.check_lost() {
            return TickOutcome::PetLost { applied };
        }
        self.evaluate_achievements(now).await;
        TickOutcome::Decayed { applied, persisted }
    }

    /// Validate, charge and apply a care action.
    ///
    /// # Errors
    ///
    /// Validation failures and a failed debit leave every piece of state
    /// untouched. Writes after a successful debit never fail the call.
    pub async fn perform(&mut self, action: CareAction) -> PetResult<ActionReport> {
        self.ensure_accepting()?;
        let mut resolved = self.resolve(action);
        if matches!(resolved, Err(ValidationError::InsufficientFunds { .. }))
            && self.refresh_finances().await
        {
            // The balance is shared across pets and tabs; coins may have
            // arrived since this session loaded.
            resolved = self.resolve(action);
        }
        let outcome = resolved?;
        self.flush_pending().await;
        if outcome.cost > 0 {
            self.debit(outcome.cost).await?;
        }

        self.phase = SessionPhase::Active;
        let now = self.clock.now();
        self.pet.stats = outcome.stats;
        self.pet.last_updated = Some(now);
        if let Some(toy) = &outcome.toy {
            self.record_toy(toy);
        }
        if let Some(expense) = outcome.expense(self.pet.id, self.user, now) {
            self.expenses.push(expense.clone());
            if let Err(err) = self.store.insert_expense(&expense).await {
                log::warn!("expense for pet {} not saved, will retry: {err}", self.pet.id);
                self.pending.expenses.push(expense);
            }
        }
        let persisted = self.persist_pet().await;
        let streak_bonus = self.record_care_day(now).await;
        log::debug!(
            "pet {} {}: applied {:?}, balance {}",
            self.pet.id,
            action,
            outcome.applied,
            self.finances.balance
        );

        if !self.check_lost() {
            self.evaluate_achievements(now).await;
        }
        Ok(ActionReport {
            outcome,
            balance: self.finances.balance,
            streak_bonus,
            persisted,
            phase: self.phase,
        })
    }

    /// Record a quiz answer for a pending task.
    ///
    /// A correct answer flips the task to completed in the store (once) and
    /// credits its reward; a wrong one is remembered for this session only.
    ///
    /// # Errors
    ///
    /// Unknown or already completed tasks and out-of-range answers are
    /// validation errors; a failed completion write is a persistence error.
    pub async fn complete_task(
        &mut self,
        task_id: TaskId,
        answer: usize,
        question: &QuizQuestion,
    ) -> PetResult<TaskOutcome> {
        self.ensure_accepting()?;
        let index = self
            .tasks
            .iter()
            .position(|task| task.id == task_id)
            .ok_or(ValidationError::UnknownTask)?;
        if self.tasks[index].completed {
            return Err(ValidationError::TaskAlreadyCompleted.into());
        }
        if !question.is_correct(answer)? {
            self.incorrect.insert(task_id);
            return Ok(TaskOutcome::Incorrect);
        }

        self.flush_pending().await;
        let now = self.clock.now();
        let flipped = self.store.complete_task(task_id, now).await?;
        let task = &mut self.tasks[index];
        let _ = task.complete(now);
        self.incorrect.remove(&task_id);
        if !flipped {
            return Err(ValidationError::TaskAlreadyCompleted.into());
        }
        let reward = task.reward;
        self.phase = SessionPhase::Active;
        self.credit(reward).await;
        log::info!("task {task_id} completed, {reward} coins earned");
        self.evaluate_achievements(now).await;
        Ok(TaskOutcome::Rewarded {
            reward,
            balance: self.finances.balance,
        })
    }

    /// Create a batch of pending tasks for this user.
    ///
    /// # Errors
    ///
    /// Fails on an empty batch or when the insert fails.
    pub async fn add_tasks<I, T>(&mut self, labels: I, difficulty: Difficulty) -> PetResult<Vec<TaskId>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.ensure_accepting()?;
        let batch = Task::batch(
            self.user,
            labels,
            difficulty,
            &self.cfg.rewards,
            self.clock.now(),
        )?;
        self.store.insert_tasks(&batch).await?;
        let ids = batch.iter().map(|task| task.id).collect();
        self.tasks.extend(batch);
        Ok(ids)
    }

    /// # Errors
    ///
    /// Fails on a zero target or when the insert fails.
    pub async fn set_savings_goal(&mut self, target: Coins) -> PetResult<SavingsProgress> {
        self.ensure_accepting()?;
        let goal = SavingsGoal::new(self.user, self.pet.id, target, self.clock.now())?;
        self.store.insert_savings_goal(&goal).await?;
        let progress = goal.progress(self.finances.balance);
        self.savings_goal = Some(goal);
        Ok(progress)
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        let status = status(&self.pet.stats);
        let tasks_completed = self.tasks.iter().filter(|task| task.completed).count();
        SessionView {
            phase: self.phase,
            pet_id: self.pet.id,
            name: self.pet.name.clone(),
            species: self.pet.species,
            stats: self.pet.stats,
            mood: mood(&self.pet.stats),
            status,
            status_message: status.message(),
            finances: self.finances.clone(),
            savings: self
                .savings_goal
                .as_ref()
                .map(|goal| goal.progress(self.finances.balance)),
            spending: SpendingSummary::for_pet(&self.expenses, self.pet.id),
            tasks_pending: self.tasks.len() - tasks_completed,
            tasks_completed,
            tasks_incorrect: self.incorrect.len(),
            streak: self.streak,
            toys: ToyCollection::summarize(&self.pet.toys),
            notifications: self.notifications.clone(),
            unsaved_changes: self.has_unsaved_changes(),
        }
    }

    /// Drain one-shot achievement notifications.
    pub fn take_notifications(&mut self) -> Vec<Achievement> {
        std::mem::take(&mut self.notifications)
    }

    /// Delete a lost pet and leave the session.
    ///
    /// # Errors
    ///
    /// Only valid in `PetLost`. A failed delete keeps the session in
    /// `PetLost` so the user can retry.
    pub async fn remove_pet(&mut self) -> PetResult<()> {
        if self.phase != SessionPhase::PetLost {
            return Err(SessionError::InvalidPhase(self.phase).into());
        }
        self.store.delete_pet(self.pet.id).await?;
        log::info!("pet {} removed after being lost", self.pet.id);
        self.phase = SessionPhase::NavigatedAway;
        Ok(())
    }

    /// Leave the pet screen, making one last attempt at outstanding writes.
    pub async fn close(&mut self) {
        if self.phase == SessionPhase::NavigatedAway {
            return;
        }
        self.flush_pending().await;
        if !self.pending.is_empty() {
            log::warn!("closing session for pet {} with unsaved changes", self.pet.id);
        }
        self.phase = SessionPhase::NavigatedAway;
        log::debug!(
            "session for pet {} closed after {} rng draws",
            self.pet.id,
            self.rng.draws()
        );
    }

    const fn ensure_accepting(&self) -> Result<(), SessionError> {
        if self.phase.accepts_care() {
            Ok(())
        } else {
            Err(SessionError::InvalidPhase(self.phase))
        }
    }

    fn resolve(&mut self, action: CareAction) -> Result<ActionOutcome, ValidationError> {
        resolve_action(
            action,
            &self.pet.stats,
            self.finances.balance,
            &self.cfg.actions,
            self.rng.toy(),
        )
    }

    /// Reload the shared balance. True when it moved.
    async fn refresh_finances(&mut self) -> bool {
        match self.store.load_finances(self.user).await {
            Ok(finances) => {
                let moved = finances != self.finances;
                self.finances = finances;
                moved
            }
            Err(err) => {
                log::warn!("could not refresh balance for user {}: {err}", self.user);
                false
            }
        }
    }

    async fn debit(&mut self, amount: Coins) -> PetResult<()> {
        match self.store.apply_ledger(self.user, LedgerOp::Debit(amount)).await {
            Ok(finances) => {
                self.finances = finances;
                Ok(())
            }
            Err(StoreError::Rejected(err)) => {
                // Another tab spent first; resync so the UI shows the real balance.
                self.refresh_finances().await;
                Err(ValidationError::from(err).into())
            }
            Err(err) => Err(PetError::Persistence(err)),
        }
    }

    async fn credit(&mut self, amount: Coins) -> bool {
        match self.store.apply_ledger(self.user, LedgerOp::Credit(amount)).await {
            Ok(finances) => {
                self.finances = finances;
                true
            }
            Err(err) => {
                log::warn!("credit of {amount} coins failed, will retry: {err}");
                self.pending.credits.push(amount);
                false
            }
        }
    }

    fn record_toy(&mut self, toy: &ToyItem) {
        log::info!(
            "pet {} found a {} {}",
            self.pet.id,
            toy.rarity.as_str(),
            toy.name
        );
        self.pet.toys.push(toy.clone());
    }

    async fn record_care_day(&mut self, now: DateTime<Utc>) -> Option<Coins> {
        if !self.streak.record(now.date_naive()) {
            return None;
        }
        if let Err(err) = self.store.save_streak(self.user, &self.streak).await {
            log::warn!("care streak not saved, will retry: {err}");
            self.pending.streak = true;
        }
        let bonus = self.streak.bonus_due(&self.cfg.rewards)?;
        log::info!(
            "{}-day care streak, {bonus} bonus coins",
            self.streak.current
        );
        self.credit(bonus).await;
        Some(bonus)
    }

    async fn persist_pet(&mut self) -> bool {
        match self.store.save_pet(&self.pet).await {
            Ok(()) => {
                self.pending.pet = false;
                true
            }
            Err(err) => {
                log::warn!("pet {} not saved, will retry: {err}", self.pet.id);
                self.pending.pet = true;
                false
            }
        }
    }

    async fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        if self.pending.pet {
            self.persist_pet().await;
        }
        if self.pending.streak {
            match self.store.save_streak(self.user, &self.streak).await {
                Ok(()) => self.pending.streak = false,
                Err(err) => log::warn!("care streak retry failed: {err}"),
            }
        }
        let expenses = std::mem::take(&mut self.pending.expenses);
        for expense in expenses {
            if let Err(err) = self.store.insert_expense(&expense).await {
                log::warn!("expense retry failed: {err}");
                self.pending.expenses.push(expense);
            }
        }
        let credits = std::mem::take(&mut self.pending.credits);
        for amount in credits {
            self.credit(amount).await;
        }
    }

    fn check_lost(&mut self) -> bool {
        if self.phase == SessionPhase::PetLost {
            return true;
        }
        if !self.pet.is_lost() {
            return false;
        }
        log::info!(
            "pet {} ({}) was lost with {} stats at zero",
            self.pet.id,
            self.pet.name,
            self.pet.stats.zeroed_count()
        );
        self.phase = SessionPhase::PetLost;
        true
    }

    async fn evaluate_achievements(&mut self, now: DateTime<Utc>) {
        let tasks_completed = self.tasks.iter().filter(|task| task.completed).count();
        let ctx = AchievementContext {
            pet: self.pet.id,
            stats: &self.pet.stats,
            finances: &self.finances,
            tasks_completed: u32::try_from(tasks_completed).unwrap_or(u32::MAX),
            longest_streak: self.streak.longest,
            owns_legendary: self.legendary_elsewhere || self.pet.has_toy_of(Rarity::Legendary),
        };
        let unlocks = self.tracker.evaluate(&ctx, &self.cfg.achievements);
        for key in unlocks {
            let row = Achievement {
                owner: self.user,
                pet: key.pet,
                id: key.id,
                unlocked_at: now,
            };
            match self.store.insert_achievement(&row).await {
                Ok(true) => {
                    if self.tracker.mark_shown(key) {
                        log::info!("achievement unlocked: {}", key.id.title());
                        self.notifications.push(row);
                    }
                }
                Ok(false) => {
                    self.tracker.mark_shown(key);
                }
                Err(err) => {
                    log::warn!("achievement {} not recorded, will retry: {err}", key.id.title());
                    self.tracker.forget(&key);
                }
            }
        }
    }
}
