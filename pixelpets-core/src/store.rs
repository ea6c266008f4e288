//! Data store contract and an in-memory implementation.
//!
//! The hosted database sits behind [`PetStore`]: row-level CRUD over the data
//! model, row-count aggregates, and one atomic balance primitive
//! ([`PetStore::apply_ledger`]) so concurrent tabs never read-modify-write the
//! balance from the client.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use crate::budget::SavingsGoal;
use crate::derived::{Achievement, AchievementKey};
use crate::ids::{PetId, TaskId, UserId};
use crate::ledger::{Expense, LedgerError, LedgerOp, UserFinances};
use crate::pet::Pet;
use crate::tasks::{CareStreak, Task};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("data store unavailable: {0}")]
    Unavailable(String),
    #[error("row not found: {0}")]
    NotFound(String),
    #[error("ledger rejected the update: {0}")]
    Rejected(#[from] LedgerError),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait PetStore: Send + Sync {
    async fn insert_pet(&self, pet: &Pet) -> StoreResult<()>;
    async fn load_pet(&self, id: PetId) -> StoreResult<Option<Pet>>;
    async fn save_pet(&self, pet: &Pet) -> StoreResult<()>;
    /// Returns whether a row was removed.
    async fn delete_pet(&self, id: PetId) -> StoreResult<bool>;
    async fn pets_for(&self, owner: UserId) -> StoreResult<Vec<Pet>>;

    /// Finances for a user, opening an account on first access.
    async fn load_finances(&self, owner: UserId) -> StoreResult<UserFinances>;
    /// Atomically apply a credit or debit and return the new row.
    ///
    /// A debit larger than the stored balance fails with
    /// [`StoreError::Rejected`] and changes nothing.
    async fn apply_ledger(&self, owner: UserId, op: LedgerOp) -> StoreResult<UserFinances>;

    async fn insert_expense(&self, expense: &Expense) -> StoreResult<()>;
    async fn expenses_for(&self, owner: UserId) -> StoreResult<Vec<Expense>>;

    async fn insert_tasks(&self, tasks: &[Task]) -> StoreResult<()>;
    async fn tasks_for(&self, owner: UserId) -> StoreResult<Vec<Task>>;
    /// Flip a task to completed. Returns false if it already was.
    async fn complete_task(&self, id: TaskId, at: DateTime<Utc>) -> StoreResult<bool>;
    async fn count_completed_tasks(&self, owner: UserId) -> StoreResult<u32>;

    async fn achievements_for(&self, owner: UserId) -> StoreResult<Vec<Achievement>>;
    /// Insert unless the `(owner, key)` row exists. Returns whether it was inserted.
    async fn insert_achievement(&self, achievement: &Achievement) -> StoreResult<bool>;

    async fn savings_goals_for(&self, owner: UserId, pet: PetId)
    -> StoreResult<Vec<SavingsGoal>>;
    async fn insert_savings_goal(&self, goal: &SavingsGoal) -> StoreResult<()>;

    async fn load_streak(&self, owner: UserId) -> StoreResult<CareStreak>;
    async fn save_streak(&self, owner: UserId, streak: &CareStreak) -> StoreResult<()>;
}

#[async_trait]
impl<S: PetStore + ?Sized> PetStore for Arc<S> {
    async fn insert_pet(&self, pet: &Pet) -> StoreResult<()> {
        (**self).insert_pet(pet).await
    }
    async fn load_pet(&self, id: PetId) -> StoreResult<Option<Pet>> {
        (**self).load_pet(id).await
    }
    async fn save_pet(&self, pet: &Pet) -> StoreResult<()> {
        (**self).save_pet(pet).await
    }
    async fn delete_pet(&self, id: PetId) -> StoreResult<bool> {
        (**self).delete_pet(id).await
    }
    async fn pets_for(&self, owner: UserId) -> StoreResult<Vec<Pet>> {
        (**self).pets_for(owner).await
    }
    async fn load_finances(&self, owner: UserId) -> StoreResult<UserFinances> {
        (**self).load_finances(owner).await
    }
    async fn apply_ledger(&self, owner: UserId, op: LedgerOp) -> StoreResult<UserFinances> {
        (**self).apply_ledger(owner, op).await
    }
    async fn insert_expense(&self, expense: &Expense) -> StoreResult<()> {
        (**self).insert_expense(expense).await
    }
    async fn expenses_for(&self, owner: UserId) -> StoreResult<Vec<Expense>> {
        (**self).expenses_for(owner).await
    }
    async fn insert_tasks(&self, tasks: &[Task]) -> StoreResult<()> {
        (**self).insert_tasks(tasks).await
    }
    async fn tasks_for(&self, owner: UserId) -> StoreResult<Vec<Task>> {
        (**self).tasks_for(owner).await
    }
    async fn complete_task(&self, id: TaskId, at: DateTime<Utc>) -> StoreResult<bool> {
        (**self).complete_task(id, at).await
    }
    async fn count_completed_tasks(&self, owner: UserId) -> StoreResult<u32> {
        (**self).count_completed_tasks(owner).await
    }
    async fn achievements_for(&self, owner: UserId) -> StoreResult<Vec<Achievement>> {
        (**self).achievements_for(owner).await
    }
    async fn insert_achievement(&self, achievement: &Achievement) -> StoreResult<bool> {
        (**self).insert_achievement(achievement).await
    }
    async fn savings_goals_for(
        &self,
        owner: UserId,
        pet: PetId,
    ) -> StoreResult<Vec<SavingsGoal>> {
        (**self).savings_goals_for(owner, pet).await
    }
    async fn insert_savings_goal(&self, goal: &SavingsGoal) -> StoreResult<()> {
        (**self).insert_savings_goal(goal).await
    }
    async fn load_streak(&self, owner: UserId) -> StoreResult<CareStreak> {
        (**self).load_streak(owner).await
    }
    async fn save_streak(&self, owner: UserId, streak: &CareStreak) -> StoreResult<()> {
        (**self).save_streak(owner, streak).await
    }
}

#[derive(Debug, Default)]
struct Tables {
    pets: HashMap<PetId, Pet>,
    finances: HashMap<UserId, UserFinances>,
    expenses: Vec<Expense>,
    tasks: Vec<Task>,
    achievements: Vec<Achievement>,
    achievement_keys: HashSet<(UserId, AchievementKey)>,
    savings_goals: Vec<SavingsGoal>,
    streaks: HashMap<UserId, CareStreak>,
}

#[derive(Debug, Default)]
struct Faults {
    unavailable: bool,
    failing_writes: u32,
    writes_attempted: u64,
}

/// Thread-safe in-memory store with fault injection for tests and simulations.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Mutex<Faults>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.unavailable = unavailable;
        }
    }

    /// Fail the next `count` write calls.
    pub fn fail_next_writes(&self, count: u32) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.failing_writes = count;
        }
    }

    /// Total write calls seen, failed ones included.
    #[must_use]
    pub fn writes_attempted(&self) -> u64 {
        self.faults.lock().map_or(0, |faults| faults.writes_attempted)
    }

    /// Seed a balance directly, bypassing the ledger.
    pub fn set_balance(&self, owner: UserId, balance: u64) {
        if let Ok(mut tables) = self.tables.lock() {
            tables
                .finances
                .entry(owner)
                .or_insert_with(|| UserFinances::opening(owner))
                .balance = balance;
        }
    }

    fn read(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        {
            let faults = self.faults.lock().map_err(poisoned)?;
            if faults.unavailable {
                return Err(StoreError::Unavailable("store offline".into()));
            }
        }
        self.tables.lock().map_err(poisoned)
    }

    fn write(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        {
            let mut faults = self.faults.lock().map_err(poisoned)?;
            faults.writes_attempted += 1;
            if faults.unavailable {
                return Err(StoreError::Unavailable("store offline".into()));
            }
            if faults.failing_writes > 0 {
                faults.failing_writes -= 1;
                return Err(StoreError::Unavailable("injected write failure".into()));
            }
        }
        self.tables.lock().map_err(poisoned)
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Unavailable("store lock poisoned".into())
}

#[async_trait]
impl PetStore for MemoryStore {
    async fn insert_pet(&self, pet: &Pet) -> StoreResult<()> {
        self.write()?.pets.insert(pet.id, pet.clone());
        Ok(())
    }

    async fn load_pet(&self, id: PetId) -> StoreResult<Option<Pet>> {
        Ok(self.read()?.pets.get(&id).cloned())
    }

    async fn save_pet(&self, pet: &Pet) -> StoreResult<()> {
        let mut tables = self.write()?;
        let row = tables
            .pets
            .get_mut(&pet.id)
            .ok_or_else(|| StoreError::NotFound(format!("pet {}", pet.id)))?;
        *row = pet.clone();
        Ok(())
    }

    async fn delete_pet(&self, id: PetId) -> StoreResult<bool> {
        Ok(self.write()?.pets.remove(&id).is_some())
    }

    async fn pets_for(&self, owner: UserId) -> StoreResult<Vec<Pet>> {
        let tables = self.read()?;
        let mut pets: Vec<Pet> = tables
            .pets
            .values()
            .filter(|pet| pet.owner == owner)
            .cloned()
            .collect();
        pets.sort_by_key(|pet| pet.created_at);
        Ok(pets)
    }

    async fn load_finances(&self, owner: UserId) -> StoreResult<UserFinances> {
        let mut tables = self.read()?;
        Ok(tables
            .finances
            .entry(owner)
            .or_insert_with(|| UserFinances::opening(owner))
            .clone())
    }

    async fn apply_ledger(&self, owner: UserId, op: LedgerOp) -> StoreResult<UserFinances> {
        let mut tables = self.write()?;
        let row = tables
            .finances
            .entry(owner)
            .or_insert_with(|| UserFinances::opening(owner));
        let mut next = row.clone();
        next.apply(op)?;
        *row = next.clone();
        Ok(next)
    }

    async fn insert_expense(&self, expense: &Expense) -> StoreResult<()> {
        self.write()?.expenses.push(expense.clone());
        Ok(())
    }

    async fn expenses_for(&self, owner: UserId) -> StoreResult<Vec<Expense>> {
        Ok(self
            .read()?
            .expenses
            .iter()
            .filter(|expense| expense.user == owner)
            .cloned()
            .collect())
    }

    async fn insert_tasks(&self, tasks: &[Task]) -> StoreResult<()> {
        self.write()?.tasks.extend_from_slice(tasks);
        Ok(())
    }

    async fn tasks_for(&self, owner: UserId) -> StoreResult<Vec<Task>> {
        Ok(self
            .read()?
            .tasks
            .iter()
            .filter(|task| task.owner == owner)
            .cloned()
            .collect())
    }

    async fn complete_task(&self, id: TaskId, at: DateTime<Utc>) -> StoreResult<bool> {
        let mut tables = self.write()?;
        let task = tables
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("task {id}")))?;
        Ok(task.complete(at).is_ok())
    }

    async fn count_completed_tasks(&self, owner: UserId) -> StoreResult<u32> {
        let count = self
            .read()?
            .tasks
            .iter()
            .filter(|task| task.owner == owner && task.completed)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn achievements_for(&self, owner: UserId) -> StoreResult<Vec<Achievement>> {
        Ok(self
            .read()?
            .achievements
            .iter()
            .filter(|row| row.owner == owner)
            .cloned()
            .collect())
    }

    async fn insert_achievement(&self, achievement: &Achievement) -> StoreResult<bool> {
        let mut tables = self.write()?;
        if !tables
            .achievement_keys
            .insert((achievement.owner, achievement.key()))
        {
            return Ok(false);
        }
        tables.achievements.push(achievement.clone());
        Ok(true)
    }

    async fn savings_goals_for(
        &self,
        owner: UserId,
        pet: PetId,
    ) -> StoreResult<Vec<SavingsGoal>> {
        Ok(self
            .read()?
            .savings_goals
            .iter()
            .filter(|goal| goal.owner == owner && goal.pet == pet)
            .cloned()
            .collect())
    }

    async fn insert_savings_goal(&self, goal: &SavingsGoal) -> StoreResult<()> {
        self.write()?.savings_goals.push(goal.clone());
        Ok(())
    }

    async fn load_streak(&self, owner: UserId) -> StoreResult<CareStreak> {
        Ok(self
            .read()?
            .streaks
            .get(&owner)
            .copied()
            .unwrap_or_default())
    }

    async fn save_streak(&self, owner: UserId, streak: &CareStreak) -> StoreResult<()> {
        self.write()?.streaks.insert(owner, *streak);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derived::AchievementId;
    use crate::pet::Species;

    #[tokio::test]
    async fn ledger_primitive_rejects_overdraft_atomically() {
        let store = MemoryStore::new();
        let owner = UserId::new();
        store.set_balance(owner, 5);
        let err = store
            .apply_ledger(owner, LedgerOp::Debit(10))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Rejected(LedgerError::InsufficientFunds { .. })
        ));
        let finances = store.load_finances(owner).await.unwrap();
        assert_eq!(finances.balance, 5);
        assert_eq!(finances.total_spent, 0);

        let finances = store
            .apply_ledger(owner, LedgerOp::Credit(20))
            .await
            .unwrap();
        assert_eq!(finances.balance, 25);
        assert_eq!(finances.total_earned, 20);
    }

    #[tokio::test]
    async fn concurrent_debits_never_overdraw() {
        let store = MemoryStore::new();
        let owner = UserId::new();
        store.set_balance(owner, 100);
        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.apply_ledger(owner, LedgerOp::Debit(10)).await.is_ok()
            }));
        }
        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 10);
        let finances = store.load_finances(owner).await.unwrap();
        assert_eq!(finances.balance, 0);
        assert_eq!(finances.total_spent, 100);
    }

    #[tokio::test]
    async fn achievements_are_unique_per_key() {
        let store = MemoryStore::new();
        let owner = UserId::new();
        let pet = PetId::new();
        let row = Achievement {
            owner,
            pet: Some(pet),
            id: AchievementId::Beloved,
            unlocked_at: Utc::now(),
        };
        assert!(store.insert_achievement(&row).await.unwrap());
        assert!(!store.insert_achievement(&row).await.unwrap());
        let other_pet = Achievement {
            pet: Some(PetId::new()),
            ..row.clone()
        };
        assert!(store.insert_achievement(&other_pet).await.unwrap());
        assert_eq!(store.achievements_for(owner).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn injected_failures_hit_writes_only() {
        let store = MemoryStore::new();
        let pet = Pet::adopt(UserId::new(), "Pip", Species::Bird, Utc::now()).unwrap();
        store.insert_pet(&pet).await.unwrap();
        store.fail_next_writes(1);
        assert!(store.save_pet(&pet).await.is_err());
        assert!(store.load_pet(pet.id).await.unwrap().is_some());
        assert!(store.save_pet(&pet).await.is_ok());

        store.set_unavailable(true);
        assert!(store.load_pet(pet.id).await.is_err());
        store.set_unavailable(false);
        assert!(store.delete_pet(pet.id).await.unwrap());
        assert!(!store.delete_pet(pet.id).await.unwrap());
    }

    #[tokio::test]
    async fn task_completion_flips_once_and_counts() {
        let store = MemoryStore::new();
        let owner = UserId::new();
        let tasks = Task::batch(
            owner,
            ["one", "two"],
            crate::tasks::Difficulty::Easy,
            &crate::config::RewardConfig::default(),
            Utc::now(),
        )
        .unwrap();
        store.insert_tasks(&tasks).await.unwrap();
        assert!(store.complete_task(tasks[0].id, Utc::now()).await.unwrap());
        assert!(!store.complete_task(tasks[0].id, Utc::now()).await.unwrap());
        assert_eq!(store.count_completed_tasks(owner).await.unwrap(), 1);
        assert!(matches!(
            store.complete_task(TaskId::new(), Utc::now()).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
