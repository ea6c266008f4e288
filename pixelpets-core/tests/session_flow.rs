use chrono::{Duration, Utc};
use pixelpets_core::{
    AchievementId, CareAction, ConfigError, Difficulty, EngineConfig, ExpenseCategory, LedgerOp,
    ManualClock, MemoryStore, Pet, PetEngine, PetError, PetSession, PetStore, SessionError,
    SessionPhase, Species, StatVector, StoreError, TaskOutcome, TickOutcome, UserId,
    ValidationError, fallback_question,
};
use std::sync::Arc;

struct Harness {
    engine: PetEngine<MemoryStore>,
    clock: Arc<ManualClock>,
    owner: UserId,
}

impl Harness {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine =
            PetEngine::new(MemoryStore::new(), clock.clone(), EngineConfig::default()).unwrap();
        Self {
            engine,
            clock,
            owner: UserId::new(),
        }
    }

    fn store(&self) -> &MemoryStore {
        self.engine.store()
    }

    async fn pet_with(&self, stats: StatVector) -> Pet {
        let mut pet = self
            .engine
            .adopt(self.owner, "Pixel", Species::Cat)
            .await
            .unwrap();
        pet.stats = stats;
        self.store().save_pet(&pet).await.unwrap();
        pet
    }
}

#[tokio::test]
async fn feed_without_funds_changes_nothing() {
    let h = Harness::new();
    let pet = h.pet_with(StatVector::neutral()).await;
    h.store().set_balance(h.owner, 5);
    let mut session = h.engine.open_session(h.owner, pet.id, 1).await.unwrap();

    let err = session.perform(CareAction::Feed).await.unwrap_err();
    assert!(matches!(
        err,
        PetError::Validation(ValidationError::InsufficientFunds {
            needed: 10,
            available: 5
        })
    ));
    assert!(err.is_validation());
    assert_eq!(session.pet().stats, StatVector::neutral());
    assert_eq!(session.finances().balance, 5);
    assert!(h.store().expenses_for(h.owner).await.unwrap().is_empty());
    assert_eq!(session.phase(), SessionPhase::Ready);
}

#[tokio::test]
async fn vet_restores_health_and_records_one_expense() {
    let h = Harness::new();
    let mut stats = StatVector::neutral();
    stats.health = 40;
    stats.happiness = 60;
    let pet = h.pet_with(stats).await;
    let mut session = h.engine.open_session(h.owner, pet.id, 1).await.unwrap();

    let report = session.perform(CareAction::Vet).await.unwrap();
    assert_eq!(report.outcome.stats.health, 100);
    assert_eq!(report.outcome.stats.happiness, 50);
    assert_eq!(report.balance, 50);
    assert!(report.persisted);

    let expenses = h.store().expenses_for(h.owner).await.unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].category, ExpenseCategory::Vet);
    assert_eq!(expenses[0].amount, 50);
    let finances = h.store().load_finances(h.owner).await.unwrap();
    assert_eq!(finances.balance, 50);
    assert_eq!(finances.total_spent, 50);
    let stored = h.store().load_pet(pet.id).await.unwrap().unwrap();
    assert_eq!(stored.stats.health, 100);
}

#[tokio::test]
async fn three_zeroed_stats_during_a_tick_end_the_session() {
    let h = Harness::new();
    let mut stats = StatVector::uniform(60);
    stats.hunger = 1;
    stats.cleanliness = 1;
    stats.energy = 1;
    let pet = h.pet_with(stats).await;
    let mut session = h.engine.open_session(h.owner, pet.id, 1).await.unwrap();

    let outcome = session.tick().await;
    assert!(matches!(outcome, TickOutcome::PetLost { .. }));
    assert_eq!(session.phase(), SessionPhase::PetLost);
    let frozen = session.pet().stats;
    assert_eq!(frozen.zeroed_count(), 3);

    h.clock.advance(Duration::minutes(5));
    assert_eq!(session.tick().await, TickOutcome::Stopped);
    assert_eq!(session.pet().stats, frozen);
    let err = session.perform(CareAction::Feed).await.unwrap_err();
    assert!(matches!(
        err,
        PetError::Session(SessionError::InvalidPhase(SessionPhase::PetLost))
    ));

    session.remove_pet().await.unwrap();
    assert_eq!(session.phase(), SessionPhase::NavigatedAway);
    assert!(h.store().load_pet(pet.id).await.unwrap().is_none());
}

#[tokio::test]
async fn remove_pet_is_only_offered_after_loss() {
    let h = Harness::new();
    let pet = h.pet_with(StatVector::neutral()).await;
    let mut session = h.engine.open_session(h.owner, pet.id, 1).await.unwrap();
    let err = session.remove_pet().await.unwrap_err();
    assert!(matches!(
        err,
        PetError::Session(SessionError::InvalidPhase(SessionPhase::Ready))
    ));
    assert!(h.store().load_pet(pet.id).await.unwrap().is_some());
}

#[tokio::test]
async fn three_hours_away_matches_the_floor_formula() {
    let h = Harness::new();
    let pet = h.pet_with(StatVector::neutral()).await;
    let adopted_at = pet.last_updated.unwrap();
    h.clock.advance(Duration::hours(3));

    let session = h.engine.open_session(h.owner, pet.id, 1).await.unwrap();
    let stats = session.pet().stats;
    assert_eq!(stats.hunger, 47);
    assert_eq!(stats.happiness, 49);
    assert_eq!(stats.cleanliness, 48);
    assert_eq!(stats.energy, 50);
    assert_eq!(stats.love, 49);
    assert_eq!(stats.health, 50);
    assert_eq!(session.offline_decay().map(|d| d.units), Some(3));
    let stored = h.store().load_pet(pet.id).await.unwrap().unwrap();
    assert_eq!(stored.stats, stats);
    assert_eq!(stored.last_updated, Some(adopted_at + Duration::hours(3)));
}

#[tokio::test]
async fn loading_twice_within_an_hour_decays_once() {
    let h = Harness::new();
    let pet = h.pet_with(StatVector::neutral()).await;
    h.clock.advance(Duration::minutes(90));
    let mut first = h.engine.open_session(h.owner, pet.id, 1).await.unwrap();
    let after_first = first.pet().stats;
    first.close().await;

    h.clock.advance(Duration::minutes(20));
    let second = h.engine.open_session(h.owner, pet.id, 1).await.unwrap();
    assert_eq!(second.pet().stats, after_first);
    assert!(second.offline_decay().is_none());

    // The sub-hour remainder from the first load still counts.
    h.clock.advance(Duration::minutes(40));
    let third = h.engine.open_session(h.owner, pet.id, 1).await.unwrap();
    assert_eq!(third.offline_decay().map(|d| d.units), Some(1));
    assert_eq!(third.pet().stats.hunger, after_first.hunger - 1);
}

#[tokio::test]
async fn pet_lost_while_away_opens_in_the_lost_phase() {
    let h = Harness::new();
    let mut stats = StatVector::uniform(40);
    stats.hunger = 5;
    stats.cleanliness = 5;
    stats.happiness = 5;
    let pet = h.pet_with(stats).await;
    h.clock.advance(Duration::hours(12));
    let session = h.engine.open_session(h.owner, pet.id, 1).await.unwrap();
    assert_eq!(session.phase(), SessionPhase::PetLost);
    assert!(session.pet().stats.zeroed_count() >= 3);
}

#[tokio::test]
async fn correct_answer_credits_once_and_wrong_answer_stays_local() {
    let h = Harness::new();
    let pet = h.pet_with(StatVector::neutral()).await;
    let mut session = h.engine.open_session(h.owner, pet.id, 1).await.unwrap();
    let ids = session
        .add_tasks(["Budget basics", "Saving up"], Difficulty::Medium)
        .await
        .unwrap();
    let question = fallback_question("budget", Difficulty::Medium);
    let wrong = (question.correct_index + 1) % question.options.len();

    let outcome = session
        .complete_task(ids[0], wrong, &question)
        .await
        .unwrap();
    assert_eq!(outcome, TaskOutcome::Incorrect);
    assert!(session.is_incorrect(ids[0]));
    assert_eq!(session.finances().balance, 100);
    assert_eq!(h.store().count_completed_tasks(h.owner).await.unwrap(), 0);

    let outcome = session
        .complete_task(ids[0], question.correct_index, &question)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        TaskOutcome::Rewarded {
            reward: 10,
            balance: 110
        }
    );
    assert!(!session.is_incorrect(ids[0]));
    let err = session
        .complete_task(ids[0], question.correct_index, &question)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PetError::Validation(ValidationError::TaskAlreadyCompleted)
    ));
    let finances = h.store().load_finances(h.owner).await.unwrap();
    assert_eq!(finances.balance, 110);
    assert_eq!(finances.total_earned, 10);

    let view = session.view();
    assert_eq!(view.tasks_completed, 1);
    assert_eq!(view.tasks_pending, 1);
}

#[tokio::test]
async fn achievements_unlock_once_and_are_not_renotified() {
    let h = Harness::new();
    let pet = h.pet_with(StatVector::neutral()).await;
    let mut session = h.engine.open_session(h.owner, pet.id, 1).await.unwrap();
    assert!(session.take_notifications().is_empty());

    let ids = session.add_tasks(["Coins"], Difficulty::Easy).await.unwrap();
    let question = fallback_question("coins", Difficulty::Easy);
    session
        .complete_task(ids[0], question.correct_index, &question)
        .await
        .unwrap();
    let unlocked: Vec<_> = session.take_notifications().iter().map(|a| a.id).collect();
    assert_eq!(unlocked, vec![AchievementId::FirstTask]);

    session.perform(CareAction::Feed).await.unwrap();
    assert!(session.take_notifications().is_empty());
    session.perform(CareAction::Feed).await.unwrap();
    assert_eq!(session.pet().stats.hunger, 100);
    let unlocked: Vec<_> = session.take_notifications().iter().map(|a| a.id).collect();
    assert_eq!(unlocked, vec![AchievementId::WellFed]);

    session.perform(CareAction::Rest).await.unwrap();
    session.perform(CareAction::Feed).await.unwrap();
    assert!(session.take_notifications().is_empty());
    session.close().await;

    let mut reopened = h.engine.open_session(h.owner, pet.id, 2).await.unwrap();
    reopened.perform(CareAction::Clean).await.unwrap();
    assert!(
        reopened
            .take_notifications()
            .iter()
            .all(|a| a.id != AchievementId::FirstTask && a.id != AchievementId::WellFed)
    );
    let rows = h.store().achievements_for(h.owner).await.unwrap();
    assert_eq!(
        rows.iter()
            .filter(|a| a.id == AchievementId::WellFed)
            .count(),
        1
    );
}

#[tokio::test]
async fn stat_achievements_wait_for_the_first_task() {
    let h = Harness::new();
    let pet = h.pet_with(StatVector::uniform(100)).await;
    let mut session = h.engine.open_session(h.owner, pet.id, 1).await.unwrap();
    session.perform(CareAction::Rest).await.unwrap();
    assert!(session.take_notifications().is_empty());

    let ids = session.add_tasks(["Budget"], Difficulty::Hard).await.unwrap();
    let question = fallback_question("budget", Difficulty::Hard);
    session
        .complete_task(ids[0], question.correct_index, &question)
        .await
        .unwrap();
    let unlocked: Vec<_> = session.take_notifications().iter().map(|a| a.id).collect();
    assert!(unlocked.contains(&AchievementId::FirstTask));
    assert!(unlocked.contains(&AchievementId::Joyful));
    assert!(!unlocked.contains(&AchievementId::WellFed));
}

#[tokio::test]
async fn weekly_streak_pays_a_bonus() {
    let h = Harness::new();
    let pet = h.pet_with(StatVector::uniform(70)).await;
    let mut session = h.engine.open_session(h.owner, pet.id, 1).await.unwrap();
    let mut bonuses = Vec::new();
    for _ in 0..7 {
        let report = session.perform(CareAction::Rest).await.unwrap();
        bonuses.push(report.streak_bonus);
        h.clock.advance(Duration::days(1));
    }
    assert_eq!(bonuses.iter().flatten().count(), 1);
    assert_eq!(bonuses[6], Some(25));
    assert_eq!(session.finances().balance, 125);
    assert_eq!(session.streak().current, 7);
    assert_eq!(h.store().load_streak(h.owner).await.unwrap().longest, 7);
    let unlocked: Vec<_> = session.take_notifications().iter().map(|a| a.id).collect();
    assert!(unlocked.contains(&AchievementId::StreakWeek));
}

#[tokio::test]
async fn second_tab_cannot_overdraw_the_shared_balance() {
    let h = Harness::new();
    let first_pet = h.pet_with(StatVector::neutral()).await;
    let second_pet = h.pet_with(StatVector::neutral()).await;
    h.store().set_balance(h.owner, 10);
    let mut first = h.engine.open_session(h.owner, first_pet.id, 1).await.unwrap();
    let mut second = h
        .engine
        .open_session(h.owner, second_pet.id, 2)
        .await
        .unwrap();

    first.perform(CareAction::Feed).await.unwrap();
    let err = second.perform(CareAction::Feed).await.unwrap_err();
    assert!(matches!(
        err,
        PetError::Validation(ValidationError::InsufficientFunds { .. })
    ));
    assert_eq!(second.finances().balance, 0);
    assert_eq!(second.pet().stats, StatVector::neutral());
    assert_eq!(h.store().expenses_for(h.owner).await.unwrap().len(), 1);
}

#[tokio::test]
async fn coins_earned_in_another_tab_fund_the_next_action() {
    let h = Harness::new();
    let pet = h.pet_with(StatVector::neutral()).await;
    h.store().set_balance(h.owner, 5);
    let mut session = h.engine.open_session(h.owner, pet.id, 1).await.unwrap();

    let elsewhere = h
        .store()
        .apply_ledger(h.owner, LedgerOp::Credit(20))
        .await
        .unwrap();
    assert_eq!(elsewhere.balance, 25);

    let report = session.perform(CareAction::Feed).await.unwrap();
    assert_eq!(report.balance, 15);
    assert_eq!(session.finances().balance, 15);
    assert_eq!(session.pet().stats.hunger, 80);
    assert_eq!(h.store().load_finances(h.owner).await.unwrap().balance, 15);
}

#[tokio::test]
async fn out_of_range_config_never_reaches_a_session() {
    let h = Harness::new();
    let pet = h.pet_with(StatVector::neutral()).await;

    let mut cfg = EngineConfig::default();
    cfg.tick.happiness_chance = 1.5;
    let err = PetEngine::new(MemoryStore::new(), h.clock.clone(), cfg.clone()).unwrap_err();
    assert!(matches!(err, ConfigError::Probability { .. }));

    let mut zero_interval = EngineConfig::default();
    zero_interval.tick.interval_secs = 0;
    let err = PetEngine::new(MemoryStore::new(), h.clock.clone(), zero_interval).unwrap_err();
    assert!(matches!(err, ConfigError::RangeViolation { .. }));

    let err = PetSession::open(
        h.store().clone(),
        h.clock.clone(),
        Arc::new(cfg),
        h.owner,
        pet.id,
        1,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, PetError::Config(ConfigError::Probability { .. })));
}

#[tokio::test]
async fn stored_stats_out_of_range_are_clamped_on_load() {
    let h = Harness::new();
    let mut stats = StatVector::neutral();
    stats.hunger = 150;
    stats.love = -20;
    let pet = h.pet_with(stats).await;

    let session = h.engine.open_session(h.owner, pet.id, 1).await.unwrap();
    assert_eq!(session.pet().stats.hunger, 100);
    assert_eq!(session.pet().stats.love, 0);
    assert!(session.pet().stats.in_bounds());
}

#[tokio::test]
async fn failed_debit_write_applies_nothing() {
    let h = Harness::new();
    let pet = h.pet_with(StatVector::neutral()).await;
    let mut session = h.engine.open_session(h.owner, pet.id, 1).await.unwrap();
    h.store().fail_next_writes(1);
    let err = session.perform(CareAction::Clean).await.unwrap_err();
    assert!(matches!(err, PetError::Persistence(StoreError::Unavailable(_))));
    assert_eq!(session.pet().stats, StatVector::neutral());
    assert_eq!(session.finances().balance, 100);
    assert!(session.expenses().is_empty());
}

#[tokio::test]
async fn failed_stat_write_is_retried_by_the_next_tick() {
    let h = Harness::new();
    let pet = h.pet_with(StatVector::neutral()).await;
    let mut session = h.engine.open_session(h.owner, pet.id, 1).await.unwrap();

    h.store().fail_next_writes(1);
    let report = session.perform(CareAction::Rest).await.unwrap();
    assert!(!report.persisted);
    assert!(session.has_unsaved_changes());
    let stored = h.store().load_pet(pet.id).await.unwrap().unwrap();
    assert_eq!(stored.stats.energy, 50);

    h.store().set_unavailable(true);
    let outcome = session.tick().await;
    assert!(matches!(
        outcome,
        TickOutcome::Decayed {
            persisted: false,
            ..
        }
    ));
    h.store().set_unavailable(false);

    session.tick().await;
    assert!(!session.has_unsaved_changes());
    let stored = h.store().load_pet(pet.id).await.unwrap().unwrap();
    assert_eq!(stored.stats, session.pet().stats);
}

#[tokio::test]
async fn toy_purchase_grows_the_collection() {
    let h = Harness::new();
    let pet = h.pet_with(StatVector::neutral()).await;
    let mut session = h.engine.open_session(h.owner, pet.id, 3).await.unwrap();
    let report = session.perform(CareAction::BuyToy).await.unwrap();
    let toy = report.outcome.toy.clone().unwrap();
    assert_eq!(report.outcome.stats.happiness, 65);
    assert_eq!(report.balance, 75);

    let view = session.view();
    assert_eq!(view.toys.total, 1);
    assert_eq!(view.spending.total, 25);
    let expenses = h.store().expenses_for(h.owner).await.unwrap();
    assert_eq!(expenses[0].category, ExpenseCategory::Toy);
    assert_eq!(expenses[0].item, toy.name);
    let stored = h.store().load_pet(pet.id).await.unwrap().unwrap();
    assert_eq!(stored.toys, vec![toy]);
}

#[tokio::test]
async fn savings_goal_tracks_the_balance() {
    let h = Harness::new();
    let pet = h.pet_with(StatVector::neutral()).await;
    let mut session = h.engine.open_session(h.owner, pet.id, 1).await.unwrap();
    assert!(session.view().savings.is_none());
    let progress = session.set_savings_goal(200).await.unwrap();
    assert_eq!(progress.percent, 50);
    assert!(!progress.reached);
    session.perform(CareAction::Play).await.unwrap();
    let savings = session.view().savings.unwrap();
    assert_eq!(savings.saved, 95);
    session.close().await;

    let reopened = h.engine.open_session(h.owner, pet.id, 1).await.unwrap();
    assert_eq!(reopened.view().savings.map(|s| s.target), Some(200));
}

#[tokio::test]
async fn closed_session_rejects_further_care() {
    let h = Harness::new();
    let pet = h.pet_with(StatVector::neutral()).await;
    let mut session = h.engine.open_session(h.owner, pet.id, 1).await.unwrap();
    session.close().await;
    assert_eq!(session.phase(), SessionPhase::NavigatedAway);
    assert_eq!(session.tick().await, TickOutcome::Stopped);
    assert!(session.perform(CareAction::Rest).await.is_err());
}
