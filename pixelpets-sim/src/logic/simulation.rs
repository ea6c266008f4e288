use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result, bail, ensure};
use chrono::{DateTime, Duration, Utc};
use pixelpets_core::constants::STARTING_BALANCE;
use pixelpets_core::{
    AchievementId, AchievementKey, CareAction, Clock, Coins, Difficulty, EngineConfig,
    LocalQuestions, ManualClock, MemoryStore, PetEngine, PetError, PetId, PetSession, PetStore,
    SessionPhase, Species, StatVector, TaskOutcome, TickOutcome, UserId, question_or_fallback,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;

use super::policy::{CareDecision, CaretakerPolicy, CareStrategy};

/// 2026-01-05 06:00 UTC; visits land on fixed wall-clock slots from here.
const SIM_EPOCH_SECS: i64 = 1_767_592_800;
const QUIZ_STREAM: u64 = 0x5155_495A;

#[derive(Clone)]
pub struct SimulationExpectation(Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync>);

impl fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SimulationExpectation(..)")
    }
}

impl SimulationExpectation {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// # Errors
    ///
    /// Returns the expectation's own failure.
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self::new(f)
    }
}

/// How a scripted caretaker spends its days with one pet.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: CareStrategy,
    pub species: Species,
    pub days: u32,
    pub visits_per_day: u32,
    pub ticks_per_visit: u32,
    /// Ask the policy for an action every this many ticks.
    pub act_every_ticks: u32,
    pub quizzes_per_visit: u32,
    pub quiz_difficulty: Difficulty,
    pub quiz_accuracy: f64,
    pub starting_balance: Option<Coins>,
    pub starting_stats: Option<StatVector>,
    /// Inject one failed store write before every n-th tick.
    pub fail_write_every: Option<u32>,
    pub remove_lost_pet: bool,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub const fn new(strategy: CareStrategy) -> Self {
        Self {
            strategy,
            species: Species::Cat,
            days: 1,
            visits_per_day: 1,
            ticks_per_visit: 20,
            act_every_ticks: 5,
            quizzes_per_visit: 0,
            quiz_difficulty: Difficulty::Easy,
            quiz_accuracy: 1.0,
            starting_balance: None,
            starting_stats: None,
            fail_write_every: None,
            remove_lost_pet: false,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_schedule(
        mut self,
        days: u32,
        visits_per_day: u32,
        ticks_per_visit: u32,
    ) -> Self {
        self.days = days;
        self.visits_per_day = visits_per_day;
        self.ticks_per_visit = ticks_per_visit;
        self
    }

    #[must_use]
    pub const fn with_act_every(mut self, ticks: u32) -> Self {
        self.act_every_ticks = ticks;
        self
    }

    #[must_use]
    pub const fn with_quizzes(
        mut self,
        per_visit: u32,
        difficulty: Difficulty,
        accuracy: f64,
    ) -> Self {
        self.quizzes_per_visit = per_visit;
        self.quiz_difficulty = difficulty;
        self.quiz_accuracy = accuracy;
        self
    }

    #[must_use]
    pub const fn with_species(mut self, species: Species) -> Self {
        self.species = species;
        self
    }

    #[must_use]
    pub const fn with_starting_balance(mut self, balance: Coins) -> Self {
        self.starting_balance = Some(balance);
        self
    }

    #[must_use]
    pub const fn with_starting_stats(mut self, stats: StatVector) -> Self {
        self.starting_stats = Some(stats);
        self
    }

    #[must_use]
    pub const fn with_flaky_store(mut self, every_ticks: u32) -> Self {
        self.fail_write_every = Some(every_ticks);
        self
    }

    #[must_use]
    pub const fn removing_lost_pet(mut self) -> Self {
        self.remove_lost_pet = true;
        self
    }

    #[must_use]
    pub fn with_expectation<F>(mut self, expectation: F) -> Self
    where
        F: Into<SimulationExpectation>,
    {
        self.expectations.push(expectation.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CareLogEntry {
    pub day: u32,
    pub visit: u32,
    pub tick: u32,
    pub action: CareAction,
    pub rationale: &'static str,
    pub outcome: String,
}

/// What one run of a plan produced.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: CareStrategy,
    pub final_phase: SessionPhase,
    pub final_stats: StatVector,
    pub opening_balance: Coins,
    pub final_balance: Coins,
    pub total_earned: Coins,
    pub total_spent: Coins,
    pub ticks: u32,
    pub visits: u32,
    pub offline_units: u64,
    pub actions_applied: u32,
    pub actions_rejected: u32,
    pub tasks_rewarded: u32,
    pub tasks_incorrect: u32,
    pub quiz_rewards: Coins,
    pub streak_bonus_total: Coins,
    pub longest_streak: u32,
    pub achievements: Vec<AchievementId>,
    pub duplicate_notifications: u32,
    pub persistence_errors: u32,
    pub stats_in_bounds: bool,
    pub store_in_sync: bool,
    pub expenses_total: Coins,
    pub toys_owned: usize,
    pub lost_at_tick: Option<u32>,
    pub mutated_after_loss: bool,
    pub pet_removed: bool,
    pub care_log: Vec<CareLogEntry>,
}

impl SimulationSummary {
    fn new(seed: u64, strategy: CareStrategy, opening_balance: Coins, stats: StatVector) -> Self {
        Self {
            seed,
            strategy,
            final_phase: SessionPhase::Loading,
            final_stats: stats,
            opening_balance,
            final_balance: opening_balance,
            total_earned: 0,
            total_spent: 0,
            ticks: 0,
            visits: 0,
            offline_units: 0,
            actions_applied: 0,
            actions_rejected: 0,
            tasks_rewarded: 0,
            tasks_incorrect: 0,
            quiz_rewards: 0,
            streak_bonus_total: 0,
            longest_streak: 0,
            achievements: Vec::new(),
            duplicate_notifications: 0,
            persistence_errors: 0,
            stats_in_bounds: true,
            store_in_sync: true,
            expenses_total: 0,
            toys_owned: 0,
            lost_at_tick: None,
            mutated_after_loss: false,
            pet_removed: false,
            care_log: Vec::new(),
        }
    }

    #[must_use]
    pub fn unlocked(&self, id: AchievementId) -> bool {
        self.achievements.contains(&id)
    }

    #[must_use]
    pub fn pet_lost(&self) -> bool {
        self.lost_at_tick.is_some()
    }

    /// Checks every run must satisfy regardless of scenario.
    ///
    /// # Errors
    ///
    /// Names the first broken invariant.
    pub fn check_invariants(&self) -> Result<()> {
        ensure!(self.stats_in_bounds, "a stat left the 0..=100 range");
        ensure!(
            self.duplicate_notifications == 0,
            "{} achievement notifications repeated",
            self.duplicate_notifications
        );
        ensure!(
            self.opening_balance + self.total_earned == self.final_balance + self.total_spent,
            "ledger does not balance: opening {} + earned {} != balance {} + spent {}",
            self.opening_balance,
            self.total_earned,
            self.final_balance,
            self.total_spent
        );
        ensure!(
            self.total_earned == self.quiz_rewards + self.streak_bonus_total,
            "earned {} but rewards {} and bonuses {}",
            self.total_earned,
            self.quiz_rewards,
            self.streak_bonus_total
        );
        ensure!(
            self.expenses_total == self.total_spent,
            "expenses sum to {} but {} was spent",
            self.expenses_total,
            self.total_spent
        );
        ensure!(self.store_in_sync, "stored state diverged from the session");
        ensure!(!self.mutated_after_loss, "pet changed after it was lost");
        Ok(())
    }

    /// Last few care decisions, newest first.
    #[must_use]
    pub fn recent_care(&self, count: usize) -> String {
        if self.care_log.is_empty() {
            return "no care recorded".to_string();
        }
        self.care_log
            .iter()
            .rev()
            .take(count)
            .map(|entry| {
                format!(
                    "day {} visit {} tick {}: {} ({}) -> {}",
                    entry.day, entry.visit, entry.tick, entry.action, entry.rationale, entry.outcome
                )
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Drives plans against an in-memory store on a manual clock.
#[derive(Debug, Clone)]
pub struct Simulator {
    cfg: EngineConfig,
    verbose: bool,
}

struct Run<'a> {
    plan: &'a SimulationPlan,
    engine: PetEngine<MemoryStore>,
    clock: Arc<ManualClock>,
    owner: UserId,
    pet: PetId,
    policy: Box<dyn CaretakerPolicy + Send>,
    quiz_rng: ChaCha20Rng,
    seen: HashSet<AchievementKey>,
    summary: SimulationSummary,
    tick: Duration,
}

impl Simulator {
    #[must_use]
    pub const fn new(cfg: EngineConfig, verbose: bool) -> Self {
        Self { cfg, verbose }
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// # Errors
    ///
    /// Fails when the pet cannot be set up or a session cannot be opened.
    pub async fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> Result<SimulationSummary> {
        let start = DateTime::<Utc>::from_timestamp(SIM_EPOCH_SECS, 0).unwrap_or_else(Utc::now);
        let clock = Arc::new(ManualClock::new(start));
        let store = MemoryStore::new();
        let engine = PetEngine::new(store.clone(), clock.clone(), self.cfg.clone())
            .context("engine config rejected")?;
        let owner = UserId::new();

        let mut pet = engine
            .adopt(owner, "Pixel", plan.species)
            .await
            .context("adopting the simulated pet")?;
        if let Some(stats) = plan.starting_stats {
            pet.stats = stats;
            store.save_pet(&pet).await.context("seeding starting stats")?;
        }
        let opening_balance = plan.starting_balance.unwrap_or(STARTING_BALANCE);
        if let Some(balance) = plan.starting_balance {
            store.load_finances(owner).await?;
            store.set_balance(owner, balance);
        }

        let tick = Duration::from_std(self.cfg.tick.interval())
            .unwrap_or_else(|_| Duration::seconds(30));
        let mut run = Run {
            plan,
            engine,
            clock,
            owner,
            pet: pet.id,
            policy: plan.strategy.create_policy(seed),
            quiz_rng: ChaCha20Rng::seed_from_u64(seed ^ QUIZ_STREAM),
            seen: HashSet::new(),
            summary: SimulationSummary::new(seed, plan.strategy, opening_balance, pet.stats),
            tick,
        };

        let visits = plan.visits_per_day.max(1);
        let gap = Duration::hours(24) / i32::try_from(visits).unwrap_or(1);
        'days: for day in 0..plan.days {
            for visit in 0..visits {
                let slot = start
                    + Duration::days(i64::from(day))
                    + gap * i32::try_from(visit).unwrap_or(0);
                if slot > run.clock.now() {
                    run.clock.set(slot);
                }
                let seed_offset = u64::from(run.summary.visits);
                let mut session = run
                    .engine
                    .open_session(owner, run.pet, seed.wrapping_add(seed_offset))
                    .await
                    .with_context(|| format!("opening day {day} visit {visit}"))?;
                let keep_going = run.visit(&mut session, day, visit).await;
                run.finish_visit(&mut session).await?;
                if self.verbose {
                    log::debug!(
                        "seed {seed} day {day} visit {visit}: {} balance {}",
                        session.phase(),
                        session.finances().balance
                    );
                }
                if !keep_going {
                    break 'days;
                }
            }
        }

        Ok(run.summary)
    }
}

impl Run<'_> {
    /// Returns false once the pet is gone.
    async fn visit(&mut self, session: &mut PetSession<MemoryStore>, day: u32, visit: u32) -> bool {
        self.summary.visits += 1;
        if let Some(decay) = session.offline_decay() {
            self.summary.offline_units += u64::from(decay.units);
        }
        self.collect_notifications(session);
        if session.phase() == SessionPhase::PetLost {
            self.handle_loss(session).await;
            return false;
        }

        self.answer_quizzes(session, day, visit).await;

        let act_every = self.plan.act_every_ticks.max(1);
        for tick in 1..=self.plan.ticks_per_visit {
            match self.plan.fail_write_every {
                Some(every) if every > 0 && (self.summary.ticks + 1) % every == 0 => {
                    self.engine.store().fail_next_writes(1);
                }
                _ => {}
            }
            self.clock.advance(self.tick);
            match session.tick().await {
                TickOutcome::Decayed { persisted, .. } => {
                    self.summary.ticks += 1;
                    if !persisted {
                        self.summary.persistence_errors += 1;
                    }
                }
                TickOutcome::PetLost { .. } => {
                    self.summary.ticks += 1;
                    self.summary.lost_at_tick = Some(self.summary.ticks);
                    self.track_bounds(session);
                    self.handle_loss(session).await;
                    return false;
                }
                TickOutcome::Stopped => return false,
            }
            self.track_bounds(session);

            if tick % act_every == 0 {
                let decision = self.policy.decide(&session.view());
                self.act(session, decision, day, visit, tick).await;
                if session.phase() == SessionPhase::PetLost {
                    self.handle_loss(session).await;
                    return false;
                }
            }
            self.collect_notifications(session);
        }
        true
    }

    async fn answer_quizzes(&mut self, session: &mut PetSession<MemoryStore>, day: u32, visit: u32) {
        if self.plan.quizzes_per_visit == 0 {
            return;
        }
        let labels: Vec<String> = (0..self.plan.quizzes_per_visit)
            .map(|n| format!("Budget quiz d{day}v{visit}#{n}"))
            .collect();
        let ids = match session.add_tasks(&labels, self.plan.quiz_difficulty).await {
            Ok(ids) => ids,
            Err(err) => {
                log::warn!("could not add quiz tasks: {err}");
                self.summary.persistence_errors += 1;
                return;
            }
        };
        for (id, label) in ids.into_iter().zip(&labels) {
            let question = question_or_fallback(&LocalQuestions, label, self.plan.quiz_difficulty).await;
            let answer = if self.quiz_rng.gen_bool(self.plan.quiz_accuracy.clamp(0.0, 1.0)) {
                question.correct_index
            } else {
                (question.correct_index + 1) % question.options.len().max(1)
            };
            match session.complete_task(id, answer, &question).await {
                Ok(TaskOutcome::Rewarded { reward, .. }) => {
                    self.summary.tasks_rewarded += 1;
                    self.summary.quiz_rewards += reward;
                }
                Ok(TaskOutcome::Incorrect) => self.summary.tasks_incorrect += 1,
                Err(PetError::Persistence(err)) => {
                    log::warn!("quiz completion not saved: {err}");
                    self.summary.persistence_errors += 1;
                }
                Err(err) => log::warn!("quiz {label} refused: {err}"),
            }
            self.collect_notifications(session);
        }
    }

    async fn act(
        &mut self,
        session: &mut PetSession<MemoryStore>,
        decision: CareDecision,
        day: u32,
        visit: u32,
        tick: u32,
    ) {
        let Some(action) = decision.action else {
            return;
        };
        log::trace!("{} chose {action}: {}", self.policy.name(), decision.rationale);
        let outcome = match session.perform(action).await {
            Ok(report) => {
                self.summary.actions_applied += 1;
                if let Some(bonus) = report.streak_bonus {
                    self.summary.streak_bonus_total += bonus;
                }
                if !report.persisted {
                    self.summary.persistence_errors += 1;
                }
                format!("ok, balance {}", report.balance)
            }
            Err(err) if err.is_validation() => {
                self.summary.actions_rejected += 1;
                format!("rejected: {err}")
            }
            Err(PetError::Persistence(err)) => {
                self.summary.persistence_errors += 1;
                format!("not saved: {err}")
            }
            Err(err) => format!("refused: {err}"),
        };
        self.summary.care_log.push(CareLogEntry {
            day,
            visit,
            tick,
            action,
            rationale: decision.rationale,
            outcome,
        });
    }

    fn track_bounds(&mut self, session: &PetSession<MemoryStore>) {
        if !session.pet().stats.in_bounds() {
            self.summary.stats_in_bounds = false;
        }
    }

    fn collect_notifications(&mut self, session: &mut PetSession<MemoryStore>) {
        for achievement in session.take_notifications() {
            if self.seen.insert(achievement.key()) {
                self.summary.achievements.push(achievement.id);
            } else {
                self.summary.duplicate_notifications += 1;
            }
        }
    }

    /// Poke the lost session and confirm nothing moves, then optionally remove it.
    async fn handle_loss(&mut self, session: &mut PetSession<MemoryStore>) {
        if self.summary.lost_at_tick.is_none() {
            self.summary.lost_at_tick = Some(self.summary.ticks);
        }
        let frozen = session.pet().stats;
        let balance = session.finances().balance;
        self.clock.advance(self.tick);
        let ticked = session.tick().await;
        let fed = session.perform(CareAction::Feed).await;
        if ticked != TickOutcome::Stopped
            || fed.is_ok()
            || session.pet().stats != frozen
            || session.finances().balance != balance
        {
            self.summary.mutated_after_loss = true;
        }

        if self.plan.remove_lost_pet {
            match session.remove_pet().await {
                Ok(()) => self.summary.pet_removed = true,
                Err(err) => {
                    log::warn!("lost pet not removed: {err}");
                    self.summary.persistence_errors += 1;
                }
            }
        }
    }

    /// Close the visit and reconcile what the session believes with the store.
    async fn finish_visit(&mut self, session: &mut PetSession<MemoryStore>) -> Result<()> {
        self.collect_notifications(session);
        let phase = session.phase();
        session.close().await;
        let store = self.engine.store();

        let finances = store.load_finances(self.owner).await?;
        let expenses = store.expenses_for(self.owner).await?;
        let streak = store.load_streak(self.owner).await?;
        let stored_pet = store.load_pet(self.pet).await?;

        let summary = &mut self.summary;
        summary.final_phase = phase;
        summary.final_stats = session.pet().stats;
        summary.toys_owned = session.pet().toys.len();
        summary.final_balance = finances.balance;
        summary.total_earned = finances.total_earned;
        summary.total_spent = finances.total_spent;
        summary.expenses_total = expenses.iter().map(|expense| expense.amount).sum();
        summary.longest_streak = streak.longest;

        let pet_in_sync = match stored_pet {
            Some(pet) => !summary.pet_removed && pet.stats == session.pet().stats,
            None => summary.pet_removed,
        };
        if session.has_unsaved_changes() || !pet_in_sync || &finances != session.finances() {
            summary.store_in_sync = false;
        }
        Ok(())
    }
}

/// Convenience for expectations that compare a counter with a bound.
///
/// # Errors
///
/// Fails with `what` when `actual` is below `min`.
pub fn at_least<T: PartialOrd + fmt::Display>(what: &str, actual: T, min: T) -> Result<()> {
    if actual < min {
        bail!("{what}: expected at least {min}, got {actual}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulator() -> Simulator {
        Simulator::new(EngineConfig::default(), false)
    }

    #[tokio::test]
    async fn neglected_pet_is_lost_and_frozen() {
        let plan = SimulationPlan::new(CareStrategy::Neglectful)
            .with_schedule(1, 1, 200)
            .removing_lost_pet();
        let summary = simulator().run_plan(&plan, 9).await.unwrap();
        assert_eq!(summary.final_phase, SessionPhase::NavigatedAway);
        assert!(summary.pet_lost());
        assert!(summary.lost_at_tick.unwrap() <= 50);
        assert!(summary.pet_removed);
        summary.check_invariants().unwrap();
    }

    #[tokio::test]
    async fn daily_visits_apply_whole_hours_of_offline_decay() {
        let plan = SimulationPlan::new(CareStrategy::Neglectful).with_schedule(3, 1, 0);
        let summary = simulator().run_plan(&plan, 1).await.unwrap();
        assert_eq!(summary.visits, 3);
        assert_eq!(summary.offline_units, 48);
        assert_eq!(summary.final_stats.hunger, 2);
        assert_eq!(summary.ticks, 0);
        summary.check_invariants().unwrap();
    }

    #[tokio::test]
    async fn same_seed_replays_the_same_run() {
        let plan = SimulationPlan::new(CareStrategy::Erratic)
            .with_schedule(2, 2, 12)
            .with_act_every(2)
            .with_quizzes(1, Difficulty::Medium, 0.5);
        let sim = simulator();
        let first = sim.run_plan(&plan, 4242).await.unwrap();
        let second = sim.run_plan(&plan, 4242).await.unwrap();
        assert_eq!(first.final_stats, second.final_stats);
        assert_eq!(first.final_balance, second.final_balance);
        assert_eq!(first.tasks_rewarded, second.tasks_rewarded);
        assert_eq!(first.actions_applied, second.actions_applied);
    }

    #[tokio::test]
    async fn injected_write_failures_are_reconciled() {
        let plan = SimulationPlan::new(CareStrategy::Attentive)
            .with_schedule(1, 2, 16)
            .with_act_every(2)
            .with_quizzes(2, Difficulty::Easy, 1.0)
            .with_flaky_store(3);
        let summary = simulator().run_plan(&plan, 77).await.unwrap();
        assert!(summary.persistence_errors > 0);
        summary.check_invariants().unwrap();
    }

    #[test]
    fn expectations_report_their_failure() {
        let expectation = SimulationExpectation::new(|summary: &SimulationSummary| {
            at_least("visits", summary.visits, 2)
        });
        let summary = SimulationSummary::new(1, CareStrategy::Frugal, 100, StatVector::uniform(50));
        let err = expectation.evaluate(&summary).unwrap_err();
        assert!(err.to_string().contains("visits"));
        assert_eq!(summary.recent_care(3), "no care recorded");
    }
}
