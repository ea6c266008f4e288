use anyhow::{Result, ensure};
use pixelpets_core::{AchievementId, Difficulty, SessionPhase, Species, StatVector};

use crate::logic::policy::CareStrategy;
use crate::logic::simulation::{SimulationPlan, SimulationSummary, at_least};

/// A named plan the CLI can run.
#[derive(Debug, Clone)]
pub struct CareScenario {
    pub name: String,
    pub plan: SimulationPlan,
}

impl CareScenario {
    #[must_use]
    pub fn new(name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

const CATALOG: &[(&str, &str)] = &[
    ("smoke", "Short attentive visit; nothing is lost and stats stay in range"),
    (
        "offline-catch-up",
        "Three daily check-ins without care; whole-hour catch-up decay only",
    ),
    ("neglect", "Live ticks with no care until the pet is lost and removed"),
    (
        "caretaker",
        "Two weeks of attentive care funded by quizzes; streak bonuses paid",
    ),
    ("broke", "No coins at all; priced care is refused and nothing is spent"),
    (
        "quiz-economy",
        "A week of perfect hard quizzes; rewards and the weekly bonus reconcile",
    ),
    ("toy-collector", "Spendthrift caretaker buying toys whenever possible"),
    (
        "flaky-store",
        "Periodic failed writes; the session retries and the store ends in sync",
    ),
    ("sick-pet", "Pet starts in poor health; the caretaker pays for the vet"),
    ("erratic", "Random care choices; invariants hold whatever happens"),
];

/// Keys in catalog order, used when `all` is requested.
pub fn scenario_keys() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|(key, _)| *key)
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    CATALOG.to_vec()
}

pub fn get_scenario(key: &str) -> Option<CareScenario> {
    let scenario = match key {
        "smoke" => CareScenario::new("Smoke", smoke_plan()),
        "offline-catch-up" => CareScenario::new("Offline Catch-up", offline_plan()),
        "neglect" => CareScenario::new("Neglect", neglect_plan()),
        "caretaker" => CareScenario::new("Caretaker Fortnight", caretaker_plan()),
        "broke" => CareScenario::new("Broke Owner", broke_plan()),
        "quiz-economy" => CareScenario::new("Quiz Economy", quiz_plan()),
        "toy-collector" => CareScenario::new("Toy Collector", toy_plan()),
        "flaky-store" => CareScenario::new("Flaky Store", flaky_plan()),
        "sick-pet" => CareScenario::new("Sick Pet", sick_plan()),
        "erratic" => CareScenario::new("Erratic Caretaker", erratic_plan()),
        _ => return None,
    };
    Some(scenario)
}

fn smoke_plan() -> SimulationPlan {
    SimulationPlan::new(CareStrategy::Attentive)
        .with_schedule(1, 1, 20)
        .with_act_every(5)
        .with_expectation(|summary: &SimulationSummary| {
            ensure!(!summary.pet_lost(), "pet lost during a short visit");
            ensure!(summary.visits == 1, "expected one visit, got {}", summary.visits);
            ensure!(summary.ticks == 20, "expected 20 ticks, got {}", summary.ticks);
            at_least("care actions applied", summary.actions_applied, 1)
        })
}

fn offline_plan() -> SimulationPlan {
    SimulationPlan::new(CareStrategy::Neglectful)
        .with_schedule(3, 1, 0)
        .with_expectation(|summary: &SimulationSummary| {
            ensure!(
                summary.offline_units == 48,
                "expected 48 catch-up hours, got {}",
                summary.offline_units
            );
            ensure!(
                summary.final_stats.hunger == 2,
                "hunger should fall one point per hour, ended at {}",
                summary.final_stats.hunger
            );
            ensure!(summary.ticks == 0, "no live ticks expected");
            Ok(())
        })
}

fn neglect_plan() -> SimulationPlan {
    SimulationPlan::new(CareStrategy::Neglectful)
        .with_species(Species::Mouse)
        .with_schedule(1, 1, 400)
        .removing_lost_pet()
        .with_expectation(neglect_expectation)
}

fn neglect_expectation(summary: &SimulationSummary) -> Result<()> {
    let Some(lost_at) = summary.lost_at_tick else {
        anyhow::bail!("neglected pet survived {} ticks", summary.ticks);
    };
    ensure!(lost_at <= 50, "pet should be lost within 50 ticks, took {lost_at}");
    ensure!(summary.pet_removed, "lost pet was not removed");
    ensure!(
        summary.final_phase == SessionPhase::NavigatedAway,
        "removal should navigate away, phase is {}",
        summary.final_phase
    );
    Ok(())
}

fn caretaker_plan() -> SimulationPlan {
    SimulationPlan::new(CareStrategy::Attentive)
        .with_species(Species::Dog)
        .with_schedule(14, 3, 20)
        .with_act_every(3)
        .with_quizzes(3, Difficulty::Medium, 0.8)
        .with_expectation(|summary: &SimulationSummary| {
            ensure!(!summary.pet_lost(), "attentive care still lost the pet");
            at_least("longest streak", summary.longest_streak, 7)?;
            at_least("streak bonus", summary.streak_bonus_total, 25)?;
            ensure!(
                summary.unlocked(AchievementId::FirstTask),
                "first task achievement never unlocked"
            );
            ensure!(
                summary.unlocked(AchievementId::StreakWeek),
                "week streak achievement never unlocked"
            );
            Ok(())
        })
}

fn broke_plan() -> SimulationPlan {
    SimulationPlan::new(CareStrategy::Attentive)
        .with_starting_balance(0)
        .with_schedule(1, 1, 40)
        .with_act_every(2)
        .with_expectation(|summary: &SimulationSummary| {
            ensure!(summary.total_spent == 0, "spent {} with no coins", summary.total_spent);
            ensure!(summary.final_balance == 0, "balance moved to {}", summary.final_balance);
            at_least("rejected actions", summary.actions_rejected, 1)
        })
}

fn quiz_plan() -> SimulationPlan {
    SimulationPlan::new(CareStrategy::Attentive)
        .with_schedule(7, 1, 4)
        .with_act_every(1)
        .with_quizzes(5, Difficulty::Hard, 1.0)
        .with_expectation(|summary: &SimulationSummary| {
            ensure!(
                summary.tasks_rewarded == 35,
                "expected 35 rewarded quizzes, got {}",
                summary.tasks_rewarded
            );
            ensure!(summary.tasks_incorrect == 0, "perfect answers marked incorrect");
            ensure!(
                summary.quiz_rewards == 700,
                "hard quizzes should pay 20 each, paid {}",
                summary.quiz_rewards
            );
            ensure!(summary.longest_streak == 7, "streak was {}", summary.longest_streak);
            ensure!(
                summary.streak_bonus_total == 25,
                "expected one weekly bonus, got {}",
                summary.streak_bonus_total
            );
            ensure!(
                summary.unlocked(AchievementId::TaskMaster),
                "task master never unlocked"
            );
            Ok(())
        })
}

fn toy_plan() -> SimulationPlan {
    SimulationPlan::new(CareStrategy::Spendthrift)
        .with_species(Species::Bird)
        .with_schedule(3, 2, 20)
        .with_act_every(2)
        .with_quizzes(3, Difficulty::Hard, 1.0)
        .with_expectation(|summary: &SimulationSummary| {
            at_least("toys owned", summary.toys_owned, 1)?;
            at_least("coins spent", summary.total_spent, 25)
        })
}

fn flaky_plan() -> SimulationPlan {
    SimulationPlan::new(CareStrategy::Attentive)
        .with_schedule(2, 2, 30)
        .with_act_every(3)
        .with_quizzes(2, Difficulty::Easy, 1.0)
        .with_flaky_store(4)
        .with_expectation(|summary: &SimulationSummary| {
            at_least("persistence errors", summary.persistence_errors, 1)
        })
}

fn sick_plan() -> SimulationPlan {
    let mut stats = StatVector::uniform(70);
    stats.health = 20;
    SimulationPlan::new(CareStrategy::Attentive)
        .with_starting_stats(stats)
        .with_schedule(1, 1, 10)
        .with_act_every(2)
        .with_expectation(|summary: &SimulationSummary| {
            at_least("coins spent", summary.total_spent, 50)?;
            ensure!(
                summary.final_stats.health > 35,
                "health stayed at {}",
                summary.final_stats.health
            );
            Ok(())
        })
}

fn erratic_plan() -> SimulationPlan {
    SimulationPlan::new(CareStrategy::Erratic)
        .with_species(Species::Fish)
        .with_schedule(3, 3, 24)
        .with_act_every(2)
        .with_quizzes(2, Difficulty::Medium, 0.5)
        .with_expectation(|summary: &SimulationSummary| {
            at_least("visits", summary.visits, 1)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_key_resolves() {
        for (key, description) in list_scenarios() {
            assert!(!description.is_empty());
            let scenario = get_scenario(key).unwrap_or_else(|| panic!("{key} missing"));
            assert!(!scenario.plan.expectations.is_empty(), "{key} checks nothing");
        }
        assert!(get_scenario("boss-fight").is_none());
        assert_eq!(scenario_keys().count(), list_scenarios().len());
    }
}
