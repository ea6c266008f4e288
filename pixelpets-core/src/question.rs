//! Quiz questions for reward tasks, with a local fallback bank.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ValidationError;
use crate::tasks::Difficulty;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("question provider unavailable: {0}")]
    Unavailable(String),
    #[error("question payload malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub topic: String,
    pub difficulty: Difficulty,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
}

impl QuizQuestion {
    /// # Errors
    ///
    /// Returns [`GenerationError::Malformed`] for fewer than two options or a
    /// correct index outside them.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.options.len() < 2 {
            return Err(GenerationError::Malformed(format!(
                "need at least two options, got {}",
                self.options.len()
            )));
        }
        if self.correct_index >= self.options.len() {
            return Err(GenerationError::Malformed(format!(
                "correct index {} out of {} options",
                self.correct_index,
                self.options.len()
            )));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::AnswerOutOfRange`] for an index with no option.
    pub fn is_correct(&self, answer: usize) -> Result<bool, ValidationError> {
        if answer >= self.options.len() {
            return Err(ValidationError::AnswerOutOfRange {
                index: answer,
                options: self.options.len(),
            });
        }
        Ok(answer == self.correct_index)
    }
}

/// External question generator (an LLM endpoint in production).
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn generate(
        &self,
        topic: &str,
        difficulty: Difficulty,
    ) -> Result<QuizQuestion, GenerationError>;
}

const FALLBACK_BANK: &[(&str, [&str; 4], usize)] = &[
    (
        "If a toy costs 25 coins and you have 40, how many coins are left after buying it?",
        ["10", "15", "25", "65"],
        1,
    ),
    (
        "Which is the best first step toward a savings goal?",
        [
            "Spend everything today",
            "Set aside a little each time you earn",
            "Borrow from a friend",
            "Ignore the goal",
        ],
        1,
    ),
    (
        "Feeding costs 10 coins. How much do four meals cost?",
        ["14", "30", "40", "100"],
        2,
    ),
    (
        "What is a budget?",
        [
            "A plan for how to use your money",
            "A type of coin",
            "A pet toy",
            "A bank's building",
        ],
        0,
    ),
];

/// Local question used when the provider fails. Deterministic per topic.
#[must_use]
pub fn fallback_question(topic: &str, difficulty: Difficulty) -> QuizQuestion {
    let index = topic.bytes().map(usize::from).sum::<usize>() % FALLBACK_BANK.len();
    let (prompt, options, correct_index) = FALLBACK_BANK[index];
    QuizQuestion {
        topic: topic.to_string(),
        difficulty,
        prompt: prompt.to_string(),
        options: options.iter().map(|o| (*o).to_string()).collect(),
        correct_index,
    }
}

/// Ask the provider once; on failure or a malformed payload use the fallback bank.
pub async fn question_or_fallback<Q: QuestionSource + ?Sized>(
    source: &Q,
    topic: &str,
    difficulty: Difficulty,
) -> QuizQuestion {
    match source.generate(topic, difficulty).await {
        Ok(question) => match question.validate() {
            Ok(()) => question,
            Err(err) => {
                log::warn!("discarding generated question for {topic}: {err}");
                fallback_question(topic, difficulty)
            }
        },
        Err(err) => {
            log::warn!("question generation failed for {topic}, using fallback: {err}");
            fallback_question(topic, difficulty)
        }
    }
}

/// Source that always serves the local bank.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalQuestions;

#[async_trait]
impl QuestionSource for LocalQuestions {
    async fn generate(
        &self,
        topic: &str,
        difficulty: Difficulty,
    ) -> Result<QuizQuestion, GenerationError> {
        Ok(fallback_question(topic, difficulty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Offline;

    #[async_trait]
    impl QuestionSource for Offline {
        async fn generate(
            &self,
            _topic: &str,
            _difficulty: Difficulty,
        ) -> Result<QuizQuestion, GenerationError> {
            Err(GenerationError::Unavailable("timeout".into()))
        }
    }

    struct Broken;

    #[async_trait]
    impl QuestionSource for Broken {
        async fn generate(
            &self,
            topic: &str,
            difficulty: Difficulty,
        ) -> Result<QuizQuestion, GenerationError> {
            Ok(QuizQuestion {
                topic: topic.into(),
                difficulty,
                prompt: "?".into(),
                options: vec!["only".into()],
                correct_index: 3,
            })
        }
    }

    #[test]
    fn fallback_bank_is_well_formed() {
        for topic in ["budget", "savings", "spending", "coins", ""] {
            let q = fallback_question(topic, Difficulty::Medium);
            assert_eq!(q.validate(), Ok(()));
            assert_eq!(q.is_correct(q.correct_index), Ok(true));
        }
    }

    #[test]
    fn out_of_range_answer_is_a_validation_error() {
        let q = fallback_question("budget", Difficulty::Easy);
        assert!(matches!(
            q.is_correct(9),
            Err(ValidationError::AnswerOutOfRange { index: 9, .. })
        ));
    }

    #[tokio::test]
    async fn provider_failure_uses_fallback() {
        let q = question_or_fallback(&Offline, "budget", Difficulty::Hard).await;
        assert_eq!(q, fallback_question("budget", Difficulty::Hard));
    }

    #[tokio::test]
    async fn malformed_payload_uses_fallback() {
        let q = question_or_fallback(&Broken, "savings", Difficulty::Easy).await;
        assert_eq!(q.validate(), Ok(()));
        assert_eq!(q, fallback_question("savings", Difficulty::Easy));
    }
}
