//! Error taxonomy for the care engine.
//!
//! Validation failures reach the user and leave state untouched. Persistence
//! failures on best-effort writes are logged and retried by the next natural
//! write; they only surface here when nothing was applied. Generation
//! failures fall back to local content and are rarely seen by callers.
use thiserror::Error;

use crate::config::ConfigError;
use crate::ledger::{Coins, LedgerError};
use crate::question::GenerationError;
use crate::session::SessionPhase;
use crate::store::StoreError;

/// A precondition was not met. Non-retriable without a state change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("insufficient funds: need {needed} coins, have {available}")]
    InsufficientFunds { needed: Coins, available: Coins },
    #[error("not hungry")]
    NotHungry,
    #[error("too tired to play")]
    TooTired,
    #[error("pet names must be 1 to {max} characters")]
    InvalidName { max: usize },
    #[error("task was already completed")]
    TaskAlreadyCompleted,
    #[error("no such task")]
    UnknownTask,
    #[error("answer {index} is not one of the {options} options")]
    AnswerOutOfRange { index: usize, options: usize },
    #[error("a task batch needs at least one label")]
    EmptyTaskBatch,
    #[error("savings target must be greater than zero")]
    ZeroSavingsTarget,
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error("balance would overflow")]
    BalanceOverflow,
}

impl From<LedgerError> for ValidationError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds { needed, available } => {
                Self::InsufficientFunds { needed, available }
            }
            LedgerError::ZeroAmount => Self::ZeroAmount,
            LedgerError::Overflow => Self::BalanceOverflow,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("pet not found")]
    PetNotFound,
    #[error("pet belongs to another user")]
    NotOwner,
    #[error("session is {0} and cannot accept this request")]
    InvalidPhase(SessionPhase),
}

/// Umbrella error returned by session operations.
#[derive(Debug, Error)]
pub enum PetError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),
    #[error("question generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("invalid engine config: {0}")]
    Config(#[from] ConfigError),
}

impl PetError {
    /// True for failures the user caused and can fix by changing their choice.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type PetResult<T> = Result<T, PetError>;
