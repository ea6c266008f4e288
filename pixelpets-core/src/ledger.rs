//! Coin balance bookkeeping shared by every pet a user owns.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::constants::STARTING_BALANCE;
use crate::ids::{PetId, UserId};

pub type Coins = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum LedgerError {
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Coins, available: Coins },
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error("balance would overflow")]
    Overflow,
}

/// A single balance mutation, applied atomically by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "amount", rename_all = "lowercase")]
pub enum LedgerOp {
    Credit(Coins),
    Debit(Coins),
}

impl LedgerOp {
    #[must_use]
    pub const fn amount(self) -> Coins {
        match self {
            Self::Credit(amount) | Self::Debit(amount) => amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFinances {
    pub owner: UserId,
    pub balance: Coins,
    pub total_earned: Coins,
    pub total_spent: Coins,
}

impl UserFinances {
    /// Opening account for a new user.
    #[must_use]
    pub const fn opening(owner: UserId) -> Self {
        Self {
            owner,
            balance: STARTING_BALANCE,
            total_earned: 0,
            total_spent: 0,
        }
    }

    /// # Errors
    ///
    /// Fails on a zero amount or when a total would overflow; nothing changes.
    pub fn credit(&mut self, amount: Coins) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let balance = self.balance.checked_add(amount).ok_or(LedgerError::Overflow)?;
        let earned = self
            .total_earned
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.balance = balance;
        self.total_earned = earned;
        Ok(())
    }

    /// # Errors
    ///
    /// Fails with [`LedgerError::InsufficientFunds`] when `amount > balance`;
    /// nothing changes.
    pub fn debit(&mut self, amount: Coins) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        if amount > self.balance {
            return Err(LedgerError::InsufficientFunds {
                needed: amount,
                available: self.balance,
            });
        }
        let spent = self
            .total_spent
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.balance -= amount;
        self.total_spent = spent;
        Ok(())
    }

    /// # Errors
    ///
    /// See [`Self::credit`] and [`Self::debit`].
    pub fn apply(&mut self, op: LedgerOp) -> Result<(), LedgerError> {
        match op {
            LedgerOp::Credit(amount) => self.credit(amount),
            LedgerOp::Debit(amount) => self.debit(amount),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Feed,
    Play,
    Clean,
    Rest,
    Vet,
    Toy,
}

impl ExpenseCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Play => "play",
            Self::Clean => "clean",
            Self::Rest => "rest",
            Self::Vet => "vet",
            Self::Toy => "toy",
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable spend record; one per paid action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub pet: PetId,
    pub user: UserId,
    pub category: ExpenseCategory,
    pub item: String,
    pub amount: Coins,
    pub at: DateTime<Utc>,
}
