//! Savings goals and the spending dashboard.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::ids::{PetId, UserId};
use crate::ledger::{Coins, Expense, ExpenseCategory};
use crate::numbers::percent_capped;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsGoal {
    pub owner: UserId,
    pub pet: PetId,
    pub target: Coins,
    pub created_at: DateTime<Utc>,
}

impl SavingsGoal {
    /// # Errors
    ///
    /// Returns [`ValidationError::ZeroSavingsTarget`] for a zero target.
    pub fn new(
        owner: UserId,
        pet: PetId,
        target: Coins,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if target == 0 {
            return Err(ValidationError::ZeroSavingsTarget);
        }
        Ok(Self {
            owner,
            pet,
            target,
            created_at,
        })
    }

    /// The newest goal is authoritative.
    #[must_use]
    pub fn latest(goals: &[Self]) -> Option<&Self> {
        goals.iter().max_by_key(|goal| goal.created_at)
    }

    #[must_use]
    pub fn progress(&self, balance: Coins) -> SavingsProgress {
        SavingsProgress {
            saved: balance.min(self.target),
            target: self.target,
            percent: percent_capped(balance, self.target),
            reached: balance >= self.target,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsProgress {
    pub saved: Coins,
    pub target: Coins,
    pub percent: u8,
    pub reached: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub total: Coins,
    pub count: usize,
}

/// Totals per category, for the spending chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingSummary {
    pub total: Coins,
    pub count: usize,
    pub by_category: BTreeMap<ExpenseCategory, CategoryTotal>,
}

impl SpendingSummary {
    #[must_use]
    pub fn from_expenses<'a, I>(expenses: I) -> Self
    where
        I: IntoIterator<Item = &'a Expense>,
    {
        let mut summary = Self::default();
        for expense in expenses {
            summary.total = summary.total.saturating_add(expense.amount);
            summary.count += 1;
            let entry = summary.by_category.entry(expense.category).or_default();
            entry.total = entry.total.saturating_add(expense.amount);
            entry.count += 1;
        }
        summary
    }

    #[must_use]
    pub fn for_pet(expenses: &[Expense], pet: PetId) -> Self {
        Self::from_expenses(expenses.iter().filter(|expense| expense.pet == pet))
    }

    /// Category with the highest spend; ties go to the first in category order.
    #[must_use]
    pub fn largest_category(&self) -> Option<ExpenseCategory> {
        self.by_category
            .iter()
            .fold(None::<(ExpenseCategory, Coins)>, |best, (category, totals)| {
                match best {
                    Some((_, top)) if top >= totals.total => best,
                    _ => Some((*category, totals.total)),
                }
            })
            .map(|(category, _)| category)
    }
}
