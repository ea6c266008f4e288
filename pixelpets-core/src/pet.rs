//! Pet records and adoption.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::constants::{PET_LOST_ZERO_STATS, PET_NAME_MAX_CHARS};
use crate::ids::{PetId, UserId};
use crate::stats::StatVector;
use crate::toys::{Rarity, ToyItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    #[default]
    Dog,
    Cat,
    Bird,
    Fish,
    Mouse,
}

impl Species {
    pub const ALL: [Self; 5] = [Self::Dog, Self::Cat, Self::Bird, Self::Fish, Self::Mouse];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dog => "dog",
            Self::Cat => "cat",
            Self::Bird => "bird",
            Self::Fish => "fish",
            Self::Mouse => "mouse",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Species {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dog" => Ok(Self::Dog),
            "cat" => Ok(Self::Cat),
            "bird" => Ok(Self::Bird),
            "fish" => Ok(Self::Fish),
            "mouse" => Ok(Self::Mouse),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pet {
    pub id: PetId,
    pub owner: UserId,
    pub name: String,
    pub species: Species,
    pub stats: StatVector,
    /// `None` until the first persisted update; decay never runs before it is set.
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub toys: Vec<ToyItem>,
}

impl Pet {
    /// Create a freshly adopted pet at neutral stats.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidName`] when the trimmed name is empty or too long.
    pub fn adopt(
        owner: UserId,
        name: &str,
        species: Species,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > PET_NAME_MAX_CHARS {
            return Err(ValidationError::InvalidName {
                max: PET_NAME_MAX_CHARS,
            });
        }
        Ok(Self {
            id: PetId::new(),
            owner,
            name: name.to_string(),
            species,
            stats: StatVector::neutral(),
            last_updated: Some(now),
            created_at: now,
            toys: Vec::new(),
        })
    }

    /// Three or more stats at zero at once.
    #[must_use]
    pub fn is_lost(&self) -> bool {
        self.stats.zeroed_count() >= PET_LOST_ZERO_STATS
    }

    #[must_use]
    pub fn has_toy_of(&self, rarity: Rarity) -> bool {
        self.toys.iter().any(|toy| toy.rarity == rarity)
    }
}
