//! Weighted-rarity toy draws and the per-pet collection they feed.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub const ALL: [Self; 4] = [Self::Common, Self::Rare, Self::Epic, Self::Legendary];

    /// Draw weight out of 100.
    #[must_use]
    pub const fn weight(self) -> u32 {
        match self {
            Self::Common => 50,
            Self::Rare => 25,
            Self::Epic => 15,
            Self::Legendary => 10,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
        }
    }

    const fn catalog(self) -> &'static [&'static str] {
        match self {
            Self::Common => &["Rubber Ball", "Squeaky Bone", "Yarn Ball", "Chew Stick"],
            Self::Rare => &["Feather Wand", "Puzzle Feeder", "Plush Carrot"],
            Self::Epic => &["Laser Pointer", "Golden Frisbee"],
            Self::Legendary => &["Crystal Castle", "Rainbow Comet"],
        }
    }

    /// Map a roll in `0..100` onto the cumulative weight table.
    #[must_use]
    pub fn from_roll(roll: u32) -> Self {
        let mut cumulative = 0;
        for rarity in Self::ALL {
            cumulative += rarity.weight();
            if roll < cumulative {
                return rarity;
            }
        }
        Self::Legendary
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToyItem {
    pub name: String,
    pub rarity: Rarity,
}

/// Draw one toy: rarity by weight, then a catalog entry uniformly.
pub fn draw_toy<R: Rng + ?Sized>(rng: &mut R) -> ToyItem {
    let rarity = Rarity::from_roll(rng.gen_range(0..100));
    let names = rarity.catalog();
    let name = names[rng.gen_range(0..names.len())];
    ToyItem {
        name: name.to_string(),
        rarity,
    }
}

/// Read-only tally over a pet's toys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToyCollection {
    pub total: usize,
    pub distinct: usize,
    pub by_rarity: BTreeMap<Rarity, usize>,
}

impl ToyCollection {
    #[must_use]
    pub fn summarize(toys: &[ToyItem]) -> Self {
        let mut by_rarity = BTreeMap::new();
        for toy in toys {
            *by_rarity.entry(toy.rarity).or_insert(0) += 1;
        }
        let distinct = toys
            .iter()
            .map(|toy| toy.name.as_str())
            .collect::<BTreeSet<_>>()
            .len();
        Self {
            total: toys.len(),
            distinct,
            by_rarity,
        }
    }

    #[must_use]
    pub fn count(&self, rarity: Rarity) -> usize {
        self.by_rarity.get(&rarity).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn weights_cover_one_hundred() {
        let total: u32 = Rarity::ALL.iter().map(|r| r.weight()).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn roll_boundaries_map_to_tiers() {
        assert_eq!(Rarity::from_roll(0), Rarity::Common);
        assert_eq!(Rarity::from_roll(49), Rarity::Common);
        assert_eq!(Rarity::from_roll(50), Rarity::Rare);
        assert_eq!(Rarity::from_roll(74), Rarity::Rare);
        assert_eq!(Rarity::from_roll(75), Rarity::Epic);
        assert_eq!(Rarity::from_roll(89), Rarity::Epic);
        assert_eq!(Rarity::from_roll(90), Rarity::Legendary);
        assert_eq!(Rarity::from_roll(99), Rarity::Legendary);
    }

    #[test]
    fn drawn_toys_come_from_their_tier() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..200 {
            let toy = draw_toy(&mut rng);
            assert!(toy.rarity.catalog().contains(&toy.name.as_str()));
        }
    }

    #[test]
    fn collection_counts_distinct_names() {
        let toys = vec![
            ToyItem {
                name: "Rubber Ball".into(),
                rarity: Rarity::Common,
            },
            ToyItem {
                name: "Rubber Ball".into(),
                rarity: Rarity::Common,
            },
            ToyItem {
                name: "Rainbow Comet".into(),
                rarity: Rarity::Legendary,
            },
        ];
        let summary = ToyCollection::summarize(&toys);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.distinct, 2);
        assert_eq!(summary.count(Rarity::Common), 2);
        assert_eq!(summary.count(Rarity::Epic), 0);
    }
}
