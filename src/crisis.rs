/// Crisis event responses.
/// A debris warning interrupts the mission and the player picks one
/// response. Ignoring the warning is free but costs a random amount of SI.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrisisChoice {
    Ignore,
    Cleanup,
    Treaty,
}

impl CrisisChoice {
    pub fn all() -> &'static [CrisisChoice] {
        &[CrisisChoice::Ignore, CrisisChoice::Cleanup, CrisisChoice::Treaty]
    }

    pub fn id(&self) -> &'static str {
        match self {
            CrisisChoice::Ignore => "ignore",
            CrisisChoice::Cleanup => "cleanup",
            CrisisChoice::Treaty => "treaty",
        }
    }

    pub fn option(&self) -> &'static CrisisOption {
        CRISIS_OPTIONS
            .iter()
            .find(|o| o.choice == *self)
            .expect("every crisis choice has a table entry")
    }
}

impl fmt::Display for CrisisChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for CrisisChoice {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CrisisChoice::all()
            .iter()
            .copied()
            .find(|c| c.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownKey {
                kind: "crisis option",
                key: s.to_string(),
            })
    }
}

/// SI effect of a crisis response
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SiImpact {
    Fixed(i32),
    /// Inclusive range drawn uniformly at resolution time
    Range { min: i32, max: i32 },
}

impl SiImpact {
    pub fn draw(&self, rng: &mut impl Rng) -> i32 {
        match *self {
            SiImpact::Fixed(value) => value,
            SiImpact::Range { min, max } => rng.gen_range(min..=max),
        }
    }

    pub fn bounds(&self) -> (i32, i32) {
        match *self {
            SiImpact::Fixed(value) => (value, value),
            SiImpact::Range { min, max } => (min, max),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrisisOption {
    pub choice: CrisisChoice,
    pub title: &'static str,
    pub description: &'static str,
    pub consequences: &'static str,
    pub cost: i64,
    pub weight: f64,
    pub si_impact: SiImpact,
}

impl CrisisOption {
    /// Score contribution: cost × weight
    pub fn score(&self) -> f64 {
        self.cost as f64 * self.weight
    }
}

pub const CRISIS_OPTIONS: &[CrisisOption] = &[
    CrisisOption {
        choice: CrisisChoice::Ignore,
        title: "Ignore Warning",
        description: "Risk it and hope for the best. Saves budget, but failure could mean asset loss.",
        consequences: "High risk, no cost. Gamble with your mission safety.",
        cost: 0,
        weight: 0.8,
        si_impact: SiImpact::Range { min: -30, max: -10 },
    },
    CrisisOption {
        choice: CrisisChoice::Cleanup,
        title: "Deploy Cleanup Tech",
        description: "Spend heavily to clear debris using advanced nets or lasers. Costly, but boosts sustainability index.",
        consequences: "Expensive but safe. Demonstrates environmental responsibility.",
        cost: 200,
        weight: 1.4,
        si_impact: SiImpact::Fixed(15),
    },
    CrisisOption {
        choice: CrisisChoice::Treaty,
        title: "International Treaty Push",
        description: "Invest in diplomacy. Slower payoff, but increases safety network-wide and earns collaboration points.",
        consequences: "Moderate cost, good SI boost. Promotes global cooperation.",
        cost: 150,
        weight: 1.2,
        si_impact: SiImpact::Fixed(10),
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_ignore_penalty_within_bounds() {
        let option = CrisisChoice::Ignore.option();
        let (min, max) = option.si_impact.bounds();
        assert_eq!((min, max), (-30, -10));

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let draws: Vec<i32> = (0..10_000).map(|_| option.si_impact.draw(&mut rng)).collect();

        assert!(draws.iter().all(|d| (min..=max).contains(d)));
        // Both ends of the inclusive range are reachable
        assert_eq!(*draws.iter().min().unwrap(), min);
        assert_eq!(*draws.iter().max().unwrap(), max);
    }

    #[test]
    fn test_fixed_impacts() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(CrisisChoice::Cleanup.option().si_impact.draw(&mut rng), 15);
        assert_eq!(CrisisChoice::Treaty.option().si_impact.draw(&mut rng), 10);
    }

    #[test]
    fn test_crisis_scores() {
        assert!((CrisisChoice::Cleanup.option().score() - 280.0).abs() < 1e-9);
        assert!((CrisisChoice::Treaty.option().score() - 180.0).abs() < 1e-9);
        assert_eq!(CrisisChoice::Ignore.option().score(), 0.0);
    }

    #[test]
    fn test_parse_choice() {
        assert_eq!("Treaty".parse::<CrisisChoice>().unwrap(), CrisisChoice::Treaty);
        assert!("panic".parse::<CrisisChoice>().is_err());
    }
}
