/// Countries a player can fly for.
/// Each country fixes the mission budget; strengths and challenges are
/// briefing text shown on the selection screen.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Closed set of country keys (ISO 3166 alpha-2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CountryCode {
    OM,
    US,
    IN,
    JP,
    AE,
}

impl CountryCode {
    /// All countries in selection-screen order
    pub fn all() -> &'static [CountryCode] {
        &[
            CountryCode::OM,
            CountryCode::US,
            CountryCode::IN,
            CountryCode::JP,
            CountryCode::AE,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CountryCode::OM => "OM",
            CountryCode::US => "US",
            CountryCode::IN => "IN",
            CountryCode::JP => "JP",
            CountryCode::AE => "AE",
        }
    }

    /// Reference record for this code
    pub fn country(&self) -> &'static Country {
        COUNTRIES
            .iter()
            .find(|c| c.code == *self)
            .expect("every country code has a table entry")
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CountryCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CountryCode::all()
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownKey {
                kind: "country",
                key: s.to_string(),
            })
    }
}

/// Country reference data
#[derive(Debug, Clone, PartialEq)]
pub struct Country {
    pub code: CountryCode,
    pub name: &'static str,
    pub flag: &'static str,
    /// Mission budget in USD
    pub budget: i64,
    pub gdp_per_capita: i64,
    pub strengths: &'static [&'static str],
    pub challenges: &'static [&'static str],
}

pub const COUNTRIES: &[Country] = &[
    Country {
        code: CountryCode::OM,
        name: "Oman",
        flag: "🇴🇲",
        budget: 5_000,
        gdp_per_capita: 19_000,
        strengths: &[
            "Strategic geographic location",
            "Growing tech investment",
            "Strong government support",
        ],
        challenges: &[
            "Limited space infrastructure",
            "Developing aerospace sector",
            "Need for regional cooperation",
        ],
    },
    Country {
        code: CountryCode::US,
        name: "United States",
        flag: "🇺🇸",
        budget: 20_000,
        gdp_per_capita: 70_000,
        strengths: &[
            "Advanced technology",
            "Established space infrastructure",
            "Large aerospace industry",
        ],
        challenges: &["High operational costs", "Complex regulatory environment"],
    },
    Country {
        code: CountryCode::IN,
        name: "India",
        flag: "🇮🇳",
        budget: 8_000,
        gdp_per_capita: 2_500,
        strengths: &[
            "Cost-effective innovation",
            "Strong STEM education",
            "Proven launch capabilities",
        ],
        challenges: &["Budget constraints", "Growing but competitive market"],
    },
    Country {
        code: CountryCode::JP,
        name: "Japan",
        flag: "🇯🇵",
        budget: 15_000,
        gdp_per_capita: 42_000,
        strengths: &[
            "Advanced robotics",
            "Precision manufacturing",
            "Strong R&D infrastructure",
        ],
        challenges: &["Earthquake-prone launch sites", "Limited domestic resources"],
    },
    Country {
        code: CountryCode::AE,
        name: "UAE",
        flag: "🇦🇪",
        budget: 12_000,
        gdp_per_capita: 44_000,
        strengths: &[
            "Significant investment",
            "Modern facilities",
            "Ambitious space program",
        ],
        challenges: &["New to space sector", "Limited heritage"],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_has_a_country() {
        for code in CountryCode::all() {
            assert_eq!(code.country().code, *code);
        }
        assert_eq!(COUNTRIES.len(), CountryCode::all().len());
    }

    #[test]
    fn test_budgets() {
        assert_eq!(CountryCode::OM.country().budget, 5_000);
        assert_eq!(CountryCode::US.country().budget, 20_000);
        assert_eq!(CountryCode::IN.country().budget, 8_000);
        assert_eq!(CountryCode::JP.country().budget, 15_000);
        assert_eq!(CountryCode::AE.country().budget, 12_000);
    }

    #[test]
    fn test_parse_code() {
        assert_eq!("jp".parse::<CountryCode>().unwrap(), CountryCode::JP);
        assert_eq!(" AE ".parse::<CountryCode>().unwrap(), CountryCode::AE);

        let err = "FR".parse::<CountryCode>().unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownKey {
                kind: "country",
                key: "FR".to_string()
            }
        );
    }
}
