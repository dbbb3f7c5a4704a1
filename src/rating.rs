/// Display-side interpretation of SI, budget and rank numbers:
/// rating tiers, achievements and money formatting.

use serde::{Deserialize, Serialize};

use crate::mission_state::MissionState;

/// Sustainability rating of a final (post-crisis) SI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SustainabilityRating {
    Excellent,
    Good,
    Fair,
    BelowAverage,
    Poor,
}

impl SustainabilityRating {
    pub fn for_si(si: i32) -> Self {
        match si {
            s if s >= 80 => SustainabilityRating::Excellent,
            s if s >= 60 => SustainabilityRating::Good,
            s if s >= 40 => SustainabilityRating::Fair,
            s if s >= 20 => SustainabilityRating::BelowAverage,
            _ => SustainabilityRating::Poor,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SustainabilityRating::Excellent => "Excellent",
            SustainabilityRating::Good => "Good",
            SustainabilityRating::Fair => "Fair",
            SustainabilityRating::BelowAverage => "Below Average",
            SustainabilityRating::Poor => "Poor",
        }
    }
}

/// Colour band for a live SI readout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiTier {
    High,
    Medium,
    Low,
    Critical,
}

impl SiTier {
    pub fn for_si(si: f64) -> Self {
        if si >= 85.0 {
            SiTier::High
        } else if si >= 70.0 {
            SiTier::Medium
        } else if si >= 50.0 {
            SiTier::Low
        } else {
            SiTier::Critical
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    Healthy,
    Tight,
    Critical,
}

impl BudgetStatus {
    pub fn for_usage(spent: i64, total: i64) -> Self {
        if total <= 0 {
            return BudgetStatus::Critical;
        }
        let percentage = spent as f64 / total as f64 * 100.0;
        if percentage < 70.0 {
            BudgetStatus::Healthy
        } else if percentage < 90.0 {
            BudgetStatus::Tight
        } else {
            BudgetStatus::Critical
        }
    }
}

/// Title shown on the results screen for a mission's SI
pub fn mission_rank_title(si: f64) -> &'static str {
    if si >= 90.0 {
        "Legendary"
    } else if si >= 80.0 {
        "Excellent"
    } else if si >= 70.0 {
        "Great"
    } else if si >= 60.0 {
        "Good"
    } else {
        "Promising"
    }
}

// ==========================================
// Achievements
// ==========================================

pub const HIGH_SI_THRESHOLD: f64 = 85.0;
/// Share of the budget that must be left for Budget Master
pub const BUDGET_MASTER_SAVINGS_PERCENT: f64 = 20.0;
pub const HIGH_SI_COMPONENT: i32 = 8;
pub const GLOBAL_LEADER_RANK: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Achievement {
    #[serde(rename = "first_mission_completed")]
    SpacePioneer,
    #[serde(rename = "high_sustainability")]
    SustainabilityChampion,
    #[serde(rename = "budget_efficient")]
    BudgetMaster,
    #[serde(rename = "all_advanced_tech")]
    TechInnovator,
    #[serde(rename = "top_leaderboard")]
    GlobalLeader,
}

impl Achievement {
    /// Type key used by the achievements endpoint
    pub fn type_key(&self) -> &'static str {
        match self {
            Achievement::SpacePioneer => "first_mission_completed",
            Achievement::SustainabilityChampion => "high_sustainability",
            Achievement::BudgetMaster => "budget_efficient",
            Achievement::TechInnovator => "all_advanced_tech",
            Achievement::GlobalLeader => "top_leaderboard",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Achievement::SpacePioneer => "Space Pioneer",
            Achievement::SustainabilityChampion => "Sustainability Champion",
            Achievement::BudgetMaster => "Budget Master",
            Achievement::TechInnovator => "Tech Innovator",
            Achievement::GlobalLeader => "Global Leader",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Achievement::SpacePioneer => "Complete your first mission",
            Achievement::SustainabilityChampion => "Achieve SI score above 85",
            Achievement::BudgetMaster => "Complete mission under 80% of budget",
            Achievement::TechInnovator => "Use only high-SI components",
            Achievement::GlobalLeader => "Reach top 10 in leaderboard",
        }
    }
}

/// Achievements earned by a completed mission.
/// `rank` is the leaderboard position when the service reported one.
pub fn earned_achievements(state: &MissionState, si: f64, rank: Option<u32>) -> Vec<Achievement> {
    let mut earned = vec![Achievement::SpacePioneer];

    if si >= HIGH_SI_THRESHOLD {
        earned.push(Achievement::SustainabilityChampion);
    }

    if state.total_budget > 0 {
        let saved = state.remaining_budget() as f64 / state.total_budget as f64 * 100.0;
        if saved >= BUDGET_MASTER_SAVINGS_PERCENT {
            earned.push(Achievement::BudgetMaster);
        }
    }

    let components = state.selected_components();
    if !components.is_empty()
        && components
            .iter()
            .all(|c| c.component.si_impact >= HIGH_SI_COMPONENT)
    {
        earned.push(Achievement::TechInnovator);
    }

    if rank.is_some_and(|r| r >= 1 && r <= GLOBAL_LEADER_RANK) {
        earned.push(Achievement::GlobalLeader);
    }

    earned
}

// ==========================================
// Formatting
// ==========================================

/// Format whole dollars with thousands separators (e.g., "$12,500")
pub fn format_usd(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

/// SI with one decimal, as shown on score cards
pub fn format_si(si: f64) -> String {
    format!("{:.1}", si)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Component;
    use crate::country::CountryCode;
    use crate::payload::PayloadKind;

    #[test]
    fn test_sustainability_rating_bands() {
        assert_eq!(SustainabilityRating::for_si(95), SustainabilityRating::Excellent);
        assert_eq!(SustainabilityRating::for_si(80), SustainabilityRating::Excellent);
        assert_eq!(SustainabilityRating::for_si(79), SustainabilityRating::Good);
        assert_eq!(SustainabilityRating::for_si(40), SustainabilityRating::Fair);
        assert_eq!(SustainabilityRating::for_si(20), SustainabilityRating::BelowAverage);
        assert_eq!(SustainabilityRating::for_si(-5), SustainabilityRating::Poor);
        assert_eq!(SustainabilityRating::BelowAverage.label(), "Below Average");
    }

    #[test]
    fn test_si_tiers() {
        assert_eq!(SiTier::for_si(85.0), SiTier::High);
        assert_eq!(SiTier::for_si(70.0), SiTier::Medium);
        assert_eq!(SiTier::for_si(50.0), SiTier::Low);
        assert_eq!(SiTier::for_si(49.9), SiTier::Critical);
    }

    #[test]
    fn test_budget_status() {
        assert_eq!(BudgetStatus::for_usage(3_000, 5_000), BudgetStatus::Healthy);
        assert_eq!(BudgetStatus::for_usage(4_000, 5_000), BudgetStatus::Tight);
        assert_eq!(BudgetStatus::for_usage(4_500, 5_000), BudgetStatus::Critical);
        assert_eq!(BudgetStatus::for_usage(0, 0), BudgetStatus::Critical);
    }

    #[test]
    fn test_rank_titles() {
        assert_eq!(mission_rank_title(92.0), "Legendary");
        assert_eq!(mission_rank_title(61.0), "Good");
        assert_eq!(mission_rank_title(12.0), "Promising");
    }

    #[test]
    fn test_achievements_for_green_cheap_mission() {
        let mut state = MissionState::new();
        state.set_selected_country(CountryCode::OM.country());
        state.add_component(Component::new("a", PayloadKind::Infrastructure, 300, 1.4, 15));
        state.add_component(Component::new("b", PayloadKind::Infrastructure, 150, 1.0, 10));

        let earned = earned_achievements(&state, 88.0, Some(3));
        assert_eq!(
            earned,
            vec![
                Achievement::SpacePioneer,
                Achievement::SustainabilityChampion,
                Achievement::BudgetMaster,
                Achievement::TechInnovator,
                Achievement::GlobalLeader,
            ]
        );
    }

    #[test]
    fn test_achievements_for_expensive_dirty_mission() {
        let mut state = MissionState::new();
        state.set_selected_country(CountryCode::OM.country());
        state.add_component(Component::new("a", PayloadKind::Commercial, 4_500, 1.5, -15));

        let earned = earned_achievements(&state, 35.0, Some(42));
        assert_eq!(earned, vec![Achievement::SpacePioneer]);
    }

    #[test]
    fn test_achievement_type_keys_match_serde() {
        for a in [
            Achievement::SpacePioneer,
            Achievement::SustainabilityChampion,
            Achievement::BudgetMaster,
            Achievement::TechInnovator,
            Achievement::GlobalLeader,
        ] {
            let json = serde_json::to_string(&a).unwrap();
            assert_eq!(json, format!("\"{}\"", a.type_key()));
        }
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(0), "$0");
        assert_eq!(format_usd(950), "$950");
        assert_eq!(format_usd(5_000), "$5,000");
        assert_eq!(format_usd(1_234_567), "$1,234,567");
        assert_eq!(format_usd(-2_500), "-$2,500");
        assert_eq!(format_si(62.456), "62.5");
    }
}
