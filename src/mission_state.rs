use std::collections::{BTreeMap, HashSet};
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::{Component, CATALOG};
use crate::error::ValidationError;
use crate::country::{Country, CountryCode};
use crate::crisis::CrisisChoice;
use crate::orbit::{MapPoint, OrbitKind, DEFAULT_COLLISION_PERCENT};
use crate::payload::PayloadKind;

/// SI of a mission with no components and no orbit
pub const BASE_SI: i32 = 50;

pub const MIN_SI: i32 = 0;
pub const MAX_SI: i32 = 100;

/// The three sequential mission stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionStage {
    Payload,
    Orbital,
    Crisis,
}

impl MissionStage {
    pub fn all() -> &'static [MissionStage] {
        &[MissionStage::Payload, MissionStage::Orbital, MissionStage::Crisis]
    }

    pub fn id(&self) -> &'static str {
        match self {
            MissionStage::Payload => "payload",
            MissionStage::Orbital => "orbital",
            MissionStage::Crisis => "crisis",
        }
    }

    /// Stage that must be completed before this one opens
    pub fn prerequisite(&self) -> Option<MissionStage> {
        match self {
            MissionStage::Payload => None,
            MissionStage::Orbital => Some(MissionStage::Payload),
            MissionStage::Crisis => Some(MissionStage::Orbital),
        }
    }
}

impl fmt::Display for MissionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StageStatus {
    pub completed: bool,
    /// SI snapshot recorded when the stage was completed
    pub score: Option<f64>,
}

/// Completion flags per stage. Only a full reset clears a flag.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MissionStatus {
    pub payload: StageStatus,
    pub orbital: StageStatus,
    pub crisis: StageStatus,
}

impl MissionStatus {
    pub fn get(&self, stage: MissionStage) -> &StageStatus {
        match stage {
            MissionStage::Payload => &self.payload,
            MissionStage::Orbital => &self.orbital,
            MissionStage::Crisis => &self.crisis,
        }
    }

    fn get_mut(&mut self, stage: MissionStage) -> &mut StageStatus {
        match stage {
            MissionStage::Payload => &mut self.payload,
            MissionStage::Orbital => &mut self.orbital,
            MissionStage::Crisis => &mut self.crisis,
        }
    }

    /// A stage is open once its prerequisite is completed
    pub fn is_unlocked(&self, stage: MissionStage) -> bool {
        stage
            .prerequisite()
            .map_or(true, |required| self.get(required).completed)
    }
}

/// Phases whose score and spend are charged incrementally after the
/// component phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorePhase {
    Orbital,
    Crisis,
}

/// A component placed in the mission. `selected_id` is the removal key,
/// distinct from the catalog id since a component may be added twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedComponent {
    pub selected_id: u64,
    #[serde(flatten)]
    pub component: Component,
}

/// Result of resolving the crisis stage
#[derive(Debug, Clone, PartialEq)]
pub struct CrisisOutcome {
    pub choice: CrisisChoice,
    /// SI shift drawn for the chosen response
    pub crisis_si: i32,
    /// SI before the crisis shift
    pub base_si: i32,
    /// base_si + crisis_si, clamped to 0..=100
    pub final_si: i32,
    pub crisis_score: f64,
    pub crisis_cost: i64,
    /// Running total across all three phases after the crisis
    pub total_score: f64,
    pub remaining_budget: i64,
}

/// In-progress mission data. Score and spend are tracked per phase so the
/// component recompute can never erase orbital or crisis charges; the
/// totals are always derived sums.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionState {
    pub total_budget: i64,
    component_spend: i64,
    orbital_spend: i64,
    crisis_spend: i64,
    /// Insertion order is display order
    selected_components: Vec<SelectedComponent>,
    next_selected_id: u64,
    pub selected_country: Option<CountryCode>,
    pub selected_payload: Option<PayloadKind>,
    pub selected_orbital_path: Option<OrbitKind>,
    pub orbital_path_point: Option<MapPoint>,
    pub collision_percent: u32,
    component_score: f64,
    orbital_score: f64,
    crisis_score: f64,
    pub mission_status: MissionStatus,
}

impl MissionState {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================
    // Selections
    // ==========================================

    /// Select a country; its budget becomes the mission budget. The component
    /// selection is kept and still charged. The orbit and crisis phases are
    /// dropped and must be played again against the new budget.
    pub fn set_selected_country(&mut self, country: &Country) {
        self.selected_country = Some(country.code);
        self.total_budget = country.budget;
        self.selected_orbital_path = None;
        self.orbital_path_point = None;
        self.collision_percent = 0;
        self.orbital_score = 0.0;
        self.orbital_spend = 0;
        self.crisis_score = 0.0;
        self.crisis_spend = 0;
        self.update_spent_budget();
        log::debug!("country {} selected, budget {}", country.code, country.budget);
    }

    pub fn set_selected_payload(&mut self, kind: PayloadKind) {
        self.selected_payload = Some(kind);
    }

    pub fn country(&self) -> Option<&'static Country> {
        self.selected_country.map(|code| code.country())
    }

    // ==========================================
    // Components
    // ==========================================

    pub fn selected_components(&self) -> &[SelectedComponent] {
        &self.selected_components
    }

    /// Append a component and return its selection id.
    /// Does not check the budget; callers pre-check with `can_afford`.
    pub fn add_component(&mut self, component: Component) -> u64 {
        self.next_selected_id += 1;
        let selected_id = self.next_selected_id;
        self.selected_components.push(SelectedComponent {
            selected_id,
            component,
        });
        self.update_spent_budget();
        selected_id
    }

    /// Remove the entry with this selection id. Returns false (and changes
    /// nothing) when no entry matches.
    pub fn remove_component(&mut self, selected_id: u64) -> bool {
        match self
            .selected_components
            .iter()
            .position(|c| c.selected_id == selected_id)
        {
            Some(idx) => {
                self.selected_components.remove(idx);
                self.update_spent_budget();
                true
            }
            None => false,
        }
    }

    /// Empty the selection; component score and component spend both go to zero
    pub fn clear_components(&mut self) {
        self.selected_components.clear();
        self.component_score = 0.0;
        self.component_spend = 0;
    }

    /// Recompute the component spend from the selection, then the component score
    pub fn update_spent_budget(&mut self) {
        self.component_spend = self.selected_components.iter().map(|c| c.component.cost).sum();
        self.calculate_score();
    }

    /// Component-phase score: round(Σ cost × weight). Stored and returned.
    pub fn calculate_score(&mut self) -> f64 {
        let total: f64 = self
            .selected_components
            .iter()
            .map(|c| c.component.weighted_cost())
            .sum();
        self.component_score = total.round();
        self.component_score
    }

    /// Selected components counted per family, for the summary panel
    pub fn family_distribution(&self) -> BTreeMap<String, usize> {
        let mut distribution = BTreeMap::new();
        for selected in &self.selected_components {
            *distribution
                .entry(selected.component.family.clone())
                .or_insert(0) += 1;
        }
        distribution
    }

    /// Selected components grouped by family, in selection order within each group
    pub fn components_by_family(&self) -> BTreeMap<&str, Vec<&SelectedComponent>> {
        let mut groups: BTreeMap<&str, Vec<&SelectedComponent>> = BTreeMap::new();
        for selected in &self.selected_components {
            groups
                .entry(selected.component.family.as_str())
                .or_default()
                .push(selected);
        }
        groups
    }

    pub fn category_distribution(&self) -> BTreeMap<PayloadKind, usize> {
        let mut distribution = BTreeMap::new();
        for selected in &self.selected_components {
            *distribution.entry(selected.component.category).or_insert(0) += 1;
        }
        distribution
    }

    // ==========================================
    // Score and Budget
    // ==========================================

    pub fn add_to_score(&mut self, phase: ScorePhase, delta: f64) {
        match phase {
            ScorePhase::Orbital => self.orbital_score += delta,
            ScorePhase::Crisis => self.crisis_score += delta,
        }
    }

    pub fn add_to_spent_budget(&mut self, phase: ScorePhase, amount: i64) {
        match phase {
            ScorePhase::Orbital => self.orbital_spend += amount,
            ScorePhase::Crisis => self.crisis_spend += amount,
        }
    }

    /// Running total: component + orbital + crisis
    pub fn score(&self) -> f64 {
        self.component_score + self.orbital_score + self.crisis_score
    }

    pub fn component_score(&self) -> f64 {
        self.component_score
    }

    pub fn orbital_score(&self) -> f64 {
        self.orbital_score
    }

    pub fn crisis_score(&self) -> f64 {
        self.crisis_score
    }

    /// Total spend: component + orbital + crisis
    pub fn spent_budget(&self) -> i64 {
        self.component_spend + self.orbital_spend + self.crisis_spend
    }

    pub fn component_spend(&self) -> i64 {
        self.component_spend
    }

    pub fn orbital_spend(&self) -> i64 {
        self.orbital_spend
    }

    pub fn crisis_spend(&self) -> i64 {
        self.crisis_spend
    }

    pub fn remaining_budget(&self) -> i64 {
        self.total_budget - self.spent_budget()
    }

    pub fn can_afford(&self, cost: i64) -> bool {
        self.spent_budget() + cost <= self.total_budget
    }

    /// Percentage of the budget already spent (0 when there is no budget)
    pub fn budget_used_percent(&self) -> f64 {
        if self.total_budget <= 0 {
            0.0
        } else {
            self.spent_budget() as f64 / self.total_budget as f64 * 100.0
        }
    }

    // ==========================================
    // Sustainability Index
    // ==========================================

    /// SI = clamp(0, 100, 50 + Σ component si_impact + orbit si_impact).
    /// Crisis impact is applied separately by `resolve_crisis`.
    pub fn calculate_si(&self) -> i32 {
        let payload_modifiers: i32 = self
            .selected_components
            .iter()
            .map(|c| c.component.si_impact)
            .sum();
        let orbit_modifier = self
            .selected_orbital_path
            .map(|o| o.path().si_impact)
            .unwrap_or(0);
        (BASE_SI + payload_modifiers + orbit_modifier).clamp(MIN_SI, MAX_SI)
    }

    // ==========================================
    // Phase commits
    // ==========================================

    /// Commit the orbital choice: charges the orbit cost and adds cost × weight
    /// to the score. Re-committing replaces the previous orbital charge.
    /// Returns the SI including the orbit.
    pub fn commit_orbital_path(
        &mut self,
        orbit: OrbitKind,
        point: Option<MapPoint>,
        collision_percent: u32,
    ) -> i32 {
        let path = orbit.path();
        self.selected_orbital_path = Some(orbit);
        self.orbital_path_point = point;
        self.collision_percent = collision_percent;

        self.orbital_score = 0.0;
        self.orbital_spend = 0;
        self.add_to_score(ScorePhase::Orbital, path.score());
        self.add_to_spent_budget(ScorePhase::Orbital, path.cost);

        let si = self.calculate_si();
        log::debug!("orbit {} committed, score {:.0}, SI {}", orbit, self.score(), si);
        si
    }

    /// Resolve the crisis with the chosen response. The base SI is taken
    /// before the crisis shift; the cost is charged once, so the remaining
    /// budget is simply total - spent.
    pub fn resolve_crisis(&mut self, choice: CrisisChoice, rng: &mut impl Rng) -> CrisisOutcome {
        let option = choice.option();
        let crisis_si = option.si_impact.draw(rng);
        let crisis_score = option.score();

        self.crisis_score = 0.0;
        self.crisis_spend = 0;
        self.add_to_score(ScorePhase::Crisis, crisis_score);
        self.add_to_spent_budget(ScorePhase::Crisis, option.cost);

        let base_si = self.calculate_si();
        let final_si = (base_si + crisis_si).clamp(MIN_SI, MAX_SI);

        log::debug!(
            "crisis resolved with {}: SI {} {:+} -> {}",
            choice,
            base_si,
            crisis_si,
            final_si
        );

        CrisisOutcome {
            choice,
            crisis_si,
            base_si,
            final_si,
            crisis_score,
            crisis_cost: option.cost,
            total_score: self.score(),
            remaining_budget: self.remaining_budget(),
        }
    }

    // ==========================================
    // Stage tracking
    // ==========================================

    /// Mark a stage completed with its SI snapshot
    pub fn set_mission_completed(&mut self, stage: MissionStage, score: f64) {
        *self.mission_status.get_mut(stage) = StageStatus {
            completed: true,
            score: Some(score),
        };
    }

    pub fn is_stage_unlocked(&self, stage: MissionStage) -> bool {
        self.mission_status.is_unlocked(stage)
    }

    /// Back to the empty mission
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Re-derive everything a stored mission only caches: components are
    /// replaced by their catalog entries, component spend and score are
    /// recomputed and the selection counter moves past every stored id.
    pub fn rehydrate(&mut self) -> Result<(), ValidationError> {
        for selected in &mut self.selected_components {
            selected.component = CATALOG.component(&selected.component.id)?.clone();
        }
        let mut seen = HashSet::new();
        for selected in &self.selected_components {
            if !seen.insert(selected.selected_id) {
                return Err(ValidationError::DuplicateSelection(selected.selected_id));
            }
        }
        let highest = self
            .selected_components
            .iter()
            .map(|c| c.selected_id)
            .max()
            .unwrap_or(0);
        self.next_selected_id = self.next_selected_id.max(highest);
        self.update_spent_budget();
        Ok(())
    }

    /// Collision percent to show: the committed value, or the default
    pub fn collision_or_default(&self) -> u32 {
        if self.collision_percent == 0 {
            DEFAULT_COLLISION_PERCENT
        } else {
            self.collision_percent
        }
    }
}
