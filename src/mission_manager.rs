use std::fmt::Display;

use godot::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::api::HttpMissionApi;
use crate::catalog::CATALOG;
use crate::config::ClientConfig;
use crate::country::CountryCode;
use crate::crisis::CrisisChoice;
use crate::flow::{self, CrisisCompletion, SignupForm};
use crate::mission_state::MissionStage;
use crate::orbit::{clamp_collision_percent, collision_risk_at, MapPoint, OrbitKind};
use crate::payload::PayloadKind;
use crate::rating::{format_si, format_usd, mission_rank_title, BudgetStatus};
use crate::session::Session;
use crate::store::JsonFileStore;

fn parse_stage(id: &str) -> Option<MissionStage> {
    MissionStage::all()
        .iter()
        .copied()
        .find(|s| s.id().eq_ignore_ascii_case(id.trim()))
}

/// Godot node exposing the mission session to the UI
#[derive(GodotClass)]
#[class(base=Node)]
pub struct MissionManager {
    base: Base<Node>,
    session: Session,
    api: HttpMissionApi,
    rng: ChaCha8Rng,
    last_error: String,
    last_crisis: Option<CrisisCompletion>,
}

#[godot_api]
impl INode for MissionManager {
    fn init(base: Base<Node>) -> Self {
        let config = ClientConfig::load();
        let session = Session::open(Box::new(JsonFileStore::new(&config.storage_path)));
        let mut api = HttpMissionApi::from_config(&config);
        api.set_token(session.identity().token.clone());
        godot_print!("MissionManager initialized ({})", api.base_url());
        Self {
            base,
            session,
            api,
            rng: ChaCha8Rng::from_entropy(),
            last_error: String::new(),
            last_crisis: None,
        }
    }
}

impl MissionManager {
    fn report(&mut self, err: impl Display) {
        self.last_error = err.to_string();
        godot_print!("MissionManager: {}", self.last_error);
        let message = GString::from(self.last_error.as_str());
        self.base_mut()
            .emit_signal("error_raised", &[Variant::from(message)]);
    }

    fn emit_totals(&mut self) {
        let state = self.session.mission();
        let spent = state.spent_budget();
        let remaining = state.remaining_budget();
        let score = state.score();
        let si = state.calculate_si() as i64;
        self.base_mut().emit_signal(
            "budget_changed",
            &[Variant::from(spent), Variant::from(remaining)],
        );
        self.base_mut()
            .emit_signal("score_changed", &[Variant::from(score), Variant::from(si)]);
    }

    fn emit_stage_completed(&mut self, stage: MissionStage, si: f64) {
        self.base_mut().emit_signal(
            "stage_completed",
            &[Variant::from(GString::from(stage.id())), Variant::from(si)],
        );
    }

    fn sync_token(&mut self) {
        let token = self.session.identity().token.clone();
        self.api.set_token(token);
    }
}

#[godot_api]
impl MissionManager {
    // ==========================================
    // Signals
    // ==========================================

    #[signal]
    fn budget_changed(spent: i64, remaining: i64);

    #[signal]
    fn score_changed(score: f64, si: i64);

    #[signal]
    fn stage_completed(stage: GString, si: f64);

    #[signal]
    fn session_reset();

    #[signal]
    fn error_raised(message: GString);

    /// Message of the last failed action
    #[func]
    pub fn get_last_error(&self) -> GString {
        GString::from(self.last_error.as_str())
    }

    // ==========================================
    // Account
    // ==========================================

    #[func]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    #[func]
    pub fn get_display_name(&self) -> GString {
        GString::from(self.session.user().map(|u| u.shown_name()).unwrap_or(""))
    }

    #[func]
    pub fn login(&mut self, login: GString, password: GString) -> bool {
        match flow::login(&mut self.session, &self.api, &login.to_string(), &password.to_string()) {
            Ok(()) => {
                self.sync_token();
                true
            }
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    #[func]
    pub fn signup(
        &mut self,
        email: GString,
        username: GString,
        password: GString,
        confirm_password: GString,
        display_name: GString,
    ) -> bool {
        let display_name = display_name.to_string();
        let form = SignupForm {
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            confirm_password: confirm_password.to_string(),
            display_name: (!display_name.trim().is_empty()).then_some(display_name),
        };
        match flow::signup(&mut self.session, &self.api, &form) {
            Ok(()) => {
                self.sync_token();
                true
            }
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    /// Refresh story progress and achievements from the server
    #[func]
    pub fn sync_account(&mut self) -> bool {
        match flow::sync_account(&mut self.session, &self.api) {
            Ok(()) => true,
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    /// Drop the stored assistant conversation
    #[func]
    pub fn clear_chat(&mut self) {
        self.session.clear_chat_messages();
    }

    #[func]
    pub fn logout(&mut self) {
        self.session.logout();
        self.sync_token();
        self.last_crisis = None;
        self.base_mut().emit_signal("session_reset", &[]);
        self.emit_totals();
    }

    // ==========================================
    // Budget and Score
    // ==========================================

    #[func]
    pub fn get_total_budget(&self) -> i64 {
        self.session.mission().total_budget
    }

    #[func]
    pub fn get_spent_budget(&self) -> i64 {
        self.session.mission().spent_budget()
    }

    #[func]
    pub fn get_remaining_budget(&self) -> i64 {
        self.session.mission().remaining_budget()
    }

    /// Remaining budget for display (e.g., "$1,500")
    #[func]
    pub fn get_remaining_budget_formatted(&self) -> GString {
        GString::from(format_usd(self.session.mission().remaining_budget()).as_str())
    }

    #[func]
    pub fn get_budget_used_percent(&self) -> f64 {
        self.session.mission().budget_used_percent()
    }

    /// "healthy", "tight" or "critical"
    #[func]
    pub fn get_budget_status(&self) -> GString {
        let state = self.session.mission();
        let status = match BudgetStatus::for_usage(state.spent_budget(), state.total_budget) {
            BudgetStatus::Healthy => "healthy",
            BudgetStatus::Tight => "tight",
            BudgetStatus::Critical => "critical",
        };
        GString::from(status)
    }

    #[func]
    pub fn get_score(&self) -> f64 {
        self.session.mission().score()
    }

    #[func]
    pub fn get_si(&self) -> i64 {
        self.session.mission().calculate_si() as i64
    }

    // ==========================================
    // Country and Payload
    // ==========================================

    #[func]
    pub fn get_country_codes(&self) -> Array<GString> {
        let mut result = Array::new();
        for code in CountryCode::all() {
            result.push(&GString::from(code.as_str()));
        }
        result
    }

    #[func]
    pub fn get_country_name(&self, code: GString) -> GString {
        let name = code
            .to_string()
            .parse::<CountryCode>()
            .map(|c| c.country().name)
            .unwrap_or("");
        GString::from(name)
    }

    #[func]
    pub fn get_country_budget(&self, code: GString) -> i64 {
        code.to_string()
            .parse::<CountryCode>()
            .map(|c| c.country().budget)
            .unwrap_or(0)
    }

    #[func]
    pub fn select_country(&mut self, code: GString) -> bool {
        match code.to_string().parse::<CountryCode>() {
            Ok(code) => {
                self.session.select_country(code);
                self.emit_totals();
                true
            }
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    #[func]
    pub fn select_payload(&mut self, payload_id: GString) -> bool {
        match payload_id.to_string().parse::<PayloadKind>() {
            Ok(kind) => {
                self.session.select_payload(kind);
                true
            }
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    // ==========================================
    // Components
    // ==========================================

    /// Catalog ids visible for the selected payload
    #[func]
    pub fn get_available_component_ids(&self) -> Array<GString> {
        let mut result = Array::new();
        if let Some(kind) = self.session.mission().selected_payload {
            for component in CATALOG.for_payload(kind) {
                result.push(&GString::from(component.id.as_str()));
            }
        }
        result
    }

    #[func]
    pub fn get_component_name(&self, component_id: GString) -> GString {
        let id = component_id.to_string();
        GString::from(CATALOG.component(&id).map(|c| c.name.as_str()).unwrap_or(""))
    }

    #[func]
    pub fn get_component_cost(&self, component_id: GString) -> i64 {
        let id = component_id.to_string();
        CATALOG.component(&id).map(|c| c.cost).unwrap_or(0)
    }

    #[func]
    pub fn can_afford_component(&self, component_id: GString) -> bool {
        let id = component_id.to_string();
        CATALOG
            .component(&id)
            .map(|c| self.session.mission().can_afford(c.cost))
            .unwrap_or(false)
    }

    /// Add a catalog component. Returns its selection id, or -1 when refused.
    #[func]
    pub fn add_component(&mut self, component_id: GString) -> i64 {
        match flow::add_component_checked(&mut self.session, &component_id.to_string()) {
            Ok(selected_id) => {
                self.emit_totals();
                selected_id as i64
            }
            Err(e) => {
                self.report(e);
                -1
            }
        }
    }

    #[func]
    pub fn remove_component(&mut self, selected_id: i64) -> bool {
        if selected_id < 0 || !self.session.remove_component(selected_id as u64) {
            return false;
        }
        self.emit_totals();
        true
    }

    #[func]
    pub fn clear_components(&mut self) {
        self.session.clear_components();
        self.emit_totals();
    }

    #[func]
    pub fn get_selected_count(&self) -> i32 {
        self.session.mission().selected_components().len() as i32
    }

    #[func]
    pub fn get_selected_id(&self, index: i32) -> i64 {
        self.session
            .mission()
            .selected_components()
            .get(index as usize)
            .map(|s| s.selected_id as i64)
            .unwrap_or(-1)
    }

    #[func]
    pub fn get_selected_name(&self, index: i32) -> GString {
        GString::from(
            self.session
                .mission()
                .selected_components()
                .get(index as usize)
                .map(|s| s.component.name.as_str())
                .unwrap_or(""),
        )
    }

    // ==========================================
    // Stages
    // ==========================================

    #[func]
    pub fn is_stage_unlocked(&self, stage: GString) -> bool {
        parse_stage(&stage.to_string())
            .map(|s| self.session.mission().is_stage_unlocked(s))
            .unwrap_or(false)
    }

    #[func]
    pub fn is_stage_completed(&self, stage: GString) -> bool {
        parse_stage(&stage.to_string())
            .map(|s| self.session.mission().mission_status.get(s).completed)
            .unwrap_or(false)
    }

    /// Save the payload mission to the service
    #[func]
    pub fn complete_payload_mission(&mut self, mission_name: GString) -> bool {
        match flow::complete_payload_mission(&mut self.session, &self.api, &mission_name.to_string()) {
            Ok(completion) => {
                self.emit_stage_completed(MissionStage::Payload, completion.si_score);
                true
            }
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    // ==========================================
    // Orbital
    // ==========================================

    /// Collision percent for a point picked on the map
    #[func]
    pub fn get_collision_risk_at(&mut self, lat: f64, lng: f64) -> i64 {
        collision_risk_at(MapPoint { lat, lng }, &mut self.rng) as i64
    }

    /// Committed collision percent, or the default before an orbit is chosen
    #[func]
    pub fn get_collision_percent(&self) -> i64 {
        self.session.mission().collision_or_default() as i64
    }

    /// SI impact shown on an orbit card for the given collision percent
    #[func]
    pub fn get_orbit_si_preview(&self, orbit_id: GString, collision_percent: i64) -> f64 {
        orbit_id
            .to_string()
            .parse::<OrbitKind>()
            .map(|o| o.path().displayed_si_impact(clamp_collision_percent(collision_percent)))
            .unwrap_or(0.0)
    }

    #[func]
    pub fn commit_orbit(&mut self, orbit_id: GString, lat: f64, lng: f64, collision_percent: i64) -> bool {
        let orbit = match orbit_id.to_string().parse::<OrbitKind>() {
            Ok(orbit) => orbit,
            Err(e) => {
                self.report(e);
                return false;
            }
        };
        let point = MapPoint { lat, lng };
        let collision = clamp_collision_percent(collision_percent);
        let result = flow::commit_orbit(&mut self.session, &self.api, orbit, Some(point), collision);
        self.emit_totals();
        match result {
            Ok(completion) => {
                self.emit_stage_completed(MissionStage::Orbital, completion.si_score as f64);
                true
            }
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    // ==========================================
    // Crisis
    // ==========================================

    #[func]
    pub fn resolve_crisis(&mut self, choice_id: GString) -> bool {
        let choice = match choice_id.to_string().parse::<CrisisChoice>() {
            Ok(choice) => choice,
            Err(e) => {
                self.report(e);
                return false;
            }
        };
        let result = flow::resolve_crisis(&mut self.session, &self.api, choice, &mut self.rng);
        self.emit_totals();
        match result {
            Ok(completion) => {
                let final_si = completion.outcome.final_si as f64;
                self.last_crisis = Some(completion);
                self.emit_stage_completed(MissionStage::Crisis, final_si);
                true
            }
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    #[func]
    pub fn get_final_si(&self) -> i64 {
        self.last_crisis
            .as_ref()
            .map(|c| c.outcome.final_si as i64)
            .unwrap_or(0)
    }

    /// Leaderboard rank after the crisis, -1 when unknown
    #[func]
    pub fn get_final_rank(&self) -> i64 {
        self.last_crisis
            .as_ref()
            .and_then(|c| c.rank)
            .map(|r| r as i64)
            .unwrap_or(-1)
    }

    #[func]
    pub fn get_sustainability_rating(&self) -> GString {
        GString::from(
            self.last_crisis
                .as_ref()
                .map(|c| c.rating.label())
                .unwrap_or(""),
        )
    }

    // ==========================================
    // Results
    // ==========================================

    #[func]
    pub fn get_mission_rank_title(&self) -> GString {
        let si = self.session.current_mission().map(|m| m.si_score).unwrap_or(0.0);
        GString::from(mission_rank_title(si))
    }

    #[func]
    pub fn get_mission_si_formatted(&self) -> GString {
        let si = self.session.current_mission().map(|m| m.si_score).unwrap_or(0.0);
        GString::from(format_si(si).as_str())
    }

    /// Award the results screen achievements; returns their titles
    #[func]
    pub fn award_achievements(&mut self) -> Array<GString> {
        let rank = self.last_crisis.as_ref().and_then(|c| c.rank);
        let mut result = Array::new();
        match flow::award_achievements(&mut self.session, &self.api, rank) {
            Ok(earned) => {
                for achievement in earned {
                    result.push(&GString::from(achievement.title()));
                }
            }
            Err(e) => self.report(e),
        }
        result
    }

    /// Clear the mission and start over; the player stays signed in
    #[func]
    pub fn play_again(&mut self) {
        flow::play_again(&mut self.session);
        self.last_crisis = None;
        self.base_mut().emit_signal("session_reset", &[]);
        self.emit_totals();
    }
}
