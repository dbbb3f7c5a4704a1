/// Page-level mission actions: sign in, build the payload, commit the
/// orbit, answer the crisis. Each action validates first, computes scores
/// locally, then reports them to the service. Local state is never rolled
/// back when the service call fails; the stage is simply left incomplete so
/// the action can be retried.

use rand::Rng;

use crate::api::{
    AwardAchievementRequest, CompleteMissionRequest, CreateMissionRequest,
    LeaderboardAddRequest, LeaderboardCrisisRequest, LeaderboardUpdateRequest, LoginRequest,
    MissionApi, MissionComponentRequest, MissionId, SignupRequest, UserId,
};
use crate::catalog::CATALOG;
use crate::crisis::CrisisChoice;
use crate::error::{FlowResult, ValidationError};
use crate::mission_state::{CrisisOutcome, MissionStage, MissionState};
use crate::orbit::{MapPoint, OrbitKind};
use crate::rating::{earned_achievements, Achievement, SustainabilityRating};
use crate::session::Session;
use crate::store::CurrentMission;

pub const MIN_PASSWORD_LEN: usize = 6;

// ==========================================
// Guards
// ==========================================

/// Refuse to open a stage whose prerequisite is not completed
pub fn require_stage(state: &MissionState, stage: MissionStage) -> Result<(), ValidationError> {
    match stage.prerequisite() {
        Some(required) if !state.mission_status.get(required).completed => {
            Err(ValidationError::StageLocked {
                requested: stage,
                required,
            })
        }
        _ => Ok(()),
    }
}

fn require_user(session: &Session) -> Result<UserId, ValidationError> {
    session
        .user()
        .map(|u| u.id)
        .ok_or(ValidationError::NotAuthenticated)
}

fn require_current_mission(session: &Session) -> Result<CurrentMission, ValidationError> {
    session
        .current_mission()
        .cloned()
        .ok_or(ValidationError::NoCurrentMission)
}

// ==========================================
// Auth
// ==========================================

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub display_name: Option<String>,
}

impl SignupForm {
    pub fn validate(&self) -> Result<SignupRequest, ValidationError> {
        if self.email.trim().is_empty()
            || self.username.trim().is_empty()
            || self.password.is_empty()
        {
            return Err(ValidationError::MissingField("required fields"));
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            });
        }
        let display_name = self
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.username.trim());
        Ok(SignupRequest {
            email: self.email.trim().to_string(),
            username: self.username.trim().to_string(),
            password: self.password.clone(),
            display_name: display_name.to_string(),
        })
    }
}

/// Sign in with a username or email
pub fn login(session: &mut Session, api: &dyn MissionApi, login: &str, password: &str) -> FlowResult<()> {
    if login.trim().is_empty() || password.is_empty() {
        return Err(ValidationError::MissingField("login and password").into());
    }
    let auth = api.login(&LoginRequest {
        login: login.trim().to_string(),
        password: password.to_string(),
    })?;
    session.sign_in(auth);
    Ok(())
}

pub fn signup(session: &mut Session, api: &dyn MissionApi, form: &SignupForm) -> FlowResult<()> {
    let request = form.validate()?;
    let auth = api.signup(&request)?;
    session.sign_in(auth);
    Ok(())
}

/// Pull the signed-in player's story progress and earned achievements from
/// the server. Unrecognised achievement types are skipped.
pub fn sync_account(session: &mut Session, api: &dyn MissionApi) -> FlowResult<()> {
    let user_id = require_user(session)?;
    let progress = api.progress(user_id)?;
    let mut achievements = Vec::new();
    for record in api.user_achievements(user_id)? {
        match record.achievement() {
            Some(a) if !achievements.contains(&a) => achievements.push(a),
            Some(_) => {}
            None => log::debug!("skipping unknown achievement '{}'", record.achievement_type),
        }
    }
    log::info!(
        "synced account {}: screen {}, {} achievements",
        user_id,
        progress.current_screen,
        achievements.len()
    );
    session.set_progress(progress);
    session.set_achievements(achievements);
    Ok(())
}

// ==========================================
// Payload phase
// ==========================================

/// Add a catalog component after checking it fits the remaining budget
pub fn add_component_checked(session: &mut Session, component_id: &str) -> Result<u64, ValidationError> {
    let component = CATALOG.component(component_id)?;
    let state = session.mission();
    if !state.can_afford(component.cost) {
        return Err(ValidationError::InsufficientBudget {
            cost: component.cost,
            remaining: state.remaining_budget(),
        });
    }
    Ok(session.add_component(component.clone()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct PayloadCompletion {
    pub mission_id: MissionId,
    pub mission_name: String,
    pub components_count: usize,
    pub budget_spent: i64,
    pub score: f64,
    pub si_score: f64,
}

/// Save the payload mission: create it, attach every component, complete
/// it with the SI and add it to the leaderboard. Only then is it recorded
/// as the current mission and the payload stage marked complete.
pub fn complete_payload_mission(
    session: &mut Session,
    api: &dyn MissionApi,
    mission_name: &str,
) -> FlowResult<PayloadCompletion> {
    let user_id = require_user(session)?;
    let state = session.mission();
    if state.selected_components().is_empty() {
        return Err(ValidationError::NoComponents.into());
    }
    let mission_name = mission_name.trim();
    if mission_name.is_empty() {
        return Err(ValidationError::EmptyMissionName.into());
    }
    let country = state
        .selected_country
        .ok_or(ValidationError::MissingSelection("country"))?;
    let payload = state
        .selected_payload
        .ok_or(ValidationError::MissingSelection("payload type"))?;

    let si_score = state.calculate_si() as f64;
    let score = state.score();
    let budget_spent = state.spent_budget();
    let collision_risk = state.collision_percent;

    let mission_id = api.create_mission(&CreateMissionRequest {
        user_id,
        mission_name: mission_name.to_string(),
        country_code: country,
        total_budget: budget_spent,
        payload_type: payload,
        orbital_path: state.selected_orbital_path,
        orbital_latitude: state.orbital_path_point.map(|p| p.lat),
        orbital_longitude: state.orbital_path_point.map(|p| p.lng),
        collision_risk,
    })?;

    for selected in state.selected_components() {
        let component = &selected.component;
        api.add_mission_component(&MissionComponentRequest {
            mission_id,
            category: component.category,
            component_name: component.name.clone(),
            cost: component.cost,
            si_impact: component.si_impact,
            weight: component.weight,
            subcategory: component.subcategory.clone(),
        })?;
    }

    api.complete_mission(&CompleteMissionRequest {
        mission_id,
        si_score,
        status: "completed",
    })?;

    let components_count = state.selected_components().len();
    api.leaderboard_add(&LeaderboardAddRequest {
        user_id,
        mission_id,
        mission_name: mission_name.to_string(),
        country_code: country,
        si_score,
        score,
        total_budget: budget_spent,
        components_count,
        payload_type: payload,
        orbital_path: state.selected_orbital_path,
        collision_risk,
    })?;

    log::info!(
        "mission {} '{}' saved with {} components, SI {}",
        mission_id,
        mission_name,
        components_count,
        si_score
    );

    session.set_current_mission(CurrentMission {
        id: mission_id,
        name: mission_name.to_string(),
        si_score,
    });
    session.set_mission_completed(MissionStage::Payload, si_score);

    Ok(PayloadCompletion {
        mission_id,
        mission_name: mission_name.to_string(),
        components_count,
        budget_spent,
        score,
        si_score,
    })
}

// ==========================================
// Orbital phase
// ==========================================

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitalCompletion {
    pub orbit: OrbitKind,
    pub collision_percent: u32,
    pub score: f64,
    /// New SI minus the SI recorded with the payload mission
    pub si_change: f64,
    pub si_score: i32,
}

/// Commit the orbit locally and push the new totals to the leaderboard.
/// The orbital stage is completed only when the service accepts the update.
pub fn commit_orbit(
    session: &mut Session,
    api: &dyn MissionApi,
    orbit: OrbitKind,
    point: Option<MapPoint>,
    collision_percent: u32,
) -> FlowResult<OrbitalCompletion> {
    let user_id = require_user(session)?;
    require_stage(session.mission(), MissionStage::Orbital)?;
    let current = require_current_mission(session)?;

    let si = session.commit_orbital_path(orbit, point, collision_percent);
    let score = session.mission().score();

    api.leaderboard_update(&LeaderboardUpdateRequest {
        user_id,
        mission_id: current.id,
        si_score: si as f64,
        score,
        orbital_path: orbit,
        collision_risk: collision_percent,
    })?;

    session.set_mission_completed(MissionStage::Orbital, si as f64);
    log::info!("orbit {} recorded for mission {}, SI {}", orbit, current.id, si);

    Ok(OrbitalCompletion {
        orbit,
        collision_percent,
        score,
        si_change: si as f64 - current.si_score,
        si_score: si,
    })
}

// ==========================================
// Crisis phase
// ==========================================

#[derive(Debug, Clone, PartialEq)]
pub struct CrisisCompletion {
    pub outcome: CrisisOutcome,
    /// Leaderboard rank, when the service reports one
    pub rank: Option<u32>,
    pub rating: SustainabilityRating,
}

/// Resolve the crisis and report the final SI. The crisis stage is
/// completed only when the service accepts the result.
pub fn resolve_crisis(
    session: &mut Session,
    api: &dyn MissionApi,
    choice: CrisisChoice,
    rng: &mut impl Rng,
) -> FlowResult<CrisisCompletion> {
    let user_id = require_user(session)?;
    require_stage(session.mission(), MissionStage::Crisis)?;
    let current = require_current_mission(session)?;

    // A retried crisis replaces its earlier charge
    let option = choice.option();
    let state = session.mission();
    let available = state.remaining_budget() + state.crisis_spend();
    if option.cost > available {
        return Err(ValidationError::InsufficientBudget {
            cost: option.cost,
            remaining: available,
        }
        .into());
    }

    let outcome = session.resolve_crisis(choice, rng);

    let rank = api.leaderboard_crisis(&LeaderboardCrisisRequest {
        user_id,
        mission_id: current.id,
        final_si_score: outcome.final_si,
        score: outcome.total_score,
        crisis_decision: choice,
        crisis_si_impact: outcome.crisis_si,
        crisis_cost: outcome.crisis_cost,
    })?;

    session.set_mission_completed(MissionStage::Crisis, outcome.final_si as f64);
    log::info!(
        "crisis answered with {} for mission {}, final SI {}, rank {:?}",
        choice,
        current.id,
        outcome.final_si,
        rank
    );

    Ok(CrisisCompletion {
        rating: SustainabilityRating::for_si(outcome.final_si),
        outcome,
        rank,
    })
}

// ==========================================
// Results
// ==========================================

/// Work out the achievements of the current mission, record new ones in the
/// session and report them to the service. Award failures are logged only.
pub fn award_achievements(
    session: &mut Session,
    api: &dyn MissionApi,
    rank: Option<u32>,
) -> FlowResult<Vec<Achievement>> {
    let user_id = require_user(session)?;
    let current = require_current_mission(session)?;
    let earned = earned_achievements(session.mission(), current.si_score, rank);

    for achievement in &earned {
        if session.add_achievement(*achievement) {
            let request = AwardAchievementRequest::new(user_id, *achievement, Some(current.id));
            if let Err(e) = api.award_achievement(&request) {
                log::warn!("could not award {}: {}", achievement.type_key(), e);
            }
        }
    }
    Ok(earned)
}

/// "Play again"
pub fn play_again(session: &mut Session) {
    session.reset_missions();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::*;
    use crate::country::CountryCode;
    use crate::error::{ApiError, FlowError};
    use crate::payload::PayloadKind;
    use crate::store::{MemoryStore, Progress};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::cell::RefCell;

    /// In-memory service that records calls and can fail one endpoint
    #[derive(Default)]
    struct ScriptedApi {
        calls: RefCell<Vec<&'static str>>,
        fail: Option<(&'static str, u16)>,
        mission_id: MissionId,
        rank: Option<u32>,
        updates: RefCell<Vec<LeaderboardUpdateRequest>>,
        crisis: RefCell<Vec<LeaderboardCrisisRequest>>,
    }

    impl ScriptedApi {
        fn new() -> Self {
            Self {
                mission_id: 77,
                rank: Some(4),
                ..Default::default()
            }
        }

        fn failing(endpoint: &'static str, status: u16) -> Self {
            Self {
                fail: Some((endpoint, status)),
                ..Self::new()
            }
        }

        fn hit(&self, endpoint: &'static str) -> Result<(), ApiError> {
            self.calls.borrow_mut().push(endpoint);
            match self.fail {
                Some((failing, 404)) if failing == endpoint => Err(ApiError::NotFound {
                    endpoint: endpoint.to_string(),
                }),
                Some((failing, status)) if failing == endpoint => Err(ApiError::Status {
                    endpoint: endpoint.to_string(),
                    status,
                    message: "server error".to_string(),
                }),
                _ => Ok(()),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.borrow().clone()
        }
    }

    fn player() -> User {
        User {
            id: 3,
            username: "rin".to_string(),
            display_name: Some("Rin".to_string()),
            email: None,
            country_code: None,
        }
    }

    impl MissionApi for ScriptedApi {
        fn login(&self, _request: &LoginRequest) -> Result<AuthResponse, ApiError> {
            self.hit("login")?;
            Ok(AuthResponse {
                user: player(),
                token: "t0k".to_string(),
            })
        }
        fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ApiError> {
            self.hit("signup")?;
            let mut user = player();
            user.display_name = Some(request.display_name.clone());
            Ok(AuthResponse {
                user,
                token: "t0k".to_string(),
            })
        }
        fn verify(&self, _token: &str) -> Result<User, ApiError> {
            self.hit("verify")?;
            Ok(player())
        }
        fn create_mission(&self, _request: &CreateMissionRequest) -> Result<MissionId, ApiError> {
            self.hit("create")?;
            Ok(self.mission_id)
        }
        fn add_mission_component(&self, _request: &MissionComponentRequest) -> Result<(), ApiError> {
            self.hit("add_component")
        }
        fn complete_mission(&self, _request: &CompleteMissionRequest) -> Result<(), ApiError> {
            self.hit("complete")
        }
        fn user_missions(&self, _user_id: UserId) -> Result<Vec<MissionRecord>, ApiError> {
            self.hit("user_missions")?;
            Ok(Vec::new())
        }
        fn mission_details(&self, _mission_id: MissionId) -> Result<MissionDetails, ApiError> {
            self.hit("mission_details")?;
            Err(ApiError::NotFound {
                endpoint: "mission_details".to_string(),
            })
        }
        fn leaderboard_add(&self, _request: &LeaderboardAddRequest) -> Result<(), ApiError> {
            self.hit("leaderboard_add")
        }
        fn leaderboard_update(&self, request: &LeaderboardUpdateRequest) -> Result<(), ApiError> {
            self.hit("leaderboard_update")?;
            self.updates.borrow_mut().push(request.clone());
            Ok(())
        }
        fn leaderboard_crisis(&self, request: &LeaderboardCrisisRequest) -> Result<Option<u32>, ApiError> {
            self.hit("leaderboard_crisis")?;
            self.crisis.borrow_mut().push(request.clone());
            Ok(self.rank)
        }
        fn leaderboard(&self, _query: &LeaderboardQuery) -> Result<Vec<LeaderboardEntry>, ApiError> {
            self.hit("leaderboard")?;
            Ok(Vec::new())
        }
        fn update_progress(&self, _request: &ProgressUpdateRequest) -> Result<(), ApiError> {
            self.hit("update_progress")
        }
        fn progress(&self, _user_id: UserId) -> Result<Progress, ApiError> {
            self.hit("progress")?;
            Ok(Progress {
                current_screen: "orbital".to_string(),
                completed_screens: vec!["landing".to_string(), "payload".to_string()],
                ..Progress::default()
            })
        }
        fn award_achievement(&self, _request: &AwardAchievementRequest) -> Result<(), ApiError> {
            self.hit("award_achievement")
        }
        fn user_achievements(&self, _user_id: UserId) -> Result<Vec<AchievementRecord>, ApiError> {
            self.hit("user_achievements")?;
            let record = |key: &str| AchievementRecord {
                achievement_type: key.to_string(),
                title: None,
                mission_id: None,
                earned_at: None,
            };
            Ok(vec![
                record("first_mission_completed"),
                record("retired_badge"),
                record("first_mission_completed"),
                record("top_leaderboard"),
            ])
        }
    }

    fn session() -> Session {
        Session::open(Box::new(MemoryStore::new()))
    }

    /// Signed in, Oman, infrastructure payload, two components (cost 450)
    fn ready_session(api: &ScriptedApi) -> Session {
        let mut session = session();
        login(&mut session, api, "rin", "secret1").unwrap();
        session.select_country(CountryCode::OM);
        session.select_payload(PayloadKind::Infrastructure);
        add_component_checked(&mut session, "refuel_mega_coalition").unwrap();
        add_component_checked(&mut session, "debris_opendata_citizen").unwrap();
        session
    }

    fn through_orbit(api: &ScriptedApi) -> Session {
        let mut session = ready_session(api);
        complete_payload_mission(&mut session, api, "Falaj One").unwrap();
        commit_orbit(&mut session, api, OrbitKind::Geo, None, 20).unwrap();
        session
    }

    #[test]
    fn test_stage_gating() {
        let state = MissionState::new();
        assert!(require_stage(&state, MissionStage::Payload).is_ok());
        assert_eq!(
            require_stage(&state, MissionStage::Orbital),
            Err(ValidationError::StageLocked {
                requested: MissionStage::Orbital,
                required: MissionStage::Payload,
            })
        );
        assert_eq!(
            require_stage(&state, MissionStage::Crisis),
            Err(ValidationError::StageLocked {
                requested: MissionStage::Crisis,
                required: MissionStage::Orbital,
            })
        );
    }

    #[test]
    fn test_signup_validation() {
        let mut form = SignupForm {
            email: "a@leo.test".to_string(),
            username: "ana".to_string(),
            password: "abc".to_string(),
            confirm_password: "abd".to_string(),
            display_name: None,
        };
        assert_eq!(form.validate().unwrap_err(), ValidationError::PasswordMismatch);

        form.confirm_password = "abc".to_string();
        assert_eq!(
            form.validate().unwrap_err(),
            ValidationError::PasswordTooShort { min: 6 }
        );

        form.password = "abcdef".to_string();
        form.confirm_password = "abcdef".to_string();
        let request = form.validate().unwrap();
        assert_eq!(request.display_name, "ana");

        form.username = " ".to_string();
        assert!(matches!(
            form.validate(),
            Err(ValidationError::MissingField(_))
        ));
    }

    #[test]
    fn test_signup_signs_in() {
        let api = ScriptedApi::new();
        let mut session = session();
        let form = SignupForm {
            email: "a@leo.test".to_string(),
            username: "ana".to_string(),
            password: "abcdef".to_string(),
            confirm_password: "abcdef".to_string(),
            display_name: Some("Ana".to_string()),
        };
        signup(&mut session, &api, &form).unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.user().unwrap().shown_name(), "Ana");
    }

    #[test]
    fn test_login_requires_fields() {
        let api = ScriptedApi::new();
        let mut session = session();
        let err = login(&mut session, &api, "", "pw").unwrap_err();
        assert!(matches!(err, FlowError::Validation(ValidationError::MissingField(_))));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_sync_account_replaces_local_copy() {
        let api = ScriptedApi::new();
        let mut session = session();
        assert!(matches!(
            sync_account(&mut session, &api),
            Err(FlowError::Validation(ValidationError::NotAuthenticated))
        ));
        assert!(api.calls().is_empty());

        login(&mut session, &api, "rin", "secret1").unwrap();
        session.add_achievement(Achievement::BudgetMaster);
        sync_account(&mut session, &api).unwrap();

        assert_eq!(session.progress().current_screen, "orbital");
        assert_eq!(session.progress().completed_screens.len(), 2);
        assert_eq!(
            session.achievements(),
            &[Achievement::SpacePioneer, Achievement::GlobalLeader]
        );
        assert_eq!(api.calls(), vec!["login", "progress", "user_achievements"]);
    }

    #[test]
    fn test_sync_account_failure_keeps_local_copy() {
        let api = ScriptedApi::failing("user_achievements", 500);
        let mut session = session();
        login(&mut session, &api, "rin", "secret1").unwrap();
        session.add_achievement(Achievement::BudgetMaster);

        assert!(sync_account(&mut session, &api).is_err());
        assert_eq!(session.progress(), &Progress::default());
        assert_eq!(session.achievements(), &[Achievement::BudgetMaster]);
    }

    #[test]
    fn test_add_component_budget_check() {
        let api = ScriptedApi::new();
        let mut session = ready_session(&api);
        // 5000 - 450 spent; the priciest options no longer fit after filling up
        while add_component_checked(&mut session, "refuel_mega_coalition").is_ok() {}
        let remaining = session.mission().remaining_budget();
        assert!(remaining < 300);

        let before = session.mission().clone();
        let err = add_component_checked(&mut session, "refuel_mega_coalition").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InsufficientBudget {
                cost: 300,
                remaining,
            }
        );
        assert_eq!(session.mission(), &before);
    }

    #[test]
    fn test_reselecting_country_keeps_component_charges() {
        let api = ScriptedApi::new();
        let mut session = ready_session(&api);
        while add_component_checked(&mut session, "refuel_mega_coalition").is_ok() {}
        let spent = session.mission().spent_budget();
        assert_eq!(spent, 450 + 15 * 300);

        session.select_country(CountryCode::OM);
        assert_eq!(session.mission().spent_budget(), spent);
        assert!(matches!(
            add_component_checked(&mut session, "refuel_mega_coalition"),
            Err(ValidationError::InsufficientBudget { cost: 300, remaining: 50 })
        ));

        // A bigger budget makes room again, and spend still matches the selection
        session.select_country(CountryCode::JP);
        add_component_checked(&mut session, "refuel_mega_coalition").unwrap();
        let total: i64 = session
            .mission()
            .selected_components()
            .iter()
            .map(|c| c.component.cost)
            .sum();
        assert_eq!(session.mission().spent_budget(), total);
        assert!(session.mission().spent_budget() <= session.mission().total_budget);
    }

    #[test]
    fn test_add_unknown_component() {
        let api = ScriptedApi::new();
        let mut session = ready_session(&api);
        assert!(matches!(
            add_component_checked(&mut session, "warp_drive"),
            Err(ValidationError::UnknownKey { .. })
        ));
    }

    #[test]
    fn test_complete_payload_mission_sequence() {
        let api = ScriptedApi::new();
        let mut session = ready_session(&api);
        let expected_si = session.mission().calculate_si() as f64;

        let completion = complete_payload_mission(&mut session, &api, "  Falaj One ").unwrap();
        assert_eq!(completion.mission_id, 77);
        assert_eq!(completion.mission_name, "Falaj One");
        assert_eq!(completion.components_count, 2);
        assert_eq!(completion.si_score, expected_si);

        assert_eq!(
            api.calls(),
            vec!["login", "create", "add_component", "add_component", "complete", "leaderboard_add"]
        );

        let current = session.current_mission().unwrap();
        assert_eq!(current.id, 77);
        assert_eq!(current.si_score, expected_si);
        assert_eq!(
            session.mission().mission_status.payload.score,
            Some(expected_si)
        );
        assert!(session.mission().is_stage_unlocked(MissionStage::Orbital));
    }

    #[test]
    fn test_payload_validation_order() {
        let api = ScriptedApi::new();
        let mut session = session();
        assert!(matches!(
            complete_payload_mission(&mut session, &api, "x"),
            Err(FlowError::Validation(ValidationError::NotAuthenticated))
        ));

        login(&mut session, &api, "rin", "secret1").unwrap();
        assert!(matches!(
            complete_payload_mission(&mut session, &api, "x"),
            Err(FlowError::Validation(ValidationError::NoComponents))
        ));

        session.add_component(CATALOG.component("factory_pharma_rare").unwrap().clone());
        assert!(matches!(
            complete_payload_mission(&mut session, &api, "   "),
            Err(FlowError::Validation(ValidationError::EmptyMissionName))
        ));
        assert!(matches!(
            complete_payload_mission(&mut session, &api, "x"),
            Err(FlowError::Validation(ValidationError::MissingSelection("country")))
        ));
        assert_eq!(api.calls(), vec!["login"]);
    }

    #[test]
    fn test_payload_api_failure_leaves_stage_open() {
        let api = ScriptedApi::failing("complete", 500);
        let mut session = ready_session(&api);
        let before = session.mission().clone();

        let err = complete_payload_mission(&mut session, &api, "Falaj One").unwrap_err();
        assert!(matches!(err, FlowError::Api(ApiError::Status { status: 500, .. })));
        assert!(session.current_mission().is_none());
        assert!(!session.mission().mission_status.payload.completed);
        assert_eq!(session.mission(), &before);
    }

    #[test]
    fn test_orbit_requires_payload_stage() {
        let api = ScriptedApi::new();
        let mut session = ready_session(&api);
        let err = commit_orbit(&mut session, &api, OrbitKind::Leo, None, 50).unwrap_err();
        assert!(matches!(
            err,
            FlowError::Validation(ValidationError::StageLocked { .. })
        ));
        assert_eq!(session.mission().selected_orbital_path, None);
    }

    #[test]
    fn test_commit_orbit_updates_leaderboard() {
        let api = ScriptedApi::new();
        let mut session = ready_session(&api);
        complete_payload_mission(&mut session, &api, "Falaj One").unwrap();
        let payload_si = session.current_mission().unwrap().si_score;
        let score_before = session.mission().score();

        let point = MapPoint { lat: 23.6, lng: 58.5 };
        let completion = commit_orbit(&mut session, &api, OrbitKind::Geo, Some(point), 44).unwrap();

        assert_eq!(completion.si_score, payload_si as i32 + 5);
        assert!((completion.si_change - 5.0).abs() < 1e-9);
        assert!((completion.score - (score_before + 600.0)).abs() < 1e-9);

        let updates = api.updates.borrow();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].mission_id, 77);
        assert_eq!(updates[0].collision_risk, 44);
        assert_eq!(updates[0].orbital_path, OrbitKind::Geo);

        let state = session.mission();
        assert_eq!(state.orbital_path_point, Some(point));
        assert_eq!(state.mission_status.orbital.score, Some(completion.si_score as f64));
    }

    #[test]
    fn test_orbit_not_found_keeps_local_charge() {
        let api = ScriptedApi::failing("leaderboard_update", 404);
        let mut session = ready_session(&api);
        complete_payload_mission(&mut session, &api, "Falaj One").unwrap();
        let spent = session.mission().spent_budget();

        let err = commit_orbit(&mut session, &api, OrbitKind::Meo, None, 30).unwrap_err();
        assert!(matches!(err, FlowError::Api(ApiError::NotFound { .. })));
        assert!(!session.mission().mission_status.orbital.completed);
        assert_eq!(session.mission().spent_budget(), spent + 150);

        // Retrying does not charge twice
        let _ = commit_orbit(&mut session, &api, OrbitKind::Meo, None, 30);
        assert_eq!(session.mission().spent_budget(), spent + 150);
    }

    #[test]
    fn test_resolve_crisis_reports_rank() {
        let api = ScriptedApi::new();
        let mut session = through_orbit(&api);
        let remaining = session.mission().remaining_budget();

        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let completion = resolve_crisis(&mut session, &api, CrisisChoice::Treaty, &mut rng).unwrap();

        assert_eq!(completion.rank, Some(4));
        assert_eq!(completion.outcome.crisis_si, 10);
        assert_eq!(completion.outcome.remaining_budget, remaining - 150);
        assert_eq!(
            completion.rating,
            SustainabilityRating::for_si(completion.outcome.final_si)
        );

        let crisis = api.crisis.borrow();
        assert_eq!(crisis[0].crisis_decision, CrisisChoice::Treaty);
        assert_eq!(crisis[0].final_si_score, completion.outcome.final_si);
        assert_eq!(crisis[0].crisis_cost, 150);

        assert_eq!(
            session.mission().mission_status.crisis.score,
            Some(completion.outcome.final_si as f64)
        );
    }

    #[test]
    fn test_crisis_requires_orbital_stage() {
        let api = ScriptedApi::new();
        let mut session = ready_session(&api);
        complete_payload_mission(&mut session, &api, "Falaj One").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let err = resolve_crisis(&mut session, &api, CrisisChoice::Ignore, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            FlowError::Validation(ValidationError::StageLocked {
                requested: MissionStage::Crisis,
                required: MissionStage::Orbital,
            })
        ));
    }

    #[test]
    fn test_crisis_budget_check() {
        let api = ScriptedApi::new();
        let mut session = through_orbit(&api);
        // Spend down to less than the cleanup cost
        while add_component_checked(&mut session, "debris_opendata_citizen").is_ok() {}
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        assert!(session.mission().remaining_budget() < 150);
        let err = resolve_crisis(&mut session, &api, CrisisChoice::Cleanup, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            FlowError::Validation(ValidationError::InsufficientBudget { cost: 200, .. })
        ));
        assert!(!session.mission().mission_status.crisis.completed);
        // Ignoring is always affordable
        assert!(resolve_crisis(&mut session, &api, CrisisChoice::Ignore, &mut rng).is_ok());
    }

    #[test]
    fn test_awards_recorded_once() {
        let api = ScriptedApi::new();
        let mut session = through_orbit(&api);
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let completion = resolve_crisis(&mut session, &api, CrisisChoice::Cleanup, &mut rng).unwrap();

        let earned = award_achievements(&mut session, &api, completion.rank).unwrap();
        assert_eq!(earned[0], Achievement::SpacePioneer);
        assert!(earned.contains(&Achievement::GlobalLeader));
        let awarded = api.calls().iter().filter(|c| **c == "award_achievement").count();
        assert_eq!(awarded, earned.len());

        award_achievements(&mut session, &api, completion.rank).unwrap();
        let awarded_again = api.calls().iter().filter(|c| **c == "award_achievement").count();
        assert_eq!(awarded_again, awarded);
    }

    #[test]
    fn test_play_again() {
        let api = ScriptedApi::new();
        let mut session = through_orbit(&api);
        play_again(&mut session);
        assert!(session.is_authenticated());
        assert_eq!(session.mission().score(), 0.0);
        assert_eq!(session.mission().calculate_si(), 50);
        assert!(!session.mission().is_stage_unlocked(MissionStage::Orbital));
    }
}
