/// Client for the LEOVERSE mission and leaderboard service.
///
/// Every call is a blocking JSON request. Responses share a loose envelope
/// (`success`, `message`) that is checked before the body is decoded.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::ClientConfig;
use crate::country::CountryCode;
use crate::crisis::CrisisChoice;
use crate::error::ApiError;
use crate::orbit::OrbitKind;
use crate::payload::PayloadKind;
use crate::rating::Achievement;
use crate::store::Progress;

pub type UserId = u64;
pub type MissionId = u64;

/// Ids arrive as numbers or numeric strings depending on the endpoint
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(n) => Ok(n),
        RawId::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn lenient_opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    #[derive(Deserialize)]
    struct Wrapped(#[serde(deserialize_with = "lenient_id")] u64);

    Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|w| w.0))
}

// ==========================================
// Auth
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "lenient_id")]
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
}

impl User {
    pub fn shown_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    /// Username or email
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    token: &'a str,
}

#[derive(Deserialize)]
struct VerifyResponse {
    user: User,
}

// ==========================================
// Missions
// ==========================================

#[derive(Debug, Clone, Serialize)]
pub struct CreateMissionRequest {
    pub user_id: UserId,
    pub mission_name: String,
    pub country_code: CountryCode,
    /// Amount spent on the mission, not the country budget
    pub total_budget: i64,
    pub payload_type: PayloadKind,
    pub orbital_path: Option<OrbitKind>,
    pub orbital_latitude: Option<f64>,
    pub orbital_longitude: Option<f64>,
    pub collision_risk: u32,
}

#[derive(Deserialize)]
struct CreateMissionResponse {
    #[serde(deserialize_with = "lenient_id")]
    mission_id: MissionId,
}

#[derive(Debug, Clone, Serialize)]
pub struct MissionComponentRequest {
    pub mission_id: MissionId,
    pub category: PayloadKind,
    pub component_name: String,
    pub cost: i64,
    pub si_impact: i32,
    pub weight: f64,
    pub subcategory: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompleteMissionRequest {
    pub mission_id: MissionId,
    pub si_score: f64,
    pub status: &'static str,
}

/// A saved mission as listed by the service
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MissionRecord {
    #[serde(alias = "mission_id", deserialize_with = "lenient_id")]
    pub id: MissionId,
    pub mission_name: String,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub si_score: Option<f64>,
    #[serde(default)]
    pub total_budget: Option<f64>,
    #[serde(default)]
    pub payload_type: Option<String>,
    #[serde(default)]
    pub orbital_path: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MissionComponentRecord {
    pub component_name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub si_impact: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MissionDetails {
    pub mission: MissionRecord,
    #[serde(default)]
    pub components: Vec<MissionComponentRecord>,
}

#[derive(Deserialize)]
struct MissionListResponse {
    #[serde(default)]
    missions: Vec<MissionRecord>,
}

// ==========================================
// Leaderboard
// ==========================================

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardAddRequest {
    pub user_id: UserId,
    pub mission_id: MissionId,
    pub mission_name: String,
    pub country_code: CountryCode,
    pub si_score: f64,
    pub score: f64,
    pub total_budget: i64,
    pub components_count: usize,
    pub payload_type: PayloadKind,
    pub orbital_path: Option<OrbitKind>,
    pub collision_risk: u32,
}

/// Orbital phase update of an existing leaderboard entry
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardUpdateRequest {
    pub user_id: UserId,
    pub mission_id: MissionId,
    pub si_score: f64,
    pub score: f64,
    pub orbital_path: OrbitKind,
    pub collision_risk: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardCrisisRequest {
    pub user_id: UserId,
    pub mission_id: MissionId,
    pub final_si_score: i32,
    pub score: f64,
    pub crisis_decision: CrisisChoice,
    pub crisis_si_impact: i32,
    pub crisis_cost: i64,
}

#[derive(Deserialize)]
struct CrisisResponse {
    #[serde(default)]
    data: Option<CrisisRank>,
}

#[derive(Deserialize)]
struct CrisisRank {
    #[serde(default)]
    rank: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeaderboardQuery {
    pub limit: Option<u32>,
    pub country: Option<CountryCode>,
    pub user_id: Option<UserId>,
}

impl LeaderboardQuery {
    /// Query pairs in the order the service expects; unset filters are omitted
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(country) = self.country {
            pairs.push(("country", country.to_string()));
        }
        if let Some(user_id) = self.user_id {
            pairs.push(("user_id", user_id.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    #[serde(deserialize_with = "lenient_id")]
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub mission_name: String,
    pub country_code: String,
    pub si_score: f64,
    #[serde(default)]
    pub total_budget: f64,
    #[serde(default)]
    pub components_count: u32,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Deserialize)]
struct LeaderboardResponse {
    #[serde(default)]
    leaderboard: Vec<LeaderboardEntry>,
}

// ==========================================
// Progress and achievements
// ==========================================

#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdateRequest {
    pub user_id: UserId,
    #[serde(flatten)]
    pub progress: Progress,
}

#[derive(Deserialize)]
struct ProgressResponse {
    progress: Progress,
}

#[derive(Debug, Clone, Serialize)]
pub struct AwardAchievementRequest {
    pub user_id: UserId,
    pub achievement_type: Achievement,
    pub title: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mission_id: Option<MissionId>,
}

impl AwardAchievementRequest {
    pub fn new(user_id: UserId, achievement: Achievement, mission_id: Option<MissionId>) -> Self {
        Self {
            user_id,
            achievement_type: achievement,
            title: achievement.title(),
            description: achievement.description(),
            mission_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AchievementRecord {
    pub achievement_type: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_id")]
    pub mission_id: Option<MissionId>,
    #[serde(default)]
    pub earned_at: Option<String>,
}

impl AchievementRecord {
    /// Known achievement for this record, if the type key is recognised
    pub fn achievement(&self) -> Option<Achievement> {
        serde_json::from_value(serde_json::Value::String(self.achievement_type.clone())).ok()
    }
}

#[derive(Deserialize)]
struct AchievementListResponse {
    #[serde(default)]
    achievements: Vec<AchievementRecord>,
}

/// Response with nothing of interest beyond the envelope
#[derive(Debug, Deserialize)]
struct Ack {}

// ==========================================
// Trait
// ==========================================

/// The remote persistence collaborator. Scores are computed locally before
/// any of these calls; implementations only store and rank them.
pub trait MissionApi {
    fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError>;
    fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ApiError>;
    fn verify(&self, token: &str) -> Result<User, ApiError>;

    fn create_mission(&self, request: &CreateMissionRequest) -> Result<MissionId, ApiError>;
    fn add_mission_component(&self, request: &MissionComponentRequest) -> Result<(), ApiError>;
    fn complete_mission(&self, request: &CompleteMissionRequest) -> Result<(), ApiError>;
    fn user_missions(&self, user_id: UserId) -> Result<Vec<MissionRecord>, ApiError>;
    fn mission_details(&self, mission_id: MissionId) -> Result<MissionDetails, ApiError>;

    fn leaderboard_add(&self, request: &LeaderboardAddRequest) -> Result<(), ApiError>;
    fn leaderboard_update(&self, request: &LeaderboardUpdateRequest) -> Result<(), ApiError>;
    /// Returns the mission's rank when the service reports one
    fn leaderboard_crisis(&self, request: &LeaderboardCrisisRequest) -> Result<Option<u32>, ApiError>;
    fn leaderboard(&self, query: &LeaderboardQuery) -> Result<Vec<LeaderboardEntry>, ApiError>;

    fn update_progress(&self, request: &ProgressUpdateRequest) -> Result<(), ApiError>;
    fn progress(&self, user_id: UserId) -> Result<Progress, ApiError>;
    fn award_achievement(&self, request: &AwardAchievementRequest) -> Result<(), ApiError>;
    fn user_achievements(&self, user_id: UserId) -> Result<Vec<AchievementRecord>, ApiError>;
}

// ==========================================
// HTTP implementation
// ==========================================

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
}

/// Check the envelope of a decoded body, then decode the payload
fn decode_body<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<T, ApiError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|source| ApiError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })?;

    let envelope = Envelope::deserialize(&value).map_err(|source| ApiError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })?;
    if envelope.success == Some(false) {
        return Err(ApiError::Rejected {
            endpoint: endpoint.to_string(),
            message: envelope
                .message
                .unwrap_or_else(|| "request was not successful".to_string()),
        });
    }

    serde_json::from_value(value).map_err(|source| ApiError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

/// Map a non-2xx status and its body to an error, keeping the server message
fn status_error(endpoint: &str, status: u16, body: &str) -> ApiError {
    if status == 404 {
        return ApiError::NotFound {
            endpoint: endpoint.to_string(),
        };
    }
    let message = serde_json::from_str::<Envelope>(body)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or_else(|| format!("HTTP {}", status));
    ApiError::Status {
        endpoint: endpoint.to_string(),
        status,
        message,
    }
}

/// `MissionApi` over HTTP with a bearer token once signed in
pub struct HttpMissionApi {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
}

impl HttpMissionApi {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.api_base_url, config.request_timeout())
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn authorize(&self, request: ureq::Request) -> ureq::Request {
        let request = request.set("Content-Type", "application/json");
        match &self.token {
            Some(token) => request.set("Authorization", &format!("Bearer {}", token)),
            None => request,
        }
    }

    fn finish<T: DeserializeOwned>(
        endpoint: &str,
        result: Result<ureq::Response, ureq::Error>,
    ) -> Result<T, ApiError> {
        match result {
            Ok(response) => {
                let body = response.into_string().map_err(|e| ApiError::Transport {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                })?;
                decode_body(endpoint, &body)
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                log::warn!("{} returned HTTP {}", endpoint, status);
                Err(status_error(endpoint, status, &body))
            }
            Err(ureq::Error::Transport(transport)) => {
                log::warn!("{} unreachable: {}", endpoint, transport);
                Err(ApiError::Transport {
                    endpoint: endpoint.to_string(),
                    reason: transport.to_string(),
                })
            }
        }
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, endpoint: &str, body: &B) -> Result<T, ApiError> {
        log::debug!("POST {}", endpoint);
        let request = self.authorize(self.agent.post(&self.url(endpoint)));
        Self::finish(endpoint, request.send_json(body))
    }

    fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        log::debug!("GET {}", endpoint);
        let mut request = self.authorize(self.agent.get(&self.url(endpoint)));
        for (key, value) in query {
            request = request.query(key, value);
        }
        Self::finish(endpoint, request.call())
    }
}

impl MissionApi for HttpMissionApi {
    fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.post("/api/auth/login.php", request)
    }

    fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ApiError> {
        self.post("/api/auth/signup.php", request)
    }

    fn verify(&self, token: &str) -> Result<User, ApiError> {
        let response: VerifyResponse = self.post("/api/auth/verify.php", &VerifyRequest { token })?;
        Ok(response.user)
    }

    fn create_mission(&self, request: &CreateMissionRequest) -> Result<MissionId, ApiError> {
        let response: CreateMissionResponse = self.post("/api/missions/create.php", request)?;
        Ok(response.mission_id)
    }

    fn add_mission_component(&self, request: &MissionComponentRequest) -> Result<(), ApiError> {
        self.post::<_, Ack>("/api/missions/add_component.php", request)
            .map(|_| ())
    }

    fn complete_mission(&self, request: &CompleteMissionRequest) -> Result<(), ApiError> {
        self.post::<_, Ack>("/api/missions/complete.php", request)
            .map(|_| ())
    }

    fn user_missions(&self, user_id: UserId) -> Result<Vec<MissionRecord>, ApiError> {
        let response: MissionListResponse = self.get(
            "/api/missions/get_user_missions.php",
            &[("user_id", user_id.to_string())],
        )?;
        Ok(response.missions)
    }

    fn mission_details(&self, mission_id: MissionId) -> Result<MissionDetails, ApiError> {
        self.get(
            "/api/missions/get_mission_details.php",
            &[("mission_id", mission_id.to_string())],
        )
    }

    fn leaderboard_add(&self, request: &LeaderboardAddRequest) -> Result<(), ApiError> {
        self.post::<_, Ack>("/api/leaderboard/add.php", request)
            .map(|_| ())
    }

    fn leaderboard_update(&self, request: &LeaderboardUpdateRequest) -> Result<(), ApiError> {
        self.post::<_, Ack>("/api/leaderboard/update.php", request)
            .map(|_| ())
    }

    fn leaderboard_crisis(&self, request: &LeaderboardCrisisRequest) -> Result<Option<u32>, ApiError> {
        let response: CrisisResponse = self.post("/api/leaderboard/crisis.php", request)?;
        Ok(response.data.and_then(|d| d.rank))
    }

    fn leaderboard(&self, query: &LeaderboardQuery) -> Result<Vec<LeaderboardEntry>, ApiError> {
        let response: LeaderboardResponse = self.get("/api/leaderboard/get.php", &query.pairs())?;
        Ok(response.leaderboard)
    }

    fn update_progress(&self, request: &ProgressUpdateRequest) -> Result<(), ApiError> {
        self.post::<_, Ack>("/api/progress/update.php", request)
            .map(|_| ())
    }

    fn progress(&self, user_id: UserId) -> Result<Progress, ApiError> {
        let response: ProgressResponse =
            self.get("/api/progress/get.php", &[("user_id", user_id.to_string())])?;
        Ok(response.progress)
    }

    fn award_achievement(&self, request: &AwardAchievementRequest) -> Result<(), ApiError> {
        self.post::<_, Ack>("/api/achievements/award.php", request)
            .map(|_| ())
    }

    fn user_achievements(&self, user_id: UserId) -> Result<Vec<AchievementRecord>, ApiError> {
        let response: AchievementListResponse = self.get(
            "/api/achievements/get_user_achievements.php",
            &[("user_id", user_id.to_string())],
        )?;
        Ok(response.achievements)
    }
}
