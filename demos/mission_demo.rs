use std::cell::Cell;

use leoverse::api::*;
use leoverse::catalog::families_for;
use leoverse::country::CountryCode;
use leoverse::crisis::CrisisChoice;
use leoverse::error::ApiError;
use leoverse::flow;
use leoverse::orbit::{collision_risk_at, MapPoint, OrbitKind};
use leoverse::payload::PayloadKind;
use leoverse::rating::format_usd;
use leoverse::session::Session;
use leoverse::store::{MemoryStore, Progress};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Stand-in for the leaderboard service so the demo runs without a server
struct OfflineApi {
    next_mission: Cell<MissionId>,
}

impl OfflineApi {
    fn demo_user() -> User {
        User {
            id: 1,
            username: "demo".to_string(),
            display_name: Some("Demo Pilot".to_string()),
            email: None,
            country_code: None,
        }
    }
}

impl MissionApi for OfflineApi {
    fn login(&self, _request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        Ok(AuthResponse {
            user: Self::demo_user(),
            token: "offline".to_string(),
        })
    }
    fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ApiError> {
        self.login(&LoginRequest {
            login: request.username.clone(),
            password: request.password.clone(),
        })
    }
    fn verify(&self, _token: &str) -> Result<User, ApiError> {
        Ok(Self::demo_user())
    }
    fn create_mission(&self, _request: &CreateMissionRequest) -> Result<MissionId, ApiError> {
        let id = self.next_mission.get();
        self.next_mission.set(id + 1);
        Ok(id)
    }
    fn add_mission_component(&self, _request: &MissionComponentRequest) -> Result<(), ApiError> {
        Ok(())
    }
    fn complete_mission(&self, _request: &CompleteMissionRequest) -> Result<(), ApiError> {
        Ok(())
    }
    fn user_missions(&self, _user_id: UserId) -> Result<Vec<MissionRecord>, ApiError> {
        Ok(Vec::new())
    }
    fn mission_details(&self, mission_id: MissionId) -> Result<MissionDetails, ApiError> {
        Err(ApiError::NotFound {
            endpoint: format!("mission {}", mission_id),
        })
    }
    fn leaderboard_add(&self, _request: &LeaderboardAddRequest) -> Result<(), ApiError> {
        Ok(())
    }
    fn leaderboard_update(&self, _request: &LeaderboardUpdateRequest) -> Result<(), ApiError> {
        Ok(())
    }
    fn leaderboard_crisis(&self, _request: &LeaderboardCrisisRequest) -> Result<Option<u32>, ApiError> {
        Ok(Some(1))
    }
    fn leaderboard(&self, _query: &LeaderboardQuery) -> Result<Vec<LeaderboardEntry>, ApiError> {
        Ok(Vec::new())
    }
    fn update_progress(&self, _request: &ProgressUpdateRequest) -> Result<(), ApiError> {
        Ok(())
    }
    fn progress(&self, _user_id: UserId) -> Result<Progress, ApiError> {
        Ok(Progress::default())
    }
    fn award_achievement(&self, _request: &AwardAchievementRequest) -> Result<(), ApiError> {
        Ok(())
    }
    fn user_achievements(&self, _user_id: UserId) -> Result<Vec<AchievementRecord>, ApiError> {
        Ok(Vec::new())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let api = OfflineApi {
        next_mission: Cell::new(100),
    };
    let mut session = Session::open(Box::new(MemoryStore::new()));
    let mut rng = ChaCha8Rng::seed_from_u64(2025);

    println!("=== LEOVERSE Mission Demo ===\n");
    flow::login(&mut session, &api, "demo", "offline")?;

    session.select_country(CountryCode::OM);
    session.select_payload(PayloadKind::Infrastructure);
    println!(
        "Country: {}  Budget: {}",
        CountryCode::OM.country().name,
        format_usd(session.mission().total_budget)
    );

    // Take the greenest option of every infrastructure family
    for family in families_for(PayloadKind::Infrastructure) {
        if let Some(best) = family.options.iter().max_by_key(|o| o.si_impact) {
            match flow::add_component_checked(&mut session, best.id) {
                Ok(_) => println!("  + {} / {} ({})", family.name, best.name, format_usd(best.cost)),
                Err(e) => println!("  ! {}: {}", best.name, e),
            }
        }
    }

    let payload = flow::complete_payload_mission(&mut session, &api, "Falaj Orbital")?;
    println!(
        "\nPayload saved as mission #{}: {} components, spent {}, score {}, SI {}",
        payload.mission_id,
        payload.components_count,
        format_usd(payload.budget_spent),
        payload.score,
        payload.si_score
    );

    let point = MapPoint { lat: 23.6, lng: 58.5 };
    let collision = collision_risk_at(point, &mut rng);
    let orbital = flow::commit_orbit(&mut session, &api, OrbitKind::Geo, Some(point), collision)?;
    println!(
        "Orbit {} at {}% collision risk: score {}, SI {} ({:+.2})",
        orbital.orbit, orbital.collision_percent, orbital.score, orbital.si_score, orbital.si_change
    );

    let crisis = flow::resolve_crisis(&mut session, &api, CrisisChoice::Cleanup, &mut rng)?;
    println!(
        "Crisis answered with {}: SI {} {:+} -> {} ({}), rank {:?}, {} left",
        crisis.outcome.choice,
        crisis.outcome.base_si,
        crisis.outcome.crisis_si,
        crisis.outcome.final_si,
        crisis.rating.label(),
        crisis.rank,
        format_usd(crisis.outcome.remaining_budget)
    );

    println!("\nAchievements:");
    for achievement in flow::award_achievements(&mut session, &api, crisis.rank)? {
        println!("  * {} - {}", achievement.title(), achievement.description());
    }

    flow::play_again(&mut session);
    println!(
        "\nAfter play again: score {}, SI {}",
        session.mission().score(),
        session.mission().calculate_si()
    );
    Ok(())
}
