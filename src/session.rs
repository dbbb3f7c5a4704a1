/// The client session: mission state plus everything around it (identity,
/// current mission, progress, achievements, chat history). Every mutation
/// is written through to the snapshot store before returning.

use rand::Rng;

use crate::api::{AuthResponse, User};
use crate::catalog::Component;
use crate::country::CountryCode;
use crate::crisis::CrisisChoice;
use crate::mission_state::{CrisisOutcome, MissionStage, MissionState};
use crate::orbit::{MapPoint, OrbitKind};
use crate::payload::PayloadKind;
use crate::rating::Achievement;
use crate::store::{
    ChatMessage, CurrentMission, Identity, Progress, ProgressUpdate, SessionSnapshot,
    SnapshotStore,
};

pub struct Session {
    snapshot: SessionSnapshot,
    store: Box<dyn SnapshotStore>,
}

impl Session {
    /// Rehydrate from the store. A missing or unreadable snapshot starts a
    /// fresh session.
    pub fn open(store: Box<dyn SnapshotStore>) -> Self {
        let snapshot = match store.load() {
            Ok(Some(snapshot)) => {
                log::info!("restored session snapshot");
                snapshot
            }
            Ok(None) => SessionSnapshot::default(),
            Err(e) => {
                log::warn!("could not restore session ({}), starting fresh", e);
                SessionSnapshot::default()
            }
        };
        Self { snapshot, store }
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.snapshot) {
            log::warn!("failed to save session: {}", e);
        }
    }

    /// Apply a change to the mission state and save
    pub fn update_mission<R>(&mut self, f: impl FnOnce(&mut MissionState) -> R) -> R {
        let result = f(&mut self.snapshot.mission);
        self.persist();
        result
    }

    // ==========================================
    // Read access
    // ==========================================

    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.snapshot
    }

    pub fn mission(&self) -> &MissionState {
        &self.snapshot.mission
    }

    pub fn identity(&self) -> &Identity {
        &self.snapshot.identity
    }

    pub fn user(&self) -> Option<&User> {
        self.snapshot.identity.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot.identity.is_authenticated()
    }

    pub fn current_mission(&self) -> Option<&CurrentMission> {
        self.snapshot.current_mission.as_ref()
    }

    pub fn progress(&self) -> &Progress {
        &self.snapshot.progress
    }

    pub fn achievements(&self) -> &[Achievement] {
        &self.snapshot.achievements
    }

    pub fn chat_messages(&self) -> &[ChatMessage] {
        &self.snapshot.chat_messages
    }

    pub fn chat_session(&self) -> Option<&str> {
        self.snapshot.chat_session.as_deref()
    }

    // ==========================================
    // Mission state
    // ==========================================

    pub fn select_country(&mut self, code: CountryCode) {
        self.update_mission(|m| m.set_selected_country(code.country()));
    }

    pub fn select_payload(&mut self, kind: PayloadKind) {
        self.update_mission(|m| m.set_selected_payload(kind));
    }

    pub fn add_component(&mut self, component: Component) -> u64 {
        self.update_mission(|m| m.add_component(component))
    }

    pub fn remove_component(&mut self, selected_id: u64) -> bool {
        self.update_mission(|m| m.remove_component(selected_id))
    }

    pub fn clear_components(&mut self) {
        self.update_mission(|m| m.clear_components());
    }

    pub fn commit_orbital_path(
        &mut self,
        orbit: OrbitKind,
        point: Option<MapPoint>,
        collision_percent: u32,
    ) -> i32 {
        self.update_mission(|m| m.commit_orbital_path(orbit, point, collision_percent))
    }

    pub fn resolve_crisis(&mut self, choice: CrisisChoice, rng: &mut impl Rng) -> CrisisOutcome {
        self.update_mission(|m| m.resolve_crisis(choice, rng))
    }

    pub fn set_mission_completed(&mut self, stage: MissionStage, score: f64) {
        self.update_mission(|m| m.set_mission_completed(stage, score));
    }

    // ==========================================
    // Identity and current mission
    // ==========================================

    pub fn sign_in(&mut self, auth: AuthResponse) {
        log::info!("signed in as {}", auth.user.username);
        self.snapshot.identity = Identity {
            user: Some(auth.user),
            token: Some(auth.token),
        };
        self.persist();
    }

    pub fn set_current_mission(&mut self, mission: CurrentMission) {
        self.snapshot.current_mission = Some(mission);
        self.persist();
    }

    /// "Play again": clear all mission data, keep the signed-in player
    pub fn reset_missions(&mut self) {
        self.snapshot.mission.reset();
        self.snapshot.current_mission = None;
        self.snapshot.chat_messages.clear();
        self.snapshot.chat_session = None;
        self.persist();
    }

    /// Full reset including identity. The stored snapshot is removed.
    pub fn logout(&mut self) {
        self.snapshot = SessionSnapshot::default();
        if let Err(e) = self.store.clear() {
            log::warn!("failed to clear stored session: {}", e);
        }
        log::info!("signed out");
    }

    // ==========================================
    // Progress, achievements and chat
    // ==========================================

    pub fn update_progress(&mut self, update: ProgressUpdate) {
        self.snapshot.progress.apply(update);
        self.persist();
    }

    pub fn set_progress(&mut self, progress: Progress) {
        self.snapshot.progress = progress;
        self.persist();
    }

    /// Record an achievement once; returns false if it was already held
    pub fn add_achievement(&mut self, achievement: Achievement) -> bool {
        if self.snapshot.achievements.contains(&achievement) {
            return false;
        }
        self.snapshot.achievements.push(achievement);
        self.persist();
        true
    }

    pub fn set_achievements(&mut self, achievements: Vec<Achievement>) {
        self.snapshot.achievements = achievements;
        self.persist();
    }

    pub fn add_chat_message(&mut self, message: ChatMessage) {
        self.snapshot.chat_messages.push(message);
        self.persist();
    }

    pub fn clear_chat_messages(&mut self) {
        self.snapshot.chat_messages.clear();
        self.persist();
    }

    pub fn set_chat_session(&mut self, session: Option<String>) {
        self.snapshot.chat_session = session;
        self.persist();
    }
}
