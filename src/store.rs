/// Persisted session snapshot and the stores that hold it.
///
/// The whole client session is one versioned JSON document, written after
/// every mutation and read once at startup.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::api::{MissionId, User};
use crate::error::StoreError;
use crate::mission_state::MissionState;
use crate::rating::Achievement;

/// Version of the snapshot format (increment when the layout changes)
pub const SNAPSHOT_VERSION: u32 = 1;

/// Signed-in player and their bearer token
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Identity {
    pub user: Option<User>,
    pub token: Option<String>,
}

impl Identity {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Mission saved by the payload phase; later phases update it by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentMission {
    pub id: MissionId,
    pub name: String,
    pub si_score: f64,
}

/// Where the player is in the story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Progress {
    pub current_screen: String,
    pub current_branch: String,
    pub completed_screens: Vec<String>,
    pub decisions_made: BTreeMap<String, serde_json::Value>,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            current_screen: "landing".to_string(),
            current_branch: "main".to_string(),
            completed_screens: Vec::new(),
            decisions_made: BTreeMap::new(),
        }
    }
}

/// Partial progress update; unset fields keep their value
#[derive(Debug, Clone, Default)]
pub struct ProgressUpdate {
    pub current_screen: Option<String>,
    pub current_branch: Option<String>,
    pub completed_screens: Option<Vec<String>>,
    pub decisions_made: Option<BTreeMap<String, serde_json::Value>>,
}

impl Progress {
    pub fn apply(&mut self, update: ProgressUpdate) {
        if let Some(screen) = update.current_screen {
            self.current_screen = screen;
        }
        if let Some(branch) = update.current_branch {
            self.current_branch = branch;
        }
        if let Some(screens) = update.completed_screens {
            self.completed_screens = screens;
        }
        if let Some(decisions) = update.decisions_made {
            self.decisions_made = decisions;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Everything the client persists between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSnapshot {
    pub version: u32,
    pub identity: Identity,
    pub current_mission: Option<CurrentMission>,
    pub progress: Progress,
    pub mission: MissionState,
    pub achievements: Vec<Achievement>,
    pub chat_messages: Vec<ChatMessage>,
    pub chat_session: Option<String>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            identity: Identity::default(),
            current_mission: None,
            progress: Progress::default(),
            mission: MissionState::default(),
            achievements: Vec::new(),
            chat_messages: Vec::new(),
            chat_session: None,
        }
    }
}

impl SessionSnapshot {
    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode and check a stored snapshot. Cached mission totals are
    /// recomputed rather than trusted.
    pub fn from_json(data: &str) -> Result<Self, StoreError> {
        let mut snapshot: SessionSnapshot = serde_json::from_str(data)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StoreError::VersionMismatch {
                expected: SNAPSHOT_VERSION,
                found: snapshot.version,
            });
        }
        snapshot.mission.rehydrate()?;
        Ok(snapshot)
    }
}

/// Durable home of the session snapshot
pub trait SnapshotStore {
    /// `Ok(None)` when nothing has been saved yet
    fn load(&self) -> Result<Option<SessionSnapshot>, StoreError>;
    fn save(&mut self, snapshot: &SessionSnapshot) -> Result<(), StoreError>;
    fn clear(&mut self) -> Result<(), StoreError>;
}

// ==========================================
// File store
// ==========================================

/// Snapshot kept in a single JSON file
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<SessionSnapshot>, StoreError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        SessionSnapshot::from_json(&data).map(Some)
    }

    fn save(&mut self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        let data = snapshot.to_json()?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        std::fs::write(&self.path, data).map_err(|e| self.io_error(e))
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

// ==========================================
// Memory store
// ==========================================

/// In-process store. Clones share the same slot, so a test can keep a
/// handle while a session owns another.
#[derive(Clone, Default)]
pub struct MemoryStore {
    slot: Rc<RefCell<Option<String>>>,
    writes: Rc<Cell<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with raw snapshot text
    pub fn with_contents(data: &str) -> Self {
        let store = Self::default();
        *store.slot.borrow_mut() = Some(data.to_string());
        store
    }

    /// Number of successful saves
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    pub fn contents(&self) -> Option<String> {
        self.slot.borrow().clone()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<SessionSnapshot>, StoreError> {
        match self.slot.borrow().as_deref() {
            Some(data) => SessionSnapshot::from_json(data).map(Some),
            None => Ok(None),
        }
    }

    fn save(&mut self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        let data = snapshot.to_json()?;
        *self.slot.borrow_mut() = Some(data);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        *self.slot.borrow_mut() = None;
        Ok(())
    }
}
