use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::mission_state::MissionStage;

/// User-facing rejections raised before any state is touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("insufficient budget: {cost} needed, {remaining} remaining")]
    InsufficientBudget { cost: i64, remaining: i64 },
    #[error("add at least one component to the mission")]
    NoComponents,
    #[error("enter a mission name")]
    EmptyMissionName,
    #[error("no {0} selected")]
    MissingSelection(&'static str),
    #[error("complete the {required} mission before the {requested} mission")]
    StageLocked {
        requested: MissionStage,
        required: MissionStage,
    },
    #[error("not signed in")]
    NotAuthenticated,
    #[error("no completed mission to update")]
    NoCurrentMission,
    #[error("unknown {kind} '{key}'")]
    UnknownKey { kind: &'static str, key: String },
    #[error("component selection {0} appears twice")]
    DuplicateSelection(u64),
    #[error("please fill in the {0}")]
    MissingField(&'static str),
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
}

/// Failures talking to the leaderboard/mission service.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{endpoint} returned HTTP {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },
    #[error("{endpoint} not found")]
    NotFound { endpoint: String },
    #[error("request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },
    #[error("could not decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{endpoint} rejected the request: {message}")]
    Rejected { endpoint: String, message: String },
}

/// Failures reading or writing the persisted session snapshot.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access session snapshot at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode session snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("invalid session snapshot: {0}")]
    Invalid(#[from] ValidationError),
}

/// Anything a mission phase action can fail with.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

pub type FlowResult<T> = Result<T, FlowError>;
