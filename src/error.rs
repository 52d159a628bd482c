//! Error types for configuration and track loading
//!
//! Simulation anomalies are never errors (they clamp or return sentinels);
//! these cover bad input data only.

use std::fmt;

/// Failure to load or parse settings
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read settings: {e}"),
            ConfigError::Parse(e) => write!(f, "invalid settings JSON: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Malformed track description
#[derive(Debug)]
pub enum TrackError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    NoSegments,
    NoCheckpoints,
    NonFiniteGeometry,
    InvalidWidth { segment: usize },
    CheckpointOrder { expected: usize, found: usize },
}

impl fmt::Display for TrackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackError::Io(e) => write!(f, "failed to read track: {e}"),
            TrackError::Parse(e) => write!(f, "invalid track JSON: {e}"),
            TrackError::NoSegments => write!(f, "track has no segments"),
            TrackError::NoCheckpoints => write!(f, "track has no checkpoints"),
            TrackError::NonFiniteGeometry => write!(f, "track contains non-finite coordinates"),
            TrackError::InvalidWidth { segment } => {
                write!(f, "segment {segment} has a non-positive width")
            }
            TrackError::CheckpointOrder { expected, found } => {
                write!(f, "checkpoint index {found} found where {expected} was expected")
            }
        }
    }
}

impl std::error::Error for TrackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrackError::Io(e) => Some(e),
            TrackError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TrackError {
    fn from(e: std::io::Error) -> Self {
        TrackError::Io(e)
    }
}

impl From<serde_json::Error> for TrackError {
    fn from(e: serde_json::Error) -> Self {
        TrackError::Parse(e)
    }
}

/// Race cannot leave the waiting state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceError {
    /// Track has no checkpoints, so there is nothing to race to
    NoCheckpoints,
    /// No cars on the grid
    NoPlayers,
    /// Grid is full
    TooManyPlayers { max: usize },
    /// Player id already on the grid
    DuplicatePlayer,
    /// Countdown or race already underway
    AlreadyStarted,
}

impl fmt::Display for RaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaceError::NoCheckpoints => write!(f, "track has no checkpoints; race cannot start"),
            RaceError::NoPlayers => write!(f, "no players on the grid"),
            RaceError::TooManyPlayers { max } => write!(f, "grid is full ({max} cars)"),
            RaceError::DuplicatePlayer => write!(f, "player already on the grid"),
            RaceError::AlreadyStarted => write!(f, "race already started"),
        }
    }
}

impl std::error::Error for RaceError {}
