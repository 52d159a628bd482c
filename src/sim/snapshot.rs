//! Per-tick wire snapshot of the race
//!
//! A snapshot is an immutable copy of everything a renderer or remote
//! client needs; it never borrows from `GameState`.

use serde::{Deserialize, Serialize};

use super::physics::CarState;
use super::race::{RaceInfo, RaceStatus};
use super::state::{GameState, Player};

/// One car as seen by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub player_id: String,
    pub car: CarState,
    pub current_checkpoint: usize,
    #[serde(default)]
    pub split_times: Vec<f64>,
    pub is_finished: bool,
    pub finish_time: Option<f64>,
    /// Race rank (None for DNF or before ranking)
    pub position: Option<usize>,
    pub points: u32,
    pub dnf: bool,
}

impl From<&Player> for PlayerSnapshot {
    fn from(p: &Player) -> Self {
        Self {
            player_id: p.id.clone(),
            car: p.car,
            current_checkpoint: p.progress.current_checkpoint,
            split_times: p.progress.split_times.clone(),
            is_finished: p.progress.is_finished,
            finish_time: p.progress.finish_time,
            position: p.progress.position,
            points: p.progress.points,
            dnf: p.progress.dnf,
        }
    }
}

/// Complete race state at one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub tick: u64,
    pub race_info: RaceInfo,
    pub players: Vec<PlayerSnapshot>,
}

impl StateSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn status(&self) -> RaceStatus {
        self.race_info.status
    }

    pub fn player(&self, id: &str) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.player_id == id)
    }
}

impl GameState {
    /// Copy the current tick out for rendering or broadcast
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            tick: self.tick,
            race_info: self.race_info.clone(),
            players: self.players.iter().map(PlayerSnapshot::from).collect(),
        }
    }
}
