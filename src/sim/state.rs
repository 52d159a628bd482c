//! Game state and core simulation types
//!
//! Everything needed to reproduce a race tick-for-tick lives here.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::physics::{CarState, ControlInput};
use super::race::{CheckpointEvent, PlayerProgress, PlayerRaceView, RaceInfo, RaceResult, RaceStatus};
use super::track::Track;
use crate::error::RaceError;
use crate::settings::Settings;

/// Something that happened during a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// Countdown reached zero
    RaceStarted { start_time: f64 },
    Checkpoint(CheckpointEvent),
    PlayerFinished {
        player_id: String,
        position: usize,
        finish_time: f64,
    },
    PlayerDnf { player_id: String },
    /// Final classification, finishers first
    RaceEnded { results: Vec<RaceResult> },
}

/// A car on the grid and its race progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub car: CarState,
    /// Latest controls; held until replaced
    pub input: ControlInput,
    pub progress: PlayerProgress,
    /// Mass for car-to-car impulses
    pub weight: f32,
}

impl Player {
    pub fn new(id: impl Into<String>, car: CarState, weight: f32) -> Self {
        Self {
            id: id.into(),
            car,
            input: ControlInput::default(),
            progress: PlayerProgress::default(),
            weight,
        }
    }
}

/// Complete race state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub track: Track,
    pub settings: Settings,
    /// Cars, sorted by id for deterministic iteration
    pub players: Vec<Player>,
    pub race_info: RaceInfo,
    /// Simulation tick counter
    pub tick: u64,
    /// Simulation clock in seconds
    pub clock: f64,
}

impl GameState {
    pub fn new(track: Track, settings: Settings) -> Self {
        Self {
            track,
            settings,
            players: Vec::new(),
            race_info: RaceInfo::default(),
            tick: 0,
            clock: 0.0,
        }
    }

    /// Fixed tick length
    #[inline]
    pub fn dt(&self) -> f32 {
        self.settings.game.tick_dt()
    }

    pub fn status(&self) -> RaceStatus {
        self.race_info.status
    }

    fn grid_car(&self) -> CarState {
        CarState::new(
            self.track.start_position,
            self.track.start_heading,
            self.settings.car.default_nitro_charges,
        )
    }

    /// Put a new car on the grid at the start line
    pub fn add_player(&mut self, id: impl Into<String>) -> Result<&Player, RaceError> {
        let weight = self.settings.car.default_weight;
        self.add_player_with_weight(id, weight)
    }

    pub fn add_player_with_weight(&mut self, id: impl Into<String>, weight: f32) -> Result<&Player, RaceError> {
        let id = id.into();
        if matches!(self.race_info.status, RaceStatus::Countdown | RaceStatus::Racing) {
            return Err(RaceError::AlreadyStarted);
        }
        if self.players.len() >= self.settings.game.max_cars {
            return Err(RaceError::TooManyPlayers {
                max: self.settings.game.max_cars,
            });
        }
        let slot = match self.players.binary_search_by(|p| p.id.as_str().cmp(&id)) {
            Ok(_) => return Err(RaceError::DuplicatePlayer),
            Err(slot) => slot,
        };
        log::info!("Player {} joined the grid", id);
        let player = Player::new(id, self.grid_car(), weight.max(f32::EPSILON));
        self.players.insert(slot, player);
        Ok(&self.players[slot])
    }

    /// Remove a car; returns whether it was present
    pub fn remove_player(&mut self, id: &str) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p.id != id);
        before != self.players.len()
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players
            .binary_search_by(|p| p.id.as_str().cmp(id))
            .ok()
            .map(|i| &self.players[i])
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players
            .binary_search_by(|p| p.id.as_str().cmp(id))
            .ok()
            .map(|i| &mut self.players[i])
    }

    /// Replace a car's held controls; returns false for unknown ids
    pub fn set_input(&mut self, id: &str, input: ControlInput) -> bool {
        match self.player_mut(id) {
            Some(player) => {
                player.input = input;
                true
            }
            None => false,
        }
    }

    /// Reset every car to the grid and begin the countdown
    pub fn start_race(&mut self) -> Result<(), RaceError> {
        if matches!(self.race_info.status, RaceStatus::Countdown | RaceStatus::Racing) {
            return Err(RaceError::AlreadyStarted);
        }
        if self.track.checkpoints.is_empty() {
            log::warn!("Track has no checkpoints; race stays in waiting");
            return Err(RaceError::NoCheckpoints);
        }
        if self.players.is_empty() {
            return Err(RaceError::NoPlayers);
        }

        let grid = self.grid_car();
        for player in &mut self.players {
            player.car = grid;
            player.input = ControlInput::default();
            player.progress = PlayerProgress::default();
        }
        self.race_info.begin_countdown(self.settings.game.countdown_seconds);
        log::info!(
            "Countdown started: {} cars, {} checkpoints",
            self.players.len(),
            self.track.total_checkpoints()
        );
        Ok(())
    }

    /// Race view for one car
    pub fn race_view(&self, id: &str) -> Option<PlayerRaceView> {
        self.player(id).map(|p| {
            PlayerRaceView::new(
                &self.race_info,
                &p.progress,
                self.track.total_checkpoints(),
                self.players.len(),
            )
        })
    }

    /// Final or provisional classification
    pub fn results(&self) -> Vec<RaceResult> {
        let mut results: Vec<RaceResult> = self
            .players
            .iter()
            .map(|p| RaceResult {
                player_id: p.id.clone(),
                position: p.progress.position,
                finish_time: p.progress.finish_time,
                dnf: p.progress.dnf,
                points: p.progress.points,
            })
            .collect();
        results.sort_by_key(|r| (r.dnf, r.position.unwrap_or(usize::MAX)));
        results
    }
}
