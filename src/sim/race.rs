//! Race progression: countdown, checkpoint gates, finishing, grace period and ranking
//!
//! All times are simulation-clock seconds (`GameState::clock`), so a replay
//! of the same inputs reproduces the same splits and results.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::segment_intersection;
use super::state::Player;
use super::track::{Checkpoint, Track};
use crate::settings::RaceConfig;

/// Progress weight per checkpoint when ranking cars still racing
const CHECKPOINT_PROGRESS_WEIGHT: f32 = 1000.0;

/// Race-wide phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaceStatus {
    /// Grid is forming; nothing moves
    #[default]
    Waiting,
    /// Lights are counting down; inputs ignored
    Countdown,
    /// Cars are live
    Racing,
    /// Results are final
    Finished,
}

impl RaceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RaceStatus::Waiting => "waiting",
            RaceStatus::Countdown => "countdown",
            RaceStatus::Racing => "racing",
            RaceStatus::Finished => "finished",
        }
    }
}

/// Race-wide timing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RaceInfo {
    pub status: RaceStatus,
    /// Clock time the lights went out
    pub start_time: Option<f64>,
    pub countdown_remaining: f32,
    /// Clock time the race was closed
    pub finish_time: Option<f64>,
    /// Clock time of the first finish
    pub first_finisher_time: Option<f64>,
    pub grace_period_remaining: f32,
}

impl RaceInfo {
    /// Reset timing and enter the countdown
    pub fn begin_countdown(&mut self, seconds: f32) {
        *self = RaceInfo {
            status: RaceStatus::Countdown,
            countdown_remaining: seconds.max(0.0),
            ..Default::default()
        };
    }

    /// Tick the countdown; returns true on the tick the race goes live
    pub fn advance_countdown(&mut self, dt: f32, clock: f64) -> bool {
        if self.status != RaceStatus::Countdown {
            return false;
        }
        self.countdown_remaining -= dt;
        if self.countdown_remaining <= 0.0 {
            self.countdown_remaining = 0.0;
            self.status = RaceStatus::Racing;
            self.start_time = Some(clock);
            return true;
        }
        false
    }

    /// Start the grace timer on the first finish
    pub fn record_finish(&mut self, clock: f64, grace_period: f32) {
        if self.first_finisher_time.is_none() {
            self.first_finisher_time = Some(clock);
            self.grace_period_remaining = grace_period.max(0.0);
        }
    }

    /// Tick the grace timer; returns true once it has elapsed
    ///
    /// The countdown begins on the tick after the first finish.
    pub fn advance_grace(&mut self, dt: f32, clock: f64) -> bool {
        if self.status != RaceStatus::Racing {
            return false;
        }
        if self.first_finisher_time.is_none_or(|first| clock <= first) {
            return false;
        }
        self.grace_period_remaining = (self.grace_period_remaining - dt).max(0.0);
        self.grace_period_remaining <= 0.0
    }

    /// Close the race
    pub fn finish(&mut self, clock: f64) {
        self.status = RaceStatus::Finished;
        self.finish_time = Some(clock);
        self.grace_period_remaining = 0.0;
    }

    /// Seconds since the start (zero before it)
    pub fn elapsed(&self, clock: f64) -> f64 {
        self.start_time.map_or(0.0, |start| (clock - start).max(0.0))
    }

    /// Controls are honored only while racing
    pub fn accepts_input(&self) -> bool {
        self.status == RaceStatus::Racing
    }
}

/// One car's progress through the stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerProgress {
    /// Index of the next checkpoint to cross
    pub current_checkpoint: usize,
    /// Seconds since start at each crossing
    pub split_times: Vec<f64>,
    pub is_finished: bool,
    /// Clock time of the finish
    pub finish_time: Option<f64>,
    /// Live or final rank (None for DNF)
    pub position: Option<usize>,
    pub points: u32,
    pub dnf: bool,
}

impl PlayerProgress {
    /// Finished and DNF cars are frozen out of checkpoint processing
    pub fn can_progress(&self) -> bool {
        !self.is_finished && !self.dnf
    }

    pub fn is_done(&self) -> bool {
        self.is_finished || self.dnf
    }
}

/// Produced each time a car crosses its next gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointEvent {
    pub player_id: String,
    pub checkpoint_index: usize,
    pub split_time: f64,
}

/// One line of the final classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub player_id: String,
    pub position: Option<usize>,
    pub finish_time: Option<f64>,
    pub dnf: bool,
    pub points: u32,
}

/// Per-car view of the race, as shown to a driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRaceView {
    pub current_checkpoint: usize,
    pub total_checkpoints: usize,
    pub is_finished: bool,
    pub finish_time: Option<f64>,
    pub start_time: Option<f64>,
    pub countdown_remaining: f32,
    pub race_status: RaceStatus,
    pub first_finisher_time: Option<f64>,
    pub grace_period_remaining: f32,
    pub current_position: Option<usize>,
    pub total_players: usize,
}

impl PlayerRaceView {
    pub fn new(info: &RaceInfo, progress: &PlayerProgress, total_checkpoints: usize, total_players: usize) -> Self {
        Self {
            current_checkpoint: progress.current_checkpoint.min(total_checkpoints),
            total_checkpoints,
            is_finished: progress.is_finished,
            finish_time: progress.finish_time,
            start_time: info.start_time,
            countdown_remaining: info.countdown_remaining,
            race_status: info.status,
            first_finisher_time: info.first_finisher_time,
            grace_period_remaining: info.grace_period_remaining,
            current_position: progress.position,
            total_players,
        }
    }
}

/// Did the path `prev`→`curr` cross the gate in the direction of travel?
pub fn gate_crossed(checkpoint: &Checkpoint, prev: Vec2, curr: Vec2) -> bool {
    let (g1, g2) = checkpoint.gate();
    if segment_intersection(prev, curr, g1, g2).is_none() {
        return false;
    }
    (curr - prev).dot(checkpoint.direction()) > 0.0
}

/// Test the car's next gate and advance progress on a crossing
///
/// Returns the index of the crossed checkpoint and its split time.
pub fn advance_checkpoint(
    progress: &mut PlayerProgress,
    track: &Track,
    prev: Vec2,
    curr: Vec2,
    elapsed: f64,
) -> Option<(usize, f64)> {
    if !progress.can_progress() {
        return None;
    }
    let index = progress.current_checkpoint;
    let checkpoint = track.checkpoints.get(index)?;
    if !gate_crossed(checkpoint, prev, curr) {
        return None;
    }
    progress.current_checkpoint = (index + 1).min(track.total_checkpoints());
    progress.split_times.push(elapsed);
    Some((index, elapsed))
}

/// Mark the car finished if it has cleared every checkpoint
///
/// Returns the finishing position on the tick the car finishes.
pub fn check_finish(players: &mut [Player], idx: usize, total_checkpoints: usize, clock: f64) -> Option<usize> {
    let progress = &players[idx].progress;
    if progress.is_finished || progress.dnf || total_checkpoints == 0 {
        return None;
    }
    if progress.current_checkpoint < total_checkpoints {
        return None;
    }
    let position = players.iter().filter(|p| p.progress.is_finished).count() + 1;
    let progress = &mut players[idx].progress;
    progress.is_finished = true;
    progress.finish_time = Some(clock);
    progress.position = Some(position);
    Some(position)
}

/// Continuous progress for live ranking (higher is further along)
pub fn progress_score(player: &Player, track: &Track) -> f32 {
    let cp = player.progress.current_checkpoint;
    let mut score = cp as f32 * CHECKPOINT_PROGRESS_WEIGHT;
    if let Some(next) = track.checkpoints.get(cp) {
        score -= player.car.position.distance(next.position);
    }
    score
}

/// Rank finishers by finish time, then racing cars by progress; DNF cars are unranked
pub fn update_live_positions(players: &mut [Player], track: &Track) {
    let mut finished: Vec<(usize, f64)> = Vec::new();
    let mut racing: Vec<(usize, f32)> = Vec::new();
    for (i, p) in players.iter().enumerate() {
        if p.progress.dnf {
            continue;
        }
        match (p.progress.is_finished, p.progress.finish_time) {
            (true, Some(t)) => finished.push((i, t)),
            _ => racing.push((i, progress_score(p, track))),
        }
    }
    finished.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    racing.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let order = finished.iter().map(|f| f.0).chain(racing.iter().map(|r| r.0));
    for (rank, i) in order.enumerate() {
        players[i].progress.position = Some(rank + 1);
    }
    for p in players.iter_mut().filter(|p| p.progress.dnf) {
        p.progress.position = None;
    }
}

/// Mark every car still on course as DNF; returns their ids
pub fn mark_unfinished_dnf(players: &mut [Player]) -> Vec<String> {
    let mut dnfs = Vec::new();
    for p in players.iter_mut().filter(|p| !p.progress.is_done()) {
        p.progress.dnf = true;
        p.progress.position = None;
        dnfs.push(p.id.clone());
    }
    dnfs
}

/// Final positions and points: finishers by time, then DNFs
pub fn finalize_results(players: &mut [Player], race: &RaceConfig) -> Vec<RaceResult> {
    let mut finishers: Vec<usize> = (0..players.len())
        .filter(|&i| players[i].progress.is_finished && players[i].progress.finish_time.is_some())
        .collect();
    finishers.sort_by(|&a, &b| {
        let ta = players[a].progress.finish_time.unwrap_or(f64::INFINITY);
        let tb = players[b].progress.finish_time.unwrap_or(f64::INFINITY);
        ta.total_cmp(&tb).then(a.cmp(&b))
    });

    let mut results = Vec::with_capacity(players.len());
    for (rank, &i) in finishers.iter().enumerate() {
        let progress = &mut players[i].progress;
        progress.position = Some(rank + 1);
        progress.points = race.points_for(rank + 1);
        results.push(RaceResult {
            player_id: players[i].id.clone(),
            position: Some(rank + 1),
            finish_time: players[i].progress.finish_time,
            dnf: false,
            points: players[i].progress.points,
        });
    }

    for p in players.iter_mut().filter(|p| !p.progress.is_finished) {
        p.progress.dnf = true;
        p.progress.position = None;
        p.progress.points = 0;
        results.push(RaceResult {
            player_id: p.id.clone(),
            position: None,
            finish_time: None,
            dnf: true,
            points: 0,
        });
    }
    results
}
