//! Fixed-timestep driver and client frame loop
//!
//! The host calls [`ClientSession::frame`] from its render callback with a
//! millisecond timestamp. Elapsed wall time is accumulated and spent in
//! whole simulation ticks; rendering always shows the buffered state.

use crate::settings::{GameConfig, Settings};
use crate::sim::{ControlInput, GameEvent, GameState, StateSnapshot, Track, tick};
use crate::sync::{SnapshotBuffer, SnapshotFeed};

/// Time accumulator that converts frame time into fixed ticks
#[derive(Debug, Clone)]
pub struct GameLoop {
    accumulator: f64,
    last_time: Option<f64>,
    tick_dt: f64,
    max_frame_time: f64,
}

impl GameLoop {
    pub fn new(tick_rate: u32, max_frame_time: f32) -> Self {
        Self {
            accumulator: 0.0,
            last_time: None,
            tick_dt: 1.0 / tick_rate.max(1) as f64,
            max_frame_time: (max_frame_time as f64).max(0.0),
        }
    }

    pub fn from_config(game: &GameConfig) -> Self {
        Self::new(game.tick_rate, game.max_frame_time)
    }

    /// Record a frame at `now` (ms) and return how many ticks are due
    ///
    /// The first call only sets the reference time. The accumulator is
    /// capped at `max_frame_time`, so a long stall costs at most that much
    /// catch-up work.
    pub fn advance(&mut self, now: f64) -> u32 {
        let Some(last) = self.last_time.replace(now) else {
            return 0;
        };
        let frame = (now - last) / 1000.0;
        if !frame.is_finite() || frame <= 0.0 {
            return 0;
        }
        self.accumulator = (self.accumulator + frame).min(self.max_frame_time);

        let mut due = 0;
        while self.accumulator >= self.tick_dt {
            self.accumulator -= self.tick_dt;
            due += 1;
        }
        due
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.last_time = None;
    }
}

/// One client: local simulation, frame loop and presentation buffer
///
/// Without a feed the session renders its own ticks. With a feed attached
/// the buffer is filled from the feed instead and local ticks only drive
/// prediction.
#[derive(Debug)]
pub struct ClientSession {
    pub state: GameState,
    pub game_loop: GameLoop,
    pub buffer: SnapshotBuffer,
    feed: Option<SnapshotFeed>,
    events: Vec<GameEvent>,
}

impl ClientSession {
    pub fn new(track: Track, settings: Settings) -> Self {
        Self::from_state(GameState::new(track, settings))
    }

    pub fn from_state(state: GameState) -> Self {
        let game = &state.settings.game;
        Self {
            game_loop: GameLoop::from_config(game),
            buffer: SnapshotBuffer::from_config(game),
            state,
            feed: None,
            events: Vec::new(),
        }
    }

    /// Take presentation snapshots from a remote producer
    pub fn attach_feed(&mut self, feed: SnapshotFeed) {
        self.buffer.clear();
        self.feed = Some(feed);
    }

    pub fn set_input(&mut self, player_id: &str, input: ControlInput) -> bool {
        self.state.set_input(player_id, input)
    }

    /// Render callback: run due ticks, buffer state, return what to draw at `now`
    pub fn frame(&mut self, now: f64) -> Option<StateSnapshot> {
        let due = self.game_loop.advance(now);
        for _ in 0..due {
            self.events.extend(tick(&mut self.state));
        }

        match &self.feed {
            Some(feed) => {
                feed.drain_into(&mut self.buffer);
            }
            None if due > 0 || self.buffer.is_empty() => {
                self.buffer.push(now, self.state.snapshot());
            }
            None => {}
        }

        self.buffer.sample(now)
    }

    /// Events produced since the last call
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Stop rendering: drop buffered state and the feed
    pub fn teardown(&mut self) {
        self.buffer.clear();
        self.game_loop.reset();
        self.feed = None;
        self.events.clear();
        log::debug!("Client session torn down at tick {}", self.state.tick);
    }
}
