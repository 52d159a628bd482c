//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Simulation clock, never wall time
//! - Stable iteration order (by player ID)
//! - No rendering, network or platform dependencies

pub mod collision;
pub mod geometry;
pub mod physics;
pub mod race;
pub mod snapshot;
pub mod state;
pub mod tick;
pub mod track;

pub use collision::{CarBody, CollisionResult, collide_with_track, detect_track_collision, resolve_collision};
pub use physics::{CarState, ControlInput, SurfaceContact, step};
pub use race::{CheckpointEvent, PlayerProgress, PlayerRaceView, RaceInfo, RaceResult, RaceStatus};
pub use snapshot::{PlayerSnapshot, StateSnapshot};
pub use state::{GameEvent, GameState, Player};
pub use tick::tick;
pub use track::{Checkpoint, Containment, Obstacle, ObstacleKind, SurfaceType, Track, TrackPoint, TrackSegment};
