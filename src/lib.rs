//! Stage Rally - top-down point-to-point rally simulation
//!
//! Core modules:
//! - `sim`: Deterministic simulation (track, physics, collisions, race progression)
//! - `game_loop`: Fixed-timestep accumulator decoupling ticks from frame rate
//! - `sync`: Snapshot buffering and interpolation for presentation
//! - `settings`: Data-driven tuning

pub mod error;
pub mod game_loop;
pub mod settings;
pub mod sim;
pub mod sync;

pub use error::{ConfigError, RaceError, TrackError};
pub use game_loop::{ClientSession, GameLoop};
pub use settings::Settings;

use std::f32::consts::{PI, TAU};

/// Simulation configuration constants
pub mod consts {
    /// Reference simulation rate (Hz)
    pub const TICK_RATE: u32 = 60;
    /// Fixed simulation timestep
    pub const SIM_DT: f32 = 1.0 / TICK_RATE as f32;
    /// Accumulator clamp to prevent spiral of death after a stall (seconds)
    pub const MAX_FRAME_TIME: f32 = 0.25;

    /// Collision radius of a car
    pub const CAR_RADIUS: f32 = 10.0;

    /// Presentation lag behind the newest snapshot (ms)
    pub const RENDER_DELAY_MS: f64 = 100.0;
    /// Longest forward projection without fresh data (ms)
    pub const MAX_EXTRAPOLATION_MS: f64 = 100.0;
    /// Snapshots kept by the interpolation buffer
    pub const SNAPSHOT_BUFFER_CAPACITY: usize = 32;
}

/// Normalize an angle to (-π, π]
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let mut a = angle.rem_euclid(TAU);
    if a > PI {
        a -= TAU;
    }
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if a <= -PI {
        a += TAU;
    }
    a
}

/// Signed shortest rotation taking `from` to `to`, in (-π, π]
#[inline]
pub fn shortest_angle_delta(from: f32, to: f32) -> f32 {
    normalize_angle(to - from)
}

/// Interpolate between two angles along the shortest arc
#[inline]
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    normalize_angle(from + shortest_angle_delta(from, to) * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_angle_range() {
        assert!((normalize_angle(PI) - PI).abs() < 1e-6);
        assert!((normalize_angle(-PI) - PI).abs() < 1e-6);
        assert!((normalize_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-5);
        assert!((normalize_angle(-5.0 * TAU + 0.25) - 0.25).abs() < 1e-4);
        assert_eq!(normalize_angle(f32::NAN), 0.0);
    }

    #[test]
    fn test_lerp_angle_wraps_through_pi() {
        // 3.0 -> -3.0 is a short hop across ±π, not a long swing through 0
        let mid = lerp_angle(3.0, -3.0, 0.5);
        assert!(mid.abs() > 3.0, "went through zero: {mid}");
    }

    #[test]
    fn test_lerp_angle_endpoints() {
        assert!((lerp_angle(0.5, 1.5, 0.0) - 0.5).abs() < 1e-6);
        assert!((lerp_angle(0.5, 1.5, 1.0) - 1.5).abs() < 1e-6);
    }
}
