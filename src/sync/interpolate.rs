//! Snapshot blending for presentation
//!
//! Continuous car state is blended between two snapshots; discrete state
//! (race status, checkpoints, flags) is taken from whichever snapshot is
//! nearer in time. Neither input is modified.

use glam::Vec2;

use crate::lerp_angle;
use crate::sim::{CarState, PlayerSnapshot, StateSnapshot};

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Sanitize a blend factor into [0, 1]
#[inline]
pub fn clamp_alpha(alpha: f32) -> f32 {
    if alpha.is_nan() { 0.0 } else { alpha.clamp(0.0, 1.0) }
}

/// Blend one car between two states
pub fn interpolate_car(older: &CarState, newer: &CarState, alpha: f32) -> CarState {
    let t = clamp_alpha(alpha);
    if t <= 0.0 {
        return *older;
    }
    if t >= 1.0 {
        return *newer;
    }

    let nearer = if t < 0.5 { older } else { newer };
    CarState {
        position: older.position.lerp(newer.position, t),
        velocity: older.velocity.lerp(newer.velocity, t),
        heading: lerp_angle(older.heading, newer.heading, t),
        angular_velocity: lerp(older.angular_velocity, newer.angular_velocity, t),
        throttle: lerp(older.throttle, newer.throttle, t),
        drift_angle: lerp_angle(older.drift_angle, newer.drift_angle, t),
        ..*nearer
    }
}

/// Blend two snapshots; `alpha` 0 is `older`, 1 is `newer`
///
/// Cars are matched by id. A car missing from `older` appears as-is from
/// `newer`; a car missing from `newer` has left and is dropped.
pub fn interpolate(older: &StateSnapshot, newer: &StateSnapshot, alpha: f32) -> StateSnapshot {
    let t = clamp_alpha(alpha);
    if t <= 0.0 {
        return older.clone();
    }
    if t >= 1.0 {
        return newer.clone();
    }

    let nearer = if t < 0.5 { older } else { newer };
    let players = newer
        .players
        .iter()
        .map(|to| {
            let Some(from) = older.player(&to.player_id) else {
                return to.clone();
            };
            let discrete = if t < 0.5 { from } else { to };
            PlayerSnapshot {
                car: interpolate_car(&from.car, &to.car, t),
                ..discrete.clone()
            }
        })
        .collect();

    StateSnapshot {
        tick: nearer.tick,
        race_info: nearer.race_info.clone(),
        players,
    }
}

/// Project a snapshot forward along each car's velocity
///
/// `delta_ms` is clamped to `[0, max_ms]`, so anything past the window
/// freezes at the window's edge. Heading is left alone.
pub fn extrapolate(snapshot: &StateSnapshot, delta_ms: f64, max_ms: f64) -> StateSnapshot {
    let max_ms = if max_ms.is_finite() { max_ms.max(0.0) } else { 0.0 };
    let delta_ms = if delta_ms.is_nan() { 0.0 } else { delta_ms.clamp(0.0, max_ms) };
    if delta_ms <= 0.0 {
        return snapshot.clone();
    }

    let secs = (delta_ms / 1000.0) as f32;
    let mut projected = snapshot.clone();
    for p in &mut projected.players {
        let step: Vec2 = p.car.velocity * secs;
        if step.is_finite() {
            p.car.position += step;
        }
    }
    projected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::RaceInfo;

    fn car(x: f32, vx: f32, heading: f32) -> CarState {
        let mut c = CarState::new(Vec2::new(x, 0.0), heading, 2);
        c.velocity = Vec2::new(vx, 0.0);
        c
    }

    fn snap(tick: u64, cars: &[(&str, CarState)]) -> StateSnapshot {
        StateSnapshot {
            tick,
            race_info: RaceInfo::default(),
            players: cars
                .iter()
                .map(|(id, c)| PlayerSnapshot {
                    player_id: id.to_string(),
                    car: *c,
                    current_checkpoint: tick as usize,
                    split_times: Vec::new(),
                    is_finished: false,
                    finish_time: None,
                    position: None,
                    points: 0,
                    dnf: false,
                })
                .collect(),
        }
    }

    #[test]
    fn test_alpha_endpoints_are_exact() {
        let a = snap(1, &[("a", car(0.1, 3.3, 0.2))]);
        let b = snap(2, &[("a", car(7.7, 9.1, 0.9))]);
        assert_eq!(interpolate(&a, &b, 0.0), a);
        assert_eq!(interpolate(&a, &b, 1.0), b);
        // Out of range alphas clamp to the endpoints
        assert_eq!(interpolate(&a, &b, -3.0), a);
        assert_eq!(interpolate(&a, &b, 7.0), b);
        assert_eq!(interpolate(&a, &b, f32::NAN), a);
    }

    #[test]
    fn test_midpoint_blend() {
        let a = snap(1, &[("a", car(0.0, 10.0, 0.0))]);
        let b = snap(2, &[("a", car(10.0, 30.0, 1.0))]);
        let mid = interpolate(&a, &b, 0.5);
        let c = mid.players[0].car;
        assert!((c.position.x - 5.0).abs() < 1e-5);
        assert!((c.velocity.x - 20.0).abs() < 1e-5);
        assert!((c.heading - 0.5).abs() < 1e-5);
        assert_eq!(mid.players[0].current_checkpoint, 2);
    }

    #[test]
    fn test_heading_takes_short_way_round() {
        let a = snap(1, &[("a", car(0.0, 0.0, 3.0))]);
        let b = snap(2, &[("a", car(0.0, 0.0, -3.0))]);
        let heading = interpolate(&a, &b, 0.5).players[0].car.heading;
        assert!(heading.abs() > 3.0, "passed through zero: {heading}");
    }

    #[test]
    fn test_joining_and_leaving_cars() {
        let a = snap(1, &[("gone", car(0.0, 0.0, 0.0)), ("stay", car(0.0, 0.0, 0.0))]);
        let b = snap(2, &[("new", car(50.0, 0.0, 0.0)), ("stay", car(10.0, 0.0, 0.0))]);
        let mid = interpolate(&a, &b, 0.5);
        assert!(mid.player("gone").is_none());
        assert_eq!(mid.player("new").unwrap().car.position.x, 50.0);
        assert!((mid.player("stay").unwrap().car.position.x - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_extrapolation_window() {
        let s = snap(1, &[("a", car(0.0, 100.0, 1.0))]);
        assert_eq!(extrapolate(&s, 0.0, 100.0), s);

        let half = extrapolate(&s, 50.0, 100.0);
        assert!((half.players[0].car.position.x - 5.0).abs() < 1e-5);
        assert_eq!(half.players[0].car.heading, s.players[0].car.heading);

        let at_cap = extrapolate(&s, 100.0, 100.0);
        assert_eq!(extrapolate(&s, 250.0, 100.0), at_cap);
        assert_eq!(extrapolate(&s, f64::INFINITY, 100.0), at_cap);
        assert_eq!(extrapolate(&s, f64::NAN, 100.0), s);
        assert_eq!(extrapolate(&s, -20.0, 100.0), s);
    }
}
