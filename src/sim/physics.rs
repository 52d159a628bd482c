//! Arcade drift physics for a single car
//!
//! `step` is a pure function: identical inputs always produce an identical
//! `CarState`, which is what lets client prediction and the authoritative
//! simulation share this code.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::heading_vector;
use super::track::SurfaceType;
use crate::normalize_angle;
use crate::settings::{CarConfig, PhysicsConfig, Settings};

/// Discrete controls for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlInput {
    pub accelerate: bool,
    pub brake: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    pub nitro: bool,
}

impl ControlInput {
    /// +1 right, -1 left, 0 straight (right wins if both are held)
    pub fn turn_direction(&self) -> f32 {
        if self.turn_right {
            1.0
        } else if self.turn_left {
            -1.0
        } else {
            0.0
        }
    }

    pub fn is_coasting(&self) -> bool {
        !self.accelerate && !self.brake
    }
}

/// What the car is driving on this tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceContact {
    pub surface: SurfaceType,
    pub off_track: bool,
}

/// Kinematic state of one car
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarState {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Facing direction, radians in (-π, π]
    pub heading: f32,
    pub angular_velocity: f32,
    /// Smoothed throttle in [0, 1]
    pub throttle: f32,
    pub is_drifting: bool,
    /// Angle between heading and velocity while drifting
    pub drift_angle: f32,
    pub is_off_track: bool,
    pub nitro_charges: u32,
    pub nitro_active: bool,
    pub nitro_remaining_ticks: u32,
}

impl CarState {
    /// Stationary car on the grid
    pub fn new(position: Vec2, heading: f32, nitro_charges: u32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            heading: normalize_angle(heading),
            angular_velocity: 0.0,
            throttle: 0.0,
            is_drifting: false,
            drift_angle: 0.0,
            is_off_track: false,
            nitro_charges,
            nitro_active: false,
            nitro_remaining_ticks: 0,
        }
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Unit vector the car is facing
    #[inline]
    pub fn forward(&self) -> Vec2 {
        heading_vector(self.heading)
    }
}

/// Speed cap for the current boost and track state
pub fn max_speed(physics: &PhysicsConfig, car: &CarConfig, nitro_active: bool, off_track: bool) -> f32 {
    let mut cap = physics.max_speed;
    if nitro_active {
        cap *= car.nitro_speed_multiplier;
    }
    if off_track {
        cap *= physics.off_track_speed_multiplier;
    }
    cap.max(0.0)
}

/// Effective lateral grip for a contact
pub fn grip_coefficient(physics: &PhysicsConfig, contact: SurfaceContact) -> f32 {
    let grip = physics.grip(contact.surface);
    if contact.off_track {
        grip * physics.off_track_grip_multiplier
    } else {
        grip
    }
}

/// Advance one car by one tick
pub fn step(
    state: &CarState,
    input: &ControlInput,
    contact: SurfaceContact,
    dt: f32,
    settings: &Settings,
) -> CarState {
    let physics = &settings.physics;
    let mut next = *state;
    next.is_off_track = contact.off_track;

    next.throttle = shape_throttle(state.throttle, input.accelerate, physics.throttle_response, dt);
    activate_nitro(&mut next, input.nitro, &settings.car);
    tick_nitro(&mut next);

    let cap = max_speed(physics, &settings.car, next.nitro_active, contact.off_track);

    if next.throttle > 0.0 {
        let accel = next.forward() * physics.acceleration * next.throttle * dt;
        next.velocity = (next.velocity + accel).clamp_length_max(cap);
    }

    if input.brake {
        next.velocity = apply_braking(next.velocity, physics.brake_force * dt);
    }

    next.angular_velocity = steer(
        state.angular_velocity,
        input.turn_direction(),
        next.speed(),
        physics,
        dt,
    );
    next.heading = normalize_angle(next.heading + next.angular_velocity * dt);

    if input.is_coasting() {
        next.velocity = apply_drag(next.velocity, physics, dt);
    }

    let lateral_speed = apply_grip(&mut next, grip_coefficient(physics, contact), physics, dt);
    next.is_drifting = lateral_speed.abs() > physics.drift_threshold;
    next.drift_angle = if next.is_drifting {
        let forward_speed = next.velocity.dot(next.forward());
        lateral_speed.atan2(forward_speed)
    } else {
        0.0
    };

    // Re-clamp: grip and a changed off-track flag can both leave the car over the cap
    next.velocity = next.velocity.clamp_length_max(cap);
    next.position += next.velocity * dt;
    next
}

/// Ramp throttle toward 0 or 1 without overshooting
fn shape_throttle(current: f32, accelerate: bool, response: f32, dt: f32) -> f32 {
    let target = if accelerate { 1.0 } else { 0.0 };
    let max_delta = (response * dt).max(0.0);
    let delta = (target - current).clamp(-max_delta, max_delta);
    (current + delta).clamp(0.0, 1.0)
}

fn activate_nitro(car: &mut CarState, requested: bool, cfg: &CarConfig) {
    if requested && !car.nitro_active && car.nitro_charges > 0 && cfg.nitro_duration_ticks > 0 {
        car.nitro_charges -= 1;
        car.nitro_active = true;
        car.nitro_remaining_ticks = cfg.nitro_duration_ticks;
        log::debug!("Nitro engaged, {} charges left", car.nitro_charges);
    }
}

fn tick_nitro(car: &mut CarState) {
    if car.nitro_active {
        car.nitro_remaining_ticks = car.nitro_remaining_ticks.saturating_sub(1);
        if car.nitro_remaining_ticks == 0 {
            car.nitro_active = false;
        }
    }
}

/// Decelerate against the direction of travel; stops, never reverses
fn apply_braking(velocity: Vec2, decel: f32) -> Vec2 {
    let speed = velocity.length();
    if speed <= decel {
        return Vec2::ZERO;
    }
    let braked = velocity - velocity.normalize_or_zero() * decel;
    if braked.dot(velocity) <= 0.0 {
        Vec2::ZERO
    } else {
        braked
    }
}

/// Speed-proportional coasting drag
fn apply_drag(velocity: Vec2, physics: &PhysicsConfig, dt: f32) -> Vec2 {
    let speed = velocity.length();
    if speed < physics.drag_stop_speed {
        return Vec2::ZERO;
    }
    let drag = physics.drag_coefficient * speed * dt;
    if drag >= speed {
        return Vec2::ZERO;
    }
    velocity - velocity.normalize_or_zero() * drag
}

/// Smoothed yaw rate toward the speed-scaled target
fn steer(current: f32, direction: f32, speed: f32, physics: &PhysicsConfig, dt: f32) -> f32 {
    let speed_factor = (speed / physics.min_turn_speed).clamp(0.0, 1.0);
    let target = physics.turn_rate * direction * speed_factor;
    let max_delta = (physics.angular_acceleration * dt).max(0.0);
    let limit = physics.turn_rate.abs();
    let current = if current.is_finite() { current } else { 0.0 };
    let next = current + (target - current).clamp(-max_delta, max_delta);
    next.clamp(-limit, limit)
}

/// Damp lateral velocity; returns the residual lateral speed
fn apply_grip(car: &mut CarState, grip: f32, physics: &PhysicsConfig, dt: f32) -> f32 {
    let forward = car.forward();
    let right = forward.perp();
    let forward_speed = car.velocity.dot(forward);
    let lateral_speed = car.velocity.dot(right);

    let friction = (physics.lateral_friction * grip * dt).max(0.0);
    let damped = if lateral_speed.abs() <= friction {
        0.0
    } else {
        lateral_speed - friction * lateral_speed.signum()
    };

    car.velocity = forward * forward_speed + right * damped;
    damped
}
