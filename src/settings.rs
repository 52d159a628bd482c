//! Simulation tuning and race settings
//!
//! Every section defaults sensibly, so a settings file only needs the
//! values it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;
use crate::sim::SurfaceType;

/// Car handling parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    // === Movement ===
    /// Base top speed (units/s)
    pub max_speed: f32,
    /// Forward acceleration at full throttle (units/s²)
    pub acceleration: f32,
    /// Braking deceleration (units/s²)
    pub brake_force: f32,
    /// Coasting drag, proportional to speed (1/s)
    pub drag_coefficient: f32,
    /// Below this speed a coasting car stops dead
    pub drag_stop_speed: f32,
    /// Throttle ramp rate toward the requested value (1/s)
    pub throttle_response: f32,

    // === Turning ===
    /// Peak yaw rate (rad/s)
    pub turn_rate: f32,
    /// Speed at which steering reaches full authority
    pub min_turn_speed: f32,
    /// Yaw acceleration limit (rad/s²)
    pub angular_acceleration: f32,

    // === Grip and drift ===
    /// Lateral friction at grip 1.0 (units/s²)
    pub lateral_friction: f32,
    pub grip_asphalt: f32,
    pub grip_wet: f32,
    pub grip_gravel: f32,
    pub grip_ice: f32,
    /// Residual lateral speed above which the car is drifting
    pub drift_threshold: f32,

    // === Off-track penalty ===
    pub off_track_speed_multiplier: f32,
    pub off_track_grip_multiplier: f32,

    // === Collisions ===
    /// Restitution applied on every bounce (< 1)
    pub collision_elasticity: f32,
    /// Below this speed contacts push out without bouncing
    pub collision_min_speed: f32,
    pub car_radius: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            max_speed: 300.0,
            acceleration: 250.0,
            brake_force: 400.0,
            drag_coefficient: 0.6,
            drag_stop_speed: 0.1,
            throttle_response: 20.0,

            turn_rate: 3.0,
            min_turn_speed: 20.0,
            angular_acceleration: 24.0,

            lateral_friction: 900.0,
            grip_asphalt: 1.0,
            grip_wet: 0.7,
            grip_gravel: 0.5,
            grip_ice: 0.25,
            drift_threshold: 25.0,

            off_track_speed_multiplier: 0.5,
            off_track_grip_multiplier: 0.3,

            collision_elasticity: 0.7,
            collision_min_speed: 10.0,
            car_radius: CAR_RADIUS,
        }
    }
}

impl PhysicsConfig {
    /// Grip coefficient for a surface (before any off-track penalty)
    pub fn grip(&self, surface: SurfaceType) -> f32 {
        match surface {
            SurfaceType::Asphalt => self.grip_asphalt,
            SurfaceType::Wet => self.grip_wet,
            SurfaceType::Gravel => self.grip_gravel,
            SurfaceType::Ice => self.grip_ice,
        }
    }
}

/// Race flow and client timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Simulation ticks per second
    pub tick_rate: u32,
    pub countdown_seconds: f32,
    /// Seconds after the first finisher before stragglers are DNF
    pub finish_grace_period: f32,
    pub max_cars: usize,
    /// Accumulator clamp (seconds)
    pub max_frame_time: f32,
    pub render_delay_ms: f64,
    pub max_extrapolation_ms: f64,
    pub snapshot_buffer_capacity: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            countdown_seconds: 3.0,
            finish_grace_period: 30.0,
            max_cars: 8,
            max_frame_time: MAX_FRAME_TIME,
            render_delay_ms: RENDER_DELAY_MS,
            max_extrapolation_ms: MAX_EXTRAPOLATION_MS,
            snapshot_buffer_capacity: SNAPSHOT_BUFFER_CAPACITY,
        }
    }
}

impl GameConfig {
    /// Tick length in seconds
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }
}

/// Per-car defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CarConfig {
    pub default_nitro_charges: u32,
    /// Nitro burn length (2 seconds at 60 Hz)
    pub nitro_duration_ticks: u32,
    pub nitro_speed_multiplier: f32,
    /// Mass used for car-to-car impulses
    pub default_weight: f32,
}

impl Default for CarConfig {
    fn default() -> Self {
        Self {
            default_nitro_charges: 2,
            nitro_duration_ticks: 120,
            nitro_speed_multiplier: 1.5,
            default_weight: 60.0,
        }
    }
}

/// Championship points
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Points awarded by finishing position (1st first)
    pub points_by_position: Vec<u32>,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            points_by_position: vec![25, 18, 15, 12, 10, 8, 6, 4],
        }
    }
}

impl RaceConfig {
    /// Points for a 1-based finishing position
    pub fn points_for(&self, position: usize) -> u32 {
        position
            .checked_sub(1)
            .and_then(|i| self.points_by_position.get(i))
            .copied()
            .unwrap_or(0)
    }
}

/// All tunables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub physics: PhysicsConfig,
    pub game: GameConfig,
    pub car: CarConfig,
    pub race: RaceConfig,
}

impl Settings {
    /// Parse settings from JSON, then sanitize
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let mut settings: Settings = serde_json::from_str(json)?;
        settings.validate();
        Ok(settings)
    }

    /// Read and parse a settings file
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json_str(&json)?;
        log::info!("Loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Load a settings file, falling back to defaults on any failure
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            log::info!("Using default settings");
            return Self::default();
        };
        match Self::load_from_path(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Clamp values that would break the simulation
    pub fn validate(&mut self) {
        let p = &mut self.physics;
        if !(0.0..1.0).contains(&p.collision_elasticity) {
            log::warn!(
                "collision_elasticity {} out of range, clamping",
                p.collision_elasticity
            );
            p.collision_elasticity = p.collision_elasticity.clamp(0.0, 0.99);
        }
        if p.max_speed <= 0.0 {
            log::warn!("max_speed must be positive, using default");
            p.max_speed = PhysicsConfig::default().max_speed;
        }
        if p.min_turn_speed <= 0.0 {
            log::warn!("min_turn_speed must be positive, using default");
            p.min_turn_speed = PhysicsConfig::default().min_turn_speed;
        }
        if p.car_radius <= 0.0 {
            log::warn!("car_radius must be positive, using default");
            p.car_radius = CAR_RADIUS;
        }

        let g = &mut self.game;
        if g.tick_rate == 0 {
            log::warn!("tick_rate must be positive, using {TICK_RATE}");
            g.tick_rate = TICK_RATE;
        }
        if g.max_frame_time <= 0.0 {
            g.max_frame_time = MAX_FRAME_TIME;
        }
        if g.snapshot_buffer_capacity < 2 {
            log::warn!("snapshot buffer needs at least 2 slots");
            g.snapshot_buffer_capacity = 2;
        }
        g.render_delay_ms = g.render_delay_ms.max(0.0);
        g.max_extrapolation_ms = g.max_extrapolation_ms.max(0.0);

        if self.car.default_weight <= 0.0 {
            self.car.default_weight = CarConfig::default().default_weight;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings =
            Settings::from_json_str(r#"{ "physics": { "max_speed": 200.0 } }"#).unwrap();
        assert_eq!(settings.physics.max_speed, 200.0);
        assert_eq!(settings.physics.acceleration, 250.0);
        assert_eq!(settings.game.tick_rate, 60);
        assert_eq!(settings.race.points_by_position[0], 25);
    }

    #[test]
    fn test_validate_clamps_elasticity() {
        let settings =
            Settings::from_json_str(r#"{ "physics": { "collision_elasticity": 1.5 } }"#).unwrap();
        assert!(settings.physics.collision_elasticity < 1.0);
    }

    #[test]
    fn test_bad_json_is_error() {
        assert!(matches!(
            Settings::from_json_str("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_points_table() {
        let race = RaceConfig::default();
        assert_eq!(race.points_for(1), 25);
        assert_eq!(race.points_for(8), 4);
        assert_eq!(race.points_for(9), 0);
        assert_eq!(race.points_for(0), 0);
    }

    #[test]
    fn test_grip_ordering() {
        let p = PhysicsConfig::default();
        assert!(p.grip(SurfaceType::Asphalt) > p.grip(SurfaceType::Wet));
        assert!(p.grip(SurfaceType::Wet) > p.grip(SurfaceType::Gravel));
        assert!(p.grip(SurfaceType::Gravel) > p.grip(SurfaceType::Ice));
    }
}
