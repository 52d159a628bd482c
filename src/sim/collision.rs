//! Collision detection and response against walls, obstacles and other cars
//!
//! Walls are the containment polylines; obstacles are circles. Only the first
//! contact per tick is resolved, which is enough at 60 Hz where a car moves a
//! few units per tick.

use glam::Vec2;

use super::geometry::{DEGENERATE_EPSILON_SQ, closest_point_on_segment};
use super::physics::CarState;
use super::track::{Obstacle, Track};
use crate::settings::PhysicsConfig;

/// Result of a collision check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Contact point on the other surface
    pub point: Vec2,
    /// Unit normal pointing from the surface toward the car center
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check a car against one wall edge
pub fn car_segment_collision(pos: Vec2, radius: f32, a: Vec2, b: Vec2) -> CollisionResult {
    // Coincident endpoints: no meaningful wall here
    let Some(closest) = closest_point_on_segment(pos, a, b) else {
        return CollisionResult::miss();
    };
    let offset = pos - closest;
    let dist = offset.length();
    if dist >= radius {
        return CollisionResult::miss();
    }

    let normal = if offset.length_squared() > DEGENERATE_EPSILON_SQ {
        offset / dist
    } else {
        // Center exactly on the wall line: use the edge's left-hand perpendicular
        (b - a).perp().normalize_or_zero()
    };
    if normal == Vec2::ZERO {
        return CollisionResult::miss();
    }

    CollisionResult {
        hit: true,
        point: closest,
        normal,
        penetration: radius - dist,
    }
}

/// Circle-circle check against a static obstacle
pub fn car_obstacle_collision(pos: Vec2, radius: f32, obstacle: &Obstacle) -> CollisionResult {
    let offset = pos - obstacle.position;
    let dist = offset.length();
    let reach = radius + obstacle.radius;
    if dist >= reach {
        return CollisionResult::miss();
    }

    let normal = if offset.length_squared() > DEGENERATE_EPSILON_SQ {
        offset / dist
    } else {
        Vec2::X
    };

    CollisionResult {
        hit: true,
        point: obstacle.position + normal * obstacle.radius,
        normal,
        penetration: reach - dist,
    }
}

/// First contact between a car and the track's walls or obstacles
pub fn detect_track_collision(track: &Track, pos: Vec2, radius: f32) -> CollisionResult {
    track
        .boundary_edges()
        .map(|(a, b)| car_segment_collision(pos, radius, a, b))
        .chain(
            track
                .obstacles
                .iter()
                .map(|o| car_obstacle_collision(pos, radius, o)),
        )
        .find(|c| c.hit)
        .unwrap_or_else(CollisionResult::miss)
}

/// Inelastic reflection: v' = v - (1 + e)(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2, elasticity: f32) -> Vec2 {
    velocity - (1.0 + elasticity) * velocity.dot(normal) * normal
}

/// Correct a car's position and velocity for a detected contact
pub fn resolve_collision(state: &CarState, hit: &CollisionResult, physics: &PhysicsConfig) -> CarState {
    if !hit.hit {
        return *state;
    }
    let mut next = *state;
    let elasticity = physics.collision_elasticity.clamp(0.0, 1.0);

    if state.speed() < physics.collision_min_speed {
        // Resting contact: no bounce, just separate and bleed speed
        next.position += hit.normal * hit.penetration;
        next.velocity *= 0.5;
        return next;
    }

    if state.velocity.dot(hit.normal) >= 0.0 {
        // Already separating
        return next;
    }

    next.velocity = reflect_velocity(state.velocity, hit.normal, elasticity);
    next.position += hit.normal * hit.penetration;
    next
}

/// Detect and resolve the first track contact for one car
pub fn collide_with_track(state: &CarState, track: &Track, physics: &PhysicsConfig) -> (CarState, CollisionResult) {
    let hit = detect_track_collision(track, state.position, physics.car_radius);
    (resolve_collision(state, &hit, physics), hit)
}

/// A car body taking part in a car-to-car contact
#[derive(Debug, Clone, Copy)]
pub struct CarBody {
    pub state: CarState,
    pub weight: f32,
}

/// Separate two overlapping cars and exchange a weighted impulse
///
/// Returns `None` when the cars do not overlap.
pub fn resolve_car_pair(a: CarBody, b: CarBody, physics: &PhysicsConfig) -> Option<(CarState, CarState)> {
    let offset = b.state.position - a.state.position;
    let dist = offset.length();
    let reach = 2.0 * physics.car_radius;
    if dist >= reach {
        return None;
    }

    let normal = if offset.length_squared() > DEGENERATE_EPSILON_SQ {
        offset / dist
    } else {
        Vec2::X
    };
    let penetration = reach - dist;
    let (wa, wb) = (a.weight.max(f32::EPSILON), b.weight.max(f32::EPSILON));

    let mut sa = a.state;
    let mut sb = b.state;

    // Positive when a is closing on b
    let approach = (sa.velocity - sb.velocity).dot(normal);
    if approach > physics.collision_min_speed {
        let elasticity = physics.collision_elasticity.clamp(0.0, 1.0);
        let impulse = -(1.0 + elasticity) * approach / (1.0 / wa + 1.0 / wb);
        sa.velocity += normal * (impulse / wa);
        sb.velocity -= normal * (impulse / wb);
    }

    // Lighter car is pushed further
    let total = wa + wb;
    sa.position -= normal * (penetration * wb / total);
    sb.position += normal * (penetration * wa / total);

    Some((sa, sb))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::track::ObstacleKind;
    use proptest::prelude::*;

    fn car_at(pos: Vec2, vel: Vec2) -> CarState {
        let mut car = CarState::new(pos, 0.0, 0);
        car.velocity = vel;
        car
    }

    #[test]
    fn test_wall_hit_normal_points_at_car() {
        let hit = car_segment_collision(
            Vec2::new(5.0, 6.0),
            10.0,
            Vec2::new(0.0, 0.0),
            Vec2::new(20.0, 0.0),
        );
        assert!(hit.hit);
        assert!((hit.normal - Vec2::Y).length() < 1e-6);
        assert!((hit.penetration - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_degenerate_wall_is_skipped() {
        let p = Vec2::new(1.0, 1.0);
        assert!(!car_segment_collision(p, 10.0, p, p).hit);
    }

    #[test]
    fn test_obstacle_hit() {
        let rock = Obstacle {
            position: Vec2::new(0.0, 0.0),
            radius: 5.0,
            kind: ObstacleKind::Rock,
        };
        let hit = car_obstacle_collision(Vec2::new(12.0, 0.0), 10.0, &rock);
        assert!(hit.hit);
        assert_eq!(hit.normal, Vec2::X);
        assert!((hit.penetration - 3.0).abs() < 1e-5);
        assert!(!car_obstacle_collision(Vec2::new(15.0, 0.0), 10.0, &rock).hit);
    }

    #[test]
    fn test_head_on_wall_bounce() {
        let physics = PhysicsConfig::default();
        // Car driving at 100 straight into a wall below it
        let car = car_at(Vec2::new(0.0, 8.0), Vec2::new(0.0, -100.0));
        let hit = car_segment_collision(car.position, 10.0, Vec2::new(-50.0, 0.0), Vec2::new(50.0, 0.0));
        let out = resolve_collision(&car, &hit, &physics);
        assert!((out.speed() - 70.0).abs() < 1e-3);
        assert!(out.velocity.y > 0.0);
        assert!((out.position.y - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_separating_contact_untouched() {
        let physics = PhysicsConfig::default();
        let car = car_at(Vec2::new(0.0, 8.0), Vec2::new(30.0, 50.0));
        let hit = car_segment_collision(car.position, 10.0, Vec2::new(-50.0, 0.0), Vec2::new(50.0, 0.0));
        assert!(hit.hit);
        assert_eq!(resolve_collision(&car, &hit, &physics), car);
    }

    #[test]
    fn test_slow_contact_pushes_out_and_halves_speed() {
        let physics = PhysicsConfig::default();
        let car = car_at(Vec2::new(0.0, 8.0), Vec2::new(0.0, -4.0));
        let hit = car_segment_collision(car.position, 10.0, Vec2::new(-50.0, 0.0), Vec2::new(50.0, 0.0));
        let out = resolve_collision(&car, &hit, &physics);
        assert_eq!(out.velocity, Vec2::new(0.0, -2.0));
        assert!((out.position.y - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_track_without_walls_or_obstacles() {
        let mut track = crate::sim::track::tests::straight_stage(500.0, 100.0, 2);
        track.containment = None;
        assert!(!detect_track_collision(&track, Vec2::new(0.0, 500.0), 10.0).hit);
    }

    #[test]
    fn test_car_pair_exchange() {
        let physics = PhysicsConfig::default();
        let a = CarBody { state: car_at(Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0)), weight: 60.0 };
        let b = CarBody { state: car_at(Vec2::new(15.0, 0.0), Vec2::ZERO), weight: 60.0 };
        let (sa, sb) = resolve_car_pair(a, b, &physics).unwrap();
        assert!(sa.velocity.x < 100.0);
        assert!(sb.velocity.x > 0.0);
        assert!(sb.position.x - sa.position.x >= 20.0 - 1e-4);

        let far = CarBody { state: car_at(Vec2::new(50.0, 0.0), Vec2::ZERO), weight: 60.0 };
        assert!(resolve_car_pair(a, far, &physics).is_none());
    }

    proptest! {
        #[test]
        fn prop_bounce_never_amplifies_normal_speed(
            angle in -3.1f32..3.1,
            speed in 10.5f32..500.0,
            along in -40.0f32..40.0,
            depth in 0.5f32..9.5,
        ) {
            let physics = PhysicsConfig::default();
            let velocity = Vec2::new(angle.cos(), angle.sin()) * speed;
            let car = car_at(Vec2::new(along, depth), velocity);
            let hit = car_segment_collision(car.position, 10.0, Vec2::new(-50.0, 0.0), Vec2::new(50.0, 0.0));
            prop_assert!(hit.hit);
            let out = resolve_collision(&car, &hit, &physics);
            let inward_before = (-velocity.dot(hit.normal)).max(0.0);
            let outward_after = out.velocity.dot(hit.normal);
            prop_assert!(outward_after <= physics.collision_elasticity * inward_before + 1e-3
                || velocity.dot(hit.normal) >= 0.0);
            prop_assert!(out.speed() <= car.speed() + 1e-3);
        }
    }
}
