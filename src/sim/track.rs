//! Stage description: centerline geometry, surfaces, checkpoints and walls
//!
//! Tracks come from an external generator as JSON and are immutable once
//! loaded. Only geometry queries live here.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::{closest_point_on_segment, cubic_bezier, heading_vector};
use crate::error::TrackError;

/// Centerline samples per straight segment
const STRAIGHT_SAMPLES: usize = 5;
/// Centerline samples per curved segment
const CURVE_SAMPLES: usize = 20;

/// Track surface, ordered from most to least grip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceType {
    #[default]
    Asphalt,
    Wet,
    Gravel,
    Ice,
}

/// A point on the centerline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    #[serde(default)]
    pub surface: SurfaceType,
}

impl TrackPoint {
    #[inline]
    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Straight or cubic-Bezier piece of centerline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSegment {
    pub start: TrackPoint,
    pub end: TrackPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control1: Option<Vec2>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control2: Option<Vec2>,
}

impl TrackSegment {
    /// Both control points present
    pub fn is_curve(&self) -> bool {
        self.control1.is_some() && self.control2.is_some()
    }

    /// Centerline point at parameter `t` in [0, 1]
    pub fn point_at(&self, t: f32) -> Vec2 {
        match (self.control1, self.control2) {
            (Some(c1), Some(c2)) => cubic_bezier(self.start.pos(), c1, c2, self.end.pos(), t),
            _ => self.start.pos().lerp(self.end.pos(), t),
        }
    }

    fn sample_count(&self) -> usize {
        if self.is_curve() {
            CURVE_SAMPLES
        } else {
            STRAIGHT_SAMPLES
        }
    }

    /// Evenly spaced centerline samples, endpoints included
    pub fn samples(&self) -> impl Iterator<Item = Vec2> + '_ {
        let n = self.sample_count();
        (0..=n).map(move |i| self.point_at(i as f32 / n as f32))
    }

    /// Consecutive sample pairs along the centerline
    fn sample_pairs(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        self.samples().zip(self.samples().skip(1))
    }

    /// Shortest distance from `pos` to the sampled centerline
    pub fn distance_to(&self, pos: Vec2) -> f32 {
        self.sample_pairs()
            .map(|(a, b)| match closest_point_on_segment(pos, a, b) {
                Some(closest) => pos.distance(closest),
                None => pos.distance(a),
            })
            .fold(f32::INFINITY, f32::min)
    }

    /// Approximate arc length
    pub fn length(&self) -> f32 {
        self.sample_pairs().map(|(a, b)| a.distance(b)).sum()
    }
}

/// A gate cars must cross in order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub position: Vec2,
    /// Direction of travel through the gate (radians)
    pub angle: f32,
    pub width: f32,
    pub index: usize,
}

impl Checkpoint {
    /// Gate endpoints: perpendicular to `angle`, centered on `position`
    pub fn gate(&self) -> (Vec2, Vec2) {
        let across = heading_vector(self.angle).perp() * (self.width / 2.0);
        (self.position + across, self.position - across)
    }

    /// Unit direction of travel
    pub fn direction(&self) -> Vec2 {
        heading_vector(self.angle)
    }
}

/// Walls bounding the playable area
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Containment {
    pub left_points: Vec<Vec2>,
    pub right_points: Vec<Vec2>,
}

impl Containment {
    /// Every wall edge, left side first
    pub fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        self.left_points
            .windows(2)
            .chain(self.right_points.windows(2))
            .map(|w| (w[0], w[1]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleKind {
    #[default]
    Rock,
    Tree,
    Building,
}

/// Static circular obstacle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub position: Vec2,
    pub radius: f32,
    #[serde(rename = "type", default)]
    pub kind: ObstacleKind,
}

/// Complete point-to-point stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub segments: Vec<TrackSegment>,
    pub checkpoints: Vec<Checkpoint>,
    pub start_position: Vec2,
    pub start_heading: f32,
    pub finish_position: Vec2,
    pub finish_heading: f32,
    #[serde(default)]
    pub total_length: f32,
    #[serde(default)]
    pub is_looping: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub containment: Option<Containment>,
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
}

impl Track {
    /// Parse and validate a track description
    pub fn from_json_str(json: &str) -> Result<Self, TrackError> {
        let mut track: Track = serde_json::from_str(json)?;
        if let Err(e) = track.validate() {
            log::warn!("Rejected track: {e}");
            return Err(e);
        }
        if track.total_length <= 0.0 {
            track.total_length = track.segments.iter().map(TrackSegment::length).sum();
        }
        log::debug!(
            "Loaded track: {} segments, {} checkpoints, {} obstacles, length {:.0}",
            track.segments.len(),
            track.checkpoints.len(),
            track.obstacles.len(),
            track.total_length
        );
        Ok(track)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, TrackError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check the description is usable for racing
    pub fn validate(&self) -> Result<(), TrackError> {
        if self.segments.is_empty() {
            return Err(TrackError::NoSegments);
        }
        if self.checkpoints.is_empty() {
            return Err(TrackError::NoCheckpoints);
        }
        for (i, seg) in self.segments.iter().enumerate() {
            if !(seg.start.width > 0.0 && seg.end.width > 0.0) {
                return Err(TrackError::InvalidWidth { segment: i });
            }
            let finite = seg.start.pos().is_finite()
                && seg.end.pos().is_finite()
                && seg.control1.is_none_or(|c| c.is_finite())
                && seg.control2.is_none_or(|c| c.is_finite());
            if !finite {
                return Err(TrackError::NonFiniteGeometry);
            }
        }
        for (expected, cp) in self.checkpoints.iter().enumerate() {
            if cp.index != expected {
                return Err(TrackError::CheckpointOrder {
                    expected,
                    found: cp.index,
                });
            }
            if !cp.position.is_finite() || !cp.angle.is_finite() {
                return Err(TrackError::NonFiniteGeometry);
            }
        }
        if !self.start_position.is_finite() || !self.start_heading.is_finite() {
            return Err(TrackError::NonFiniteGeometry);
        }
        let walls_finite = self.containment.as_ref().is_none_or(|c| {
            c.left_points.iter().chain(&c.right_points).all(|p| p.is_finite())
        });
        if !walls_finite || self.obstacles.iter().any(|o| !o.position.is_finite()) {
            return Err(TrackError::NonFiniteGeometry);
        }
        Ok(())
    }

    pub fn total_checkpoints(&self) -> usize {
        self.checkpoints.len()
    }

    /// The last checkpoint doubles as the finish line
    pub fn finish_checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoints.last()
    }

    /// Nearest segment and the distance to its centerline
    pub fn nearest_segment(&self, pos: Vec2) -> Option<(&TrackSegment, f32)> {
        self.segments
            .iter()
            .map(|seg| (seg, seg.distance_to(pos)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Distance from `pos` to the centerline (infinite for an empty track)
    pub fn centerline_distance(&self, pos: Vec2) -> f32 {
        self.nearest_segment(pos)
            .map(|(_, d)| d)
            .unwrap_or(f32::INFINITY)
    }

    /// Within half the local track width of the centerline
    pub fn is_on_track(&self, pos: Vec2) -> bool {
        match self.nearest_segment(pos) {
            Some((seg, dist)) => dist <= seg.start.width / 2.0,
            None => false,
        }
    }

    /// Surface of the nearest segment
    pub fn surface_at(&self, pos: Vec2) -> SurfaceType {
        self.nearest_segment(pos)
            .map(|(seg, _)| seg.start.surface)
            .unwrap_or_default()
    }

    /// Surface and on-track flag in a single centerline search
    pub fn surface_info(&self, pos: Vec2) -> (SurfaceType, bool) {
        match self.nearest_segment(pos) {
            Some((seg, dist)) => (seg.start.surface, dist <= seg.start.width / 2.0),
            None => (SurfaceType::default(), false),
        }
    }

    /// Containment wall edges (none if the stage has no walls)
    pub fn boundary_edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        self.containment.iter().flat_map(Containment::edges)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Straight stage along +x with evenly spaced checkpoints and walls
    pub fn straight_stage(length: f32, width: f32, checkpoints: usize) -> Track {
        let surface = SurfaceType::Asphalt;
        let segments = vec![TrackSegment {
            start: TrackPoint { x: 0.0, y: 0.0, width, surface },
            end: TrackPoint { x: length, y: 0.0, width, surface },
            control1: None,
            control2: None,
        }];
        let spacing = length / checkpoints as f32;
        let checkpoints = (0..checkpoints)
            .map(|i| Checkpoint {
                position: Vec2::new(spacing * (i + 1) as f32, 0.0),
                angle: 0.0,
                width,
                index: i,
            })
            .collect();
        let wall = width * 1.5;
        Track {
            segments,
            checkpoints,
            start_position: Vec2::ZERO,
            start_heading: 0.0,
            finish_position: Vec2::new(length, 0.0),
            finish_heading: 0.0,
            total_length: length,
            is_looping: false,
            containment: Some(Containment {
                left_points: vec![Vec2::new(-100.0, -wall), Vec2::new(length + 100.0, -wall)],
                right_points: vec![Vec2::new(-100.0, wall), Vec2::new(length + 100.0, wall)],
            }),
            obstacles: Vec::new(),
        }
    }

    #[test]
    fn test_gate_is_perpendicular() {
        let cp = Checkpoint {
            position: Vec2::new(100.0, 0.0),
            angle: 0.0,
            width: 40.0,
            index: 0,
        };
        let (a, b) = cp.gate();
        assert!((a.x - 100.0).abs() < 1e-4 && (b.x - 100.0).abs() < 1e-4);
        assert!((a.distance(b) - 40.0).abs() < 1e-4);
    }

    #[test]
    fn test_on_track_and_surface() {
        let track = straight_stage(1000.0, 100.0, 5);
        assert!(track.is_on_track(Vec2::new(500.0, 40.0)));
        assert!(!track.is_on_track(Vec2::new(500.0, 60.0)));
        assert_eq!(track.surface_at(Vec2::new(10.0, 0.0)), SurfaceType::Asphalt);
        assert!((track.centerline_distance(Vec2::new(300.0, -25.0)) - 25.0).abs() < 1e-3);
    }

    #[test]
    fn test_segment_length_and_distance() {
        let track = straight_stage(600.0, 100.0, 3);
        let segment = &track.segments[0];
        assert!((segment.length() - 600.0).abs() < 1e-3);
        assert!((segment.distance_to(Vec2::new(250.0, 30.0)) - 30.0).abs() < 1e-3);
        // Past the end the nearest point is the end cap
        assert!((segment.distance_to(Vec2::new(640.0, 30.0)) - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_finish_checkpoint_is_last() {
        let mut track = straight_stage(600.0, 100.0, 3);
        let finish = track.finish_checkpoint().unwrap();
        assert_eq!(finish.index, 2);
        assert_eq!(finish.position, Vec2::new(600.0, 0.0));
        track.checkpoints.clear();
        assert!(track.finish_checkpoint().is_none());
    }

    #[test]
    fn test_boundary_edges_optional() {
        let mut track = straight_stage(1000.0, 100.0, 5);
        assert_eq!(track.boundary_edges().count(), 2);
        track.containment = None;
        assert_eq!(track.boundary_edges().count(), 0);
    }

    #[test]
    fn test_json_round_trip_shape() {
        let json = r#"{
            "segments": [
                { "start": { "x": 0, "y": 0, "width": 80, "surface": "gravel" },
                  "end": { "x": 300, "y": 0, "width": 80, "surface": "ice" },
                  "control1": [100, 50], "control2": [200, 50] }
            ],
            "checkpoints": [ { "position": [300, 0], "angle": 0.0, "width": 80, "index": 0 } ],
            "start_position": [0, 0], "start_heading": 0.0,
            "finish_position": [300, 0], "finish_heading": 0.0,
            "obstacles": [ { "position": [150, 120], "radius": 12, "type": "tree" } ]
        }"#;
        let track = Track::from_json_str(json).unwrap();
        assert!(track.segments[0].is_curve());
        assert_eq!(track.surface_at(Vec2::new(10.0, 0.0)), SurfaceType::Gravel);
        assert_eq!(track.obstacles[0].kind, ObstacleKind::Tree);
        assert!(track.containment.is_none());
        // Curved centerline is longer than the chord
        assert!(track.total_length > 300.0);
    }

    #[test]
    fn test_validation_errors() {
        let mut track = straight_stage(1000.0, 100.0, 3);
        track.checkpoints.clear();
        assert!(matches!(track.validate(), Err(TrackError::NoCheckpoints)));

        let mut track = straight_stage(1000.0, 100.0, 3);
        track.checkpoints[1].index = 2;
        assert!(matches!(
            track.validate(),
            Err(TrackError::CheckpointOrder { expected: 1, found: 2 })
        ));

        let mut track = straight_stage(1000.0, 100.0, 3);
        track.segments[0].end.width = 0.0;
        assert!(matches!(
            track.validate(),
            Err(TrackError::InvalidWidth { segment: 0 })
        ));
    }
}
