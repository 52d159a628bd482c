//! Segment and curve helpers shared by the track, collision and race code

use glam::Vec2;

/// Segments shorter than this (squared) have no meaningful direction
pub const DEGENERATE_EPSILON_SQ: f32 = 1e-8;

/// Closest point to `p` on segment `a`-`b`
///
/// Returns `None` for a degenerate (zero-length) segment.
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Option<Vec2> {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < DEGENERATE_EPSILON_SQ {
        return None;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    Some(a + ab * t)
}

/// Parametric intersection of segments `p1`-`p2` and `p3`-`p4`
///
/// Returns `(t, u)` with both in [0, 1] when the segments cross, where the
/// hit point is `p1 + t (p2 - p1)`. Parallel or degenerate segments never
/// intersect.
pub fn segment_intersection(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> Option<(f32, f32)> {
    let r = p2 - p1;
    let s = p4 - p3;
    let denom = r.perp_dot(s);
    if denom.abs() < 1e-9 {
        return None;
    }
    let qp = p3 - p1;
    let t = qp.perp_dot(s) / denom;
    let u = qp.perp_dot(r) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some((t, u))
    } else {
        None
    }
}

/// Point on a cubic Bezier curve
#[inline]
pub fn cubic_bezier(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t: f32) -> Vec2 {
    let mt = 1.0 - t;
    p0 * (mt * mt * mt) + p1 * (3.0 * mt * mt * t) + p2 * (3.0 * mt * t * t) + p3 * (t * t * t)
}

/// Unit vector for a heading angle
#[inline]
pub fn heading_vector(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}
