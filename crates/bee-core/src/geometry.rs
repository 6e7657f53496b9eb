//! Rectangle overlap and angle math in screen space.
//!
//! Angles are in degrees, 0 points right and angles grow counterclockwise.
//! Screen y grows downward, so every conversion between angles and
//! offsets flips the sign of the y term.

use crate::types::Rect;

/// Axis-aligned overlap test with half-open extents.
///
/// Rectangles that only share an edge do not collide, and neither does a
/// rectangle with zero width or height.
pub fn check_collision(a: &Rect, b: &Rect) -> bool {
    if a.w <= 0 || a.h <= 0 || b.w <= 0 || b.h <= 0 {
        return false;
    }
    a.x < b.right() && b.x < a.right() && a.y < b.bottom() && b.y < a.bottom()
}

/// Euclidean distance between two points
pub fn distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt()
}

/// Euclidean length of a 3D offset
pub fn distance3(dx: f64, dy: f64, dz: f64) -> f64 {
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Normalize any angle into [0, 360)
pub fn absolute_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Direction from (x1, y1) toward (x2, y2), in [0, 360)
pub fn direction_of(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    absolute_angle((-(y2 - y1)).atan2(x2 - x1).to_degrees())
}

/// Decompose a polar vector into a screen-space offset
pub fn polar_to_cartesian(magnitude: f64, direction: f64) -> (f64, f64) {
    let rad = direction.to_radians();
    (magnitude * rad.cos(), -magnitude * rad.sin())
}

/// Reflect a direction off a vertical wall
pub fn angle_hbounce(angle: f64) -> f64 {
    absolute_angle(180.0 - angle)
}

/// Reflect a direction off a horizontal wall
pub fn angle_vbounce(angle: f64) -> f64 {
    absolute_angle(360.0 - angle)
}

/// The point `speed` units from (x1, y1) toward (x2, y2), clamped to the target
pub fn coord_approach(x1: f64, y1: f64, x2: f64, y2: f64, speed: f64) -> (f64, f64) {
    let d = distance(x1, y1, x2, y2);
    if d <= speed {
        return (x2, y2);
    }
    let ratio = speed / d;
    (x1 + (x2 - x1) * ratio, y1 + (y2 - y1) * ratio)
}
