//! Catmull-Rom interpolation through path waypoints.
//!
//! Used to draw and follow curved paths. Open curves duplicate their end
//! points as phantom neighbours; closed curves wrap around.

use crate::types::Vec3;

/// Catmull-Rom spline interpolation between four points.
pub fn catmull_rom(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f64) -> Vec3 {
    Vec3::new(
        catmull_rom_scalar(p0.x, p1.x, p2.x, p3.x, t),
        catmull_rom_scalar(p0.y, p1.y, p2.y, p3.y, t),
        catmull_rom_scalar(p0.z, p1.z, p2.z, p3.z, t),
    )
}

/// Catmull-Rom interpolation for a single scalar value.
pub fn catmull_rom_scalar(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

/// Point on segment `seg` (from `points[seg]` to the next point) at local `t`.
pub fn segment_point(points: &[Vec3], seg: usize, t: f64, closed: bool) -> Vec3 {
    let n = points.len();
    match n {
        0 => return Vec3::ZERO,
        1 => return points[0],
        _ => {}
    }

    let at = |i: isize| -> Vec3 {
        if closed {
            points[i.rem_euclid(n as isize) as usize]
        } else {
            points[i.clamp(0, n as isize - 1) as usize]
        }
    };
    let s = seg as isize;
    catmull_rom(at(s - 1), at(s), at(s + 1), at(s + 2), t)
}

/// Sample the curve through `points` with `per_segment` samples per segment.
///
/// The first and last control points are always part of the result for
/// open curves; closed curves end back at the first point.
pub fn sample_curve(points: &[Vec3], per_segment: usize, closed: bool) -> Vec<Vec3> {
    let n = points.len();
    if n < 2 {
        return points.to_vec();
    }
    let per_segment = per_segment.max(1);
    let segments = if closed { n } else { n - 1 };

    let mut samples = Vec::with_capacity(segments * per_segment + 1);
    for seg in 0..segments {
        for j in 0..per_segment {
            let t = j as f64 / per_segment as f64;
            samples.push(segment_point(points, seg, t, closed));
        }
    }
    samples.push(if closed { points[0] } else { points[n - 1] });
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_passes_through_control_points() {
        let pts = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0, 10.0, 0.0),
        ];
        for seg in 0..2 {
            let p = segment_point(&pts, seg, 0.0, false);
            assert!((p - pts[seg]).length() < 1e-9);
        }
        let end = segment_point(&pts, 1, 1.0, false);
        assert!((end - pts[2]).length() < 1e-9);
    }

    #[test]
    fn open_curve_sample_count() {
        let pts = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
        ];
        let samples = sample_curve(&pts, 4, false);
        assert_eq!(samples.len(), 2 * 4 + 1);
        assert_eq!(*samples.last().unwrap(), pts[2]);
    }

    #[test]
    fn closed_curve_returns_to_start() {
        let pts = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0, 10.0, 0.0),
            Vec3::new(0.0, 10.0, 0.0),
        ];
        let samples = sample_curve(&pts, 5, true);
        assert_eq!(samples.len(), 4 * 5 + 1);
        assert_eq!(*samples.last().unwrap(), pts[0]);
    }

    #[test]
    fn too_few_points_returns_input() {
        let pts = vec![Vec3::new(1.0, 2.0, 3.0)];
        assert_eq!(sample_curve(&pts, 8, false), pts);
    }
}
