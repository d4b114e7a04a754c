//! Interpolation of a wave-point skeleton into a drawable curve. Every
//! function is total: below its minimum input size it returns the input
//! unchanged, and the first and last input points are always preserved
//! exactly.

use crate::models::{PointKind, WavePoint};

fn lerp(a: &WavePoint, b: &WavePoint, t: f64) -> WavePoint {
    WavePoint::new(
        a.timestamp + ((b.timestamp - a.timestamp) as f64 * t).round() as i64,
        a.price + (b.price - a.price) * t,
        PointKind::Interpolated,
        None,
    )
}

/// Corner-cutting subdivision: each iteration replaces every adjacent pair
/// with its 25%/75% cut points, endpoints pinned. After `k` iterations on
/// `n` points the output holds `(n-1)·2^k + 1` points.
pub fn corner_cut(points: &[WavePoint], iterations: usize) -> Vec<WavePoint> {
    if points.len() < 3 || iterations == 0 {
        return points.to_vec();
    }
    let mut current = points.to_vec();
    for _ in 0..iterations {
        let mut next: Vec<WavePoint> = Vec::with_capacity(current.len() * 2 - 1);
        next.push(current[0]);
        for pair in current.windows(2) {
            next.push(lerp(&pair[0], &pair[1], 0.25));
            next.push(lerp(&pair[0], &pair[1], 0.75));
        }
        // Pin the exact endpoint in place of the trailing cut.
        let last_slot = next.len() - 1;
        next[last_slot] = current[current.len() - 1];
        current = next;
    }
    current
}

/// Catmull-Rom spline sampling: the sequence's first/last point doubles as
/// the missing exterior control point, `segments` samples per interval.
pub fn catmull_rom(points: &[WavePoint], segments: usize) -> Vec<WavePoint> {
    if points.len() < 3 || segments == 0 {
        return points.to_vec();
    }
    let n = points.len();
    let mut out: Vec<WavePoint> = Vec::with_capacity((n - 1) * segments + 1);

    for i in 0..(n - 1) {
        let p0 = points[i.saturating_sub(1)];
        let p1 = points[i];
        let p2 = points[i + 1];
        let p3 = points[(i + 2).min(n - 1)];

        for s in 0..segments {
            let t = s as f64 / segments as f64;
            if s == 0 {
                // Segment start is the original point, kept exactly.
                out.push(p1);
                continue;
            }
            out.push(WavePoint::new(
                blend(
                    p0.timestamp as f64,
                    p1.timestamp as f64,
                    p2.timestamp as f64,
                    p3.timestamp as f64,
                    t,
                )
                .round() as i64,
                blend(p0.price, p1.price, p2.price, p3.price, t),
                PointKind::Interpolated,
                None,
            ));
        }
    }
    out.push(points[n - 1]);
    out
}

/// Standard cubic Catmull-Rom blending.
fn blend(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * (2.0 * p1
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
}

/// Evenly spaced linear samples per segment. `segments = 1` is the identity.
pub fn linear_subdivide(points: &[WavePoint], segments: usize) -> Vec<WavePoint> {
    if points.len() < 2 || segments <= 1 {
        return points.to_vec();
    }
    let mut out: Vec<WavePoint> = Vec::with_capacity((points.len() - 1) * segments + 1);
    for pair in points.windows(2) {
        out.push(pair[0]);
        for s in 1..segments {
            out.push(lerp(&pair[0], &pair[1], s as f64 / segments as f64));
        }
    }
    out.push(points[points.len() - 1]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::wave_points;

    #[test]
    fn corner_cut_count_law() {
        let points = wave_points(&[(0, 100.0), (100, 120.0), (200, 95.0)]);
        // n=3, k=1: 3 + 2·(2¹−1) = 5 points.
        assert_eq!(corner_cut(&points, 1).len(), 5);
        // k=2: (n−1)·2² + 1 = 9.
        assert_eq!(corner_cut(&points, 2).len(), 9);
        // k=3 on n=4: 3·8 + 1 = 25.
        let four = wave_points(&[(0, 100.0), (100, 120.0), (200, 95.0), (300, 118.0)]);
        assert_eq!(corner_cut(&four, 3).len(), 25);
    }

    #[test]
    fn corner_cut_preserves_endpoints_exactly() {
        let points = wave_points(&[(0, 100.0), (100, 120.0), (200, 95.0), (300, 110.0)]);
        for k in 0..5 {
            let out = corner_cut(&points, k);
            assert_eq!(out.first().unwrap(), points.first().unwrap(), "k={k}");
            assert_eq!(out.last().unwrap(), points.last().unwrap(), "k={k}");
        }
    }

    #[test]
    fn corner_cut_below_three_points_is_identity() {
        let two = wave_points(&[(0, 100.0), (100, 120.0)]);
        assert_eq!(corner_cut(&two, 3), two);
        assert!(corner_cut(&[], 3).is_empty());
    }

    #[test]
    fn corner_cut_stays_inside_the_hull() {
        let points = wave_points(&[(0, 100.0), (100, 120.0), (200, 95.0)]);
        for p in corner_cut(&points, 3) {
            assert!(p.price >= 95.0 - 1e-9 && p.price <= 120.0 + 1e-9);
        }
    }

    #[test]
    fn catmull_rom_passes_through_original_points() {
        let points = wave_points(&[(0, 100.0), (100, 120.0), (200, 95.0), (300, 118.0)]);
        let out = catmull_rom(&points, 8);
        assert_eq!(out.len(), 3 * 8 + 1);
        for original in &points {
            assert!(
                out.iter().any(|p| p == original),
                "missing original point {original:?}"
            );
        }
        assert_eq!(out.first().unwrap(), points.first().unwrap());
        assert_eq!(out.last().unwrap(), points.last().unwrap());
    }

    #[test]
    fn catmull_rom_interior_samples_are_interpolated_kind() {
        let points = wave_points(&[(0, 100.0), (100, 120.0), (200, 95.0)]);
        let out = catmull_rom(&points, 4);
        let interpolated = out.iter().filter(|p| p.kind == PointKind::Interpolated).count();
        assert_eq!(interpolated, out.len() - points.len());
    }

    #[test]
    fn linear_subdivide_is_identity_at_one_segment() {
        let points = wave_points(&[(0, 100.0), (100, 120.0), (200, 95.0)]);
        assert_eq!(linear_subdivide(&points, 1), points);
    }

    #[test]
    fn linear_subdivide_emits_even_samples() {
        let points = wave_points(&[(0, 100.0), (100, 200.0)]);
        let out = linear_subdivide(&points, 4);
        assert_eq!(out.len(), 5);
        assert!((out[1].price - 125.0).abs() < 1e-9);
        assert!((out[2].price - 150.0).abs() < 1e-9);
        assert_eq!(out[2].timestamp, 50);
        assert_eq!(out.last().unwrap(), points.last().unwrap());
    }
}
