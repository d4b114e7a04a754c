//! Smoothing of a wave-point sequence. Timestamps and kinds are preserved;
//! only prices move. Each smoother is total and returns the input unchanged
//! below its minimum point count.

use crate::models::WavePoint;

/// Each interior point is pulled toward the centroid of itself and its two
/// neighbors. The pull is adaptive: proportional to the point's distance
/// from the centroid relative to the neighbor span, clamped to [0.1, 1.0].
pub fn geometric(points: &[WavePoint]) -> Vec<WavePoint> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut out = points.to_vec();
    for i in 1..points.len() - 1 {
        let (prev, mid, next) = (&points[i - 1], &points[i], &points[i + 1]);
        let centroid = (prev.price + mid.price + next.price) / 3.0;
        let deviation = (mid.price - centroid).abs();
        let neighbor_span = (next.price - prev.price).abs() / 2.0;
        let pull = if neighbor_span < f64::EPSILON {
            1.0
        } else {
            (deviation / neighbor_span).clamp(0.1, 1.0)
        };
        out[i].price = mid.price + (centroid - mid.price) * pull;
    }
    out
}

/// Each point is pulled toward its sliding-window mean, scaled by how many
/// standard deviations it sits from that mean (capped at 3σ = full pull).
/// A window of 1 is the identity.
pub fn statistical(points: &[WavePoint], window: usize) -> Vec<WavePoint> {
    if points.len() < 2 || window <= 1 {
        return points.to_vec();
    }
    let half = window / 2;
    let mut out = points.to_vec();
    for i in 0..points.len() {
        let start = i.saturating_sub(half);
        let end = (i + half + 1).min(points.len());
        let slice = &points[start..end];
        let mean = slice.iter().map(|p| p.price).sum::<f64>() / slice.len() as f64;
        let variance =
            slice.iter().map(|p| (p.price - mean).powi(2)).sum::<f64>() / slice.len() as f64;
        let std = variance.sqrt();
        if std < f64::EPSILON {
            continue;
        }
        let z = (points[i].price - mean).abs() / std;
        let pull = (z / 3.0).min(1.0);
        out[i].price = points[i].price + (mean - points[i].price) * pull;
    }
    out
}

/// Weighted blend of the geometric and statistical outputs at matching
/// indices; `geometric_weight` defaults to 0.6 in the pipeline config.
pub fn hybrid(points: &[WavePoint], window: usize, geometric_weight: f64) -> Vec<WavePoint> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let geo = geometric(points);
    let stat = statistical(points, window);
    geo.iter()
        .zip(&stat)
        .map(|(g, s)| {
            let mut blended = *g;
            blended.price = g.price * geometric_weight + s.price * (1.0 - geometric_weight);
            blended
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::wave_points;

    #[test]
    fn geometric_preserves_endpoints_and_count() {
        let points = wave_points(&[(0, 100.0), (10, 130.0), (20, 95.0), (30, 115.0)]);
        let out = geometric(&points);
        assert_eq!(out.len(), points.len());
        assert_eq!(out[0], points[0]);
        assert_eq!(out[3], points[3]);
    }

    #[test]
    fn geometric_reduces_interior_deviation() {
        let points = wave_points(&[(0, 100.0), (10, 140.0), (20, 100.0)]);
        let out = geometric(&points);
        let centroid = (100.0 + 140.0 + 100.0) / 3.0;
        assert!((out[1].price - 140.0).abs() > 1e-9, "point did not move");
        assert!(
            (out[1].price - centroid).abs() < (140.0 - centroid).abs(),
            "moved away from centroid"
        );
    }

    #[test]
    fn geometric_below_three_points_is_identity() {
        let points = wave_points(&[(0, 100.0), (10, 140.0)]);
        assert_eq!(geometric(&points), points);
    }

    #[test]
    fn statistical_window_one_is_identity() {
        let points = wave_points(&[(0, 100.0), (10, 140.0), (20, 95.0), (30, 115.0)]);
        assert_eq!(statistical(&points, 1), points);
    }

    #[test]
    fn statistical_pulls_outliers_toward_window_mean() {
        let points = wave_points(&[(0, 100.0), (10, 101.0), (20, 160.0), (30, 99.0), (40, 100.0)]);
        let out = statistical(&points, 5);
        assert!(out[2].price < 160.0, "outlier not pulled down");
        assert!(out[2].price > 100.0, "outlier overshot the mean");
    }

    #[test]
    fn statistical_leaves_constant_series_alone() {
        let points = wave_points(&[(0, 100.0), (10, 100.0), (20, 100.0)]);
        assert_eq!(statistical(&points, 5), points);
    }

    #[test]
    fn hybrid_blends_between_the_two() {
        let points = wave_points(&[(0, 100.0), (10, 140.0), (20, 95.0), (30, 115.0), (40, 102.0)]);
        let geo = geometric(&points);
        let stat = statistical(&points, 5);
        let mix = hybrid(&points, 5, 0.6);
        for i in 0..points.len() {
            let expected = geo[i].price * 0.6 + stat[i].price * 0.4;
            assert!((mix[i].price - expected).abs() < 1e-9, "index {i}");
            assert_eq!(mix[i].timestamp, points[i].timestamp);
        }
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(geometric(&[]).is_empty());
        assert!(statistical(&[], 5).is_empty());
        assert!(hybrid(&[], 5, 0.6).is_empty());
    }
}
