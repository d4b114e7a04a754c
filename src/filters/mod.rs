//! Composite significance filtering. Three selectable strategies produce a
//! raw importance weight per point; this module owns the shared shape they
//! all funnel through — exponential smoothing of the weight sequence, a
//! minimum-weight cutoff, and price softening toward the slow average.

pub mod continuous;
pub mod fractal;
pub mod nstructure;

use crate::config::SignificanceConfig;
use crate::models::{MovingAverageSet, WavePoint};

/// Exponential filter over the weight sequence: `s[i] = α·w[i] + (1-α)·s[i-1]`.
pub(crate) fn exponential_smooth(weights: &[f64], alpha: f64) -> Vec<f64> {
    let mut smoothed = Vec::with_capacity(weights.len());
    let mut previous: Option<f64> = None;
    for &w in weights {
        let s = match previous {
            Some(prev) => alpha * w + (1.0 - alpha) * prev,
            None => w,
        };
        smoothed.push(s);
        previous = Some(s);
    }
    smoothed
}

/// Shared tail of every strategy: smooth the raw weights, drop points whose
/// smoothed weight falls below `cutoff`, and soften each survivor toward the
/// slow average by `(1 - weight) × shrink_factor`. `keep_endpoints` forces
/// the first and last point through the cutoff (fractal strategy contract).
pub(crate) fn finalize(
    points: &[WavePoint],
    raw_weights: &[f64],
    averages: &MovingAverageSet,
    slow_period: usize,
    cfg: &SignificanceConfig,
    cutoff: f64,
    keep_endpoints: bool,
) -> Vec<WavePoint> {
    debug_assert_eq!(points.len(), raw_weights.len());
    let smoothed = exponential_smooth(raw_weights, cfg.smoothing_alpha);
    let last = points.len().saturating_sub(1);

    points
        .iter()
        .zip(&smoothed)
        .enumerate()
        .filter_map(|(i, (point, &weight))| {
            let endpoint = keep_endpoints && (i == 0 || i == last);
            if weight < cutoff && !endpoint {
                return None;
            }
            Some(soften(point, weight, averages, slow_period, cfg.shrink_factor))
        })
        .collect()
}

fn soften(
    point: &WavePoint,
    weight: f64,
    averages: &MovingAverageSet,
    slow_period: usize,
    shrink_factor: f64,
) -> WavePoint {
    let Some(ma) = point
        .source_index
        .and_then(|i| averages.value_at(slow_period, i))
    else {
        // No reference average at this point: leave the price alone.
        return *point;
    };
    let pull = (1.0 - weight.clamp(0.0, 1.0)) * shrink_factor;
    let mut softened = *point;
    softened.price = point.price + (ma - point.price) * pull;
    softened
}

/// Position of a point inside its local price envelope: 1.0 when a High sits
/// on the upper edge (or a Low on the lower edge), 0.0 on the wrong edge,
/// 0.5 in a degenerate flat channel.
pub(crate) fn channel_score(points: &[WavePoint], index: usize, window: usize) -> f64 {
    let start = index.saturating_sub(window);
    let end = (index + window + 1).min(points.len());
    let slice = &points[start..end];
    let upper = slice.iter().map(|p| p.price).fold(f64::NEG_INFINITY, f64::max);
    let lower = slice.iter().map(|p| p.price).fold(f64::INFINITY, f64::min);
    let width = upper - lower;
    if width < f64::EPSILON {
        return 0.5;
    }
    let position = (points[index].price - lower) / width;
    match points[index].kind {
        crate::models::PointKind::High => position,
        crate::models::PointKind::Low => 1.0 - position,
        crate::models::PointKind::Interpolated => 0.5,
    }
}

/// Rescale weights so the maximum is 1.0; leaves an all-zero sequence alone.
pub(crate) fn normalize(weights: &mut [f64]) {
    let max = weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max > f64::EPSILON {
        for w in weights.iter_mut() {
            *w /= max;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PointKind;
    use crate::test_helpers::wave_points;

    #[test]
    fn exponential_smooth_seeds_from_first_weight() {
        let smoothed = exponential_smooth(&[1.0, 0.0, 0.0], 0.3);
        assert!((smoothed[0] - 1.0).abs() < 1e-9);
        assert!((smoothed[1] - 0.7).abs() < 1e-9);
        assert!((smoothed[2] - 0.49).abs() < 1e-9);
    }

    #[test]
    fn exponential_smooth_of_empty_is_empty() {
        assert!(exponential_smooth(&[], 0.3).is_empty());
    }

    #[test]
    fn finalize_drops_low_weights_and_softens() {
        let points = wave_points(&[(0, 110.0), (10, 120.0), (20, 130.0)]);
        let mut averages = MovingAverageSet::new();
        averages.insert(150, vec![Some(100.0); 30]);
        let cfg = SignificanceConfig::default();

        // Flat weights survive exponential smoothing unchanged.
        let out = finalize(&points, &[1.0, 0.1, 1.0], &averages, 150, &cfg, cfg.min_weight, false);
        // Middle point: smoothed weight 0.3·0.1 + 0.7·1.0 = 0.73 ≥ 0.3, kept.
        assert_eq!(out.len(), 3);
        // Fully weighted first point keeps its price.
        assert!((out[0].price - 110.0).abs() < 1e-9);
        // w=0.73: pull = 0.27 × 0.7 toward 100 from 120.
        let expected = 120.0 + (100.0 - 120.0) * (1.0 - 0.73) * 0.7;
        assert!((out[1].price - expected).abs() < 1e-9);
    }

    #[test]
    fn finalize_keeps_endpoints_when_asked() {
        let points = wave_points(&[(0, 110.0), (10, 120.0), (20, 130.0)]);
        let averages = MovingAverageSet::new();
        let cfg = SignificanceConfig::default();
        let weights = [0.0, 0.0, 0.0];

        let dropped = finalize(&points, &weights, &averages, 150, &cfg, cfg.min_weight, false);
        assert!(dropped.is_empty());

        let kept = finalize(&points, &weights, &averages, 150, &cfg, cfg.min_weight, true);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].timestamp, 0);
        assert_eq!(kept[1].timestamp, 20);
    }

    #[test]
    fn channel_score_rewards_edge_position() {
        let points = vec![
            WavePoint::new(0, 100.0, PointKind::Low, Some(0)),
            WavePoint::new(10, 120.0, PointKind::High, Some(1)),
            WavePoint::new(20, 101.0, PointKind::Low, Some(2)),
        ];
        assert!((channel_score(&points, 1, 3) - 1.0).abs() < 1e-9);
        assert!((channel_score(&points, 0, 3) - 1.0).abs() < 1e-9);
        // Low slightly off the bottom edge scores just under 1.
        let near = channel_score(&points, 2, 3);
        assert!(near > 0.9 && near < 1.0);
    }

    #[test]
    fn normalize_scales_to_unit_max() {
        let mut weights = vec![0.2, 0.5, 1.0, 0.1];
        normalize(&mut weights);
        assert!((weights[2] - 1.0).abs() < 1e-9);
        assert!((weights[0] - 0.2).abs() < 1e-9);

        let mut zeros = vec![0.0, 0.0];
        normalize(&mut zeros);
        assert_eq!(zeros, vec![0.0, 0.0]);
    }
}
