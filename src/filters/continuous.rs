//! Continuous-weight significance: each point's importance blends a
//! sigmoid-mapped distance from the slow average, a local channel-fit score,
//! and a local peak-significance score. The blend weights adapt to a
//! classified local market state.

use crate::config::SignificanceConfig;
use crate::core::stats::{linear_regression, r_squared};
use crate::filters::{channel_score, finalize};
use crate::models::{MovingAverageSet, PointKind, WavePoint};

const STATE_WINDOW: usize = 7;
const CHANNEL_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketState {
    Trending,
    Ranging,
    Volatile,
}

struct BlendWeights {
    distance: f64,
    channel: f64,
    peak: f64,
}

impl MarketState {
    fn blend(self) -> BlendWeights {
        match self {
            // A clean trend makes distance-from-average the strongest signal.
            MarketState::Trending => BlendWeights {
                distance: 0.5,
                channel: 0.2,
                peak: 0.3,
            },
            // Range-bound action: the channel envelope carries the structure.
            MarketState::Ranging => BlendWeights {
                distance: 0.25,
                channel: 0.45,
                peak: 0.3,
            },
            // Volatile: only sharp, isolated peaks are trustworthy.
            MarketState::Volatile => BlendWeights {
                distance: 0.3,
                channel: 0.2,
                peak: 0.5,
            },
        }
    }
}

pub fn filter(
    points: &[WavePoint],
    averages: &MovingAverageSet,
    slow_period: usize,
    cfg: &SignificanceConfig,
) -> Vec<WavePoint> {
    if points.len() < 3 {
        tracing::debug!(len = points.len(), "too few points, continuous filter pass-through");
        return points.to_vec();
    }

    let weights: Vec<f64> = (0..points.len())
        .map(|i| {
            let state = classify_state(points, i);
            let blend = state.blend();
            let score = blend.distance * distance_score(&points[i], averages, slow_period)
                + blend.channel * channel_score(points, i, CHANNEL_WINDOW)
                + blend.peak * peak_score(points, i);
            score.clamp(0.0, 1.0)
        })
        .collect();

    finalize(points, &weights, averages, slow_period, cfg, cfg.min_weight, false)
}

/// Local market state from trend strength (R² of a line through the local
/// window) and relative volatility of the window's prices.
fn classify_state(points: &[WavePoint], index: usize) -> MarketState {
    let start = index.saturating_sub(STATE_WINDOW / 2);
    let end = (start + STATE_WINDOW).min(points.len());
    let slice = &points[start..end];
    if slice.len() < 3 {
        return MarketState::Ranging;
    }

    let xs: Vec<f64> = slice.iter().map(|p| p.timestamp as f64).collect();
    let ys: Vec<f64> = slice.iter().map(|p| p.price).collect();
    let strength = linear_regression(&xs, &ys)
        .map(|(slope, intercept)| r_squared(&xs, &ys, slope, intercept))
        .unwrap_or(0.0);

    let mean = ys.iter().sum::<f64>() / ys.len() as f64;
    let variance = ys.iter().map(|y| (y - mean).powi(2)).sum::<f64>() / ys.len() as f64;
    let volatility = if mean.abs() > f64::EPSILON {
        variance.sqrt() / mean.abs()
    } else {
        0.0
    };

    if strength > 0.6 {
        MarketState::Trending
    } else if volatility > 0.02 {
        MarketState::Volatile
    } else {
        MarketState::Ranging
    }
}

/// Sigmoid-mapped relative distance from the slow average. Centered so a
/// 1% excursion scores 0.5; missing average values score neutral.
fn distance_score(point: &WavePoint, averages: &MovingAverageSet, slow_period: usize) -> f64 {
    let Some(ma) = point
        .source_index
        .and_then(|i| averages.value_at(slow_period, i))
    else {
        return 0.5;
    };
    if ma.abs() < f64::EPSILON {
        return 0.5;
    }
    let distance = ((point.price - ma) / ma).abs();
    1.0 / (1.0 + (-(distance - 0.01) / 0.005).exp())
}

/// Peak significance: z-score strength within the local window, sharpness of
/// the slope change through the point, and time isolation from neighboring
/// same-kind peaks. Equal-weighted.
fn peak_score(points: &[WavePoint], index: usize) -> f64 {
    let z = z_strength(points, index);
    let sharp = slope_change(points, index);
    let isolation = time_isolation(points, index);
    (z + sharp + isolation) / 3.0
}

fn z_strength(points: &[WavePoint], index: usize) -> f64 {
    let start = index.saturating_sub(STATE_WINDOW / 2);
    let end = (start + STATE_WINDOW).min(points.len());
    let slice = &points[start..end];
    if slice.len() < 3 {
        return 0.0;
    }
    let mean = slice.iter().map(|p| p.price).sum::<f64>() / slice.len() as f64;
    let variance = slice
        .iter()
        .map(|p| (p.price - mean).powi(2))
        .sum::<f64>()
        / slice.len() as f64;
    let std = variance.sqrt();
    if std < f64::EPSILON {
        return 0.0;
    }
    (((points[index].price - mean).abs() / std) / 3.0).min(1.0)
}

fn slope_change(points: &[WavePoint], index: usize) -> f64 {
    if index == 0 || index + 1 >= points.len() {
        return 0.0;
    }
    let (prev, mid, next) = (&points[index - 1], &points[index], &points[index + 1]);
    let dt_in = (mid.timestamp - prev.timestamp).max(1) as f64;
    let dt_out = (next.timestamp - mid.timestamp).max(1) as f64;
    let slope_in = (mid.price - prev.price) / dt_in;
    let slope_out = (next.price - mid.price) / dt_out;
    let magnitude = slope_in.abs() + slope_out.abs();
    if magnitude < f64::EPSILON {
        return 0.0;
    }
    (slope_in - slope_out).abs() / magnitude
}

fn time_isolation(points: &[WavePoint], index: usize) -> f64 {
    let kind = points[index].kind;
    let same_kind: Vec<i64> = points
        .iter()
        .filter(|p| p.kind == kind)
        .map(|p| p.timestamp)
        .collect();
    if same_kind.len() < 2 {
        return 1.0;
    }
    let mean_gap = (same_kind[same_kind.len() - 1] - same_kind[0]) as f64
        / (same_kind.len() - 1) as f64;
    if mean_gap < f64::EPSILON {
        return 0.0;
    }
    let t = points[index].timestamp;
    let nearest = same_kind
        .iter()
        .filter(|&&s| s != t)
        .map(|&s| (s - t).abs() as f64)
        .fold(f64::INFINITY, f64::min);
    if !nearest.is_finite() {
        return 1.0;
    }
    (nearest / mean_gap).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::wave_points;

    fn flat_averages(value: f64, len: usize) -> MovingAverageSet {
        let mut mas = MovingAverageSet::new();
        mas.insert(150, vec![Some(value); len]);
        mas
    }

    #[test]
    fn tiny_input_is_pass_through() {
        let points = wave_points(&[(0, 100.0), (10, 110.0)]);
        let out = filter(&points, &flat_averages(100.0, 2), 150, &SignificanceConfig::default());
        assert_eq!(out, points);
    }

    #[test]
    fn empty_input_stays_empty() {
        let out = filter(&[], &MovingAverageSet::new(), 150, &SignificanceConfig::default());
        assert!(out.is_empty());
    }

    #[test]
    fn distance_score_saturates_with_excursion() {
        let mas = flat_averages(100.0, 4);
        let near = WavePoint::new(0, 100.2, PointKind::High, Some(0));
        let far = WavePoint::new(1, 103.0, PointKind::High, Some(1));
        let s_near = distance_score(&near, &mas, 150);
        let s_far = distance_score(&far, &mas, 150);
        assert!(s_near < 0.3, "near excursion scored {s_near}");
        assert!(s_far > 0.9, "far excursion scored {s_far}");
    }

    #[test]
    fn missing_average_scores_neutral() {
        let p = WavePoint::new(0, 100.0, PointKind::High, Some(0));
        assert!((distance_score(&p, &MovingAverageSet::new(), 150) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn trending_window_classifies_trending() {
        let points = wave_points(&[
            (0, 100.0),
            (10, 102.0),
            (20, 104.0),
            (30, 106.0),
            (40, 108.0),
            (50, 110.0),
            (60, 112.0),
        ]);
        assert_eq!(classify_state(&points, 3), MarketState::Trending);
    }

    #[test]
    fn sharp_spike_outranks_gentle_wobble() {
        // A long gentle alternation with one violent spike in the middle.
        let mut data: Vec<(i64, f64)> = Vec::new();
        for i in 0..20 {
            let v = 100.0 + if i % 2 == 0 { 0.4 } else { -0.4 };
            data.push((i * 100, v));
        }
        data[9].1 = 106.0;
        let points = wave_points(&data);
        let spike_score = peak_score(&points, 9);
        let wobble_score = peak_score(&points, 5);
        assert!(
            spike_score > wobble_score,
            "spike {spike_score} <= wobble {wobble_score}"
        );
    }

    #[test]
    fn strong_excursions_survive_filtering() {
        let mut data: Vec<(i64, f64)> = Vec::new();
        for i in 0..20 {
            let v = 100.0 + if i % 2 == 0 { 3.0 } else { -3.0 };
            data.push((i * 100, v));
        }
        let points = wave_points(&data);
        let mas = flat_averages(100.0, 20);
        let out = filter(&points, &mas, 150, &SignificanceConfig::default());
        assert!(!out.is_empty(), "all points dropped");
        // Softening pulls prices toward the average, never past it.
        for p in &out {
            assert!(p.price <= 103.0 + 1e-9 && p.price >= 97.0 - 1e-9);
        }
    }
}
