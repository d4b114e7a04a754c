//! Fractal significance: estimate how self-similar the wave structure is via
//! box counting, then recursively score sub-segments for shape correlation
//! and golden-ratio amplitude conformity. A point's importance aggregates the
//! level-weighted scores of every segment whose extremes it forms.

use crate::config::SignificanceConfig;
use crate::core::stats::linear_regression;
use crate::filters::{finalize, normalize};
use crate::models::{MovingAverageSet, WavePoint};

const GOLDEN_RATIO: f64 = 0.618;
const MAX_RECURSION: usize = 5;
const RESAMPLE_POINTS: usize = 8;

pub fn filter(
    points: &[WavePoint],
    averages: &MovingAverageSet,
    slow_period: usize,
    cfg: &SignificanceConfig,
) -> Vec<WavePoint> {
    if points.len() < cfg.min_segment.max(4) {
        tracing::debug!(len = points.len(), "too few points, fractal filter pass-through");
        return points.to_vec();
    }

    let dimension = box_counting_dimension(points, cfg.box_scales);
    // Dimension near 1 means an almost-linear path; self-similar structure
    // pushes toward 2 and amplifies every segment score.
    let complexity = (dimension - 1.0).clamp(0.25, 1.0);

    let mut importance = vec![0.0; points.len()];
    score_segment(points, 0, points.len() - 1, 0, complexity, cfg, &mut importance);
    normalize(&mut importance);

    // Retention is relative to the strongest point: weights are unit-max
    // normalized, so the cutoff reads as a fraction of max importance.
    finalize(points, &importance, averages, slow_period, cfg, cfg.importance_cutoff, true)
}

/// Box-counting estimate of the fractal dimension: occupied-cell counts over
/// geometric grid refinements, log-log regression slope. Clamped to [1, 2].
pub(crate) fn box_counting_dimension(points: &[WavePoint], scales: usize) -> f64 {
    if points.len() < 2 || scales < 2 {
        return 1.0;
    }
    let t0 = points[0].timestamp as f64;
    let t1 = points[points.len() - 1].timestamp as f64;
    let p_min = points.iter().map(|p| p.price).fold(f64::INFINITY, f64::min);
    let p_max = points.iter().map(|p| p.price).fold(f64::NEG_INFINITY, f64::max);
    let t_span = t1 - t0;
    let p_span = p_max - p_min;
    if t_span <= 0.0 || p_span <= 0.0 {
        return 1.0;
    }

    let mut log_inv_eps = Vec::with_capacity(scales);
    let mut log_counts = Vec::with_capacity(scales);
    for k in 1..=scales {
        let cells = 1usize << k;
        let mut occupied = std::collections::HashSet::new();
        for p in points {
            let x = (((p.timestamp as f64 - t0) / t_span) * cells as f64) as usize;
            let y = (((p.price - p_min) / p_span) * cells as f64) as usize;
            occupied.insert((x.min(cells - 1), y.min(cells - 1)));
        }
        log_inv_eps.push((cells as f64).ln());
        log_counts.push((occupied.len() as f64).ln());
    }

    linear_regression(&log_inv_eps, &log_counts)
        .map(|(slope, _)| slope.clamp(1.0, 2.0))
        .unwrap_or(1.0)
}

/// Recursive descent: split the segment at its midpoint, score the halves
/// for self-similarity and golden-ratio amplitude conformity, credit the
/// segment's extreme points, and recurse. Deeper levels carry geometrically
/// smaller weight.
fn score_segment(
    points: &[WavePoint],
    start: usize,
    end: usize,
    level: usize,
    complexity: f64,
    cfg: &SignificanceConfig,
    importance: &mut [f64],
) {
    let len = end - start + 1;
    if len < cfg.min_segment * 2 || level >= MAX_RECURSION {
        return;
    }
    let mid = start + len / 2;

    let correlation = shape_correlation(&points[start..=mid], &points[mid..=end]);
    let conformity = golden_ratio_conformity(&points[start..=mid], &points[mid..=end]);
    let level_weight = 1.0 / (1 << level) as f64;
    let score = (0.5 * correlation.abs() + 0.5 * conformity) * level_weight * complexity;

    for half in [start..=mid, mid..=end] {
        let slice_start = *half.start();
        if let Some((hi, lo)) = extreme_indices(&points[half.clone()]) {
            importance[slice_start + hi] += score;
            importance[slice_start + lo] += score;
        }
    }

    score_segment(points, start, mid, level + 1, complexity, cfg, importance);
    score_segment(points, mid, end, level + 1, complexity, cfg, importance);
}

/// Pearson correlation of the two halves' price shapes after resampling each
/// to a fixed number of normalized samples.
fn shape_correlation(a: &[WavePoint], b: &[WavePoint]) -> f64 {
    let sa = resample_normalized(a);
    let sb = resample_normalized(b);
    if sa.len() != sb.len() || sa.is_empty() {
        return 0.0;
    }
    let n = sa.len() as f64;
    let mean_a = sa.iter().sum::<f64>() / n;
    let mean_b = sb.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in sa.iter().zip(&sb) {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }
    let denom = (var_a * var_b).sqrt();
    if denom < f64::EPSILON {
        return 0.0;
    }
    cov / denom
}

/// Piecewise-linear resample of a segment's prices at uniform time steps,
/// normalized to zero mean implicitly by the correlation above.
fn resample_normalized(segment: &[WavePoint]) -> Vec<f64> {
    if segment.len() < 2 {
        return Vec::new();
    }
    let t0 = segment[0].timestamp as f64;
    let t1 = segment[segment.len() - 1].timestamp as f64;
    let span = t1 - t0;
    if span <= 0.0 {
        return Vec::new();
    }
    (0..RESAMPLE_POINTS)
        .map(|k| {
            let t = t0 + span * k as f64 / (RESAMPLE_POINTS - 1) as f64;
            sample_at(segment, t)
        })
        .collect()
}

fn sample_at(segment: &[WavePoint], t: f64) -> f64 {
    let mut previous = &segment[0];
    for p in &segment[1..] {
        if (p.timestamp as f64) >= t {
            let dt = (p.timestamp - previous.timestamp) as f64;
            if dt <= 0.0 {
                return p.price;
            }
            let u = (t - previous.timestamp as f64) / dt;
            return previous.price + (p.price - previous.price) * u;
        }
        previous = p;
    }
    segment[segment.len() - 1].price
}

/// How close the two halves' amplitude ratio sits to the golden ratio, in
/// either orientation. 1.0 = exact conformity, decaying linearly.
fn golden_ratio_conformity(a: &[WavePoint], b: &[WavePoint]) -> f64 {
    let amp_a = amplitude(a);
    let amp_b = amplitude(b);
    if amp_a < f64::EPSILON || amp_b < f64::EPSILON {
        return 0.0;
    }
    let ratio = (amp_a / amp_b).min(amp_b / amp_a);
    1.0 - ((ratio - GOLDEN_RATIO).abs() / GOLDEN_RATIO).min(1.0)
}

fn amplitude(segment: &[WavePoint]) -> f64 {
    let max = segment.iter().map(|p| p.price).fold(f64::NEG_INFINITY, f64::max);
    let min = segment.iter().map(|p| p.price).fold(f64::INFINITY, f64::min);
    max - min
}

/// Indices (within the slice) of the maximum- and minimum-price points.
fn extreme_indices(segment: &[WavePoint]) -> Option<(usize, usize)> {
    if segment.is_empty() {
        return None;
    }
    let hi = segment
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)?;
    let lo = segment
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)?;
    Some((hi, lo))
}
