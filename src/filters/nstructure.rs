//! N-structure significance: each point is scored by the quality of the
//! local pattern it anchors — a peak-trough-peak or trough-peak-trough
//! triple — combined with channel fit, amplitude/slope quality, and soft
//! time-gap and wave-height constraints.

use crate::config::SignificanceConfig;
use crate::core::stats::median;
use crate::filters::{channel_score, finalize};
use crate::models::{MovingAverageSet, WavePoint};

const CHANNEL_WINDOW: usize = 3;
const LOCAL_WINDOW: usize = 5;

struct ComponentWeights;

impl ComponentWeights {
    const COMPLETENESS: f64 = 0.25;
    const SYMMETRY: f64 = 0.15;
    const STRENGTH: f64 = 0.20;
    const CHANNEL: f64 = 0.15;
    const AMPLITUDE: f64 = 0.15;
    const GAP: f64 = 0.10;
}

pub fn filter(
    points: &[WavePoint],
    averages: &MovingAverageSet,
    slow_period: usize,
    cfg: &SignificanceConfig,
) -> Vec<WavePoint> {
    if points.len() < 3 {
        tracing::debug!(len = points.len(), "too few points, n-structure filter pass-through");
        return points.to_vec();
    }

    let amplitudes = leg_amplitudes(points);
    let periods = leg_periods(points);

    let weights: Vec<f64> = (0..points.len())
        .map(|i| {
            if i == 0 || i + 1 == points.len() {
                // Endpoints anchor no complete pattern; score them on channel
                // fit alone so user-relevant extremes at the edges survive.
                return 0.5 + 0.5 * channel_score(points, i, CHANNEL_WINDOW);
            }
            composite_weight(points, i, &amplitudes, &periods, cfg)
        })
        .collect();

    finalize(points, &weights, averages, slow_period, cfg, cfg.min_weight, false)
}

fn composite_weight(
    points: &[WavePoint],
    index: usize,
    amplitudes: &[f64],
    periods: &[f64],
    cfg: &SignificanceConfig,
) -> f64 {
    let pattern = Pattern::around(points, index);

    let score = ComponentWeights::COMPLETENESS * pattern.completeness()
        + ComponentWeights::SYMMETRY * pattern.symmetry()
        + ComponentWeights::STRENGTH * pattern.strength(local_median(amplitudes, index))
        + ComponentWeights::CHANNEL * channel_score(points, index, CHANNEL_WINDOW)
        + ComponentWeights::AMPLITUDE
            * constraint_score(pattern.max_leg_amplitude(), local_median(amplitudes, index), cfg.max_amplitude_ratio)
        + ComponentWeights::GAP
            * constraint_score(pattern.max_leg_period(), local_mean(periods, index), cfg.max_gap_ratio);

    score.clamp(0.0, 1.0)
}

/// The two legs around a point: (prev → mid) and (mid → next).
struct Pattern {
    prev: WavePoint,
    mid: WavePoint,
    next: WavePoint,
}

impl Pattern {
    fn around(points: &[WavePoint], index: usize) -> Self {
        Self {
            prev: points[index - 1],
            mid: points[index],
            next: points[index + 1],
        }
    }

    fn leg_in(&self) -> (f64, f64) {
        (
            (self.mid.price - self.prev.price).abs(),
            (self.mid.timestamp - self.prev.timestamp).max(0) as f64,
        )
    }

    fn leg_out(&self) -> (f64, f64) {
        (
            (self.next.price - self.mid.price).abs(),
            (self.next.timestamp - self.mid.timestamp).max(0) as f64,
        )
    }

    fn max_leg_amplitude(&self) -> f64 {
        self.leg_in().0.max(self.leg_out().0)
    }

    fn max_leg_period(&self) -> f64 {
        self.leg_in().1.max(self.leg_out().1)
    }

    /// Full marks when the middle point is a strict price extreme between
    /// its neighbors and time strictly advances; a residual score otherwise.
    fn completeness(&self) -> f64 {
        let ordered = self.prev.timestamp < self.mid.timestamp && self.mid.timestamp < self.next.timestamp;
        if !ordered {
            return 0.0;
        }
        let peak = self.mid.price > self.prev.price && self.mid.price > self.next.price;
        let trough = self.mid.price < self.prev.price && self.mid.price < self.next.price;
        if peak || trough {
            1.0
        } else {
            0.3
        }
    }

    /// Time and amplitude balance between the two legs, averaged.
    fn symmetry(&self) -> f64 {
        let (amp_in, time_in) = self.leg_in();
        let (amp_out, time_out) = self.leg_out();
        (balance(amp_in, amp_out) + balance(time_in, time_out)) / 2.0
    }

    /// Relative amplitude versus the local median, scaled by the normalized
    /// time span of the pattern.
    fn strength(&self, local_amplitude: f64) -> f64 {
        if local_amplitude < f64::EPSILON {
            return 0.0;
        }
        let amplitude = (self.leg_in().0 + self.leg_out().0) / 2.0;
        let relative = (amplitude / local_amplitude).min(2.0) / 2.0;
        let span = self.leg_in().1 + self.leg_out().1;
        let time_factor = if span > 0.0 { 1.0 } else { 0.0 };
        relative * time_factor
    }
}

fn balance(a: f64, b: f64) -> f64 {
    let hi = a.max(b);
    if hi < f64::EPSILON {
        return 0.0;
    }
    a.min(b) / hi
}

/// Soft constraint: full score while `actual ≤ ratio × reference`, then a
/// gentle decay instead of outright rejection.
fn constraint_score(actual: f64, reference: f64, ratio: f64) -> f64 {
    if reference < f64::EPSILON {
        return 0.5;
    }
    let limit = reference * ratio;
    if actual <= limit {
        1.0
    } else {
        (limit / actual).clamp(0.0, 1.0)
    }
}

fn leg_amplitudes(points: &[WavePoint]) -> Vec<f64> {
    points
        .windows(2)
        .map(|w| (w[1].price - w[0].price).abs())
        .collect()
}

fn leg_periods(points: &[WavePoint]) -> Vec<f64> {
    points
        .windows(2)
        .map(|w| (w[1].timestamp - w[0].timestamp).max(0) as f64)
        .collect()
}

/// Median of the legs in a window around `index` (leg i spans points i..i+1).
fn local_median(legs: &[f64], index: usize) -> f64 {
    window_slice(legs, index)
        .and_then(median)
        .unwrap_or(0.0)
}

fn local_mean(legs: &[f64], index: usize) -> f64 {
    match window_slice(legs, index) {
        Some(slice) if !slice.is_empty() => slice.iter().sum::<f64>() / slice.len() as f64,
        _ => 0.0,
    }
}

fn window_slice(legs: &[f64], index: usize) -> Option<&[f64]> {
    if legs.is_empty() {
        return None;
    }
    let start = index.saturating_sub(LOCAL_WINDOW);
    let end = (index + LOCAL_WINDOW).min(legs.len());
    (start < end).then(|| &legs[start..end])
}
