//! Trend filtering: classify the slow-average trend, re-detect pivots
//! directly from bars, keep only pivots whose distance from the slow average
//! is consistent with the trend, and derive trend lines plus a smoothed
//! near-average skeleton and an overview curve.

use serde::{Deserialize, Serialize};

use crate::config::TrendConfig;
use crate::core::stats::{linear_regression, r_squared};
use crate::models::{BarSeries, MovingAverageSet, PointKind, WavePoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Upward,
    Downward,
    Horizontal,
}

/// A straight segment through ≥3 consecutive same-kind filtered points.
/// `strength` is the R² of the implied line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendLine {
    pub start_index: usize,
    pub end_index: usize,
    pub start_value: f64,
    pub end_value: f64,
    pub slope: f64,
    pub strength: f64,
    pub kind: PointKind,
}

/// Everything the trend stage derives in one run. Recomputed from scratch
/// per invocation; read-only for the rendering layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub direction: Option<TrendDirection>,
    pub highs: Vec<WavePoint>,
    pub lows: Vec<WavePoint>,
    pub lines: Vec<TrendLine>,
    pub skeleton: Vec<WavePoint>,
    pub overview: Vec<WavePoint>,
}

pub fn analyze(bars: &BarSeries, averages: &MovingAverageSet, cfg: &TrendConfig) -> TrendAnalysis {
    if bars.is_empty() {
        return TrendAnalysis::default();
    }
    let Some(direction) = classify_direction(bars.len(), averages, cfg) else {
        tracing::debug!(period = cfg.slow_period, "slow average unusable, trend output empty");
        return TrendAnalysis::default();
    };

    let pivots = detect_pivots(bars, cfg.pivot_window);
    let accepted = accept_by_distance(&pivots, averages, direction, cfg);
    let thinned = enforce_min_gap(accepted, cfg.min_bar_gap);

    let highs: Vec<WavePoint> = thinned
        .iter()
        .filter(|p| p.kind == PointKind::High)
        .copied()
        .collect();
    let lows: Vec<WavePoint> = thinned
        .iter()
        .filter(|p| p.kind == PointKind::Low)
        .copied()
        .collect();

    let mut lines = build_trend_lines(&highs, cfg.min_line_points);
    lines.extend(build_trend_lines(&lows, cfg.min_line_points));

    let skeleton = smooth_skeleton(&pivots, averages, cfg);
    let overview = overview_curve(&thinned, cfg.overview_window, cfg.overview_blend);

    TrendAnalysis {
        direction: Some(direction),
        highs,
        lows,
        lines,
        skeleton,
        overview,
    }
}

/// Slope of a linear regression over the most recent `regression_window`
/// present slow-average values. `None` when too few values exist.
fn classify_direction(
    bar_count: usize,
    averages: &MovingAverageSet,
    cfg: &TrendConfig,
) -> Option<TrendDirection> {
    let recent: Vec<f64> = (0..bar_count)
        .filter_map(|i| averages.value_at(cfg.slow_period, i))
        .collect();
    if recent.len() < 2 {
        return None;
    }
    let tail_start = recent.len().saturating_sub(cfg.regression_window);
    let tail = &recent[tail_start..];
    let xs: Vec<f64> = (0..tail.len()).map(|i| i as f64).collect();
    let (slope, _) = linear_regression(&xs, tail)?;

    Some(if slope > cfg.slope_threshold {
        TrendDirection::Upward
    } else if slope < -cfg.slope_threshold {
        TrendDirection::Downward
    } else {
        TrendDirection::Horizontal
    })
}

/// Pivot highs/lows straight from the bars: strictly more extreme than every
/// bar within the symmetric window.
pub fn detect_pivots(bars: &BarSeries, window: usize) -> Vec<WavePoint> {
    let len = bars.len();
    if len <= window * 2 {
        return Vec::new();
    }
    let mut pivots = Vec::new();
    for i in window..(len - window) {
        let bar = &bars[i];
        let neighbors = (i - window)..=(i + window);

        let pivot_high = neighbors
            .clone()
            .filter(|&j| j != i)
            .all(|j| bars[j].high < bar.high);
        if pivot_high {
            pivots.push(WavePoint::new(bar.timestamp, bar.high, PointKind::High, Some(i)));
            continue;
        }

        let pivot_low = neighbors.filter(|&j| j != i).all(|j| bars[j].low > bar.low);
        if pivot_low {
            pivots.push(WavePoint::new(bar.timestamp, bar.low, PointKind::Low, Some(i)));
        }
    }
    pivots
}

/// Relative distance of a point from the slow average at its bar.
fn relative_distance(point: &WavePoint, averages: &MovingAverageSet, period: usize) -> Option<f64> {
    let index = point.source_index?;
    let ma = averages.value_at(period, index)?;
    if ma.abs() < f64::EPSILON {
        return None;
    }
    Some((point.price - ma) / ma)
}

/// Distance-band acceptance with trend-direction-consistent relaxation:
/// trend-side extremes beyond the average are always accepted; counter-side
/// points get a near bound widened by the relaxation factor.
fn accept_by_distance(
    pivots: &[WavePoint],
    averages: &MovingAverageSet,
    direction: TrendDirection,
    cfg: &TrendConfig,
) -> Vec<(WavePoint, f64)> {
    pivots
        .iter()
        .filter_map(|p| {
            let signed = relative_distance(p, averages, cfg.slow_period)?;
            let distance = signed.abs();

            let accepted = match (direction, p.kind) {
                (TrendDirection::Upward, PointKind::High) if signed > 0.0 => true,
                (TrendDirection::Downward, PointKind::Low) if signed < 0.0 => true,
                (TrendDirection::Upward, PointKind::Low)
                | (TrendDirection::Downward, PointKind::High) => {
                    let near = cfg.near_threshold / cfg.counter_trend_relaxation;
                    distance >= near && distance <= cfg.far_threshold
                }
                _ => distance >= cfg.near_threshold && distance <= cfg.far_threshold,
            };
            accepted.then_some((*p, distance))
        })
        .collect()
}

/// Drop the weaker of two accepted points closer than `min_gap` bars,
/// regardless of kind. Strength is the distance from the slow average.
fn enforce_min_gap(accepted: Vec<(WavePoint, f64)>, min_gap: usize) -> Vec<WavePoint> {
    accepted
        .into_iter()
        .fold(Vec::<(WavePoint, f64)>::new(), |mut acc, (point, strength)| {
            match acc.last() {
                Some((last, last_strength))
                    if bar_gap(last, &point) < min_gap =>
                {
                    if strength > *last_strength {
                        acc.pop();
                        acc.push((point, strength));
                    }
                }
                _ => acc.push((point, strength)),
            }
            acc
        })
        .into_iter()
        .map(|(p, _)| p)
        .collect()
}

fn bar_gap(a: &WavePoint, b: &WavePoint) -> usize {
    match (a.source_index, b.source_index) {
        (Some(i), Some(j)) => j.abs_diff(i),
        _ => usize::MAX,
    }
}

/// Scan same-kind points in time order, extending a run while each new point
/// preserves the run's up/down direction; emit a line once a run reaches the
/// minimum length.
fn build_trend_lines(points: &[WavePoint], min_points: usize) -> Vec<TrendLine> {
    let mut lines = Vec::new();
    if points.len() < min_points {
        return lines;
    }

    let mut run: Vec<WavePoint> = vec![points[0]];
    let mut run_up: Option<bool> = None;

    for &point in &points[1..] {
        let last = run.last().unwrap();
        let step_up = point.price > last.price;
        match run_up {
            Some(up) if up != step_up => {
                emit_line(&run, min_points, &mut lines);
                run = vec![*last, point];
                run_up = Some(step_up);
            }
            _ => {
                run_up = Some(step_up);
                run.push(point);
            }
        }
    }
    emit_line(&run, min_points, &mut lines);
    lines
}

fn emit_line(run: &[WavePoint], min_points: usize, out: &mut Vec<TrendLine>) {
    if run.len() < min_points {
        return;
    }
    let (Some(start_index), Some(end_index)) = (run[0].source_index, run[run.len() - 1].source_index)
    else {
        return;
    };
    if end_index == start_index {
        return;
    }
    let xs: Vec<f64> = run.iter().filter_map(|p| p.source_index).map(|i| i as f64).collect();
    let ys: Vec<f64> = run.iter().map(|p| p.price).collect();
    let Some((slope, intercept)) = linear_regression(&xs, &ys) else {
        return;
    };
    out.push(TrendLine {
        start_index,
        end_index,
        start_value: run[0].price,
        end_value: run[run.len() - 1].price,
        slope,
        strength: r_squared(&xs, &ys, slope, intercept),
        kind: run[0].kind,
    });
}

/// Illustrative near-average path: pivots of either kind whose distance from
/// the slow average falls in the looser skeleton band.
fn smooth_skeleton(
    pivots: &[WavePoint],
    averages: &MovingAverageSet,
    cfg: &TrendConfig,
) -> Vec<WavePoint> {
    pivots
        .iter()
        .filter(|p| {
            relative_distance(p, averages, cfg.slow_period)
                .map(|d| d.abs() >= cfg.skeleton_near && d.abs() <= cfg.skeleton_far)
                .unwrap_or(false)
        })
        .copied()
        .collect()
}

/// Moving-average-style curve over the filtered set: each point becomes the
/// trailing-window mean blended toward its raw price.
fn overview_curve(points: &[WavePoint], window: usize, blend: f64) -> Vec<WavePoint> {
    if points.is_empty() || window == 0 {
        return Vec::new();
    }
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let start = (i + 1).saturating_sub(window);
            let slice = &points[start..=i];
            let mean = slice.iter().map(|q| q.price).sum::<f64>() / slice.len() as f64;
            WavePoint::new(
                p.timestamp,
                mean * (1.0 - blend) + p.price * blend,
                p.kind,
                p.source_index,
            )
        })
        .collect()
}
