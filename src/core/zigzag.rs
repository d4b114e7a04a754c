//! Zigzag extraction: alternating local extrema measured against a fast
//! moving average. A run of bars entirely above the average yields one High
//! candidate (the bar with the maximum high), a run below yields one Low
//! candidate; candidates are folded into a strictly alternating sequence.

use crate::config::ZigzagConfig;
use crate::models::{BarSeries, MovingAverageSet, PointKind, WavePoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunSide {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy)]
struct Run {
    side: RunSide,
    length: usize,
    /// Index of the most extreme bar seen so far within the run.
    extreme_index: usize,
}

pub fn extract(bars: &BarSeries, averages: &MovingAverageSet, cfg: &ZigzagConfig) -> Vec<WavePoint> {
    if bars.is_empty() {
        return Vec::new();
    }
    if averages.get(cfg.fast_period).is_none() {
        tracing::debug!(period = cfg.fast_period, "fast average missing, no zigzag");
        return Vec::new();
    }

    let mut candidates: Vec<WavePoint> = Vec::new();
    let mut run: Option<Run> = None;

    for (i, bar) in bars.iter().enumerate() {
        // A bar without an average value can belong to no run.
        let side = match averages.value_at(cfg.fast_period, i) {
            Some(ma) if bar.low > ma => Some(RunSide::Above),
            Some(ma) if bar.high < ma => Some(RunSide::Below),
            _ => None,
        };

        run = match (run, side) {
            (Some(mut current), Some(side)) if current.side == side => {
                let extreme = &bars[current.extreme_index];
                let replaces = match side {
                    RunSide::Above => bar.high > extreme.high,
                    RunSide::Below => bar.low < extreme.low,
                };
                if replaces {
                    current.extreme_index = i;
                }
                current.length += 1;
                Some(current)
            }
            (current, side) => {
                flush_run(current, bars, cfg, &mut candidates);
                side.map(|side| Run {
                    side,
                    length: 1,
                    extreme_index: i,
                })
            }
        };
    }
    flush_run(run, bars, cfg, &mut candidates);

    merge_alternating(candidates)
}

fn flush_run(run: Option<Run>, bars: &BarSeries, cfg: &ZigzagConfig, out: &mut Vec<WavePoint>) {
    let Some(run) = run else { return };
    if run.length < cfg.min_run_length {
        return;
    }
    let bar = &bars[run.extreme_index];
    let point = match run.side {
        RunSide::Above => WavePoint::new(bar.timestamp, bar.high, PointKind::High, Some(run.extreme_index)),
        RunSide::Below => WavePoint::new(bar.timestamp, bar.low, PointKind::Low, Some(run.extreme_index)),
    };
    out.push(point);
}

/// Fold index-ordered candidates into a strict alternating sequence. When
/// two same-kind points collide, the more extreme one survives.
pub fn merge_alternating(points: Vec<WavePoint>) -> Vec<WavePoint> {
    points.into_iter().fold(Vec::new(), |mut acc, point| {
        match acc.last() {
            Some(last) if last.kind == point.kind => {
                if point.more_extreme_than(last) {
                    acc.pop();
                    acc.push(point);
                }
            }
            _ => acc.push(point),
        }
        acc
    })
}
