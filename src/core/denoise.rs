//! Denoising: suppress local extrema that do not correspond to structurally
//! significant turning points. A reference curve is fitted to candidate
//! extrema, residuals are scored against the median absolute deviation, and
//! only robust outliers (the genuine turning points) survive. Large time
//! gaps between survivors are filled with interpolated points.

use crate::config::DenoiseConfig;
use crate::core::stats::{mad, FittedCurve};
use crate::models::{PointKind, WavePoint};

pub fn denoise(points: Vec<WavePoint>, cfg: &DenoiseConfig) -> Vec<WavePoint> {
    if points.len() < cfg.window_size {
        tracing::debug!(len = points.len(), min = cfg.window_size, "too few points, denoise pass-through");
        return points;
    }

    let candidates = neighbor_extrema(&points);
    if candidates.len() < 3 {
        tracing::debug!(candidates = candidates.len(), "too few candidates, denoise pass-through");
        return points;
    }

    let Some(significant) = significant_points(&candidates, cfg.mad_multiplier, cfg) else {
        // Singular fit or non-finite residuals: degrade to the input.
        tracing::debug!("reference fit failed, denoise pass-through");
        return points;
    };

    fill_gaps(significant, cfg.max_gap)
}

/// Points strictly more extreme than both immediate neighbors in price,
/// re-validated independently of the extractor's own candidates.
fn neighbor_extrema(points: &[WavePoint]) -> Vec<WavePoint> {
    points
        .windows(3)
        .filter_map(|w| {
            let (prev, mid, next) = (&w[0], &w[1], &w[2]);
            let local_max = mid.price > prev.price && mid.price > next.price;
            let local_min = mid.price < prev.price && mid.price < next.price;
            (local_max || local_min).then_some(*mid)
        })
        .collect()
}

/// Fit both reference curves, keep the lower-RMSE one, and return the
/// candidates whose residual exceeds `multiplier × MAD`. `None` on any
/// numeric failure.
fn significant_points(
    candidates: &[WavePoint],
    multiplier: f64,
    cfg: &DenoiseConfig,
) -> Option<Vec<WavePoint>> {
    let x0 = candidates.first()?.timestamp as f64;
    let xs: Vec<f64> = candidates.iter().map(|p| p.timestamp as f64 - x0).collect();
    let ys: Vec<f64> = candidates.iter().map(|p| p.price).collect();
    if ys.iter().any(|y| !y.is_finite()) {
        return None;
    }

    let polynomial = FittedCurve::fit_polynomial(&xs, &ys, 2);
    let local = FittedCurve::fit_local(&xs, &ys, cfg.bandwidth_fraction);
    let curve = match (polynomial, local) {
        (Some(p), Some(l)) => {
            if p.rmse(&xs, &ys) <= l.rmse(&xs, &ys) {
                p
            } else {
                l
            }
        }
        (Some(p), None) => p,
        (None, Some(l)) => l,
        (None, None) => return None,
    };

    let residuals: Vec<f64> = xs
        .iter()
        .zip(&ys)
        .map(|(x, y)| (y - curve.eval(*x)).abs())
        .collect();
    if residuals.iter().any(|r| !r.is_finite()) {
        return None;
    }
    let spread = mad(&residuals)?;
    let threshold = multiplier * spread;

    let mut kept: Vec<WavePoint> = candidates
        .iter()
        .zip(&residuals)
        .filter(|(_, &r)| r > threshold)
        .map(|(p, _)| *p)
        .collect();
    kept.sort_by_key(|p| p.timestamp);
    Some(kept)
}

/// Insert evenly spaced interpolated points wherever two consecutive kept
/// points are farther apart than `max_gap` time units, so downstream
/// consumers never see an unbounded gap.
fn fill_gaps(points: Vec<WavePoint>, max_gap: i64) -> Vec<WavePoint> {
    if max_gap <= 0 || points.len() < 2 {
        return points;
    }
    let mut filled: Vec<WavePoint> = Vec::with_capacity(points.len());
    for pair in points.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        filled.push(*a);
        let gap = b.timestamp - a.timestamp;
        if gap > max_gap {
            let inserts = ((gap - 1) / max_gap) as usize;
            for k in 1..=inserts {
                let t = k as f64 / (inserts + 1) as f64;
                filled.push(WavePoint::new(
                    a.timestamp + (gap as f64 * t).round() as i64,
                    a.price + (b.price - a.price) * t,
                    PointKind::Interpolated,
                    None,
                ));
            }
        }
    }
    if let Some(last) = points.last() {
        filled.push(*last);
    }
    filled
}
