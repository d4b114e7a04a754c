use chrono::{DateTime, Duration, Utc};

use crate::models::{Bar, BarSeries, PointKind, WavePoint};

fn base_timestamp() -> i64 {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
        .timestamp()
}

/// Create bars from (open, high, low, close) tuples with auto-incrementing
/// one-minute timestamps.
pub fn make_bars(data: &[(f64, f64, f64, f64)]) -> BarSeries {
    let base = base_timestamp();
    let bars: Vec<Bar> = data
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Bar {
            timestamp: base + Duration::minutes(i as i64).num_seconds(),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 100.0,
        })
        .collect();
    BarSeries::new(bars)
}

/// n bars rising by `step` per bar from `start`.
pub fn make_rising_bars(n: usize, start: f64, step: f64) -> BarSeries {
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let v = start + i as f64 * step;
            (v, v + 1.0, v - 1.0, v + step * 0.8)
        })
        .collect();
    make_bars(&data)
}

/// n bars tracing a sinusoid of the given period around `center`.
pub fn make_sine_bars(n: usize, period: f64, center: f64, amplitude: f64) -> BarSeries {
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let v = center + amplitude * (2.0 * std::f64::consts::PI * i as f64 / period).sin();
            (v, v + 0.5, v - 0.5, v)
        })
        .collect();
    make_bars(&data)
}

/// Wave points from (timestamp, price) pairs, alternating High/Low kinds and
/// carrying sequential source indices.
pub fn wave_points(data: &[(i64, f64)]) -> Vec<WavePoint> {
    data.iter()
        .enumerate()
        .map(|(i, &(t, p))| {
            let kind = if i % 2 == 0 { PointKind::High } else { PointKind::Low };
            WavePoint::new(t, p, kind, Some(i))
        })
        .collect()
}

/// n wave points on a sinusoid, timestamps 10 units apart; kind follows the
/// point's side of the center line.
pub fn sine_wave_points(n: usize, period: f64, center: f64, amplitude: f64) -> Vec<WavePoint> {
    (0..n)
        .map(|i| {
            let price =
                center + amplitude * (2.0 * std::f64::consts::PI * i as f64 / period).sin();
            let kind = if price >= center { PointKind::High } else { PointKind::Low };
            WavePoint::new(i as i64 * 10, price, kind, Some(i))
        })
        .collect()
}
