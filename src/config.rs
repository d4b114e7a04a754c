use serde::{Deserialize, Serialize};

/// Zigzag extraction (§ fast-average runs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZigzagConfig {
    /// Fast moving-average period the runs are measured against.
    pub fast_period: usize,
    /// Minimum consecutive bars on one side of the average to form a run.
    pub min_run_length: usize,
}

impl Default for ZigzagConfig {
    fn default() -> Self {
        Self {
            fast_period: 10,
            min_run_length: 3,
        }
    }
}

/// Denoising engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenoiseConfig {
    /// Below this many input points the stage is a pass-through.
    pub window_size: usize,
    /// Residuals beyond `mad_multiplier × MAD` mark significant points.
    pub mad_multiplier: f64,
    /// Local-regression bandwidth as a fraction of the candidate time span.
    pub bandwidth_fraction: f64,
    /// Gaps wider than this many time units get interpolated fill points.
    pub max_gap: i64,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            window_size: 6,
            mad_multiplier: 2.5,
            bandwidth_fraction: 0.3,
            max_gap: 1_000,
        }
    }
}

/// Trend filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendConfig {
    /// Slow moving-average period the trend is read from.
    pub slow_period: usize,
    /// Number of recent average values the direction regression covers.
    pub regression_window: usize,
    /// Slope magnitude (per step) below which the trend is Horizontal.
    pub slope_threshold: f64,
    /// Symmetric look-back/look-ahead window for pivot detection.
    pub pivot_window: usize,
    /// Accepted relative-distance band from the slow average.
    pub near_threshold: f64,
    pub far_threshold: f64,
    /// Counter-trend near bound is widened by this factor.
    pub counter_trend_relaxation: f64,
    /// Minimum bar gap between consecutive accepted points.
    pub min_bar_gap: usize,
    /// Looser distance band for the smooth-trend skeleton.
    pub skeleton_near: f64,
    pub skeleton_far: f64,
    /// Overview curve: sliding window and blend toward the raw value.
    pub overview_window: usize,
    pub overview_blend: f64,
    /// Minimum run length before a trend line is emitted.
    pub min_line_points: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            slow_period: 150,
            regression_window: 10,
            slope_threshold: 0.001,
            pivot_window: 5,
            near_threshold: 0.005,
            far_threshold: 0.015,
            counter_trend_relaxation: 1.5,
            min_bar_gap: 3,
            skeleton_near: 0.001,
            skeleton_far: 0.02,
            overview_window: 20,
            overview_blend: 0.3,
            min_line_points: 3,
        }
    }
}

/// Shared post-processing of the composite significance strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignificanceConfig {
    /// Exponential smoothing factor over the raw weight sequence.
    pub smoothing_alpha: f64,
    /// Points below this smoothed weight are dropped.
    pub min_weight: f64,
    /// Retained prices move toward the average by `(1-weight) × shrink_factor`.
    pub shrink_factor: f64,
    /// Fractal strategy: number of geometric box-counting scales.
    pub box_scales: usize,
    /// Fractal strategy: keep points above this fraction of max importance.
    pub importance_cutoff: f64,
    /// Fractal strategy: smallest sub-segment the recursion descends to.
    pub min_segment: usize,
    /// N-structure: amplitude cap as a multiple of the local median amplitude.
    pub max_amplitude_ratio: f64,
    /// N-structure: gap cap as a multiple of the local average period.
    pub max_gap_ratio: f64,
}

impl Default for SignificanceConfig {
    fn default() -> Self {
        Self {
            smoothing_alpha: 0.3,
            min_weight: 0.3,
            shrink_factor: 0.7,
            box_scales: 5,
            importance_cutoff: 0.3,
            min_segment: 4,
            max_amplitude_ratio: 3.0,
            max_gap_ratio: 3.0,
        }
    }
}

/// Curve generation and smoothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveConfig {
    /// Corner-cutting subdivision iterations.
    pub subdivision_iterations: usize,
    /// Samples emitted per original segment (spline and linear modes).
    pub segments_per_interval: usize,
    /// Statistical smoothing sliding-window size.
    pub smoothing_window: usize,
    /// Hybrid smoothing: weight of the geometric output (rest is statistical).
    pub hybrid_geometric_weight: f64,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            subdivision_iterations: 2,
            segments_per_interval: 8,
            smoothing_window: 5,
            hybrid_geometric_weight: 0.6,
        }
    }
}

/// All pipeline parameters, grouped per stage. Every constant named in the
/// analysis design has a slot here so the host application can tune without
/// touching stage code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub zigzag: ZigzagConfig,
    pub denoise: DenoiseConfig,
    pub trend: TrendConfig,
    pub significance: SignificanceConfig,
    pub curve: CurveConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_design_constants() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.zigzag.fast_period, 10);
        assert_eq!(cfg.zigzag.min_run_length, 3);
        assert_eq!(cfg.denoise.window_size, 6);
        assert!((cfg.denoise.mad_multiplier - 2.5).abs() < 1e-9);
        assert_eq!(cfg.trend.slow_period, 150);
        assert!((cfg.trend.near_threshold - 0.005).abs() < 1e-9);
        assert!((cfg.significance.smoothing_alpha - 0.3).abs() < 1e-9);
        assert!((cfg.significance.shrink_factor - 0.7).abs() < 1e-9);
        assert_eq!(cfg.curve.smoothing_window, 5);
    }

    #[test]
    fn config_round_trips_through_serde() {
        let cfg = PipelineConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.trend.slow_period, cfg.trend.slow_period);
        assert_eq!(back.curve.segments_per_interval, cfg.curve.segments_per_interval);
    }
}
