//! Pipeline orchestration: compose the extraction, correction, denoising,
//! filtering, and curve-generation stages for one requested method, or
//! enumerate every variant for bulk precomputation. Computing a single
//! variant on demand is the default and the cheap path.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::config::PipelineConfig;
use crate::core::trend::TrendAnalysis;
use crate::core::{curve, denoise, overrides, smooth, trend, zigzag};
use crate::filters;
use crate::models::{BarSeries, MovingAverageSet, NamedCurveVariant, OverrideSet, WavePoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseFilter {
    Trend,
    Continuous,
    Fractal,
    NStructure,
}

impl BaseFilter {
    pub const ALL: [BaseFilter; 4] = [
        BaseFilter::Trend,
        BaseFilter::Continuous,
        BaseFilter::Fractal,
        BaseFilter::NStructure,
    ];

    fn token(self) -> &'static str {
        match self {
            BaseFilter::Trend => "trend",
            BaseFilter::Continuous => "continuous",
            BaseFilter::Fractal => "fractal",
            BaseFilter::NStructure => "nstructure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shaping {
    Chaikin,
    CatmullRom,
    Linear,
    Geometric,
    Statistical,
    Hybrid,
}

impl Shaping {
    pub const ALL: [Shaping; 6] = [
        Shaping::Chaikin,
        Shaping::CatmullRom,
        Shaping::Linear,
        Shaping::Geometric,
        Shaping::Statistical,
        Shaping::Hybrid,
    ];

    fn token(self) -> &'static str {
        match self {
            Shaping::Chaikin => "chaikin",
            Shaping::CatmullRom => "catmullrom",
            Shaping::Linear => "linear",
            Shaping::Geometric => "geometric",
            Shaping::Statistical => "statistical",
            Shaping::Hybrid => "hybrid",
        }
    }
}

/// A fully typed method selection: base filter, optional denoise prefix,
/// optional interpolation/smoothing suffix. Replaces the legacy name-string
/// dispatch; `Display`/`FromStr` keep the dash-joined names stable for
/// callers that persist them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Method {
    pub denoise: bool,
    pub base: BaseFilter,
    pub shaping: Option<Shaping>,
}

impl Method {
    pub fn new(base: BaseFilter) -> Self {
        Self {
            denoise: false,
            base,
            shaping: None,
        }
    }

    pub fn denoised(mut self) -> Self {
        self.denoise = true;
        self
    }

    pub fn shaped(mut self, shaping: Shaping) -> Self {
        self.shaping = Some(shaping);
        self
    }

    /// The full combination table, for bulk precomputation. Denoising feeds
    /// the extracted points, which the trend base ignores, so the flag is
    /// skipped there rather than emitting duplicate variants under two names.
    pub fn all() -> Vec<Method> {
        let mut methods = Vec::new();
        for base in BaseFilter::ALL {
            for denoise in [false, true] {
                if denoise && base == BaseFilter::Trend {
                    continue;
                }
                let stem = Method {
                    denoise,
                    base,
                    shaping: None,
                };
                methods.push(stem);
                for shaping in Shaping::ALL {
                    methods.push(stem.shaped(shaping));
                }
            }
        }
        methods
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denoise {
            write!(f, "denoise-")?;
        }
        write!(f, "{}", self.base.token())?;
        if let Some(shaping) = self.shaping {
            write!(f, "-{}", shaping.token())?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MethodParseError {
    #[error("empty method name")]
    Empty,
    #[error("method `{0}` names no base filter")]
    MissingBase(String),
    #[error("unknown method token `{0}`")]
    UnknownToken(String),
}

impl FromStr for Method {
    type Err = MethodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(MethodParseError::Empty);
        }
        let mut tokens = s.split('-').peekable();

        let denoise = tokens.peek() == Some(&"denoise");
        if denoise {
            tokens.next();
        }

        let base_token = tokens.next().ok_or_else(|| MethodParseError::MissingBase(s.to_string()))?;
        let base = BaseFilter::ALL
            .into_iter()
            .find(|b| b.token() == base_token)
            .ok_or_else(|| MethodParseError::UnknownToken(base_token.to_string()))?;

        let shaping = match tokens.next() {
            None => None,
            Some(token) => Some(
                Shaping::ALL
                    .into_iter()
                    .find(|v| v.token() == token)
                    .ok_or_else(|| MethodParseError::UnknownToken(token.to_string()))?,
            ),
        };

        if let Some(extra) = tokens.next() {
            return Err(MethodParseError::UnknownToken(extra.to_string()));
        }

        Ok(Method {
            denoise,
            base,
            shaping,
        })
    }
}

/// Cooperative cancellation flag, checked between (never within) stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Stateless per-call orchestrator. Every invocation recomputes from the
/// current bars, averages, and override set; nothing is cached across runs.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Compute exactly one variant, building only the stages the method
    /// needs.
    pub fn run_variant(
        &self,
        bars: &BarSeries,
        averages: &MovingAverageSet,
        overrides: &OverrideSet,
        method: Method,
    ) -> NamedCurveVariant {
        self.run_cancelable(bars, averages, overrides, method, &CancelToken::new())
            .expect("fresh token is never cancelled")
    }

    /// As `run_variant`, but bails out between stages once `token` is
    /// cancelled. Meant for callers that run the pipeline off their primary
    /// thread.
    pub fn run_cancelable(
        &self,
        bars: &BarSeries,
        averages: &MovingAverageSet,
        overrides: &OverrideSet,
        method: Method,
        token: &CancelToken,
    ) -> Option<NamedCurveVariant> {
        let cfg = &self.config;
        let name = method.to_string();
        tracing::trace!(method = %name, bars = bars.len(), "pipeline run");

        // The trend base re-derives its pivots from the bars, so the
        // extraction, correction, and denoise stages would be discarded.
        let points = if method.base == BaseFilter::Trend {
            Vec::new()
        } else {
            let extracted = zigzag::extract(bars, averages, &cfg.zigzag);
            if token.is_cancelled() {
                return None;
            }

            let corrected = overrides::apply(extracted, overrides, bars);
            if token.is_cancelled() {
                return None;
            }

            if method.denoise {
                denoise::denoise(corrected, &cfg.denoise)
            } else {
                corrected
            }
        };
        if token.is_cancelled() {
            return None;
        }

        let filtered = self.apply_base(method.base, &points, bars, averages);
        if token.is_cancelled() {
            return None;
        }

        let shaped = self.apply_shaping(method.shaping, &filtered);
        Some(NamedCurveVariant {
            name,
            points: shaped,
        })
    }

    /// Bulk precomputation of the full combination table. Interactive
    /// callers should prefer `run_variant`.
    pub fn run_all_variants(
        &self,
        bars: &BarSeries,
        averages: &MovingAverageSet,
        overrides: &OverrideSet,
    ) -> Vec<NamedCurveVariant> {
        Method::all()
            .into_iter()
            .map(|m| self.run_variant(bars, averages, overrides, m))
            .collect()
    }

    /// The trend stage's full derived bundle, for marker and trend-line
    /// rendering.
    pub fn trend_analysis(&self, bars: &BarSeries, averages: &MovingAverageSet) -> TrendAnalysis {
        trend::analyze(bars, averages, &self.config.trend)
    }

    fn apply_base(
        &self,
        base: BaseFilter,
        points: &[WavePoint],
        bars: &BarSeries,
        averages: &MovingAverageSet,
    ) -> Vec<WavePoint> {
        let cfg = &self.config;
        match base {
            BaseFilter::Trend => {
                let analysis = trend::analyze(bars, averages, &cfg.trend);
                let mut combined = analysis.highs;
                combined.extend(analysis.lows);
                combined.sort_by_key(|p| p.timestamp);
                combined
            }
            BaseFilter::Continuous => {
                filters::continuous::filter(points, averages, cfg.trend.slow_period, &cfg.significance)
            }
            BaseFilter::Fractal => {
                filters::fractal::filter(points, averages, cfg.trend.slow_period, &cfg.significance)
            }
            BaseFilter::NStructure => {
                filters::nstructure::filter(points, averages, cfg.trend.slow_period, &cfg.significance)
            }
        }
    }

    fn apply_shaping(&self, shaping: Option<Shaping>, points: &[WavePoint]) -> Vec<WavePoint> {
        let cfg = &self.config.curve;
        match shaping {
            None => points.to_vec(),
            Some(Shaping::Chaikin) => curve::corner_cut(points, cfg.subdivision_iterations),
            Some(Shaping::CatmullRom) => curve::catmull_rom(points, cfg.segments_per_interval),
            Some(Shaping::Linear) => curve::linear_subdivide(points, cfg.segments_per_interval),
            Some(Shaping::Geometric) => smooth::geometric(points),
            Some(Shaping::Statistical) => smooth::statistical(points, cfg.smoothing_window),
            Some(Shaping::Hybrid) => {
                smooth::hybrid(points, cfg.smoothing_window, cfg.hybrid_geometric_weight)
            }
        }
    }
}
