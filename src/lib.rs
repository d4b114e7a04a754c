//! Wave-point analysis pipeline for OHLC bar series: zigzag extraction,
//! manual-override correction, robust denoising, trend filtering, composite
//! significance scoring, and curve generation. Pure in-process data
//! transformation; persistence and rendering live in the host application.

pub mod config;
pub mod core;
pub mod filters;
pub mod models;
pub mod pipeline;
#[cfg(test)]
pub mod test_helpers;

pub use crate::config::PipelineConfig;
pub use crate::core::trend::{TrendAnalysis, TrendDirection, TrendLine};
pub use crate::models::{
    Bar, BarSeries, MovingAverageSet, NamedCurveVariant, OverrideAction, OverrideSet, PointKind,
    WavePoint,
};
pub use crate::pipeline::{BaseFilter, CancelToken, Method, MethodParseError, Pipeline, Shaping};
