use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointKind {
    High,
    Low,
    Interpolated,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WavePoint {
    pub timestamp: i64,
    pub price: f64,
    pub kind: PointKind,
    /// Index of the originating bar; absent for purely interpolated points.
    pub source_index: Option<usize>,
}

impl WavePoint {
    pub fn new(timestamp: i64, price: f64, kind: PointKind, source_index: Option<usize>) -> Self {
        Self {
            timestamp,
            price,
            kind,
            source_index,
        }
    }

    /// High and Low points mark real turning points; interpolated points are
    /// gap fillers and never participate in extremity comparisons.
    pub fn is_extreme_kind(&self) -> bool {
        matches!(self.kind, PointKind::High | PointKind::Low)
    }

    /// True when `self` is the more extreme of two same-kind points.
    pub fn more_extreme_than(&self, other: &WavePoint) -> bool {
        match self.kind {
            PointKind::High => self.price > other.price,
            PointKind::Low => self.price < other.price,
            PointKind::Interpolated => false,
        }
    }
}

/// A user correction keyed by bar timestamp. At most one override per
/// timestamp; overrides always win over computed points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverrideAction {
    AddHigh,
    AddLow,
    Removed,
}

/// Timestamp-ordered override records. Owned by the external persistence
/// collaborator and passed in by value on each pipeline run.
pub type OverrideSet = BTreeMap<i64, OverrideAction>;

/// Externally visible output unit: one named rendering of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedCurveVariant {
    pub name: String,
    pub points: Vec<WavePoint>,
}
