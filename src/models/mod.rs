pub mod averages;
pub mod bar;
pub mod point;

pub use averages::MovingAverageSet;
pub use bar::{Bar, BarSeries};
pub use point::{NamedCurveVariant, OverrideAction, OverrideSet, PointKind, WavePoint};
