use std::collections::HashMap;

use crate::models::BarSeries;

/// Moving-average series keyed by period, each index-aligned with the bar
/// series. `None` marks indices where the window is not yet full (or where
/// the external source had no value). The pipeline consumes at minimum
/// periods 10 and 150.
#[derive(Debug, Clone, Default)]
pub struct MovingAverageSet {
    series: HashMap<usize, Vec<Option<f64>>>,
}

impl MovingAverageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, period: usize, values: Vec<Option<f64>>) {
        self.series.insert(period, values);
    }

    pub fn get(&self, period: usize) -> Option<&[Option<f64>]> {
        self.series.get(&period).map(|v| v.as_slice())
    }

    /// Value at `index` for `period`, flattening both missing-series and
    /// missing-value into `None`. NaN and infinite values are treated as
    /// absent so a corrupt average never poisons a stage.
    pub fn value_at(&self, period: usize, index: usize) -> Option<f64> {
        self.series
            .get(&period)
            .and_then(|v| v.get(index).copied().flatten())
            .filter(|v| v.is_finite())
    }

    /// Reference builder: simple moving averages of the close over each
    /// requested period, rolling-sum windowed. The host application normally
    /// precomputes these; tests and thin collaborators build them here.
    pub fn from_bars_sma(bars: &BarSeries, periods: &[usize]) -> Self {
        let closes = bars.closes();
        let mut set = Self::new();
        for &period in periods {
            if period == 0 {
                continue;
            }
            let mut values: Vec<Option<f64>> = Vec::with_capacity(closes.len());
            let mut sum = 0.0;
            for (i, &close) in closes.iter().enumerate() {
                sum += close;
                if i >= period {
                    sum -= closes[i - period];
                }
                if i + 1 >= period {
                    values.push(Some(sum / period as f64));
                } else {
                    values.push(None);
                }
            }
            set.insert(period, values);
        }
        set
    }
}
