//! Manual override application. User corrections are the final authority:
//! removals delete computed points, additions replace whatever the pipeline
//! derived at the same bar. The output is index-sorted but may locally break
//! High/Low alternation; downstream stages tolerate that.

use crate::models::{BarSeries, OverrideAction, OverrideSet, PointKind, WavePoint};

pub fn apply(points: Vec<WavePoint>, overrides: &OverrideSet, bars: &BarSeries) -> Vec<WavePoint> {
    if overrides.is_empty() {
        return points;
    }

    let mut corrected: Vec<WavePoint> = points
        .into_iter()
        .filter(|p| overrides.get(&p.timestamp) != Some(&OverrideAction::Removed))
        .collect();

    for (&timestamp, &action) in overrides {
        let kind = match action {
            OverrideAction::AddHigh => PointKind::High,
            OverrideAction::AddLow => PointKind::Low,
            OverrideAction::Removed => continue,
        };
        let Some(index) = bars.index_of_timestamp(timestamp) else {
            tracing::debug!(timestamp, "override targets no known bar, skipped");
            continue;
        };
        let bar = &bars[index];
        let price = match kind {
            PointKind::High => bar.high,
            _ => bar.low,
        };
        let replacement = WavePoint::new(timestamp, price, kind, Some(index));

        // The override replaces any computed point at the same bar.
        corrected.retain(|p| p.source_index != Some(index) && p.timestamp != timestamp);
        corrected.push(replacement);
    }

    // Bars are timestamp-ascending, so timestamp order is bar-index order.
    corrected.sort_by_key(|p| p.timestamp);
    corrected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_bars;

    fn sample_bars() -> BarSeries {
        make_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
            (106.0, 112.0, 104.0, 110.0),
            (110.0, 118.0, 108.0, 116.0),
        ])
    }

    #[test]
    fn removed_override_deletes_point() {
        let bars = sample_bars();
        let t1 = bars[1].timestamp;
        let points = vec![
            WavePoint::new(bars[0].timestamp, 105.0, PointKind::High, Some(0)),
            WavePoint::new(t1, 100.0, PointKind::Low, Some(1)),
        ];
        let mut overrides = OverrideSet::new();
        overrides.insert(t1, OverrideAction::Removed);

        let merged = apply(points, &overrides, &bars);
        assert_eq!(merged.len(), 1);
        assert!(merged.iter().all(|p| p.timestamp != t1));
    }

    #[test]
    fn add_high_replaces_point_at_same_bar() {
        let bars = sample_bars();
        let t2 = bars[2].timestamp;
        let points = vec![
            WavePoint::new(bars[0].timestamp, 95.0, PointKind::Low, Some(0)),
            WavePoint::new(t2, 104.0, PointKind::Low, Some(2)),
        ];
        let mut overrides = OverrideSet::new();
        overrides.insert(t2, OverrideAction::AddHigh);

        let merged = apply(points, &overrides, &bars);
        let at_t2: Vec<&WavePoint> = merged.iter().filter(|p| p.timestamp == t2).collect();
        assert_eq!(at_t2.len(), 1);
        assert_eq!(at_t2[0].kind, PointKind::High);
        assert!((at_t2[0].price - bars[2].high).abs() < 1e-9);
    }

    #[test]
    fn add_low_prices_from_bar_low_and_sorts() {
        let bars = sample_bars();
        let points = vec![WavePoint::new(bars[3].timestamp, 118.0, PointKind::High, Some(3))];
        let mut overrides = OverrideSet::new();
        overrides.insert(bars[0].timestamp, OverrideAction::AddLow);

        let merged = apply(points, &overrides, &bars);
        assert_eq!(merged.len(), 2);
        // Sorted by bar index: the added point comes first.
        assert_eq!(merged[0].kind, PointKind::Low);
        assert!((merged[0].price - bars[0].low).abs() < 1e-9);
        assert_eq!(merged[1].kind, PointKind::High);
    }

    #[test]
    fn override_for_unknown_bar_is_skipped() {
        let bars = sample_bars();
        let points = vec![WavePoint::new(bars[0].timestamp, 105.0, PointKind::High, Some(0))];
        let mut overrides = OverrideSet::new();
        overrides.insert(999_999, OverrideAction::AddHigh);

        let merged = apply(points.clone(), &overrides, &bars);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0], points[0]);
    }

    #[test]
    fn empty_override_set_is_identity() {
        let bars = sample_bars();
        let points = vec![
            WavePoint::new(bars[0].timestamp, 105.0, PointKind::High, Some(0)),
            WavePoint::new(bars[1].timestamp, 100.0, PointKind::Low, Some(1)),
        ];
        let merged = apply(points.clone(), &OverrideSet::new(), &bars);
        assert_eq!(merged, points);
    }

    #[test]
    fn overrides_may_break_alternation() {
        // Two consecutive AddHigh corrections produce a same-kind run; the
        // applier must not "fix" user intent.
        let bars = sample_bars();
        let mut overrides = OverrideSet::new();
        overrides.insert(bars[1].timestamp, OverrideAction::AddHigh);
        overrides.insert(bars[2].timestamp, OverrideAction::AddHigh);

        let merged = apply(Vec::new(), &overrides, &bars);
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|p| p.kind == PointKind::High));
    }
}
