use crate::{
    error::PipelineError,
    signal::{BeatTable, IntervalRow, IntervalTable},
};
use log::{info, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    /// Intervals longer than this (ms) are treated as signal loss.
    pub max_rr_ms: f64,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self { max_rr_ms: 2000.0 }
    }
}

/// Pair every beat with its successor and derive rr, |Δrr| and Δrr².
///
/// Implausible intervals are replaced by linear interpolation along the beat
/// index before the differences are taken. The last row has no successor and
/// carries no values.
pub fn compute_intervals(beats: &BeatTable, fs: f64, cfg: &IntervalConfig) -> IntervalTable {
    if beats.len() < 2 {
        warn!(
            "{}",
            PipelineError::InsufficientBeats {
                found: beats.len()
            }
        );
        return IntervalTable::default();
    }
    if !(fs > 0.0) {
        warn!("invalid sampling rate {}", fs);
        return IntervalTable::default();
    }

    let positions = beats.positions();
    let mut rr: Vec<Option<f64>> = positions
        .windows(2)
        .map(|w| Some((w[1] - w[0]) as f64 * 1000.0 / fs))
        .collect();

    let mut rejected = 0;
    for value in rr.iter_mut() {
        if value.is_some_and(|ms| ms > cfg.max_rr_ms) {
            *value = None;
            rejected += 1;
        }
    }
    if rejected > 0 {
        warn!(
            "{} rr interval(s) above {} ms replaced by interpolation",
            rejected, cfg.max_rr_ms
        );
    }

    let Some(rr) = fill_gaps(&rr) else {
        warn!("no plausible rr interval left");
        return IntervalTable::default();
    };

    let rows = positions
        .iter()
        .enumerate()
        .map(|(i, &p_loc)| {
            let delta = match (rr.get(i), rr.get(i + 1)) {
                (Some(a), Some(b)) => Some(b - a),
                _ => None,
            };
            IntervalRow {
                p_loc,
                rr: rr.get(i).copied(),
                rr_diff: delta.map(f64::abs),
                rr_sq_diff: delta.map(|d| d * d),
            }
        })
        .collect();
    info!("computed {} rr intervals", rr.len());
    IntervalTable { rows }
}

/// Linear interpolation over the row index. Gaps touching either end take the
/// nearest defined value. `None` when nothing is defined.
fn fill_gaps(values: &[Option<f64>]) -> Option<Vec<f64>> {
    let known: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();
    let (&(first_idx, first_val), &(last_idx, last_val)) = (known.first()?, known.last()?);

    let mut out = Vec::with_capacity(values.len());
    let mut segment = 0;
    for i in 0..values.len() {
        let value = if i <= first_idx {
            first_val
        } else if i >= last_idx {
            last_val
        } else {
            while known[segment + 1].0 < i {
                segment += 1;
            }
            let (x0, y0) = known[segment];
            let (x1, y1) = known[segment + 1];
            if i == x1 {
                y1
            } else {
                y0 + (y1 - y0) * (i - x0) as f64 / (x1 - x0) as f64
            }
        };
        out.push(value);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::beats_at;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn regular_beats_give_one_second_intervals() {
        let table = compute_intervals(
            &beats_at(&[300, 600, 900, 1200]),
            300.0,
            &IntervalConfig::default(),
        );
        assert_eq!(table.len(), 4);
        assert_eq!(table.rr_values().len(), 3);
        for row in &table.rows[..3] {
            assert!(close(row.rr.unwrap(), 1000.0));
        }
        assert_eq!(table.rows[3].rr, None);
        assert_eq!(table.rows[1].rr_diff, Some(0.0));
        assert_eq!(table.rows[2].rr_diff, None);
        assert_eq!(table.rows[3].rr_sq_diff, None);
    }

    #[test]
    fn long_interval_is_replaced_by_neighbour_interpolation() {
        // 900 ms, 2500 ms (artifact), 1100 ms, 1000 ms
        let table = compute_intervals(
            &beats_at(&[300, 570, 1320, 1650, 1950]),
            300.0,
            &IntervalConfig::default(),
        );
        let rr: Vec<f64> = table.rr_values();
        assert_eq!(rr.len(), 4);
        assert!(close(rr[0], 900.0));
        assert!(close(rr[1], 1000.0));
        assert!(close(rr[2], 1100.0));
        assert!(close(rr[3], 1000.0));
        assert!(close(table.rows[0].rr_diff.unwrap(), 100.0));
        assert!(close(table.rows[1].rr_diff.unwrap(), 100.0));
        assert!(close(table.rows[1].rr_sq_diff.unwrap(), 10_000.0));
        assert!(close(table.rows[2].rr_diff.unwrap(), 100.0));
    }

    #[test]
    fn threshold_is_strictly_greater_than() {
        let fs = 1_000_000.0;
        // 1000 ms, 2000 ms, 1000 ms
        let kept = compute_intervals(
            &beats_at(&[0, 1_000_000, 3_000_000, 4_000_000]),
            fs,
            &IntervalConfig::default(),
        );
        assert_eq!(kept.rows[1].rr, Some(2000.0));

        // 1000 ms, 2000.001 ms, 1000 ms
        let replaced = compute_intervals(
            &beats_at(&[0, 1_000_000, 3_000_001, 4_000_001]),
            fs,
            &IntervalConfig::default(),
        );
        assert!(close(replaced.rows[1].rr.unwrap(), 1000.0));
    }

    #[test]
    fn edge_artifacts_take_nearest_value() {
        // 2500 ms, 1000 ms, 1200 ms, 3000 ms
        let table = compute_intervals(
            &beats_at(&[0, 750, 1050, 1410, 2310]),
            300.0,
            &IntervalConfig::default(),
        );
        let rr = table.rr_values();
        assert!(close(rr[0], 1000.0));
        assert!(close(rr[3], 1200.0));
    }

    #[test]
    fn outputs_are_finite_and_non_negative() {
        let positions = [10, 250, 600, 900, 1700, 1950, 2500, 2600];
        let table = compute_intervals(&beats_at(&positions), 300.0, &IntervalConfig::default());
        for row in &table.rows[..positions.len() - 1] {
            let rr = row.rr.unwrap();
            assert!(rr.is_finite() && rr >= 0.0);
        }
        for row in table.rows.iter().filter_map(|r| r.rr_diff) {
            assert!(row.is_finite() && row >= 0.0);
        }
    }

    #[test]
    fn fewer_than_two_beats_is_empty() {
        let cfg = IntervalConfig::default();
        assert!(compute_intervals(&beats_at(&[300]), 300.0, &cfg).is_empty());
        assert!(compute_intervals(&BeatTable::default(), 300.0, &cfg).is_empty());
    }

    #[test]
    fn all_implausible_is_empty() {
        let table = compute_intervals(&beats_at(&[0, 900, 1800]), 300.0, &IntervalConfig::default());
        assert!(table.is_empty());
    }

    #[test]
    fn configurable_threshold() {
        let cfg = IntervalConfig { max_rr_ms: 3500.0 };
        let table = compute_intervals(&beats_at(&[300, 570, 1320, 1650]), 300.0, &cfg);
        assert!(close(table.rows[1].rr.unwrap(), 2500.0));
    }
}
