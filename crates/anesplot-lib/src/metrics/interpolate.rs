use crate::{
    error::PipelineError,
    signal::{IntervalRow, IntervalTable, InterpolatedRow, InterpolatedSeries},
};
use log::{info, warn};

/// Resample the beat-indexed intervals onto every sample position between the
/// first and the last beat (both included).
///
/// Values are piecewise linear between beats. The last beat has no interval of
/// its own and holds the last defined value, so nothing is extrapolated.
pub fn interpolate_intervals(intervals: &IntervalTable) -> InterpolatedSeries {
    let defined = intervals.rows.iter().filter(|row| row.rr.is_some()).count();
    let (Some(first), Some(last)) = (intervals.rows.first(), intervals.rows.last()) else {
        warn!("{}", PipelineError::InsufficientBeats { found: 0 });
        return InterpolatedSeries::default();
    };
    if intervals.len() < 2 || defined == 0 {
        warn!(
            "{}",
            PipelineError::InsufficientBeats {
                found: intervals.len()
            }
        );
        return InterpolatedSeries::default();
    }
    let (first, last) = (first.p_loc, last.p_loc);

    let rr = resample(&knots(&intervals.rows, last, |row| row.rr), first, last);
    let rr_diff = resample(&knots(&intervals.rows, last, |row| row.rr_diff), first, last);
    let rr_sq_diff = resample(
        &knots(&intervals.rows, last, |row| row.rr_sq_diff),
        first,
        last,
    );

    let rows: Vec<InterpolatedRow> = (first..=last)
        .zip(rr)
        .zip(rr_diff.into_iter().zip(rr_sq_diff))
        .filter_map(|((point, rr), (rr_diff, rr_sq_diff))| {
            rr.map(|rr| InterpolatedRow {
                point,
                rr,
                rr_diff,
                rr_sq_diff,
            })
        })
        .collect();
    info!("interpolated rr over {} samples ({}..={})", rows.len(), first, last);
    InterpolatedSeries { rows }
}

fn knots(
    rows: &[IntervalRow],
    last: usize,
    column: impl Fn(&IntervalRow) -> Option<f64>,
) -> Vec<(usize, f64)> {
    let mut knots: Vec<(usize, f64)> = rows
        .iter()
        .filter_map(|row| column(row).map(|value| (row.p_loc, value)))
        .collect();
    if let Some(&(pos, value)) = knots.last() {
        if pos < last {
            knots.push((last, value));
        }
    }
    knots
}

/// Evaluate the polyline through `knots` at every point of `first..=last`.
fn resample(knots: &[(usize, f64)], first: usize, last: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(last - first + 1);
    let mut segment = 0;
    for point in first..=last {
        let Some(&(start, _)) = knots.first() else {
            out.push(None);
            continue;
        };
        if point < start {
            out.push(None);
            continue;
        }
        while segment + 1 < knots.len() && knots[segment + 1].0 <= point {
            segment += 1;
        }
        let (x0, y0) = knots[segment];
        let value = match knots.get(segment + 1) {
            _ if point == x0 => Some(y0),
            Some(&(x1, y1)) => Some(y0 + (y1 - y0) * (point - x0) as f64 / (x1 - x0) as f64),
            None => None,
        };
        out.push(value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metrics::intervals::{compute_intervals, IntervalConfig},
        testutil::beats_at,
    };

    fn series_for(positions: &[usize]) -> (IntervalTable, InterpolatedSeries) {
        let intervals = compute_intervals(&beats_at(positions), 300.0, &IntervalConfig::default());
        let series = interpolate_intervals(&intervals);
        (intervals, series)
    }

    #[test]
    fn regular_beats_span_first_to_last_beat() {
        let (_, series) = series_for(&[300, 600, 900, 1200]);
        assert_eq!(series.len(), 901);
        assert_eq!(series.first_point(), Some(300));
        assert_eq!(series.last_point(), Some(1200));
        for row in &series.rows {
            assert!((row.rr - 1000.0).abs() < 1e-9);
            assert_eq!(row.rr_diff, Some(0.0));
        }
    }

    #[test]
    fn index_is_gapless_and_monotonic() {
        let (_, series) = series_for(&[100, 380, 700, 950, 1300]);
        for pair in series.rows.windows(2) {
            assert_eq!(pair[1].point, pair[0].point + 1);
        }
    }

    #[test]
    fn beat_positions_reproduce_interval_values() {
        let (intervals, series) = series_for(&[100, 380, 700, 950, 1300, 1520]);
        for row in &intervals.rows {
            let Some(rr) = row.rr else { continue };
            let at = series.at(row.p_loc).unwrap();
            assert!((at.rr - rr).abs() < 1e-9);
            if let Some(diff) = row.rr_diff {
                assert!((at.rr_diff.unwrap() - diff).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn values_between_beats_are_linear() {
        // 1000 ms then 1200 ms
        let (_, series) = series_for(&[0, 300, 660]);
        let mid = series.at(150).unwrap();
        assert!((mid.rr - 1100.0).abs() < 1e-9);
        assert!((series.at(660).unwrap().rr - 1200.0).abs() < 1e-9);
        assert!((series.at(500).unwrap().rr - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn two_beats_leave_differences_undefined() {
        let (_, series) = series_for(&[300, 600]);
        assert_eq!(series.len(), 301);
        assert!(series.rows.iter().all(|row| row.rr_diff.is_none()));
    }

    #[test]
    fn one_beat_gives_empty_series() {
        let (intervals, series) = series_for(&[300]);
        assert!(intervals.is_empty());
        assert!(series.is_empty());
        assert!(interpolate_intervals(&IntervalTable::default()).is_empty());
    }
}
