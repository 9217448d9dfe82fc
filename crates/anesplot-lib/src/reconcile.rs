//! Putting the ekg-derived heart rate back next to the monitor's own values.

use crate::{
    plot::{decimate_points, Axis, Color, Figure, LineSeries, Panel, Series, Style, MAX_TRACE_POINTS},
    records::{TrendTable, WaveTable},
    signal::InterpolatedSeries,
};
use chrono::{Duration, NaiveDateTime};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Width of the averaging bins used to feed the trend table (s).
    pub bin_s: f64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self { bin_s: 5.0 }
    }
}

/// Mean heart rate over one time bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateBin {
    pub start: NaiveDateTime,
    pub hr: f64,
}

/// Tables returned by [`merge_back`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub trend: TrendTable,
    pub wave: WaveTable,
    pub bins: Vec<RateBin>,
}

/// `(point, bpm)` for every interpolated row.
pub fn instantaneous_rate(series: &InterpolatedSeries) -> Vec<(usize, f64)> {
    series
        .rows
        .iter()
        .filter_map(|row| row.rate().map(|hr| (row.point, hr)))
        .collect()
}

fn bin_millis(bin_s: f64) -> i64 {
    ((bin_s * 1000.0).round() as i64).max(1)
}

fn epoch_millis(ts: NaiveDateTime) -> i64 {
    (ts - NaiveDateTime::default()).num_milliseconds()
}

/// Average the instantaneous rate into `bin_s`-second bins aligned on
/// multiples of `bin_s` (wave timestamps).
pub fn resample_rate(series: &InterpolatedSeries, wave: &WaveTable, bin_s: f64) -> Vec<RateBin> {
    let width = bin_millis(bin_s);
    let mut bins: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for (point, hr) in instantaneous_rate(series) {
        let key = epoch_millis(wave.timestamp(point)).div_euclid(width);
        let entry = bins.entry(key).or_insert((0.0, 0));
        entry.0 += hr;
        entry.1 += 1;
    }
    bins.into_iter()
        .map(|(key, (sum, count))| RateBin {
            start: NaiveDateTime::default() + Duration::milliseconds(key * width),
            hr: sum / count as f64,
        })
        .collect()
}

/// Copy of `trend` whose `hr` takes the bin mean wherever a bin covers the row.
pub fn splice_trend_hr(trend: &TrendTable, bins: &[RateBin], bin_s: f64) -> TrendTable {
    let width = bin_millis(bin_s);
    let by_key: BTreeMap<i64, f64> = bins
        .iter()
        .map(|bin| (epoch_millis(bin.start).div_euclid(width), bin.hr))
        .collect();
    let mut out = trend.clone();
    let mut spliced = 0;
    for (ts, hr) in out.datetime.iter().zip(out.hr.iter_mut()) {
        if let Some(&value) = by_key.get(&epoch_millis(*ts).div_euclid(width)) {
            *hr = Some(value);
            spliced += 1;
        }
    }
    if spliced == 0 && !bins.is_empty() {
        warn!("no trend row overlaps the ekg-derived heart rate");
    }
    info!("replaced hr in {} of {} trend rows", spliced, trend.len());
    out
}

/// Copy of `wave` carrying the interpolated rr at each sample position.
pub fn append_rr_to_wave(wave: &WaveTable, series: &InterpolatedSeries) -> WaveTable {
    let mut rr = vec![None; wave.len()];
    for row in &series.rows {
        if let Some(slot) = rr.get_mut(row.point) {
            *slot = Some(row.rr);
        }
    }
    WaveTable {
        rr: Some(rr),
        ..wave.clone()
    }
}

/// Feed the derived heart rate into both recordings.
pub fn merge_back(
    trend: &TrendTable,
    wave: &WaveTable,
    series: &InterpolatedSeries,
    cfg: &ReconcileConfig,
) -> Reconciled {
    if series.is_empty() {
        warn!("empty rr series, recordings left unchanged");
    }
    let bins = resample_rate(series, wave, cfg.bin_s);
    Reconciled {
        trend: splice_trend_hr(trend, &bins, cfg.bin_s),
        wave: append_rr_to_wave(wave, series),
        bins,
    }
}

/// Monitor heart rate (left axis) against the ekg-derived rate (right axis),
/// in minutes from the start of the trend recording.
pub fn agreement_figure(trend: &TrendTable, wave: &WaveTable, series: &InterpolatedSeries) -> Figure {
    let origin = trend.datetime.first().copied().unwrap_or(wave.start);
    let minutes = |ts: NaiveDateTime| (ts - origin).num_milliseconds() as f64 / 60_000.0;

    let mut panel = Panel::new(
        Some("heart rate agreement".into()),
        Axis::labelled("min"),
        Axis::labelled("hr monitor (bpm)"),
    );
    panel.y2 = Some(Axis::labelled("hr ekg (bpm)"));
    panel.add_series(Series::Line(LineSeries {
        name: "hr".into(),
        points: trend
            .datetime
            .iter()
            .zip(&trend.hr)
            .filter_map(|(ts, hr)| hr.map(|hr| [minutes(*ts), hr]))
            .collect(),
        style: Style {
            width: 1.4,
            color: Color::EKG,
        },
        secondary: false,
    }));
    let derived: Vec<[f64; 2]> = instantaneous_rate(series)
        .into_iter()
        .map(|(point, hr)| [minutes(wave.timestamp(point)), hr])
        .collect();
    panel.add_series(Series::Line(LineSeries {
        name: "hr (ekg)".into(),
        points: decimate_points(&derived, MAX_TRACE_POINTS),
        style: Style {
            width: 1.0,
            color: Color::RR,
        },
        secondary: true,
    }));

    let mut fig = Figure::new(Some("check heart rate agreement".into()));
    fig.add_panel(panel);
    fig
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::InterpolatedRow;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 2, 12)
            .unwrap()
            .and_hms_opt(10, 0, 2)
            .unwrap()
    }

    /// rr = 1000 ms on the first 9 s, 500 ms afterwards (fs 100 Hz).
    fn series() -> InterpolatedSeries {
        InterpolatedSeries {
            rows: (0..2000)
                .map(|point| InterpolatedRow {
                    point,
                    rr: if point < 900 { 1000.0 } else { 500.0 },
                    rr_diff: None,
                    rr_sq_diff: None,
                })
                .collect(),
        }
    }

    fn trend() -> TrendTable {
        let rows = 6;
        TrendTable {
            datetime: (0..rows)
                .map(|i| start() - Duration::seconds(2) + Duration::seconds(5 * i))
                .collect(),
            hr: vec![Some(40.0); rows as usize],
            extra_columns: vec!["sat".into()],
            extra: vec![vec!["98".into()]; rows as usize],
        }
    }

    #[test]
    fn bins_align_on_multiples_of_width() {
        let wave = WaveTable::new(100.0, start(), vec![0.0; 2500]);
        let bins = resample_rate(&series(), &wave, 5.0);
        // 10:00:02 .. 10:00:21.99 spans the 10:00:00, :05, :10, :15 and :20 bins
        assert_eq!(bins.len(), 5);
        assert_eq!(bins[0].start, start() - Duration::seconds(2));
        assert!((bins[0].hr - 60.0).abs() < 1e-9);
        // 10:00:10 .. 10:00:15 mixes 100 samples at 60 bpm with 400 at 120 bpm
        assert!((bins[2].hr - 108.0).abs() < 1e-9);
        assert!((bins[3].hr - 120.0).abs() < 1e-9);
    }

    #[test]
    fn merge_back_returns_new_tables() {
        let wave = WaveTable::new(100.0, start(), vec![0.0; 2500]);
        let trend = trend();
        let merged = merge_back(&trend, &wave, &series(), &ReconcileConfig::default());

        assert_eq!(trend.hr[0], Some(40.0));
        assert!(wave.rr.is_none());

        assert_eq!(merged.trend.hr[0], Some(60.0));
        assert_eq!(merged.trend.hr[3], Some(120.0));
        assert_eq!(merged.trend.hr[5], Some(40.0));
        assert_eq!(merged.trend.extra, trend.extra);

        let rr = merged.wave.rr.unwrap();
        assert_eq!(rr.len(), 2500);
        assert_eq!(rr[0], Some(1000.0));
        assert_eq!(rr[1999], Some(500.0));
        assert_eq!(rr[2000], None);
    }

    #[test]
    fn empty_series_leaves_hr_untouched() {
        let wave = WaveTable::new(100.0, start(), vec![0.0; 10]);
        let trend = trend();
        let merged = merge_back(
            &trend,
            &wave,
            &InterpolatedSeries::default(),
            &ReconcileConfig::default(),
        );
        assert_eq!(merged.trend, trend);
        assert!(merged.bins.is_empty());
        assert!(merged.wave.rr.unwrap().iter().all(Option::is_none));
    }

    #[test]
    fn agreement_uses_secondary_axis_for_derived_rate() {
        let wave = WaveTable::new(100.0, start(), vec![0.0; 2500]);
        let fig = agreement_figure(&trend(), &wave, &series());
        let panel = &fig.panels[0];
        assert!(panel.y2.is_some());
        assert!(!panel.series[0].is_secondary());
        assert!(panel.series[1].is_secondary());
        let first = panel.series[1].points()[0];
        assert!((first[0] - 2.0 / 60.0).abs() < 1e-9);
        assert!((first[1] - 60.0).abs() < 1e-9);
    }
}
