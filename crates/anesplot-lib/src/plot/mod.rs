use crate::signal::{BeatTable, InterpolatedSeries, TimeSeries};
use serde::{Deserialize, Serialize};

/// Longest trace handed to a backend.
pub const MAX_TRACE_POINTS: usize = 20_000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
    /// Fixed (min, max); derived from the data when unset.
    pub range: Option<(f64, f64)>,
}

impl Axis {
    pub fn labelled(label: &str) -> Self {
        Self {
            label: Some(label.into()),
            range: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const EKG: Color = Color(0x1F77B4);
    pub const BEAT: Color = Color(0xFF7F0E);
    pub const RR: Color = Color(0xD62728);
    pub const RATE: Color = Color(0x2CA02C);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
    /// Drawn against the panel's secondary y axis.
    #[serde(default)]
    pub secondary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub radius: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
    Markers(MarkerSeries),
}

impl Series {
    pub fn points(&self) -> &[[f64; 2]] {
        match self {
            Series::Line(line) => &line.points,
            Series::Markers(markers) => &markers.points,
        }
    }

    pub fn is_secondary(&self) -> bool {
        matches!(self, Series::Line(line) if line.secondary)
    }
}

/// One chart area of a figure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Panel {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub y2: Option<Axis>,
    pub series: Vec<Series>,
}

impl Panel {
    pub fn new(title: impl Into<Option<String>>, x: Axis, y: Axis) -> Self {
        Self {
            title: title.into(),
            x,
            y,
            y2: None,
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points().is_empty())
    }
}

/// Panels stacked vertically, sharing the figure title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub panels: Vec<Panel>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            panels: Vec::new(),
        }
    }

    pub fn add_panel(&mut self, panel: Panel) {
        self.panels.push(panel);
    }

    /// True when there is nothing to draw; backends show a placeholder.
    pub fn is_empty(&self) -> bool {
        self.panels.iter().all(Panel::is_empty)
    }
}

pub trait PlotBackend {
    fn draw(&mut self, fig: &Figure) -> anyhow::Result<()>;
}

pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        result.push(points[start]);
    }
    result
}

/// Linear-interpolated quantile of the finite values, `q` in `[0, 1]`.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

fn quantile_range(values: &[f64], lo: f64, hi: f64) -> Option<(f64, f64)> {
    let range = (quantile(values, lo)?, quantile(values, hi)?);
    (range.1 > range.0).then_some(range)
}

fn line(name: &str, points: Vec<[f64; 2]>, color: Color) -> Series {
    Series::Line(LineSeries {
        name: name.into(),
        points: decimate_points(&points, MAX_TRACE_POINTS),
        style: Style {
            width: 1.4,
            color,
        },
        secondary: false,
    })
}

/// Conditioned ekg with the detected beats on top, and the beat-to-beat
/// distance below, to verify detection accuracy.
pub fn beat_review_figure(signal: &TimeSeries, beats: &BeatTable) -> Figure {
    let mut fig = Figure::new(Some("verify the accuracy of the beat detection".into()));

    let mut ekg = Panel::new(None, Axis::labelled("pt value"), Axis::labelled("ekg (mV)"));
    let trace: Vec<[f64; 2]> = signal
        .data
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, v)| [i as f64, *v])
        .collect();
    ekg.add_series(line("ekg", trace, Color::EKG));
    ekg.add_series(Series::Markers(MarkerSeries {
        name: "R".into(),
        points: beats
            .rows()
            .iter()
            .map(|row| [row.p_loc as f64, row.y_loc])
            .collect(),
        radius: 3.0,
        color: Color::BEAT,
    }));
    fig.add_panel(ekg);

    let mut rr = Panel::new(None, Axis::labelled("pt value"), Axis::labelled("rr (pt value)"));
    let distances = beats
        .rows()
        .windows(2)
        .map(|w| [w[0].p_loc as f64, (w[1].p_loc - w[0].p_loc) as f64])
        .collect();
    rr.add_series(line("rr", distances, Color::RR));
    fig.add_panel(rr);
    fig
}

/// Lower panel of [`rr_review_figure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RrLowerPanel {
    HeartRate,
    SqVariation,
}

/// Interpolated rr against time (minutes) plus heart rate or squared variation.
pub fn rr_review_figure(series: &InterpolatedSeries, fs: f64, lower: RrLowerPanel) -> Figure {
    let mut fig = Figure::new(Some("RR duration".into()));
    let minutes = |point: usize| point as f64 / fs / 60.0;
    let x_label = format!("min (fs {})", fs);

    let rr_values: Vec<f64> = series.rows.iter().map(|row| row.rr).collect();
    let mut rr = Panel::new(
        Some("RR duration".into()),
        Axis::labelled(&x_label),
        Axis {
            label: Some("RR (msec)".into()),
            range: quantile_range(&rr_values, 0.01, 0.99),
        },
    );
    rr.add_series(line(
        "rr",
        series
            .rows
            .iter()
            .map(|row| [minutes(row.point), row.rr])
            .collect(),
        Color::EKG,
    ));
    fig.add_panel(rr);

    let panel = match lower {
        RrLowerPanel::HeartRate => {
            let points: Vec<[f64; 2]> = series
                .rows
                .iter()
                .filter_map(|row| row.rate().map(|hr| [minutes(row.point), hr]))
                .collect();
            let rates: Vec<f64> = points.iter().map(|p| p[1]).collect();
            let mut panel = Panel::new(
                Some("heart rate".into()),
                Axis::labelled(&x_label),
                Axis {
                    label: Some("bpm".into()),
                    range: quantile_range(&rates, 0.01, 0.99),
                },
            );
            panel.add_series(line("hr", points, Color::RATE));
            panel
        }
        RrLowerPanel::SqVariation => {
            let points: Vec<[f64; 2]> = series
                .rows
                .iter()
                .filter_map(|row| row.rr_sq_diff.map(|v| [minutes(row.point), v]))
                .collect();
            let values: Vec<f64> = points.iter().map(|p| p[1]).collect();
            let mut panel = Panel::new(
                Some("RR sqVariation".into()),
                Axis::labelled(&x_label),
                Axis {
                    label: Some("msec²".into()),
                    range: quantile(&values, 0.98)
                        .filter(|hi| *hi > 0.0)
                        .map(|hi| (0.0, hi)),
                },
            );
            panel.add_series(line("rrSqDiff", points, Color::RATE));
            panel
        }
    };
    fig.add_panel(panel);
    fig
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metrics::{compute_intervals, interpolate_intervals, IntervalConfig},
        testutil::{beats_at, synthetic_ekg},
    };

    #[test]
    fn decimation_caps_points() {
        let points: Vec<[f64; 2]> = (0..10_000).map(|i| [i as f64, 0.0]).collect();
        let out = decimate_points(&points, 100);
        assert_eq!(out.len(), 100);
        assert_eq!(out[1][0], 100.0);
    }

    #[test]
    fn quantiles_interpolate() {
        let values: Vec<f64> = (0..=100).map(f64::from).collect();
        assert_eq!(quantile(&values, 0.01), Some(1.0));
        assert_eq!(quantile(&values, 0.5), Some(50.0));
        assert_eq!(quantile(&[f64::NAN], 0.5), None);
    }

    #[test]
    fn beat_review_has_markers_per_beat() {
        let signal = synthetic_ekg(300.0, 10.0, &[300, 600, 900], 2.0);
        let fig = beat_review_figure(&signal, &beats_at(&[300, 600, 900]));
        assert_eq!(fig.panels.len(), 2);
        let markers = fig.panels[0]
            .series
            .iter()
            .find(|s| matches!(s, Series::Markers(_)))
            .unwrap();
        assert_eq!(markers.points().len(), 3);
        assert_eq!(fig.panels[1].series[0].points(), &[[300.0, 300.0], [600.0, 300.0]]);
        assert!(!fig.is_empty());
    }

    #[test]
    fn rr_review_heart_rate_panel() {
        let intervals =
            compute_intervals(&beats_at(&[0, 300, 660, 960]), 300.0, &IntervalConfig::default());
        let series = interpolate_intervals(&intervals);
        let fig = rr_review_figure(&series, 300.0, RrLowerPanel::HeartRate);
        let rates = fig.panels[1].series[0].points();
        assert!((rates[0][1] - 60.0).abs() < 1e-9);
        let (lo, hi) = fig.panels[0].y.range.unwrap();
        assert!(lo >= 1000.0 && hi <= 1200.0);
    }

    #[test]
    fn empty_inputs_give_empty_figures() {
        let fig = rr_review_figure(&InterpolatedSeries::default(), 300.0, RrLowerPanel::SqVariation);
        assert!(fig.is_empty());
        let fig = beat_review_figure(&TimeSeries::new(300.0, Vec::new()), &BeatTable::default());
        assert!(fig.is_empty());
    }
}
