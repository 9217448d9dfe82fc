use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Uniformly sampled trace. Invalid samples are stored as `NaN`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Uniform sampling frequency in Hz
    pub fs: f64,
    /// Samples, indexed by point
    pub data: Vec<f64>,
}

impl TimeSeries {
    pub fn new(fs: f64, data: Vec<f64>) -> Self {
        Self { fs, data }
    }
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }
}

/// Inclusive range of sample positions picked on a rendered trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleWindow {
    pub start: usize,
    pub end: usize,
}

impl SampleWindow {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// One detected heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatRow {
    /// Sample position of the peak
    pub p_loc: usize,
    /// Peak amplitude in the conditioned trace (mV, sign restored)
    pub y_loc: f64,
    pub left_base: usize,
    pub right_base: usize,
    pub prominence: f64,
}

/// Beats ordered by strictly increasing sample position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeatTable {
    rows: Vec<BeatRow>,
}

impl BeatTable {
    /// Sort `rows` by position and reject duplicated positions.
    pub fn from_rows(mut rows: Vec<BeatRow>) -> Result<Self, PipelineError> {
        rows.sort_by_key(|row| row.p_loc);
        if let Some(pair) = rows.windows(2).find(|w| w[0].p_loc == w[1].p_loc) {
            return Err(PipelineError::DuplicateBeat(pair[0].p_loc));
        }
        Ok(Self { rows })
    }

    /// Rows produced by the peak search are already increasing and unique.
    pub(crate) fn from_sorted(rows: Vec<BeatRow>) -> Self {
        debug_assert!(rows.windows(2).all(|w| w[0].p_loc < w[1].p_loc));
        Self { rows }
    }

    pub fn rows(&self) -> &[BeatRow] {
        &self.rows
    }
    pub fn into_rows(self) -> Vec<BeatRow> {
        self.rows
    }
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    pub fn positions(&self) -> Vec<usize> {
        self.rows.iter().map(|row| row.p_loc).collect()
    }
}

/// Beat row extended with the interval to the next beat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalRow {
    pub p_loc: usize,
    /// Interval to the next beat (ms); undefined for the last beat
    pub rr: Option<f64>,
    /// `|rr[i + 1] - rr[i]|` (ms)
    pub rr_diff: Option<f64>,
    /// `(rr[i + 1] - rr[i])^2` (ms^2)
    pub rr_sq_diff: Option<f64>,
}

/// Intervals aligned with the beat table they were computed from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalTable {
    pub rows: Vec<IntervalRow>,
}

impl IntervalTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    /// Defined rr values in beat order.
    pub fn rr_values(&self) -> Vec<f64> {
        self.rows.iter().filter_map(|row| row.rr).collect()
    }
}

/// One evenly spaced point of the interpolated rr series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterpolatedRow {
    pub point: usize,
    pub rr: f64,
    pub rr_diff: Option<f64>,
    pub rr_sq_diff: Option<f64>,
}

impl InterpolatedRow {
    /// Instantaneous heart rate (bpm).
    pub fn rate(&self) -> Option<f64> {
        (self.rr > 0.0).then(|| 60_000.0 / self.rr)
    }
}

/// Gapless rr series, one row per sample from the first to the last beat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterpolatedSeries {
    pub rows: Vec<InterpolatedRow>,
}

impl InterpolatedSeries {
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    pub fn first_point(&self) -> Option<usize> {
        self.rows.first().map(|row| row.point)
    }
    pub fn last_point(&self) -> Option<usize> {
        self.rows.last().map(|row| row.point)
    }
    /// Row at an absolute sample position.
    pub fn at(&self, point: usize) -> Option<&InterpolatedRow> {
        let first = self.first_point()?;
        point
            .checked_sub(first)
            .and_then(|offset| self.rows.get(offset))
    }
}
