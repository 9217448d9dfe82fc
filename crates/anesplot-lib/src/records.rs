//! Recording tables handed over by the device loaders.

use crate::signal::TimeSeries;
use chrono::{Duration, NaiveDateTime};

/// Continuous waveform recording reduced to its ekg lead.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveTable {
    pub fs: f64,
    /// Timestamp of sample 0; sample `i` is at `start + i / fs`.
    pub start: NaiveDateTime,
    /// Ekg in mV, `NaN` for invalid samples.
    pub wekg: Vec<f64>,
    /// Interpolated rr (ms) per sample, once merged back.
    pub rr: Option<Vec<Option<f64>>>,
}

impl WaveTable {
    pub fn new(fs: f64, start: NaiveDateTime, wekg: Vec<f64>) -> Self {
        Self {
            fs,
            start,
            wekg,
            rr: None,
        }
    }

    pub fn len(&self) -> usize {
        self.wekg.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wekg.is_empty()
    }

    pub fn ekg(&self) -> TimeSeries {
        TimeSeries::new(self.fs, self.wekg.clone())
    }

    pub fn timestamp(&self, point: usize) -> NaiveDateTime {
        let nanos = (point as f64 / self.fs * 1e9).round() as i64;
        self.start + Duration::nanoseconds(nanos)
    }
}

/// Periodic summary recording. Only `hr` is interpreted; every other column
/// travels along untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendTable {
    pub datetime: Vec<NaiveDateTime>,
    /// Heart rate (bpm)
    pub hr: Vec<Option<f64>>,
    pub extra_columns: Vec<String>,
    /// One entry per row, aligned with `extra_columns`.
    pub extra: Vec<Vec<String>>,
}

impl TrendTable {
    pub fn len(&self) -> usize {
        self.datetime.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datetime.is_empty()
    }
}
