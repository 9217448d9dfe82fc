use crate::signal::IntervalTable;
use serde::{Deserialize, Serialize};

/// Time-domain variability summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HRVTime {
    /// Number of rr intervals.
    pub n: usize,
    /// Mean rr (ms).
    pub avnn: f64,
    /// Sample standard deviation of rr (ms).
    pub sdnn: f64,
    /// Root mean square of successive differences (ms).
    pub rmssd: f64,
    /// Fraction (0..=1) of successive differences above 50 ms.
    pub pnn50: f64,
}

pub fn hrv_time(intervals: &IntervalTable) -> HRVTime {
    let rr = intervals.rr_values();
    let n = rr.len();
    let avnn = if n > 0 {
        rr.iter().sum::<f64>() / n as f64
    } else {
        0.0
    };
    let sdnn = if n > 1 {
        (rr.iter().map(|x| (x - avnn).powi(2)).sum::<f64>() / (n as f64 - 1.0)).sqrt()
    } else {
        0.0
    };

    let sq: Vec<f64> = intervals.rows.iter().filter_map(|r| r.rr_sq_diff).collect();
    let rmssd = if sq.is_empty() {
        0.0
    } else {
        (sq.iter().sum::<f64>() / sq.len() as f64).sqrt()
    };
    let diffs: Vec<f64> = intervals.rows.iter().filter_map(|r| r.rr_diff).collect();
    let pnn50 = if diffs.is_empty() {
        0.0
    } else {
        diffs.iter().filter(|&&d| d > 50.0).count() as f64 / diffs.len() as f64
    };

    HRVTime {
        n,
        avnn,
        sdnn,
        rmssd,
        pnn50,
    }
}
