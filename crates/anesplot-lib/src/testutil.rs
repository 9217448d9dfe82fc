//! Synthetic recordings shared by unit tests.

use crate::signal::{BeatRow, BeatTable, TimeSeries};

/// Flat trace with a downward Gaussian deflection (sigma 3 samples) at each beat.
pub(crate) fn synthetic_ekg(fs: f64, seconds: f64, beats: &[usize], amp: f64) -> TimeSeries {
    let n = (fs * seconds) as usize;
    let mut data = vec![0.0; n];
    for &beat in beats {
        let lo = beat.saturating_sub(30);
        let hi = (beat + 30).min(n);
        for (i, sample) in data.iter_mut().enumerate().take(hi).skip(lo) {
            let d = i as f64 - beat as f64;
            *sample -= amp * (-0.5 * (d / 3.0).powi(2)).exp();
        }
    }
    TimeSeries::new(fs, data)
}

/// Beat table with placeholder peak properties.
pub(crate) fn beats_at(positions: &[usize]) -> BeatTable {
    let rows = positions
        .iter()
        .map(|&p_loc| BeatRow {
            p_loc,
            y_loc: -2.0,
            left_base: p_loc.saturating_sub(30),
            right_base: p_loc + 30,
            prominence: 2.0,
        })
        .collect();
    BeatTable::from_rows(rows).expect("distinct positions")
}
