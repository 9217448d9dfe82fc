//! Manual corrections of a detected beat series.
//!
//! The operator inspects the beat review figure, picks a sample window, and
//! either removes the beats it contains or asks for the single beat the
//! detector missed inside it. Every correction returns a new table.

use super::ecg::{detect_beats_with_params, DetectionParams};
use crate::{
    error::PipelineError,
    signal::{BeatTable, SampleWindow, TimeSeries},
};
use log::info;

/// Row indices of the beats lying strictly inside `window`.
pub fn locate_beats(beats: &BeatTable, window: SampleWindow) -> Vec<usize> {
    beats
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| window.start < row.p_loc && row.p_loc < window.end)
        .map(|(idx, _)| idx)
        .collect()
}

/// Drop the rows at `indices` and re-index the remainder.
pub fn remove_beats(beats: &BeatTable, indices: &[usize]) -> Result<BeatTable, PipelineError> {
    if let Some(&bad) = indices.iter().find(|&&idx| idx >= beats.len()) {
        return Err(PipelineError::UnknownBeatIndex(bad));
    }
    let rows = beats
        .rows()
        .iter()
        .enumerate()
        .filter(|(idx, _)| !indices.contains(idx))
        .map(|(_, row)| *row)
        .collect();
    let curated = BeatTable::from_rows(rows)?;
    info!("removed {} beat(s)", beats.len() - curated.len());
    Ok(curated)
}

/// Search `window` (inclusive, clamped to the trace) for the beat the detector
/// missed and merge it into `beats`.
pub fn insert_beat(
    beats: &BeatTable,
    signal: &TimeSeries,
    window: SampleWindow,
    params: &DetectionParams,
) -> Result<BeatTable, PipelineError> {
    if signal.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    let not_found = PipelineError::MissedBeatNotFound {
        start: window.start,
        end: window.end,
    };
    let end = window.end.min(signal.len() - 1);
    if window.start > end {
        return Err(not_found);
    }

    let local = TimeSeries::new(signal.fs, signal.data[window.start..=end].to_vec());
    let found = detect_beats_with_params(&local, params);
    let mut row = *found.rows().first().ok_or(not_found)?;
    row.p_loc += window.start;
    row.left_base += window.start;
    row.right_base += window.start;

    let mut rows = beats.rows().to_vec();
    rows.push(row);
    let curated = BeatTable::from_rows(rows)?;
    info!("inserted beat at sample {}", row.p_loc);
    Ok(curated)
}
