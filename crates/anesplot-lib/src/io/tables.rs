//! CSV persistence of the pipeline tables, so curation can span sessions.

use crate::signal::{BeatRow, BeatTable, IntervalTable, InterpolatedRow, InterpolatedSeries};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, Writer};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer =
        Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut rows = Vec::new();
    for (idx, row) in reader.deserialize().enumerate() {
        rows.push(row.with_context(|| format!("{}: row {}", path.display(), idx + 1))?);
    }
    Ok(rows)
}

pub fn write_beats_csv(path: &Path, beats: &BeatTable) -> Result<()> {
    write_rows(path, beats.rows())
}

/// Load a beat table, re-sorted; duplicated positions are rejected.
pub fn read_beats_csv(path: &Path) -> Result<BeatTable> {
    let rows: Vec<BeatRow> = read_rows(path)?;
    BeatTable::from_rows(rows).with_context(|| format!("invalid beat table {}", path.display()))
}

pub fn write_intervals_csv(path: &Path, intervals: &IntervalTable) -> Result<()> {
    write_rows(path, &intervals.rows)
}

pub fn write_interpolated_csv(path: &Path, series: &InterpolatedSeries) -> Result<()> {
    write_rows(path, &series.rows)
}

pub fn read_interpolated_csv(path: &Path) -> Result<InterpolatedSeries> {
    let rows: Vec<InterpolatedRow> = read_rows(path)?;
    if rows.windows(2).any(|w| w[1].point != w[0].point + 1) {
        anyhow::bail!("{}: points are not consecutive", path.display());
    }
    Ok(InterpolatedSeries { rows })
}
