use super::{format_datetime, parse_datetime, parse_optional_f64};
use crate::records::WaveTable;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{Duration, NaiveDateTime};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use log::warn;
use std::path::Path;

/// Load a normalized wave export (`datetime`, `wekg` columns).
///
/// Without a `datetime` column the recording is anchored at the Unix epoch.
/// Blank lines are invalid samples and keep their position as NaN.
pub fn read_wave_csv(path: &Path, fs: f64) -> Result<WaveTable> {
    if !(fs.is_finite() && fs > 0.0) {
        bail!("sampling rate must be positive, got {}", fs);
    }
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let ekg_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("wekg"))
        .ok_or_else(|| anyhow!("{} has no wekg column", path.display()))?;
    let datetime_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("datetime"));

    let mut start: Option<NaiveDateTime> = None;
    let mut wekg = Vec::new();
    // the csv reader drops empty lines; a single-column export writes a
    // missing sample as exactly that
    let mut last_line = headers.position().map_or(1, |pos| pos.line());
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading row {}", row + 1))?;
        let line = record.position().map_or(last_line + 1, |pos| pos.line());
        for _ in last_line + 1..line {
            wekg.push(f64::NAN);
        }
        last_line = line;
        if start.is_none() {
            if let Some(value) = datetime_idx.and_then(|idx| record.get(idx)) {
                let stamp = parse_datetime(value).with_context(|| format!("row {}", row + 1))?;
                // timestamp of this row, back-dated over any leading gap
                let offset_ns = (wekg.len() as f64 * 1e9 / fs).round() as i64;
                start = Some(stamp - Duration::nanoseconds(offset_ns));
            }
        }
        let sample = parse_optional_f64(record.get(ekg_idx).unwrap_or(""))
            .with_context(|| format!("row {}: wekg", row + 1))?;
        wekg.push(sample.unwrap_or(f64::NAN));
    }
    let start = start.unwrap_or_else(|| {
        warn!("{}: no datetime column, timestamps start at the epoch", path.display());
        NaiveDateTime::default()
    });
    Ok(WaveTable::new(fs, start, wekg))
}

/// Write `datetime`, `wekg` and, once merged, `rr`.
pub fn write_wave_csv(path: &Path, wave: &WaveTable) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut header = vec!["datetime", "wekg"];
    if wave.rr.is_some() {
        header.push("rr");
    }
    writer.write_record(&header)?;
    for (i, sample) in wave.wekg.iter().enumerate() {
        let mut record = vec![format_datetime(wave.timestamp(i)), fmt_sample(*sample)];
        if let Some(rr) = &wave.rr {
            record.push(rr.get(i).copied().flatten().map(|v| v.to_string()).unwrap_or_default());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn fmt_sample(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reads_wave_with_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wave.csv");
        fs::write(
            &path,
            "datetime,wekg\n2020-02-12 10:00:00.000,-0.1\n2020-02-12 10:00:00.003,\n2020-02-12 10:00:00.007,0.25\n",
        )
        .unwrap();
        let wave = read_wave_csv(&path, 300.0).unwrap();
        assert_eq!(wave.len(), 3);
        assert_eq!(wave.wekg[0], -0.1);
        assert!(wave.wekg[1].is_nan());
        assert_eq!(format_datetime(wave.start), "2020-02-12 10:00:00.000");
    }

    #[test]
    fn blank_line_keeps_its_sample_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wave.csv");
        fs::write(&path, "wekg\n-0.1\n\n0.25\n\n\n1.5\n").unwrap();
        let wave = read_wave_csv(&path, 300.0).unwrap();
        assert_eq!(wave.len(), 6);
        assert_eq!(wave.wekg[0], -0.1);
        assert!(wave.wekg[1].is_nan());
        assert_eq!(wave.wekg[2], 0.25);
        assert!(wave.wekg[3].is_nan() && wave.wekg[4].is_nan());
        assert_eq!(wave.wekg[5], 1.5);
        assert_eq!(wave.start, NaiveDateTime::default());
    }

    #[test]
    fn leading_blank_lines_back_date_the_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wave.csv");
        fs::write(&path, "datetime,wekg\n\n\n2020-02-12 10:00:01.000,0.5\n").unwrap();
        let wave = read_wave_csv(&path, 2.0).unwrap();
        assert_eq!(wave.len(), 3);
        assert_eq!(format_datetime(wave.start), "2020-02-12 10:00:00.000");
    }

    #[test]
    fn non_positive_sampling_rate_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wave.csv");
        fs::write(&path, "wekg\n-0.1\n0.2\n").unwrap();
        for fs in [0.0, -300.0, f64::NAN, f64::INFINITY] {
            assert!(read_wave_csv(&path, fs).is_err(), "fs {fs} accepted");
        }
    }

    #[test]
    fn missing_ekg_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wave.csv");
        fs::write(&path, "datetime,wap\n2020-02-12 10:00:00,80\n").unwrap();
        assert!(read_wave_csv(&path, 300.0).is_err());
    }

    #[test]
    fn written_wave_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let start = parse_datetime("2020-02-12 10:00:00").unwrap();
        let mut wave = WaveTable::new(100.0, start, vec![0.5, f64::NAN, -1.0]);
        wave.rr = Some(vec![None, Some(1000.0), Some(1000.0)]);
        write_wave_csv(&path, &wave).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("datetime,wekg,rr\n2020-02-12 10:00:00.000,0.5,\n"));
        let back = read_wave_csv(&path, 100.0).unwrap();
        assert_eq!(back.start, start);
        assert_eq!(back.wekg[2], -1.0);
        assert!(back.wekg[1].is_nan());
    }
}
