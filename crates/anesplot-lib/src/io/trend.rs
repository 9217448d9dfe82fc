use super::{format_datetime, parse_datetime, parse_optional_f64};
use crate::records::TrendTable;
use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use std::path::Path;

/// Load a trend export; `datetime` and `hr` are parsed, the rest is kept as text.
pub fn read_trend_csv(path: &Path) -> Result<TrendTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let datetime_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("datetime"))
        .ok_or_else(|| anyhow!("{} has no datetime column", path.display()))?;
    let hr_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("hr"))
        .ok_or_else(|| anyhow!("{} has no hr column", path.display()))?;
    let extra_idx: Vec<usize> = (0..headers.len())
        .filter(|&i| i != datetime_idx && i != hr_idx)
        .collect();

    let mut trend = TrendTable {
        extra_columns: extra_idx.iter().map(|&i| headers[i].to_string()).collect(),
        ..TrendTable::default()
    };
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading row {}", row + 1))?;
        let datetime = record
            .get(datetime_idx)
            .ok_or_else(|| anyhow!("row {}: missing datetime", row + 1))?;
        trend
            .datetime
            .push(parse_datetime(datetime).with_context(|| format!("row {}", row + 1))?);
        trend.hr.push(
            parse_optional_f64(record.get(hr_idx).unwrap_or(""))
                .with_context(|| format!("row {}: hr", row + 1))?,
        );
        trend.extra.push(
            extra_idx
                .iter()
                .map(|&i| record.get(i).unwrap_or("").to_string())
                .collect(),
        );
    }
    Ok(trend)
}

pub fn write_trend_csv(path: &Path, trend: &TrendTable) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut header = vec!["datetime".to_string(), "hr".to_string()];
    header.extend(trend.extra_columns.iter().cloned());
    writer.write_record(&header)?;
    for (i, ts) in trend.datetime.iter().enumerate() {
        let mut record = vec![
            format_datetime(*ts),
            trend
                .hr
                .get(i)
                .copied()
                .flatten()
                .map(|v| v.to_string())
                .unwrap_or_default(),
        ];
        if let Some(extra) = trend.extra.get(i) {
            record.extend(extra.iter().cloned());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
