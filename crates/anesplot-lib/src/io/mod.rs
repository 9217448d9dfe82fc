pub mod tables;
pub mod trend;
pub mod wave;

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

pub(crate) fn parse_datetime(text: &str) -> Result<NaiveDateTime> {
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(ts);
        }
    }
    bail!("unrecognized timestamp '{}'", text)
}

pub(crate) fn format_datetime(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// Blank cells are missing values.
pub(crate) fn parse_optional_f64(text: &str) -> Result<Option<f64>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .with_context(|| format!("'{}' is not a number", trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_with_and_without_fraction() {
        let a = parse_datetime("2020-02-12 10:00:05").unwrap();
        let b = parse_datetime("2020-02-12T10:00:05.250").unwrap();
        assert_eq!((b - a).num_milliseconds(), 250);
        assert_eq!(format_datetime(b), "2020-02-12 10:00:05.250");
        assert!(parse_datetime("12/02/2020").is_err());
    }

    #[test]
    fn blank_cells_are_missing() {
        assert_eq!(parse_optional_f64(" ").unwrap(), None);
        assert_eq!(parse_optional_f64("41.5").unwrap(), Some(41.5));
        assert!(parse_optional_f64("n/a").is_err());
    }
}
