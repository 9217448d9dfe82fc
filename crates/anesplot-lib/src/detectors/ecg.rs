use crate::{
    error::PipelineError,
    signal::{BeatRow, BeatTable, TimeSeries},
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, fmt, str::FromStr};

/// Peak search constraints, expressed on the sign-inverted ekg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionParams {
    /// Minimum peak height (mV).
    pub height: f64,
    /// Minimum spacing between accepted peaks, as a fraction of the sampling rate (s).
    pub distance_s: f64,
    /// Minimum peak prominence (mV).
    pub prominence: f64,
}

impl DetectionParams {
    pub const HORSE: Self = Self {
        height: 0.5,
        distance_s: 0.7,
        prominence: 1.0,
    };

    pub fn distance_samples(&self, fs: f64) -> f64 {
        self.distance_s * fs
    }
}

/// Optional per-field replacements for a species profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionOverrides {
    pub height: Option<f64>,
    pub distance_s: Option<f64>,
    pub prominence: Option<f64>,
}

impl DetectionOverrides {
    pub fn apply(&self, base: DetectionParams) -> DetectionParams {
        DetectionParams {
            height: self.height.unwrap_or(base.height),
            distance_s: self.distance_s.unwrap_or(base.distance_s),
            prominence: self.prominence.unwrap_or(base.prominence),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Species {
    Horse,
    Dog,
    Cat,
    Other(String),
}

impl Species {
    /// Detection profile tuned for the species.
    pub fn profile(&self) -> Result<DetectionParams, PipelineError> {
        match self {
            Species::Horse => Ok(DetectionParams::HORSE),
            other => Err(PipelineError::UnsupportedProfile(other.to_string())),
        }
    }
}

impl FromStr for Species {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "horse" => Species::Horse,
            "dog" => Species::Dog,
            "cat" => Species::Cat,
            other => Species::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Species::Horse => f.write_str("horse"),
            Species::Dog => f.write_str("dog"),
            Species::Cat => f.write_str("cat"),
            Species::Other(name) => f.write_str(name),
        }
    }
}

/// Detect beats with the profile of `species`.
///
/// An unsupported species is logged and yields an empty table.
pub fn detect_beats(
    signal: &TimeSeries,
    species: &Species,
    overrides: &DetectionOverrides,
) -> BeatTable {
    match species.profile() {
        Ok(profile) => detect_beats_with_params(signal, &overrides.apply(profile)),
        Err(err) => {
            warn!("beat detection skipped: {}", err);
            BeatTable::default()
        }
    }
}

/// Locate the downward ekg deflections of a conditioned trace.
pub fn detect_beats_with_params(signal: &TimeSeries, params: &DetectionParams) -> BeatTable {
    if signal.is_empty() {
        return BeatTable::default();
    }
    debug!(
        "beat detection: height {} distance {}s prominence {} at {} Hz",
        params.height, params.distance_s, params.prominence, signal.fs
    );
    let inverted: Vec<f64> = signal.data.iter().map(|x| -x).collect();
    let peaks = find_peaks(
        &inverted,
        params.height,
        params.distance_samples(signal.fs),
        params.prominence,
    );
    let rows = peaks
        .into_iter()
        .map(|peak| BeatRow {
            p_loc: peak.index,
            y_loc: -peak.height,
            left_base: peak.left_base,
            right_base: peak.right_base,
            prominence: peak.prominence,
        })
        .collect();
    let beats = BeatTable::from_sorted(rows);
    info!(
        "detected {} beats over {:.1}s",
        beats.len(),
        signal.duration()
    );
    beats
}

#[derive(Debug, Clone, Copy)]
struct Peak {
    index: usize,
    height: f64,
    prominence: f64,
    left_base: usize,
    right_base: usize,
}

/// Local maxima filtered by height, then distance, then prominence.
fn find_peaks(x: &[f64], height: f64, distance: f64, min_prominence: f64) -> Vec<Peak> {
    let mut peaks: Vec<usize> = local_maxima(x)
        .into_iter()
        .filter(|&i| x[i] >= height)
        .collect();

    if distance >= 1.0 && peaks.len() > 1 {
        let priority: Vec<f64> = peaks.iter().map(|&i| x[i]).collect();
        let keep = select_by_distance(&peaks, &priority, distance);
        peaks = peaks
            .into_iter()
            .zip(keep)
            .filter_map(|(peak, keep)| keep.then_some(peak))
            .collect();
    }

    peaks
        .into_iter()
        .filter_map(|index| {
            let (prominence, left_base, right_base) = prominence(x, index);
            (prominence >= min_prominence).then_some(Peak {
                index,
                height: x[index],
                prominence,
                left_base,
                right_base,
            })
        })
        .collect()
}

/// Samples strictly above their left neighbour and above the first differing
/// right neighbour. Flat tops report their middle sample (rounded down).
fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }
    let i_max = x.len() - 1;
    let mut i = 1;
    while i < i_max {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < i_max && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Keep the highest peaks first and drop any neighbour closer than `distance`.
fn select_by_distance(peaks: &[usize], priority: &[f64], distance: f64) -> Vec<bool> {
    let distance = distance.ceil() as usize;
    let mut keep = vec![true; peaks.len()];
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| priority[a].total_cmp(&priority[b]));
    for &j in order.iter().rev() {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }
        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }
    keep
}

/// Prominence of `x[peak]` plus its left and right bases.
fn prominence(x: &[f64], peak: usize) -> (f64, usize, usize) {
    let top = x[peak];

    let mut left_min = top;
    let mut left_base = peak;
    let mut i = peak;
    loop {
        if !(x[i] <= top) {
            break;
        }
        if x[i] < left_min {
            left_min = x[i];
            left_base = i;
        }
        if i == 0 {
            break;
        }
        i -= 1;
    }

    let mut right_min = top;
    let mut right_base = peak;
    for (j, &value) in x.iter().enumerate().skip(peak) {
        if !(value <= top) {
            break;
        }
        if value < right_min {
            right_min = value;
            right_base = j;
        }
    }

    (top - left_min.max(right_min), left_base, right_base)
}
