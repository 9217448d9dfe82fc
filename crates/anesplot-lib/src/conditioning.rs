//! Baseline wander removal ahead of beat detection.

use crate::signal::TimeSeries;
use log::{debug, warn};
use realfft::RealFftPlanner;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineMethod {
    /// Subtract a running median spanning one period of the cutoff.
    Median,
    /// Zero every spectral bin below the cutoff.
    Spectral,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionerConfig {
    pub method: BaselineMethod,
    /// Drift frequencies below this are removed (Hz).
    pub cutoff_hz: f64,
}

impl Default for ConditionerConfig {
    fn default() -> Self {
        Self {
            method: BaselineMethod::Median,
            cutoff_hz: 0.5,
        }
    }
}

/// Remove slow drift from an ekg trace. Output has the same length as the input.
pub fn fix_baseline_wander(ts: &TimeSeries, cfg: &ConditionerConfig) -> TimeSeries {
    if ts.is_empty() {
        return TimeSeries::new(ts.fs, Vec::new());
    }
    let cutoff = cfg.cutoff_hz.max(0.01);
    let data = match cfg.method {
        BaselineMethod::Median => {
            let window = median_window(ts.fs, cutoff);
            debug!("baseline: running median over {} samples", window);
            subtract_running_median(&ts.data, window)
        }
        BaselineMethod::Spectral => match spectral_highpass(&ts.data, ts.fs, cutoff) {
            Some(data) => data,
            None => {
                warn!("baseline: spectral high-pass failed, using running median");
                subtract_running_median(&ts.data, median_window(ts.fs, cutoff))
            }
        },
    };
    TimeSeries::new(ts.fs, data)
}

fn median_window(fs: f64, cutoff: f64) -> usize {
    let win = (fs.max(1.0) / cutoff).round() as usize;
    win.max(3) | 1
}

fn subtract_running_median(data: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    let n = data.len();
    let mut sorted: Vec<f64> = Vec::with_capacity(window);
    for &x in &data[..n.min(half + 1)] {
        insert_sorted(&mut sorted, x);
    }
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let x = data[i];
        out.push(match median(&sorted) {
            Some(m) if x.is_finite() => x - m,
            _ => f64::NAN,
        });
        if i >= half {
            remove_sorted(&mut sorted, data[i - half]);
        }
        if let Some(&incoming) = data.get(i + half + 1) {
            insert_sorted(&mut sorted, incoming);
        }
    }
    out
}

fn insert_sorted(sorted: &mut Vec<f64>, x: f64) {
    if x.is_finite() {
        let pos = sorted.partition_point(|v| *v < x);
        sorted.insert(pos, x);
    }
}

fn remove_sorted(sorted: &mut Vec<f64>, x: f64) {
    if x.is_finite() {
        let pos = sorted.partition_point(|v| *v < x);
        if pos < sorted.len() && sorted[pos] == x {
            sorted.remove(pos);
        }
    }
}

fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some(0.5 * (sorted[n / 2 - 1] + sorted[n / 2])),
    }
}

fn spectral_highpass(data: &[f64], fs: f64, cutoff: f64) -> Option<Vec<f64>> {
    let n = data.len();
    let finite: Vec<f64> = data.iter().copied().filter(|x| x.is_finite()).collect();
    if finite.is_empty() {
        return Some(vec![f64::NAN; n]);
    }
    let fill = finite.iter().sum::<f64>() / finite.len() as f64;
    let mut buffer: Vec<f64> = data
        .iter()
        .map(|&x| if x.is_finite() { x } else { fill })
        .collect();

    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(n);
    let c2r = planner.plan_fft_inverse(n);
    let mut spectrum = r2c.make_output_vec();
    r2c.process(&mut buffer, &mut spectrum).ok()?;

    let bin_hz = fs / n as f64;
    for (k, bin) in spectrum.iter_mut().enumerate() {
        if (k as f64) * bin_hz < cutoff {
            bin.re = 0.0;
            bin.im = 0.0;
        }
    }
    spectrum[0].im = 0.0;
    if n % 2 == 0 {
        if let Some(last) = spectrum.last_mut() {
            last.im = 0.0;
        }
    }

    let mut out = c2r.make_output_vec();
    c2r.process(&mut spectrum, &mut out).ok()?;
    let scale = 1.0 / n as f64;
    Some(
        out.into_iter()
            .zip(data)
            .map(|(y, &x)| if x.is_finite() { y * scale } else { f64::NAN })
            .collect(),
    )
}
