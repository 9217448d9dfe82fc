use crate::{
    conditioning::fix_baseline_wander,
    config::PipelineConfig,
    detectors::{detect_beats, Species},
    metrics::{compute_intervals, hrv_time, interpolate_intervals, HRVTime},
    signal::{BeatTable, IntervalTable, InterpolatedSeries, TimeSeries},
};

/// Every table produced from one ekg trace.
#[derive(Debug, Clone)]
pub struct HeartRatePipelineResult {
    pub conditioned: TimeSeries,
    pub beats: BeatTable,
    pub intervals: IntervalTable,
    pub series: InterpolatedSeries,
    pub hrv: HRVTime,
}

impl HeartRatePipelineResult {
    /// Recompute the downstream tables from a (possibly curated) beat table.
    pub fn from_beats(conditioned: TimeSeries, beats: BeatTable, cfg: &PipelineConfig) -> Self {
        let intervals = compute_intervals(&beats, conditioned.fs, &cfg.intervals);
        let series = interpolate_intervals(&intervals);
        let hrv = hrv_time(&intervals);
        Self {
            conditioned,
            beats,
            intervals,
            series,
            hrv,
        }
    }
}

/// Conditioner, detector, interval computer and interpolator in one pass.
pub fn run_heart_rate_pipeline(
    ekg: &TimeSeries,
    species: &Species,
    cfg: &PipelineConfig,
) -> HeartRatePipelineResult {
    let conditioned = fix_baseline_wander(ekg, &cfg.conditioner);
    let beats = detect_beats(&conditioned, species, &cfg.detection);
    HeartRatePipelineResult::from_beats(conditioned, beats, cfg)
}
