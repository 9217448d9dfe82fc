pub mod hrv;
pub mod interpolate;
pub mod intervals;

pub use hrv::{hrv_time, HRVTime};
pub use interpolate::interpolate_intervals;
pub use intervals::{compute_intervals, IntervalConfig};
