pub mod curation;
pub mod ecg;

pub use curation::{insert_beat, locate_beats, remove_beats};
pub use ecg::{
    detect_beats, detect_beats_with_params, DetectionOverrides, DetectionParams, Species,
};
