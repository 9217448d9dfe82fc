use thiserror::Error;

/// Recoverable conditions raised by the heart-rate pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("empty input")]
    EmptyInput,
    #[error("no detection profile for species '{0}'")]
    UnsupportedProfile(String),
    #[error("{found} beat(s) available, at least 2 are required")]
    InsufficientBeats { found: usize },
    #[error("no beat found between samples {start} and {end}")]
    MissedBeatNotFound { start: usize, end: usize },
    #[error("a beat already exists at sample {0}")]
    DuplicateBeat(usize),
    #[error("beat index {0} is out of range")]
    UnknownBeatIndex(usize),
}
