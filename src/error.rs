use thiserror::Error;

/// Fatal, run-level errors. Per-epoch and per-arc failures are recovered
/// inside the pipeline and surface only as diagnostic counts.
#[derive(Error, Debug)]
pub enum GnssirError {
    /// The station configuration cannot support a run
    #[error("invalid station: {0}")]
    InvalidStation(String),

    /// The processing configuration cannot support a run
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The observation stream contains no epochs
    #[error("empty observation stream")]
    EmptyObservations,
}
