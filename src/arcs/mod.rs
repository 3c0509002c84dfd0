//! Satellite arcs: contiguous, direction-monotonic elevation tracks with
//! detrended SNR.

pub mod detrend;
pub mod extraction;

use crate::utils::obs::{Band, SatId};
use chrono::{DateTime, Utc};

/// Whether the satellite was rising or setting over the arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Rising,
    Setting,
}

/// One time/geometry/SNR sample inside an arc. `snr` is the detrended
/// multipath residual, not the raw observable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcSample {
    pub time: DateTime<Utc>,
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    pub snr: f64,
}

/// A retained, detrended observation arc for one (satellite, band) pair.
///
/// Invariants upheld by the extractor: at least the configured minimum
/// sample count, strictly monotonic elevation in `direction`, no internal
/// time gap above the configured threshold, all samples inside the
/// station's masks.
#[derive(Debug, Clone, PartialEq)]
pub struct Arc {
    pub sat: SatId,
    pub band: Band,
    pub direction: Direction,
    pub samples: Vec<ArcSample>,
}

impl Arc {
    /// Time at the middle sample; tags the reflector-height estimate.
    pub fn midpoint_time(&self) -> DateTime<Utc> {
        self.samples[self.samples.len() / 2].time
    }
}
