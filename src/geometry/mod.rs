//! Satellite positions and station-relative geometry.

pub mod ephemeris;
pub mod precise;
pub mod topocentric;

use crate::utils::obs::{EpochObs, GeometrySample, SatId};
use crate::utils::station::Station;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use log::debug;
use nalgebra::Vector3;
use thiserror::Error;

/// Per-epoch geometry failures. Recovered by dropping the epoch from arc
/// construction; never fatal to a run.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum GeometryError {
    /// Best available navigation record is outside the validity window
    #[error("{sat}: ephemeris {age_s:.0} s old exceeds validity window")]
    StaleEphemeris { sat: SatId, age_s: f64 },

    /// Precise-orbit table cannot bracket the requested time
    #[error("{sat}: {have} orbit samples bracket the epoch, {need} needed")]
    InsufficientOrbitSamples { sat: SatId, have: usize, need: usize },

    /// No navigation data at all for this satellite
    #[error("{sat}: no navigation data")]
    UnknownSatellite { sat: SatId },
}

/// Capability seam for satellite position providers. Implemented by
/// [`ephemeris::BroadcastEphemerides`] and [`precise::PreciseOrbit`]; a
/// vetted external orbit library can be substituted without touching the
/// rest of the pipeline.
pub trait OrbitSource: Sync {
    /// ECEF position [m] of `sat` at `t`.
    ///
    /// # Errors
    /// Will return `Err` if no valid navigation data covers the epoch.
    fn position(&self, sat: SatId, t: DateTime<Utc>) -> Result<Vector3<f64>, GeometryError>;
}

/// Counts of epochs dropped from geometry, per failure kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeometryRejections {
    pub stale_ephemeris: usize,
    pub insufficient_orbit_samples: usize,
    pub unknown_satellite: usize,
}

impl GeometryRejections {
    fn count(&mut self, err: &GeometryError) {
        match err {
            GeometryError::StaleEphemeris { .. } => self.stale_ephemeris += 1,
            GeometryError::InsufficientOrbitSamples { .. } => {
                self.insufficient_orbit_samples += 1
            }
            GeometryError::UnknownSatellite { .. } => self.unknown_satellite += 1,
        }
    }
}

/// Builds the per-epoch geometry table for an observation stream.
///
/// Each distinct (satellite, time) pair is resolved once, however many
/// frequency bands observed it. Epochs whose geometry cannot be computed
/// are dropped and counted.
pub fn geometry_table<O: OrbitSource>(
    station: &Station,
    orbit: &O,
    observations: &[EpochObs],
) -> (Vec<GeometrySample>, GeometryRejections) {
    let mut rejections = GeometryRejections::default();
    let mut samples = Vec::new();

    let epochs: Vec<(SatId, DateTime<Utc>)> = observations
        .iter()
        .map(|obs| (obs.sat, obs.time))
        .unique()
        .collect();

    for (sat, time) in epochs {
        match orbit.position(sat, time) {
            Ok(ecef) => {
                let (elevation_deg, azimuth_deg) =
                    topocentric::elevation_azimuth(station, &ecef);
                samples.push(GeometrySample {
                    time,
                    sat,
                    elevation_deg,
                    azimuth_deg,
                });
            }
            Err(e) => {
                debug!("dropping epoch {time} {sat}: {e}");
                rejections.count(&e);
            }
        }
    }
    (samples, rejections)
}
