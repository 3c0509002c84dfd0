use chrono::{DateTime, Utc};
use std::fmt;

/// GNSS constellation of a satellite id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Constellation {
    Gps,
    Glonass,
    Galileo,
    BeiDou,
}

impl fmt::Display for Constellation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Constellation::Gps => 'G',
            Constellation::Glonass => 'R',
            Constellation::Galileo => 'E',
            Constellation::BeiDou => 'C',
        };
        write!(f, "{c}")
    }
}

/// Satellite identifier: constellation plus PRN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SatId {
    pub constellation: Constellation,
    pub prn: u8,
}

impl SatId {
    pub fn new(constellation: Constellation, prn: u8) -> SatId {
        SatId { constellation, prn }
    }
}

impl fmt::Display for SatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.constellation, self.prn)
    }
}

/// SNR frequency band, following the RINEX S-observable naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Band {
    S1,
    S2,
    S5,
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Band::S1 => write!(f, "S1"),
            Band::S2 => write!(f, "S2"),
            Band::S5 => write!(f, "S5"),
        }
    }
}

/// One raw SNR observation. Unique per (sat, band, time); immutable once
/// parsed by the upstream reader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochObs {
    pub time: DateTime<Utc>,
    pub sat: SatId,
    pub band: Band,
    pub snr_dbhz: f64,
}

/// Station-relative pointing angles for one satellite at one epoch.
/// Elevation in [-90, 90] degrees, azimuth in [0, 360).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometrySample {
    pub time: DateTime<Utc>,
    pub sat: SatId,
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
}
