//! Precise-orbit positions by Lagrange interpolation over tabulated
//! ECEF samples.

use crate::geometry::{GeometryError, OrbitSource};
use crate::utils::obs::SatId;
use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use std::collections::HashMap;

/// Time-tagged ECEF sample of one satellite's trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitSample {
    pub time: DateTime<Utc>,
    pub ecef_m: Vector3<f64>,
}

/// Precise orbit table, e.g. loaded from an SP3 product by an external
/// reader. Samples are kept time-sorted per satellite.
#[derive(Debug, Clone)]
pub struct PreciseOrbit {
    samples: HashMap<SatId, Vec<OrbitSample>>,
    /// Number of bracketing samples per interpolation.
    interp_points: usize,
}

impl PreciseOrbit {
    pub fn new(interp_points: usize) -> PreciseOrbit {
        PreciseOrbit {
            samples: HashMap::new(),
            interp_points,
        }
    }

    pub fn insert(&mut self, sat: SatId, sample: OrbitSample) {
        let series = self.samples.entry(sat).or_default();
        series.push(sample);
        series.sort_by_key(|s| s.time);
    }

    pub fn extend<I: IntoIterator<Item = OrbitSample>>(&mut self, sat: SatId, iter: I) {
        let series = self.samples.entry(sat).or_default();
        series.extend(iter);
        series.sort_by_key(|s| s.time);
    }

    /// Window of `interp_points` samples centered on `t`, or an error when
    /// the table cannot bracket it.
    fn window(&self, sat: SatId, t: DateTime<Utc>) -> Result<&[OrbitSample], GeometryError> {
        let series = self
            .samples
            .get(&sat)
            .filter(|s| !s.is_empty())
            .ok_or(GeometryError::UnknownSatellite { sat })?;

        let need = self.interp_points;
        if series.len() < need {
            return Err(GeometryError::InsufficientOrbitSamples {
                sat,
                have: series.len(),
                need,
            });
        }
        if t < series[0].time || t > series[series.len() - 1].time {
            return Err(GeometryError::InsufficientOrbitSamples {
                sat,
                have: 0,
                need,
            });
        }

        // first sample at or after t
        let split = series.partition_point(|s| s.time < t);
        let half = need / 2;
        let start = split
            .saturating_sub(half)
            .min(series.len() - need);
        Ok(&series[start..start + need])
    }

    fn interpolate(window: &[OrbitSample], t: DateTime<Utc>) -> Vector3<f64> {
        let t0 = window[0].time;
        let xs: Vec<f64> = window
            .iter()
            .map(|s| (s.time - t0).num_milliseconds() as f64 / 1000.0)
            .collect();
        let x = (t - t0).num_milliseconds() as f64 / 1000.0;

        let mut pos = Vector3::zeros();
        for (j, sample) in window.iter().enumerate() {
            let mut weight = 1.0;
            for (k, &xk) in xs.iter().enumerate() {
                if k != j {
                    weight *= (x - xk) / (xs[j] - xk);
                }
            }
            pos += sample.ecef_m * weight;
        }
        pos
    }
}

impl OrbitSource for PreciseOrbit {
    fn position(&self, sat: SatId, t: DateTime<Utc>) -> Result<Vector3<f64>, GeometryError> {
        let window = self.window(sat, t)?;
        Ok(Self::interpolate(window, t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::obs::Constellation;
    use chrono::{Duration, TimeZone};

    fn sat() -> SatId {
        SatId::new(Constellation::Gps, 12)
    }

    /// Tabulates a quadratic trajectory, which low-order Lagrange
    /// interpolation reproduces exactly.
    fn quadratic_table(n: usize) -> (PreciseOrbit, DateTime<Utc>) {
        let t0 = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        let mut orbit = PreciseOrbit::new(5);
        orbit.extend(
            sat(),
            (0..n).map(|i| {
                let dt = 900.0 * i as f64;
                OrbitSample {
                    time: t0 + Duration::seconds(900 * i as i64),
                    ecef_m: Vector3::new(
                        2.0e7 + 100.0 * dt - 0.001 * dt * dt,
                        1.0e7 - 50.0 * dt,
                        3.0e6 + 0.002 * dt * dt,
                    ),
                }
            }),
        );
        (orbit, t0)
    }

    #[test]
    fn interpolation_reproduces_quadratic_motion() {
        let (orbit, t0) = quadratic_table(12);
        let t = t0 + Duration::seconds(4 * 900 + 333);
        let dt = (t - t0).num_milliseconds() as f64 / 1000.0;
        let expected = Vector3::new(
            2.0e7 + 100.0 * dt - 0.001 * dt * dt,
            1.0e7 - 50.0 * dt,
            3.0e6 + 0.002 * dt * dt,
        );
        let pos = orbit.position(sat(), t).unwrap();
        assert!((pos - expected).norm() < 1e-6, "{:e}", (pos - expected).norm());
    }

    #[test]
    fn too_few_samples_are_rejected() {
        let (orbit, t0) = quadratic_table(3);
        let res = orbit.position(sat(), t0 + Duration::seconds(900));
        assert!(matches!(
            res,
            Err(GeometryError::InsufficientOrbitSamples { need: 5, .. })
        ));
    }

    #[test]
    fn extrapolation_is_rejected() {
        let (orbit, t0) = quadratic_table(12);
        let res = orbit.position(sat(), t0 - Duration::seconds(1));
        assert!(matches!(
            res,
            Err(GeometryError::InsufficientOrbitSamples { .. })
        ));
    }
}
