//! Broadcast ephemeris Kepler solver.

use crate::geometry::{GeometryError, OrbitSource};
use crate::utils::constants::{GM_M3_S2, OMEGA_EARTH_RAD_S};
use crate::utils::obs::SatId;
use chrono::{DateTime, TimeZone, Utc};
use nalgebra::Vector3;
use std::collections::HashMap;

const MAX_KEPLER_ITER: usize = 30;
const KEPLER_TOLERANCE: f64 = 1e-10;

/// One broadcast navigation record: Keplerian elements plus the harmonic
/// perturbation corrections, referenced to the time of ephemeris `toe`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerEphemeris {
    pub toe: DateTime<Utc>,
    /// Square root of the semi-major axis [m^0.5].
    pub sqrt_a: f64,
    /// Eccentricity.
    pub e: f64,
    /// Inclination at toe [rad] and its rate [rad/s].
    pub i0: f64,
    pub i_dot: f64,
    /// Right ascension of the ascending node at toe [rad] and its rate.
    pub omega0: f64,
    pub omega_dot: f64,
    /// Argument of perigee [rad].
    pub omega: f64,
    /// Mean anomaly at toe [rad] and mean-motion correction [rad/s].
    pub m0: f64,
    pub delta_n: f64,
    /// Harmonic corrections to argument of latitude, radius, inclination.
    pub cuc: f64,
    pub cus: f64,
    pub crc: f64,
    pub crs: f64,
    pub cic: f64,
    pub cis: f64,
}

/// Seconds into the GPS week, counted from the 1980-01-06 GPS epoch.
fn gps_seconds_of_week(t: DateTime<Utc>) -> f64 {
    let gps_epoch = Utc.with_ymd_and_hms(1980, 1, 6, 0, 0, 0).unwrap();
    let elapsed = (t - gps_epoch).num_milliseconds() as f64 / 1000.0;
    elapsed.rem_euclid(604_800.0)
}

impl KeplerEphemeris {
    /// ECEF position [m] at time `t`, via the standard GPS-ICD Kepler
    /// solution with Earth-rotation correction.
    pub fn position(&self, t: DateTime<Utc>) -> Vector3<f64> {
        let a = self.sqrt_a * self.sqrt_a;
        let n0 = (GM_M3_S2 / a.powi(3)).sqrt();
        let n = n0 + self.delta_n;

        let t_k = (t - self.toe).num_milliseconds() as f64 / 1000.0;
        let m_k = self.m0 + n * t_k;

        // eccentric anomaly, fixed-point iteration
        let mut e_k = m_k;
        for _ in 0..MAX_KEPLER_ITER {
            let next = m_k + self.e * e_k.sin();
            if (next - e_k).abs() < KEPLER_TOLERANCE {
                e_k = next;
                break;
            }
            e_k = next;
        }

        let (sin_e_k, cos_e_k) = e_k.sin_cos();
        let v_k = ((1.0 - self.e * self.e).sqrt() * sin_e_k).atan2(cos_e_k - self.e);

        let phi_k = v_k + self.omega;
        let (sin_2phi, cos_2phi) = (2.0 * phi_k).sin_cos();

        let u_k = phi_k + self.cus * sin_2phi + self.cuc * cos_2phi;
        let r_k = a * (1.0 - self.e * cos_e_k) + self.crs * sin_2phi + self.crc * cos_2phi;
        let i_k = self.i0 + self.i_dot * t_k + self.cis * sin_2phi + self.cic * cos_2phi;

        // position in the orbital plane
        let (sin_u_k, cos_u_k) = u_k.sin_cos();
        let x_orb = r_k * cos_u_k;
        let y_orb = r_k * sin_u_k;

        // ascending node longitude, Earth rotation included
        let toe_sow = gps_seconds_of_week(self.toe);
        let omega_k = self.omega0 + (self.omega_dot - OMEGA_EARTH_RAD_S) * t_k
            - OMEGA_EARTH_RAD_S * toe_sow;

        let (sin_omega_k, cos_omega_k) = omega_k.sin_cos();
        let (sin_i_k, cos_i_k) = i_k.sin_cos();

        Vector3::new(
            x_orb * cos_omega_k - y_orb * cos_i_k * sin_omega_k,
            x_orb * sin_omega_k + y_orb * cos_i_k * cos_omega_k,
            y_orb * sin_i_k,
        )
    }
}

/// Broadcast navigation message: ephemeris records per satellite, with a
/// validity half-window bounding the usable record age.
#[derive(Debug, Clone)]
pub struct BroadcastEphemerides {
    records: HashMap<SatId, Vec<KeplerEphemeris>>,
    max_age_s: f64,
}

impl BroadcastEphemerides {
    pub fn new(max_age_s: f64) -> BroadcastEphemerides {
        BroadcastEphemerides {
            records: HashMap::new(),
            max_age_s,
        }
    }

    pub fn insert(&mut self, sat: SatId, eph: KeplerEphemeris) {
        self.records.entry(sat).or_default().push(eph);
    }

    /// The record closest in time to `t`, if within the validity window.
    fn select(&self, sat: SatId, t: DateTime<Utc>) -> Result<&KeplerEphemeris, GeometryError> {
        let records = self
            .records
            .get(&sat)
            .filter(|r| !r.is_empty())
            .ok_or(GeometryError::UnknownSatellite { sat })?;

        let age = |eph: &KeplerEphemeris| ((t - eph.toe).num_milliseconds() as f64 / 1000.0).abs();
        let best = records
            .iter()
            .min_by(|a, b| age(a).total_cmp(&age(b)))
            .expect("non-empty record list");

        let best_age = age(best);
        if best_age > self.max_age_s {
            return Err(GeometryError::StaleEphemeris {
                sat,
                age_s: best_age,
            });
        }
        Ok(best)
    }
}

impl OrbitSource for BroadcastEphemerides {
    fn position(&self, sat: SatId, t: DateTime<Utc>) -> Result<Vector3<f64>, GeometryError> {
        Ok(self.select(sat, t)?.position(t))
    }
}
