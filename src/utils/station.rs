use crate::error::GnssirError;
use crate::utils::constants::{
    GPS_L1_HZ, GPS_L2_HZ, GPS_L5_HZ, LIGHTSPEED, WGS84_FLATTENING, WGS84_SEMI_MAJOR_M,
};
use crate::utils::obs::Band;
use nalgebra::Vector3;

/// Carrier wavelengths [m] used to convert multipath frequency to height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavelengthTable {
    pub s1_m: f64,
    pub s2_m: f64,
    pub s5_m: f64,
}

impl WavelengthTable {
    pub fn get(&self, band: Band) -> f64 {
        match band {
            Band::S1 => self.s1_m,
            Band::S2 => self.s2_m,
            Band::S5 => self.s5_m,
        }
    }
}

impl Default for WavelengthTable {
    fn default() -> WavelengthTable {
        WavelengthTable {
            s1_m: LIGHTSPEED / GPS_L1_HZ,
            s2_m: LIGHTSPEED / GPS_L2_HZ,
            s5_m: LIGHTSPEED / GPS_L5_HZ,
        }
    }
}

/// Immutable station configuration for a processing run.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    /// Antenna phase center, ECEF [m].
    pub ecef_m: Vector3<f64>,
    /// Nominal antenna height above the reflector reference datum [m].
    pub reflector_datum_m: f64,
    /// Elevation mask [min, max] in degrees.
    pub elevation_mask_deg: (f64, f64),
    /// Allowed azimuth ranges in degrees; empty means all azimuths allowed.
    /// A range with start > end wraps through north.
    pub azimuth_mask_deg: Vec<(f64, f64)>,
    pub wavelengths: WavelengthTable,
}

impl Station {
    /// Geodetic latitude and longitude [rad] of the antenna, iterated from
    /// the ECEF position on the WGS84 ellipsoid.
    pub fn geodetic_rad(&self) -> (f64, f64) {
        let (x, y, z) = (self.ecef_m.x, self.ecef_m.y, self.ecef_m.z);
        let e2 = WGS84_FLATTENING * (2.0 - WGS84_FLATTENING);
        let p = (x * x + y * y).sqrt();
        let lon = y.atan2(x);

        let mut lat = (z / (p * (1.0 - e2))).atan();
        for _ in 0..10 {
            let sin_lat = lat.sin();
            let n = WGS84_SEMI_MAJOR_M / (1.0 - e2 * sin_lat * sin_lat).sqrt();
            let next = ((z + e2 * n * sin_lat) / p).atan();
            if (next - lat).abs() < 1e-13 {
                lat = next;
                break;
            }
            lat = next;
        }
        (lat, lon)
    }

    /// Whether a pointing direction passes the elevation and azimuth masks.
    pub fn accepts(&self, elevation_deg: f64, azimuth_deg: f64) -> bool {
        let (lo, hi) = self.elevation_mask_deg;
        if elevation_deg < lo || elevation_deg > hi {
            return false;
        }
        if self.azimuth_mask_deg.is_empty() {
            return true;
        }
        self.azimuth_mask_deg.iter().any(|&(start, end)| {
            if start <= end {
                azimuth_deg >= start && azimuth_deg <= end
            } else {
                // wraps through 360/0
                azimuth_deg >= start || azimuth_deg <= end
            }
        })
    }

    /// Validates the configuration. Invalid stations are fatal to a run.
    ///
    /// # Errors
    /// Will return `Err` if the ECEF position is not on Earth's surface
    /// neighborhood, the elevation mask is empty or out of range, or an
    /// azimuth bound lies outside [0, 360).
    pub fn validate(&self) -> Result<(), GnssirError> {
        let r = self.ecef_m.norm();
        if !(6.0e6..8.0e6).contains(&r) {
            return Err(GnssirError::InvalidStation(format!(
                "ECEF radius {r:.0} m is not a terrestrial position"
            )));
        }
        let (lo, hi) = self.elevation_mask_deg;
        if !(-90.0..=90.0).contains(&lo) || !(-90.0..=90.0).contains(&hi) || lo >= hi {
            return Err(GnssirError::InvalidStation(format!(
                "elevation mask [{lo}, {hi}] is empty or out of range"
            )));
        }
        for &(start, end) in &self.azimuth_mask_deg {
            if !(0.0..360.0).contains(&start) || !(0.0..360.0).contains(&end) {
                return Err(GnssirError::InvalidStation(format!(
                    "azimuth range [{start}, {end}] out of [0, 360)"
                )));
            }
        }
        for band in [Band::S1, Band::S2, Band::S5] {
            if self.wavelengths.get(band) <= 0.0 {
                return Err(GnssirError::InvalidStation(format!(
                    "non-positive wavelength for {band}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;

    fn test_station() -> Station {
        Station {
            // Hong Kong area, roughly
            ecef_m: Vector3::new(-2_414_266.0, 5_386_768.0, 2_407_783.0),
            reflector_datum_m: 10.0,
            elevation_mask_deg: (5.0, 25.0),
            azimuth_mask_deg: vec![],
            wavelengths: WavelengthTable::default(),
        }
    }

    #[test]
    fn geodetic_latitude_in_expected_range() {
        let (lat, lon) = test_station().geodetic_rad();
        assert!(lat.to_degrees() > 22.0 && lat.to_degrees() < 23.0);
        assert!(lon.to_degrees() > 113.0 && lon.to_degrees() < 115.0);
    }

    #[test]
    fn default_wavelengths_match_carriers() {
        let wl = WavelengthTable::default();
        assert!(is_close!(wl.s1_m, 0.1903, abs_tol = 1e-4));
        assert!(is_close!(wl.s2_m, 0.2442, abs_tol = 1e-4));
        assert!(is_close!(wl.s5_m, 0.2548, abs_tol = 1e-4));
    }

    #[test]
    fn azimuth_mask_wraps_through_north() {
        let mut sta = test_station();
        sta.azimuth_mask_deg = vec![(300.0, 60.0)];
        assert!(sta.accepts(10.0, 350.0));
        assert!(sta.accepts(10.0, 30.0));
        assert!(!sta.accepts(10.0, 180.0));
    }

    #[test]
    fn empty_elevation_mask_is_invalid() {
        let mut sta = test_station();
        sta.elevation_mask_deg = (25.0, 5.0);
        assert!(sta.validate().is_err());
    }
}
