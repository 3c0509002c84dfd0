//! Station-relative pointing angles from ECEF positions.

use crate::utils::station::Station;
use nalgebra::{Matrix3, Vector3};

/// Rotation from ECEF into the local east-north-up frame at the given
/// geodetic latitude/longitude [rad].
pub(crate) fn enu_rotation(lat: f64, lon: f64) -> Matrix3<f64> {
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    Matrix3::new(
        -sin_lon,
        cos_lon,
        0.0,
        -sin_lat * cos_lon,
        -sin_lat * sin_lon,
        cos_lat,
        cos_lat * cos_lon,
        cos_lat * sin_lon,
        sin_lat,
    )
}

/// Elevation and azimuth [deg] of a satellite as seen from the station.
///
/// Elevation is the arcsine of the up-component of the unit line-of-sight
/// in the local frame; azimuth is atan2(east, north) normalized to
/// [0, 360).
pub fn elevation_azimuth(station: &Station, sat_ecef_m: &Vector3<f64>) -> (f64, f64) {
    let (lat, lon) = station.geodetic_rad();
    let los = (sat_ecef_m - station.ecef_m).normalize();
    let enu = enu_rotation(lat, lon) * los;

    let elevation = enu.z.clamp(-1.0, 1.0).asin().to_degrees();
    let mut azimuth = enu.x.atan2(enu.y).to_degrees();
    if azimuth < 0.0 {
        azimuth += 360.0;
    }
    (elevation, azimuth)
}

/// Reconstructs the ECEF line-of-sight unit vector from elevation/azimuth
/// [deg]. Inverse of [`elevation_azimuth`] up to numerical tolerance.
pub fn line_of_sight(station: &Station, elevation_deg: f64, azimuth_deg: f64) -> Vector3<f64> {
    let (lat, lon) = station.geodetic_rad();
    let el = elevation_deg.to_radians();
    let az = azimuth_deg.to_radians();
    let enu = Vector3::new(
        el.cos() * az.sin(),
        el.cos() * az.cos(),
        el.sin(),
    );
    enu_rotation(lat, lon).transpose() * enu
}
