pub(crate) const LIGHTSPEED: f64 = 299_792_458.0;

// WGS84 ellipsoid
pub(crate) const WGS84_SEMI_MAJOR_M: f64 = 6_378_137.0;
pub(crate) const WGS84_FLATTENING: f64 = 1.0 / 298.257_223_563;

// GPS ICD values
pub(crate) const GM_M3_S2: f64 = 3.986_005e14;
pub(crate) const OMEGA_EARTH_RAD_S: f64 = 7.292_115_146_7e-5;

// Carrier frequencies [Hz]
pub(crate) const GPS_L1_HZ: f64 = 1_575.42e6;
pub(crate) const GPS_L2_HZ: f64 = 1_227.60e6;
pub(crate) const GPS_L5_HZ: f64 = 1_176.45e6;
