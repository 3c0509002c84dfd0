use crate::error::GnssirError;
use chrono::Duration;

/// Run-time processing configuration, threaded explicitly through every
/// stage. Thresholds deliberately live here rather than as constants in the
/// algorithm bodies.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingConfig {
    /// Nominal observation sampling interval.
    pub sampling_interval: Duration,
    /// An arc splits on any time gap larger than this multiple of the
    /// nominal sampling interval.
    pub gap_factor: u32,
    /// Arcs with fewer samples are discarded.
    pub min_arc_samples: usize,
    /// Arcs spanning fewer degrees of elevation are discarded.
    pub min_elevation_span_deg: f64,
    /// Order of the polynomial removed from each arc's SNR sequence.
    pub detrend_order: usize,

    /// Reflector height search range [m] and grid step [m]. The step bounds
    /// the height-estimate precision.
    pub height_min_m: f64,
    pub height_max_m: f64,
    pub height_step_m: f64,
    /// Half-width [m] of the spectral guard band excluded from the noise
    /// floor around the peak.
    pub guard_band_m: f64,
    /// Minimum peak-to-noise ratio for an arc to yield an estimate.
    pub min_peak_to_noise: f64,

    /// Aggregation quality gates on the spectral peak amplitude.
    pub min_amplitude: f64,
    pub max_amplitude: f64,
    /// Outliers beyond this multiple of the scaled MAD are rejected.
    pub outlier_mad_factor: f64,
    /// Time-bucket width of the output series, in seconds of UTC day.
    pub bucket_seconds: u32,
    /// Buckets with fewer surviving arcs are omitted from the series.
    pub min_arcs_per_bucket: usize,

    /// Broadcast ephemeris validity half-window [s].
    pub ephemeris_max_age_s: f64,
    /// Number of bracketing samples used for precise-orbit interpolation.
    pub orbit_interp_points: usize,
}

impl Default for ProcessingConfig {
    fn default() -> ProcessingConfig {
        ProcessingConfig {
            sampling_interval: Duration::seconds(30),
            gap_factor: 3,
            min_arc_samples: 20,
            min_elevation_span_deg: 5.0,
            detrend_order: 2,
            height_min_m: 0.5,
            height_max_m: 20.0,
            height_step_m: 0.005,
            guard_band_m: 0.25,
            min_peak_to_noise: 2.7,
            min_amplitude: 0.0,
            max_amplitude: f64::INFINITY,
            outlier_mad_factor: 3.0,
            bucket_seconds: 86_400,
            min_arcs_per_bucket: 3,
            ephemeris_max_age_s: 7_200.0,
            orbit_interp_points: 9,
        }
    }
}

impl ProcessingConfig {
    /// Validates the configuration. Invalid configurations are fatal.
    ///
    /// # Errors
    /// Will return `Err` if the height search grid is empty or degenerate,
    /// a gate is non-positive where positivity is required, or the bucket
    /// width does not divide a UTC day.
    pub fn validate(&self) -> Result<(), GnssirError> {
        if self.sampling_interval <= Duration::zero() {
            return Err(GnssirError::InvalidConfig(
                "sampling interval must be positive".to_string(),
            ));
        }
        if self.gap_factor == 0 {
            return Err(GnssirError::InvalidConfig(
                "gap factor must be at least 1".to_string(),
            ));
        }
        if self.min_arc_samples < 2 {
            return Err(GnssirError::InvalidConfig(
                "minimum arc length must be at least 2 samples".to_string(),
            ));
        }
        if self.height_step_m <= 0.0
            || self.height_min_m <= 0.0
            || self.height_max_m <= self.height_min_m + self.height_step_m
        {
            return Err(GnssirError::InvalidConfig(format!(
                "height grid [{}, {}] step {} is empty or degenerate",
                self.height_min_m, self.height_max_m, self.height_step_m
            )));
        }
        if self.min_peak_to_noise <= 0.0 {
            return Err(GnssirError::InvalidConfig(
                "minimum peak-to-noise must be positive".to_string(),
            ));
        }
        if self.bucket_seconds == 0 || 86_400 % self.bucket_seconds != 0 {
            return Err(GnssirError::InvalidConfig(format!(
                "bucket width {} s must divide the UTC day",
                self.bucket_seconds
            )));
        }
        if self.orbit_interp_points < 2 {
            return Err(GnssirError::InvalidConfig(
                "orbit interpolation needs at least 2 points".to_string(),
            ));
        }
        Ok(())
    }

    /// Largest tolerated time gap inside one arc.
    pub fn max_gap(&self) -> Duration {
        self.sampling_interval * self.gap_factor as i32
    }
}
