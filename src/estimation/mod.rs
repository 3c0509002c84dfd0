//! Per-arc reflector height estimation.

pub mod lombscargle;

pub use lombscargle::{LombScargle, Spectrum};

use crate::arcs::{Arc, Direction};
use crate::utils::config::ProcessingConfig;
use crate::utils::obs::{Band, SatId};
use crate::utils::station::Station;
use chrono::{DateTime, Utc};
use thiserror::Error;

type Result<T> = std::result::Result<T, EstimationError>;

/// Per-arc estimation failures. Recovered by excluding the arc from
/// aggregation; never fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimationError {
    /// Spectral peak does not stand out from the noise floor
    #[error("no significant peak: peak-to-noise {peak_to_noise:.2}")]
    NoSignificantPeak { peak_to_noise: f64 },

    /// Arc content unsuitable for spectral estimation
    #[error("degenerate arc: {0}")]
    DegenerateArc(String),
}

/// One reflector height estimate with its quality metrics. Immutable once
/// created; aggregation reads, never mutates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReflectorHeight {
    pub sat: SatId,
    pub band: Band,
    pub direction: Direction,
    /// Arc midpoint; tags the estimate in the output series.
    pub time: DateTime<Utc>,
    /// Vertical distance antenna phase center to reflector [m].
    pub height_m: f64,
    /// Spectral peak amplitude in SNR units.
    pub amplitude: f64,
    /// Peak power over the mean power outside the guard band.
    pub peak_to_noise: f64,
}

/// Candidate reflector heights and the matching periodogram frequencies
/// for one carrier wavelength. The multipath oscillation frequency in the
/// sin(elevation) domain is 2h/lambda.
fn height_grid(config: &ProcessingConfig, wavelength_m: f64) -> (Vec<f64>, Vec<f64>) {
    let steps = ((config.height_max_m - config.height_min_m) / config.height_step_m) as usize;
    let heights: Vec<f64> = (0..=steps)
        .map(|i| config.height_min_m + i as f64 * config.height_step_m)
        .collect();
    let freqs = heights.iter().map(|h| 2.0 * h / wavelength_m).collect();
    (heights, freqs)
}

/// Estimates the reflector height of one detrended arc.
///
/// The periodogram of detrended SNR over sin(elevation) is evaluated on
/// the configured height grid; the global maximum is converted back to
/// meters via h = f * lambda / 2. The peak-to-noise ratio excludes a
/// guard band around the peak from the noise floor and gates acceptance.
///
/// # Errors
/// Will return `Err` if the arc cannot support spectral estimation or the
/// peak-to-noise ratio is below the configured minimum.
pub fn estimate<S: Spectrum>(
    arc: &Arc,
    station: &Station,
    config: &ProcessingConfig,
    spectrum: &S,
) -> Result<ReflectorHeight> {
    let wavelength_m = station.wavelengths.get(arc.band);
    let (heights, freqs) = height_grid(config, wavelength_m);

    let x: Vec<f64> = arc
        .samples
        .iter()
        .map(|s| s.elevation_deg.to_radians().sin())
        .collect();
    let y: Vec<f64> = arc.samples.iter().map(|s| s.snr).collect();
    if x.len() < 2 {
        return Err(EstimationError::DegenerateArc(format!(
            "{} samples",
            x.len()
        )));
    }

    let power = spectrum.power(&x, &y, &freqs);

    let (peak_idx, peak_power) = power
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or_else(|| EstimationError::DegenerateArc("empty height grid".to_string()))?;
    if !peak_power.is_finite() || peak_power <= 0.0 {
        return Err(EstimationError::DegenerateArc(
            "no spectral power in search range".to_string(),
        ));
    }

    let height_m = heights[peak_idx];
    let noise: Vec<f64> = heights
        .iter()
        .zip(&power)
        .filter(|(h, _)| (**h - height_m).abs() > config.guard_band_m)
        .map(|(_, &p)| p)
        .collect();
    if noise.is_empty() {
        return Err(EstimationError::DegenerateArc(
            "guard band covers the whole search range".to_string(),
        ));
    }
    let noise_floor = noise.iter().sum::<f64>() / noise.len() as f64;
    let peak_to_noise = if noise_floor > 0.0 {
        peak_power / noise_floor
    } else {
        f64::INFINITY
    };

    if peak_to_noise < config.min_peak_to_noise {
        return Err(EstimationError::NoSignificantPeak { peak_to_noise });
    }

    let amplitude = 2.0 * (peak_power / x.len() as f64).sqrt();
    Ok(ReflectorHeight {
        sat: arc.sat,
        band: arc.band,
        direction: arc.direction,
        time: arc.midpoint_time(),
        height_m,
        amplitude,
        peak_to_noise,
    })
}
