//! Lomb-Scargle periodogram for unevenly sampled data.

/// Capability seam for the spectral primitive: the pipeline only needs
/// power evaluated on a fixed frequency grid, so a vetted external
/// periodogram can be substituted here.
pub trait Spectrum: Sync {
    /// Spectral power of `y` over abscissa `x` at each of `freqs`
    /// [cycles per unit of `x`], aligned with `freqs`.
    fn power(&self, x: &[f64], y: &[f64], freqs: &[f64]) -> Vec<f64>;
}

/// Classic Lomb-Scargle estimator, Scargle-1982 normalization, with the
/// tau phase shift making it invariant to time-origin translation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LombScargle;

impl Spectrum for LombScargle {
    fn power(&self, x: &[f64], y: &[f64], freqs: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), y.len());
        if x.is_empty() {
            return vec![0.0; freqs.len()];
        }
        let n = y.len() as f64;
        let mean = y.iter().sum::<f64>() / n;
        let centered: Vec<f64> = y.iter().map(|v| v - mean).collect();

        freqs
            .iter()
            .map(|&f| single_frequency_power(x, &centered, f))
            .collect()
    }
}

fn single_frequency_power(x: &[f64], y_centered: &[f64], freq: f64) -> f64 {
    const EPS: f64 = 1e-15;
    if freq.abs() < EPS {
        return 0.0;
    }
    let omega = 2.0 * std::f64::consts::PI * freq;

    // tau from the double-angle sums, via sin(2a) = 2 sin a cos a and
    // cos(2a) = cos^2 a - sin^2 a
    let (mut sum_sin2, mut sum_cos2) = (0.0_f64, 0.0_f64);
    for &t in x {
        let (s, c) = (omega * t).sin_cos();
        sum_sin2 += 2.0 * s * c;
        sum_cos2 += c * c - s * s;
    }
    let omega_tau = 0.5 * sum_sin2.atan2(sum_cos2);
    let (sin_tau, cos_tau) = omega_tau.sin_cos();

    let (mut yc, mut ys) = (0.0_f64, 0.0_f64);
    let (mut cc, mut ss) = (0.0_f64, 0.0_f64);
    for (&t, &yv) in x.iter().zip(y_centered) {
        let (s, c) = (omega * t).sin_cos();
        let s_shift = s * cos_tau - c * sin_tau;
        let c_shift = c * cos_tau + s * sin_tau;
        yc += yv * c_shift;
        ys += yv * s_shift;
        cc += c_shift * c_shift;
        ss += s_shift * s_shift;
    }

    let pc = if cc > EPS { yc * yc / cc } else { 0.0 };
    let ps = if ss > EPS { ys * ys / ss } else { 0.0 };
    0.5 * (pc + ps)
}
