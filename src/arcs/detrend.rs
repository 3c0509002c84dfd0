//! Low-order polynomial detrending of arc SNR sequences.

use nalgebra::{DMatrix, DVector};

/// Least-squares polynomial coefficients (ascending order) of `y` over
/// `x`, or `None` when the system is degenerate.
pub(crate) fn polyfit(x: &[f64], y: &[f64], order: usize) -> Option<Vec<f64>> {
    if x.len() != y.len() || x.len() <= order {
        return None;
    }
    let vandermonde = DMatrix::from_fn(x.len(), order + 1, |row, col| x[row].powi(col as i32));
    let rhs = DVector::from_column_slice(y);
    let svd = vandermonde.svd(true, true);
    svd.solve(&rhs, 1e-12).ok().map(|c| c.as_slice().to_vec())
}

fn eval_poly(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// Subtracts a fitted polynomial of the given order from `y`, removing the
/// direct-signal amplitude trend and leaving the multipath oscillation.
///
/// The abscissa is the sample index mapped onto [-1, 1] for conditioning.
/// Returns `None` when the fit is degenerate (too few samples).
pub(crate) fn detrend(y: &[f64], order: usize) -> Option<Vec<f64>> {
    let n = y.len();
    if n <= order {
        return None;
    }
    let scale = if n > 1 { (n - 1) as f64 } else { 1.0 };
    let x: Vec<f64> = (0..n).map(|i| 2.0 * i as f64 / scale - 1.0).collect();
    let coeffs = polyfit(&x, y, order)?;
    Some(
        x.iter()
            .zip(y.iter())
            .map(|(&xi, &yi)| yi - eval_poly(&coeffs, xi))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;

    #[test]
    fn polyfit_recovers_quadratic_coefficients() {
        let x: Vec<f64> = (0..50).map(|i| i as f64 / 10.0).collect();
        let y: Vec<f64> = x.iter().map(|&xi| 3.0 - 2.0 * xi + 0.5 * xi * xi).collect();
        let c = polyfit(&x, &y, 2).unwrap();
        assert!(is_close!(c[0], 3.0, abs_tol = 1e-9));
        assert!(is_close!(c[1], -2.0, abs_tol = 1e-9));
        assert!(is_close!(c[2], 0.5, abs_tol = 1e-9));
    }

    #[test]
    fn detrend_removes_trend_and_keeps_oscillation() {
        let n = 200;
        let y: Vec<f64> = (0..n)
            .map(|i| {
                let t = i as f64 / n as f64;
                40.0 + 5.0 * t + (40.0 * t).sin()
            })
            .collect();
        let residual = detrend(&y, 1).unwrap();
        let mean = residual.iter().sum::<f64>() / n as f64;
        assert!(mean.abs() < 1e-9);
        // oscillation survives
        let rms = (residual.iter().map(|r| r * r).sum::<f64>() / n as f64).sqrt();
        assert!(rms > 0.5, "rms {rms}");
    }

    #[test]
    fn degenerate_fit_reports_none() {
        assert!(detrend(&[1.0, 2.0], 3).is_none());
    }
}
