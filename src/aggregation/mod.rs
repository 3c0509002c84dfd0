//! Cross-arc quality control and the daily/subdaily output series.

use crate::estimation::ReflectorHeight;
use crate::utils::config::ProcessingConfig;
use chrono::{DateTime, Utc};
use log::debug;
use std::collections::BTreeMap;

/// Scale factor making the median absolute deviation consistent with a
/// Gaussian standard deviation.
const MAD_TO_SIGMA: f64 = 1.4826;

/// One entry of the output time series: the robust aggregate of all
/// surviving arcs inside one time bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesEntry {
    pub bucket_start: DateTime<Utc>,
    /// Median reflector height of the surviving arcs [m].
    pub height_m: f64,
    pub arc_count: usize,
    /// Scaled median absolute deviation of the surviving heights [m].
    pub dispersion_m: f64,
}

/// Counts of estimates and buckets dropped during aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationRejections {
    /// Estimates outside the peak-to-noise or amplitude bounds.
    pub quality_gate: usize,
    /// Estimates rejected as statistical outliers within their bucket.
    pub outliers: usize,
    /// Buckets omitted for having fewer than the minimum surviving arcs.
    pub thin_buckets: usize,
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

/// Scaled MAD about the median of an already-sorted slice.
fn mad(sorted: &[f64], center: f64) -> f64 {
    let mut deviations: Vec<f64> = sorted.iter().map(|h| (h - center).abs()).collect();
    deviations.sort_by(f64::total_cmp);
    MAD_TO_SIGMA * median(&deviations)
}

/// Reduces all estimates of one processing window to the output series.
///
/// Estimates are bucketed by time, gated on quality bounds, cleaned of
/// outliers via the scaled MAD (robust against the heavy tails of
/// multipath estimates), and aggregated with the median. Buckets with too
/// few survivors are omitted rather than zero-filled.
///
/// The reduction is commutative: permuting the input never changes the
/// output, so parallel upstream stages need no ordering.
pub fn aggregate(
    estimates: &[ReflectorHeight],
    config: &ProcessingConfig,
) -> (Vec<SeriesEntry>, AggregationRejections) {
    let mut rejections = AggregationRejections::default();
    let width = config.bucket_seconds as i64;

    let mut buckets: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for est in estimates {
        if est.peak_to_noise < config.min_peak_to_noise
            || est.amplitude < config.min_amplitude
            || est.amplitude > config.max_amplitude
        {
            debug!(
                "{}/{}: quality gate rejects estimate (pnr {:.2}, amplitude {:.2})",
                est.sat, est.band, est.peak_to_noise, est.amplitude
            );
            rejections.quality_gate += 1;
            continue;
        }
        let key = est.time.timestamp().div_euclid(width);
        buckets.entry(key).or_default().push(est.height_m);
    }

    let mut series = Vec::new();
    for (key, mut heights) in buckets {
        heights.sort_by(f64::total_cmp);
        let center = median(&heights);
        let spread = mad(&heights, center);

        let survivors: Vec<f64> = if spread > 0.0 {
            heights
                .iter()
                .copied()
                .filter(|h| (h - center).abs() <= config.outlier_mad_factor * spread)
                .collect()
        } else {
            heights.clone()
        };
        rejections.outliers += heights.len() - survivors.len();

        if survivors.len() < config.min_arcs_per_bucket {
            rejections.thin_buckets += 1;
            continue;
        }

        let height_m = median(&survivors);
        let dispersion_m = mad(&survivors, height_m);
        series.push(SeriesEntry {
            bucket_start: DateTime::from_timestamp(key * width, 0).unwrap_or_default(),
            height_m,
            arc_count: survivors.len(),
            dispersion_m,
        });
    }
    (series, rejections)
}
