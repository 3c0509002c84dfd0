//! GNSS interferometric reflectometry: estimates the height of a
//! reflecting surface below a static antenna from multipath-induced SNR
//! oscillations.
//!
//! The pipeline is a batch transform per processing window: orbit data and
//! raw SNR observations go in, a quality-controlled reflector-height time
//! series comes out. Per-epoch and per-arc failures are recovered locally
//! and surfaced as diagnostic counts; only configuration-level problems
//! are fatal.

use crate::aggregation::{aggregate, AggregationRejections, SeriesEntry};
use crate::arcs::extraction::{ArcExtractor, ArcRejections};
use crate::arcs::Arc;
use crate::error::GnssirError;
use crate::estimation::{estimate, EstimationError, ReflectorHeight, Spectrum};
use crate::geometry::{geometry_table, GeometryRejections, OrbitSource};
use crate::utils::config::ProcessingConfig;
use crate::utils::obs::EpochObs;
use crate::utils::station::Station;
use chrono::NaiveDate;
use itertools::{Either, Itertools};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc as SharedArc;

pub mod aggregation;
pub mod arcs;
pub mod error;
pub mod estimation;
pub mod geometry;
pub mod utils;

/// Aggregate counts of everything the pipeline rejected, per reason.
/// Individual rejections are non-fatal; these totals keep the data loss
/// observable in the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub geometry: GeometryRejections,
    pub arcs: ArcRejections,
    /// Arcs whose periodogram peak did not clear the noise floor.
    pub no_significant_peak: usize,
    /// Arcs unsuitable for spectral estimation.
    pub degenerate_arcs: usize,
    pub aggregation: AggregationRejections,
}

impl Diagnostics {
    fn count_estimation(&mut self, err: &EstimationError) {
        match err {
            EstimationError::NoSignificantPeak { .. } => self.no_significant_peak += 1,
            EstimationError::DegenerateArc(_) => self.degenerate_arcs += 1,
        }
    }
}

/// Output of one processing window: the aggregated series, the
/// pre-aggregation estimates for diagnostic consumers, and the rejection
/// counts.
#[derive(Debug, Clone, PartialEq)]
pub struct DayReport {
    pub series: Vec<SeriesEntry>,
    pub estimates: Vec<ReflectorHeight>,
    pub diagnostics: Diagnostics,
}

/// Observations of one processing day in a multi-day batch.
#[derive(Debug, Clone)]
pub struct DayInput {
    pub date: NaiveDate,
    pub observations: Vec<EpochObs>,
}

/// Coarse-grained cancellation flag for multi-day batches, checked at day
/// granularity.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(SharedArc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

fn validate_inputs(
    station: &Station,
    config: &ProcessingConfig,
    observations: &[EpochObs],
) -> Result<(), GnssirError> {
    station.validate()?;
    config.validate()?;
    if observations.is_empty() {
        return Err(GnssirError::EmptyObservations);
    }
    Ok(())
}

fn extract(
    station: &Station,
    config: &ProcessingConfig,
    observations: &[EpochObs],
    orbit: &impl OrbitSource,
) -> (Vec<Arc>, GeometryRejections, ArcRejections) {
    let (geometry, geometry_rejections) = geometry_table(station, orbit, observations);
    let mut extractor = ArcExtractor::new(station, config, observations, &geometry);
    let arcs: Vec<Arc> = extractor.by_ref().collect();
    (arcs, geometry_rejections, extractor.rejections())
}

fn finish(
    arc_results: Vec<Result<ReflectorHeight, EstimationError>>,
    config: &ProcessingConfig,
    mut diagnostics: Diagnostics,
) -> DayReport {
    let (errors, estimates): (Vec<_>, Vec<_>) =
        arc_results.into_iter().partition_map(|res| match res {
            Err(e) => Either::Left(e),
            Ok(est) => Either::Right(est),
        });
    for err in &errors {
        diagnostics.count_estimation(err);
    }

    let (series, aggregation) = aggregate(&estimates, config);
    diagnostics.aggregation = aggregation;
    DayReport {
        series,
        estimates,
        diagnostics,
    }
}

/// Processes one day's observations into a reflector-height series.
///
/// # Errors
/// Will return `Err` only for configuration-level failures: an invalid
/// station or configuration, or an empty observation stream. Per-epoch
/// and per-arc failures are recovered and counted in the report's
/// diagnostics.
pub fn process_day<O: OrbitSource, S: Spectrum>(
    station: &Station,
    config: &ProcessingConfig,
    observations: &[EpochObs],
    orbit: &O,
    spectrum: &S,
) -> Result<DayReport, GnssirError> {
    validate_inputs(station, config, observations)?;
    let (arcs, geometry_rejections, arc_rejections) =
        extract(station, config, observations, orbit);

    let results: Vec<_> = arcs
        .iter()
        .map(|arc| estimate(arc, station, config, spectrum))
        .collect();

    let diagnostics = Diagnostics {
        geometry: geometry_rejections,
        arcs: arc_rejections,
        ..Default::default()
    };
    Ok(finish(results, config, diagnostics))
}

/// Processes one day's observations with per-arc estimation fanned out
/// across the rayon thread pool. Arcs share no mutable state and the
/// aggregation commutes, so the result equals the sequential run.
///
/// # Errors
/// Same contract as [`process_day`].
pub fn par_process_day<O: OrbitSource, S: Spectrum>(
    station: &Station,
    config: &ProcessingConfig,
    observations: &[EpochObs],
    orbit: &O,
    spectrum: &S,
) -> Result<DayReport, GnssirError> {
    validate_inputs(station, config, observations)?;
    let (arcs, geometry_rejections, arc_rejections) =
        extract(station, config, observations, orbit);

    let results: Vec<_> = arcs
        .par_iter()
        .map(|arc| estimate(arc, station, config, spectrum))
        .collect();

    let diagnostics = Diagnostics {
        geometry: geometry_rejections,
        arcs: arc_rejections,
        ..Default::default()
    };
    Ok(finish(results, config, diagnostics))
}

/// Processes a multi-day batch, honoring coarse-grained cancellation.
///
/// Days are processed in order; once the token is cancelled, remaining
/// days are abandoned and no partial report is emitted for them.
///
/// # Errors
/// Same contract as [`process_day`], for any day of the batch.
pub fn process_days<O: OrbitSource, S: Spectrum>(
    station: &Station,
    config: &ProcessingConfig,
    days: &[DayInput],
    orbit: &O,
    spectrum: &S,
    cancel: &CancelToken,
) -> Result<Vec<(NaiveDate, DayReport)>, GnssirError> {
    let mut reports = Vec::with_capacity(days.len());
    for day in days {
        if cancel.is_cancelled() {
            break;
        }
        let report = par_process_day(station, config, &day.observations, orbit, spectrum)?;
        reports.push((day.date, report));
    }
    Ok(reports)
}
