//! End-to-end pipeline scenarios over synthetic skies.

use chrono::{DateTime, Duration, TimeZone, Utc};
use gnssir::arcs::Direction;
use gnssir::estimation::LombScargle;
use gnssir::geometry::topocentric::line_of_sight;
use gnssir::geometry::{GeometryError, OrbitSource};
use gnssir::utils::config::ProcessingConfig;
use gnssir::utils::obs::{Band, Constellation, EpochObs, SatId};
use gnssir::utils::station::{Station, WavelengthTable};
use gnssir::{par_process_day, process_day, process_days, CancelToken, DayInput};
use nalgebra::Vector3;

const SAMPLING_S: i64 = 15;
const RANGE_M: f64 = 2.2e7;

fn station() -> Station {
    Station {
        ecef_m: Vector3::new(-2_414_266.0, 5_386_768.0, 2_407_783.0),
        reflector_datum_m: 10.0,
        elevation_mask_deg: (5.0, 25.0),
        azimuth_mask_deg: vec![],
        wavelengths: WavelengthTable::default(),
    }
}

fn config() -> ProcessingConfig {
    ProcessingConfig {
        sampling_interval: Duration::seconds(SAMPLING_S),
        min_arcs_per_bucket: 1,
        ..Default::default()
    }
}

fn day_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap()
}

/// Prescribes each satellite a linear elevation ramp at a fixed azimuth
/// and synthesizes ECEF positions consistent with those angles.
struct SyntheticSky {
    station: Station,
    t0: DateTime<Utc>,
    /// Degrees of elevation per second; negative sets.
    rate_deg_s: f64,
    start_elevation_deg: f64,
}

impl SyntheticSky {
    fn elevation_at(&self, t: DateTime<Utc>) -> f64 {
        let dt = (t - self.t0).num_milliseconds() as f64 / 1000.0;
        self.start_elevation_deg + self.rate_deg_s * dt
    }

    fn azimuth_for(sat: SatId) -> f64 {
        (40.0 * sat.prn as f64) % 360.0
    }
}

impl OrbitSource for SyntheticSky {
    fn position(&self, sat: SatId, t: DateTime<Utc>) -> Result<Vector3<f64>, GeometryError> {
        let elevation = self.elevation_at(t);
        let los = line_of_sight(&self.station, elevation, Self::azimuth_for(sat));
        Ok(self.station.ecef_m + los * RANGE_M)
    }
}

/// Wraps an orbit source with a stale-navigation outage window.
struct OutageSource<'a, O> {
    inner: &'a O,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl<O: OrbitSource> OrbitSource for OutageSource<'_, O> {
    fn position(&self, sat: SatId, t: DateTime<Utc>) -> Result<Vector3<f64>, GeometryError> {
        if t >= self.from && t < self.to {
            return Err(GeometryError::StaleEphemeris {
                sat,
                age_s: 9e4,
            });
        }
        self.inner.position(sat, t)
    }
}

/// SNR observations of `sat` with the multipath oscillation a reflector
/// at `height_m` imprints, plus a direct-signal trend.
fn multipath_obs(
    sky: &SyntheticSky,
    sat: SatId,
    height_m: f64,
    n: usize,
) -> Vec<EpochObs> {
    let wavelength = WavelengthTable::default().s1_m;
    let f0 = 2.0 * height_m / wavelength;
    (0..n)
        .map(|i| {
            let time = sky.t0 + Duration::seconds(SAMPLING_S * i as i64);
            let e = sky.elevation_at(time).to_radians();
            let snr = 30.0
                + 5.0 * e.sin()
                + 2.0 * (2.0 * std::f64::consts::PI * f0 * e.sin()).sin();
            EpochObs {
                time,
                sat,
                band: Band::S1,
                snr_dbhz: snr,
            }
        })
        .collect()
}

fn rising_sky() -> SyntheticSky {
    SyntheticSky {
        station: station(),
        t0: day_start() + Duration::hours(2),
        // 5 -> 25 degrees across 100 minutes
        rate_deg_s: 20.0 / 6000.0,
        start_elevation_deg: 5.0,
    }
}

#[test]
fn ten_meter_reflector_recovered_end_to_end() {
    let sky = rising_sky();
    let sat = SatId::new(Constellation::Gps, 3);
    let obs = multipath_obs(&sky, sat, 10.0, 400);
    let cfg = config();

    let report = process_day(&station(), &cfg, &obs, &sky, &LombScargle).unwrap();

    assert_eq!(report.estimates.len(), 1);
    let est = &report.estimates[0];
    assert_eq!(est.direction, Direction::Rising);
    assert!(
        (est.height_m - 10.0).abs() <= cfg.height_step_m,
        "height {}",
        est.height_m
    );
    assert!(est.peak_to_noise > cfg.min_peak_to_noise);

    assert_eq!(report.series.len(), 1);
    assert!((report.series[0].height_m - 10.0).abs() <= cfg.height_step_m);
    assert_eq!(report.series[0].arc_count, 1);
    assert_eq!(report.diagnostics.no_significant_peak, 0);
    assert_eq!(report.diagnostics.arcs.too_short, 0);
}

#[test]
fn parallel_run_matches_sequential() {
    let sky = rising_sky();
    let mut obs = Vec::new();
    for prn in [3, 8, 17] {
        obs.extend(multipath_obs(
            &sky,
            SatId::new(Constellation::Gps, prn),
            10.0,
            400,
        ));
    }
    obs.sort_by_key(|o| o.time);
    let cfg = config();

    let sequential = process_day(&station(), &cfg, &obs, &sky, &LombScargle).unwrap();
    let parallel = par_process_day(&station(), &cfg, &obs, &sky, &LombScargle).unwrap();
    assert_eq!(sequential.series, parallel.series);
    assert_eq!(sequential.diagnostics, parallel.diagnostics);
    assert_eq!(sequential.estimates.len(), parallel.estimates.len());
}

#[test]
fn three_satellites_aggregate_into_one_bucket() {
    let sky = rising_sky();
    let mut obs = Vec::new();
    for prn in [3, 8, 17] {
        obs.extend(multipath_obs(
            &sky,
            SatId::new(Constellation::Gps, prn),
            10.0,
            400,
        ));
    }
    obs.sort_by_key(|o| o.time);
    let cfg = ProcessingConfig {
        min_arcs_per_bucket: 3,
        ..config()
    };

    let report = par_process_day(&station(), &cfg, &obs, &sky, &LombScargle).unwrap();
    assert_eq!(report.estimates.len(), 3);
    assert_eq!(report.series.len(), 1);
    assert_eq!(report.series[0].arc_count, 3);
    assert!((report.series[0].height_m - 10.0).abs() <= cfg.height_step_m);
}

#[test]
fn navigation_outage_splits_the_arc_and_is_counted() {
    let sky = rising_sky();
    let sat = SatId::new(Constellation::Gps, 3);
    let obs = multipath_obs(&sky, sat, 10.0, 400);
    // 10-minute hole in the middle of the pass
    let outage = OutageSource {
        inner: &sky,
        from: sky.t0 + Duration::minutes(50),
        to: sky.t0 + Duration::minutes(60),
    };
    let cfg = config();

    let report = process_day(&station(), &cfg, &obs, &outage, &LombScargle).unwrap();
    assert!(report.diagnostics.geometry.stale_ephemeris >= 39);
    // both halves still resolve the same reflector
    assert_eq!(report.estimates.len(), 2);
    for est in &report.estimates {
        assert!((est.height_m - 10.0).abs() <= 5.0 * cfg.height_step_m);
    }
}

#[test]
fn fully_masked_azimuth_yields_no_arcs() {
    let sky = rising_sky();
    let sat = SatId::new(Constellation::Gps, 3);
    let obs = multipath_obs(&sky, sat, 10.0, 400);
    let mut sta = station();
    // PRN 3 sits at azimuth 120; allow only the opposite quadrant
    sta.azimuth_mask_deg = vec![(260.0, 320.0)];
    let report = process_day(&sta, &config(), &obs, &sky, &LombScargle).unwrap();
    assert!(report.estimates.is_empty());
    assert!(report.series.is_empty());
}

#[test]
fn empty_observation_stream_is_fatal() {
    let sky = rising_sky();
    let res = process_day(&station(), &config(), &[], &sky, &LombScargle);
    assert!(res.is_err());
}

#[test]
fn cancelled_batch_emits_no_partial_reports() {
    let sky = rising_sky();
    let sat = SatId::new(Constellation::Gps, 3);
    let days = vec![DayInput {
        date: day_start().date_naive(),
        observations: multipath_obs(&sky, sat, 10.0, 400),
    }];
    let cancel = CancelToken::new();
    cancel.cancel();
    let reports =
        process_days(&station(), &config(), &days, &sky, &LombScargle, &cancel).unwrap();
    assert!(reports.is_empty());
}
