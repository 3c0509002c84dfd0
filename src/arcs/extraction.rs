//! Arc segmentation over the joined observation/geometry stream.

use crate::arcs::{detrend, Arc, ArcSample, Direction};
use crate::utils::config::ProcessingConfig;
use crate::utils::obs::{Band, EpochObs, GeometrySample, SatId};
use crate::utils::station::Station;
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use log::debug;
use std::collections::{HashMap, VecDeque};

/// Counts of arcs and epochs discarded during extraction, per reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArcRejections {
    /// Arcs below the minimum sample count.
    pub too_short: usize,
    /// Arcs below the minimum elevation span.
    pub low_span: usize,
    /// Arcs whose polynomial detrend was degenerate.
    pub detrend_failed: usize,
    /// Epochs discarded as duplicate timestamps or elevation ties.
    pub duplicate_epochs: usize,
}

#[derive(Debug, Clone, Copy)]
struct RawSample {
    time: DateTime<Utc>,
    elevation_deg: f64,
    azimuth_deg: f64,
    snr: f64,
}

type SeriesKey = (SatId, Band);

/// Lazy, finite, non-restartable sequence of [`Arc`]s.
///
/// Walks each (satellite, band) series in time order and closes the open
/// buffer on direction reversal, a time gap above the configured threshold,
/// or a mask exit. Closed buffers below the minimum sample count or
/// elevation span are counted and dropped. Retained arcs are emitted with
/// the SNR trend already removed.
///
/// Extraction is deterministic: the same input always yields bit-identical
/// arcs, in the same order.
pub struct ArcExtractor {
    series: VecDeque<(SeriesKey, Vec<RawSample>)>,
    current: Option<(SeriesKey, Vec<RawSample>)>,
    cursor: usize,
    buf: Vec<RawSample>,
    direction: Option<Direction>,
    max_gap: Duration,
    min_samples: usize,
    min_span_deg: f64,
    detrend_order: usize,
    rejections: ArcRejections,
}

impl ArcExtractor {
    pub fn new(
        station: &Station,
        config: &ProcessingConfig,
        observations: &[EpochObs],
        geometry: &[GeometrySample],
    ) -> ArcExtractor {
        let lookup: HashMap<(SatId, DateTime<Utc>), (f64, f64)> = geometry
            .iter()
            .map(|g| ((g.sat, g.time), (g.elevation_deg, g.azimuth_deg)))
            .collect();

        let mut rejections = ArcRejections::default();
        let mut grouped: IndexMap<SeriesKey, Vec<RawSample>> = IndexMap::new();
        for obs in observations {
            // epochs without geometry were dropped upstream; the resulting
            // hole is handled by the gap check
            let Some(&(elevation_deg, azimuth_deg)) = lookup.get(&(obs.sat, obs.time)) else {
                continue;
            };
            let series = grouped.entry((obs.sat, obs.band)).or_default();
            // duplicate timestamps keep the first-seen sample, never an
            // average, so cycle slips stay visible
            if series.last().is_some_and(|prev| prev.time >= obs.time) {
                rejections.duplicate_epochs += 1;
                continue;
            }
            if station.accepts(elevation_deg, azimuth_deg) {
                series.push(RawSample {
                    time: obs.time,
                    elevation_deg,
                    azimuth_deg,
                    snr: obs.snr_dbhz,
                });
            } else {
                // mask exit: encode as a gap so the open buffer closes
                series.push(RawSample {
                    time: obs.time,
                    elevation_deg: f64::NAN,
                    azimuth_deg: f64::NAN,
                    snr: f64::NAN,
                });
            }
        }

        ArcExtractor {
            series: grouped.into_iter().collect(),
            current: None,
            cursor: 0,
            buf: Vec::new(),
            direction: None,
            max_gap: config.max_gap(),
            min_samples: config.min_arc_samples,
            min_span_deg: config.min_elevation_span_deg,
            detrend_order: config.detrend_order,
            rejections,
        }
    }

    /// Rejection counters; read after the iterator is drained.
    pub fn rejections(&self) -> ArcRejections {
        self.rejections
    }

    /// Closes the open buffer, returning an arc when it survives the
    /// length/span guards and detrending.
    fn flush(&mut self, key: SeriesKey) -> Option<Arc> {
        let buf = std::mem::take(&mut self.buf);
        let direction = self.direction.take();

        if buf.len() < self.min_samples {
            if !buf.is_empty() {
                debug!(
                    "{}/{}: dropping {}-sample arc below minimum {}",
                    key.0,
                    key.1,
                    buf.len(),
                    self.min_samples
                );
                self.rejections.too_short += 1;
            }
            return None;
        }
        let span = (buf[buf.len() - 1].elevation_deg - buf[0].elevation_deg).abs();
        if span < self.min_span_deg {
            debug!(
                "{}/{}: dropping arc spanning {span:.1} deg below minimum {}",
                key.0, key.1, self.min_span_deg
            );
            self.rejections.low_span += 1;
            return None;
        }
        let direction = direction?;

        let snr: Vec<f64> = buf.iter().map(|s| s.snr).collect();
        let Some(residual) = detrend::detrend(&snr, self.detrend_order) else {
            self.rejections.detrend_failed += 1;
            return None;
        };

        let samples = buf
            .iter()
            .zip(residual)
            .map(|(s, snr)| ArcSample {
                time: s.time,
                elevation_deg: s.elevation_deg,
                azimuth_deg: s.azimuth_deg,
                snr,
            })
            .collect();
        Some(Arc {
            sat: key.0,
            band: key.1,
            direction,
            samples,
        })
    }
}

impl Iterator for ArcExtractor {
    type Item = Arc;

    fn next(&mut self) -> Option<Arc> {
        loop {
            if self.current.is_none() {
                let series = self.series.pop_front()?;
                self.cursor = 0;
                self.buf.clear();
                self.direction = None;
                self.current = Some(series);
            }
            let key = match &self.current {
                Some((key, _)) => *key,
                None => continue,
            };

            loop {
                let s = match &self.current {
                    Some((_, samples)) if self.cursor < samples.len() => samples[self.cursor],
                    _ => break,
                };
                self.cursor += 1;

                // masked epoch: close whatever is open, skip the sample
                if s.elevation_deg.is_nan() {
                    let flushed = self.flush(key);
                    if flushed.is_some() {
                        return flushed;
                    }
                    continue;
                }

                let Some(&last) = self.buf.last() else {
                    self.buf.push(s);
                    continue;
                };

                if s.time - last.time > self.max_gap {
                    let flushed = self.flush(key);
                    self.buf.push(s);
                    if flushed.is_some() {
                        return flushed;
                    }
                    continue;
                }

                if s.elevation_deg == last.elevation_deg {
                    // tie: strict monotonicity, discard the later epoch
                    self.rejections.duplicate_epochs += 1;
                    continue;
                }
                let step = if s.elevation_deg > last.elevation_deg {
                    Direction::Rising
                } else {
                    Direction::Setting
                };
                match self.direction {
                    None => {
                        self.direction = Some(step);
                        self.buf.push(s);
                    }
                    Some(d) if d == step => self.buf.push(s),
                    Some(_) => {
                        let flushed = self.flush(key);
                        self.buf.push(s);
                        if flushed.is_some() {
                            return flushed;
                        }
                    }
                }
            }

            // series exhausted
            self.current = None;
            let flushed = self.flush(key);
            if flushed.is_some() {
                return flushed;
            }
        }
    }
}
