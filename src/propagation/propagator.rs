//! SGP4 propagation using satkit

use std::f64::consts::TAU;
use std::ops::RangeInclusive;

use chrono::{DateTime, Datelike, Timelike, Utc};
use nalgebra::Vector3;
use satkit::sgp4::{sgp4, SGP4Error};
use serde::Serialize;

use super::geodesy::{teme_to_geodetic, GeoPoint, METERS_PER_KM};
use crate::data::ElementSet;

pub const MINUTES_PER_DAY: f64 = 1440.0;

/// Mean motion accepted for propagation (rev/day), from a 20-day period up
/// to orbits just above the surface
pub const MEAN_MOTION_RANGE: RangeInclusive<f64> = 0.05..=20.0;

/// Geodetic position of one object at one instant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropagatedPosition {
    /// Catalog number, or the designation when the catalog field is blank
    pub identifier: String,
    pub designation: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    /// Height above the WGS-84 ellipsoid (km)
    pub altitude_km: f64,
}

impl PropagatedPosition {
    pub fn geo(&self) -> GeoPoint {
        GeoPoint::new(self.latitude_deg, self.longitude_deg, self.altitude_km)
    }
}

/// Propagation error types
#[derive(Debug, Clone, PartialEq)]
pub enum PropagationError {
    /// Element lines could not be turned into a model record
    InvalidElements { designation: String, reason: String },

    /// Model produced no usable position (decayed or below the surface)
    Decayed { designation: String },

    /// Instant is outside what the model's time scale can represent
    InvalidInstant { instant: DateTime<Utc> },
}

impl std::fmt::Display for PropagationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidElements {
                designation,
                reason,
            } => {
                write!(f, "Invalid elements for {}: {}", designation, reason)
            }
            Self::Decayed { designation } => {
                write!(f, "No valid position for {} (orbit decayed)", designation)
            }
            Self::InvalidInstant { instant } => {
                write!(f, "Cannot propagate to {}", instant.to_rfc3339())
            }
        }
    }
}

impl std::error::Error for PropagationError {}

/// Convert a UTC timestamp into the model's time type
pub fn to_instant(when: &DateTime<Utc>) -> Result<satkit::Instant, PropagationError> {
    let seconds = when.second() as f64 + when.nanosecond() as f64 * 1e-9;
    satkit::Instant::from_datetime(
        when.year(),
        when.month() as i32,
        when.day() as i32,
        when.hour() as i32,
        when.minute() as i32,
        seconds,
    )
    .map_err(|_| PropagationError::InvalidInstant { instant: *when })
}

/// An element set with its SGP4 record initialised, ready for repeated use
#[derive(Clone)]
pub struct PreparedElements {
    elements: ElementSet,
    identifier: String,
    tle: satkit::TLE,
    mean_motion_rev_per_day: f64,
}

impl PreparedElements {
    pub fn new(elements: &ElementSet) -> Result<Self, PropagationError> {
        let invalid = |reason: String| PropagationError::InvalidElements {
            designation: elements.designation().to_string(),
            reason,
        };

        let mean_motion = elements
            .mean_motion_rev_per_day()
            .map_err(|e| invalid(e.to_string()))?;
        if !MEAN_MOTION_RANGE.contains(&mean_motion) {
            return Err(invalid(format!("mean motion {} rev/day", mean_motion)));
        }

        let tle = satkit::TLE::load_2line(elements.line1(), elements.line2())
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            elements: elements.clone(),
            identifier: elements.identifier(),
            tle,
            mean_motion_rev_per_day: mean_motion,
        })
    }

    pub fn elements(&self) -> &ElementSet {
        &self.elements
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Mean motion in radians per minute
    pub fn mean_motion_rad_per_min(&self) -> f64 {
        self.mean_motion_rev_per_day * TAU / MINUTES_PER_DAY
    }

    /// Orbital period from the mean motion field (minutes)
    ///
    /// This is the Kozai mean motion as written in line 2, not the value
    /// SGP4 derives during initialisation; the two differ by about 0.1%.
    pub fn period_minutes(&self) -> f64 {
        TAU / self.mean_motion_rad_per_min()
    }

    /// Geodetic position at an instant
    pub fn geodetic_at(&self, when: &DateTime<Utc>) -> Result<GeoPoint, PropagationError> {
        let decayed = || PropagationError::Decayed {
            designation: self.elements.designation().to_string(),
        };

        let instant = to_instant(when)?;

        // sgp4 caches its initialised record inside the TLE
        let mut tle = self.tle.clone();
        let result = sgp4(&mut tle, &[instant]).map_err(|e| {
            log::trace!("SGP4 init failed for {}: {}", self.identifier, e);
            decayed()
        })?;
        match result.errcode.first() {
            Some(SGP4Error::SGP4Success) => {}
            Some(code) => {
                log::trace!("SGP4 error for {}: {}", self.identifier, code);
                return Err(decayed());
            }
            None => return Err(decayed()),
        }

        // TEME position in meters
        let pos = result.pos.column(0);
        let position_km = Vector3::new(pos[0], pos[1], pos[2]) / METERS_PER_KM;
        if !position_km.iter().all(|c| c.is_finite()) {
            return Err(decayed());
        }

        let geo = teme_to_geodetic(&position_km, &instant);
        if !geo.altitude_km.is_finite() || geo.altitude_km < 0.0 {
            return Err(decayed());
        }

        Ok(geo)
    }

    pub fn propagate(&self, when: &DateTime<Utc>) -> Result<PropagatedPosition, PropagationError> {
        let geo = self.geodetic_at(when)?;
        Ok(PropagatedPosition {
            identifier: self.identifier.clone(),
            designation: self.elements.designation().to_string(),
            latitude_deg: geo.latitude_deg,
            longitude_deg: geo.longitude_deg,
            altitude_km: geo.altitude_km,
        })
    }
}

/// Propagate a single element set to an instant
pub fn propagate_one(
    elements: &ElementSet,
    when: &DateTime<Utc>,
) -> Result<PropagatedPosition, PropagationError> {
    PreparedElements::new(elements)?.propagate(when)
}

/// Manages SGP4 propagation for a whole collection of element sets
pub struct Propagator {
    /// One entry per input element set, in input order
    entries: Vec<Result<PreparedElements, PropagationError>>,
}

impl Propagator {
    pub fn new(sets: &[ElementSet]) -> Self {
        let entries: Vec<_> = sets.iter().map(PreparedElements::new).collect();

        let invalid = entries.iter().filter(|e| e.is_err()).count();
        for err in entries.iter().filter_map(|e| e.as_ref().err()) {
            log::debug!("{}", err);
        }
        log::info!(
            "Prepared {} element sets for propagation ({} invalid)",
            entries.len() - invalid,
            invalid
        );

        Self { entries }
    }

    /// Number of element sets, including ones that failed to load
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn prepared(&self) -> impl Iterator<Item = &PreparedElements> {
        self.entries.iter().filter_map(|e| e.as_ref().ok())
    }

    /// Propagate every element set against one instant, skipping failures
    pub fn propagate_all(&self, when: &DateTime<Utc>) -> Vec<PropagatedPosition> {
        propagate_entries(&self.entries, when)
    }

    /// Same as [`Propagator::propagate_all`], fanned out over `workers` threads
    ///
    /// Every worker uses the same instant and results keep input order.
    pub fn propagate_all_parallel(
        &self,
        when: &DateTime<Utc>,
        workers: usize,
    ) -> Vec<PropagatedPosition> {
        if workers <= 1 || self.entries.len() < 2 {
            return self.propagate_all(when);
        }

        fan_out(&self.entries, workers, |chunk| propagate_entries(chunk, when))
    }
}

/// Run `work` over contiguous chunks of `items` on scoped threads and
/// concatenate the results in input order
///
/// A panicking worker is re-raised on the calling thread, so the caller
/// never sees results from only some of the chunks.
fn fan_out<T, R, F>(items: &[T], workers: usize, work: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&[T]) -> Vec<R> + Sync,
{
    let chunk_size = items.len().div_ceil(workers.max(1)).max(1);
    let work = &work;

    std::thread::scope(|scope| {
        let handles: Vec<_> = items
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || work(chunk)))
            .collect();

        let mut results = Vec::with_capacity(items.len());
        for handle in handles {
            match handle.join() {
                Ok(mut chunk) => results.append(&mut chunk),
                Err(payload) => std::panic::resume_unwind(payload),
            }
        }
        results
    })
}

fn propagate_entries(
    entries: &[Result<PreparedElements, PropagationError>],
    when: &DateTime<Utc>,
) -> Vec<PropagatedPosition> {
    let mut results = Vec::with_capacity(entries.len());

    for prepared in entries.iter().filter_map(|e| e.as_ref().ok()) {
        match prepared.propagate(when) {
            Ok(position) => results.push(position),
            Err(e) => log::trace!("Skipping {}: {}", prepared.identifier(), e),
        }
    }

    results
}
