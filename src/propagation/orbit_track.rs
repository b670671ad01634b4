//! Orbit path sampling for visualization

use chrono::{DateTime, Duration, Utc};

use super::geodesy::GeoPoint;
use super::propagator::PreparedElements;
use crate::data::ElementSet;
use crate::renderer::{project_geo, ScenePoint};

/// Samples per orbit when the caller does not choose
pub const DEFAULT_SAMPLE_COUNT: usize = 256;

/// Options for orbit path sampling
#[derive(Debug, Clone)]
pub struct PathOptions {
    /// Number of intervals across one period; `sample_count + 1` instants are sampled
    pub sample_count: usize,
    /// Replace the middle sample with the anchor's projected position
    pub force_through_anchor: bool,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self {
            sample_count: DEFAULT_SAMPLE_COUNT,
            force_through_anchor: true,
        }
    }
}

/// Sample one full orbit centred on `reference`, pinned through `anchor`
pub fn sample_path(
    elements: Option<&ElementSet>,
    anchor: Option<&GeoPoint>,
    reference: &DateTime<Utc>,
    sample_count: usize,
) -> Option<Vec<ScenePoint>> {
    sample_path_with(
        elements,
        anchor,
        reference,
        &PathOptions {
            sample_count,
            ..Default::default()
        },
    )
}

/// Sample one full orbit centred on `reference`
///
/// Instants run from half a period before `reference` to half a period after.
/// Instants the model cannot propagate are left out. Returns `None` when there
/// is nothing drawable: no element set, an unusable record, or fewer than two
/// surviving points.
pub fn sample_path_with(
    elements: Option<&ElementSet>,
    anchor: Option<&GeoPoint>,
    reference: &DateTime<Utc>,
    options: &PathOptions,
) -> Option<Vec<ScenePoint>> {
    let elements = elements?;
    if options.sample_count == 0 {
        return None;
    }

    let prepared = match PreparedElements::new(elements) {
        Ok(prepared) => prepared,
        Err(e) => {
            log::debug!("No orbit path: {}", e);
            return None;
        }
    };

    let period_minutes = prepared.period_minutes();
    if !period_minutes.is_finite() || period_minutes <= 0.0 {
        return None;
    }

    let mut points = Vec::with_capacity(options.sample_count + 1);
    for i in 0..=options.sample_count {
        let fraction = i as f64 / options.sample_count as f64 - 0.5;
        let Some(when) = sample_instant(reference, fraction, period_minutes) else {
            continue;
        };

        if let Ok(geo) = prepared.geodetic_at(&when) {
            points.push(project_geo(&geo));
        }
    }

    if points.len() < 2 {
        return None;
    }

    if options.force_through_anchor {
        if let Some(anchor) = anchor {
            pin_anchor(&mut points, anchor);
        }
    }

    Some(points)
}

/// `reference` shifted by `fraction` of a period, to the millisecond
///
/// `None` when the offset or the shifted instant is outside chrono's range.
fn sample_instant(
    reference: &DateTime<Utc>,
    fraction: f64,
    period_minutes: f64,
) -> Option<DateTime<Utc>> {
    let offset_ms = (fraction * period_minutes * 60_000.0).round();
    if !offset_ms.is_finite() || offset_ms.abs() >= i64::MAX as f64 {
        return None;
    }

    let offset = Duration::try_milliseconds(offset_ms as i64)?;
    reference.checked_add_signed(offset)
}

/// Overwrite the middle point with the anchor's projected position
///
/// This makes the drawn path pass exactly through a marker that was
/// propagated independently, at the cost of physical accuracy at that one
/// vertex. Paths shorter than three points are left alone. Returns whether
/// the path was changed.
pub fn pin_anchor(points: &mut [ScenePoint], anchor: &GeoPoint) -> bool {
    if points.len() < 3 {
        return false;
    }
    let mid = points.len() / 2;
    points[mid] = project_geo(anchor);
    true
}
