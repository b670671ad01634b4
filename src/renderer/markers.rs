//! Live marker state kept by a scene consumer

use chrono::{DateTime, Utc};

use super::projection::{project_geo, ScenePoint};
use crate::propagation::{GeoPoint, Snapshot};

/// One satellite marker placed in the scene
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub identifier: String,
    pub designation: String,
    pub geo: GeoPoint,
    /// Position in scene units
    pub position: ScenePoint,
    /// Color based on altitude (RGBA)
    pub color: [f32; 4],
}

/// Last known positions, owned by the consumer and updated once per tick
#[derive(Debug, Default)]
pub struct MarkerLayer {
    markers: Vec<Marker>,
    instant: Option<DateTime<Utc>>,
    selected: Option<String>,
}

impl MarkerLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all markers with the contents of a snapshot
    ///
    /// Keeps the current selection when its identifier is still present,
    /// otherwise selects the first marker.
    pub fn apply(&mut self, snapshot: Snapshot) {
        self.markers = snapshot
            .positions
            .into_iter()
            .map(|p| {
                let geo = p.geo();
                Marker {
                    position: project_geo(&geo),
                    color: altitude_to_color(p.altitude_km),
                    identifier: p.identifier,
                    designation: p.designation,
                    geo,
                }
            })
            .collect();
        self.instant = Some(snapshot.instant);

        let still_present = self
            .selected
            .as_ref()
            .map(|id| self.markers.iter().any(|m| &m.identifier == id))
            .unwrap_or(false);
        if !still_present {
            self.selected = self.markers.first().map(|m| m.identifier.clone());
        }
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Instant of the last applied snapshot, the reference for orbit paths
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.instant
    }

    /// Select a marker by identifier; unknown identifiers are ignored
    pub fn select(&mut self, identifier: &str) -> bool {
        if self.markers.iter().any(|m| m.identifier == identifier) {
            self.selected = Some(identifier.to_string());
            true
        } else {
            false
        }
    }

    pub fn selected(&self) -> Option<&Marker> {
        let id = self.selected.as_ref()?;
        self.markers.iter().find(|m| &m.identifier == id)
    }

    /// Geodetic position of the selected marker, used to pin its orbit path
    pub fn selected_anchor(&self) -> Option<GeoPoint> {
        self.selected().map(|m| m.geo)
    }
}

/// Marker colour stops by altitude (km), interpolated linearly between
const ALTITUDE_COLOR_STOPS: [(f64, [f32; 3]); 5] = [
    (300.0, [0.25, 0.45, 1.0]),   // low LEO
    (2_000.0, [0.2, 0.9, 1.0]),   // top of LEO
    (20_200.0, [0.3, 1.0, 0.35]), // navigation MEO
    (35_786.0, [1.0, 0.9, 0.1]),  // geostationary
    (60_000.0, [1.0, 0.35, 0.1]), // high elliptical apogees
];

/// RGBA marker colour for an altitude in km
///
/// Altitudes outside the stop table take the nearest end colour.
pub fn altitude_to_color(altitude_km: f64) -> [f32; 4] {
    let rgba = |[r, g, b]: [f32; 3]| [r, g, b, 1.0];
    let (first, last) = (ALTITUDE_COLOR_STOPS[0], ALTITUDE_COLOR_STOPS[4]);

    if altitude_km.is_nan() || altitude_km <= first.0 {
        return rgba(first.1);
    }

    for pair in ALTITUDE_COLOR_STOPS.windows(2) {
        let ((lo, lo_color), (hi, hi_color)) = (pair[0], pair[1]);
        if altitude_km < hi {
            let t = ((altitude_km - lo) / (hi - lo)) as f32;
            let mix = |i: usize| lo_color[i] + (hi_color[i] - lo_color[i]) * t;
            return rgba([mix(0), mix(1), mix(2)]);
        }
    }

    rgba(last.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::PropagatedPosition;
    use crate::renderer::project;
    use chrono::TimeZone;

    fn position(id: &str, lat: f64, lon: f64, alt: f64) -> PropagatedPosition {
        PropagatedPosition {
            identifier: id.to_string(),
            designation: format!("SAT {}", id),
            latitude_deg: lat,
            longitude_deg: lon,
            altitude_km: alt,
        }
    }

    fn snapshot(second: u32, positions: Vec<PropagatedPosition>) -> Snapshot {
        Snapshot {
            instant: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, second).unwrap(),
            positions,
        }
    }

    #[test]
    fn test_apply_projects_markers() {
        let mut layer = MarkerLayer::new();
        layer.apply(snapshot(0, vec![position("1", 10.0, 20.0, 550.0)]));

        let marker = &layer.markers()[0];
        assert_eq!(marker.position, project(10.0, 20.0, 550.0));
        assert_eq!(marker.color, altitude_to_color(550.0));
        assert_eq!(layer.instant(), Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_first_marker_selected_by_default() {
        let mut layer = MarkerLayer::new();
        assert!(layer.selected().is_none());

        layer.apply(snapshot(0, vec![position("1", 0.0, 0.0, 500.0), position("2", 5.0, 5.0, 500.0)]));
        assert_eq!(layer.selected().unwrap().identifier, "1");
    }

    #[test]
    fn test_selection_follows_identifier_across_ticks() {
        let mut layer = MarkerLayer::new();
        layer.apply(snapshot(0, vec![position("1", 0.0, 0.0, 500.0), position("2", 5.0, 5.0, 500.0)]));
        assert!(layer.select("2"));
        assert!(!layer.select("99"));

        layer.apply(snapshot(30, vec![position("1", 1.0, 1.0, 500.0), position("2", 6.0, 6.0, 501.0)]));
        let anchor = layer.selected_anchor().unwrap();
        assert_eq!(anchor, GeoPoint::new(6.0, 6.0, 501.0));

        // selected object vanished: fall back to the first marker
        layer.apply(snapshot(59, vec![position("3", 0.0, 0.0, 500.0)]));
        assert_eq!(layer.selected().unwrap().identifier, "3");
    }

    #[test]
    fn test_empty_snapshot_clears_markers() {
        let mut layer = MarkerLayer::new();
        layer.apply(snapshot(0, vec![position("1", 0.0, 0.0, 500.0)]));
        layer.apply(snapshot(1, Vec::new()));

        assert!(layer.markers().is_empty());
        assert!(layer.selected().is_none());
        assert!(layer.selected_anchor().is_none());
    }

    #[test]
    fn test_altitude_colors() {
        // regime anchors hit their stop colour exactly
        assert_eq!(altitude_to_color(300.0), [0.25, 0.45, 1.0, 1.0]);
        assert_eq!(altitude_to_color(35_786.0), [1.0, 0.9, 0.1, 1.0]);

        // clamped at both ends
        assert_eq!(altitude_to_color(-50.0), altitude_to_color(300.0));
        assert_eq!(altitude_to_color(f64::NAN), altitude_to_color(300.0));
        assert_eq!(altitude_to_color(1.0e6), [1.0, 0.35, 0.1, 1.0]);

        // halfway between the LEO stops
        let mid = altitude_to_color(1_150.0);
        assert!((mid[1] - 0.675).abs() < 1e-6, "{:?}", mid);
        assert!(mid.iter().all(|c| (0.0..=1.0).contains(c)));
    }
}
