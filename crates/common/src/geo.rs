//! Great-circle helpers for the nearby-clinic and nearby-doctor searches.

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0088;
const KM_PER_DEGREE_LAT: f64 = 111.32;

pub const DEFAULT_RADIUS_KM: f64 = 10.0;
pub const MAX_RADIUS_KM: f64 = 100.0;
/// City-wide radius used when an address search resolves to Dubai.
pub const DUBAI_RADIUS_KM: f64 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        if !lat.is_finite() || !lng.is_finite() { return None; }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) { return None; }
        Some(Self { lat, lng })
    }
}

/// Axis-aligned lat/lng box used as a cheap prefilter before exact distances.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn around(center: GeoPoint, radius_km: f64) -> Self {
        let dlat = radius_km / KM_PER_DEGREE_LAT;
        let cos = center.lat.to_radians().cos().abs().max(1e-6);
        let dlng = (radius_km / (KM_PER_DEGREE_LAT * cos)).min(180.0);
        Self {
            min_lat: (center.lat - dlat).max(-90.0),
            max_lat: (center.lat + dlat).min(90.0),
            min_lng: (center.lng - dlng).max(-180.0),
            max_lng: (center.lng + dlng).min(180.0),
        }
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lat >= self.min_lat && p.lat <= self.max_lat && p.lng >= self.min_lng && p.lng <= self.max_lng
    }
}

/// Rough extent of the Dubai emirate.
pub const DUBAI_BOUNDS: BoundingBox = BoundingBox {
    min_lat: 24.60,
    max_lat: 25.40,
    min_lng: 54.85,
    max_lng: 55.70,
};

pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Requested radius clamped to `(0, MAX_RADIUS_KM]`, default when absent or invalid.
pub fn clamp_radius(radius_km: Option<f64>) -> f64 {
    match radius_km {
        Some(r) if r.is_finite() && r > 0.0 => r.min(MAX_RADIUS_KM),
        _ => DEFAULT_RADIUS_KM,
    }
}

pub fn is_within_dubai(p: GeoPoint) -> bool {
    DUBAI_BOUNDS.contains(p)
}

/// Keep the items within `radius_km` of `center`, nearest first, paired with their distance.
pub fn within_radius<T>(
    center: GeoPoint,
    radius_km: f64,
    items: impl IntoIterator<Item = T>,
    locate: impl Fn(&T) -> Option<GeoPoint>,
) -> Vec<(T, f64)> {
    let bbox = BoundingBox::around(center, radius_km);
    let mut hits: Vec<(T, f64)> = items
        .into_iter()
        .filter_map(|item| {
            let p = locate(&item)?;
            if !bbox.contains(p) { return None; }
            let d = haversine_km(center, p);
            (d <= radius_km).then_some((item, d))
        })
        .collect();
    hits.sort_by(|a, b| a.1.total_cmp(&b.1));
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lng: f64) -> GeoPoint { GeoPoint::new(lat, lng).unwrap() }

    #[test]
    fn distance_is_zero_for_same_point_and_symmetric() {
        let a = pt(25.2048, 55.2708);
        let b = pt(25.0760, 55.1320);
        assert_eq!(haversine_km(a, a), 0.0);
        assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
    }

    #[test]
    fn dubai_to_abu_dhabi_is_about_130_km() {
        let dubai = pt(25.2048, 55.2708);
        let abu_dhabi = pt(24.4539, 54.3773);
        let d = haversine_km(dubai, abu_dhabi);
        assert!((120.0..140.0).contains(&d), "got {d}");
    }

    #[test]
    fn invalid_coordinates_are_rejected() {
        assert!(GeoPoint::new(91.0, 0.0).is_none());
        assert!(GeoPoint::new(0.0, -181.0).is_none());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_none());
    }

    #[test]
    fn bounding_box_contains_everything_within_radius() {
        let c = pt(25.2, 55.3);
        let bbox = BoundingBox::around(c, 10.0);
        assert!(bbox.contains(pt(25.25, 55.35)));
        assert!(!bbox.contains(pt(26.0, 55.3)));
    }

    #[test]
    fn within_radius_filters_and_sorts() {
        let center = pt(25.2048, 55.2708);
        let items = vec![
            ("far", pt(24.4539, 54.3773)),
            ("near", pt(25.2100, 55.2750)),
            ("mid", pt(25.1000, 55.2000)),
        ];
        let hits = within_radius(center, 20.0, items, |(_, p)| Some(*p));
        let names: Vec<_> = hits.iter().map(|((n, _), _)| *n).collect();
        assert_eq!(names, vec!["near", "mid"]);
        assert!(hits[0].1 < hits[1].1);
    }

    #[test]
    fn radius_clamped() {
        assert_eq!(clamp_radius(None), DEFAULT_RADIUS_KM);
        assert_eq!(clamp_radius(Some(-3.0)), DEFAULT_RADIUS_KM);
        assert_eq!(clamp_radius(Some(500.0)), MAX_RADIUS_KM);
        assert_eq!(clamp_radius(Some(5.0)), 5.0);
    }

    #[test]
    fn dubai_bounds_cover_the_city_not_abu_dhabi() {
        assert!(is_within_dubai(pt(25.2048, 55.2708)));
        assert!(!is_within_dubai(pt(24.4539, 54.3773)));
    }
}
