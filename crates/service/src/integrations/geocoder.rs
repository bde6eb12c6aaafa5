use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use common::geo::{self, GeoPoint};

use crate::errors::ServiceError;

const GOOGLE_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub lat: f64,
    pub lng: f64,
    pub formatted_address: String,
    pub locality: Option<String>,
    pub admin_area: Option<String>,
}

impl GeocodeResult {
    pub fn point(&self) -> Option<GeoPoint> { GeoPoint::new(self.lat, self.lng) }

    /// Named Dubai by locality, administrative area or address; otherwise,
    /// when the result carries no names at all, by the emirate's bounding box.
    pub fn is_dubai(&self) -> bool {
        let named = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().eq_ignore_ascii_case("dubai"));
        if named(&self.locality) || named(&self.admin_area) {
            return true;
        }
        if self.formatted_address.to_ascii_lowercase().contains("dubai") {
            return true;
        }
        let has_names = self.locality.is_some() || self.admin_area.is_some() || !self.formatted_address.trim().is_empty();
        !has_names && self.point().is_some_and(geo::is_within_dubai)
    }

    /// Dubai addresses search city-wide; everything else uses the requested radius.
    pub fn search_radius(&self, requested_km: Option<f64>) -> f64 {
        if self.is_dubai() { geo::DUBAI_RADIUS_KM } else { geo::clamp_radius(requested_km) }
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<GeocodeResult, ServiceError>;

    fn enabled(&self) -> bool { true }
}

/// Stand-in when no API key is configured.
pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn geocode(&self, _address: &str) -> Result<GeocodeResult, ServiceError> {
        Err(ServiceError::Integration("geocoding is not configured".into()))
    }

    fn enabled(&self) -> bool { false }
}

pub struct GoogleGeocoder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GoogleGeocoder {
    pub fn new(client: reqwest::Client, api_key: String, base_url: Option<String>) -> Self {
        Self { client, api_key, base_url: base_url.unwrap_or_else(|| GOOGLE_GEOCODE_URL.to_string()) }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    status: String,
    #[serde(default)]
    results: Vec<GoogleResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleResult {
    formatted_address: String,
    geometry: GoogleGeometry,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
struct GoogleGeometry {
    location: GoogleLocation,
}

#[derive(Debug, Deserialize)]
struct GoogleLocation {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

fn component(components: &[AddressComponent], kind: &str) -> Option<String> {
    components.iter().find(|c| c.types.iter().any(|t| t == kind)).map(|c| c.long_name.clone())
}

fn parse_response(body: GoogleResponse) -> Result<GeocodeResult, ServiceError> {
    match body.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => return Err(ServiceError::NotFound("address not found".into())),
        other => {
            let detail = body.error_message.unwrap_or_default();
            return Err(ServiceError::Integration(format!("geocoder returned {other} {detail}").trim().to_string()));
        }
    }
    let first = body.results.into_iter().next().ok_or_else(|| ServiceError::NotFound("address not found".into()))?;
    Ok(GeocodeResult {
        lat: first.geometry.location.lat,
        lng: first.geometry.location.lng,
        locality: component(&first.address_components, "locality"),
        admin_area: component(&first.address_components, "administrative_area_level_1"),
        formatted_address: first.formatted_address,
    })
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    #[instrument(skip(self))]
    async fn geocode(&self, address: &str) -> Result<GeocodeResult, ServiceError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(ServiceError::validation("address required"));
        }
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| ServiceError::Integration(format!("geocoder request failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ServiceError::Integration(format!("geocoder http status {status}")));
        }
        let body: GoogleResponse = resp
            .json()
            .await
            .map_err(|e| ServiceError::Integration(format!("geocoder response invalid: {e}")))?;
        let result = parse_response(body)?;
        debug!(lat = result.lat, lng = result.lng, dubai = result.is_dubai(), "geocoded");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(lat: f64, lng: f64, formatted: &str, locality: Option<&str>, admin: Option<&str>) -> GeocodeResult {
        GeocodeResult {
            lat,
            lng,
            formatted_address: formatted.into(),
            locality: locality.map(Into::into),
            admin_area: admin.map(Into::into),
        }
    }

    #[test]
    fn dubai_detected_by_name() {
        assert!(result(0.0, 0.0, "", Some("Dubai"), None).is_dubai());
        assert!(result(0.0, 0.0, "", None, Some("dubai")).is_dubai());
        assert!(result(0.0, 0.0, "Al Barsha - Dubai - UAE", None, None).is_dubai());
        assert!(!result(25.35, 55.40, "Al Majaz, Sharjah", Some("Sharjah"), Some("Sharjah")).is_dubai());
    }

    #[test]
    fn dubai_detected_by_box_when_unnamed() {
        assert!(result(25.2048, 55.2708, "", None, None).is_dubai());
        assert!(!result(24.4539, 54.3773, "", None, None).is_dubai());
    }

    #[test]
    fn dubai_searches_use_city_radius() {
        assert_eq!(result(25.2, 55.3, "Dubai", None, None).search_radius(Some(5.0)), geo::DUBAI_RADIUS_KM);
        assert_eq!(result(24.45, 54.38, "Abu Dhabi", None, None).search_radius(Some(5.0)), 5.0);
        assert_eq!(result(24.45, 54.38, "Abu Dhabi", None, None).search_radius(None), geo::DEFAULT_RADIUS_KM);
    }

    #[test]
    fn google_payload_is_parsed() {
        let raw = r#"{
            "status": "OK",
            "results": [{
                "formatted_address": "Jumeirah Beach Rd - Dubai - United Arab Emirates",
                "geometry": {"location": {"lat": 25.2, "lng": 55.26}},
                "address_components": [
                    {"long_name": "Dubai", "short_name": "Dubai", "types": ["locality", "political"]},
                    {"long_name": "Dubai", "short_name": "DU", "types": ["administrative_area_level_1", "political"]}
                ]
            }]
        }"#;
        let parsed = parse_response(serde_json::from_str(raw).unwrap()).unwrap();
        assert_eq!(parsed.locality.as_deref(), Some("Dubai"));
        assert!(parsed.is_dubai());
        let none: GoogleResponse = serde_json::from_str(r#"{"status":"ZERO_RESULTS","results":[]}"#).unwrap();
        assert!(matches!(parse_response(none), Err(ServiceError::NotFound(_))));
        let denied: GoogleResponse = serde_json::from_str(r#"{"status":"REQUEST_DENIED","error_message":"bad key"}"#).unwrap();
        assert!(matches!(parse_response(denied), Err(ServiceError::Integration(_))));
    }

    #[tokio::test]
    async fn disabled_geocoder_reports_integration_error() {
        assert!(!DisabledGeocoder.enabled());
        assert!(matches!(DisabledGeocoder.geocode("Dubai Mall").await, Err(ServiceError::Integration(_))));
    }
}
