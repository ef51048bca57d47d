use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{Geocoder, GeocodingError};
use crate::listings::domain::Coordinates;

const GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Google Maps Geocoding API client.
#[derive(Debug, Clone)]
pub struct GoogleGeocoder {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GoogleGeocoder {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, GeocodingError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rorstay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            api_key,
            endpoint: GEOCODE_ENDPOINT.to_string(),
        })
    }

    /// Points the client at a different endpoint, e.g. a local mock.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

fn interpret(response: GeocodeResponse) -> Result<Option<Coordinates>, GeocodingError> {
    match response.status.as_str() {
        "OK" => match response.results.into_iter().next() {
            Some(result) => {
                let location = result.geometry.location;
                Ok(Some(Coordinates::new(location.lat, location.lng)?))
            }
            None => Ok(None),
        },
        "ZERO_RESULTS" => Ok(None),
        _ => Err(GeocodingError::Provider {
            message: response
                .error_message
                .unwrap_or_else(|| "no error message".to_string()),
            status: response.status,
        }),
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, GeocodingError> {
        debug!(address, "geocoding address via google maps");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json::<GeocodeResponse>()
            .await?;

        let located = interpret(response);
        if let Err(error) = &located {
            warn!(address, error = %error, "google maps geocoding failed");
        }
        located
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: &str) -> GeocodeResponse {
        serde_json::from_str(body).expect("fixture parses")
    }

    #[test]
    fn takes_first_result_location() {
        let located = interpret(response(
            r#"{
                "status": "OK",
                "results": [
                    {"geometry": {"location": {"lat": 41.49008, "lng": -71.312796}}},
                    {"geometry": {"location": {"lat": 0.0, "lng": 0.0}}}
                ]
            }"#,
        ))
        .expect("interpreted")
        .expect("located");
        assert_eq!(located.latitude(), 41.49008);
        assert_eq!(located.longitude(), -71.312796);
    }

    #[test]
    fn zero_results_is_not_found() {
        let located = interpret(response(r#"{"status": "ZERO_RESULTS", "results": []}"#))
            .expect("interpreted");
        assert!(located.is_none());
    }

    #[test]
    fn provider_errors_carry_status_and_message() {
        let error = interpret(response(
            r#"{"status": "REQUEST_DENIED", "error_message": "The provided API key is invalid."}"#,
        ))
        .expect_err("denied");
        match error {
            GeocodingError::Provider { status, message } => {
                assert_eq!(status, "REQUEST_DENIED");
                assert_eq!(message, "The provided API key is invalid.");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn out_of_range_location_is_rejected() {
        let error = interpret(response(
            r#"{"status": "OK", "results": [{"geometry": {"location": {"lat": 91.0, "lng": 0.0}}}]}"#,
        ))
        .expect_err("invalid location");
        assert!(matches!(error, GeocodingError::InvalidLocation(_)));
    }
}
