//! Geocoding adapters: address lookup, distance, and the caching layer in front of them.

mod cache;
pub mod geodesic;
mod google;
mod offline;

use async_trait::async_trait;

use crate::config::MapsConfig;
use crate::listings::domain::Coordinates;
use crate::listings::validation::ListingViolation;

pub use cache::CachedGeocoder;
pub use google::GoogleGeocoder;
pub use offline::OfflineGeocoder;

#[derive(Debug, thiserror::Error)]
pub enum GeocodingError {
    #[error("geocoding transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("geocoding provider returned {status}: {message}")]
    Provider { status: String, message: String },
    #[error("geocoding provider returned an invalid location: {0}")]
    InvalidLocation(#[from] ListingViolation),
}

/// Address and distance lookups used by the listing service.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Coordinates for `address`, or `None` when the provider knows no such place.
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, GeocodingError>;

    /// Distance in miles between two points.
    async fn distance(
        &self,
        origin: &Coordinates,
        destination: &Coordinates,
    ) -> Result<f64, GeocodingError> {
        Ok(geodesic::distance_miles(origin, destination))
    }
}

/// Provider selected from configuration.
#[derive(Debug, Clone)]
pub enum ProviderGeocoder {
    Google(GoogleGeocoder),
    Offline(OfflineGeocoder),
}

impl ProviderGeocoder {
    pub fn from_config(config: &MapsConfig) -> Result<Self, GeocodingError> {
        match &config.api_key {
            Some(key) => Ok(Self::Google(GoogleGeocoder::new(
                key.clone(),
                config.request_timeout,
            )?)),
            None => {
                tracing::warn!("GOOGLE_MAPS_API_KEY not configured, using offline geocoder");
                Ok(Self::Offline(OfflineGeocoder))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProviderGeocoder::Google(_) => "google",
            ProviderGeocoder::Offline(_) => "offline",
        }
    }
}

#[async_trait]
impl Geocoder for ProviderGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, GeocodingError> {
        match self {
            ProviderGeocoder::Google(geocoder) => geocoder.geocode(address).await,
            ProviderGeocoder::Offline(geocoder) => geocoder.geocode(address).await,
        }
    }
}

/// Configured provider behind the bounded address cache.
pub fn geocoder_from_config(
    config: &MapsConfig,
) -> Result<CachedGeocoder<ProviderGeocoder>, GeocodingError> {
    let provider = ProviderGeocoder::from_config(config)?;
    Ok(CachedGeocoder::new(provider, config.cache_capacity))
}
