use std::fmt;

use async_trait::async_trait;
use mini_moka::sync::Cache;
use tracing::debug;

use super::{Geocoder, GeocodingError};
use crate::listings::domain::Coordinates;

/// Geocoder decorator that consults a bounded in-process cache before the wrapped
/// provider.
///
/// Keys are exact address strings. Negative lookups (`None`) are cached too, provider
/// errors never are. Capacity zero disables caching.
pub struct CachedGeocoder<G> {
    inner: G,
    cache: Option<Cache<String, Option<Coordinates>>>,
}

impl<G> CachedGeocoder<G> {
    pub fn new(inner: G, capacity: usize) -> Self {
        let cache = (capacity > 0).then(|| Cache::new(capacity as u64));
        Self { inner, cache }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    pub fn is_caching(&self) -> bool {
        self.cache.is_some()
    }
}

impl<G: fmt::Debug> fmt::Debug for CachedGeocoder<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedGeocoder")
            .field("inner", &self.inner)
            .field("caching", &self.is_caching())
            .finish()
    }
}

#[async_trait]
impl<G> Geocoder for CachedGeocoder<G>
where
    G: Geocoder,
{
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, GeocodingError> {
        let Some(cache) = &self.cache else {
            return self.inner.geocode(address).await;
        };

        let key = address.to_string();
        if let Some(hit) = cache.get(&key) {
            debug!(address, "geocode cache hit");
            return Ok(hit);
        }

        let located = self.inner.geocode(address).await?;
        cache.insert(key, located);
        Ok(located)
    }

    async fn distance(
        &self,
        origin: &Coordinates,
        destination: &Coordinates,
    ) -> Result<f64, GeocodingError> {
        self.inner.distance(origin, destination).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn point(latitude: f64) -> Option<Coordinates> {
        Coordinates::new(latitude, 0.0).ok()
    }

    #[derive(Debug, Default)]
    struct CountingGeocoder {
        calls: AtomicUsize,
        unknown: bool,
    }

    #[async_trait]
    impl Geocoder for CountingGeocoder {
        async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, GeocodingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if address.trim().is_empty() {
                return Err(GeocodingError::Provider {
                    status: "INVALID_REQUEST".to_string(),
                    message: "blank address".to_string(),
                });
            }
            Ok(if self.unknown { None } else { point(10.0) })
        }
    }

    #[tokio::test]
    async fn repeated_addresses_hit_provider_once() {
        let geocoder = CachedGeocoder::new(CountingGeocoder::default(), 8);
        for _ in 0..3 {
            let located = geocoder.geocode("1 Main St").await.expect("geocoded");
            assert_eq!(located, point(10.0));
        }
        geocoder.geocode("1 main st").await.expect("geocoded");
        assert_eq!(geocoder.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn remembers_negative_lookups() {
        let geocoder = CachedGeocoder::new(
            CountingGeocoder {
                unknown: true,
                ..CountingGeocoder::default()
            },
            8,
        );
        assert_eq!(geocoder.geocode("nowhere").await.expect("looked up"), None);
        assert_eq!(geocoder.geocode("nowhere").await.expect("looked up"), None);
        assert_eq!(geocoder.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn provider_errors_are_not_cached() {
        let geocoder = CachedGeocoder::new(CountingGeocoder::default(), 8);
        assert!(geocoder.geocode(" ").await.is_err());
        assert!(geocoder.geocode(" ").await.is_err());
        assert_eq!(geocoder.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disabled_cache_always_delegates() {
        let geocoder = CachedGeocoder::new(CountingGeocoder::default(), 0);
        assert!(!geocoder.is_caching());
        geocoder.geocode("1 Main St").await.expect("geocoded");
        geocoder.geocode("1 Main St").await.expect("geocoded");
        assert_eq!(geocoder.inner().calls.load(Ordering::SeqCst), 2);
    }
}
