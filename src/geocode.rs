//! Reverse geocoding for twd97geo.
//!
//! This module turns WGS84 latitude/longitude into a `PlaceRecord` by asking a
//! geocoding service. It defines the `GeocodingService` trait as the seam
//! between the pure conversion code and the network, an implementation backed
//! by the OpenStreetMap Nominatim `/reverse` endpoint, and an offline mock that
//! answers from a few fixed areas of Taiwan.
//!
//! A lookup has three outcomes: `Ok(Some(place))`, `Ok(None)` when the service
//! answered but knows no address there, and `Err` when the lookup itself failed.

use anyhow::{Context, Result};
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use url::Url;

use crate::address::PlaceRecord;
use crate::config::Config;

/// Language requested from the geocoding service unless told otherwise
pub const DEFAULT_LANGUAGE: &str = "zh-TW";

/// Interface for reverse geocoding services
pub trait GeocodingService {
    /// Look up the place at the given latitude and longitude, with names in `language`
    fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
        language: &str,
    ) -> impl Future<Output = Result<Option<PlaceRecord>>> + Send;
}

/// Body of a Nominatim `/reverse` response (format=json)
#[derive(Debug, Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
    address: Option<AddressDetails>,
    error: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct AddressDetails {
    country: Option<String>,
    county: Option<String>,
    town: Option<String>,
}

/// Geocoding service backed by a Nominatim server
pub struct NominatimGeocoder {
    client: Client,
    reverse_url: Url,
    /// Minimum gap between two requests; the public server allows one per second
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl NominatimGeocoder {
    /// Creates a geocoder for the Nominatim server at `base_url`
    pub fn new(base_url: &str, user_agent: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .with_context(|| format!("Invalid Nominatim URL: {base_url}"))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let reverse_url = base
            .join("reverse")
            .with_context(|| format!("Invalid Nominatim URL: {base_url}"))?;

        let mut builder = Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            reverse_url,
            min_interval: Duration::ZERO,
            last_request: Mutex::new(None),
        })
    }

    /// Spaces consecutive requests at least `min_interval` apart
    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let geocoder = Self::new(
            &config.nominatim_url,
            &config.user_agent,
            config.timeout_secs.map(Duration::from_secs),
        )?;

        Ok(geocoder.with_min_interval(Duration::from_millis(config.min_interval_ms)))
    }

    async fn wait_for_turn(&self) {
        let mut last_request = self.last_request.lock().await;
        if let Some(previous) = *last_request {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                debug!("Waiting {:?} before the next request", ready_at - Instant::now());
                sleep_until(ready_at).await;
            }
        }
        *last_request = Some(Instant::now());
    }
}

impl GeocodingService for NominatimGeocoder {
    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
        language: &str,
    ) -> Result<Option<PlaceRecord>> {
        debug!("GET {} for ({latitude}, {longitude})", self.reverse_url);

        self.wait_for_turn().await;

        let lat = latitude.to_string();
        let lon = longitude.to_string();
        let response = self
            .client
            .get(self.reverse_url.clone())
            .query(&[
                ("format", "json"),
                ("addressdetails", "1"),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("accept-language", language),
            ])
            .send()
            .await
            .with_context(|| format!("Reverse geocoding request to {} failed", self.reverse_url))?
            .error_for_status()
            .context("Reverse geocoding service returned an error status")?;

        let body: ReverseResponse = response
            .json()
            .await
            .context("Failed to parse reverse geocoding response")?;

        if let Some(error) = body.error {
            info!("No address at ({latitude}, {longitude}): {error}");
            return Ok(None);
        }

        let address = body.address.unwrap_or_default();
        Ok(Some(PlaceRecord {
            display_name: body.display_name,
            country: address.country,
            county: address.county,
            town: address.town,
        }))
    }
}

/// Mock geocoding service for testing and offline use
pub struct MockGeocodingService;

impl GeocodingService for MockGeocodingService {
    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
        _language: &str,
    ) -> Result<Option<PlaceRecord>> {
        // Ji'an township, Hualien County (roughly)
        if latitude > 23.9 && latitude < 24.1 && longitude > 121.5 && longitude < 121.7 {
            return Ok(Some(PlaceRecord {
                display_name: Some("吉安鄉, 花蓮縣, 臺灣".to_string()),
                country: Some("臺灣".to_string()),
                county: Some("花蓮縣".to_string()),
                town: Some("吉安鄉".to_string()),
            }));
        }

        // Taipei basin; a special municipality, so there is no county or town
        if latitude > 24.95 && latitude < 25.2 && longitude > 121.4 && longitude < 121.7 {
            return Ok(Some(PlaceRecord {
                display_name: Some("臺北市, 臺灣".to_string()),
                country: Some("臺灣".to_string()),
                county: None,
                town: None,
            }));
        }

        Ok(None)
    }
}

/// The geocoding service selected at runtime
pub enum Geocoder {
    Nominatim(NominatimGeocoder),
    Mock(MockGeocodingService),
}

impl GeocodingService for Geocoder {
    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
        language: &str,
    ) -> Result<Option<PlaceRecord>> {
        match self {
            Geocoder::Nominatim(service) => {
                service.reverse_geocode(latitude, longitude, language).await
            }
            Geocoder::Mock(service) => service.reverse_geocode(latitude, longitude, language).await,
        }
    }
}

/// Factory function to create a geocoding service
pub fn create_geocoding_service(config: &Config, offline: bool) -> Result<Geocoder> {
    if offline {
        return Ok(Geocoder::Mock(MockGeocodingService));
    }

    Ok(Geocoder::Nominatim(NominatimGeocoder::from_config(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn geocoder_for(server: &mockito::ServerGuard) -> NominatimGeocoder {
        NominatimGeocoder::new(&server.url(), "twd97geo-test", Some(Duration::from_secs(5)))
            .unwrap()
    }

    #[tokio::test]
    async fn test_nominatim_reverse_geocode() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/reverse")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("format".into(), "json".into()),
                Matcher::UrlEncoded("addressdetails".into(), "1".into()),
                Matcher::UrlEncoded("lat".into(), "23.9739".into()),
                Matcher::UrlEncoded("lon".into(), "121.6014".into()),
                Matcher::UrlEncoded("accept-language".into(), "zh-TW".into()),
            ]))
            .match_header("user-agent", "twd97geo-test")
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "display_name": "吉安鄉, 花蓮縣, 臺灣",
                    "address": {"town": "吉安鄉", "county": "花蓮縣", "country": "臺灣", "country_code": "tw"}
                }"#,
            )
            .create_async()
            .await;

        let place = geocoder_for(&server)
            .reverse_geocode(23.9739, 121.6014, DEFAULT_LANGUAGE)
            .await
            .unwrap()
            .unwrap();

        mock.assert_async().await;
        assert_eq!(place.country, Some("臺灣".to_string()));
        assert_eq!(place.county, Some("花蓮縣".to_string()));
        assert_eq!(place.town, Some("吉安鄉".to_string()));
        assert_eq!(place.display_name, Some("吉安鄉, 花蓮縣, 臺灣".to_string()));
    }

    #[tokio::test]
    async fn test_nominatim_unable_to_geocode() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/reverse")
            .match_query(Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "Unable to geocode"}"#)
            .create_async()
            .await;

        let place = geocoder_for(&server)
            .reverse_geocode(22.0, 119.0, DEFAULT_LANGUAGE)
            .await
            .unwrap();

        assert!(place.is_none());
    }

    #[tokio::test]
    async fn test_nominatim_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/reverse")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let err = geocoder_for(&server)
            .reverse_geocode(25.0, 121.5, DEFAULT_LANGUAGE)
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("error status"));
    }

    #[tokio::test]
    async fn test_nominatim_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/reverse")
            .match_query(Matcher::Any)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let err = geocoder_for(&server)
            .reverse_geocode(25.0, 121.5, DEFAULT_LANGUAGE)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Failed to parse reverse geocoding response"));
    }

    #[tokio::test]
    async fn test_nominatim_requests_are_spaced() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/reverse")
            .match_query(Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "Unable to geocode"}"#)
            .expect(3)
            .create_async()
            .await;

        let geocoder = geocoder_for(&server).with_min_interval(Duration::from_millis(200));
        let started = std::time::Instant::now();
        for _ in 0..3 {
            geocoder
                .reverse_geocode(22.0, 119.0, DEFAULT_LANGUAGE)
                .await
                .unwrap();
        }

        mock.assert_async().await;
        assert!(started.elapsed() >= Duration::from_millis(400));
    }

    #[test]
    fn test_from_config_uses_min_interval() {
        let config = Config {
            min_interval_ms: 1500,
            ..Config::default()
        };
        let geocoder = NominatimGeocoder::from_config(&config).unwrap();
        assert_eq!(geocoder.min_interval, Duration::from_millis(1500));

        let unthrottled = NominatimGeocoder::new("https://example.com", "twd97geo-test", None)
            .unwrap();
        assert_eq!(unthrottled.min_interval, Duration::ZERO);
    }

    #[test]
    fn test_reverse_url_keeps_base_path() {
        let geocoder =
            NominatimGeocoder::new("https://example.com/nominatim", "twd97geo-test", None)
                .unwrap();
        assert_eq!(
            geocoder.reverse_url.as_str(),
            "https://example.com/nominatim/reverse"
        );

        assert!(NominatimGeocoder::new("not a url", "twd97geo-test", None).is_err());
    }

    #[tokio::test]
    async fn test_mock_geocoding_hualien() {
        let place = MockGeocodingService
            .reverse_geocode(23.9739, 121.6014, DEFAULT_LANGUAGE)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(place.county, Some("花蓮縣".to_string()));
        assert_eq!(place.town, Some("吉安鄉".to_string()));
    }

    #[tokio::test]
    async fn test_mock_geocoding_unknown_location() {
        let place = MockGeocodingService
            .reverse_geocode(0.0, 0.0, DEFAULT_LANGUAGE)
            .await
            .unwrap();

        assert!(place.is_none());
    }

    #[tokio::test]
    async fn test_create_offline_service() {
        let geocoder = create_geocoding_service(&Config::default(), true).unwrap();
        assert!(matches!(geocoder, Geocoder::Mock(_)));

        let place = geocoder
            .reverse_geocode(25.04, 121.53, DEFAULT_LANGUAGE)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(place.county, None);
    }
}
