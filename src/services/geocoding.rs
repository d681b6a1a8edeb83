//! City search and coordinate lookups against Nominatim

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::{fetch_json, http_client};
use crate::TravelError;
use crate::cache::{ExpiringCache, ttl};
use crate::config::{ProvidersConfig, ThrottleConfig};
use crate::error::ErrorKind;
use crate::geo::GeoPoint;
use crate::throttle::{Throttle, channels};

const PROVIDER: &str = "Nominatim";
const MIN_QUERY_LEN: usize = 3;
const UNKNOWN_PLACE: &str = "Località sconosciuta";
const SETTLEMENT_TYPES: [&str; 3] = ["city", "town", "village"];

/// One autocomplete candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityMatch {
    pub name: String,
    pub full_name: String,
    pub country: String,
    pub location: GeoPoint,
    pub place_type: String,
    pub importance: Option<f64>,
}

/// A resolved place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityLocation {
    pub name: String,
    pub country: String,
    pub country_code: String,
    pub location: GeoPoint,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Place {
    #[serde(default)]
    display_name: String,
    lat: String,
    lon: String,
    #[serde(rename = "type", default)]
    place_type: String,
    importance: Option<f64>,
    #[serde(default)]
    address: Address,
}

impl Place {
    fn point(&self) -> Result<GeoPoint, ErrorKind> {
        let lat = self.lat.parse().map_err(|_| ErrorKind::MalformedResponse)?;
        let lon = self.lon.parse().map_err(|_| ErrorKind::MalformedResponse)?;
        Ok(GeoPoint::new(lat, lon))
    }
}

#[derive(Debug)]
pub struct GeocodingService {
    client: reqwest::Client,
    base_url: String,
    throttle: Arc<Throttle>,
    interval: Duration,
    searches: ExpiringCache<Vec<CityMatch>>,
    places: ExpiringCache<CityLocation>,
}

impl GeocodingService {
    pub fn new(
        providers: &ProvidersConfig,
        throttle_config: &ThrottleConfig,
        throttle: Arc<Throttle>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(providers.timeout_seconds)?,
            base_url: providers.nominatim_base_url.trim_end_matches('/').to_string(),
            throttle,
            interval: Duration::from_millis(throttle_config.nominatim_interval_ms),
            searches: ExpiringCache::new(ttl::CITY_COORDINATES),
            places: ExpiringCache::new(ttl::CITY_COORDINATES),
        })
    }

    /// Replace both caches, e.g. to share a test clock
    #[must_use]
    pub fn with_caches(
        mut self,
        searches: ExpiringCache<Vec<CityMatch>>,
        places: ExpiringCache<CityLocation>,
    ) -> Self {
        self.searches = searches;
        self.places = places;
        self
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, TravelError> {
        self.throttle.wait(channels::NOMINATIM, self.interval).await;
        let request = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(params)
            .query(&[("format", "json"), ("addressdetails", "1")]);
        fetch_json(request, PROVIDER).await
    }

    /// Autocomplete: settlements matching `query`. Short queries and lookup
    /// failures both yield an empty list.
    #[instrument(skip(self))]
    pub async fn search_cities(&self, query: &str, limit: u32) -> Vec<CityMatch> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            return Vec::new();
        }

        let key = format!("search_{}_{}", query.to_lowercase(), limit);
        if let Some(cities) = self.searches.get(&key) {
            return cities;
        }

        let params = [
            ("q", query.to_string()),
            ("limit", limit.to_string()),
            ("featureType", "city".to_string()),
            ("accept-language", "it".to_string()),
        ];
        let places: Vec<Place> = match self.get("/search", &params).await {
            Ok(places) => places,
            Err(e) => {
                warn!("City search failed: {}", e);
                return Vec::new();
            }
        };

        let cities: Vec<CityMatch> = places
            .into_iter()
            .filter(|place| SETTLEMENT_TYPES.contains(&place.place_type.as_str()))
            .filter_map(|place| {
                let location = place.point().ok()?;
                Some(CityMatch {
                    name: place
                        .display_name
                        .split(',')
                        .next()
                        .unwrap_or_default()
                        .trim()
                        .to_string(),
                    full_name: place.display_name,
                    country: place.address.country.unwrap_or_default(),
                    location,
                    place_type: place.place_type,
                    importance: place.importance,
                })
            })
            .collect();

        debug!("{} settlements match '{}'", cities.len(), query);
        self.searches.set(&key, cities.clone());
        cities
    }

    /// Coordinates of a named city, `None` when nothing matches
    #[instrument(skip(self))]
    pub async fn city_coordinates(&self, city: &str) -> Result<Option<CityLocation>, TravelError> {
        let key = format!("coords_{}", city.trim().to_lowercase());
        if let Some(place) = self.places.get(&key) {
            return Ok(Some(place));
        }

        let params = [("q", city.trim().to_string()), ("limit", "1".to_string())];
        let places: Vec<Place> = self.get("/search", &params).await?;
        let Some(place) = places.into_iter().next() else {
            debug!("No coordinates for '{}'", city);
            return Ok(None);
        };

        let location = CityLocation {
            name: city.trim().to_string(),
            location: place.point()?,
            country: place.address.country.unwrap_or_default(),
            country_code: place.address.country_code.unwrap_or_default(),
        };
        self.places.set(&key, location.clone());
        Ok(Some(location))
    }

    /// The settlement at a coordinate pair
    #[instrument(skip(self))]
    pub async fn city_from_coordinates(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<CityLocation, TravelError> {
        let key = format!("reverse_{lat}_{lon}");
        if let Some(place) = self.places.get(&key) {
            return Ok(place);
        }

        let params = [("lat", lat.to_string()), ("lon", lon.to_string())];
        let place: Place = self.get("/reverse", &params).await?;

        let location = place.point()?;
        let address = place.address;
        let result = CityLocation {
            name: address
                .city
                .or(address.town)
                .or(address.village)
                .unwrap_or_else(|| UNKNOWN_PLACE.to_string()),
            country: address.country.unwrap_or_default(),
            country_code: address.country_code.unwrap_or_default(),
            location,
        };
        self.places.set(&key, result.clone());
        Ok(result)
    }

    pub fn sweep_expired_cache(&self) -> usize {
        self.searches.sweep_expired() + self.places.sweep_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing;
    use axum::{Json, Router, extract::Query, http::StatusCode, routing::get};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn nominatim(hits: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/search",
                get(move |Query(params): Query<HashMap<String, String>>| {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        if params.get("q").map(String::as_str) == Some("Nowhere") {
                            return Json(json!([]));
                        }
                        Json(json!([
                            {
                                "display_name": "Bologna, Emilia-Romagna, Italia",
                                "lat": "44.4938", "lon": "11.3387", "type": "city",
                                "importance": 0.8,
                                "address": { "country": "Italia", "country_code": "it" }
                            },
                            {
                                "display_name": "Bologna Centrale, Bologna, Italia",
                                "lat": "44.5", "lon": "11.34", "type": "station",
                                "address": { "country": "Italia" }
                            }
                        ]))
                    }
                }),
            )
            .route(
                "/reverse",
                get(|| async {
                    Json(json!({
                        "lat": "45.07", "lon": "7.68",
                        "address": { "town": "Moncalieri", "country": "Italia", "country_code": "it" }
                    }))
                }),
            )
    }

    async fn service(router: Router, interval_ms: u64) -> GeocodingService {
        let providers = ProvidersConfig {
            nominatim_base_url: testing::serve(router).await,
            ..ProvidersConfig::default()
        };
        let throttle = ThrottleConfig {
            nominatim_interval_ms: interval_ms,
        };
        GeocodingService::new(&providers, &throttle, Arc::new(Throttle::new())).unwrap()
    }

    #[tokio::test]
    async fn short_queries_return_nothing_without_a_call() {
        let service = service(Router::new(), 0).await;
        assert!(service.search_cities("Ba", 5).await.is_empty());
        assert!(service.throttle.last_call(channels::NOMINATIM).await.is_none());
    }

    #[tokio::test]
    async fn search_keeps_only_settlements() {
        let service = service(nominatim(Arc::default()), 0).await;
        let cities = service.search_cities("Bologna", 5).await;

        assert_eq!(cities.len(), 1);
        assert_eq!(cities[0].name, "Bologna");
        assert_eq!(cities[0].country, "Italia");
        assert_eq!(cities[0].location, GeoPoint::new(44.4938, 11.3387));
    }

    #[tokio::test]
    async fn coordinates_are_cached_and_missing_cities_are_none() {
        let hits = Arc::new(AtomicUsize::new(0));
        let service = service(nominatim(hits.clone()), 0).await;

        let first = service.city_coordinates("Bologna").await.unwrap().unwrap();
        let second = service.city_coordinates("bologna").await.unwrap().unwrap();
        assert_eq!(first.country_code, "it");
        assert_eq!(first, second);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(service.city_coordinates("Nowhere").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_lookups_are_swept() {
        let clock = Arc::new(crate::clock::ManualClock::new());
        let service = service(nominatim(Arc::default()), 0).await.with_caches(
            ExpiringCache::with_clock(ttl::CITY_COORDINATES, clock.clone()),
            ExpiringCache::with_clock(ttl::CITY_COORDINATES, clock.clone()),
        );

        service.search_cities("Bologna", 5).await;
        service.city_coordinates("Bologna").await.unwrap();
        assert_eq!(service.sweep_expired_cache(), 0);

        clock.advance(ttl::CITY_COORDINATES + Duration::from_secs(1));
        assert_eq!(service.sweep_expired_cache(), 2);
    }

    #[tokio::test]
    async fn reverse_lookup_prefers_city_then_town() {
        let service = service(nominatim(Arc::default()), 0).await;
        let place = service.city_from_coordinates(45.07, 7.68).await.unwrap();
        assert_eq!(place.name, "Moncalieri");
        assert_eq!(place.location, GeoPoint::new(45.07, 7.68));
    }

    #[tokio::test]
    async fn upstream_errors_are_classified() {
        let router = Router::new().route(
            "/reverse",
            get(|| async { (StatusCode::TOO_MANY_REQUESTS, Json(Value::Null)) }),
        );
        let service = service(router, 0).await;

        let err = service.city_from_coordinates(0.0, 0.0).await.unwrap_err();
        assert_eq!(err.kind(), Some(&ErrorKind::rate_limited(PROVIDER)));
        assert!(service.search_cities("Ovunque", 5).await.is_empty());
    }

    #[tokio::test]
    async fn calls_share_the_nominatim_channel() {
        let service = service(nominatim(Arc::default()), 1000).await;

        let started = tokio::time::Instant::now();
        service.city_coordinates("Bologna").await.unwrap();
        service.city_from_coordinates(44.5, 11.3).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(1000));
    }
}
