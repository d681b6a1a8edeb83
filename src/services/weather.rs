use serde_json::Value;
use tracing::{info, instrument};

use super::{fetch_json, http_client};
use crate::TravelError;
use crate::config::ProvidersConfig;
use crate::credentials;
use crate::geo::GeoPoint;

const PROVIDER: &str = "OpenWeather";

/// Current conditions and 5-day forecast from OpenWeather.
///
/// Without a real API key both lookups return `Ok(None)` and no request is made.
#[derive(Debug)]
pub struct WeatherService {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl WeatherService {
    pub fn from_config(config: &ProvidersConfig) -> anyhow::Result<Self> {
        let api_key =
            credentials::configured(config.openweather_api_key.as_deref()).map(str::to_string);
        if api_key.is_none() {
            info!("OpenWeather API key not configured, weather is disabled");
        }

        Ok(Self {
            client: http_client(config.timeout_seconds)?,
            base_url: config.openweather_base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    #[instrument(skip(self))]
    pub async fn current_weather(&self, at: GeoPoint) -> Result<Option<Value>, TravelError> {
        self.fetch("/weather", at).await
    }

    #[instrument(skip(self))]
    pub async fn forecast(&self, at: GeoPoint) -> Result<Option<Value>, TravelError> {
        self.fetch("/forecast", at).await
    }

    async fn fetch(&self, path: &str, at: GeoPoint) -> Result<Option<Value>, TravelError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(None);
        };

        let request = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(&[
                ("lat", at.lat.to_string()),
                ("lon", at.lon.to_string()),
                ("appid", api_key.to_string()),
                ("lang", "it".to_string()),
                ("units", "metric".to_string()),
            ]);
        fetch_json(request, PROVIDER).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::services::testing;
    use axum::{Json, Router, extract::Query, http::StatusCode, routing::get};
    use serde_json::json;
    use std::collections::HashMap;

    const ROME: GeoPoint = GeoPoint::new(41.9, 12.5);

    async fn service(api_key: &str, router: Router) -> WeatherService {
        let config = ProvidersConfig {
            openweather_api_key: Some(api_key.to_string()),
            openweather_base_url: testing::serve(router).await,
            ..ProvidersConfig::default()
        };
        WeatherService::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn placeholder_key_disables_lookups() {
        let router = Router::new().route("/weather", get(|| async { StatusCode::IM_A_TEAPOT }));
        let service = service("YOUR_OPENWEATHER_API_KEY", router).await;

        assert_eq!(service.current_weather(ROME).await.unwrap(), None);
        assert_eq!(service.forecast(ROME).await.unwrap(), None);
    }

    #[tokio::test]
    async fn query_carries_key_and_metric_units() {
        let router = Router::new().route(
            "/weather",
            get(|Query(params): Query<HashMap<String, String>>| async move { Json(json!(params)) }),
        );
        let service = service("abc123", router).await;

        let echoed = service.current_weather(ROME).await.unwrap().unwrap();
        assert_eq!(echoed["appid"], "abc123");
        assert_eq!(echoed["units"], "metric");
        assert_eq!(echoed["lang"], "it");
        assert_eq!(echoed["lat"], "41.9");
    }

    #[tokio::test]
    async fn upstream_statuses_are_classified() {
        let router = Router::new()
            .route("/weather", get(|| async { StatusCode::TOO_MANY_REQUESTS }))
            .route("/forecast", get(|| async { StatusCode::UNAUTHORIZED }));
        let service = service("abc123", router).await;

        let err = service.current_weather(ROME).await.unwrap_err();
        assert_eq!(err.kind(), Some(&ErrorKind::rate_limited(PROVIDER)));

        let err = service.forecast(ROME).await.unwrap_err();
        assert_eq!(err.kind(), Some(&ErrorKind::UpstreamStatus(401)));
    }
}
