use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{instrument, warn};

use super::{fetch_json, http_client};
use crate::TravelError;
use crate::cache::{ExpiringCache, ttl};
use crate::config::ProvidersConfig;

const PROVIDER: &str = "REST Countries";

/// Country facts shown next to a destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryInfo {
    pub name: String,
    pub native_name: Option<Value>,
    /// `N/A` when the country has none listed
    pub capital: String,
    pub region: String,
    pub subregion: Option<String>,
    pub population: u64,
    pub currencies: Option<Value>,
    pub languages: Option<Value>,
    pub flag: Option<String>,
    pub timezones: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawName {
    common: String,
    #[serde(rename = "nativeName")]
    native_name: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawCountry {
    name: RawName,
    #[serde(default)]
    capital: Vec<String>,
    #[serde(default)]
    region: String,
    subregion: Option<String>,
    #[serde(default)]
    population: u64,
    currencies: Option<Value>,
    languages: Option<Value>,
    flag: Option<String>,
    #[serde(default)]
    timezones: Vec<String>,
}

impl From<RawCountry> for CountryInfo {
    fn from(raw: RawCountry) -> Self {
        Self {
            name: raw.name.common,
            native_name: raw.name.native_name,
            capital: raw
                .capital
                .into_iter()
                .next()
                .unwrap_or_else(|| "N/A".to_string()),
            region: raw.region,
            subregion: raw.subregion,
            population: raw.population,
            currencies: raw.currencies,
            languages: raw.languages,
            flag: raw.flag,
            timezones: raw.timezones,
        }
    }
}

#[derive(Debug)]
pub struct CountryService {
    client: reqwest::Client,
    base_url: String,
    cache: ExpiringCache<CountryInfo>,
}

impl CountryService {
    pub fn from_config(config: &ProvidersConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_seconds)?,
            base_url: config.restcountries_base_url.trim_end_matches('/').to_string(),
            cache: ExpiringCache::new(ttl::COUNTRY_METADATA),
        })
    }

    /// Facts about a country by name; any failure is logged and yields `None`
    #[instrument(skip(self))]
    pub async fn country_info(&self, name: &str) -> Option<CountryInfo> {
        let key = format!("country_{}", name.trim().to_lowercase());
        if let Some(info) = self.cache.get(&key) {
            return Some(info);
        }

        match self.fetch(name.trim()).await {
            Ok(Some(info)) => {
                self.cache.set(&key, info.clone());
                Some(info)
            }
            Ok(None) => {
                warn!("Country '{}' not found", name);
                None
            }
            Err(e) => {
                warn!("Country lookup failed: {}", e);
                None
            }
        }
    }

    async fn fetch(&self, name: &str) -> Result<Option<CountryInfo>, TravelError> {
        let url = format!("{}/name/{}", self.base_url, urlencoding::encode(name));
        let countries: Vec<RawCountry> = fetch_json(self.client.get(url), PROVIDER).await?;
        Ok(countries.into_iter().next().map(CountryInfo::from))
    }

    pub fn sweep_expired_cache(&self) -> usize {
        self.cache.sweep_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing;
    use axum::{Json, Router, extract::Path, http::StatusCode, response::IntoResponse, routing::get};
    use serde_json::json;

    async fn service() -> CountryService {
        let router = Router::new().route(
            "/name/{name}",
            get(|Path(name): Path<String>| async move {
                if name != "Città del Vaticano" && name != "Portugal" {
                    return StatusCode::NOT_FOUND.into_response();
                }
                Json(json!([{
                    "name": { "common": name, "nativeName": { "por": { "common": "Portugal" } } },
                    "capital": [],
                    "region": "Europe",
                    "subregion": "Southern Europe",
                    "population": 10305564,
                    "currencies": { "EUR": { "name": "Euro", "symbol": "€" } },
                    "flag": "🇵🇹",
                    "timezones": ["UTC-01:00", "UTC"]
                }]))
                .into_response()
            }),
        );
        let config = ProvidersConfig {
            restcountries_base_url: testing::serve(router).await,
            ..ProvidersConfig::default()
        };
        CountryService::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn country_facts_are_mapped_and_cached() {
        let service = service().await;
        let info = service.country_info("Portugal").await.unwrap();

        assert_eq!(info.name, "Portugal");
        assert_eq!(info.capital, "N/A");
        assert_eq!(info.timezones.len(), 2);
        assert_eq!(service.cache.len(), 1);
    }

    #[tokio::test]
    async fn names_are_url_encoded() {
        let service = service().await;
        let info = service.country_info("Città del Vaticano").await.unwrap();
        assert_eq!(info.name, "Città del Vaticano");
    }

    #[tokio::test]
    async fn unknown_country_is_none() {
        let service = service().await;
        assert!(service.country_info("Atlantide").await.is_none());
        assert!(service.cache.is_empty());
    }
}
