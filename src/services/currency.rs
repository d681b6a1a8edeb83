use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{instrument, warn};

use super::{fetch_json, http_client};
use crate::TravelError;
use crate::cache::{ExpiringCache, ttl};
use crate::config::ProvidersConfig;
use crate::fallback;

const PROVIDER: &str = "ExchangeRate";

pub type Rates = BTreeMap<String, f64>;

#[derive(Debug, Deserialize)]
struct LatestRates {
    rates: Rates,
}

const SYMBOLS: &[(&str, &str)] = &[
    ("EUR", "€"),
    ("USD", "$"),
    ("GBP", "£"),
    ("JPY", "¥"),
    ("CHF", "Fr"),
    ("CAD", "C$"),
    ("AUD", "A$"),
    ("CNY", "¥"),
    ("INR", "₹"),
    ("BRL", "R$"),
    ("RUB", "₽"),
    ("KRW", "₩"),
    ("SEK", "kr"),
    ("NOK", "kr"),
    ("DKK", "kr"),
    ("PLN", "zł"),
    ("CZK", "Kč"),
    ("HUF", "Ft"),
    ("TRY", "₺"),
    ("ZAR", "R"),
    ("MXN", "$"),
    ("NZD", "NZ$"),
    ("SGD", "S$"),
    ("HKD", "HK$"),
    ("THB", "฿"),
];

/// Display symbol for a currency code, the code itself when unknown
#[must_use]
pub fn currency_symbol(code: &str) -> &str {
    SYMBOLS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(code))
        .map_or(code, |(_, symbol)| *symbol)
}

/// Exchange rates with a fixed-table fallback
#[derive(Debug)]
pub struct CurrencyService {
    client: reqwest::Client,
    base_url: String,
    cache: ExpiringCache<Rates>,
}

impl CurrencyService {
    pub fn new(config: &ProvidersConfig, cache: ExpiringCache<Rates>) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_seconds)?,
            base_url: config.exchangerate_base_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    pub fn from_config(config: &ProvidersConfig) -> anyhow::Result<Self> {
        Self::new(config, ExpiringCache::new(ttl::CURRENCY_RATES))
    }

    /// Rates for one unit of `base`. Live rates are cached; the fallback
    /// table is returned uncached so the next call retries the provider.
    #[instrument(skip(self))]
    pub async fn exchange_rates(&self, base: &str) -> Rates {
        let base = base.trim().to_uppercase();
        let key = format!("rates_{base}");
        if let Some(rates) = self.cache.get(&key) {
            return rates;
        }

        match self.fetch_rates(&base).await {
            Ok(rates) => {
                self.cache.set(&key, rates.clone());
                rates
            }
            Err(e) => {
                warn!("Exchange rate lookup failed, using fixed table: {}", e);
                fallback::fallback_rates(&base)
            }
        }
    }

    async fn fetch_rates(&self, base: &str) -> Result<Rates, TravelError> {
        let url = format!("{}/latest/{}", self.base_url, urlencoding::encode(base));
        let latest: LatestRates = fetch_json(self.client.get(url), PROVIDER).await?;
        Ok(latest.rates)
    }

    /// `amount` in `to`, rounded to cents. Returns `amount` unchanged when no
    /// rate is available.
    pub async fn convert(&self, amount: f64, from: &str, to: &str) -> f64 {
        if from.eq_ignore_ascii_case(to) {
            return amount;
        }

        let rates = self.exchange_rates(from).await;
        match rates.get(&to.trim().to_uppercase()) {
            Some(rate) => (amount * rate * 100.0).round() / 100.0,
            None => {
                warn!("No exchange rate from {} to {}", from, to);
                amount
            }
        }
    }

    pub fn sweep_expired_cache(&self) -> usize {
        self.cache.sweep_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing;
    use axum::{Json, Router, extract::Path, http::StatusCode, routing::get};
    use rstest::rstest;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn service(base_url: String) -> CurrencyService {
        let config = ProvidersConfig {
            exchangerate_base_url: base_url,
            ..ProvidersConfig::default()
        };
        CurrencyService::from_config(&config).unwrap()
    }

    #[rstest]
    #[case("EUR", "€")]
    #[case("gbp", "£")]
    #[case("XYZ", "XYZ")]
    fn symbols(#[case] code: &str, #[case] expected: &str) {
        assert_eq!(currency_symbol(code), expected);
    }

    #[tokio::test]
    async fn live_rates_are_cached() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/latest/{base}",
            get(move |Path(base): Path<String>| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(json!({ "base": base, "rates": { "USD": 1.2, "GBP": 0.9 } }))
                }
            }),
        );
        let service = service(testing::serve(router).await);

        assert_eq!(service.convert(10.0, "EUR", "USD").await, 12.0);
        assert_eq!(service.convert(10.0, "eur", "GBP").await, 9.0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_use_the_fixed_table() {
        let router = Router::new().route(
            "/latest/{base}",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
        let service = service(testing::serve(router).await);

        let rates = service.exchange_rates("EUR").await;
        assert_eq!(rates, fallback::fallback_rates("EUR"));
        assert!(service.cache.is_empty());

        assert_eq!(service.convert(100.0, "EUR", "USD").await, 110.0);
        assert_eq!(service.convert(3.0, "GBP", "GBP").await, 3.0);
    }

    #[tokio::test]
    async fn unknown_target_keeps_the_amount() {
        let service = service("http://127.0.0.1:9".to_string());
        assert_eq!(service.convert(42.5, "EUR", "XYZ").await, 42.5);
    }
}
