//! Travel data services
//!
//! Each service owns its cache (and, for Nominatim, shares a throttle), tries
//! the real provider when it is configured and falls back to approximate data
//! where the provider has no real source.

use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::TravelError;
use crate::error::ErrorKind;

pub mod amadeus;
pub mod country;
pub mod currency;
pub mod flights;
pub mod geocoding;
pub mod hotels;
pub mod weather;

pub use amadeus::AmadeusClient;
pub use country::{CountryInfo, CountryService};
pub use currency::{CurrencyService, currency_symbol};
pub use flights::{FlightProvider, FlightService};
pub use geocoding::{CityLocation, CityMatch, GeocodingService};
pub use hotels::HotelService;
pub use weather::WeatherService;

const USER_AGENT: &str = concat!("CreaViaggi/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client settings for provider calls
pub(crate) fn http_client(timeout_seconds: u32) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds.into()))
        .user_agent(USER_AGENT)
        .build()
        .with_context(|| "Failed to create HTTP client")
}

/// Send `request` and decode a JSON body, classifying failures per provider
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    provider: &str,
) -> Result<T, TravelError> {
    let response = request
        .send()
        .await
        .map_err(|e| ErrorKind::connection(e.to_string()))?;

    let status = response.status();
    debug!("{} responded with {}", provider, status);
    if !status.is_success() {
        return Err(ErrorKind::from_status(provider, status.as_u16()).into());
    }

    response.json::<T>().await.map_err(|e| {
        debug!("{} body did not decode: {}", provider, e);
        ErrorKind::MalformedResponse.into()
    })
}
