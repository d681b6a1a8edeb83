//! Amadeus self-service flight offers

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use super::flights::FlightProvider;
use super::{fetch_json, http_client};
use crate::TravelError;
use crate::clock::{self, Clock};
use crate::config::ProvidersConfig;
use crate::credentials;
use crate::error::ErrorKind;
use crate::models::{FlightOffer, FlightQuery};

const PROVIDER: &str = "Amadeus";
/// Tokens are refreshed this long before the upstream expiry
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const MAX_OFFERS: u32 = 50;

/// Italian city names mapped to the English keywords Amadeus searches by
const CITY_KEYWORDS: &[(&str, &str)] = &[
    ("roma", "rome"),
    ("milano", "milan"),
    ("napoli", "naples"),
    ("venezia", "venice"),
    ("firenze", "florence"),
    ("torino", "turin"),
    ("genova", "genoa"),
    ("londra", "london"),
    ("parigi", "paris"),
    ("barcellona", "barcelona"),
    ("berlino", "berlin"),
    ("monaco", "munich"),
    ("bruxelles", "brussels"),
    ("zurigo", "zurich"),
    ("ginevra", "geneva"),
    ("lisbona", "lisbon"),
    ("dublino", "dublin"),
    ("stoccolma", "stockholm"),
    ("copenaghen", "copenhagen"),
    ("varsavia", "warsaw"),
    ("praga", "prague"),
    ("atene", "athens"),
    ("mosca", "moscow"),
    ("pechino", "beijing"),
    ("il cairo", "cairo"),
    ("città del capo", "cape town"),
    ("san paolo", "sao paulo"),
    ("città del messico", "mexico city"),
];

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    refresh_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct DataResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Location {
    iata_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOffer {
    id: String,
    price: RawPrice,
    itineraries: Vec<RawItinerary>,
    #[serde(default)]
    validating_airline_codes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawPrice {
    total: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct RawItinerary {
    #[serde(default)]
    duration: String,
    #[serde(default)]
    segments: Vec<serde_json::Value>,
}

/// OAuth2 client-credentials client for the Amadeus test or production API
#[derive(Debug)]
pub struct AmadeusClient {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<AccessToken>>,
    clock: Arc<dyn Clock>,
}

impl AmadeusClient {
    /// `None` unless both id and secret are real values
    pub fn from_config(config: &ProvidersConfig) -> anyhow::Result<Option<Self>> {
        let id = credentials::configured(config.amadeus_client_id.as_deref());
        let secret = credentials::configured(config.amadeus_client_secret.as_deref());
        let (Some(id), Some(secret)) = (id, secret) else {
            info!("Amadeus credentials not configured, flights will be approximated");
            return Ok(None);
        };

        Ok(Some(Self {
            client: http_client(config.timeout_seconds)?,
            base_url: config.amadeus_base_url.trim_end_matches('/').to_string(),
            client_id: id.to_string(),
            client_secret: secret.to_string(),
            token: Mutex::new(None),
            clock: clock::system(),
        }))
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Cached bearer token, fetched again shortly before it expires
    pub async fn access_token(&self) -> Result<String, TravelError> {
        let mut token = self.token.lock().await;
        if let Some(current) = token.as_ref()
            && self.clock.now() < current.refresh_at
        {
            return Ok(current.value.clone());
        }

        let request = self
            .client
            .post(format!("{}/v1/security/oauth2/token", self.base_url))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ]);
        let response: TokenResponse = fetch_json(request, PROVIDER).await?;

        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        debug!("New Amadeus token valid for {}s", lifetime.as_secs());
        *token = Some(AccessToken {
            value: response.access_token.clone(),
            refresh_at: self.clock.now() + lifetime,
        });
        Ok(response.access_token)
    }

    /// IATA code for a city name or code
    #[instrument(skip(self))]
    pub async fn resolve_airport(&self, place: &str) -> Result<String, TravelError> {
        let place = place.trim();
        if place.len() == 3 && place.chars().all(|c| c.is_ascii_uppercase()) {
            return Ok(place.to_string());
        }

        let lowered = place.to_lowercase();
        let keyword = CITY_KEYWORDS
            .iter()
            .find(|(italian, _)| *italian == lowered)
            .map_or(place, |(_, english)| *english);

        let token = self.access_token().await?;
        let request = self
            .client
            .get(format!("{}/v1/reference-data/locations", self.base_url))
            .bearer_auth(token)
            .query(&[
                ("subType", "AIRPORT"),
                ("keyword", keyword),
                ("page[limit]", "1"),
            ]);
        let response: DataResponse<Location> = fetch_json(request, PROVIDER).await?;

        response
            .data
            .into_iter()
            .next()
            .map(|location| location.iata_code)
            .ok_or_else(|| TravelError::validation(format!("No airport found for '{place}'")))
    }

    fn to_offer(raw: RawOffer, query: &FlightQuery) -> Result<FlightOffer, TravelError> {
        let price_total = raw
            .price
            .total
            .parse::<f64>()
            .map_err(|_| ErrorKind::MalformedResponse)?;
        let outbound = raw.itineraries.first().ok_or(ErrorKind::MalformedResponse)?;
        let stops = u8::try_from(outbound.segments.len().saturating_sub(1)).unwrap_or(u8::MAX);

        Ok(FlightOffer {
            id: raw.id,
            airline: raw
                .validating_airline_codes
                .first()
                .cloned()
                .unwrap_or_default(),
            origin: query.origin.clone(),
            destination: query.destination.clone(),
            departure_date: query.departure_date,
            return_date: query.return_date,
            price_total,
            currency: raw.price.currency,
            duration: format_iso_duration(&outbound.duration),
            stops,
            booking_url: None,
            is_synthetic: false,
        })
    }
}

#[async_trait]
impl FlightProvider for AmadeusClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    #[instrument(skip(self), fields(origin = %query.origin, destination = %query.destination))]
    async fn search(&self, query: &FlightQuery) -> Result<Vec<FlightOffer>, TravelError> {
        let origin = self.resolve_airport(&query.origin).await?;
        let destination = self.resolve_airport(&query.destination).await?;
        let token = self.access_token().await?;

        let mut params = vec![
            ("originLocationCode", origin),
            ("destinationLocationCode", destination),
            ("departureDate", query.departure_date.to_string()),
            ("adults", query.passengers.max(1).to_string()),
            ("travelClass", "ECONOMY".to_string()),
            ("max", MAX_OFFERS.to_string()),
        ];
        if let Some(return_date) = query.return_date {
            params.push(("returnDate", return_date.to_string()));
        }

        let request = self
            .client
            .get(format!("{}/v2/shopping/flight-offers", self.base_url))
            .bearer_auth(token)
            .query(&params);
        let response: DataResponse<RawOffer> = fetch_json(request, PROVIDER).await?;

        let mut offers = response
            .data
            .into_iter()
            .map(|raw| Self::to_offer(raw, query))
            .collect::<Result<Vec<_>, _>>()?;
        offers.sort_by(|a, b| a.price_total.total_cmp(&b.price_total));
        info!("Amadeus returned {} offers", offers.len());
        Ok(offers)
    }
}

/// `PT2H15M` → `2h 15m`; anything else is returned unchanged
fn format_iso_duration(duration: &str) -> String {
    let Some(rest) = duration.strip_prefix("PT") else {
        return duration.to_string();
    };
    let (hours, rest) = match rest.split_once('H') {
        Some((hours, rest)) => (Some(hours), rest),
        None => (None, rest),
    };
    let minutes = rest.strip_suffix('M').filter(|m| !m.is_empty());

    match (hours, minutes) {
        (Some(h), Some(m)) => format!("{h}h {m}m"),
        (Some(h), None) => format!("{h}h"),
        (None, Some(m)) => format!("{m}m"),
        (None, None) => duration.to_string(),
    }
}
