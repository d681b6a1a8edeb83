use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::config::CreaViaggiConfig;
use crate::error::{ErrorKind, TravelError};
use crate::geo::GeoPoint;
use crate::llm::{BackendResponse, LlmService};
use crate::models::{FlightOffer, FlightQuery, HotelOffer, HotelQuery};
use crate::services::{
    CityLocation, CityMatch, CountryInfo, CountryService, CurrencyService, FlightService,
    GeocodingService, HotelService, WeatherService, currency::Rates, currency_symbol,
};
use crate::throttle::Throttle;

const DEFAULT_CITY_LIMIT: u32 = 5;

/// Everything the HTTP handlers share
#[derive(Debug)]
pub struct AppState {
    pub llm: LlmService,
    pub flights: FlightService,
    pub hotels: HotelService,
    pub currency: CurrencyService,
    pub geocoding: GeocodingService,
    pub countries: CountryService,
    pub weather: WeatherService,
}

impl AppState {
    pub fn from_config(config: &CreaViaggiConfig) -> anyhow::Result<Self> {
        let throttle = Arc::new(Throttle::new());
        Ok(Self {
            llm: LlmService::new(&config.backend)?,
            flights: FlightService::from_config(&config.providers)?,
            hotels: HotelService::default(),
            currency: CurrencyService::from_config(&config.providers)?,
            geocoding: GeocodingService::new(&config.providers, &config.throttle, throttle)?,
            countries: CountryService::from_config(&config.providers)?,
            weather: WeatherService::from_config(&config.providers)?,
        })
    }

    /// Drop stale entries from every service cache
    pub fn sweep_expired_caches(&self) -> usize {
        self.flights.sweep_expired_cache()
            + self.hotels.sweep_expired_cache()
            + self.currency.sweep_expired_cache()
            + self.geocoding.sweep_expired_cache()
            + self.countries.sweep_expired_cache()
    }
}

#[derive(Debug, Deserialize)]
pub struct FlightParams {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    #[serde(default = "default_passengers")]
    pub passengers: u32,
}

impl From<FlightParams> for FlightQuery {
    fn from(params: FlightParams) -> Self {
        Self {
            origin: params.origin,
            destination: params.destination,
            departure_date: params.departure_date,
            return_date: params.return_date,
            passengers: params.passengers.max(1),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HotelParams {
    pub city: String,
    pub checkin: NaiveDate,
    pub checkout: NaiveDate,
    #[serde(default = "default_guests")]
    pub guests: u32,
    #[serde(default = "default_rooms")]
    pub rooms: u32,
}

impl From<HotelParams> for HotelQuery {
    fn from(params: HotelParams) -> Self {
        Self {
            city: params.city,
            checkin: params.checkin,
            checkout: params.checkout,
            guests: params.guests.max(1),
            rooms: params.rooms.max(1),
        }
    }
}

fn default_passengers() -> u32 {
    1
}

fn default_guests() -> u32 {
    2
}

fn default_rooms() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct ConvertParams {
    pub amount: f64,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Conversion {
    pub amount: f64,
    pub from: String,
    pub to: String,
    pub converted: f64,
    pub symbol: String,
}

#[derive(Debug, Deserialize)]
pub struct CitySearchParams {
    pub q: String,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CityParams {
    pub city: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/llm", post(generate))
        .route("/flights", get(search_flights))
        .route("/hotels", get(search_hotels))
        .route("/rates/{base}", get(exchange_rates))
        .route("/convert", get(convert))
        .route("/cities", get(search_cities))
        .route("/cities/coordinates", get(city_coordinates))
        .route("/cities/reverse", get(city_from_coordinates))
        .route("/countries/{name}", get(country_info))
        .route("/weather", get(current_weather))
        .route("/weather/forecast", get(forecast))
        .with_state(state)
}

/// HTTP status for a failed provider call
fn error_status(err: &TravelError) -> StatusCode {
    warn!("Request failed: {}", err);
    match err.kind() {
        Some(ErrorKind::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
        Some(ErrorKind::CredentialsMissing { .. }) => StatusCode::SERVICE_UNAVAILABLE,
        Some(_) => StatusCode::BAD_GATEWAY,
        None => StatusCode::BAD_REQUEST,
    }
}

/// Always answers 200; failures travel in the body
async fn generate(State(state): State<Arc<AppState>>, body: String) -> Json<BackendResponse> {
    let Ok(request) = serde_json::from_str::<Value>(&body) else {
        return Json(BackendResponse::failure(crate::llm::prompts::MISSING_ACTION));
    };
    Json(state.llm.handle(&request).await)
}

async fn search_flights(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FlightParams>,
) -> Json<Vec<FlightOffer>> {
    Json(state.flights.search(&params.into()).await)
}

async fn search_hotels(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HotelParams>,
) -> Json<Vec<HotelOffer>> {
    Json(state.hotels.search(&params.into()))
}

async fn exchange_rates(
    State(state): State<Arc<AppState>>,
    Path(base): Path<String>,
) -> Json<Rates> {
    Json(state.currency.exchange_rates(&base).await)
}

async fn convert(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ConvertParams>,
) -> Json<Conversion> {
    let converted = state
        .currency
        .convert(params.amount, &params.from, &params.to)
        .await;
    let to = params.to.to_uppercase();
    Json(Conversion {
        amount: params.amount,
        from: params.from.to_uppercase(),
        symbol: currency_symbol(&to).to_string(),
        to,
        converted,
    })
}

async fn search_cities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CitySearchParams>,
) -> Json<Vec<CityMatch>> {
    let limit = params.limit.unwrap_or(DEFAULT_CITY_LIMIT);
    Json(state.geocoding.search_cities(&params.q, limit).await)
}

async fn city_coordinates(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CityParams>,
) -> Result<Json<CityLocation>, StatusCode> {
    match state.geocoding.city_coordinates(&params.city).await {
        Ok(Some(place)) => Ok(Json(place)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => Err(error_status(&e)),
    }
}

async fn city_from_coordinates(
    State(state): State<Arc<AppState>>,
    Query(at): Query<GeoPoint>,
) -> Result<Json<CityLocation>, StatusCode> {
    state
        .geocoding
        .city_from_coordinates(at.lat, at.lon)
        .await
        .map(Json)
        .map_err(|e| error_status(&e))
}

async fn country_info(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<CountryInfo>, StatusCode> {
    state
        .countries
        .country_info(&name)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// 503 when no OpenWeather key is configured
async fn current_weather(
    State(state): State<Arc<AppState>>,
    Query(at): Query<GeoPoint>,
) -> Result<Json<Value>, StatusCode> {
    match state.weather.current_weather(at).await {
        Ok(Some(weather)) => Ok(Json(weather)),
        Ok(None) => Err(StatusCode::SERVICE_UNAVAILABLE),
        Err(e) => Err(error_status(&e)),
    }
}

async fn forecast(
    State(state): State<Arc<AppState>>,
    Query(at): Query<GeoPoint>,
) -> Result<Json<Value>, StatusCode> {
    match state.weather.forecast(at).await {
        Ok(Some(forecast)) => Ok(Json(forecast)),
        Ok(None) => Err(StatusCode::SERVICE_UNAVAILABLE),
        Err(e) => Err(error_status(&e)),
    }
}
