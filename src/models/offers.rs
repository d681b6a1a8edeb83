//! Flight and hotel offers

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Parameters of a flight search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightQuery {
    /// Origin city name or IATA code
    pub origin: String,
    /// Destination city name or IATA code
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    /// Number of travelling adults
    pub passengers: u32,
}

impl FlightQuery {
    /// Cache key covering every search parameter
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!(
            "flights_{}_{}_{}_{}_{}",
            self.origin.to_lowercase(),
            self.destination.to_lowercase(),
            self.departure_date,
            self.return_date
                .map_or_else(|| "oneway".to_string(), |d| d.to_string()),
            self.passengers
        )
    }
}

/// A priced flight option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightOffer {
    pub id: String,
    pub airline: String,
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    /// Total price for all passengers
    pub price_total: f64,
    pub currency: String,
    /// Human-readable duration such as `2h 15m`
    pub duration: String,
    pub stops: u8,
    pub booking_url: Option<String>,
    /// True when generated locally instead of returned by a provider
    pub is_synthetic: bool,
}

/// Parameters of a hotel search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelQuery {
    pub city: String,
    pub checkin: NaiveDate,
    pub checkout: NaiveDate,
    pub guests: u32,
    pub rooms: u32,
}

impl HotelQuery {
    /// Nights between check-in and check-out, at least one
    #[must_use]
    pub fn nights(&self) -> u32 {
        let nights = (self.checkout - self.checkin).num_days().max(1);
        u32::try_from(nights).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn cache_key(&self) -> String {
        format!(
            "hotels_{}_{}_{}_{}_{}",
            self.city.to_lowercase(),
            self.checkin,
            self.checkout,
            self.guests,
            self.rooms
        )
    }
}

/// A priced accommodation option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelOffer {
    pub id: String,
    pub name: String,
    pub stars: u8,
    pub city: String,
    pub price_per_night: f64,
    /// Price for every night and room
    pub price_total: f64,
    pub currency: String,
    pub checkin: NaiveDate,
    pub checkout: NaiveDate,
    pub nights: u32,
    pub rooms: u32,
    pub guests: u32,
    pub amenities: Vec<String>,
    /// Guest rating between 3.5 and 5.0
    pub rating: f64,
    pub booking_url: Option<String>,
    pub is_synthetic: bool,
}
