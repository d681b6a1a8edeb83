//! Fallback synthesizer
//!
//! Produces plausible substitute data when a real provider is unavailable:
//! - Flights: haversine distance pricing with ±20% per-offer variation
//! - Hotels: a fixed six-tier ladder over a per-city base price, ±15% variation
//! - Currency: a fixed EUR table, rebased arithmetically for other bases
//!
//! Nothing in here fails. Every generated offer carries `is_synthetic = true`
//! and every list is sorted ascending by price.

pub mod currency;
pub mod flights;
pub mod hotels;

pub use currency::fallback_rates;
pub use flights::{flight_base_price, flight_base_price_for_distance, generate_flights};
pub use hotels::{HOTEL_TIERS, HotelTier, generate_hotels, hotel_base_price};

/// Unique-enough prefix for generated offer ids
fn id_stamp() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
