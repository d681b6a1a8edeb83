//! `CreaViaggi` - travel planning integration core
//!
//! Caching, throttling and fallback data for the flight, hotel, currency,
//! geocoding and weather providers, plus the text-generation backend that
//! turns free-text requests into structured trip data.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod geo;
pub mod llm;
pub mod models;
pub mod services;
pub mod telemetry;
pub mod throttle;
pub mod web;

// Re-export core types for public API
pub use cache::ExpiringCache;
pub use clock::{Clock, ManualClock, TokioClock};
pub use config::CreaViaggiConfig;
pub use error::{ErrorKind, TravelError};
pub use extract::{ExtractionError, ExtractionResult, HttpOutcome, ResponseExtractor};
pub use geo::GeoPoint;
pub use llm::{BackendResponse, LlmClient, LlmService};
pub use models::{
    DestinationSuggestion, FlightOffer, FlightQuery, HotelOffer, HotelQuery, ItineraryDay,
    TripRequest,
};
pub use throttle::Throttle;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, TravelError>;
