//! Data models for the CreaViaggi integration core
//!
//! This module contains the domain models organized by concern:
//! - Offers: flight and hotel offers, real or synthetic, and the queries producing them
//! - Trip: structured data recovered from the generation backend

pub mod offers;
pub mod trip;

// Re-export all public types for convenient access
pub use offers::{FlightOffer, FlightQuery, HotelOffer, HotelQuery};
pub use trip::{DestinationSuggestion, ItineraryDay, TripRequest};
