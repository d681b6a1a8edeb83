//! Structured answers recovered from the generation backend

use serde::{Deserialize, Serialize};

fn default_travelers() -> u32 {
    2
}

fn default_nights() -> u32 {
    7
}

fn default_budget() -> f64 {
    500.0
}

fn default_accommodation() -> String {
    "hotel".to_string()
}

/// Trip parameters extracted from a natural-language request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRequest {
    pub destination: String,
    #[serde(default = "default_travelers")]
    pub travelers: u32,
    #[serde(default = "default_nights")]
    pub nights: u32,
    /// Budget per person in euros
    #[serde(default = "default_budget")]
    pub budget: f64,
    /// One of `hotel`, `apartment`, `bnb`
    #[serde(default = "default_accommodation")]
    pub accommodation: String,
    #[serde(default)]
    pub preferences: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationSuggestion {
    pub city: String,
    pub country: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub score: u32,
}

/// One day of a generated itinerary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryDay {
    pub day: u32,
    pub title: String,
    #[serde(default)]
    pub activities: Vec<String>,
    #[serde(default)]
    pub highlights: String,
}
