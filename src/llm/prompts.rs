//! Backend actions and the prompts they send upstream

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error text for a request without an `action` field
pub const MISSING_ACTION: &str = "Action non specificata";
/// Error text for an `action` the backend does not know
pub const INVALID_ACTION: &str = "Action non valida";

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

/// One backend request, tagged by its `action` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    /// Pull trip parameters out of a free-text request
    Parse {
        #[serde(default)]
        text: String,
    },
    Suggest {
        #[serde(default = "default_travelers")]
        travelers: u32,
        #[serde(default = "default_nights")]
        nights: u32,
        #[serde(default = "default_budget")]
        budget: f64,
        #[serde(default)]
        preferences: String,
    },
    /// Short marketing copy for a package
    Describe {
        #[serde(default)]
        destination: String,
        #[serde(default = "default_nights")]
        nights: u32,
        #[serde(default = "default_budget")]
        budget: f64,
        #[serde(default = "default_accommodation")]
        accommodation: String,
    },
    Itinerary {
        #[serde(default)]
        destination: String,
        #[serde(default = "default_nights")]
        nights: u32,
        #[serde(default)]
        preferences: String,
    },
    Question {
        #[serde(default)]
        question: String,
        #[serde(default)]
        context: String,
    },
}

/// The two chat messages sent for one action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Action {
    /// Read an action out of a raw request body.
    ///
    /// The error is the message reported back to the caller. A missing or null
    /// `action` and an unknown one are reported separately.
    pub fn from_request(request: &Value) -> Result<Self, String> {
        let action = request.get("action").filter(|a| !a.is_null());
        let Some(name) = action else {
            return Err(MISSING_ACTION.to_string());
        };

        let known = ["parse", "suggest", "describe", "itinerary", "question"];
        if !name.as_str().is_some_and(|name| known.contains(&name)) {
            return Err(INVALID_ACTION.to_string());
        }

        serde_json::from_value(request.clone())
            .map_err(|e| format!("Parametri non validi: {e}"))
    }

    /// Wire name of the action
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Action::Parse { .. } => "parse",
            Action::Suggest { .. } => "suggest",
            Action::Describe { .. } => "describe",
            Action::Itinerary { .. } => "itinerary",
            Action::Question { .. } => "question",
        }
    }

    #[must_use]
    pub fn prompt(&self) -> Prompt {
        match self {
            Action::Parse { text } => Prompt {
                system: PARSE_SYSTEM.to_string(),
                user: format!("Extract from: {text}"),
            },
            Action::Suggest {
                travelers,
                nights,
                budget,
                preferences,
            } => {
                let mut user = format!(
                    "Suggest 5 destinations for: {travelers} travelers, {nights} nights, €{budget}/person budget"
                );
                if !preferences.is_empty() {
                    user.push_str(&format!(", preferences: {preferences}"));
                }
                Prompt {
                    system: SUGGEST_SYSTEM.to_string(),
                    user,
                }
            }
            Action::Describe {
                destination,
                nights,
                budget,
                accommodation,
            } => Prompt {
                system: DESCRIBE_SYSTEM.to_string(),
                user: format!(
                    "Destinazione: {destination}, {nights} notti, €{budget}/persona, alloggio: {accommodation}"
                ),
            },
            Action::Itinerary {
                destination,
                nights,
                preferences,
            } => Prompt {
                system: ITINERARY_SYSTEM.to_string(),
                user: format!(
                    "Destinazione: {destination}, durata: {nights} notti, preferenze: {preferences}"
                ),
            },
            Action::Question { question, context } => Prompt {
                system: QUESTION_SYSTEM.to_string(),
                user: if context.is_empty() {
                    question.clone()
                } else {
                    format!("{context}\n\nDomanda: {question}")
                },
            },
        }
    }
}

const PARSE_SYSTEM: &str = r#"Extract travel data from text. Return ONLY JSON, no explanations.

Rules:
- Extract destination city name
- Extract number of travelers (default: 2)
- Extract nights/days (default: 7)
- Extract budget per person in euros (default: 500)
- Set accommodation: hotel|apartment|bnb (default: hotel)
- Extract any preferences mentioned

JSON format: {"destination":"Paris","travelers":2,"nights":5,"budget":600,"accommodation":"hotel","preferences":"cultural"}"#;

const SUGGEST_SYSTEM: &str = r#"You suggest European travel destinations. Return ONLY JSON array, no explanations.

Format: [{"city":"Rome","country":"Italy","reason":"History and food","score":90}]

Consider: budget, attractions, accessibility."#;

const DESCRIBE_SYSTEM: &str = "Sei un copywriter di viaggi. Crea una descrizione accattivante per un pacchetto viaggio. Max 150 caratteri.
Formato: breve descrizione che invoglia all'acquisto, menziona punti di forza della destinazione.";

const ITINERARY_SYSTEM: &str = r#"Sei una guida turistica esperta. Crea un itinerario giorno per giorno in formato JSON:
[
  {"day":1,"title":"Titolo giornata","activities":["attività1","attività2"],"highlights":"cosa non perdere"},
  ...
]

Max 3 attività per giorno. Considera: attrazioni principali, food, cultura, relax."#;

const QUESTION_SYSTEM: &str =
    "Sei un assistente virtuale per viaggi. Rispondi in modo conciso e utile in italiano. Max 200 caratteri.";
