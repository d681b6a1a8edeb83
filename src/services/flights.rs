use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::AmadeusClient;
use crate::TravelError;
use crate::cache::{ExpiringCache, ttl};
use crate::config::ProvidersConfig;
use crate::fallback;
use crate::models::{FlightOffer, FlightQuery};

/// A real source of flight offers
#[async_trait]
pub trait FlightProvider: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;
    async fn search(&self, query: &FlightQuery) -> Result<Vec<FlightOffer>, TravelError>;
}

/// Cached flight search with a synthetic fallback
#[derive(Debug)]
pub struct FlightService {
    cache: ExpiringCache<Vec<FlightOffer>>,
    provider: Option<Arc<dyn FlightProvider>>,
}

impl FlightService {
    /// Uses Amadeus when its credentials are configured
    pub fn from_config(config: &ProvidersConfig) -> anyhow::Result<Self> {
        let provider = AmadeusClient::from_config(config)?
            .map(|client| Arc::new(client) as Arc<dyn FlightProvider>);
        Ok(Self::new(provider, ExpiringCache::new(ttl::FLIGHTS)))
    }

    #[must_use]
    pub fn new(
        provider: Option<Arc<dyn FlightProvider>>,
        cache: ExpiringCache<Vec<FlightOffer>>,
    ) -> Self {
        Self { cache, provider }
    }

    /// Offers for `query`, never empty-handed: provider failures fall back to
    /// approximate offers, which are cached like real ones
    #[instrument(skip(self), fields(origin = %query.origin, destination = %query.destination))]
    pub async fn search(&self, query: &FlightQuery) -> Vec<FlightOffer> {
        let key = query.cache_key();
        if let Some(offers) = self.cache.get(&key) {
            return offers;
        }

        if let Some(provider) = &self.provider {
            match provider.search(query).await {
                Ok(offers) => {
                    info!("{} returned {} flight offers", provider.name(), offers.len());
                    self.cache.set(&key, offers.clone());
                    return offers;
                }
                Err(e) => warn!(
                    "{} flight search failed, using approximate offers: {}",
                    provider.name(),
                    e
                ),
            }
        } else {
            debug!("No flight provider configured");
        }

        let offers = fallback::generate_flights(query, &mut rand::rng());
        self.cache.set(&key, offers.clone());
        offers
    }

    #[must_use]
    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn sweep_expired_cache(&self) -> usize {
        self.cache.sweep_expired()
    }
}
