use tracing::{debug, instrument};

use crate::cache::{ExpiringCache, ttl};
use crate::fallback;
use crate::models::{HotelOffer, HotelQuery};

/// Hotel search over the synthetic tier catalogue
#[derive(Debug)]
pub struct HotelService {
    cache: ExpiringCache<Vec<HotelOffer>>,
}

impl Default for HotelService {
    fn default() -> Self {
        Self::new(ExpiringCache::new(ttl::HOTELS))
    }
}

impl HotelService {
    #[must_use]
    pub fn new(cache: ExpiringCache<Vec<HotelOffer>>) -> Self {
        Self { cache }
    }

    #[instrument(skip(self), fields(city = %query.city))]
    pub fn search(&self, query: &HotelQuery) -> Vec<HotelOffer> {
        let key = query.cache_key();
        if let Some(hotels) = self.cache.get(&key) {
            return hotels;
        }

        debug!("No hotel provider available, generating approximate offers");
        let hotels = fallback::generate_hotels(query, &mut rand::rng());
        self.cache.set(&key, hotels.clone());
        hotels
    }

    pub fn sweep_expired_cache(&self) -> usize {
        self.cache.sweep_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::NaiveDate;
    use std::sync::Arc;
    use std::time::Duration;

    fn query(city: &str) -> HotelQuery {
        HotelQuery {
            city: city.to_string(),
            checkin: NaiveDate::from_ymd_opt(2026, 4, 2).unwrap(),
            checkout: NaiveDate::from_ymd_opt(2026, 4, 5).unwrap(),
            guests: 2,
            rooms: 1,
        }
    }

    #[test]
    fn repeated_searches_hit_the_cache() {
        let service = HotelService::default();
        let first = service.search(&query("Firenze"));
        let second = service.search(&query("Firenze"));

        assert_eq!(first, second);
        assert_eq!(first.len(), fallback::HOTEL_TIERS.len());
    }

    #[test]
    fn expired_searches_are_regenerated() {
        let clock = Arc::new(ManualClock::new());
        let service = HotelService::new(ExpiringCache::with_clock(ttl::HOTELS, clock.clone()));

        service.search(&query("Torino"));
        service.search(&query("Napoli"));
        clock.advance(ttl::HOTELS + Duration::from_millis(1));

        assert_eq!(service.sweep_expired_cache(), 2);
    }
}
