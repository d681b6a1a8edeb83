use rand::RngExt;
use tracing::debug;

use crate::models::{HotelOffer, HotelQuery};

const DEFAULT_BASE_PRICE: u32 = 85;
const PRICE_VARIATION: f64 = 0.15;

const CITY_PRICES: &[(&str, u32)] = &[
    ("Roma", 120),
    ("Milano", 110),
    ("Napoli", 80),
    ("Firenze", 100),
    ("Venezia", 130),
    ("Torino", 90),
    ("Parigi", 150),
    ("Londra", 140),
    ("Madrid", 100),
    ("Barcellona", 110),
    ("Amsterdam", 130),
    ("Berlino", 90),
    ("Vienna", 100),
    ("Praga", 70),
];

/// One rung of the synthetic hotel ladder
#[derive(Debug, Clone, Copy)]
pub struct HotelTier {
    pub name: &'static str,
    pub stars: u8,
    pub price_multiplier: f64,
    pub amenities: &'static [&'static str],
}

pub const HOTEL_TIERS: [HotelTier; 6] = [
    HotelTier {
        name: "Luxury",
        stars: 5,
        price_multiplier: 2.5,
        amenities: &[
            "Wi-Fi gratuito",
            "Spa",
            "Piscina",
            "Ristorante",
            "Bar",
            "Concierge",
            "Palestra",
        ],
    },
    HotelTier {
        name: "Boutique",
        stars: 4,
        price_multiplier: 1.8,
        amenities: &["Wi-Fi gratuito", "Ristorante", "Bar", "Terrazza", "Design unico"],
    },
    HotelTier {
        name: "Business",
        stars: 4,
        price_multiplier: 1.5,
        amenities: &[
            "Wi-Fi gratuito",
            "Centro business",
            "Sala conferenze",
            "Palestra",
        ],
    },
    HotelTier {
        name: "Comfort",
        stars: 3,
        price_multiplier: 1.0,
        amenities: &["Wi-Fi gratuito", "Colazione inclusa", "Parcheggio"],
    },
    HotelTier {
        name: "Budget",
        stars: 3,
        price_multiplier: 0.7,
        amenities: &["Wi-Fi gratuito", "Reception 24h"],
    },
    HotelTier {
        name: "Hostel",
        stars: 2,
        price_multiplier: 0.4,
        amenities: &["Wi-Fi gratuito", "Cucina condivisa", "Area comune"],
    },
];

/// Nightly base price for a city, 85 EUR when the city is not listed
#[must_use]
pub fn hotel_base_price(city: &str) -> u32 {
    let city = city.trim();
    CITY_PRICES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(city))
        .map_or(DEFAULT_BASE_PRICE, |(_, price)| *price)
}

/// Generate one synthetic offer per tier, sorted by price
pub fn generate_hotels<R: RngExt>(query: &HotelQuery, rng: &mut R) -> Vec<HotelOffer> {
    let base_price = f64::from(hotel_base_price(&query.city));
    let nights = query.nights();
    let rooms = query.rooms.max(1);
    let stamp = super::id_stamp();

    let mut hotels: Vec<HotelOffer> = HOTEL_TIERS
        .iter()
        .enumerate()
        .map(|(index, tier)| {
            let variation = rng.random_range(-PRICE_VARIATION..=PRICE_VARIATION);
            let price_per_night = (base_price * tier.price_multiplier * (1.0 + variation)).round();
            let rating = ((3.5 + rng.random::<f64>() * 1.5) * 10.0).round() / 10.0;

            HotelOffer {
                id: format!("hotel_{stamp}_{index}"),
                name: format!("{} Hotel {}", tier.name, query.city),
                stars: tier.stars,
                city: query.city.clone(),
                price_per_night,
                price_total: price_per_night * f64::from(nights) * f64::from(rooms),
                currency: "EUR".to_string(),
                checkin: query.checkin,
                checkout: query.checkout,
                nights,
                rooms,
                guests: query.guests,
                amenities: tier.amenities.iter().map(ToString::to_string).collect(),
                rating,
                booking_url: None,
                is_synthetic: true,
            }
        })
        .collect();

    hotels.sort_by(|a, b| a.price_total.total_cmp(&b.price_total));
    debug!(
        "Generated {} synthetic hotels in {} for {} nights",
        hotels.len(),
        query.city,
        nights
    );
    hotels
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rstest::rstest;

    fn query(city: &str, rooms: u32) -> HotelQuery {
        HotelQuery {
            city: city.to_string(),
            checkin: NaiveDate::from_ymd_opt(2026, 7, 10).unwrap(),
            checkout: NaiveDate::from_ymd_opt(2026, 7, 13).unwrap(),
            guests: 2,
            rooms,
        }
    }

    #[rstest]
    #[case("Parigi", 150)]
    #[case("praga", 70)]
    #[case("Reykjavik", 85)]
    fn base_price_lookup(#[case] city: &str, #[case] expected: u32) {
        assert_eq!(hotel_base_price(city), expected);
    }

    #[test]
    fn every_tier_is_represented() {
        let mut rng = StdRng::seed_from_u64(11);
        let hotels = generate_hotels(&query("Roma", 1), &mut rng);

        assert_eq!(hotels.len(), HOTEL_TIERS.len());
        for tier in &HOTEL_TIERS {
            let hotel = hotels
                .iter()
                .find(|h| h.name == format!("{} Hotel Roma", tier.name))
                .unwrap();
            assert_eq!(hotel.stars, tier.stars);
            assert_eq!(hotel.amenities.len(), tier.amenities.len());
        }
    }

    #[test]
    fn offers_are_sorted_tagged_and_priced_per_stay() {
        let mut rng = StdRng::seed_from_u64(5);
        let hotels = generate_hotels(&query("Vienna", 2), &mut rng);

        assert!(hotels.iter().all(|h| h.is_synthetic));
        assert!(
            hotels
                .windows(2)
                .all(|pair| pair[0].price_total <= pair[1].price_total)
        );
        for hotel in &hotels {
            assert_eq!(hotel.nights, 3);
            assert_eq!(hotel.price_total, hotel.price_per_night * 3.0 * 2.0);
            assert!((3.5..=5.0).contains(&hotel.rating));
        }
    }

    #[test]
    fn hostel_is_cheaper_than_luxury() {
        let mut rng = StdRng::seed_from_u64(9);
        let hotels = generate_hotels(&query("Londra", 1), &mut rng);

        assert!(hotels.first().unwrap().name.starts_with("Hostel"));
        assert!(hotels.last().unwrap().name.starts_with("Luxury"));
    }
}
