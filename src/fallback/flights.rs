use rand::RngExt;
use tracing::debug;

use crate::geo::{self, GeoPoint};
use crate::models::{FlightOffer, FlightQuery};

const PRICE_PER_KM: f64 = 0.15;
const FIXED_COST: f64 = 50.0;
const MIN_BASE_PRICE: u32 = 80;
const PRICE_VARIATION: f64 = 0.20;

const AIRLINES: &[&str] = &[
    "Alitalia",
    "Ryanair",
    "EasyJet",
    "Lufthansa",
    "Air France",
    "KLM",
    "Vueling",
    "Iberia",
];

/// `max(80, round(distance_km * 0.15 + 50))`
#[must_use]
pub fn flight_base_price_for_distance(distance_km: f64) -> u32 {
    let price = (distance_km * PRICE_PER_KM + FIXED_COST).round();
    // Distances on Earth stay far below u32::MAX euros
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let price = price.max(0.0) as u32;
    price.max(MIN_BASE_PRICE)
}

/// Base price between two cities, using default coordinates for unknown ones
#[must_use]
pub fn flight_base_price(origin: &str, destination: &str) -> u32 {
    flight_base_price_for_distance(route_distance_km(origin, destination))
}

fn route_distance_km(origin: &str, destination: &str) -> f64 {
    let (from, to) = route_endpoints(origin, destination);
    from.distance_km(&to)
}

/// Rough block time: one hour plus an hour per 800 km
fn approximate_duration(distance_km: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let hours = (distance_km / 800.0 + 1.0).floor() as u32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let minutes = ((distance_km % 800.0) / 13.0).floor().min(59.0) as u32;
    format!("{hours}h {minutes}m")
}

/// Generate 3 to 5 synthetic flight offers sorted by total price
pub fn generate_flights<R: RngExt>(query: &FlightQuery, rng: &mut R) -> Vec<FlightOffer> {
    let distance = route_distance_km(&query.origin, &query.destination);
    let base_price = f64::from(flight_base_price_for_distance(distance));
    let passengers = f64::from(query.passengers.max(1));
    let count = rng.random_range(3..=5usize);
    let stamp = super::id_stamp();

    let mut flights: Vec<FlightOffer> = (0..count)
        .map(|index| {
            let variation = rng.random_range(-PRICE_VARIATION..=PRICE_VARIATION);
            let airline = AIRLINES[rng.random_range(0..AIRLINES.len())];
            let stops = u8::from(!rng.random_bool(0.4));

            FlightOffer {
                id: format!("mock_{stamp}_{index}"),
                airline: airline.to_string(),
                origin: query.origin.clone(),
                destination: query.destination.clone(),
                departure_date: query.departure_date,
                return_date: query.return_date,
                price_total: (base_price * (1.0 + variation) * passengers).round(),
                currency: "EUR".to_string(),
                duration: approximate_duration(distance),
                stops,
                booking_url: None,
                is_synthetic: true,
            }
        })
        .collect();

    flights.sort_by(|a, b| a.price_total.total_cmp(&b.price_total));
    debug!(
        "Generated {} synthetic flights {} -> {} (base {:.0} EUR)",
        flights.len(),
        query.origin,
        query.destination,
        base_price
    );
    flights
}

/// Coordinates used for pricing a route
#[must_use]
pub fn route_endpoints(origin: &str, destination: &str) -> (GeoPoint, GeoPoint) {
    (
        geo::city_coordinates(origin).unwrap_or(geo::DEFAULT_ORIGIN),
        geo::city_coordinates(destination).unwrap_or(geo::DEFAULT_DESTINATION),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rstest::rstest;

    fn query(origin: &str, destination: &str, passengers: u32) -> FlightQuery {
        FlightQuery {
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            return_date: NaiveDate::from_ymd_opt(2026, 6, 8),
            passengers,
        }
    }

    #[rstest]
    #[case(1200.0, 230)]
    #[case(0.0, 80)]
    #[case(200.0, 80)]
    #[case(201.0, 80)]
    #[case(2000.0, 350)]
    fn base_price_follows_distance_model(#[case] distance: f64, #[case] expected: u32) {
        assert_eq!(flight_base_price_for_distance(distance), expected);
    }

    #[test]
    fn base_price_uses_city_table() {
        let (rome, london) = route_endpoints("Roma", "Londra");
        let expected = flight_base_price_for_distance(rome.distance_km(&london));
        assert_eq!(flight_base_price("Roma", "Londra"), expected);
        assert!(expected > MIN_BASE_PRICE);
    }

    #[test]
    fn unknown_cities_use_default_coordinates() {
        let distance = geo::DEFAULT_ORIGIN.distance_km(&geo::DEFAULT_DESTINATION);
        assert_eq!(
            flight_base_price("Atlantide", "Eldorado"),
            flight_base_price_for_distance(distance)
        );
    }

    #[rstest]
    #[case(1)]
    #[case(7)]
    #[case(42)]
    fn generated_flights_are_sorted_and_tagged(#[case] seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let flights = generate_flights(&query("Roma", "Parigi", 1), &mut rng);

        assert!((3..=5).contains(&flights.len()));
        assert!(flights.iter().all(|f| f.is_synthetic && f.currency == "EUR"));
        assert!(
            flights
                .windows(2)
                .all(|pair| pair[0].price_total <= pair[1].price_total)
        );
    }

    #[test]
    fn prices_stay_within_variation_band() {
        let mut rng = StdRng::seed_from_u64(3);
        let passengers = 3;
        let base = f64::from(flight_base_price("Milano", "Berlino"));

        for _ in 0..20 {
            for flight in generate_flights(&query("Milano", "Berlino", passengers), &mut rng) {
                let low = (base * 0.8 * f64::from(passengers)).floor();
                let high = (base * 1.2 * f64::from(passengers)).ceil();
                assert!(flight.price_total >= low && flight.price_total <= high);
            }
        }
    }

    #[test]
    fn duration_grows_with_distance() {
        assert_eq!(approximate_duration(0.0), "1h 0m");
        assert_eq!(approximate_duration(1600.0), "3h 0m");
        assert_eq!(approximate_duration(1300.0), "2h 38m");
    }
}
