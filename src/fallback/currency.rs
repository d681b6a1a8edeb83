use std::collections::BTreeMap;

/// Approximate rates for 1 EUR
const EUR_RATES: &[(&str, f64)] = &[
    ("USD", 1.10),
    ("GBP", 0.85),
    ("JPY", 130.0),
    ("CHF", 1.05),
    ("CAD", 1.35),
    ("AUD", 1.45),
    ("CNY", 7.20),
    ("INR", 82.0),
    ("BRL", 5.50),
    ("RUB", 75.0),
    ("KRW", 1300.0),
    ("SEK", 10.5),
    ("NOK", 10.8),
    ("DKK", 7.45),
    ("PLN", 4.30),
    ("CZK", 24.5),
    ("HUF", 380.0),
    ("TRY", 20.0),
    ("ZAR", 18.0),
    ("MXN", 20.0),
    ("NZD", 1.60),
    ("SGD", 1.45),
    ("HKD", 8.50),
    ("THB", 37.0),
];

/// Fixed exchange table used when the live lookup fails.
///
/// For a non-EUR base every EUR rate is divided by the base's own EUR rate.
/// An unknown base only knows itself.
#[must_use]
pub fn fallback_rates(base: &str) -> BTreeMap<String, f64> {
    let base = base.trim().to_uppercase();
    let mut rates = BTreeMap::new();

    if base == "EUR" {
        rates.extend(EUR_RATES.iter().map(|(code, rate)| ((*code).to_string(), *rate)));
        rates.insert("EUR".to_string(), 1.0);
        return rates;
    }

    let Some(base_rate) = EUR_RATES
        .iter()
        .find(|(code, _)| *code == base)
        .map(|(_, rate)| *rate)
    else {
        rates.insert(base, 1.0);
        return rates;
    };

    rates.insert("EUR".to_string(), 1.0 / base_rate);
    for (code, rate) in EUR_RATES {
        if *code != base {
            rates.insert((*code).to_string(), rate / base_rate);
        }
    }
    rates.insert(base, 1.0);
    rates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eur_table_is_returned_as_is() {
        let rates = fallback_rates("EUR");
        assert_eq!(rates["EUR"], 1.0);
        assert_eq!(rates["USD"], 1.10);
        assert_eq!(rates.len(), EUR_RATES.len() + 1);
    }

    #[test]
    fn other_bases_are_rebased() {
        let rates = fallback_rates("usd");
        assert_eq!(rates["USD"], 1.0);
        assert!((rates["EUR"] - 1.0 / 1.10).abs() < 1e-12);
        assert!((rates["GBP"] - 0.85 / 1.10).abs() < 1e-12);
        assert_eq!(rates.len(), EUR_RATES.len() + 1);
    }

    #[test]
    fn rebasing_round_trips_through_eur() {
        let from_gbp = fallback_rates("GBP");
        let jpy_via_gbp = from_gbp["JPY"] / from_gbp["EUR"];
        assert!((jpy_via_gbp - 130.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_base_only_knows_itself() {
        let rates = fallback_rates("XYZ");
        assert_eq!(rates.len(), 1);
        assert_eq!(rates["XYZ"], 1.0);
    }
}
