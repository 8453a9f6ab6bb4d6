use crate::error::BookingError;
use crate::models::Offer;
use crate::scrapers::traits::OfferSource;
use anyhow::Result;

/// Translate the short caller-facing cabin name into the exact multi-line
/// label the fare buttons display. Unmapped names pass through unchanged.
pub fn cabin_display_label(cabin: &str) -> &str {
    match cabin {
        "Economy" => "Economy\n(Hand baggage only)",
        "Economy (Checked baggage)" => "Economy\n(Checked baggage)",
        other => other,
    }
}

/// Pick the single offer matching origin, cabin, and departure time.
///
/// Offers without a price are excluded up front (a sold-out fare is not
/// bookable). Zero or multiple survivors fail with the departure times
/// that were otherwise eligible; booking the wrong flight is worse than
/// booking none, so only an unambiguous match goes through.
pub fn find_matching_offer(
    offers: &[Offer],
    origin: &str,
    cabin: &str,
    departure_time: &str,
) -> Result<usize, BookingError> {
    let label = cabin_display_label(cabin);

    let eligible: Vec<usize> = offers
        .iter()
        .enumerate()
        .filter(|(_, offer)| {
            offer.origin == origin && offer.cabin_name == label && offer.price.is_some()
        })
        .map(|(index, _)| index)
        .collect();

    let hits: Vec<usize> = eligible
        .iter()
        .copied()
        .filter(|&index| offers[index].departure_time == departure_time)
        .collect();

    let candidates = || -> Vec<String> {
        eligible
            .iter()
            .map(|&index| offers[index].departure_time.clone())
            .collect()
    };

    match hits.as_slice() {
        [] => Err(BookingError::NoMatch {
            requested_time: departure_time.to_string(),
            candidates: candidates(),
        }),
        [index] => Ok(*index),
        _ => Err(BookingError::AmbiguousMatch {
            requested_time: departure_time.to_string(),
            candidates: candidates(),
        }),
    }
}

/// Resolve a single offer through any `OfferSource`, keeping the matching
/// policy independent of how the offers were produced.
pub fn pick_offer<S: OfferSource>(
    source: &S,
    origin: &str,
    cabin: &str,
    departure_time: &str,
) -> Result<Offer> {
    let mut offers = source.offers()?;
    let index = find_matching_offer(&offers, origin, cabin, departure_time)?;
    Ok(offers.swap_remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(cabin: &str, time: &str, origin: &str, price: Option<u32>) -> Offer {
        Offer {
            cabin_name: cabin.to_string(),
            departure_time: time.to_string(),
            origin: origin.to_string(),
            arrival_time: "21:10".to_string(),
            destination: "AMS".to_string(),
            price,
        }
    }

    fn sample_offers() -> Vec<Offer> {
        vec![
            offer("Economy\n(Hand baggage only)", "18:55", "LCY", Some(450)),
            offer("Economy\n(Hand baggage only)", "09:00", "LCY", None),
        ]
    }

    #[test]
    fn unique_match_returns_the_priced_offer() {
        let offers = sample_offers();
        let index = find_matching_offer(&offers, "LCY", "Economy", "18:55").unwrap();
        assert_eq!(offers[index].price, Some(450));
    }

    #[test]
    fn sold_out_fare_is_excluded_and_candidates_listed() {
        let offers = sample_offers();
        let err = find_matching_offer(&offers, "LCY", "Economy", "09:00").unwrap_err();
        match err {
            BookingError::NoMatch {
                requested_time,
                candidates,
            } => {
                assert_eq!(requested_time, "09:00");
                assert_eq!(candidates, vec!["18:55".to_string()]);
            }
            other => panic!("expected NoMatch, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_departure_times_are_ambiguous() {
        let offers = vec![
            offer("Economy\n(Hand baggage only)", "18:55", "LCY", Some(450)),
            offer("Economy\n(Hand baggage only)", "18:55", "LCY", Some(470)),
        ];
        let err = find_matching_offer(&offers, "LCY", "Economy", "18:55").unwrap_err();
        match err {
            BookingError::AmbiguousMatch { candidates, .. } => {
                assert_eq!(candidates, vec!["18:55".to_string(), "18:55".to_string()]);
            }
            other => panic!("expected AmbiguousMatch, got {other:?}"),
        }
    }

    #[test]
    fn cabin_mapping_only_matches_the_exact_label() {
        let offers = vec![offer(
            "Economy\n(Checked baggage)",
            "18:55",
            "LCY",
            Some(450),
        )];
        // "Economy" maps to the hand-baggage label, which is not present.
        assert!(find_matching_offer(&offers, "LCY", "Economy", "18:55").is_err());
        // The checked-baggage name maps to the label that is present.
        assert!(
            find_matching_offer(&offers, "LCY", "Economy (Checked baggage)", "18:55").is_ok()
        );
    }

    #[test]
    fn unmapped_cabin_names_pass_through() {
        assert_eq!(cabin_display_label("Business"), "Business");
    }

    #[test]
    fn wrong_origin_is_not_eligible() {
        let offers = vec![offer(
            "Economy\n(Hand baggage only)",
            "18:55",
            "LHR",
            Some(450),
        )];
        let err = find_matching_offer(&offers, "LCY", "Economy", "18:55").unwrap_err();
        match err {
            BookingError::NoMatch { candidates, .. } => assert!(candidates.is_empty()),
            other => panic!("expected NoMatch, got {other:?}"),
        }
    }

    #[test]
    fn matching_is_deterministic() {
        let offers = sample_offers();
        let first = find_matching_offer(&offers, "LCY", "Economy", "18:55").unwrap();
        let second = find_matching_offer(&offers, "LCY", "Economy", "18:55").unwrap();
        assert_eq!(first, second);
    }

    struct FixtureSource(Vec<Offer>);

    impl OfferSource for FixtureSource {
        fn offers(&self) -> Result<Vec<Offer>> {
            Ok(self.0.clone())
        }

        fn source_name(&self) -> &'static str {
            "fixture"
        }
    }

    #[test]
    fn pick_offer_works_through_any_source() {
        let source = FixtureSource(sample_offers());
        let picked = pick_offer(&source, "LCY", "Economy", "18:55").unwrap();
        assert_eq!(picked.price, Some(450));
        assert_eq!(source.source_name(), "fixture");
    }
}
