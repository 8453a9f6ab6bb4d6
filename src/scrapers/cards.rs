use crate::error::BookingError;
use crate::models::Offer;
use scraper::{Html, Selector};

/// Collapse markup indentation while keeping line structure, so a label
/// rendered as "Economy\n(Hand baggage only)" compares equal however the
/// source HTML indents it.
fn normalize_label(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strip the currency-symbol artifact and parse an integer price.
/// Anything non-numeric ("Sold out", an empty label) is `None`, never an
/// error; a missing price is how unavailable fares get excluded later.
pub fn parse_price(raw: &str) -> Option<u32> {
    raw.replace('£', "").replace('Â', "").trim().parse().ok()
}

/// Split a "<time> <place>" fragment on the first space.
fn split_endpoint(fragment: &str) -> Result<(String, String), BookingError> {
    fragment
        .trim()
        .split_once(' ')
        .map(|(time, place)| (time.to_string(), place.to_string()))
        .ok_or_else(|| {
            BookingError::Structure(format!(
                "malformed flight endpoint fragment: {fragment:?}"
            ))
        })
}

/// Parse one flight card's HTML fragment into one `Offer` per fare
/// button. The card shows its endpoints as "<time> <place>" in the first
/// and third info spans; each fare button carries a cabin label and a
/// price label. Missing structural elements mean the page layout changed
/// or has not fully loaded.
pub fn parse_flight_card(html: &str) -> Result<Vec<Offer>, BookingError> {
    let fragment = Html::parse_fragment(html);
    let info_selector = Selector::parse(".flight-info-wrapper span").unwrap();
    let button_selector = Selector::parse("button").unwrap();
    let cabin_selector = Selector::parse(".cabin-name").unwrap();
    let price_selector = Selector::parse(".cabin-price").unwrap();

    let info: Vec<String> = fragment
        .select(&info_selector)
        .map(|span| normalize_label(&span.text().collect::<String>()))
        .collect();
    if info.len() < 3 {
        return Err(BookingError::Structure(format!(
            "flight card has {} info spans, expected at least 3",
            info.len()
        )));
    }
    let (departure_time, origin) = split_endpoint(&info[0])?;
    let (arrival_time, destination) = split_endpoint(&info[2])?;

    let mut offers = Vec::new();
    for button in fragment.select(&button_selector) {
        let cabin_name = button
            .select(&cabin_selector)
            .next()
            .map(|el| normalize_label(&el.text().collect::<String>()))
            .ok_or_else(|| {
                BookingError::Structure("fare button has no cabin label".into())
            })?;
        let price_label = button
            .select(&price_selector)
            .next()
            .map(|el| el.text().collect::<String>())
            .ok_or_else(|| {
                BookingError::Structure("fare button has no price label".into())
            })?;

        offers.push(Offer {
            cabin_name,
            departure_time: departure_time.clone(),
            origin: origin.clone(),
            arrival_time: arrival_time.clone(),
            destination: destination.clone(),
            price: parse_price(&price_label),
        });
    }

    Ok(offers)
}
