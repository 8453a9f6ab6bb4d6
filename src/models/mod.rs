use serde::{Deserialize, Serialize};

/// One cabin-class price option scraped from one flight card.
///
/// Offers are created fresh on every search-page scrape and discarded
/// after the matching step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// Fare label exactly as the page shows it, newlines included.
    pub cabin_name: String,
    pub departure_time: String,
    pub origin: String,
    pub arrival_time: String,
    pub destination: String,
    /// `None` when the fare carries no usable price (e.g. "Sold out").
    pub price: Option<u32>,
}
