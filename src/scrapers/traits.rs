use crate::models::Offer;
use anyhow::Result;

/// Seam between page scraping and flight matching: anything that can
/// produce normalized offers. Keeps the matching logic independent of
/// one site's markup.
pub trait OfferSource {
    /// Produce the current list of offers, one per flight-card fare.
    fn offers(&self) -> Result<Vec<Offer>>;

    /// Human-readable name of the source, for logs.
    fn source_name(&self) -> &'static str;
}
