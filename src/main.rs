mod checkout;
mod error;
mod matching;
mod models;
mod scrapers;

use chrono::NaiveDate;
use scrapers::{BaSession, BookingCriteria};
use tracing::{info, Level};

// Route, date, time, and cabin are fixed in this revision; passenger
// identity and payment details come from the environment.
const ORIGIN: &str = "LCY";
const DESTINATION: &str = "AMS";
const TRAVEL_DATE: &str = "2026-09-07";
const DEPARTURE_TIME: &str = "18:55";
const CABIN: &str = "Economy";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("✈️  Flight Booker");
    info!("================");
    info!("Route: {ORIGIN} -> {DESTINATION} on {TRAVEL_DATE} at {DEPARTURE_TIME} ({CABIN})");

    let travel_date: NaiveDate = TRAVEL_DATE.parse()?;
    let criteria =
        BookingCriteria::from_env(ORIGIN, DESTINATION, travel_date, DEPARTURE_TIME, CABIN)?;

    let session = BaSession::launch()?;
    session.open_home()?;
    session.open_search(&criteria)?;

    let report = checkout::run_booking(&session, &criteria)?;

    // Keep the scraped offers around for diagnosing bad matches
    let json = serde_json::to_string_pretty(&report.offers)?;
    tokio::fs::write("scraped_offers.json", json).await?;
    info!(
        "💾 Saved {} scraped offers to scraped_offers.json",
        report.offers.len()
    );

    session.persist_cookies()?;

    info!(
        "Booking staged: {} {} -> {} {}",
        report.selected.departure_time,
        report.selected.origin,
        report.selected.arrival_time,
        report.selected.destination
    );
    info!("Please review and press agree and pay!");

    Ok(())
}
