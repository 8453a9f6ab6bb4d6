use crate::error::BookingError;
use crate::matching;
use crate::models::Offer;
use crate::scrapers::browser::{
    is_visible, select_by_visible_text, wait_for_some, wait_until, BaSession,
};
use crate::scrapers::traits::OfferSource;
use crate::scrapers::types::BookingCriteria;
use anyhow::{Context, Result};
use headless_chrome::Tab;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// How long the search results get to populate.
const RESULTS_TIMEOUT: Duration = Duration::from_secs(20);
/// The guest-continue control can take a long time to appear. The page
/// gives no upper bound, so this one is ours: fail rather than hang.
const GUEST_TIMEOUT: Duration = Duration::from_secs(120);
const POLL: Duration = Duration::from_secs(1);

/// What a completed (pre-payment) run produced.
pub struct BookingReport {
    /// Every offer scraped from the results page, for diagnostics.
    pub offers: Vec<Offer>,
    /// The offer the run advanced into checkout.
    pub selected: Offer,
}

/// Drive the whole flow on an already-opened search page: scrape, match,
/// fare selection, guest checkout, passenger and payment forms.
///
/// The sequence is strict and non-resumable; any failed step aborts the
/// run. It stops short of payment confirmation; a human presses "agree
/// and pay".
pub fn run_booking(session: &BaSession, criteria: &BookingCriteria) -> Result<BookingReport> {
    dismiss_cookie_banner(session);
    wait_for_results(session)?;
    expand_accordions(session)?;

    info!("Scraping offers from {}", session.source_name());
    let scraped = session.collect_offers()?;
    let offers: Vec<Offer> = scraped.iter().map(|s| s.offer.clone()).collect();
    info!("Scraped {} offers", offers.len());

    let index = matching::find_matching_offer(
        &offers,
        &criteria.origin,
        &criteria.cabin,
        &criteria.departure_time,
    )?;
    let selected = offers[index].clone();
    info!(
        "Matched flight {} {} -> {} {} (price {:?})",
        selected.departure_time, selected.origin, selected.arrival_time, selected.destination,
        selected.price
    );

    scraped[index]
        .advance_control
        .click()
        .context("Failed to open the matched flight")?;
    thread::sleep(Duration::from_secs(2));

    select_fare(session, &criteria.cabin)?;
    thread::sleep(Duration::from_secs(5));

    accept_terms(session)?;
    continue_as_guest_if_needed(session)?;

    fill_passenger_form(session, criteria)?;
    thread::sleep(Duration::from_secs(5));

    choose_seats_later(session)?;
    thread::sleep(Duration::from_secs(10));

    fill_payment_form(session, criteria)?;

    Ok(BookingReport { offers, selected })
}

/// The consent banner overlays the results; close it if it is showing.
fn dismiss_cookie_banner(session: &BaSession) {
    if let Ok(banner) = session.tab().find_element("#ensCloseBanner") {
        if is_visible(&banner).unwrap_or(false) {
            if let Err(e) = banner.click() {
                warn!("Could not dismiss cookie banner: {e}");
            }
        }
    }
}

/// Results stream in; more than four cards means the list has rendered.
fn wait_for_results(session: &BaSession) -> Result<()> {
    let tab = session.tab();
    let loaded = wait_until(RESULTS_TIMEOUT, POLL, || {
        tab.find_elements("app-flight-original")
            .map(|cards| cards.len() > 4)
            .unwrap_or(false)
    });
    if !loaded {
        return Err(BookingError::Structure(
            "search results did not populate in time".into(),
        )
        .into());
    }
    Ok(())
}

/// Folded flight options hide their fare buttons; open every accordion.
fn expand_accordions(session: &BaSession) -> Result<()> {
    for accordion in session
        .tab()
        .find_elements("ba-accordion")
        .unwrap_or_default()
    {
        accordion.click()?;
    }
    Ok(())
}

/// Inside the single open flight, click the select control for the fare
/// whose label matches the requested cabin.
fn select_fare(session: &BaSession, cabin: &str) -> Result<()> {
    let tab = session.tab();

    let wrappers = tab.find_elements(".cabin-wrapper")?;
    if wrappers.len() != 1 {
        return Err(BookingError::Structure(format!(
            "expected exactly one open flight, found {}",
            wrappers.len()
        ))
        .into());
    }

    let target = matching::cabin_display_label(cabin);
    let mut select_button = None;
    for fare_card in wrappers[0].find_elements(".flight-card")? {
        let fare_name = fare_card.find_element(".fare-name")?.get_inner_text()?;
        if fare_name.trim() == target {
            select_button = Some(fare_card.find_element(".select-button")?);
        }
    }

    match select_button {
        Some(button) => {
            button.click()?;
            Ok(())
        }
        None => Err(BookingError::Structure(format!(
            "no select control for fare {target:?}"
        ))
        .into()),
    }
}

fn accept_terms(session: &BaSession) -> Result<()> {
    session
        .tab()
        .wait_for_element(".agree-button")
        .map_err(|_| BookingError::Structure("terms agree control not found".into()))?
        .click()?;
    Ok(())
}

/// Which checkout entry the page rendered after the terms click.
enum CheckoutEntry {
    /// A stored identity lands straight on the passenger form.
    PassengerForm,
    /// No identity on file; the guest path has to be taken.
    GuestContinue,
}

fn checkout_entry(tab: &Tab) -> Option<CheckoutEntry> {
    let element_visible = |selector: &str| {
        tab.find_element(selector)
            .map(|el| is_visible(&el).unwrap_or(false))
            .unwrap_or(false)
    };
    if element_visible("#pax0-firstName-native") {
        return Some(CheckoutEntry::PassengerForm);
    }
    if element_visible(".guest-continue-button") {
        return Some(CheckoutEntry::GuestContinue);
    }
    None
}

/// The page is still transitioning when the terms click lands, so wait
/// for whichever checkout entry renders first: the passenger form (a
/// stored identity) or the guest-continue control.
fn continue_as_guest_if_needed(session: &BaSession) -> Result<()> {
    let tab = session.tab();

    let entry = wait_for_some(GUEST_TIMEOUT, Duration::from_secs(3), || checkout_entry(tab));
    match entry {
        Some(CheckoutEntry::PassengerForm) => Ok(()),
        Some(CheckoutEntry::GuestContinue) => {
            info!("No stored identity; continuing as guest");
            tab.find_element(".guest-continue-button")?.click()?;
            thread::sleep(Duration::from_secs(5));
            Ok(())
        }
        None => Err(BookingError::Structure(
            "neither the passenger form nor the guest checkout control became visible".into(),
        )
        .into()),
    }
}

fn fill_passenger_form(session: &BaSession, criteria: &BookingCriteria) -> Result<()> {
    let tab = session.tab();
    let passenger = &criteria.passenger;
    info!("Filling passenger form");

    thread::sleep(Duration::from_secs(2));
    select_by_visible_text(tab, "#ba-select-1", &passenger.title)?;

    thread::sleep(Duration::from_secs(1));
    tab.find_element("#pax0-firstName-native")?
        .focus()?
        .type_into(&passenger.first_name)?;

    thread::sleep(Duration::from_secs(1));
    tab.find_element("#pax0-lastName-native")?
        .focus()?
        .type_into(&passenger.last_name)?;

    thread::sleep(Duration::from_secs(1));
    tab.find_element("#ba-input-12")?
        .focus()?
        .type_into(&passenger.email)?;

    thread::sleep(Duration::from_secs(1));
    tab.find_element("#ba-input-13")?
        .focus()?
        .type_into(&passenger.phone_number)?;

    thread::sleep(Duration::from_secs(2));
    tab.find_element(".pax-continue")?.click()?;
    Ok(())
}

fn choose_seats_later(session: &BaSession) -> Result<()> {
    session
        .tab()
        .wait_for_element(".choose-later-section ba-button")
        .map_err(|_| BookingError::Structure("seat selection step not found".into()))?
        .click()?;
    Ok(())
}

fn fill_payment_form(session: &BaSession, criteria: &BookingCriteria) -> Result<()> {
    let tab = session.tab();
    let payment = &criteria.payment;
    info!("Filling payment form");

    thread::sleep(Duration::from_secs(1));
    select_by_visible_text(tab, "#ba-select-7", &payment.method)?;

    thread::sleep(Duration::from_secs(1));
    tab.find_element("#cc-number")?
        .focus()?
        .type_into(&payment.card_number)?;

    // The expiry input is masked and swallows direct value writes; focus
    // its wrapper and send real keystrokes instead.
    thread::sleep(Duration::from_secs(1));
    tab.find_element("#expiry-date")?.click()?;
    tab.type_str(&payment.card_expiry)?;

    thread::sleep(Duration::from_secs(1));
    tab.find_element("#cc-csc")?.focus()?.type_into(&payment.cvv)?;

    thread::sleep(Duration::from_secs(1));
    tab.find_element("#address-line1")?
        .focus()?
        .type_into(&payment.address_line_1)?;

    thread::sleep(Duration::from_secs(1));
    tab.find_element("#address-line2")?
        .focus()?
        .type_into(&payment.address_line_2)?;

    thread::sleep(Duration::from_secs(1));
    tab.find_element("#postal-code")?
        .focus()?
        .type_into(&payment.post_code)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_passenger_form_still_routes_past_guest_checkout() {
        // The form can take a few polls to render right after the terms
        // click on a session with a stored identity; it must still win
        // over the guest branch.
        let mut polls = 0;
        let entry = wait_for_some(Duration::from_secs(1), Duration::from_millis(1), || {
            polls += 1;
            (polls >= 3).then_some(CheckoutEntry::PassengerForm)
        });
        assert!(matches!(entry, Some(CheckoutEntry::PassengerForm)));
    }

    #[test]
    fn guest_entry_is_taken_when_no_identity_is_stored() {
        let entry = wait_for_some(Duration::from_secs(1), Duration::from_millis(1), || {
            Some(CheckoutEntry::GuestContinue)
        });
        assert!(matches!(entry, Some(CheckoutEntry::GuestContinue)));
    }

    #[test]
    fn missing_both_checkout_entries_times_out() {
        let entry: Option<CheckoutEntry> =
            wait_for_some(Duration::from_millis(10), Duration::from_millis(1), || None);
        assert!(entry.is_none());
    }
}
