use crate::error::BookingError;
use crate::models::Offer;
use crate::scrapers::cards;
use crate::scrapers::traits::OfferSource;
use crate::scrapers::types::BookingCriteria;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use headless_chrome::protocol::cdp::Network;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const HOME_URL: &str = "https://www.britishairways.com/";
const COOKIE_STORE: &str = "cookies.json";
const USER_DATA_DIR: &str = "chrome-profile";

/// Browser session for one booking run: launch, cookie replay, search
/// navigation, offer scraping, and cookie persistence on success.
pub struct BaSession {
    /// Keeps Chrome alive for the lifetime of the session.
    #[allow(dead_code)]
    browser: Browser,
    tab: Arc<Tab>,
}

impl BaSession {
    /// Launch a headful Chrome. The booking ends with a human pressing
    /// "agree and pay", so the window has to be real and visible.
    pub fn launch() -> Result<Self> {
        info!("Launching Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(false)
            .args(vec![OsStr::new("--disable-blink-features=AutomationControlled")])
            .user_data_dir(Some(PathBuf::from(USER_DATA_DIR)))
            // The checkout flow sits idle between steps; the default idle
            // timeout would tear the browser down mid-run.
            .idle_browser_timeout(Duration::from_secs(300))
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;
        let tab = browser.new_tab()?;

        Ok(Self { browser, tab })
    }

    pub fn tab(&self) -> &Tab {
        &self.tab
    }

    /// Open the airline home page, replaying any cookies persisted by a
    /// previous run so login/consent flows are skipped.
    pub fn open_home(&self) -> Result<()> {
        self.tab.navigate_to(HOME_URL)?;
        self.tab.wait_until_navigated()?;

        if Path::new(COOKIE_STORE).exists() {
            let count = self.restore_cookies()?;
            info!("Restored {count} cookies from {COOKIE_STORE}");
            self.tab.reload(false, None)?;
            thread::sleep(Duration::from_secs(5));
        } else {
            debug!("No cookie store found; continuing unauthenticated");
        }

        Ok(())
    }

    fn restore_cookies(&self) -> Result<usize> {
        let raw = std::fs::read_to_string(COOKIE_STORE).context("Failed to read cookie store")?;
        let cookies: Vec<StoredCookie> =
            serde_json::from_str(&raw).context("Failed to parse cookie store")?;

        for cookie in &cookies {
            let set = self.tab.call_method(Network::SetCookie {
                name: cookie.name.clone(),
                value: cookie.value.clone(),
                url: None,
                domain: Some(cookie.domain.clone()),
                path: Some(cookie.path.clone()),
                secure: Some(cookie.secure),
                http_only: Some(cookie.http_only),
                same_site: None,
                expires: cookie.expires,
                priority: None,
                same_party: None,
                source_scheme: None,
                source_port: None,
                partition_key: None,
            });
            if let Err(e) = set {
                warn!("Failed to set cookie {}: {e}", cookie.name);
            }
        }

        Ok(cookies.len())
    }

    /// Overwrite the cookie store with the browser's current cookie set.
    /// Called only after a successful run.
    pub fn persist_cookies(&self) -> Result<()> {
        let cookies = self.tab.get_cookies()?;
        let stored: Vec<StoredCookie> = cookies.into_iter().map(StoredCookie::from).collect();

        let json = serde_json::to_string_pretty(&stored)?;
        std::fs::write(COOKIE_STORE, json).context("Failed to write cookie store")?;
        info!("Persisted {} cookies to {COOKIE_STORE}", stored.len());

        Ok(())
    }

    /// Navigate to the flight list for the requested route and date.
    pub fn open_search(&self, criteria: &BookingCriteria) -> Result<()> {
        let url = search_url(&criteria.origin, &criteria.destination, criteria.travel_date);
        info!("Opening search: {url}");
        self.tab.navigate_to(&url)?;
        self.tab.wait_until_navigated()?;
        Ok(())
    }

    /// Read every rendered flight card into offers, pairing each parsed
    /// fare with the live button that advances the flow to it. Cards
    /// whose detail element is not a flight (ads, banners) are skipped.
    pub fn collect_offers(&self) -> Result<Vec<ScrapedOffer<'_>>> {
        let flight_cards = self.tab.find_elements("app-flight-original")?;
        debug!("Found {} flight cards", flight_cards.len());

        let mut scraped = Vec::new();
        for card in &flight_cards {
            let detail = card.find_element("div").map_err(|_| {
                BookingError::Structure("flight card has no detail element".into())
            })?;
            let detail_id = detail.get_attribute_value("id")?.unwrap_or_default();
            if !detail_id.contains("flight") {
                continue;
            }

            let html = card.get_content()?;
            let offers = cards::parse_flight_card(&html)?;
            let buttons = card.find_elements("button").unwrap_or_default();
            if buttons.len() != offers.len() {
                return Err(BookingError::Structure(format!(
                    "flight card has {} fare buttons but {} parsed fares",
                    buttons.len(),
                    offers.len()
                ))
                .into());
            }

            for (offer, button) in offers.into_iter().zip(buttons) {
                scraped.push(ScrapedOffer {
                    offer,
                    advance_control: button,
                });
            }
        }

        Ok(scraped)
    }
}

impl OfferSource for BaSession {
    fn offers(&self) -> Result<Vec<Offer>> {
        Ok(self
            .collect_offers()?
            .into_iter()
            .map(|scraped| scraped.offer)
            .collect())
    }

    fn source_name(&self) -> &'static str {
        "britishairways.com"
    }
}

/// A normalized offer together with the live control that advances the
/// booking flow to it. Borrows the session's tab; dropped once the
/// chosen control has been clicked.
pub struct ScrapedOffer<'a> {
    pub offer: Offer,
    pub advance_control: Element<'a>,
}

/// One cookie as persisted between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub expires: Option<f64>,
}

impl From<Network::Cookie> for StoredCookie {
    fn from(cookie: Network::Cookie) -> Self {
        Self {
            name: cookie.name,
            value: cookie.value,
            domain: cookie.domain,
            path: cookie.path,
            secure: cookie.secure,
            http_only: cookie.http_only,
            // CDP reports session cookies with a negative expiry.
            expires: (cookie.expires > 0.0).then_some(cookie.expires),
        }
    }
}

/// Deterministic search URL for the flight list. Passenger counts and
/// the cabin hint are fixed query parameters.
pub fn search_url(origin: &str, destination: &str, travel_date: NaiveDate) -> String {
    format!(
        "https://www.britishairways.com/travel/book/public/en_gb/flightList\
         ?onds={origin}-{destination}_{date}&ad=1&yad=0&ch=0&inf=0&cabin=M&flex=LOWEST",
        date = travel_date.format("%Y-%m-%d"),
    )
}

/// Poll `condition` every `poll` until it holds or `timeout` elapses.
/// Used instead of fixed sleeps wherever the page exposes an observable
/// readiness condition.
pub fn wait_until<F>(timeout: Duration, poll: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(poll);
    }
}

/// Poll `probe` every `poll` until it yields a value or `timeout`
/// elapses. Like `wait_until`, but reports which of several competing
/// conditions held first.
pub fn wait_for_some<T, F>(timeout: Duration, poll: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Option<T>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe() {
            return Some(value);
        }
        if Instant::now() >= deadline {
            return None;
        }
        thread::sleep(poll);
    }
}

/// Whether an element currently takes part in layout.
pub fn is_visible(element: &Element) -> Result<bool> {
    let object = element.call_js_fn(
        "function () { return this.offsetParent !== null; }",
        vec![],
        false,
    )?;
    Ok(object.value.and_then(|v| v.as_bool()).unwrap_or(false))
}

/// Choose a `<select>` option by its visible text, the way a user would,
/// and fire the change event the page listens for.
pub fn select_by_visible_text(tab: &Tab, selector: &str, text: &str) -> Result<()> {
    let element = tab
        .wait_for_element(selector)
        .map_err(|_| BookingError::Structure(format!("select {selector} not found")))?;
    element.call_js_fn(
        r#"function (label) {
            const option = Array.from(this.options)
                .find((o) => o.textContent.trim() === label);
            if (!option) {
                throw new Error('no option labelled ' + label);
            }
            this.value = option.value;
            this.dispatchEvent(new Event('change', { bubbles: true }));
        }"#,
        vec![serde_json::json!(text)],
        false,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_is_deterministic() {
        let date = NaiveDate::from_ymd_opt(2026, 9, 7).unwrap();
        assert_eq!(
            search_url("LCY", "AMS", date),
            "https://www.britishairways.com/travel/book/public/en_gb/flightList\
             ?onds=LCY-AMS_2026-09-07&ad=1&yad=0&ch=0&inf=0&cabin=M&flex=LOWEST"
        );
    }

    #[test]
    fn wait_until_returns_once_the_condition_holds() {
        let mut remaining = 3;
        let ok = wait_until(Duration::from_secs(1), Duration::from_millis(1), || {
            remaining -= 1;
            remaining == 0
        });
        assert!(ok);
    }

    #[test]
    fn wait_until_times_out_when_the_condition_never_holds() {
        let ok = wait_until(Duration::from_millis(10), Duration::from_millis(1), || false);
        assert!(!ok);
    }

    #[test]
    fn wait_for_some_reports_the_value_that_appeared() {
        let mut polls = 0;
        let value = wait_for_some(Duration::from_secs(1), Duration::from_millis(1), || {
            polls += 1;
            (polls >= 3).then_some("ready")
        });
        assert_eq!(value, Some("ready"));
    }

    #[test]
    fn wait_for_some_times_out_to_none() {
        let value: Option<&str> =
            wait_for_some(Duration::from_millis(10), Duration::from_millis(1), || None);
        assert_eq!(value, None);
    }

    #[test]
    fn session_cookies_persist_without_an_expiry() {
        let stored = StoredCookie {
            name: "cid".into(),
            value: "abc".into(),
            domain: ".britishairways.com".into(),
            path: "/".into(),
            secure: true,
            http_only: false,
            expires: None,
        };
        let json = serde_json::to_string(&stored).unwrap();
        let back: StoredCookie = serde_json::from_str(&json).unwrap();
        assert_eq!(back.expires, None);
        assert_eq!(back.name, "cid");
    }
}
