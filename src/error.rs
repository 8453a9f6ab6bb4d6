use thiserror::Error;

/// Domain failures surfaced to the operator. All of them are fatal: the
/// run terminates without retry or rollback.
#[derive(Debug, Error)]
pub enum BookingError {
    /// An expected page element is absent: the page layout changed or
    /// has not fully loaded.
    #[error("page structure mismatch: {0}")]
    Structure(String),

    /// No offer satisfied the requested departure time. Carries the
    /// departure times of offers that did satisfy origin, cabin, and
    /// price, so the operator can see what the page actually offered.
    #[error("no flight departs at {requested_time}; eligible departure times: {candidates:?}")]
    NoMatch {
        requested_time: String,
        candidates: Vec<String>,
    },

    /// More than one offer satisfied every criterion. Booking would pick
    /// an arbitrary flight, so refuse instead.
    #[error("multiple flights depart at {requested_time}; eligible departure times: {candidates:?}")]
    AmbiguousMatch {
        requested_time: String,
        candidates: Vec<String>,
    },
}
