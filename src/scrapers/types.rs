use anyhow::{Context, Result};
use chrono::NaiveDate;

/// Everything one booking run needs: the route and timing driving the
/// search, plus the passenger and payment details typed into checkout.
/// Immutable for the duration of a run.
#[derive(Clone)]
pub struct BookingCriteria {
    /// Origin airport code, e.g. "LCY"
    pub origin: String,
    /// Destination airport code, e.g. "AMS"
    pub destination: String,
    pub travel_date: NaiveDate,
    /// Desired departure time as shown on the page, e.g. "18:55"
    pub departure_time: String,
    /// Short cabin name, e.g. "Economy"
    pub cabin: String,
    pub passenger: PassengerDetails,
    pub payment: PaymentDetails,
}

#[derive(Debug, Clone)]
pub struct PassengerDetails {
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
}

/// Card and billing details. Deliberately not `Debug`: these must never
/// end up in logs.
#[derive(Clone)]
pub struct PaymentDetails {
    pub method: String,
    pub card_number: String,
    pub card_expiry: String,
    pub cvv: String,
    pub address_line_1: String,
    pub address_line_2: String,
    pub post_code: String,
}

impl BookingCriteria {
    /// Route, date, time, and cabin are fixed by the caller in this
    /// revision; passenger identity and payment details come from the
    /// environment.
    pub fn from_env(
        origin: &str,
        destination: &str,
        travel_date: NaiveDate,
        departure_time: &str,
        cabin: &str,
    ) -> Result<Self> {
        Ok(Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
            travel_date,
            departure_time: departure_time.to_string(),
            cabin: cabin.to_string(),
            passenger: PassengerDetails::from_env()?,
            payment: PaymentDetails::from_env()?,
        })
    }
}

impl PassengerDetails {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            title: required_env("TITLE")?,
            first_name: required_env("FIRST_NAME")?,
            last_name: required_env("LAST_NAME")?,
            email: required_env("EMAIL")?,
            phone_number: required_env("PHONE_NUMBER")?,
        })
    }
}

impl PaymentDetails {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            method: required_env("PAYMENT_METHOD")?,
            card_number: required_env("CARD_NUMBER")?,
            card_expiry: required_env("CARD_EXP")?,
            cvv: required_env("CVV")?,
            address_line_1: required_env("ADDRESS_LINE_1")?,
            address_line_2: required_env("ADDRESS_LINE_2")?,
            post_code: required_env("POST_CODE")?,
        })
    }
}

fn required_env(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("missing required environment variable {name}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_environment_variable_is_named_in_the_error() {
        std::env::remove_var("TITLE");
        let err = PassengerDetails::from_env().unwrap_err();
        assert!(err.to_string().contains("TITLE"));
    }
}
