pub mod browser;
pub mod cards;
pub mod traits;
pub mod types;

pub use browser::BaSession;
pub use traits::OfferSource;
pub use types::BookingCriteria;
