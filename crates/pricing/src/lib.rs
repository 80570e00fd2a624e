//! Client for the Azure retail prices API.
//!
//! The upstream service is public, rate-limited, and untrusted: an
//! unexpected response shape maps to [`PricingError::Unavailable`], never a
//! panic, and an empty result set is a valid outcome, not an error.
//!
//! Network access sits behind the [`api::RetailPricesApi`] trait so that
//! pagination and filter handling are testable with scripted pages.

pub mod api;
pub mod client;
pub mod records;
pub mod summary;

use thiserror::Error;

pub use api::{HttpRetailPricesApi, PageRequest, RetailPricesApi};
pub use client::PricingClient;
pub use records::{PriceFilter, PriceRecord};
pub use summary::summarize;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("invalid pricing request: {0}")]
    InvalidRequest(String),
    #[error("retail prices API unavailable: {0}")]
    Unavailable(String),
}

impl From<PricingError> for azimuth_core::SessionError {
    fn from(value: PricingError) -> Self {
        match value {
            PricingError::InvalidRequest(message) => Self::InvalidRequest(message),
            PricingError::Unavailable(message) => Self::Unavailable(message),
        }
    }
}
