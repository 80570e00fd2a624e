use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::records::PricePage;
use crate::PricingError;

/// One page fetch against the retail prices API.
///
/// `Query` builds the first request from filter parameters (the HTTP
/// implementation owns URL encoding); `Follow` chases an opaque
/// `NextPageLink` returned by the upstream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageRequest {
    Query { filter: Option<String>, top: Option<u32> },
    Follow { url: String },
}

#[async_trait]
pub trait RetailPricesApi: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PricePage, PricingError>;
}

pub struct HttpRetailPricesApi {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpRetailPricesApi {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl RetailPricesApi for HttpRetailPricesApi {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PricePage, PricingError> {
        let builder = match request {
            PageRequest::Query { filter, top } => {
                let mut builder = self.http.get(&self.base_url);
                if let Some(filter) = filter {
                    builder = builder.query(&[("$filter", filter.as_str())]);
                }
                if let Some(top) = top {
                    builder = builder.query(&[("$top", top.to_string().as_str())]);
                }
                builder
            }
            PageRequest::Follow { url } => self.http.get(url),
        };

        let response = builder.timeout(self.timeout).send().await.map_err(|error| {
            if error.is_timeout() {
                PricingError::Unavailable(format!("request timed out: {error}"))
            } else {
                PricingError::Unavailable(format!("request failed: {error}"))
            }
        })?;

        // The upstream answers 400 for filters it cannot parse; everything
        // else non-2xx is treated as an availability problem.
        if response.status() == StatusCode::BAD_REQUEST {
            return Err(PricingError::InvalidRequest(
                "the retail prices API rejected the filter expression".to_string(),
            ));
        }
        let response = response.error_for_status().map_err(|error| {
            PricingError::Unavailable(format!("unexpected status: {error}"))
        })?;

        response.json::<PricePage>().await.map_err(|error| {
            PricingError::Unavailable(format!("unexpected response shape: {error}"))
        })
    }
}
