use std::collections::BTreeSet;

use azimuth_core::config::PricingConfig;
use tracing::{debug, warn};

use crate::api::{HttpRetailPricesApi, PageRequest, RetailPricesApi};
use crate::records::{PriceFilter, PriceItem, PriceRecord};
use crate::PricingError;

/// Sample size used when listing the service-name catalog.
const SERVICE_CATALOG_SAMPLE: u32 = 1_000;

pub struct PricingClient<A = HttpRetailPricesApi> {
    api: A,
    max_pages: u32,
}

impl PricingClient<HttpRetailPricesApi> {
    pub fn from_config(config: &PricingConfig) -> Self {
        Self::new(
            HttpRetailPricesApi::new(config.base_url.clone(), config.timeout_secs),
            config.max_pages,
        )
    }
}

impl<A> PricingClient<A>
where
    A: RetailPricesApi,
{
    pub fn new(api: A, max_pages: u32) -> Self {
        Self { api, max_pages: max_pages.max(1) }
    }

    /// Fetches every price record matching the filter, draining pagination
    /// up to the configured page cap. An empty result is a valid outcome
    /// (service unknown at that filter), not an error.
    pub async fn fetch_prices(
        &self,
        filter: &PriceFilter,
    ) -> Result<Vec<PriceRecord>, PricingError> {
        filter.validate()?;

        let mut request = PageRequest::Query { filter: Some(filter.to_odata()), top: None };
        let mut records = Vec::new();
        let mut pages_fetched = 0u32;

        loop {
            let page = self.api.fetch_page(&request).await?;
            pages_fetched += 1;
            records.extend(page.items.into_iter().filter_map(PriceItem::into_record));

            match page.next_page_link.filter(|link| !link.trim().is_empty()) {
                Some(next) if pages_fetched < self.max_pages => {
                    request = PageRequest::Follow { url: next };
                }
                Some(_) => {
                    warn!(
                        event_name = "pricing.pagination_capped",
                        pages_fetched,
                        max_pages = self.max_pages,
                        service_name = %filter.service_name,
                        "stopping pagination at the configured page cap"
                    );
                    break;
                }
                None => break,
            }
        }

        debug!(
            event_name = "pricing.fetch_completed",
            pages_fetched,
            record_count = records.len(),
            service_name = %filter.service_name,
            currency = %filter.currency,
            "retail price lookup completed"
        );

        Ok(records)
    }

    /// Sorted, deduplicated service names from a first-page sample of the
    /// catalog.
    pub async fn list_service_names(&self) -> Result<Vec<String>, PricingError> {
        let request =
            PageRequest::Query { filter: None, top: Some(SERVICE_CATALOG_SAMPLE) };
        let page = self.api.fetch_page(&request).await?;

        let names = page
            .items
            .into_iter()
            .filter_map(|item| item.service_name)
            .filter(|name| !name.trim().is_empty())
            .collect::<BTreeSet<_>>();

        Ok(names.into_iter().collect())
    }
}
