use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::PricingError;

/// One retail price entry as consumed by the advisor. Read-only; sourced
/// externally, never mutated locally.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub service_name: String,
    pub product_name: String,
    pub sku_name: String,
    pub region: String,
    pub currency: String,
    pub unit_price: Decimal,
    pub unit_of_measure: String,
    pub effective_start_date: Option<DateTime<Utc>>,
}

/// Lookup filter. `service_name` is required; `region` is optional
/// (unset means any region); `currency` defaults to USD.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceFilter {
    pub service_name: String,
    pub region: Option<String>,
    pub currency: String,
}

impl PriceFilter {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into(), region: None, currency: "USD".to_string() }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn validate(&self) -> Result<(), PricingError> {
        if self.service_name.trim().is_empty() {
            return Err(PricingError::InvalidRequest("service name must not be empty".to_string()));
        }
        if self.currency.trim().is_empty() {
            return Err(PricingError::InvalidRequest("currency must not be empty".to_string()));
        }
        Ok(())
    }

    /// Renders the OData `$filter` expression the retail prices API
    /// expects. Single quotes inside values are doubled per OData escaping.
    pub fn to_odata(&self) -> String {
        let mut clauses = vec![format!("serviceName eq '{}'", escape_odata(&self.service_name))];

        if let Some(region) = &self.region {
            if !region.trim().is_empty() {
                clauses.push(format!("armRegionName eq '{}'", escape_odata(region)));
            }
        }

        clauses.push(format!("currencyCode eq '{}'", escape_odata(&self.currency)));
        clauses.join(" and ")
    }
}

fn escape_odata(value: &str) -> String {
    value.trim().replace('\'', "''")
}

/// One page of the upstream response. Every field is optional: the
/// upstream is untrusted and a missing `Items` array is treated as empty
/// rather than as a decode failure.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PricePage {
    #[serde(rename = "Items", default)]
    pub items: Vec<PriceItem>,
    #[serde(rename = "NextPageLink", default)]
    pub next_page_link: Option<String>,
    #[serde(rename = "Count", default)]
    pub count: Option<u64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceItem {
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub sku_name: Option<String>,
    #[serde(default)]
    pub arm_region_name: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub unit_of_measure: Option<String>,
    #[serde(default)]
    pub effective_start_date: Option<String>,
}

impl PriceItem {
    /// Normalizes a wire item into a [`PriceRecord`]. Items without a
    /// service name or unit price are dropped rather than failing the
    /// whole page.
    pub fn into_record(self) -> Option<PriceRecord> {
        let service_name = self.service_name?;
        let unit_price = self.unit_price?;

        let effective_start_date = self
            .effective_start_date
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|parsed| parsed.with_timezone(&Utc));

        Some(PriceRecord {
            service_name,
            product_name: self.product_name.unwrap_or_default(),
            sku_name: self.sku_name.unwrap_or_default(),
            region: self.arm_region_name.unwrap_or_default(),
            currency: self.currency_code.unwrap_or_default(),
            unit_price,
            unit_of_measure: self.unit_of_measure.unwrap_or_default(),
            effective_start_date,
        })
    }
}
