use azimuth_core::config::{AppConfig, LoadOptions};
use azimuth_pricing::{summarize, PriceFilter, PricingClient, PricingError};

use crate::commands::{runtime, CommandResult};

const SUMMARY_LINES: usize = 20;

pub fn run(service: String, region: Option<String>, currency: String, json: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("prices", "config_validation", error.to_string(), 2)
        }
    };

    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "prices",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        }
    };

    let client = PricingClient::from_config(&config.pricing);
    let mut filter = PriceFilter::new(service).with_currency(currency);
    if let Some(region) = region {
        filter = filter.with_region(region);
    }

    match runtime.block_on(client.fetch_prices(&filter)) {
        Ok(records) => {
            if json {
                match serde_json::to_string_pretty(&records) {
                    Ok(body) => CommandResult { exit_code: 0, output: body },
                    Err(error) => {
                        CommandResult::failure("prices", "serialization", error.to_string(), 5)
                    }
                }
            } else {
                CommandResult { exit_code: 0, output: summarize(&filter, &records, SUMMARY_LINES) }
            }
        }
        Err(PricingError::InvalidRequest(message)) => {
            CommandResult::failure("prices", "invalid_request", message, 2)
        }
        Err(PricingError::Unavailable(message)) => {
            CommandResult::failure("prices", "unavailable", message, 3)
        }
    }
}
