use azimuth_core::config::{AppConfig, LoadOptions};
use azimuth_pricing::{PricingClient, PricingError};

use crate::commands::{runtime, CommandResult};

pub fn run(json: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("services", "config_validation", error.to_string(), 2)
        }
    };

    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "services",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        }
    };

    let client = PricingClient::from_config(&config.pricing);
    match runtime.block_on(client.list_service_names()) {
        Ok(names) => {
            if json {
                match serde_json::to_string_pretty(&names) {
                    Ok(body) => CommandResult { exit_code: 0, output: body },
                    Err(error) => {
                        CommandResult::failure("services", "serialization", error.to_string(), 5)
                    }
                }
            } else {
                let mut lines = vec![format!("{} services in the catalog sample:", names.len())];
                lines.extend(names.into_iter().map(|name| format!("- {name}")));
                CommandResult { exit_code: 0, output: lines.join("\n") }
            }
        }
        Err(PricingError::InvalidRequest(message)) => {
            CommandResult::failure("services", "invalid_request", message, 2)
        }
        Err(PricingError::Unavailable(message)) => {
            CommandResult::failure("services", "unavailable", message, 3)
        }
    }
}
