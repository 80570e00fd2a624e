pub mod commands;
pub mod session_log;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "azimuth",
    about = "Azure migration advisory CLI",
    long_about = "Collect migration requirements over a chat session, look up Azure retail \
                  pricing, and inspect advisor configuration and readiness.",
    after_help = "Examples:\n  azimuth chat \"I need to migrate a web portal with a SQL database\"\n  azimuth prices --service \"Virtual Machines\" --region eastus\n  azimuth doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run an interactive advisory session")]
    Chat {
        #[arg(help = "Opening message; the session prompts interactively when omitted")]
        message: Option<String>,
    },
    #[command(about = "One-shot retail price lookup with optional region/currency filters")]
    Prices {
        #[arg(long, help = "Service name, e.g. \"Virtual Machines\"")]
        service: String,
        #[arg(long, help = "ARM region name, e.g. eastus")]
        region: Option<String>,
        #[arg(long, default_value = "USD", help = "Currency code, e.g. USD or EUR")]
        currency: String,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List service names from a retail catalog sample")]
    Services {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, inference readiness, and session log checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat { message } => commands::chat::run(message),
        Command::Prices { service, region, currency, json } => {
            commands::prices::run(service, region, currency, json)
        }
        Command::Services { json } => commands::services::run(json),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
