use std::io::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use azimuth_agent::llm::AzureOpenAiClient;
use azimuth_agent::orchestrator::{
    ConversationOrchestrator, SessionOutcome, SessionPolicy, TurnObserver,
};
use azimuth_agent::participants::{PricingAdvisor, RequirementsParser, UserInput, UserProxy};
use azimuth_core::config::{AppConfig, LoadOptions};
use azimuth_core::transcript::{Speaker, Turn};
use azimuth_pricing::PricingClient;
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;

use crate::commands::{runtime, CommandResult};
use crate::session_log::{JsonlSessionLog, SessionLogSink};

pub fn run(message: Option<String>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("chat", "config_validation", error.to_string(), 2)
        }
    };
    init_logging(&config);

    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        }
    };

    match runtime.block_on(run_chat(&config, message)) {
        Ok(outcome) => CommandResult::success(
            "chat",
            format!(
                "session terminated ({}) after {} turns{}",
                outcome.reason.as_str(),
                outcome.transcript.len(),
                if outcome.incomplete { "; requirements incomplete" } else { "" }
            ),
        ),
        Err(error) => CommandResult::failure("chat", "session", error.to_string(), 4),
    }
}

fn init_logging(config: &AppConfig) {
    use azimuth_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    let result = match config.logging.format {
        Compact => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .compact()
            .try_init(),
        Pretty => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .pretty()
            .try_init(),
        Json => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .json()
            .try_init(),
    };
    // A second chat invocation in the same process keeps the first
    // subscriber.
    let _ = result;
}

async fn run_chat(config: &AppConfig, message: Option<String>) -> anyhow::Result<SessionOutcome> {
    let session_log = JsonlSessionLog::create(&config.session.log_dir)?;
    tracing::info!(
        event_name = "cli.session_log_opened",
        path = %session_log.path().display(),
        "session log opened"
    );

    let input = StdinUserInput::new();
    let initial = match message {
        Some(message) => message,
        None => input
            .next_message()
            .await
            .ok_or_else(|| anyhow::anyhow!("no opening message was provided"))?,
    };

    let mut parser = RequirementsParser::new();
    if let Some(llm) = AzureOpenAiClient::from_config(&config.llm) {
        parser = parser.with_llm(Arc::new(llm));
    }

    let orchestrator = ConversationOrchestrator::new(
        UserProxy::new(input),
        parser,
        PricingAdvisor::new(PricingClient::from_config(&config.pricing)),
        SessionPolicy::from_config(&config.session),
    )
    .with_observer(Arc::new(ConsoleObserver { log: session_log }));

    Ok(orchestrator.run_session(&initial).await?)
}

/// Renders non-user turns to the terminal and mirrors every turn into the
/// session log.
struct ConsoleObserver {
    log: JsonlSessionLog,
}

impl TurnObserver for ConsoleObserver {
    fn on_turn(&self, turn: &Turn) {
        self.log.emit(turn);
        if turn.speaker != Speaker::User {
            println!("{}> {}", turn.speaker, turn.text);
        }
    }
}

struct StdinUserInput {
    reader: Mutex<BufReader<Stdin>>,
}

impl StdinUserInput {
    fn new() -> Self {
        Self { reader: Mutex::new(BufReader::new(tokio::io::stdin())) }
    }
}

#[async_trait]
impl UserInput for StdinUserInput {
    async fn next_message(&self) -> Option<String> {
        print!("you> ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        let mut reader = self.reader.lock().await;
        match reader.read_line(&mut line).await {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end().to_string()),
            Err(_) => None,
        }
    }
}
