use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use azimuth_agent::orchestrator::TurnObserver;
use azimuth_core::transcript::Turn;
use chrono::Utc;
use tracing::warn;

/// Append-only sink for session turns. The format is host-defined: the
/// advisory core only guarantees the order of `emit` calls matches the
/// transcript order.
pub trait SessionLogSink: Send + Sync {
    fn emit(&self, turn: &Turn);
}

/// One JSONL file per session under the configured log directory.
///
/// A write failure is logged and swallowed: the session log is an audit
/// artifact, losing a line must never abort a running conversation.
pub struct JsonlSessionLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlSessionLog {
    pub fn create(log_dir: &Path) -> std::io::Result<Self> {
        fs::create_dir_all(log_dir)?;
        let file_name = format!("session-{}.jsonl", Utc::now().format("%Y%m%dT%H%M%S%3fZ"));
        let path = log_dir.join(file_name);
        let file = OpenOptions::new().create_new(true).append(true).open(&path)?;
        Ok(Self { path, file: Mutex::new(file) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionLogSink for JsonlSessionLog {
    fn emit(&self, turn: &Turn) {
        let line = match serde_json::to_string(turn) {
            Ok(line) => line,
            Err(error) => {
                warn!(
                    event_name = "session_log.serialize_failed",
                    error = %error,
                    "turn could not be serialized for the session log"
                );
                return;
            }
        };

        let mut file = match self.file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(error) = writeln!(file, "{line}") {
            warn!(
                event_name = "session_log.write_failed",
                path = %self.path.display(),
                error = %error,
                "session log write failed"
            );
        }
    }
}

impl TurnObserver for JsonlSessionLog {
    fn on_turn(&self, turn: &Turn) {
        self.emit(turn);
    }
}

#[derive(Default)]
pub struct InMemorySessionLog {
    turns: Mutex<Vec<Turn>>,
}

impl InMemorySessionLog {
    pub fn turns(&self) -> Vec<Turn> {
        match self.turns.lock() {
            Ok(turns) => turns.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl SessionLogSink for InMemorySessionLog {
    fn emit(&self, turn: &Turn) {
        match self.turns.lock() {
            Ok(mut turns) => turns.push(turn.clone()),
            Err(poisoned) => poisoned.into_inner().push(turn.clone()),
        }
    }
}
