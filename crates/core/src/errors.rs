use thiserror::Error;

use crate::flows::engine::FlowTransitionError;

/// Session-level error taxonomy.
///
/// `InvalidRequest` and `Unavailable` are recoverable: the orchestrator
/// surfaces them to the user as an explanatory turn and the session
/// continues. `StorageFull` and `SessionTerminated` indicate a broken
/// contract on the caller's side and are fatal to the call that raised them.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("external dependency unavailable: {0}")]
    Unavailable(String),
    #[error("transcript capacity exhausted and no turn is evictable")]
    StorageFull,
    #[error("turn appended after session termination")]
    SessionTerminated,
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
}

impl SessionError {
    /// Stable, user-safe wording for the explanatory turn. Internal detail
    /// stays in the `Display` impl and the structured logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => {
                "That request could not be processed. Check the inputs and try again."
            }
            Self::Unavailable(_) => {
                "An external service is temporarily unavailable. You can retry, or end the session."
            }
            Self::StorageFull => "The conversation history is full and cannot accept more turns.",
            Self::SessionTerminated | Self::FlowTransition(_) => {
                "This session has ended. Start a new session to continue."
            }
        }
    }

    /// True when the orchestrator may keep the session open after surfacing
    /// the error as a turn.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidRequest(_) | Self::Unavailable(_))
    }
}
