use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::SessionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    RequirementsParser,
    PricingAdvisor,
    System,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::RequirementsParser => "requirements_parser",
            Self::PricingAdvisor => "pricing_advisor",
            Self::System => "system",
        }
    }

    /// System turns are protected from capacity eviction.
    pub fn is_system(&self) -> bool {
        matches!(self, Self::System)
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message contributed by a participant. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub speaker: Speaker,
    pub text: String,
    pub occurred_at: DateTime<Utc>,
    pub payload: Option<Value>,
}

impl Turn {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            speaker,
            text: text.into(),
            occurred_at: Utc::now(),
            payload: None,
        }
    }

    /// Attach a structured payload (extraction results, price records).
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Ordered, append-only log of turns for a single session.
///
/// Capacity policy: when the configured cap is reached the oldest
/// non-system turn is evicted before the new turn is pushed, so the most
/// recent turns are always retained. Eviction only fails (`StorageFull`)
/// when every retained turn is a system turn. After `seal()` every append
/// fails with `SessionTerminated`.
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
    capacity: Option<usize>,
    sealed: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { turns: Vec::new(), capacity: Some(capacity.max(1)), sealed: false }
    }

    pub fn append(&mut self, turn: Turn) -> Result<(), SessionError> {
        if self.sealed {
            return Err(SessionError::SessionTerminated);
        }

        if let Some(capacity) = self.capacity {
            if self.turns.len() >= capacity {
                let evictable = self.turns.iter().position(|turn| !turn.speaker.is_system());
                match evictable {
                    Some(index) => {
                        self.turns.remove(index);
                    }
                    None => return Err(SessionError::StorageFull),
                }
            }
        }

        self.turns.push(turn);
        Ok(())
    }

    /// Marks the session terminated. Irreversible.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// User-authored turns in append order.
    pub fn user_turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().filter(|turn| turn.speaker == Speaker::User)
    }
}
