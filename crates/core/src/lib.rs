//! Session core for the azimuth migration advisor.
//!
//! This crate owns the deterministic pieces of an advisory session:
//! - The append-only transcript shared by every participant (`transcript`)
//! - The structured migration requirements record (`requirements`)
//! - The session state machine that decides whose turn it is (`flows`)
//! - Configuration and the session error taxonomy (`config`, `errors`)
//!
//! Nothing here performs I/O. Network access (retail pricing, inference)
//! lives behind traits in the `azimuth-pricing` and `azimuth-agent` crates,
//! and the transcript ordering is the single source of truth for
//! conversational context: participants read it, only the orchestrator
//! appends to it.

pub mod config;
pub mod errors;
pub mod flows;
pub mod requirements;
pub mod transcript;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use errors::SessionError;
pub use flows::engine::{AdvisorySessionFlow, FlowEngine, FlowTransitionError, SessionFlow};
pub use flows::states::{SessionAction, SessionEvent, SessionState, TransitionOutcome};
pub use requirements::{DeploymentModel, RequirementsRecord};
pub use transcript::{Speaker, Transcript, Turn};
