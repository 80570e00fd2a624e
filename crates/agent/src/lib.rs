//! Conversation runtime for the azimuth migration advisor.
//!
//! This crate sequences the advisory session:
//! 1. **Requirements extraction** (`extraction`) - Parse NL user turns into
//!    a structured `RequirementsRecord`
//! 2. **Participants** (`participants`) - The closed set of actors that can
//!    produce a turn: user proxy, requirements parser, pricing advisor
//! 3. **Orchestration** (`orchestrator`) - Explicit turn selection over the
//!    session state machine, termination detection, and the session outcome
//! 4. **Inference** (`llm`) - Optional Azure OpenAI client
//!
//! # Safety Principle
//!
//! The LLM is strictly a translator. It NEVER decides requirement values,
//! prices, or termination. Those are deterministic decisions made by the
//! extractor, the pricing client, and the session policy.

pub mod extraction;
pub mod llm;
pub mod orchestrator;
pub mod participants;

pub use extraction::{ExtractionOutcome, RequirementsExtractor};
pub use llm::{AzureOpenAiClient, LlmClient, LlmError};
pub use orchestrator::{
    ConversationOrchestrator, NoopTurnObserver, SessionOutcome, SessionPolicy, TerminationReason,
    TurnObserver,
};
pub use participants::{
    latest_requirements, Participant, PricingAdvisor, RequirementsParser, UserInput, UserProxy,
};
