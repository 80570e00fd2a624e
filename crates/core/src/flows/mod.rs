pub mod engine;
pub mod states;

pub use engine::{AdvisorySessionFlow, FlowEngine, FlowTransitionError, SessionFlow};
pub use states::{SessionAction, SessionEvent, SessionState, TransitionOutcome};
