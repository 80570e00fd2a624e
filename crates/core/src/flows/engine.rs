use thiserror::Error;

use crate::flows::states::{SessionAction, SessionEvent, SessionState, TransitionOutcome};

/// A turn-taking protocol: which state a session starts in, and which
/// transitions are legal. The orchestrator owns event ordering; the flow
/// only validates and names the follow-up actions.
pub trait SessionFlow {
    fn initial_state(&self) -> SessionState;
    fn transition(
        &self,
        current: &SessionState,
        event: &SessionEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// The advisory turn-taking protocol:
///
/// ```text
/// AwaitingUser --UserTurnReceived--> Extracting
/// Extracting --ExtractionComplete--> Pricing
/// Extracting --ExtractionIncomplete--> AwaitingUser
/// Pricing --PriceSummaryAppended--> AwaitingUser
/// <any live state> --TerminationRequested | TurnBudgetExhausted--> Terminated
/// ```
///
/// `Terminated` accepts no event; the machine never leaves it.
#[derive(Clone, Debug, Default)]
pub struct AdvisorySessionFlow;

impl SessionFlow for AdvisorySessionFlow {
    fn initial_state(&self) -> SessionState {
        SessionState::AwaitingUser
    }

    fn transition(
        &self,
        current: &SessionState,
        event: &SessionEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_advisory(current, event)
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: SessionFlow,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> SessionState {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: &SessionState,
        event: &SessionEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event)
    }
}

impl Default for FlowEngine<AdvisorySessionFlow> {
    fn default() -> Self {
        Self::new(AdvisorySessionFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("session already terminated; event {event:?} not accepted")]
    SessionTerminated { event: SessionEvent },
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: SessionState, event: SessionEvent },
}

fn transition_advisory(
    current: &SessionState,
    event: &SessionEvent,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use SessionAction::{
        EmitFinalSummary, PromptForMissingFields, RunExtraction, RunPricingLookup, SealTranscript,
    };
    use SessionEvent::{
        ExtractionComplete, ExtractionIncomplete, PriceSummaryAppended, TerminationRequested,
        TurnBudgetExhausted, UserTurnReceived,
    };
    use SessionState::{AwaitingUser, Extracting, Pricing, Terminated};

    if *current == Terminated {
        return Err(FlowTransitionError::SessionTerminated { event: *event });
    }

    let (to, actions) = match (current, event) {
        (AwaitingUser, UserTurnReceived) => (Extracting, vec![RunExtraction]),
        (Extracting, ExtractionComplete) => (Pricing, vec![RunPricingLookup]),
        (Extracting, ExtractionIncomplete) => (AwaitingUser, vec![PromptForMissingFields]),
        (Pricing, PriceSummaryAppended) => (AwaitingUser, Vec::new()),
        (_, TerminationRequested) => (Terminated, vec![EmitFinalSummary, SealTranscript]),
        (_, TurnBudgetExhausted) => (Terminated, vec![SealTranscript]),
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                state: *current,
                event: *event,
            });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: *event, actions })
}

#[cfg(test)]
mod tests {
    use crate::flows::engine::{AdvisorySessionFlow, FlowEngine, FlowTransitionError, SessionFlow};
    use crate::flows::states::{SessionAction, SessionEvent, SessionState};

    #[test]
    fn full_advisory_round_trip() {
        let engine = FlowEngine::default();
        let mut state = engine.initial_state();
        assert_eq!(state, SessionState::AwaitingUser);

        state = engine
            .apply(&state, &SessionEvent::UserTurnReceived)
            .expect("awaiting_user -> extracting")
            .to;
        let incomplete = engine
            .apply(&state, &SessionEvent::ExtractionIncomplete)
            .expect("extracting -> awaiting_user");
        assert_eq!(incomplete.to, SessionState::AwaitingUser);
        assert_eq!(incomplete.actions, vec![SessionAction::PromptForMissingFields]);

        state = engine
            .apply(&incomplete.to, &SessionEvent::UserTurnReceived)
            .expect("awaiting_user -> extracting")
            .to;
        let priced =
            engine.apply(&state, &SessionEvent::ExtractionComplete).expect("extracting -> pricing");
        assert_eq!(priced.actions, vec![SessionAction::RunPricingLookup]);

        state = engine
            .apply(&priced.to, &SessionEvent::PriceSummaryAppended)
            .expect("pricing -> awaiting_user")
            .to;
        assert_eq!(state, SessionState::AwaitingUser);
    }

    #[test]
    fn termination_is_accepted_from_every_live_state() {
        let engine = FlowEngine::default();
        for state in
            [SessionState::AwaitingUser, SessionState::Extracting, SessionState::Pricing]
        {
            let outcome = engine
                .apply(&state, &SessionEvent::TerminationRequested)
                .expect("termination must be accepted");
            assert_eq!(outcome.to, SessionState::Terminated);
            assert!(outcome.actions.contains(&SessionAction::SealTranscript));
        }
    }

    #[test]
    fn turn_budget_exhaustion_terminates_without_summary() {
        let engine = FlowEngine::default();
        let outcome = engine
            .apply(&SessionState::Extracting, &SessionEvent::TurnBudgetExhausted)
            .expect("budget exhaustion terminates");
        assert_eq!(outcome.to, SessionState::Terminated);
        assert_eq!(outcome.actions, vec![SessionAction::SealTranscript]);
    }

    #[test]
    fn terminated_accepts_no_event() {
        let engine = FlowEngine::default();
        for event in [
            SessionEvent::UserTurnReceived,
            SessionEvent::ExtractionComplete,
            SessionEvent::ExtractionIncomplete,
            SessionEvent::PriceSummaryAppended,
            SessionEvent::TerminationRequested,
            SessionEvent::TurnBudgetExhausted,
        ] {
            let error = engine
                .apply(&SessionState::Terminated, &event)
                .expect_err("terminated is terminal");
            assert!(matches!(error, FlowTransitionError::SessionTerminated { .. }));
        }
    }

    #[test]
    fn invalid_transition_is_rejected() {
        let engine = FlowEngine::default();
        let error = engine
            .apply(&SessionState::AwaitingUser, &SessionEvent::PriceSummaryAppended)
            .expect_err("awaiting_user cannot accept a price summary");
        assert!(matches!(
            error,
            FlowTransitionError::InvalidTransition {
                state: SessionState::AwaitingUser,
                event: SessionEvent::PriceSummaryAppended
            }
        ));
    }

    #[test]
    fn replay_is_deterministic_for_same_event_sequence() {
        let engine = FlowEngine::new(AdvisorySessionFlow);
        let events = [
            SessionEvent::UserTurnReceived,
            SessionEvent::ExtractionIncomplete,
            SessionEvent::UserTurnReceived,
            SessionEvent::ExtractionComplete,
            SessionEvent::PriceSummaryAppended,
            SessionEvent::TerminationRequested,
        ];

        let run = |engine: &FlowEngine<AdvisorySessionFlow>| {
            let mut state = engine.initial_state();
            let mut actions = Vec::new();
            for event in &events {
                let outcome = engine.apply(&state, event).expect("deterministic run");
                actions.push(outcome.actions);
                state = outcome.to;
            }
            (state, actions)
        };

        let first = run(&engine);
        let second = run(&engine);
        assert_eq!(first, second);
        assert_eq!(first.0, SessionState::Terminated);
        assert_eq!(AdvisorySessionFlow.initial_state(), SessionState::AwaitingUser);
    }
}
