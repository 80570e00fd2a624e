use std::sync::Arc;

use azimuth_core::config::SessionConfig;
use azimuth_core::errors::SessionError;
use azimuth_core::flows::engine::{AdvisorySessionFlow, FlowEngine};
use azimuth_core::flows::states::{SessionAction, SessionEvent, SessionState, TransitionOutcome};
use azimuth_core::requirements::RequirementsRecord;
use azimuth_core::transcript::{Speaker, Transcript, Turn};
use azimuth_pricing::api::RetailPricesApi;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::extraction::ExtractionOutcome;
use crate::participants::{Participant, PricingAdvisor, RequirementsParser, UserInput, UserProxy};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminationReason {
    UserEnded,
    TurnLimit,
    Error,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserEnded => "user-ended",
            Self::TurnLimit => "turn-limit",
            Self::Error => "error",
        }
    }
}

/// What a finished session hands back to its host.
#[derive(Debug)]
pub struct SessionOutcome {
    pub transcript: Transcript,
    pub requirements: RequirementsRecord,
    pub reason: TerminationReason,
    pub incomplete: bool,
}

/// Turn-taking policy distilled from [`SessionConfig`].
///
/// A user turn terminates the session when it contains the configured
/// phrase as a standalone word (case-insensitive), or when the whole
/// trimmed message is one of `quit`/`exit`/`done`. `max_user_turns` counts
/// user-authored turns only.
#[derive(Clone, Debug)]
pub struct SessionPolicy {
    pub max_user_turns: u32,
    pub transcript_capacity: usize,
    pub termination_phrase: String,
}

impl SessionPolicy {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            max_user_turns: config.max_turns,
            transcript_capacity: config.transcript_capacity,
            termination_phrase: config.termination_phrase.clone(),
        }
    }

    fn is_termination(&self, text: &str) -> bool {
        let lowered = text.trim().to_ascii_lowercase();
        if matches!(lowered.as_str(), "quit" | "exit" | "done") {
            return true;
        }
        contains_phrase(&lowered, &self.termination_phrase.to_ascii_lowercase())
    }
}

/// Host hook invoked after every successful append: console rendering,
/// session logging. Must not block the turn loop for long.
pub trait TurnObserver: Send + Sync {
    fn on_turn(&self, turn: &Turn);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTurnObserver;

impl TurnObserver for NoopTurnObserver {
    fn on_turn(&self, _turn: &Turn) {}
}

fn contains_phrase(text_lower: &str, phrase_lower: &str) -> bool {
    if phrase_lower.is_empty() {
        return false;
    }
    if phrase_lower.contains(char::is_whitespace) {
        return text_lower.contains(phrase_lower);
    }
    text_lower
        .split(|character: char| !character.is_ascii_alphanumeric())
        .any(|word| word == phrase_lower)
}

/// Sequences the user proxy, requirements parser, and pricing advisor over
/// one shared transcript.
///
/// Single-threaded cooperative turn-taking: at most one participant
/// produces output at a time and every append is serialized here. The
/// session record is merged last-write-wins from each extraction pass, so
/// it survives transcript eviction of old turns.
pub struct ConversationOrchestrator<I, A> {
    user: UserProxy<I>,
    parser: RequirementsParser,
    advisor: PricingAdvisor<A>,
    engine: FlowEngine<AdvisorySessionFlow>,
    policy: SessionPolicy,
    observer: Arc<dyn TurnObserver>,
}

impl<I, A> ConversationOrchestrator<I, A>
where
    I: UserInput,
    A: RetailPricesApi,
{
    pub fn new(
        user: UserProxy<I>,
        parser: RequirementsParser,
        advisor: PricingAdvisor<A>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            user,
            parser,
            advisor,
            engine: FlowEngine::default(),
            policy,
            observer: Arc::new(NoopTurnObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn TurnObserver>) -> Self {
        self.observer = observer;
        self
    }

    fn append(&self, transcript: &mut Transcript, turn: Turn) -> Result<(), SessionError> {
        transcript.append(turn)?;
        if let Some(appended) = transcript.last() {
            self.observer.on_turn(appended);
        }
        Ok(())
    }

    /// Runs one session to termination.
    ///
    /// Recoverable failures (bad input, unavailable upstream) become
    /// explanatory turns and the conversation continues; anything else
    /// seals the transcript with a `terminationReason = error` outcome.
    /// The returned transcript is sealed and the record may be partial.
    pub async fn run_session(
        &self,
        initial_user_message: &str,
    ) -> Result<SessionOutcome, SessionError> {
        let mut transcript = Transcript::with_capacity(self.policy.transcript_capacity);
        let mut requirements = RequirementsRecord::default();
        let mut state = self.engine.initial_state();
        let mut user_turn_count: u32 = 0;
        let mut pending_initial = Some(initial_user_message.to_string());

        info!(
            event_name = "session.started",
            max_user_turns = self.policy.max_user_turns,
            termination_phrase = %self.policy.termination_phrase,
            "advisory session started"
        );

        let (reason, incomplete) = loop {
            match state {
                SessionState::AwaitingUser => {
                    let turn = match pending_initial.take() {
                        Some(text) => Turn::new(Speaker::User, text),
                        None => self.user.produce_reply(&transcript).await?,
                    };
                    let terminate = self.policy.is_termination(&turn.text);
                    self.append(&mut transcript, turn)?;
                    user_turn_count += 1;

                    // Termination always wins over whatever else the turn
                    // would have triggered.
                    if terminate {
                        let outcome =
                            self.engine.apply(&state, &SessionEvent::TerminationRequested)?;
                        self.apply_termination_actions(&outcome, &mut transcript, &requirements)?;
                        break (TerminationReason::UserEnded, requirements.is_partial());
                    }
                    if user_turn_count >= self.policy.max_user_turns {
                        let outcome =
                            self.engine.apply(&state, &SessionEvent::TurnBudgetExhausted)?;
                        self.apply_termination_actions(&outcome, &mut transcript, &requirements)?;
                        info!(
                            event_name = "session.turn_budget_exhausted",
                            user_turn_count,
                            "turn budget reached; terminating session"
                        );
                        break (TerminationReason::TurnLimit, true);
                    }

                    state = self.engine.apply(&state, &SessionEvent::UserTurnReceived)?.to;
                }
                SessionState::Extracting => {
                    let pass = self.parser.analyze(&transcript);
                    requirements.merge(pass.record);
                    let outcome = ExtractionOutcome::from_record(requirements.clone());

                    debug!(
                        event_name = "session.extraction_pass",
                        partial = outcome.partial,
                        missing = ?outcome.record.missing_fields(),
                        "requirements extraction pass completed"
                    );

                    let reply = self.parser.reply_for(&outcome).await;
                    self.append(&mut transcript, reply)?;

                    let event = if outcome.partial {
                        SessionEvent::ExtractionIncomplete
                    } else {
                        SessionEvent::ExtractionComplete
                    };
                    state = self.engine.apply(&state, &event)?.to;
                }
                SessionState::Pricing => match self.advisor.advise(&requirements).await {
                    Ok(turn) => {
                        self.append(&mut transcript, turn)?;
                        state =
                            self.engine.apply(&state, &SessionEvent::PriceSummaryAppended)?.to;
                    }
                    Err(failure) if failure.is_recoverable() => {
                        warn!(
                            event_name = "session.pricing_failed",
                            error = %failure,
                            "pricing lookup failed; surfacing explanatory turn"
                        );
                        let text = format!(
                            "{} Reply `retry` to repeat the pricing lookup, or `{}` to end the session.",
                            failure.user_message(),
                            self.policy.termination_phrase
                        );
                        self.append(&mut transcript, Turn::new(Speaker::System, text))?;
                        state =
                            self.engine.apply(&state, &SessionEvent::PriceSummaryAppended)?.to;
                    }
                    Err(failure) => {
                        error!(
                            event_name = "session.fatal_error",
                            error = %failure,
                            "unrecoverable failure; terminating session"
                        );
                        self.append(
                            &mut transcript,
                            Turn::new(Speaker::System, failure.user_message()),
                        )?;
                        self.engine.apply(&state, &SessionEvent::TerminationRequested)?;
                        break (TerminationReason::Error, true);
                    }
                },
                SessionState::Terminated => return Err(SessionError::SessionTerminated),
            }
        };

        transcript.seal();
        info!(
            event_name = "session.terminated",
            reason = reason.as_str(),
            incomplete,
            turns = transcript.len(),
            user_turn_count,
            "advisory session terminated"
        );

        Ok(SessionOutcome { transcript, requirements, reason, incomplete })
    }

    fn apply_termination_actions(
        &self,
        outcome: &TransitionOutcome,
        transcript: &mut Transcript,
        requirements: &RequirementsRecord,
    ) -> Result<(), SessionError> {
        for action in &outcome.actions {
            if *action == SessionAction::EmitFinalSummary {
                self.append(transcript, Turn::new(Speaker::System, final_summary(requirements)))?;
            }
        }
        Ok(())
    }
}

fn final_summary(record: &RequirementsRecord) -> String {
    let captured = |values: &std::collections::BTreeSet<String>| {
        if values.is_empty() {
            "not specified".to_string()
        } else {
            values.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    };

    let mut summary = format!(
        "Session summary. Workload type: {}. Architecture layers: {}. Languages: {}. \
         Data stores: {}. Deployment model: {}.",
        record.workload_type.as_deref().unwrap_or("not specified"),
        captured(&record.architecture_layers),
        captured(&record.languages),
        captured(&record.data_stores),
        record.deployment_model.map(|model| model.as_str()).unwrap_or("not specified"),
    );

    if record.is_partial() {
        summary.push_str(&format!(
            " Still missing: {}.",
            record.missing_fields().join(", ")
        ));
    }
    summary
}
