use std::sync::Arc;

use async_trait::async_trait;
use azimuth_core::errors::SessionError;
use azimuth_core::requirements::{DeploymentModel, RequirementsRecord};
use azimuth_core::transcript::{Speaker, Transcript, Turn};
use azimuth_pricing::api::RetailPricesApi;
use azimuth_pricing::{summarize, PriceFilter, PricingClient};
use serde_json::json;
use tracing::warn;

use crate::extraction::{ExtractionOutcome, RequirementsExtractor};
use crate::llm::LlmClient;

/// Any actor capable of producing a turn. The orchestrator owns turn
/// selection; participants only read the transcript and reply.
#[async_trait]
pub trait Participant: Send + Sync {
    fn speaker(&self) -> Speaker;
    async fn produce_reply(&self, transcript: &Transcript) -> Result<Turn, SessionError>;
}

/// Source of user messages for the [`UserProxy`]. `None` means end of
/// input, which the proxy treats as an implicit end-of-conversation
/// signal.
#[async_trait]
pub trait UserInput: Send + Sync {
    async fn next_message(&self) -> Option<String>;
}

pub struct UserProxy<I> {
    input: I,
}

impl<I> UserProxy<I>
where
    I: UserInput,
{
    pub fn new(input: I) -> Self {
        Self { input }
    }
}

#[async_trait]
impl<I> Participant for UserProxy<I>
where
    I: UserInput,
{
    fn speaker(&self) -> Speaker {
        Speaker::User
    }

    async fn produce_reply(&self, _transcript: &Transcript) -> Result<Turn, SessionError> {
        let text = self.input.next_message().await.unwrap_or_else(|| "exit".to_string());
        Ok(Turn::new(Speaker::User, text))
    }
}

const CLARIFY_SYSTEM_PROMPT: &str = "You help collect Azure migration requirements. \
Rephrase the given clarification request as one short, friendly question. \
Ask about exactly one topic. Do not invent requirements the user has not stated.";

/// Payload key under which the parser publishes its structured record.
/// Downstream participants read the latest occurrence from the transcript.
pub const REQUIREMENTS_PAYLOAD_KEY: &str = "requirements";

/// Conversational wrapper around the deterministic extractor.
///
/// The optional LLM client only rephrases the clarification question; the
/// extracted field values are produced by [`RequirementsExtractor`] alone.
#[derive(Default)]
pub struct RequirementsParser {
    extractor: RequirementsExtractor,
    llm: Option<Arc<dyn LlmClient>>,
}

impl RequirementsParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn analyze(&self, transcript: &Transcript) -> ExtractionOutcome {
        self.extractor.extract(transcript)
    }

    pub async fn reply_for(&self, outcome: &ExtractionOutcome) -> Turn {
        let text = if outcome.partial {
            let template = outcome
                .clarification_prompt
                .clone()
                .unwrap_or_else(|| "Could you tell me more about the workload?".to_string());
            self.phrase_clarification(template).await
        } else {
            describe_record(&outcome.record)
        };

        Turn::new(Speaker::RequirementsParser, text).with_payload(json!({
            REQUIREMENTS_PAYLOAD_KEY: outcome.record,
            "partial": outcome.partial,
        }))
    }

    async fn phrase_clarification(&self, template: String) -> String {
        let Some(llm) = &self.llm else {
            return template;
        };

        match llm.complete(CLARIFY_SYSTEM_PROMPT, &template).await {
            Ok(phrased) => phrased,
            Err(error) => {
                // No retry: fall back to the deterministic template and
                // keep the conversation moving.
                warn!(
                    event_name = "agent.clarification_phrasing_failed",
                    error = %error,
                    "inference call failed; using template clarification"
                );
                template
            }
        }
    }
}

#[async_trait]
impl Participant for RequirementsParser {
    fn speaker(&self) -> Speaker {
        Speaker::RequirementsParser
    }

    async fn produce_reply(&self, transcript: &Transcript) -> Result<Turn, SessionError> {
        let outcome = self.analyze(transcript);
        Ok(self.reply_for(&outcome).await)
    }
}

fn describe_record(record: &RequirementsRecord) -> String {
    let set_or_dash = |values: &std::collections::BTreeSet<String>| {
        if values.is_empty() {
            "-".to_string()
        } else {
            values.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    };

    format!(
        "I have all the requirements I need: workload type {}; architecture layers {}; \
         languages {}; data stores {}; deployment model {}. Looking up retail pricing next.",
        record.workload_type.as_deref().unwrap_or("-"),
        set_or_dash(&record.architecture_layers),
        set_or_dash(&record.languages),
        set_or_dash(&record.data_stores),
        record.deployment_model.map(|model| model.as_str()).unwrap_or("-"),
    )
}

/// Maps the requirements record to the retail price lookup and renders the
/// price-summary turn. Lookup failures surface as `SessionError` so the
/// orchestrator can decide whether the session continues.
pub struct PricingAdvisor<A> {
    client: PricingClient<A>,
    max_summary_lines: usize,
}

impl<A> PricingAdvisor<A>
where
    A: RetailPricesApi,
{
    pub fn new(client: PricingClient<A>) -> Self {
        Self { client, max_summary_lines: 8 }
    }

    /// Deployment model decides which service catalog entry to price.
    pub fn filter_for(record: &RequirementsRecord) -> PriceFilter {
        let service_name = match record.deployment_model {
            Some(DeploymentModel::Iaas) => "Virtual Machines",
            Some(DeploymentModel::Containers) => "Azure Kubernetes Service",
            Some(DeploymentModel::Serverless) => "Functions",
            Some(DeploymentModel::Paas) | Some(DeploymentModel::Saas) | None => {
                "Azure App Service"
            }
        };
        PriceFilter::new(service_name)
    }

    pub async fn advise(&self, record: &RequirementsRecord) -> Result<Turn, SessionError> {
        let filter = Self::filter_for(record);
        let records = self.client.fetch_prices(&filter).await.map_err(SessionError::from)?;
        let text = summarize(&filter, &records, self.max_summary_lines);

        Ok(Turn::new(Speaker::PricingAdvisor, text).with_payload(json!({
            "service_name": filter.service_name,
            "currency": filter.currency,
            "record_count": records.len(),
        })))
    }
}

/// Latest structured requirements published to the transcript, if any.
pub fn latest_requirements(transcript: &Transcript) -> Option<RequirementsRecord> {
    transcript
        .turns()
        .iter()
        .rev()
        .filter(|turn| turn.speaker == Speaker::RequirementsParser)
        .find_map(|turn| {
            let payload = turn.payload.as_ref()?;
            serde_json::from_value(payload.get(REQUIREMENTS_PAYLOAD_KEY)?.clone()).ok()
        })
}

#[async_trait]
impl<A> Participant for PricingAdvisor<A>
where
    A: RetailPricesApi,
{
    fn speaker(&self) -> Speaker {
        Speaker::PricingAdvisor
    }

    async fn produce_reply(&self, transcript: &Transcript) -> Result<Turn, SessionError> {
        let record = latest_requirements(transcript).ok_or_else(|| {
            SessionError::InvalidRequest(
                "no requirements record has been published to the transcript".to_string(),
            )
        })?;
        self.advise(&record).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use azimuth_core::requirements::{DeploymentModel, RequirementsRecord};
    use azimuth_core::transcript::{Speaker, Transcript, Turn};
    use azimuth_pricing::api::{PageRequest, RetailPricesApi};
    use azimuth_pricing::records::PricePage;
    use azimuth_pricing::{PricingClient, PricingError};
    use tokio::sync::Mutex;

    use super::{
        latest_requirements, Participant, PricingAdvisor, RequirementsParser, UserInput, UserProxy,
    };
    use crate::llm::{LlmClient, LlmError};

    struct ScriptedInput {
        messages: Mutex<VecDeque<String>>,
    }

    impl ScriptedInput {
        fn with_messages(messages: Vec<&str>) -> Self {
            Self {
                messages: Mutex::new(messages.into_iter().map(str::to_owned).collect()),
            }
        }
    }

    #[async_trait]
    impl UserInput for ScriptedInput {
        async fn next_message(&self) -> Option<String> {
            self.messages.lock().await.pop_front()
        }
    }

    struct ScriptedLlm {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
    }

    impl ScriptedLlm {
        fn with_replies(replies: Vec<Result<String, LlmError>>) -> Self {
            Self { replies: Mutex::new(replies.into()) }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(
            &self,
            _system_prompt: &str,
            _user_prompt: &str,
        ) -> Result<String, LlmError> {
            self.replies
                .lock()
                .await
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyCompletion))
        }
    }

    struct ScriptedApi {
        pages: Mutex<VecDeque<Result<PricePage, PricingError>>>,
    }

    #[async_trait]
    impl RetailPricesApi for ScriptedApi {
        async fn fetch_page(&self, _request: &PageRequest) -> Result<PricePage, PricingError> {
            self.pages.lock().await.pop_front().unwrap_or_else(|| Ok(PricePage::default()))
        }
    }

    fn advisor_with_pages(pages: Vec<Result<PricePage, PricingError>>) -> PricingAdvisor<ScriptedApi> {
        let api = ScriptedApi { pages: Mutex::new(pages.into()) };
        PricingAdvisor::new(PricingClient::new(api, 4))
    }

    fn user_transcript(message: &str) -> Transcript {
        let mut transcript = Transcript::new();
        transcript.append(Turn::new(Speaker::User, message)).expect("fixture append");
        transcript
    }

    #[tokio::test]
    async fn user_proxy_relays_input_and_treats_eof_as_exit() {
        let proxy = UserProxy::new(ScriptedInput::with_messages(vec!["hello there"]));
        let transcript = Transcript::new();

        let first = proxy.produce_reply(&transcript).await.expect("scripted reply");
        assert_eq!(first.speaker, Speaker::User);
        assert_eq!(first.text, "hello there");

        let second = proxy.produce_reply(&transcript).await.expect("eof reply");
        assert_eq!(second.text, "exit");
    }

    #[tokio::test]
    async fn parser_publishes_record_payload_with_clarification() {
        let parser = RequirementsParser::new();
        let transcript = user_transcript("I need a web portal with a SQL database on PaaS");

        let turn = parser.produce_reply(&transcript).await.expect("parser reply");
        assert_eq!(turn.speaker, Speaker::RequirementsParser);
        assert!(turn.text.contains("architecture layers"), "asks about the first missing field");

        let payload = turn.payload.expect("structured payload");
        assert_eq!(payload["partial"], serde_json::Value::Bool(true));
        let record: RequirementsRecord =
            serde_json::from_value(payload["requirements"].clone()).expect("record decodes");
        assert_eq!(record.deployment_model, Some(DeploymentModel::Paas));
    }

    #[tokio::test]
    async fn parser_uses_llm_phrasing_when_available() {
        let llm = Arc::new(ScriptedLlm::with_replies(vec![Ok(
            "Which layers does your application have?".to_string(),
        )]));
        let parser = RequirementsParser::new().with_llm(llm);
        let transcript = user_transcript("I need a web portal with a SQL database on PaaS");

        let turn = parser.produce_reply(&transcript).await.expect("parser reply");
        assert_eq!(turn.text, "Which layers does your application have?");
    }

    #[tokio::test]
    async fn parser_falls_back_to_template_when_llm_fails() {
        let llm = Arc::new(ScriptedLlm::with_replies(vec![Err(LlmError::Unavailable(
            "inference timed out".to_string(),
        ))]));
        let parser = RequirementsParser::new().with_llm(llm);
        let transcript = user_transcript("I need a web portal with a SQL database on PaaS");

        let turn = parser.produce_reply(&transcript).await.expect("parser reply");
        assert!(turn.text.contains("architecture layers"), "template question is used");
    }

    #[test]
    fn deployment_model_routes_to_service_names() {
        let record_for = |model: DeploymentModel| RequirementsRecord {
            deployment_model: Some(model),
            ..RequirementsRecord::default()
        };

        let filter = PricingAdvisor::<ScriptedApi>::filter_for(&record_for(DeploymentModel::Iaas));
        assert_eq!(filter.service_name, "Virtual Machines");
        assert_eq!(filter.currency, "USD");

        assert_eq!(
            PricingAdvisor::<ScriptedApi>::filter_for(&record_for(DeploymentModel::Containers))
                .service_name,
            "Azure Kubernetes Service"
        );
        assert_eq!(
            PricingAdvisor::<ScriptedApi>::filter_for(&record_for(DeploymentModel::Serverless))
                .service_name,
            "Functions"
        );
        assert_eq!(
            PricingAdvisor::<ScriptedApi>::filter_for(&RequirementsRecord::default()).service_name,
            "Azure App Service"
        );
    }

    #[tokio::test]
    async fn advisor_reads_latest_requirements_from_transcript() {
        let parser = RequirementsParser::new();
        let mut transcript =
            user_transcript("A web portal frontend and backend in Java with SQL on IaaS vms");
        let parser_turn = parser.produce_reply(&transcript).await.expect("parser reply");
        transcript.append(parser_turn).expect("append parser turn");

        let record = latest_requirements(&transcript).expect("payload round-trips");
        assert_eq!(record.deployment_model, Some(DeploymentModel::Iaas));

        let advisor = advisor_with_pages(vec![Ok(serde_json::from_str(
            r#"{
                "Items": [
                    { "serviceName": "Virtual Machines", "skuName": "D2 v3", "unitPrice": 0.096,
                      "currencyCode": "USD", "armRegionName": "eastus", "unitOfMeasure": "1 Hour" }
                ]
            }"#,
        )
        .expect("fixture page"))]);

        let turn = advisor.produce_reply(&transcript).await.expect("advisor reply");
        assert_eq!(turn.speaker, Speaker::PricingAdvisor);
        assert!(turn.text.contains("Virtual Machines"));
        assert_eq!(turn.payload.expect("payload")["record_count"], serde_json::json!(1));
    }

    #[tokio::test]
    async fn advisor_without_published_requirements_is_invalid() {
        let advisor = advisor_with_pages(Vec::new());
        let transcript = user_transcript("hello");

        let error = advisor
            .produce_reply(&transcript)
            .await
            .expect_err("no requirements payload available");
        assert!(matches!(error, azimuth_core::SessionError::InvalidRequest(_)));
    }
}
