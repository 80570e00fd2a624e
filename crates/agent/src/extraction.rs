use azimuth_core::requirements::{DeploymentModel, RequirementsRecord};
use azimuth_core::transcript::Transcript;

/// Result of one extraction pass over the transcript.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionOutcome {
    pub record: RequirementsRecord,
    pub partial: bool,
    pub clarification_prompt: Option<String>,
}

impl ExtractionOutcome {
    /// Derives partial/clarification state from a (possibly merged) record.
    pub fn from_record(record: RequirementsRecord) -> Self {
        let partial = record.is_partial();
        let clarification_prompt = clarification_for(&record);
        Self { record, partial, clarification_prompt }
    }
}

/// Deterministic keyword extraction of migration requirements.
///
/// Scans user-authored turns oldest-first and merges per-turn records, so a
/// later mention of a field overwrites an earlier one (last-write-wins).
/// The extractor never mutates the transcript, and repeated calls against
/// an unchanged transcript return the same outcome.
#[derive(Clone, Debug, Default)]
pub struct RequirementsExtractor;

impl RequirementsExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, transcript: &Transcript) -> ExtractionOutcome {
        let mut record = RequirementsRecord::default();
        for turn in transcript.user_turns() {
            record.merge(extract_from_text(&turn.text));
        }

        ExtractionOutcome::from_record(record)
    }
}

/// One clarification question at a time, for the first missing field.
fn clarification_for(record: &RequirementsRecord) -> Option<String> {
    let missing = record.missing_fields();
    let first = missing.first()?;
    Some(format!(
        "To plan this migration I still need the {first}. Could you describe it? \
         (Remaining: {}.)",
        missing.join(", ")
    ))
}

fn extract_from_text(text: &str) -> RequirementsRecord {
    let normalized = text.to_ascii_lowercase();
    let tokens = tokenize(&normalized);

    let mut record = RequirementsRecord::default();
    record.workload_type = extract_workload(&normalized, &tokens);
    record.architecture_layers = extract_layers(&normalized);
    record.languages = extract_languages(&tokens);
    record.data_stores = extract_data_stores(&normalized, &tokens);
    record.deployment_model = extract_deployment_model(&normalized, &tokens);
    record
}

fn tokenize(normalized: &str) -> Vec<String> {
    let mut sanitized = String::with_capacity(normalized.len());
    for character in normalized.chars() {
        if character.is_ascii_alphanumeric() || matches!(character, '#' | '.' | '+') {
            sanitized.push(character);
        } else {
            sanitized.push(' ');
        }
    }
    sanitized.split_whitespace().map(|token| token.to_string()).collect()
}

fn extract_workload(normalized: &str, tokens: &[String]) -> Option<String> {
    // Longest phrase first so "web portal" wins over a later bare "portal".
    let phrases: [(&str, &str); 8] = [
        ("web portal", "web portal"),
        ("web application", "web portal"),
        ("website", "web portal"),
        ("data pipeline", "data pipeline"),
        ("machine learning", "machine learning"),
        ("mobile backend", "mobile backend"),
        ("portal", "web portal"),
        ("batch", "batch"),
    ];
    for (phrase, canonical) in phrases {
        if normalized.contains(phrase) {
            return Some(canonical.to_string());
        }
    }

    if tokens.iter().any(|token| token == "api" || token == "apis") {
        return Some("API".to_string());
    }
    if tokens.iter().any(|token| token == "hpc") {
        return Some("HPC".to_string());
    }
    None
}

fn extract_layers(normalized: &str) -> std::collections::BTreeSet<String> {
    let mut layers = std::collections::BTreeSet::new();

    if normalized.contains("3-tier")
        || normalized.contains("three-tier")
        || normalized.contains("three tier")
    {
        layers.insert("frontend".to_string());
        layers.insert("backend".to_string());
        layers.insert("data".to_string());
        return layers;
    }

    if normalized.contains("frontend")
        || normalized.contains("front-end")
        || normalized.contains("front end")
    {
        layers.insert("frontend".to_string());
    }
    if normalized.contains("backend")
        || normalized.contains("back-end")
        || normalized.contains("back end")
    {
        layers.insert("backend".to_string());
    }
    if normalized.contains("middleware") || normalized.contains("middle tier") {
        layers.insert("middleware".to_string());
    }
    if normalized.contains("data tier") || normalized.contains("data layer") {
        layers.insert("data".to_string());
    }
    layers
}

fn extract_languages(tokens: &[String]) -> std::collections::BTreeSet<String> {
    let table: [(&str, &str); 12] = [
        ("java", "Java"),
        ("python", "Python"),
        ("c#", ".NET"),
        (".net", ".NET"),
        ("dotnet", ".NET"),
        ("node", "Node.js"),
        ("nodejs", "Node.js"),
        ("node.js", "Node.js"),
        ("react", "React"),
        ("angular", "Angular"),
        ("spring", "Java"),
        ("django", "Python"),
    ];

    let mut languages = std::collections::BTreeSet::new();
    for token in tokens {
        for (keyword, canonical) in table {
            if token == keyword {
                languages.insert(canonical.to_string());
            }
        }
    }
    languages
}

fn extract_data_stores(
    normalized: &str,
    tokens: &[String],
) -> std::collections::BTreeSet<String> {
    let mut stores = std::collections::BTreeSet::new();

    if normalized.contains("blob storage") || tokens.iter().any(|token| token == "blob") {
        stores.insert("Blob Storage".to_string());
    }
    if normalized.contains("cosmos") {
        stores.insert("Cosmos DB".to_string());
    }

    let table: [(&str, &str); 6] = [
        ("postgres", "PostgreSQL"),
        ("postgresql", "PostgreSQL"),
        ("mysql", "MySQL"),
        ("mongodb", "MongoDB"),
        ("mongo", "MongoDB"),
        ("redis", "Redis"),
    ];
    for token in tokens {
        for (keyword, canonical) in table {
            if token == keyword {
                stores.insert(canonical.to_string());
            }
        }
    }

    // Bare "sql" only counts when no more specific engine already matched it.
    if tokens.iter().any(|token| token == "sql")
        && !stores.contains("PostgreSQL")
        && !stores.contains("MySQL")
    {
        stores.insert("SQL".to_string());
    }
    stores
}

fn extract_deployment_model(normalized: &str, tokens: &[String]) -> Option<DeploymentModel> {
    // The latest mention wins, matching the last-write-wins field policy.
    let phrases: [(&str, DeploymentModel); 8] = [
        ("virtual machines", DeploymentModel::Iaas),
        ("virtual machine", DeploymentModel::Iaas),
        ("app service", DeploymentModel::Paas),
        ("azure functions", DeploymentModel::Serverless),
        ("serverless", DeploymentModel::Serverless),
        ("kubernetes", DeploymentModel::Containers),
        ("docker", DeploymentModel::Containers),
        ("containers", DeploymentModel::Containers),
    ];
    let mut best: Option<(usize, DeploymentModel)> = None;
    for (phrase, model) in phrases {
        if let Some(position) = normalized.rfind(phrase) {
            if best.map(|(existing, _)| position > existing).unwrap_or(true) {
                best = Some((position, model));
            }
        }
    }

    let token_table: [(&str, DeploymentModel); 7] = [
        ("iaas", DeploymentModel::Iaas),
        ("paas", DeploymentModel::Paas),
        ("saas", DeploymentModel::Saas),
        ("vm", DeploymentModel::Iaas),
        ("vms", DeploymentModel::Iaas),
        ("aks", DeploymentModel::Containers),
        ("container", DeploymentModel::Containers),
    ];
    let mut offset = 0usize;
    for token in tokens {
        // Token positions are approximate byte offsets into the normalized
        // text, good enough to order mentions.
        if let Some(position) = normalized[offset..].find(token.as_str()) {
            let absolute = offset + position;
            for (keyword, model) in token_table {
                if token == keyword
                    && best.map(|(existing, _)| absolute > existing).unwrap_or(true)
                {
                    best = Some((absolute, model));
                }
            }
            offset = absolute + token.len();
        }
    }

    best.map(|(_, model)| model)
}

#[cfg(test)]
mod tests {
    use azimuth_core::requirements::DeploymentModel;
    use azimuth_core::transcript::{Speaker, Transcript, Turn};

    use super::RequirementsExtractor;

    fn transcript_of(user_messages: &[&str]) -> Transcript {
        let mut transcript = Transcript::new();
        for message in user_messages {
            transcript
                .append(Turn::new(Speaker::User, *message))
                .expect("fixture append should succeed");
        }
        transcript
    }

    #[test]
    fn extracts_the_reference_scenario() {
        let extractor = RequirementsExtractor::new();
        let outcome =
            extractor.extract(&transcript_of(&["I need a web portal with a SQL database on PaaS"]));

        assert_eq!(outcome.record.workload_type.as_deref(), Some("web portal"));
        assert!(outcome.record.data_stores.contains("SQL"));
        assert_eq!(outcome.record.deployment_model, Some(DeploymentModel::Paas));
        assert!(outcome.record.architecture_layers.is_empty());
        assert!(outcome.record.languages.is_empty());
        assert!(outcome.partial);
        assert!(outcome.clarification_prompt.is_some());
    }

    #[test]
    fn extraction_is_idempotent_for_unchanged_transcript() {
        let extractor = RequirementsExtractor::new();
        let transcript = transcript_of(&["Java backend on kubernetes with postgres"]);

        let first = extractor.extract(&transcript);
        let second = extractor.extract(&transcript);
        assert_eq!(first, second);
    }

    #[test]
    fn later_turns_overwrite_earlier_fields() {
        let extractor = RequirementsExtractor::new();
        let outcome = extractor.extract(&transcript_of(&[
            "We run a batch workload on virtual machines",
            "Actually it is a web portal and we want serverless",
        ]));

        assert_eq!(outcome.record.workload_type.as_deref(), Some("web portal"));
        assert_eq!(outcome.record.deployment_model, Some(DeploymentModel::Serverless));
    }

    #[test]
    fn non_user_turns_are_ignored() {
        let extractor = RequirementsExtractor::new();
        let mut transcript = transcript_of(&["python api"]);
        transcript
            .append(Turn::new(
                Speaker::PricingAdvisor,
                "Our Java-based kubernetes pricing table says...",
            ))
            .expect("advisor turn");

        let outcome = extractor.extract(&transcript);
        assert_eq!(outcome.record.workload_type.as_deref(), Some("API"));
        assert!(!outcome.record.languages.contains("Java"));
        assert!(outcome.record.deployment_model.is_none());
    }

    #[test]
    fn complete_description_yields_no_clarification() {
        let extractor = RequirementsExtractor::new();
        let outcome = extractor.extract(&transcript_of(&[
            "A three-tier web portal written in Java and React, \
             backed by PostgreSQL and redis, deployed on AKS containers",
        ]));

        assert!(!outcome.partial, "all five fields should be populated");
        assert!(outcome.clarification_prompt.is_none());
        assert_eq!(outcome.record.deployment_model, Some(DeploymentModel::Containers));
        assert!(outcome.record.architecture_layers.contains("frontend"));
        assert!(outcome.record.languages.contains("React"));
        assert!(outcome.record.data_stores.contains("PostgreSQL"));
    }

    #[test]
    fn handles_common_phrasings() {
        struct Case {
            text: &'static str,
            expect_workload: bool,
            expect_deployment: bool,
        }

        let cases = vec![
            Case { text: "lift and shift onto VMs", expect_workload: false, expect_deployment: true },
            Case { text: "a REST API in python", expect_workload: true, expect_deployment: false },
            Case {
                text: "HPC cluster on IaaS",
                expect_workload: true,
                expect_deployment: true,
            },
            Case {
                text: "e-commerce website with mysql",
                expect_workload: true,
                expect_deployment: false,
            },
            Case {
                text: "containerized services on docker",
                expect_workload: false,
                expect_deployment: true,
            },
            Case {
                text: "nightly batch jobs, blob storage",
                expect_workload: true,
                expect_deployment: false,
            },
            Case {
                text: "a SaaS offering for our customers",
                expect_workload: false,
                expect_deployment: true,
            },
            Case {
                text: "mobile backend with cosmos db",
                expect_workload: true,
                expect_deployment: false,
            },
            Case {
                text: "spring boot backend to app service",
                expect_workload: false,
                expect_deployment: true,
            },
            Case {
                text: "data pipeline on azure functions",
                expect_workload: true,
                expect_deployment: true,
            },
        ];

        let extractor = RequirementsExtractor::new();
        for (index, case) in cases.iter().enumerate() {
            let outcome = extractor.extract(&transcript_of(&[case.text]));
            if case.expect_workload {
                assert!(
                    outcome.record.workload_type.is_some(),
                    "case {index} expected a workload: {}",
                    case.text
                );
            }
            if case.expect_deployment {
                assert!(
                    outcome.record.deployment_model.is_some(),
                    "case {index} expected a deployment model: {}",
                    case.text
                );
            }
        }
    }

    #[test]
    fn specific_engine_beats_bare_sql() {
        let extractor = RequirementsExtractor::new();
        let outcome =
            extractor.extract(&transcript_of(&["postgres sql database behind the api"]));
        assert!(outcome.record.data_stores.contains("PostgreSQL"));
        assert!(!outcome.record.data_stores.contains("SQL"));
    }
}
