use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub pricing: PricingConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Azure OpenAI inference settings. The model client is optional: with
/// `enabled = false` the advisor phrases every reply from deterministic
/// templates and never performs an inference call.
#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub api_version: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct PricingConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_pages: u32,
}

/// Session policy knobs.
///
/// `termination_phrase` ends the session when it appears as a standalone
/// word in a user turn (case-insensitive); the whole-message aliases
/// `quit`/`exit`/`done` terminate as well. `max_turns` caps the transcript
/// length before the session terminates with a turn-limit outcome.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub max_turns: u32,
    pub transcript_capacity: usize,
    pub termination_phrase: String,
    pub log_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub llm_enabled: Option<bool>,
    pub llm_endpoint: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_model: Option<String>,
    pub pricing_base_url: Option<String>,
    pub session_max_turns: Option<u32>,
    pub session_log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                enabled: false,
                endpoint: None,
                api_key: None,
                model: "gpt-35-turbo".to_string(),
                api_version: "2025-01-01-preview".to_string(),
                timeout_secs: 30,
            },
            pricing: PricingConfig {
                base_url: "https://prices.azure.com/api/retail/prices".to_string(),
                timeout_secs: 30,
                max_pages: 10,
            },
            session: SessionConfig {
                max_turns: 25,
                transcript_capacity: 512,
                termination_phrase: "TERMINATE".to_string(),
                log_dir: PathBuf::from("sessions"),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("azimuth.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(enabled) = llm.enabled {
                self.llm.enabled = enabled;
            }
            if let Some(endpoint) = llm.endpoint {
                self.llm.endpoint = Some(endpoint);
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(api_version) = llm.api_version {
                self.llm.api_version = api_version;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(pricing) = patch.pricing {
            if let Some(base_url) = pricing.base_url {
                self.pricing.base_url = base_url;
            }
            if let Some(timeout_secs) = pricing.timeout_secs {
                self.pricing.timeout_secs = timeout_secs;
            }
            if let Some(max_pages) = pricing.max_pages {
                self.pricing.max_pages = max_pages;
            }
        }

        if let Some(session) = patch.session {
            if let Some(max_turns) = session.max_turns {
                self.session.max_turns = max_turns;
            }
            if let Some(transcript_capacity) = session.transcript_capacity {
                self.session.transcript_capacity = transcript_capacity;
            }
            if let Some(termination_phrase) = session.termination_phrase {
                self.session.termination_phrase = termination_phrase;
            }
            if let Some(log_dir) = session.log_dir {
                self.session.log_dir = PathBuf::from(log_dir);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("AZIMUTH_LLM_ENABLED") {
            self.llm.enabled = parse_bool("AZIMUTH_LLM_ENABLED", &value)?;
        }
        if let Some(value) = read_env("AZIMUTH_LLM_ENDPOINT") {
            self.llm.endpoint = Some(value);
        }
        if let Some(value) = read_env("AZIMUTH_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("AZIMUTH_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("AZIMUTH_LLM_API_VERSION") {
            self.llm.api_version = value;
        }
        if let Some(value) = read_env("AZIMUTH_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("AZIMUTH_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("AZIMUTH_PRICING_BASE_URL") {
            self.pricing.base_url = value;
        }
        if let Some(value) = read_env("AZIMUTH_PRICING_TIMEOUT_SECS") {
            self.pricing.timeout_secs = parse_u64("AZIMUTH_PRICING_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("AZIMUTH_PRICING_MAX_PAGES") {
            self.pricing.max_pages = parse_u32("AZIMUTH_PRICING_MAX_PAGES", &value)?;
        }

        if let Some(value) = read_env("AZIMUTH_SESSION_MAX_TURNS") {
            self.session.max_turns = parse_u32("AZIMUTH_SESSION_MAX_TURNS", &value)?;
        }
        if let Some(value) = read_env("AZIMUTH_SESSION_TRANSCRIPT_CAPACITY") {
            self.session.transcript_capacity =
                parse_u64("AZIMUTH_SESSION_TRANSCRIPT_CAPACITY", &value)? as usize;
        }
        if let Some(value) = read_env("AZIMUTH_SESSION_TERMINATION_PHRASE") {
            self.session.termination_phrase = value;
        }
        if let Some(value) = read_env("AZIMUTH_SESSION_LOG_DIR") {
            self.session.log_dir = PathBuf::from(value);
        }

        let log_level =
            read_env("AZIMUTH_LOGGING_LEVEL").or_else(|| read_env("AZIMUTH_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("AZIMUTH_LOGGING_FORMAT").or_else(|| read_env("AZIMUTH_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(llm_enabled) = overrides.llm_enabled {
            self.llm.enabled = llm_enabled;
        }
        if let Some(llm_endpoint) = overrides.llm_endpoint {
            self.llm.endpoint = Some(llm_endpoint);
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(pricing_base_url) = overrides.pricing_base_url {
            self.pricing.base_url = pricing_base_url;
        }
        if let Some(session_max_turns) = overrides.session_max_turns {
            self.session.max_turns = session_max_turns;
        }
        if let Some(session_log_dir) = overrides.session_log_dir {
            self.session.log_dir = session_log_dir;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_pricing(&self.pricing)?;
        validate_session(&self.session)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("azimuth.toml"), PathBuf::from("config/azimuth.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !llm.enabled {
        return Ok(());
    }

    let endpoint = llm.endpoint.as_deref().unwrap_or("").trim();
    if endpoint.is_empty() {
        return Err(ConfigError::Validation(
            "llm.endpoint is required when llm.enabled is true. Use your Azure OpenAI resource URL"
                .to_string(),
        ));
    }
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.endpoint must start with http:// or https://".to_string(),
        ));
    }

    let key_missing = llm
        .api_key
        .as_ref()
        .map(|value| value.expose_secret().trim().is_empty())
        .unwrap_or(true);
    if key_missing {
        return Err(ConfigError::Validation(
            "llm.api_key is required when llm.enabled is true".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }
    if llm.api_version.trim().is_empty() {
        return Err(ConfigError::Validation("llm.api_version must not be empty".to_string()));
    }

    Ok(())
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    let base_url = pricing.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "pricing.base_url must start with http:// or https://".to_string(),
        ));
    }

    if pricing.timeout_secs == 0 || pricing.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "pricing.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if pricing.max_pages == 0 {
        return Err(ConfigError::Validation(
            "pricing.max_pages must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_session(session: &SessionConfig) -> Result<(), ConfigError> {
    if session.max_turns == 0 {
        return Err(ConfigError::Validation(
            "session.max_turns must be greater than zero".to_string(),
        ));
    }

    if session.transcript_capacity < 2 {
        return Err(ConfigError::Validation(
            "session.transcript_capacity must be at least 2".to_string(),
        ));
    }

    if session.termination_phrase.trim().is_empty() {
        return Err(ConfigError::Validation(
            "session.termination_phrase must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    pricing: Option<PricingPatch>,
    session: Option<SessionPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    enabled: Option<bool>,
    endpoint: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    api_version: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    max_pages: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    max_turns: Option<u32>,
    transcript_capacity: Option<usize>,
    termination_phrase: Option<String>,
    log_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
