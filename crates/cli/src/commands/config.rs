use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use azimuth_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, env_key, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "llm.enabled",
        &config.llm.enabled.to_string(),
        source("llm.enabled", "AZIMUTH_LLM_ENABLED"),
    ));
    lines.push(render_line(
        "llm.endpoint",
        config.llm.endpoint.as_deref().unwrap_or("<unset>"),
        source("llm.endpoint", "AZIMUTH_LLM_ENDPOINT"),
    ));
    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line(
        "llm.api_key",
        llm_api_key,
        source("llm.api_key", "AZIMUTH_LLM_API_KEY"),
    ));
    lines.push(render_line("llm.model", &config.llm.model, source("llm.model", "AZIMUTH_LLM_MODEL")));
    lines.push(render_line(
        "llm.api_version",
        &config.llm.api_version,
        source("llm.api_version", "AZIMUTH_LLM_API_VERSION"),
    ));
    lines.push(render_line(
        "llm.timeout_secs",
        &config.llm.timeout_secs.to_string(),
        source("llm.timeout_secs", "AZIMUTH_LLM_TIMEOUT_SECS"),
    ));

    lines.push(render_line(
        "pricing.base_url",
        &config.pricing.base_url,
        source("pricing.base_url", "AZIMUTH_PRICING_BASE_URL"),
    ));
    lines.push(render_line(
        "pricing.timeout_secs",
        &config.pricing.timeout_secs.to_string(),
        source("pricing.timeout_secs", "AZIMUTH_PRICING_TIMEOUT_SECS"),
    ));
    lines.push(render_line(
        "pricing.max_pages",
        &config.pricing.max_pages.to_string(),
        source("pricing.max_pages", "AZIMUTH_PRICING_MAX_PAGES"),
    ));

    lines.push(render_line(
        "session.max_turns",
        &config.session.max_turns.to_string(),
        source("session.max_turns", "AZIMUTH_SESSION_MAX_TURNS"),
    ));
    lines.push(render_line(
        "session.transcript_capacity",
        &config.session.transcript_capacity.to_string(),
        source("session.transcript_capacity", "AZIMUTH_SESSION_TRANSCRIPT_CAPACITY"),
    ));
    lines.push(render_line(
        "session.termination_phrase",
        &config.session.termination_phrase,
        source("session.termination_phrase", "AZIMUTH_SESSION_TERMINATION_PHRASE"),
    ));
    lines.push(render_line(
        "session.log_dir",
        &config.session.log_dir.display().to_string(),
        source("session.log_dir", "AZIMUTH_SESSION_LOG_DIR"),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", "AZIMUTH_LOGGING_LEVEL"),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", "AZIMUTH_LOGGING_FORMAT"),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("azimuth.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/azimuth.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
