use std::env;
use std::fs;
use std::sync::{Mutex, OnceLock};

use azimuth_cli::commands::{chat, config, doctor, prices};
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn doctor_passes_with_default_config() {
    let log_dir = TempDir::new().expect("temp log dir");
    with_env(&[("AZIMUTH_SESSION_LOG_DIR", log_dir.path().to_str().expect("utf8 path"))], || {
        let output = doctor::run(true);
        let payload = parse_payload(&output);

        assert_eq!(payload["overall_status"], "pass");
        let checks = payload["checks"].as_array().expect("checks array");
        assert!(checks
            .iter()
            .any(|check| check["name"] == "session_log_directory" && check["status"] == "pass"));
    });
}

#[test]
fn doctor_reports_config_failure_when_inference_lacks_credentials() {
    with_env(&[("AZIMUTH_LLM_ENABLED", "true")], || {
        let output = doctor::run(true);
        let payload = parse_payload(&output);

        assert_eq!(payload["overall_status"], "fail");
        let checks = payload["checks"].as_array().expect("checks array");
        assert!(checks
            .iter()
            .any(|check| check["name"] == "config_validation" && check["status"] == "fail"));
        assert!(checks
            .iter()
            .any(|check| check["name"] == "inference_readiness" && check["status"] == "skipped"));
    });
}

#[test]
fn config_redacts_the_api_key_and_attributes_env_sources() {
    with_env(
        &[
            ("AZIMUTH_LLM_ENABLED", "true"),
            ("AZIMUTH_LLM_ENDPOINT", "https://example.openai.azure.com"),
            ("AZIMUTH_LLM_API_KEY", "super-secret-value"),
            ("AZIMUTH_SESSION_MAX_TURNS", "9"),
        ],
        || {
            let output = config::run();

            assert!(!output.contains("super-secret-value"), "api key must never be printed");
            assert!(output.contains("- llm.api_key = <redacted> (source: env (AZIMUTH_LLM_API_KEY))"));
            assert!(output
                .contains("- session.max_turns = 9 (source: env (AZIMUTH_SESSION_MAX_TURNS))"));
            assert!(output.contains("- pricing.base_url = https://prices.azure.com/api/retail/prices (source: default)"));
        },
    );
}

#[test]
fn prices_rejects_an_empty_service_name_before_any_request() {
    with_env(&[], || {
        let result = prices::run("   ".to_string(), None, "USD".to_string(), false);
        assert_eq!(result.exit_code, 2, "expected invalid request exit code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "prices");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "invalid_request");
    });
}

#[test]
fn chat_with_an_immediate_termination_writes_the_session_log() {
    let log_dir = TempDir::new().expect("temp log dir");
    with_env(&[("AZIMUTH_SESSION_LOG_DIR", log_dir.path().to_str().expect("utf8 path"))], || {
        let result = chat::run(Some("done".to_string()));
        assert_eq!(result.exit_code, 0, "immediate termination should succeed: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "chat");
        assert_eq!(payload["status"], "ok");
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("user-ended"));

        let log_file = fs::read_dir(log_dir.path())
            .expect("log dir readable")
            .filter_map(Result::ok)
            .find(|entry| entry.file_name().to_string_lossy().ends_with(".jsonl"))
            .expect("a session log file should exist");
        let contents = fs::read_to_string(log_file.path()).expect("log file readable");
        let lines = contents.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2, "user turn plus final summary: {contents}");

        let first: Value = serde_json::from_str(lines[0]).expect("log line decodes");
        assert_eq!(first["speaker"], "user");
        assert_eq!(first["text"], "done");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "AZIMUTH_LLM_ENABLED",
        "AZIMUTH_LLM_ENDPOINT",
        "AZIMUTH_LLM_API_KEY",
        "AZIMUTH_LLM_MODEL",
        "AZIMUTH_LLM_API_VERSION",
        "AZIMUTH_LLM_TIMEOUT_SECS",
        "AZIMUTH_PRICING_BASE_URL",
        "AZIMUTH_PRICING_TIMEOUT_SECS",
        "AZIMUTH_PRICING_MAX_PAGES",
        "AZIMUTH_SESSION_MAX_TURNS",
        "AZIMUTH_SESSION_TRANSCRIPT_CAPACITY",
        "AZIMUTH_SESSION_TERMINATION_PHRASE",
        "AZIMUTH_SESSION_LOG_DIR",
        "AZIMUTH_LOGGING_LEVEL",
        "AZIMUTH_LOGGING_FORMAT",
        "AZIMUTH_LOG_LEVEL",
        "AZIMUTH_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
