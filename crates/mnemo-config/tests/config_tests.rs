// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Mnemo configuration system.

use mnemo_config::diagnostic::ConfigError;
use mnemo_config::model::MnemoConfig;
use mnemo_config::{load_and_validate_str, load_config_from_path, load_config_from_str};
use serial_test::serial;

/// Valid TOML with all known sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_mnemo_config() {
    let toml = r#"
[memory]
cloud = true
entity_id = "user-42"
process_id = "support-bot"
session_id = "fixed-session"
session_timeout_minutes = 10

[request]
num_backoff = 3
backoff_factor = 0.5
secs_timeout = 2

[recall]
facts_limit = 8
relevance_threshold = 0.25
cloud_relevance_threshold = 0.6
embeddings_limit = 200

[augmentation]
max_workers = 4
background = false

[cloud]
api_key = "mk-123"
base_url = "https://example.test/v1"
collector_url = "https://collector.example.test/v1"

[storage]
database_path = "/tmp/mnemo.db"
wal_mode = false

[llm]
provider = "openai"
provider_sdk_version = "1.40.0"
version = "gpt-4o-mini"

[framework]
provider = "agno"

[platform]
provider = "local"

[logging]
truncate_content = false
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert!(config.memory.cloud);
    assert_eq!(config.memory.entity_id.as_deref(), Some("user-42"));
    assert_eq!(config.memory.process_id.as_deref(), Some("support-bot"));
    assert_eq!(config.memory.session_id.as_deref(), Some("fixed-session"));
    assert_eq!(config.memory.session_timeout_minutes, 10);
    assert_eq!(config.request.num_backoff, 3);
    assert_eq!(config.request.backoff_factor, 0.5);
    assert_eq!(config.request.secs_timeout, 2);
    assert_eq!(config.recall.facts_limit, 8);
    assert_eq!(config.recall.relevance_threshold, 0.25);
    assert_eq!(config.recall.cloud_relevance_threshold, 0.6);
    assert_eq!(config.recall.embeddings_limit, 200);
    assert_eq!(config.augmentation.max_workers, 4);
    assert!(!config.augmentation.background);
    assert_eq!(config.cloud.api_key.as_deref(), Some("mk-123"));
    assert_eq!(config.cloud.collector_url(), "https://collector.example.test/v1");
    assert_eq!(config.storage.database_path, "/tmp/mnemo.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.llm.provider.as_deref(), Some("openai"));
    assert_eq!(config.framework.provider.as_deref(), Some("agno"));
    assert_eq!(config.platform.provider.as_deref(), Some("local"));
    assert!(!config.logging.truncate_content);
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert!(!config.memory.cloud);
    assert!(config.memory.entity_id.is_none());
    assert!(config.memory.session_id.is_none());
    assert_eq!(config.memory.session_timeout_minutes, 30);
    assert_eq!(config.request.num_backoff, 5);
    assert_eq!(config.request.backoff_factor, 1.0);
    assert_eq!(config.request.secs_timeout, 5);
    assert_eq!(config.recall.facts_limit, 5);
    assert_eq!(config.recall.relevance_threshold, 0.1);
    assert_eq!(config.recall.cloud_relevance_threshold, 0.1);
    assert_eq!(config.recall.embeddings_limit, 1000);
    assert_eq!(config.augmentation.max_workers, 15);
    assert!(config.augmentation.background);
    assert!(config.cloud.api_key.is_none());
    assert_eq!(config.cloud.collector_url(), config.cloud.base_url);
    assert!(config.storage.wal_mode);
    assert_eq!(config.embeddings.model, "all-MiniLM-L6-v2");
    assert!(config.logging.truncate_content);
}

/// Unknown field in [recall] produces an error mentioning the bad key.
#[test]
fn unknown_field_in_recall_produces_error() {
    let toml = r#"
[recall]
fact_limit = 3
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("fact_limit"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Unknown keys surface as UnknownKey diagnostics with a suggestion.
#[test]
fn unknown_key_diagnostic_suggests_correction() {
    let toml = r#"
[request]
num_bakoff = 3
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "num_bakoff");
            assert_eq!(suggestion.as_deref(), Some("num_backoff"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

/// Wrong value types surface as InvalidType diagnostics.
#[test]
fn wrong_type_produces_invalid_type() {
    let toml = r#"
[recall]
facts_limit = "five"
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("facts_limit")))
    );
}

/// Cloud mode requires an API key at validation time.
#[test]
fn cloud_mode_requires_api_key() {
    let toml = r#"
[memory]
cloud = true
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("cloud.api_key"))
    ));
}

/// Dotted overrides (as produced by the env mapping) win over TOML.
#[test]
fn dotted_override_wins_over_toml() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let toml_content = r#"
[recall]
cloud_relevance_threshold = 0.2
"#;

    let config: MnemoConfig = Figment::new()
        .merge(Serialized::defaults(MnemoConfig::default()))
        .merge(Toml::string(toml_content))
        .merge(("recall.cloud_relevance_threshold", 0.7))
        .extract()
        .expect("should merge override");

    assert_eq!(config.recall.cloud_relevance_threshold, 0.7);
}

/// Diagnostics render through miette without panicking.
#[test]
fn diagnostics_render_to_string() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let errors = load_and_validate_str("[memory]\nclod = true\n").expect_err("should fail");
    let handler = GraphicalReportHandler::new();
    let mut buf = String::new();
    let diagnostic: &dyn Diagnostic = &errors[0];
    handler
        .render_report(&mut buf, diagnostic)
        .expect("render should succeed");
    assert!(buf.contains("clod"));
}

/// The default config serializes to JSON with every section present.
#[test]
fn default_config_serializes_all_sections() {
    let json = serde_json::to_value(MnemoConfig::default()).expect("serialize");
    for section in [
        "memory",
        "request",
        "recall",
        "augmentation",
        "cloud",
        "storage",
        "llm",
        "framework",
        "platform",
        "embeddings",
        "logging",
    ] {
        assert!(json.get(section).is_some(), "missing section {section}");
    }
}

/// `MNEMO_*` variables override values from a config file.
#[test]
#[serial]
fn env_vars_override_file_values() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("mnemo.toml");
    std::fs::write(&path, "[recall]\nembeddings_limit = 10\nfacts_limit = 3\n").expect("write");

    // SAFETY: env-touching tests run serially.
    unsafe { std::env::set_var("MNEMO_RECALL_EMBEDDINGS_LIMIT", "250") };
    let loaded = load_config_from_path(&path);
    unsafe { std::env::remove_var("MNEMO_RECALL_EMBEDDINGS_LIMIT") };

    let config = loaded.expect("should load");
    assert_eq!(config.recall.embeddings_limit, 250);
    assert_eq!(config.recall.facts_limit, 3);
}

/// `MNEMO_API_KEY` is shorthand for `cloud.api_key`.
#[test]
#[serial]
fn api_key_shorthand_maps_to_cloud_section() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("mnemo.toml");
    std::fs::write(&path, "[memory]\ncloud = true\n").expect("write");

    // SAFETY: env-touching tests run serially.
    unsafe { std::env::set_var("MNEMO_API_KEY", "mk-from-env") };
    let loaded = load_config_from_path(&path);
    unsafe { std::env::remove_var("MNEMO_API_KEY") };

    let config = loaded.expect("should load");
    assert!(config.memory.cloud);
    assert_eq!(config.cloud.api_key.as_deref(), Some("mk-from-env"));
}
