// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./mnemo.toml` > `~/.config/mnemo/mnemo.toml` > `/etc/mnemo/mnemo.toml`
//! with environment variable overrides via `MNEMO_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::MnemoConfig;

/// Top-level sections addressable from environment variables.
const ENV_SECTIONS: &[&str] = &[
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
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/mnemo/mnemo.toml` (system-wide)
/// 3. `~/.config/mnemo/mnemo.toml` (user XDG config)
/// 4. `./mnemo.toml` (local directory)
/// 5. `MNEMO_*` environment variables
pub fn load_config() -> Result<MnemoConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<MnemoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MnemoConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MnemoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MnemoConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(MnemoConfig::default()))
        .merge(Toml::file("/etc/mnemo/mnemo.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("mnemo/mnemo.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("mnemo.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because keys contain
/// underscores: `MNEMO_RECALL_CLOUD_RELEVANCE_THRESHOLD` must map to
/// `recall.cloud_relevance_threshold`.
fn env_provider() -> Env {
    Env::prefixed("MNEMO_").map(|key| env_key_to_path(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env var name to a dotted config path.
///
/// Only the leading section name is split off. `api_key` alone is accepted as
/// shorthand for `cloud.api_key`.
pub fn env_key_to_path(key: &str) -> String {
    if key == "api_key" {
        return "cloud.api_key".to_string();
    }
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(
            env_key_to_path("recall_cloud_relevance_threshold"),
            "recall.cloud_relevance_threshold"
        );
        assert_eq!(
            env_key_to_path("memory_session_timeout_minutes"),
            "memory.session_timeout_minutes"
        );
        assert_eq!(env_key_to_path("cloud_collector_url"), "cloud.collector_url");
        assert_eq!(env_key_to_path("api_key"), "cloud.api_key");
    }

    #[test]
    fn unknown_env_keys_pass_through() {
        assert_eq!(env_key_to_path("something"), "something");
    }
}
