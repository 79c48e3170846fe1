// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express: retry bounds, finite
//! thresholds, and cloud credentials when cloud mode is on.

use crate::diagnostic::ConfigError;
use crate::model::MnemoConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns all collected validation errors (does not fail fast).
pub fn validate_config(config: &MnemoConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.request.num_backoff < 1 {
        errors.push(ConfigError::validation(
            "request.num_backoff must be at least 1",
        ));
    }

    let factor = config.request.backoff_factor;
    if !factor.is_finite() || factor < 0.0 {
        errors.push(ConfigError::validation(format!(
            "request.backoff_factor must be a non-negative number, got {factor}"
        )));
    }

    if config.request.secs_timeout < 1 {
        errors.push(ConfigError::validation(
            "request.secs_timeout must be at least 1",
        ));
    }

    for (key, value) in [
        ("recall.relevance_threshold", config.recall.relevance_threshold),
        (
            "recall.cloud_relevance_threshold",
            config.recall.cloud_relevance_threshold,
        ),
    ] {
        if !value.is_finite() {
            errors.push(ConfigError::validation(format!(
                "{key} must be a finite number, got {value}"
            )));
        }
    }

    if config.recall.facts_limit < 1 {
        errors.push(ConfigError::validation(
            "recall.facts_limit must be at least 1",
        ));
    }

    if config.augmentation.max_workers < 1 {
        errors.push(ConfigError::validation(
            "augmentation.max_workers must be at least 1",
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    if config.memory.cloud {
        if config
            .cloud
            .api_key
            .as_deref()
            .is_none_or(|k| k.trim().is_empty())
        {
            errors.push(ConfigError::validation(
                "cloud.api_key is required when memory.cloud = true (or set MNEMO_API_KEY)",
            ));
        }
        if config.cloud.base_url.trim().is_empty() {
            errors.push(ConfigError::validation(
                "cloud.base_url must not be empty when memory.cloud = true",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
