// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cloud API trait for the hosted memory service.

use async_trait::async_trait;

use crate::error::MnemoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ApiHost;

/// Request/response access to the hosted memory service.
#[async_trait]
pub trait CloudApi: PluginAdapter {
    /// POSTs `body` to `route` and returns the HTTP status.
    ///
    /// Non-2xx statuses are returned, not raised, so retry policies can
    /// classify them. Only transport failures produce an error.
    async fn post(
        &self,
        host: ApiHost,
        route: &str,
        body: &serde_json::Value,
    ) -> Result<u16, MnemoError>;

    /// POSTs `body` to `route` and returns the decoded JSON response.
    ///
    /// Non-2xx statuses are mapped through [`MnemoError::from_status`].
    async fn post_json(
        &self,
        host: ApiHost,
        route: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, MnemoError>;
}
