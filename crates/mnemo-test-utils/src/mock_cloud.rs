// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted cloud API for retry and payload tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use mnemo_core::types::{AdapterType, ApiHost, HealthStatus};
use mnemo_core::{CloudApi, MnemoError, PluginAdapter};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Answer with this HTTP status and no body.
    Status(u16),
    /// Answer 200 with this JSON body.
    Json(Value),
    /// Fail with a transport error carrying this message.
    TransportError(String),
}

/// A recorded call.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudCall {
    pub host: ApiHost,
    pub route: String,
    pub body: Value,
}

/// Cloud API double that pops replies from a FIFO queue and records calls.
///
/// When the queue is empty every call answers `Status(201)` / `Json(null)`.
#[derive(Clone, Default)]
pub struct MockCloudApi {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    calls: Arc<Mutex<Vec<CloudCall>>>,
}

impl MockCloudApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            calls: Arc::default(),
        }
    }

    /// Replies that answer with each status in turn.
    pub fn with_statuses(statuses: &[u16]) -> Self {
        Self::with_replies(statuses.iter().copied().map(MockReply::Status).collect())
    }

    pub async fn push(&self, reply: MockReply) {
        self.replies.lock().await.push_back(reply);
    }

    pub async fn calls(&self) -> Vec<CloudCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    async fn next(&self, host: ApiHost, route: &str, body: &Value) -> Option<MockReply> {
        self.calls.lock().await.push(CloudCall {
            host,
            route: route.to_string(),
            body: body.clone(),
        });
        self.replies.lock().await.pop_front()
    }
}

fn transport(message: String) -> MnemoError {
    MnemoError::Transport {
        message,
        source: None,
    }
}

#[async_trait]
impl PluginAdapter for MockCloudApi {
    fn name(&self) -> &str {
        "mock-cloud"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Cloud
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl CloudApi for MockCloudApi {
    async fn post(&self, host: ApiHost, route: &str, body: &Value) -> Result<u16, MnemoError> {
        match self.next(host, route, body).await {
            None => Ok(201),
            Some(MockReply::Status(status)) => Ok(status),
            Some(MockReply::Json(_)) => Ok(200),
            Some(MockReply::TransportError(message)) => Err(transport(message)),
        }
    }

    async fn post_json(
        &self,
        host: ApiHost,
        route: &str,
        body: &Value,
    ) -> Result<Value, MnemoError> {
        match self.next(host, route, body).await {
            None => Ok(Value::Null),
            Some(MockReply::Json(value)) => Ok(value),
            Some(MockReply::Status(status)) if (200..300).contains(&status) => Ok(Value::Null),
            Some(MockReply::Status(status)) => Err(MnemoError::from_status(status, None, None)),
            Some(MockReply::TransportError(message)) => Err(transport(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn replies_are_consumed_in_order() {
        let cloud = MockCloudApi::with_replies(vec![
            MockReply::Status(500),
            MockReply::TransportError("boom".into()),
        ]);
        let body = json!({});
        assert_eq!(cloud.post(ApiHost::Api, "r", &body).await.unwrap(), 500);
        assert!(cloud.post(ApiHost::Api, "r", &body).await.is_err());
        assert_eq!(cloud.post(ApiHost::Api, "r", &body).await.unwrap(), 201);
        assert_eq!(cloud.call_count().await, 3);
    }

    #[tokio::test]
    async fn post_json_maps_error_statuses() {
        let cloud = MockCloudApi::with_statuses(&[422]);
        let err = cloud
            .post_json(ApiHost::Api, "r", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, MnemoError::ApiValidation { .. }));
    }
}
