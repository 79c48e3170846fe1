// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the hosted memory API.
//!
//! [`CloudClient`] handles authentication headers, per-request timeouts and
//! mapping of error responses. Retry policy lives with the callers, which
//! classify the raw statuses returned by [`CloudApi::post`].

use std::time::Duration;

use async_trait::async_trait;
use mnemo_config::model::{CloudConfig, RequestConfig};
use mnemo_core::types::ApiHost;
use mnemo_core::{AdapterType, CloudApi, HealthStatus, MnemoError, PluginAdapter};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::debug;

/// Environment variable named in missing key errors.
pub const API_KEY_ENV_VAR: &str = "MNEMO_API_KEY";

/// HTTP client for the hosted memory API.
#[derive(Debug, Clone)]
pub struct CloudClient {
    client: reqwest::Client,
    api_url: String,
    collector_url: String,
    timeout: Duration,
}

impl CloudClient {
    /// Creates a client from the `[cloud]` and `[request]` config sections.
    ///
    /// Fails with [`MnemoError::MissingApiKey`] when no API key is configured.
    pub fn new(cloud: &CloudConfig, request: &RequestConfig) -> Result<Self, MnemoError> {
        let api_key = cloud
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| MnemoError::MissingApiKey {
                env_var: API_KEY_ENV_VAR.to_string(),
            })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| MnemoError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let timeout = Duration::from_secs(request.secs_timeout);
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("mnemo-rust/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| MnemoError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            api_url: cloud.base_url.trim_end_matches('/').to_string(),
            collector_url: cloud.collector_url().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn url(&self, host: ApiHost, route: &str) -> String {
        let base = match host {
            ApiHost::Api => &self.api_url,
            ApiHost::Collector => &self.collector_url,
        };
        format!("{base}/{}", route.trim_start_matches('/'))
    }

    async fn send(
        &self,
        host: ApiHost,
        route: &str,
        body: &Value,
    ) -> Result<reqwest::Response, MnemoError> {
        let url = self.url(host, route);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        debug!(route, status = response.status().as_u16(), "cloud response received");
        Ok(response)
    }

    fn transport_error(&self, e: reqwest::Error) -> MnemoError {
        if e.is_timeout() {
            MnemoError::Timeout {
                duration: self.timeout,
            }
        } else {
            MnemoError::Transport {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            }
        }
    }
}

/// Pull a human readable message out of an error body.
fn error_message(body: &Value) -> Option<String> {
    ["message", "detail", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

#[async_trait]
impl PluginAdapter for CloudClient {
    fn name(&self) -> &str {
        "cloud"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Cloud
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        match self.client.get(&self.api_url).send().await {
            Ok(response) if response.status().is_server_error() => Ok(HealthStatus::Degraded(
                format!("API returned {}", response.status()),
            )),
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }
}

#[async_trait]
impl CloudApi for CloudClient {
    async fn post(&self, host: ApiHost, route: &str, body: &Value) -> Result<u16, MnemoError> {
        let response = self.send(host, route, body).await?;
        Ok(response.status().as_u16())
    }

    async fn post_json(
        &self,
        host: ApiHost,
        route: &str,
        body: &Value,
    ) -> Result<Value, MnemoError> {
        let response = self.send(host, route, body).await?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        let parsed = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str::<Value>(&text) {
                Ok(value) => value,
                Err(e) if status.is_success() => {
                    return Err(MnemoError::Api {
                        message: format!("failed to parse cloud API response: {e}"),
                    });
                }
                Err(_) => Value::String(text),
            }
        };

        if status.is_success() {
            return Ok(parsed);
        }

        let message = error_message(&parsed);
        let details = (!parsed.is_null()).then_some(parsed);
        Err(MnemoError::from_status(status.as_u16(), message, details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> CloudClient {
        let cloud = CloudConfig {
            api_key: Some("test-api-key".into()),
            base_url: format!("{base_url}/v1/"),
            collector_url: Some(format!("{base_url}/collector")),
        };
        CloudClient::new(&cloud, &RequestConfig::default()).unwrap()
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let cloud = CloudConfig::default();
        let err = CloudClient::new(&cloud, &RequestConfig::default()).unwrap_err();
        assert!(matches!(err, MnemoError::MissingApiKey { ref env_var } if env_var == API_KEY_ENV_VAR));
    }

    #[tokio::test]
    async fn post_returns_raw_status_and_sends_headers() {
        let server = MockServer::start().await;
        let body = json!({"session": {"id": "s"}});

        Mock::given(method("POST"))
            .and(path("/v1/cloud/conversation/messages"))
            .and(header("x-api-key", "test-api-key"))
            .and(header("content-type", "application/json"))
            .and(body_json(&body))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let status = client
            .post(ApiHost::Api, "cloud/conversation/messages", &body)
            .await
            .unwrap();
        assert_eq!(status, 201);
    }

    #[tokio::test]
    async fn post_does_not_raise_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let status = client
            .post(ApiHost::Api, "cloud/conversation/messages", &json!({}))
            .await
            .unwrap();
        assert_eq!(status, 500);
    }

    #[tokio::test]
    async fn collector_host_is_used_for_augmentation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collector/cloud/augmentation"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let status = client
            .post(ApiHost::Collector, "cloud/augmentation", &json!({}))
            .await
            .unwrap();
        assert_eq!(status, 202);
    }

    #[tokio::test]
    async fn post_json_decodes_success_body() {
        let server = MockServer::start().await;
        let response = json!({"facts": [{"content": "likes tea"}], "messages": []});
        Mock::given(method("POST"))
            .and(path("/v1/cloud/recall"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let value = client
            .post_json(ApiHost::Api, "cloud/recall", &json!({"query": "tea"}))
            .await
            .unwrap();
        assert_eq!(value, response);
    }

    #[tokio::test]
    async fn post_json_maps_quota_and_validation_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/quota"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/invalid"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(json!({"message": "query is required", "field": "query"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/rejected"))
            .respond_with(ResponseTemplate::new(433))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());

        let err = client
            .post_json(ApiHost::Api, "quota", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, MnemoError::QuotaExceeded { .. }));

        let err = client
            .post_json(ApiHost::Api, "invalid", &json!({}))
            .await
            .unwrap_err();
        match err {
            MnemoError::ApiValidation {
                status,
                message,
                details,
            } => {
                assert_eq!(status, 422);
                assert_eq!(message, "query is required");
                assert_eq!(details.unwrap()["field"], "query");
            }
            other => panic!("expected ApiValidation, got {other:?}"),
        }

        let err = client
            .post_json(ApiHost::Api, "rejected", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, MnemoError::ApiRequestRejected { status: 433, .. }));
    }

    #[tokio::test]
    async fn post_json_generic_client_error_names_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .post_json(ApiHost::Api, "cloud/recall", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let cloud = CloudConfig {
            api_key: Some("k".into()),
            base_url: server.uri(),
            collector_url: None,
        };
        let request = RequestConfig {
            secs_timeout: 1,
            ..RequestConfig::default()
        };
        let client = CloudClient::new(&cloud, &request).unwrap();
        let err = client.post(ApiHost::Api, "x", &json!({})).await.unwrap_err();
        assert!(matches!(err, MnemoError::Timeout { .. }));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let cloud = CloudConfig {
            api_key: Some("k".into()),
            base_url: "http://127.0.0.1:9".into(),
            collector_url: None,
        };
        let client = CloudClient::new(&cloud, &RequestConfig::default()).unwrap();
        let err = client.post(ApiHost::Api, "x", &json!({})).await.unwrap_err();
        assert!(matches!(
            err,
            MnemoError::Transport { .. } | MnemoError::Timeout { .. }
        ));
    }
}
