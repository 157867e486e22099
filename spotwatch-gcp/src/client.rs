//! Authenticated JSON-over-HTTP access to Google APIs.

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use spotwatch_core::error::{Result, SpotwatchError};

use crate::auth::TokenSource;

/// Production Pub/Sub endpoint.
pub const DEFAULT_PUBSUB_ENDPOINT: &str = "https://pubsub.googleapis.com";

/// Production Compute Engine endpoint.
pub const DEFAULT_COMPUTE_ENDPOINT: &str = "https://compute.googleapis.com";

/// Client configuration.
#[derive(Clone, Debug)]
pub struct GcpConfig {
    /// Project owning the subscriptions and instances
    pub project: String,
    /// Base URL of the Pub/Sub API
    pub pubsub_endpoint: String,
    /// Base URL of the Compute Engine API
    pub compute_endpoint: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl GcpConfig {
    /// Production endpoints for `project`.
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            pubsub_endpoint: DEFAULT_PUBSUB_ENDPOINT.into(),
            compute_endpoint: DEFAULT_COMPUTE_ENDPOINT.into(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Overrides both API endpoints, e.g. for an emulator or a mock server.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        self.pubsub_endpoint = endpoint.clone();
        self.compute_endpoint = endpoint;
        self
    }
}

/// HTTP client shared by the Pub/Sub and Compute clients.
#[derive(Clone, Debug)]
pub struct GcpClient {
    config: GcpConfig,
    tokens: TokenSource,
    http: reqwest::Client,
}

impl GcpClient {
    /// Creates a client.
    pub fn new(config: GcpConfig, tokens: TokenSource) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SpotwatchError::ConfigError(format!("HTTP client: {e}")))?;

        Ok(Self {
            config,
            tokens,
            http,
        })
    }

    /// Client configuration.
    pub fn config(&self) -> &GcpConfig {
        &self.config
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let request = self.http.get(url).query(query);
        self.send_json(request).await
    }

    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.http.post(url).json(body);
        self.send_json(request).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let token = self.tokens.token(&self.http).await?;
        let response = request.bearer_auth(token).send().await.map_err(|e| {
            if e.is_timeout() {
                SpotwatchError::ConnectionTimeout(e.to_string())
            } else {
                SpotwatchError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SpotwatchError::HttpError(e.to_string()))?;

        match status {
            s if s.is_success() => Ok(serde_json::from_str(&body)?),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(SpotwatchError::AuthError(format!("{status}: {}", truncate(&body))))
            }
            _ => Err(SpotwatchError::HttpError(format!("{status}: {}", truncate(&body)))),
        }
    }
}

fn truncate(body: &str) -> &str {
    const LIMIT: usize = 256;
    match body.char_indices().nth(LIMIT) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GcpClient {
        let config = GcpConfig::new("mock-project").with_endpoint(server.uri());
        GcpClient::new(config, TokenSource::Static("secret".into())).unwrap()
    }

    #[tokio::test]
    async fn test_get_json_sends_bearer_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/thing"))
            .and(query_param("filter", "x"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let value: Value = client(&server)
            .get_json(&format!("{}/thing", server.uri()), &[("filter", "x")])
            .await
            .unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(path("/denied"))
            .respond_with(ResponseTemplate::new(403).set_body_string("nope"))
            .mount(&server)
            .await;
        Mock::given(path("/broken"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let c = client(&server);
        let err = c
            .post_json::<_, Value>(&format!("{}/denied", server.uri()), &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, SpotwatchError::AuthError(ref m) if m.contains("nope")));

        let err = c
            .get_json::<Value>(&format!("{}/broken", server.uri()), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, SpotwatchError::HttpError(_)));
    }

    #[tokio::test]
    async fn test_invalid_body_is_json_error() {
        let server = MockServer::start().await;
        Mock::given(path("/garbage"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server)
            .get_json::<Value>(&format!("{}/garbage", server.uri()), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, SpotwatchError::JsonError(_)));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short"), "short");
        assert_eq!(truncate(&"é".repeat(300)).chars().count(), 256);
    }
}
