//! REST client for the `/api/<entity>/` endpoints.
//!
//! Every request appends `format=json`. Resource paths always end in a
//! slash: `/api/antigen/`, `/api/antigen/test:1/`. References are
//! percent-encoded as a single path segment.

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{ApiRejection, ClientError};

/// Transport used by the entity stores.
///
/// `endpoint` is the entity name under `/api/` and `reference` the
/// rendered key of one resource.
#[async_trait]
pub trait EntityApi: Send + Sync {
    /// `GET /api/<endpoint>/?<query>`; the body is expected to be an array.
    /// `query` is the output of [`query_pairs`](crate::query::query_pairs).
    async fn list(&self, endpoint: &str, query: &[(String, String)]) -> Result<Value, ClientError>;

    /// `GET /api/<endpoint>/<reference>/`.
    async fn get(&self, endpoint: &str, reference: &str) -> Result<Value, ClientError>;

    /// `POST /api/<endpoint>/`. `body` may be an object or, for bulk
    /// creates, an array.
    async fn create(&self, endpoint: &str, body: &Value) -> Result<Value, ClientError>;

    /// `PUT /api/<endpoint>/<reference>/`.
    async fn update(&self, endpoint: &str, reference: &str, body: &Value)
        -> Result<Value, ClientError>;
}

/// HTTP client for one API origin.
pub struct RestClient {
    client: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    /// Build a client with the configured timeout.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ClientError::Config(format!("invalid base URL '{}'", config.base_url)))?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reuse an existing [`reqwest::Client`] (connection pooling).
    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn collection_url(&self, endpoint: &str) -> Url {
        self.api_url(&[endpoint])
    }

    fn resource_url(&self, endpoint: &str, reference: &str) -> Url {
        self.api_url(&[endpoint, reference])
    }

    /// `<base>/api/<segments>/`, each segment percent-encoded.
    fn api_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments).push("");
        }
        url
    }

    // ---- private helpers ----

    /// Turn a non-2xx response into an [`ApiRejection`], keeping the body
    /// as the payload when it parses as JSON.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().clone();
        let payload = match response.bytes().await {
            Ok(bytes) => serde_json::from_slice::<Value>(&bytes).ok(),
            Err(_) => None,
        };
        let rejection = ApiRejection {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            payload,
        };
        tracing::warn!(
            status = rejection.status,
            url = %url,
            "API rejected request",
        );
        Err(ClientError::Rejected(rejection))
    }

    /// Parse a successful JSON response body.
    async fn parse_response(response: reqwest::Response) -> Result<Value, ClientError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl EntityApi for RestClient {
    async fn list(&self, endpoint: &str, query: &[(String, String)]) -> Result<Value, ClientError> {
        tracing::debug!(endpoint, ?query, "GET list");
        let response = self
            .client
            .get(self.collection_url(endpoint))
            .query(query)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn get(&self, endpoint: &str, reference: &str) -> Result<Value, ClientError> {
        tracing::debug!(endpoint, reference, "GET record");
        let response = self
            .client
            .get(self.resource_url(endpoint, reference))
            .query(&[("format", "json")])
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn create(&self, endpoint: &str, body: &Value) -> Result<Value, ClientError> {
        tracing::debug!(endpoint, "POST");
        let response = self
            .client
            .post(self.collection_url(endpoint))
            .query(&[("format", "json")])
            .json(body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn update(
        &self,
        endpoint: &str,
        reference: &str,
        body: &Value,
    ) -> Result<Value, ClientError> {
        tracing::debug!(endpoint, reference, "PUT");
        let response = self
            .client
            .put(self.resource_url(endpoint, reference))
            .query(&[("format", "json")])
            .json(body)
            .send()
            .await?;
        Self::parse_response(response).await
    }
}
