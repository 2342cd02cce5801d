use std::future::Future;

use reqwest::Client;
use serde_json::Value;

use crate::error::ApiError;

pub const DEFAULT_ENDPOINT: &str = "https://graphql.anilist.co";

/// Sends one GraphQL request body and returns the decoded JSON response.
pub trait GraphQLTransport: Send + Sync {
    fn post(
        &self,
        operation: &'static str,
        body: Value,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;
}

/// Anonymous HTTPS transport for the public AniList endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

/// First `errors[].message` of a GraphQL error body, if it has one.
fn first_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("errors")?
        .get(0)?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

impl GraphQLTransport for HttpTransport {
    async fn post(&self, operation: &'static str, body: Value) -> Result<Value, ApiError> {
        tracing::debug!(operation, "AniList GraphQL request");

        let resp = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(operation, status = status_code, "AniList API error");
            return Err(ApiError::Api {
                status: status_code,
                message: first_error_message(&body).unwrap_or(body),
            });
        }

        tracing::debug!(operation, status = %status, "AniList response received");
        resp.json::<Value>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}
