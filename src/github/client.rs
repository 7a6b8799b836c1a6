// src/github/client.rs
// =============================================================================
// This module sends GraphQL requests to GitHub.
//
// Pieces:
// - GraphqlRequest / GraphqlResponse: the JSON envelope GitHub speaks
// - Transport: a trait for "send this query, give me the envelope back",
//   so tests can swap in a fake provider
// - HttpTransport: the real implementation on top of reqwest
// - detect_throttle: turns GitHub's rate-limit signals into a Throttle
//
// Rate-limit signals GitHub uses:
// - HTTP 403/429 + x-ratelimit-remaining: 0  -> quota used up (primary)
// - HTTP 403/429 + retry-after, or a body about a "secondary rate limit"
//   -> abuse detection (secondary)
// - HTTP 200 with a GraphQL error of type RATE_LIMITED -> primary
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ApiError, Throttle, ThrottleKind};

// Used when GitHub throttles us without saying for how long
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

// One GraphQL request: query text plus variables
#[derive(Debug, Clone, Serialize)]
pub struct GraphqlRequest {
    /// Short label for logs ("search", "followers", ...). Not sent.
    #[serde(skip)]
    pub operation: &'static str,
    pub query: String,
    pub variables: Value,
}

impl GraphqlRequest {
    pub fn new(operation: &'static str, query: impl Into<String>, variables: Value) -> Self {
        Self {
            operation,
            query: query.into(),
            variables,
        }
    }
}

// The response envelope. GitHub can send data AND errors at the same time
// (for example when one aliased user in a bulk query does not exist).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlError {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl GraphqlResponse {
    // Returns the data object, or an error if GitHub sent none
    pub fn into_data(self) -> Result<Value, ApiError> {
        match self.data {
            Some(data) if !data.is_null() => Ok(data),
            _ => Err(ApiError::Graphql(self.error_summary())),
        }
    }

    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return "response carried no data".to_string();
        }
        self.errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn is_rate_limited(&self) -> bool {
        self.errors
            .iter()
            .any(|e| e.kind.as_deref() == Some("RATE_LIMITED"))
    }
}

// Anything that can execute a GraphQL request.
//
// The crawl only ever talks to this trait, never to reqwest directly.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &GraphqlRequest) -> Result<GraphqlResponse, ApiError>;
}

// The production transport: POSTs to the GraphQL endpoint with a bearer token
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        // GitHub rejects requests without a User-Agent
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &GraphqlRequest) -> Result<GraphqlResponse, ApiError> {
        let mut builder = self.client.post(self.endpoint.clone()).json(request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let now = chrono::Utc::now().timestamp();
            if let Some(throttle) = detect_throttle(status, &headers, &body, now) {
                return Err(ApiError::Throttled(throttle));
            }
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: GraphqlResponse = response.json().await?;
        if envelope.is_rate_limited() {
            let now = chrono::Utc::now().timestamp();
            let retry_after = reset_delay(&headers, now).unwrap_or(DEFAULT_RETRY_AFTER);
            return Err(ApiError::Throttled(Throttle {
                kind: ThrottleKind::Primary,
                retry_after,
            }));
        }

        Ok(envelope)
    }
}

// Works out whether a failed HTTP response is a rate-limit signal
//
// Parameters:
//   status: HTTP status code
//   headers: response headers (x-ratelimit-*, retry-after)
//   body: response body, used to spot secondary-limit messages
//   now: current unix time in seconds
//
// Returns: Some(Throttle) for rate limits, None for ordinary failures
pub fn detect_throttle(status: StatusCode, headers: &HeaderMap, body: &str, now: i64) -> Option<Throttle> {
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return None;
    }

    if header_str(headers, "x-ratelimit-remaining") == Some("0") {
        return Some(Throttle {
            kind: ThrottleKind::Primary,
            retry_after: reset_delay(headers, now).unwrap_or(DEFAULT_RETRY_AFTER),
        });
    }

    let retry_after = header_str(headers, "retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let lower = body.to_ascii_lowercase();
    let mentions_limit = lower.contains("secondary rate limit") || lower.contains("abuse");

    if retry_after.is_some() || mentions_limit || status == StatusCode::TOO_MANY_REQUESTS {
        return Some(Throttle {
            kind: ThrottleKind::Secondary,
            retry_after: retry_after.unwrap_or(DEFAULT_RETRY_AFTER),
        });
    }

    // A plain 403 (bad credentials, missing scope) is not a throttle
    None
}

// Seconds until x-ratelimit-reset, never negative
fn reset_delay(headers: &HeaderMap, now: i64) -> Option<Duration> {
    let reset = header_str(headers, "x-ratelimit-reset")?.trim().parse::<i64>().ok()?;
    Some(Duration::from_secs((reset - now).max(0) as u64))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
