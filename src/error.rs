// src/error.rs
// =============================================================================
// Error types for the crawl engine.
//
// Two layers:
// - ApiError: what a single GraphQL call can fail with
// - CrawlError: what a crawl stage reports when a call fails
//
// Only InvalidArgument is fatal. Everything else is logged and the crawl
// carries on with the next group, root, or bound.
// =============================================================================

use std::fmt;
use std::time::Duration;

use thiserror::Error;

// Which throttle the provider signalled. Only used for logging; the
// governor treats both the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleKind {
    /// Hourly quota used up (x-ratelimit-remaining: 0 or RATE_LIMITED)
    Primary,
    /// Abuse detection / secondary rate limit
    Secondary,
}

impl fmt::Display for ThrottleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThrottleKind::Primary => write!(f, "primary rate limit"),
            ThrottleKind::Secondary => write!(f, "secondary rate limit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Throttle {
    pub kind: ThrottleKind,
    /// Provider-supplied delay before the next attempt
    pub retry_after: Duration,
}

impl Throttle {
    // A throttle with no delay, for fakes that should not actually wait
    pub fn immediate(kind: ThrottleKind) -> Self {
        Self {
            kind,
            retry_after: Duration::ZERO,
        }
    }
}

impl fmt::Display for Throttle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} hit, retry after {}s", self.kind, self.retry_after.as_secs())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("throttled: {0}")]
    Throttled(Throttle),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("GraphQL error: {0}")]
    Graphql(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ApiError {
    pub fn is_throttled(&self) -> bool {
        matches!(self, ApiError::Throttled(_))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::MalformedResponse(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("bulk email lookup failed for slots {start}..{end}: {source}")]
    GroupRequestFailed {
        start: usize,
        end: usize,
        #[source]
        source: ApiError,
    },

    #[error("page fetch failed for {what}: {source}")]
    PageFetchFailed {
        what: String,
        #[source]
        source: ApiError,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
