// src/config.rs
// =============================================================================
// Tunables for the crawl and for the HTTP client.
//
// Two groups of settings live here:
// - CrawlConfig: how big a batch is, how many bulk requests fly at once,
//   how many co-authors we want from each root user
// - ClientConfig: where the GraphQL endpoint is and which token to send
//
// CLI flags fill in CrawlConfig; the environment fills in ClientConfig.
// =============================================================================

use std::time::Duration;

use url::Url;

use crate::error::CrawlError;

/// Users per bulk email request
pub const DEFAULT_GROUP_SIZE: usize = 25;

/// Bulk email requests in flight at once
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Accepted co-authors sought per root user before moving on
pub const DEFAULT_DEPTH: usize = 50;

/// Nodes per search or follower page (GitHub's maximum)
pub const PAGE_SIZE: usize = 100;

pub const DEFAULT_ENDPOINT: &str = "https://api.github.com/graphql";
pub const DEFAULT_NOREPLY_DOMAIN: &str = "users.noreply.github.com";

pub const TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const ENDPOINT_ENV: &str = "GITHUB_GRAPHQL_URL";

// Settings that shape the crawl itself
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub group_size: usize,
    pub concurrency: usize,
    pub depth: usize,
    pub noreply_domain: String,
}

impl CrawlConfig {
    /// Number of slots one resolver pass looks at (group_size * concurrency).
    pub fn working_set(&self) -> usize {
        self.group_size * self.concurrency
    }

    // Rejects sizes that would make the resolver spin without progress
    pub fn validate(&self) -> Result<(), CrawlError> {
        if self.group_size == 0 {
            return Err(CrawlError::InvalidArgument(
                "group size must be at least 1".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(CrawlError::InvalidArgument(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.depth == 0 {
            return Err(CrawlError::InvalidArgument(
                "depth must be at least 1".to_string(),
            ));
        }
        if self.noreply_domain.is_empty() {
            return Err(CrawlError::InvalidArgument(
                "noreply domain must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            group_size: DEFAULT_GROUP_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            depth: DEFAULT_DEPTH,
            noreply_domain: DEFAULT_NOREPLY_DOMAIN.to_string(),
        }
    }
}

// Settings for the HTTP transport
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: Url,
    /// Bearer credential. None means every request goes out unauthenticated
    /// and fails through the normal error path.
    pub token: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    // Reads GITHUB_TOKEN and GITHUB_GRAPHQL_URL from the process environment
    pub fn from_env() -> Result<Self, CrawlError> {
        let endpoint = std::env::var(ENDPOINT_ENV).ok();
        let token = std::env::var(TOKEN_ENV).ok();
        Self::from_parts(endpoint.as_deref(), token)
    }

    fn from_parts(endpoint: Option<&str>, token: Option<String>) -> Result<Self, CrawlError> {
        let raw = endpoint.unwrap_or(DEFAULT_ENDPOINT);
        let endpoint = Url::parse(raw).map_err(|e| {
            CrawlError::InvalidArgument(format!("invalid {} '{}': {}", ENDPOINT_ENV, raw, e))
        })?;

        // An empty token is the same as no token
        let token = token.filter(|t| !t.trim().is_empty());

        Ok(Self {
            endpoint,
            token,
            timeout: Duration::from_secs(30),
        })
    }
}
