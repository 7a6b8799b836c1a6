// src/github/mod.rs
// =============================================================================
// This module talks to the GitHub GraphQL API.
//
// - client: the Transport trait and its reqwest implementation
// - governor: retry-once-on-throttle wrapper around every call
// - fetch: the queries themselves and their response types
// =============================================================================

mod client;
mod fetch;
mod governor;

pub use client::{detect_throttle, GraphqlError, GraphqlRequest, GraphqlResponse, HttpTransport, Transport};
pub use fetch::{
    bulk_email_query, bulk_email_request, bulk_emails, follower_count, search_users, slot_alias,
    user_followers, Page,
};
pub use governor::Governor;
