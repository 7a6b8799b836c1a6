// src/github/fetch.rs
// =============================================================================
// This module holds the GraphQL queries the crawl sends and turns GitHub's
// JSON answers into Rust types.
//
// Queries:
// - search_users: one page of the user search (100 per page, cursor based)
// - user_followers: one page of a user's followers (100 per page)
// - bulk_emails: one request covering a whole group of users, each user
//   under its own alias (u<slot index>) so answers map back to slots
// - follower_count: total followers of one user
//
// GitHub leaves holes in its answers all the time: empty repositories,
// repositories without a default branch, search nodes that timed out.
// All of those become "nothing here" (None / skipped), never an error.
//
// Rust concepts:
// - serde derive with Option fields: missing JSON keys become None
// - Generic structs: Connection<T> covers every paginated list
// =============================================================================

use std::collections::HashMap;
use std::fmt::Write as _;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::client::{GraphqlRequest, Transport};
use super::governor::Governor;
use crate::config::PAGE_SIZE;
use crate::error::ApiError;
use crate::models::CandidateUser;

const SEARCH_USERS_QUERY: &str = r#"
query SearchUsers($query: String!, $first: Int!, $after: String) {
  search(query: $query, type: USER, first: $first, after: $after) {
    pageInfo { hasNextPage endCursor }
    nodes { ... on User { login id } }
  }
}"#;

const USER_FOLLOWERS_QUERY: &str = r#"
query UserFollowers($login: String!, $first: Int!, $after: String) {
  user(login: $login) {
    followers(first: $first, after: $after) {
      pageInfo { hasNextPage endCursor }
      nodes { login id }
    }
  }
}"#;

const FOLLOWER_COUNT_QUERY: &str = r#"
query FollowerCount($login: String!) {
  user(login: $login) { followers { totalCount } }
}"#;

// One page of a paginated listing
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

// Written by hand so T does not need Default
impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            end_cursor: None,
            has_next_page: false,
        }
    }
}

impl<T> Page<T> {
    /// Cursor for the next page, or None when this was the last one.
    pub fn next_cursor(&self) -> Option<&str> {
        if self.has_next_page {
            self.end_cursor.as_deref()
        } else {
            None
        }
    }
}

// ---- response shapes --------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection<T> {
    #[serde(default)]
    page_info: Option<PageInfo>,
    #[serde(default = "Vec::new")]
    nodes: Vec<Option<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    #[serde(default)]
    has_next_page: bool,
    end_cursor: Option<String>,
}

// Search nodes come back as {} for organisations and null on timeouts
#[derive(Debug, Deserialize)]
struct UserNode {
    login: Option<String>,
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    search: Connection<UserNode>,
}

#[derive(Debug, Deserialize)]
struct FollowersData {
    user: Option<FollowersUser>,
}

#[derive(Debug, Deserialize)]
struct FollowersUser {
    followers: Connection<UserNode>,
}

#[derive(Debug, Deserialize)]
struct CountData {
    user: Option<CountUser>,
}

#[derive(Debug, Deserialize)]
struct CountUser {
    followers: TotalCount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TotalCount {
    total_count: u64,
}

// user -> top repository -> default branch -> latest commit -> author email
#[derive(Debug, Deserialize)]
struct EmailUser {
    repositories: Option<Connection<RepoNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepoNode {
    default_branch_ref: Option<BranchRef>,
}

#[derive(Debug, Deserialize)]
struct BranchRef {
    target: Option<CommitTarget>,
}

#[derive(Debug, Deserialize)]
struct CommitTarget {
    history: Option<Connection<CommitNode>>,
}

#[derive(Debug, Deserialize)]
struct CommitNode {
    author: Option<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    email: Option<String>,
}

impl EmailUser {
    fn latest_email(self) -> Option<String> {
        let repo = self.repositories?.nodes.into_iter().flatten().next()?;
        let commit = repo
            .default_branch_ref?
            .target?
            .history?
            .nodes
            .into_iter()
            .flatten()
            .next()?;
        commit.author?.email.filter(|e| !e.trim().is_empty())
    }
}

impl<T> Connection<T> {
    fn into_page<U>(self, convert: impl Fn(T) -> Option<U>) -> Page<U> {
        let (has_next_page, end_cursor) = match self.page_info {
            Some(info) => (info.has_next_page, info.end_cursor),
            None => (false, None),
        };
        Page {
            items: self.nodes.into_iter().flatten().filter_map(convert).collect(),
            end_cursor,
            has_next_page,
        }
    }
}

fn user_from_node(node: UserNode) -> Option<CandidateUser> {
    match (node.id, node.login) {
        (Some(id), Some(login)) if !id.is_empty() && !login.is_empty() => {
            Some(CandidateUser { id, login })
        }
        _ => None,
    }
}

fn decode<T: DeserializeOwned>(data: Value) -> Result<T, ApiError> {
    Ok(serde_json::from_value(data)?)
}

// ---- calls ------------------------------------------------------------------

// Fetches one page of the user search
//
// Parameters:
//   api: the governor every call goes through
//   query: search string, e.g. "type:user sort:followers-desc followers:<500"
//   after: cursor from the previous page (None for the first page)
pub async fn search_users<T: Transport>(
    api: &Governor<T>,
    query: &str,
    after: Option<&str>,
) -> Result<Page<CandidateUser>, ApiError> {
    let request = GraphqlRequest::new(
        "search",
        SEARCH_USERS_QUERY,
        json!({ "query": query, "first": PAGE_SIZE, "after": after }),
    );
    let data = api.call(&request).await?.into_data()?;
    parse_search_page(data)
}

pub(crate) fn parse_search_page(data: Value) -> Result<Page<CandidateUser>, ApiError> {
    let data: SearchData = decode(data)?;
    Ok(data.search.into_page(user_from_node))
}

// Fetches one page of `login`'s followers
//
// A user that no longer exists yields an empty, final page.
pub async fn user_followers<T: Transport>(
    api: &Governor<T>,
    login: &str,
    after: Option<&str>,
) -> Result<Page<CandidateUser>, ApiError> {
    let request = GraphqlRequest::new(
        "followers",
        USER_FOLLOWERS_QUERY,
        json!({ "login": login, "first": PAGE_SIZE, "after": after }),
    );
    let data = api.call(&request).await?.into_data()?;
    parse_follower_page(data)
}

pub(crate) fn parse_follower_page(data: Value) -> Result<Page<CandidateUser>, ApiError> {
    let data: FollowersData = decode(data)?;
    Ok(match data.user {
        Some(user) => user.followers.into_page(user_from_node),
        None => Page::default(),
    })
}

// Looks up the total follower count of one user
pub async fn follower_count<T: Transport>(api: &Governor<T>, login: &str) -> Result<u64, ApiError> {
    let request = GraphqlRequest::new("follower-count", FOLLOWER_COUNT_QUERY, json!({ "login": login }));
    let data: CountData = decode(api.call(&request).await?.into_data()?)?;
    data.user
        .map(|u| u.followers.total_count)
        .ok_or_else(|| ApiError::MalformedResponse(format!("user '{}' not found", login)))
}

/// GraphQL alias for the user in slot `index`.
pub fn slot_alias(index: usize) -> String {
    format!("u{}", index)
}

// Builds the bulk email query for a group of (slot index, user) pairs
//
// Each user gets its own aliased block:
//   u7: user(login: "octocat") { repositories(...) { ... author { email } } }
// The alias carries the slot index, so the answer can be matched back to
// the slot no matter which group finishes first.
pub fn bulk_email_query(group: &[(usize, &CandidateUser)]) -> String {
    let mut query = String::from("query BulkEmails {\n");

    for (index, user) in group {
        // serde_json quoting doubles as GraphQL string escaping
        let login = Value::String(user.login.clone()).to_string();
        let id = Value::String(user.id.clone()).to_string();

        let _ = write!(
            query,
            "  {alias}: user(login: {login}) {{ \
repositories(first: 1, isFork: false, ownerAffiliations: OWNER, orderBy: {{field: STARGAZERS, direction: DESC}}) {{ \
nodes {{ defaultBranchRef {{ target {{ ... on Commit {{ \
history(first: 1, author: {{id: {id}}}) {{ nodes {{ author {{ email }} }} }} \
}} }} }} }} }} }}\n",
            alias = slot_alias(*index),
            login = login,
            id = id,
        );
    }

    query.push('}');
    query
}

// Runs the bulk email query for one group
//
// Returns: slot index -> email, only for users where an email was found.
// GitHub may answer with data AND errors (e.g. one login was renamed); as
// long as there is data, the group counts as answered.
pub async fn bulk_emails<T: Transport>(
    api: &Governor<T>,
    request: &GraphqlRequest,
    group: &[(usize, &CandidateUser)],
) -> Result<HashMap<usize, String>, ApiError> {
    let response = api.call(request).await?;
    if !response.errors.is_empty() {
        debug!("bulk email query returned partial errors: {}", response.error_summary());
    }
    let data = response.into_data()?;
    Ok(parse_bulk_emails(&data, group))
}

pub fn bulk_email_request(group: &[(usize, &CandidateUser)]) -> GraphqlRequest {
    GraphqlRequest::new("bulk-emails", bulk_email_query(group), json!({}))
}

pub(crate) fn parse_bulk_emails(data: &Value, group: &[(usize, &CandidateUser)]) -> HashMap<usize, String> {
    let mut emails = HashMap::new();

    for (index, user) in group {
        let Some(entry) = data.get(slot_alias(*index)) else {
            continue;
        };
        match serde_json::from_value::<Option<EmailUser>>(entry.clone()) {
            Ok(Some(found)) => {
                if let Some(email) = found.latest_email() {
                    emails.insert(*index, email);
                }
            }
            Ok(None) => {}
            Err(e) => debug!("unreadable bulk entry for {}: {}", user.login, e),
        }
    }

    emails
}
