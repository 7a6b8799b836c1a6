//! Shared fixtures for the integration tests: an in-memory stand-in for the
//! GitHub GraphQL API and a log capture helper.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use coauthor_harvest::error::{ApiError, Throttle, ThrottleKind};
use coauthor_harvest::github::{GraphqlRequest, GraphqlResponse, Transport};
use coauthor_harvest::CandidateUser;
use regex::Regex;
use serde_json::{json, Map, Value};

pub const NOREPLY_DOMAIN: &str = "users.noreply.example.com";

pub fn user(login: &str) -> CandidateUser {
    CandidateUser::new(format!("id-{}", login), login)
}

pub fn noreply(login: &str) -> String {
    format!("{}+{}@{}", 100 + login.len(), login, NOREPLY_DOMAIN)
}

/// Fake GitHub. Answers each query type from the maps below and records
/// every request it sees.
#[derive(Default)]
pub struct FakeGithub {
    /// Users returned by the unbounded search, in rank order
    pub search: Vec<CandidateUser>,
    /// Users returned by "followers:<N" searches, keyed by N
    pub bounded_search: HashMap<u64, Vec<CandidateUser>>,
    pub followers: HashMap<String, Vec<CandidateUser>>,
    /// login -> latest commit email
    pub emails: HashMap<String, String>,
    pub follower_counts: HashMap<String, u64>,
    /// A bulk group containing any of these logins fails as a whole
    pub failing: HashSet<String>,
    /// A bulk group containing any of these logins answers late
    pub slow: HashSet<String>,
    /// Search pages at or past this zero-based page number fail
    pub failing_search_page: Option<usize>,
    /// Follower pages for these roots fail
    pub failing_followers: HashSet<String>,
    /// Throttle signals to hand out before answering normally
    pub throttles_left: Mutex<usize>,
    pub requests: Mutex<Vec<(String, Value)>>,
    pub bulk_groups: Mutex<Vec<Vec<(usize, String)>>>,
}

impl FakeGithub {
    pub fn with_search(mut self, users: Vec<CandidateUser>) -> Self {
        self.search = users;
        self
    }

    pub fn with_bounded_search(mut self, bound: u64, users: Vec<CandidateUser>) -> Self {
        self.bounded_search.insert(bound, users);
        self
    }

    pub fn with_followers(mut self, root: &str, followers: Vec<CandidateUser>) -> Self {
        for follower in &followers {
            self.emails
                .entry(follower.login.clone())
                .or_insert_with(|| noreply(&follower.login));
        }
        self.followers.insert(root.to_string(), followers);
        self
    }

    pub fn with_email(mut self, login: &str, email: Option<&str>) -> Self {
        match email {
            Some(email) => self.emails.insert(login.to_string(), email.to_string()),
            None => self.emails.remove(login),
        };
        self
    }

    pub fn with_follower_count(mut self, login: &str, count: u64) -> Self {
        self.follower_counts.insert(login.to_string(), count);
        self
    }

    pub fn failing(mut self, login: &str) -> Self {
        self.failing.insert(login.to_string());
        self
    }

    pub fn slow(mut self, login: &str) -> Self {
        self.slow.insert(login.to_string());
        self
    }

    pub fn failing_search_after_page(mut self, pages: usize) -> Self {
        self.failing_search_page = Some(pages);
        self
    }

    pub fn failing_followers(mut self, login: &str) -> Self {
        self.failing_followers.insert(login.to_string());
        self
    }

    pub fn throttle_next(self, times: usize) -> Self {
        *self.throttles_left.lock().unwrap() = times;
        self
    }

    pub fn count_requests(&self, operation: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(op, _)| op == operation)
            .count()
    }

    pub fn search_queries(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(op, _)| op == "search")
            .filter_map(|(_, vars)| vars["query"].as_str().map(str::to_string))
            .collect()
    }

    fn page(users: &[CandidateUser], vars: &Value) -> Value {
        let first = vars["first"].as_u64().unwrap_or(100) as usize;
        let start: usize = vars["after"]
            .as_str()
            .and_then(|c| c.parse().ok())
            .unwrap_or(0);
        let end = (start + first).min(users.len());
        let nodes: Vec<Value> = users[start.min(end)..end]
            .iter()
            .map(|u| json!({ "login": u.login, "id": u.id }))
            .collect();
        json!({
            "pageInfo": { "hasNextPage": end < users.len(), "endCursor": end.to_string() },
            "nodes": nodes,
        })
    }

    fn answer_search(&self, vars: &Value) -> Result<GraphqlResponse, ApiError> {
        if let Some(limit) = self.failing_search_page {
            let first = vars["first"].as_u64().unwrap_or(100) as usize;
            let start: usize = vars["after"]
                .as_str()
                .and_then(|c| c.parse().ok())
                .unwrap_or(0);
            if start / first.max(1) >= limit {
                return Err(bad_gateway());
            }
        }

        let query = vars["query"].as_str().unwrap_or_default();
        let bound = query
            .split_whitespace()
            .find_map(|part| part.strip_prefix("followers:<"))
            .and_then(|n| n.parse::<u64>().ok());
        let empty = Vec::new();
        let users = match bound {
            None => &self.search,
            Some(n) => self.bounded_search.get(&n).unwrap_or(&empty),
        };
        Ok(ok(json!({ "search": Self::page(users, vars) })))
    }

    fn answer_followers(&self, vars: &Value) -> Result<GraphqlResponse, ApiError> {
        let login = vars["login"].as_str().unwrap_or_default();
        if self.failing_followers.contains(login) {
            return Err(bad_gateway());
        }
        Ok(match self.followers.get(login) {
            Some(list) => ok(json!({ "user": { "followers": Self::page(list, vars) } })),
            None => ok(json!({ "user": null })),
        })
    }

    fn answer_count(&self, vars: &Value) -> GraphqlResponse {
        let login = vars["login"].as_str().unwrap_or_default();
        match self.follower_counts.get(login) {
            Some(count) => ok(json!({ "user": { "followers": { "totalCount": count } } })),
            None => ok(json!({ "user": null })),
        }
    }

    async fn answer_bulk(&self, query: &str) -> Result<GraphqlResponse, ApiError> {
        let alias = Regex::new(r#"u(\d+): user\(login: "([^"]+)"\)"#).unwrap();
        let members: Vec<(usize, String)> = alias
            .captures_iter(query)
            .map(|c| (c[1].parse().unwrap(), c[2].to_string()))
            .collect();
        self.bulk_groups.lock().unwrap().push(members.clone());

        if members.iter().any(|(_, login)| self.slow.contains(login)) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        if members.iter().any(|(_, login)| self.failing.contains(login)) {
            return Err(bad_gateway());
        }

        let mut data = Map::new();
        for (index, login) in members {
            let entry = match self.emails.get(&login) {
                Some(email) => json!({ "repositories": { "nodes": [ {
                    "defaultBranchRef": { "target": {
                        "history": { "nodes": [ { "author": { "email": email } } ] }
                    } }
                } ] } }),
                // empty account: no repositories at all
                None => json!({ "repositories": { "nodes": [] } }),
            };
            data.insert(format!("u{}", index), entry);
        }
        Ok(ok(Value::Object(data)))
    }
}

fn bad_gateway() -> ApiError {
    ApiError::Status {
        status: 502,
        body: "Bad Gateway".to_string(),
    }
}

fn ok(data: Value) -> GraphqlResponse {
    GraphqlResponse {
        data: Some(data),
        errors: vec![],
    }
}

#[async_trait]
impl Transport for FakeGithub {
    async fn execute(&self, request: &GraphqlRequest) -> Result<GraphqlResponse, ApiError> {
        self.requests
            .lock()
            .unwrap()
            .push((request.operation.to_string(), request.variables.clone()));

        {
            let mut left = self.throttles_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(ApiError::Throttled(Throttle::immediate(ThrottleKind::Secondary)));
            }
        }

        match request.operation {
            "search" => self.answer_search(&request.variables),
            "followers" => self.answer_followers(&request.variables),
            "follower-count" => Ok(self.answer_count(&request.variables)),
            "bulk-emails" => self.answer_bulk(&request.query).await,
            other => panic!("unexpected operation {}", other),
        }
    }
}

/// Collects formatted log output so tests can look for warnings.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Installs a subscriber for the current thread; keep the guard alive.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let capture = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || capture.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
