// src/models.rs
// =============================================================================
// Plain data types shared by the crawl stages.
// =============================================================================

use std::fmt;

/// A GitHub user found through search or a follower page.
///
/// `id` is the GraphQL node id, which is what commit history filters on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateUser {
    pub id: String,
    pub login: String,
}

impl CandidateUser {
    pub fn new(id: impl Into<String>, login: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            login: login.into(),
        }
    }
}

/// One harvested co-author: a login and its noreply commit email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoAuthorRecord {
    pub login: String,
    pub email: String,
}

// Renders the git trailer line, e.g.
//   Co-authored-by: octocat <583231+octocat@users.noreply.github.com>
impl fmt::Display for CoAuthorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Co-authored-by: {} <{}>", self.login, self.email)
    }
}
