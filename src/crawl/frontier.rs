// src/crawl/frontier.rs
// =============================================================================
// The search frontier: walks GitHub's user search, most-followed first.
//
// GitHub only hands out the first 1000 results of any search. To get past
// that, the crawl searches inside a window "followers:<N", and once the
// window runs dry it shrinks N to just above the follower count of the
// last (least-followed) user it saw, then searches again.
//
// Pieces:
// - FollowerBound: the window ceiling (unbounded, or "below N")
// - FrontierState: the ceiling plus the last login seen in this window
// - SearchFrontier: pulls one candidate root user at a time, fetching the
//   next page only when the current one is used up
//
// Rust concepts:
// - VecDeque: a buffer of users from the current page
// - Option<T>: None from next() means this window is exhausted
// =============================================================================

use std::collections::VecDeque;
use std::fmt;

use tracing::{debug, warn};

use crate::error::CrawlError;
use crate::github::{search_users, Governor, Transport};
use crate::models::CandidateUser;

// The follower-count ceiling of a search window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowerBound {
    Unbounded,
    /// Only users with strictly fewer followers than this
    Below(u64),
}

impl FollowerBound {
    // Builds the search string for this window
    pub fn search_query(&self) -> String {
        match self {
            FollowerBound::Unbounded => "type:user sort:followers-desc".to_string(),
            FollowerBound::Below(n) => format!("type:user sort:followers-desc followers:<{}", n),
        }
    }

    // Next, tighter window given the follower count of the last user seen
    //
    // The new ceiling is count + 1, but never at or above the current one,
    // so repeated refreshes always shrink the window. Returns None once the
    // window would be empty.
    pub fn tighten(&self, last_seen_count: u64) -> Option<FollowerBound> {
        let candidate = last_seen_count.saturating_add(1);
        let next = match self {
            FollowerBound::Unbounded => candidate,
            FollowerBound::Below(current) => candidate.min(current.saturating_sub(1)),
        };

        if next == 0 {
            None
        } else {
            Some(FollowerBound::Below(next))
        }
    }
}

impl fmt::Display for FollowerBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FollowerBound::Unbounded => write!(f, "unbounded"),
            FollowerBound::Below(n) => write!(f, "<{}", n),
        }
    }
}

/// Where the frontier walk stands: the window ceiling and the
/// least-followed login seen inside it so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierState {
    pub upper_bound: FollowerBound,
    pub last_seen_login: Option<String>,
}

impl FrontierState {
    pub fn new() -> Self {
        Self {
            upper_bound: FollowerBound::Unbounded,
            last_seen_login: None,
        }
    }

    // Results are sorted by followers descending, so the latest user seen
    // is also the least-followed one
    pub fn observe(&mut self, user: &CandidateUser) {
        self.last_seen_login = Some(user.login.clone());
    }

    // Moves to a new window and forgets the old window's last login
    pub fn advance(&mut self, bound: FollowerBound) {
        self.upper_bound = bound;
        self.last_seen_login = None;
    }
}

impl Default for FrontierState {
    fn default() -> Self {
        Self::new()
    }
}

// A paginated walk over one search window
pub struct SearchFrontier {
    bound: FollowerBound,
    cursor: Option<String>,
    buffer: VecDeque<CandidateUser>,
    exhausted: bool,
}

impl SearchFrontier {
    pub fn new(bound: FollowerBound) -> Self {
        Self {
            bound,
            cursor: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    // Returns the next candidate root user, or None when the window is done
    //
    // A failed page fetch ends the window early; the governor has already
    // retried it if it was throttled.
    pub async fn next<T: Transport>(&mut self, api: &Governor<T>) -> Option<CandidateUser> {
        loop {
            if let Some(user) = self.buffer.pop_front() {
                return Some(user);
            }
            if self.exhausted {
                return None;
            }

            let query = self.bound.search_query();
            match search_users(api, &query, self.cursor.as_deref()).await {
                Ok(page) => {
                    debug!("search page for {} returned {} user(s)", self.bound, page.items.len());
                    self.cursor = page.next_cursor().map(str::to_string);
                    self.exhausted = self.cursor.is_none();
                    self.buffer.extend(page.items);
                }
                Err(source) => {
                    let err = CrawlError::PageFetchFailed {
                        what: format!("user search ({})", query),
                        source,
                    };
                    warn!("{}", err);
                    self.exhausted = true;
                }
            }
        }
    }
}
