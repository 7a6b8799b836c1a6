// src/crawl/expander.rs
// =============================================================================
// The follower expander: turns one root user into co-author records.
//
// Loop, one step per resolver pass:
// 1. If the slot table is smaller than a full working set, pull follower
//    pages (100 at a time) into it until it is full or the root has no
//    more followers
// 2. Run the resolver over the table and queue up whatever it accepts
// 3. Compact the table
//
// Stops when either
// - the root has produced `depth` records, or
// - its followers ran out and none of its own slots are left (logged as a
//   partial root if it fell short of `depth`)
//
// The table is shared with the next root: slots left over from this root
// are resolved during the next root's first passes. Progress only counts
// records whose slot came from this root.
// =============================================================================

use std::collections::VecDeque;

use tracing::{debug, warn};

use super::resolver::resolve_batch;
use super::CrawlContext;
use crate::error::CrawlError;
use crate::github::{user_followers, Governor, Transport};
use crate::models::{CandidateUser, CoAuthorRecord};

pub struct FollowerExpander {
    root: CandidateUser,
    // ordinal of this root, stamped on every slot it appends
    origin: u64,
    cursor: Option<String>,
    followers_exhausted: bool,
    found: usize,
    pending: VecDeque<CoAuthorRecord>,
    finished: bool,
}

impl FollowerExpander {
    pub fn new(root: CandidateUser, origin: u64) -> Self {
        Self {
            root,
            origin,
            cursor: None,
            followers_exhausted: false,
            found: 0,
            pending: VecDeque::new(),
            finished: false,
        }
    }

    // Returns the next record for this root, or None when the root is done
    pub async fn next<T: Transport>(
        &mut self,
        api: &Governor<T>,
        ctx: &mut CrawlContext,
    ) -> Option<CoAuthorRecord> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(record);
            }
            if self.finished {
                return None;
            }

            if self.found >= ctx.config.depth {
                debug!("{} reached depth with {} record(s)", self.root.login, self.found);
                self.finished = true;
                continue;
            }

            let working_set = ctx.config.working_set();
            if ctx.table.len() < working_set && !self.followers_exhausted {
                self.fill(api, ctx, working_set).await;
            }

            if self.followers_exhausted && !ctx.table.has_origin(self.origin) {
                if self.found < ctx.config.depth {
                    warn!(
                        "{} ran out of followers with {}/{} co-author(s) found",
                        self.root.login, self.found, ctx.config.depth
                    );
                }
                self.finished = true;
                continue;
            }

            let resolved = resolve_batch(api, &mut ctx.table, &mut ctx.seen, &ctx.config).await;
            ctx.table.compact();

            for item in resolved {
                if item.origin == self.origin {
                    self.found += 1;
                }
                self.pending.push_back(item.record);
            }
        }
    }

    // Appends follower pages until the table holds `target` slots or the
    // followers run out. A failed page ends this root's followers.
    async fn fill<T: Transport>(&mut self, api: &Governor<T>, ctx: &mut CrawlContext, target: usize) {
        while ctx.table.len() < target && !self.followers_exhausted {
            match user_followers(api, &self.root.login, self.cursor.as_deref()).await {
                Ok(page) => {
                    self.cursor = page.next_cursor().map(str::to_string);
                    self.followers_exhausted = self.cursor.is_none();

                    let seen = &ctx.seen;
                    let fresh: Vec<CandidateUser> = page
                        .items
                        .into_iter()
                        .filter(|user| !seen.contains(&user.id))
                        .collect();
                    ctx.table.append(self.origin, fresh);
                }
                Err(source) => {
                    let err = CrawlError::PageFetchFailed {
                        what: format!("followers of {}", self.root.login),
                        source,
                    };
                    warn!("{}", err);
                    self.followers_exhausted = true;
                }
            }
        }
    }
}
