// src/crawl/orchestrator.rs
// =============================================================================
// The crawler: glues frontier, expander and resolver into one endless
// sequence of co-author records.
//
// State machine:
//
//   ScanningFrontier --(next root)--> ExpandingFollowers
//        ^   |                               |
//        |   +--(window empty)--> RefreshingBound
//        |                               |
//        +------(root done)--------------+--(new bound)
//                                        |
//                                  (no new bound)
//                                        v
//                                    Draining --(table empty)--> Finished
//
// - ScanningFrontier: pull the next root from the search window
// - ExpandingFollowers: forward every record the expander produces
// - RefreshingBound: look up the follower count of the last root seen and
//   shrink the window below it; if that fails, or nothing was seen, move
//   on to draining
// - Draining: resolve the backlog the last roots left in the slot table,
//   then stop
//
// The crawler never decides it has "enough". The caller pulls records
// until it has what it wants and then stops calling next().
//
// Rust concepts:
// - Enums with data: the expander lives inside its state
// - futures::stream::unfold: wraps next() as a Stream
// =============================================================================

use std::collections::VecDeque;

use futures::stream::{self, Stream};
use tracing::{debug, info, warn};

use super::expander::FollowerExpander;
use super::frontier::{FrontierState, SearchFrontier};
use super::resolver::resolve_batch;
use super::CrawlContext;
use crate::config::CrawlConfig;
use crate::github::{follower_count, Governor, Transport};
use crate::models::CoAuthorRecord;

enum Phase {
    ScanningFrontier,
    ExpandingFollowers(FollowerExpander),
    RefreshingBound,
    Draining,
    Finished,
}

pub struct Crawler<T> {
    api: Governor<T>,
    ctx: CrawlContext,
    state: FrontierState,
    frontier: SearchFrontier,
    phase: Phase,
    // records from the final backlog passes, not yet handed out
    pending: VecDeque<CoAuthorRecord>,
    roots: u64,
    emitted: usize,
}

impl<T: Transport> Crawler<T> {
    pub fn new(api: Governor<T>, config: CrawlConfig) -> Self {
        let state = FrontierState::new();
        let frontier = SearchFrontier::new(state.upper_bound);
        Self {
            api,
            ctx: CrawlContext::new(config),
            state,
            frontier,
            phase: Phase::ScanningFrontier,
            pending: VecDeque::new(),
            roots: 0,
            emitted: 0,
        }
    }

    pub fn api(&self) -> &Governor<T> {
        &self.api
    }

    pub fn frontier_state(&self) -> &FrontierState {
        &self.state
    }

    pub fn context(&self) -> &CrawlContext {
        &self.ctx
    }

    /// Records handed out so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    // Pulls the next accepted record, or None once the crawl has nowhere
    // left to go
    pub async fn next(&mut self) -> Option<CoAuthorRecord> {
        loop {
            match &mut self.phase {
                Phase::ExpandingFollowers(expander) => {
                    if let Some(record) = expander.next(&self.api, &mut self.ctx).await {
                        self.emitted += 1;
                        return Some(record);
                    }
                    self.phase = Phase::ScanningFrontier;
                }
                Phase::ScanningFrontier => match self.frontier.next(&self.api).await {
                    Some(root) => {
                        self.roots += 1;
                        self.state.observe(&root);
                        info!(
                            root = %root.login,
                            ordinal = self.roots,
                            bound = %self.state.upper_bound,
                            "[{:.0}s] {} record(s) so far, expanding followers of {}",
                            self.ctx.started.elapsed().as_secs_f64(),
                            self.emitted,
                            root.login,
                        );
                        self.phase = Phase::ExpandingFollowers(FollowerExpander::new(root, self.roots));
                    }
                    None => self.phase = Phase::RefreshingBound,
                },
                Phase::RefreshingBound => {
                    self.phase = if self.refresh_bound().await {
                        Phase::ScanningFrontier
                    } else {
                        Phase::Draining
                    };
                }
                Phase::Draining => {
                    if let Some(record) = self.pending.pop_front() {
                        self.emitted += 1;
                        return Some(record);
                    }
                    if self.ctx.table.live_count() == 0 {
                        self.phase = Phase::Finished;
                        continue;
                    }

                    debug!("draining {} leftover slot(s)", self.ctx.table.live_count());
                    let resolved =
                        resolve_batch(&self.api, &mut self.ctx.table, &mut self.ctx.seen, &self.ctx.config)
                            .await;
                    self.ctx.table.compact();
                    self.pending.extend(resolved.into_iter().map(|item| item.record));
                }
                Phase::Finished => return None,
            }
        }
    }

    // Shrinks the search window below the last root seen
    //
    // Returns: false when the crawl should end (nothing seen, lookup failed,
    // or the window cannot shrink any further)
    async fn refresh_bound(&mut self) -> bool {
        let Some(login) = self.state.last_seen_login.clone() else {
            info!("no users left under bound {}, crawl finished", self.state.upper_bound);
            return false;
        };

        let count = match follower_count(&self.api, &login).await {
            Ok(count) => count,
            Err(e) => {
                // No retry beyond the governor's; the crawl just ends here
                warn!("could not look up follower count of {}: {}; stopping crawl", login, e);
                return false;
            }
        };

        let Some(bound) = self.state.upper_bound.tighten(count) else {
            info!("search window cannot shrink below {}, crawl finished", self.state.upper_bound);
            return false;
        };

        info!(
            "refreshing search window: {} had {} follower(s), new bound {}",
            login, count, bound
        );
        self.state.advance(bound);
        self.frontier = SearchFrontier::new(bound);
        true
    }

    // Turns the crawler into a Stream of records
    //
    // The stream only does work when polled, so dropping it (or taking a
    // fixed number of items) is all the cancellation it needs.
    pub fn into_stream(self) -> impl Stream<Item = CoAuthorRecord> {
        stream::unfold(self, |mut crawler| async move {
            let record = crawler.next().await?;
            Some((record, crawler))
        })
    }
}
