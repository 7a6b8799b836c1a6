// src/crawl/mod.rs
// =============================================================================
// This module is the crawl engine.
//
// Stages, leaf first:
// - slots: the rolling buffer of users waiting for an email lookup
// - seen: ids we already emitted, so nobody is printed twice
// - resolver: bulk email lookups over the front of the buffer
// - expander: fills the buffer from one root user's followers
// - frontier: walks the user search to pick root users
// - orchestrator: the Crawler that ties it all together
//
// Shared state (buffer, seen set, config, start time) lives in one
// CrawlContext that the crawler owns and lends to each stage in turn.
// =============================================================================

mod expander;
mod frontier;
mod orchestrator;
mod resolver;
mod seen;
mod slots;

use std::time::Instant;

use crate::config::CrawlConfig;

pub use expander::FollowerExpander;
pub use frontier::{FollowerBound, FrontierState, SearchFrontier};
pub use orchestrator::Crawler;
pub use resolver::{resolve_batch, Resolved};
pub use seen::SeenSet;
pub use slots::{BatchSlotTable, PendingSlot};

// Everything the stages share for the lifetime of one crawl
#[derive(Debug)]
pub struct CrawlContext {
    pub table: BatchSlotTable,
    pub seen: SeenSet,
    pub config: CrawlConfig,
    pub started: Instant,
}

impl CrawlContext {
    pub fn new(config: CrawlConfig) -> Self {
        Self {
            table: BatchSlotTable::new(),
            seen: SeenSet::new(),
            config,
            started: Instant::now(),
        }
    }
}
