// src/crawl/resolver.rs
// =============================================================================
// The email batch resolver: one pass over the front of the slot table.
//
// How a pass works:
// 1. Take the first group_size * concurrency live slots
// 2. Split them into `concurrency` groups of `group_size`
// 3. Send one bulk email query per group, all at once (bounded by
//    buffer_unordered, so at most `concurrency` in flight)
// 4. Once every group has answered, walk the answers in slot order:
//    - group failed       -> tombstone its slots, log the query
//    - no email           -> tombstone
//    - email not noreply  -> tombstone
//    - already seen       -> tombstone
//    - otherwise          -> tombstone, mark seen, emit a record
//
// Answers are matched to slots through the alias (u<slot index>) baked into
// each query, so the order groups finish in never matters. The table is
// only touched after all requests are back.
//
// Rust concepts:
// - Streams: buffer_unordered runs N futures at a time
// - Borrowing: futures borrow the governor, the table is borrowed mutably
//   only after they are all done
// =============================================================================

use futures::stream::{self, StreamExt};
use tracing::{debug, error};

use super::seen::SeenSet;
use super::slots::{BatchSlotTable, PendingSlot};
use crate::checker::is_noreply_for;
use crate::config::CrawlConfig;
use crate::error::CrawlError;
use crate::github::{bulk_emails, bulk_email_request, Governor, Transport};
use crate::models::{CandidateUser, CoAuthorRecord};

/// An accepted record plus the root ordinal its slot came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub record: CoAuthorRecord,
    pub origin: u64,
}

// Runs one resolver pass over `table`
//
// Returns: accepted records in slot order. Every slot the pass looked at is
// tombstoned when this returns; the caller compacts.
pub async fn resolve_batch<T: Transport>(
    api: &Governor<T>,
    table: &mut BatchSlotTable,
    seen: &mut SeenSet,
    config: &CrawlConfig,
) -> Vec<Resolved> {
    let live = table.live_slots(config.working_set());
    if live.is_empty() {
        return Vec::new();
    }

    let groups: Vec<Vec<PendingSlot>> = live
        .chunks(config.group_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect();

    debug!("resolving {} slot(s) in {} group(s)", live.len(), groups.len());

    // Fire every group, at most `concurrency` at a time
    let mut outcomes: Vec<_> = stream::iter(groups.into_iter().map(move |group| async move {
        let (request, result) = {
            let members: Vec<(usize, &CandidateUser)> =
                group.iter().map(|slot| (slot.index, &slot.user)).collect();
            let request = bulk_email_request(&members);
            let result = bulk_emails(api, &request, &members).await;
            (request, result)
        };
        (group, request, result)
    }))
    .buffer_unordered(config.concurrency.max(1))
    .collect()
    .await;

    // Put the groups back in slot order before touching the table
    outcomes.sort_by_key(|(group, _, _)| group.first().map(|slot| slot.index));

    let mut accepted = Vec::new();

    for (group, request, result) in outcomes {
        let emails = match result {
            Ok(emails) => emails,
            Err(source) => {
                let err = CrawlError::GroupRequestFailed {
                    start: group.first().map(|s| s.index).unwrap_or_default(),
                    end: group.last().map(|s| s.index + 1).unwrap_or_default(),
                    source,
                };
                error!(query = %request.query, "{}", err);
                for slot in &group {
                    table.tombstone(slot.index);
                }
                continue;
            }
        };

        for slot in group {
            table.tombstone(slot.index);

            let Some(email) = emails.get(&slot.index) else {
                continue;
            };
            if !is_noreply_for(email, &slot.user.login, &config.noreply_domain) {
                continue;
            }
            if !seen.insert(&slot.user.id) {
                continue;
            }

            accepted.push(Resolved {
                record: CoAuthorRecord {
                    login: slot.user.login,
                    email: email.clone(),
                },
                origin: slot.origin,
            });
        }
    }

    accepted
}
