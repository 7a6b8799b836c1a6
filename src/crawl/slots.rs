// src/crawl/slots.rs
// =============================================================================
// The batch slot table: a rolling buffer of users waiting for an email
// lookup.
//
// How it is used:
// 1. The follower expander appends users at the end
// 2. The resolver looks at the first N live slots and tombstones every slot
//    it examined (accepted, rejected, or failed)
// 3. compact() drops the tombstones, keeping the survivors in order
//
// Slots only ever go live -> tombstone. Indices stay stable between two
// compactions, which is what lets bulk responses find their slot again.
//
// Rust concepts:
// - Vec<Option<T>>: None is the tombstone
// - retain(): in-place compaction that preserves order
// =============================================================================

use crate::models::CandidateUser;

#[derive(Debug, Clone)]
struct Slot {
    user: CandidateUser,
    // ordinal of the root user whose follower page produced this slot
    origin: u64,
}

/// A live slot copied out of the table for one resolver pass.
#[derive(Debug, Clone)]
pub struct PendingSlot {
    pub index: usize,
    pub user: CandidateUser,
    pub origin: u64,
}

#[derive(Debug, Default)]
pub struct BatchSlotTable {
    slots: Vec<Option<Slot>>,
}

impl BatchSlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    // Appends users produced by root number `origin`
    pub fn append(&mut self, origin: u64, users: impl IntoIterator<Item = CandidateUser>) {
        self.slots
            .extend(users.into_iter().map(|user| Some(Slot { user, origin })));
    }

    /// Marks a slot as resolved. Out-of-range indices are ignored.
    pub fn tombstone(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = None;
        }
    }

    pub fn is_tombstoned(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(None))
    }

    // Removes every tombstone, keeping live slots in insertion order
    pub fn compact(&mut self) {
        self.slots.retain(Option::is_some);
    }

    /// Total slots, tombstones included. Equals live_count() right after compact().
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    // True while any live slot came from root number `origin`
    pub fn has_origin(&self, origin: u64) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(|slot| slot.origin == origin)
    }

    // Copies out up to `limit` live slots, lowest index first
    pub fn live_slots(&self, limit: usize) -> Vec<PendingSlot> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                slot.as_ref().map(|slot| PendingSlot {
                    index,
                    user: slot.user.clone(),
                    origin: slot.origin,
                })
            })
            .take(limit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users(names: &[&str]) -> Vec<CandidateUser> {
        names
            .iter()
            .map(|n| CandidateUser::new(format!("id-{}", n), *n))
            .collect()
    }

    fn logins(table: &BatchSlotTable) -> Vec<String> {
        table
            .live_slots(usize::MAX)
            .into_iter()
            .map(|s| s.user.login)
            .collect()
    }

    #[test]
    fn test_compact_preserves_order() {
        let mut table = BatchSlotTable::new();
        table.append(1, users(&["a", "b", "c", "d", "e"]));

        table.tombstone(0);
        table.tombstone(2);
        table.tombstone(4);
        assert_eq!(table.len(), 5);
        assert_eq!(table.live_count(), 2);

        table.compact();
        assert_eq!(table.len(), 2);
        assert_eq!(logins(&table), vec!["b", "d"]);
    }

    #[test]
    fn test_indices_are_stable_until_compact() {
        let mut table = BatchSlotTable::new();
        table.append(1, users(&["a", "b", "c"]));
        table.tombstone(1);

        let live = table.live_slots(10);
        let indices: Vec<usize> = live.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert!(table.is_tombstoned(1));
        assert!(!table.is_tombstoned(2));
    }

    #[test]
    fn test_live_slots_respects_limit() {
        let mut table = BatchSlotTable::new();
        table.append(1, users(&["a", "b", "c", "d"]));
        table.tombstone(0);

        let live = table.live_slots(2);
        assert_eq!(live.len(), 2);
        assert_eq!(live[0].user.login, "b");
        assert_eq!(live[1].user.login, "c");
    }

    #[test]
    fn test_origin_tracking() {
        let mut table = BatchSlotTable::new();
        table.append(1, users(&["a"]));
        table.append(2, users(&["b"]));
        assert!(table.has_origin(1));

        table.tombstone(0);
        assert!(!table.has_origin(1));
        assert!(table.has_origin(2));
    }

    #[test]
    fn test_tombstone_out_of_range_is_ignored() {
        let mut table = BatchSlotTable::new();
        table.tombstone(3);
        assert!(table.is_empty());
        assert!(!table.is_tombstoned(3));
    }
}
