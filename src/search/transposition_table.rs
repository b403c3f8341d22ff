//! Fixed-capacity transposition table keyed by Zobrist hash.
//!
//! Entries are kept in strict least-recently-used order: probing or storing a
//! key moves it to the front of an intrusive doubly-linked list threaded
//! through the slot vector, and a store at capacity evicts the tail. Entries
//! carry the root id of the search that produced them; probes from a later
//! root treat them as misses without evicting.

use std::collections::HashMap;

pub const DEFAULT_CAPACITY: usize = 1 << 20;

const NIL: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Exact,
    Lower,
    Upper,
}

#[derive(Debug, Clone, Copy)]
pub struct TTEntry {
    pub key: u64,
    pub depth: u8,
    pub score: i32,
    pub bound: Bound,
    pub best_move: Option<u64>,
    pub root_id: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TTStats {
    pub probes: u64,
    pub hits: u64,
    pub stores: u64,
    pub evictions: u64,
}

#[derive(Debug, Clone)]
struct Slot {
    entry: TTEntry,
    prev: usize,
    next: usize,
}

#[derive(Debug, Clone)]
pub struct TranspositionTable {
    capacity: usize,
    map: HashMap<u64, usize>,
    slots: Vec<Slot>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    stats: TTStats,
}

impl TranspositionTable {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            map: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity.min(1 << 16)),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            stats: TTStats::default(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub fn stats(&self) -> TTStats {
        self.stats
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.slots.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
        self.stats = TTStats::default();
    }

    /// Look up `key`, refreshing its recency on a hit. An entry written by a
    /// different search root is reported as a miss but kept in place.
    pub fn probe(&mut self, key: u64, root_id: u32) -> Option<TTEntry> {
        self.stats.probes += 1;
        let idx = *self.map.get(&key)?;
        if self.slots[idx].entry.root_id != root_id {
            return None;
        }

        self.detach(idx);
        self.push_front(idx);
        self.stats.hits += 1;
        Some(self.slots[idx].entry)
    }

    /// Insert or update an entry, evicting the least recently used entry when
    /// a new key arrives at capacity.
    pub fn store(&mut self, entry: TTEntry) {
        self.stats.stores += 1;

        if let Some(&idx) = self.map.get(&entry.key) {
            self.slots[idx].entry = entry;
            self.detach(idx);
            self.push_front(idx);
            return;
        }

        let idx = if self.map.len() >= self.capacity {
            // Recycle the tail slot for the incoming key.
            let tail = self.tail;
            self.detach(tail);
            self.map.remove(&self.slots[tail].entry.key);
            self.stats.evictions += 1;
            self.slots[tail].entry = entry;
            tail
        } else if let Some(free_idx) = self.free.pop() {
            self.slots[free_idx].entry = entry;
            free_idx
        } else {
            self.slots.push(Slot {
                entry,
                prev: NIL,
                next: NIL,
            });
            self.slots.len() - 1
        };

        self.map.insert(entry.key, idx);
        self.push_front(idx);
    }

    fn detach(&mut self, idx: usize) {
        let prev = self.slots[idx].prev;
        let next = self.slots[idx].next;

        if prev != NIL {
            self.slots[prev].next = next;
        } else if self.head == idx {
            self.head = next;
        }

        if next != NIL {
            self.slots[next].prev = prev;
        } else if self.tail == idx {
            self.tail = prev;
        }

        self.slots[idx].prev = NIL;
        self.slots[idx].next = NIL;
    }

    fn push_front(&mut self, idx: usize) {
        self.slots[idx].prev = NIL;
        self.slots[idx].next = self.head;
        if self.head != NIL {
            self.slots[self.head].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{Bound, TTEntry, TranspositionTable};

    fn entry(key: u64, depth: u8, score: i32, root_id: u32) -> TTEntry {
        TTEntry {
            key,
            depth,
            score,
            bound: Bound::Exact,
            best_move: None,
            root_id,
        }
    }

    #[test]
    fn store_and_probe_round_trip() {
        let mut tt = TranspositionTable::with_capacity(8);
        let e = TTEntry {
            key: 123,
            depth: 5,
            score: 42,
            bound: Bound::Lower,
            best_move: Some(99),
            root_id: 1,
        };
        tt.store(e);
        let got = tt.probe(123, 1).expect("entry should exist");
        assert_eq!(got.depth, 5);
        assert_eq!(got.score, 42);
        assert_eq!(got.bound, Bound::Lower);
        assert_eq!(got.best_move, Some(99));
    }

    #[test]
    fn stale_root_id_reads_as_miss() {
        let mut tt = TranspositionTable::with_capacity(8);
        tt.store(entry(7, 3, 10, 1));
        assert!(tt.probe(7, 2).is_none());
        // The entry itself survives for its own root.
        assert!(tt.probe(7, 1).is_some());
    }

    #[test]
    fn least_recently_used_entry_is_evicted_first() {
        let mut tt = TranspositionTable::with_capacity(2);
        tt.store(entry(1, 1, 1, 0));
        tt.store(entry(2, 1, 2, 0));
        tt.store(entry(3, 1, 3, 0));

        assert!(tt.probe(1, 0).is_none(), "oldest entry should be evicted");
        assert!(tt.probe(2, 0).is_some());
        assert!(tt.probe(3, 0).is_some());
        assert_eq!(tt.stats().evictions, 1);
    }

    #[test]
    fn probe_refreshes_recency() {
        let mut tt = TranspositionTable::with_capacity(2);
        tt.store(entry(1, 1, 1, 0));
        tt.store(entry(2, 1, 2, 0));

        // Touch key 1 so key 2 becomes the LRU victim.
        assert!(tt.probe(1, 0).is_some());
        tt.store(entry(3, 1, 3, 0));

        assert!(tt.probe(1, 0).is_some());
        assert!(tt.probe(2, 0).is_none());
        assert!(tt.probe(3, 0).is_some());
    }

    #[test]
    fn update_in_place_keeps_len_and_refreshes() {
        let mut tt = TranspositionTable::with_capacity(2);
        tt.store(entry(1, 1, 1, 0));
        tt.store(entry(2, 1, 2, 0));
        tt.store(entry(1, 4, 11, 0));
        assert_eq!(tt.len(), 2);

        tt.store(entry(3, 1, 3, 0));
        assert!(tt.probe(2, 0).is_none(), "key 2 was the LRU victim");
        assert_eq!(tt.probe(1, 0).expect("entry should exist").depth, 4);
    }

    #[test]
    fn clear_empties_the_table() {
        let mut tt = TranspositionTable::with_capacity(4);
        tt.store(entry(1, 1, 1, 0));
        tt.store(entry(2, 1, 2, 0));
        tt.clear();
        assert_eq!(tt.len(), 0);
        assert!(tt.is_empty());
        assert!(tt.probe(1, 0).is_none());
    }
}
