//! Loaded states plus the sorted oid index over them.
//!
//! States are only ever appended between refreshes, so an index built before
//! an append still points at the right positions. It just does not know the
//! new tail. [`OidIndex::Stale`] records where that tail starts.

use crate::model::ItemState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OidIndex {
    /// Every state is indexed.
    Fresh(Vec<(i64, usize)>),
    /// States at `indexed..` were appended after the index was built.
    Stale {
        entries: Vec<(i64, usize)>,
        indexed: usize,
    },
}

impl OidIndex {
    pub(crate) fn build<T: ItemState>(states: &[T]) -> Self {
        let mut entries: Vec<(i64, usize)> = states
            .iter()
            .enumerate()
            .map(|(position, state)| (state.oid(), position))
            .collect();
        entries.sort_unstable();
        OidIndex::Fresh(entries)
    }

    pub(crate) fn is_fresh(&self) -> bool {
        matches!(self, OidIndex::Fresh(_))
    }

    /// Binary search. Ignores anything appended since the last build.
    pub(crate) fn find(&self, oid: i64) -> Option<usize> {
        let entries = match self {
            OidIndex::Fresh(entries) | OidIndex::Stale { entries, .. } => entries,
        };
        entries
            .binary_search_by_key(&oid, |(key, _)| *key)
            .ok()
            .map(|i| entries[i].1)
    }

    /// First position not covered by the index.
    fn indexed_len(&self, len: usize) -> usize {
        match self {
            OidIndex::Fresh(_) => len,
            OidIndex::Stale { indexed, .. } => *indexed,
        }
    }

    fn mark_appended(&mut self, position: usize) {
        if let OidIndex::Fresh(entries) = self {
            *self = OidIndex::Stale {
                entries: std::mem::take(entries),
                indexed: position,
            };
        }
    }
}

/// States in load/append order with their index.
#[derive(Debug, Clone)]
pub(crate) struct StateCache<T> {
    pub(crate) states: Vec<T>,
    pub(crate) index: OidIndex,
}

impl<T: ItemState> StateCache<T> {
    pub(crate) fn new(states: Vec<T>) -> Self {
        let index = OidIndex::build(&states);
        Self { states, index }
    }

    pub(crate) fn refresh(&mut self) {
        self.index = OidIndex::build(&self.states);
    }

    pub(crate) fn find(&self, oid: i64) -> Option<usize> {
        self.index.find(oid)
    }

    /// Like [`find`](Self::find), but also scans the unindexed tail so an item
    /// updated twice between refreshes keeps a single state.
    pub(crate) fn position_for_update(&self, oid: i64) -> Option<usize> {
        self.index.find(oid).or_else(|| {
            let from = self.index.indexed_len(self.states.len());
            self.states[from..]
                .iter()
                .position(|state| state.oid() == oid)
                .map(|offset| from + offset)
        })
    }

    pub(crate) fn append(&mut self, state: T) -> usize {
        let position = self.states.len();
        self.states.push(state);
        self.index.mark_appended(position);
        position
    }
}
