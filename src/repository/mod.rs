//! The work item state cache.
//!
//! Maps object ids to volatile state for an open-ended set of items, loading
//! lazily from a [`StateStore`] and writing back on commit. The cache does not
//! know how items are produced.
//!
//! # Index freshness
//!
//! A plain [`update`](WorkItemStateRepository::update) that creates a new state
//! leaves the sort index stale: [`lookup`](WorkItemStateRepository::lookup)
//! does not find that item until the next [`refresh`](WorkItemStateRepository::refresh),
//! [`update_volatile_state`](WorkItemStateRepository::update_volatile_state) or
//! [`commit`](WorkItemStateRepository::commit). Batch updates through
//! `update_volatile_state` when lookups must see the result.

mod index;

use std::path::Path;
use std::time::Instant;

use opentelemetry::KeyValue;
use tracing::{debug, info};

use self::index::StateCache;
use crate::error::Result;
use crate::model::{ItemState, WorkItem};
use crate::store::StateStore;
use crate::telemetry::metrics;
use crate::tracking::WorkspaceMap;

/// What survives a discard: the tables ever touched and the cursor.
#[derive(Debug, Default)]
struct SessionContext {
    workspaces: WorkspaceMap,
    current_index: Option<i32>,
    /// Set once the persisted cursor was read or an explicit one was set.
    index_restored: bool,
}

/// Sorted-index cache of work item states over a persisted store.
pub struct WorkItemStateRepository<S: StateStore> {
    store: S,
    cache: Option<StateCache<S::State>>,
    context: SessionContext,
}

impl<S: StateStore> WorkItemStateRepository<S> {
    /// Nothing is read until states are first needed.
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: None,
            context: SessionContext::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn location(&self) -> &Path {
        self.store.location()
    }

    pub fn workspaces(&self) -> &WorkspaceMap {
        &self.context.workspaces
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.is_some()
    }

    /// False between a state-creating `update` and the next refresh.
    pub fn is_index_fresh(&self) -> bool {
        self.cache.as_ref().is_none_or(|c| c.index.is_fresh())
    }

    /// Cursor to persist. Taken from the file on first load unless set before.
    pub fn current_index(&mut self) -> Result<Option<i32>> {
        loaded(&self.store, &mut self.cache, &mut self.context)?;
        Ok(self.context.current_index)
    }

    pub fn set_current_index(&mut self, index: Option<i32>) {
        self.context.current_index = index;
        self.context.index_restored = true;
    }

    /// All states in load/append order.
    pub fn states(&mut self) -> Result<&[S::State]> {
        let cache = loaded(&self.store, &mut self.cache, &mut self.context)?;
        Ok(&cache.states)
    }

    /// Rebuild the sort index over every state.
    pub fn refresh(&mut self) -> Result<()> {
        let cache = loaded(&self.store, &mut self.cache, &mut self.context)?;
        cache.refresh();
        Ok(())
    }

    /// Binary search for the state of `oid`. Loads states on first use but
    /// never reloads them; a miss means "use defaults".
    pub fn lookup(&mut self, oid: i64) -> Result<Option<&S::State>> {
        let cache = loaded(&self.store, &mut self.cache, &mut self.context)?;
        Ok(cache.find(oid).map(|position| &cache.states[position]))
    }

    /// Decorate `item` with its persisted state. Returns false (item left
    /// untouched) when there is none.
    pub fn refresh_item(&mut self, item: &mut WorkItem) -> Result<bool> {
        let cache = loaded(&self.store, &mut self.cache, &mut self.context)?;
        let Some(position) = cache.find(item.oid()) else {
            return Ok(false);
        };
        let state = &cache.states[position];
        item.visited = state.visited();
        self.store.refresh_core(item, state);
        Ok(true)
    }

    /// Write the item's volatile fields into its state, creating the state on
    /// first update. Records the item's table for the next commit.
    pub fn update(&mut self, item: &WorkItem) -> Result<()> {
        let cache = loaded(&self.store, &mut self.cache, &mut self.context)?;

        let position = match cache.position_for_update(item.oid()) {
            Some(position) => position,
            None => cache.append(self.store.create_state(item)),
        };

        if self.context.workspaces.track(item.table()) {
            debug!(table = %item.table(), "tracking source table");
        }

        let state = &mut cache.states[position];
        state.set_visited(item.visited);
        self.store.update_core(item, state);

        metrics::state_updates().add(1, &[]);
        Ok(())
    }

    /// Update every item, then rebuild the index so lookups see all of them.
    pub fn update_volatile_state<'a>(
        &mut self,
        items: impl IntoIterator<Item = &'a WorkItem>,
    ) -> Result<()> {
        for item in items {
            self.update(item)?;
        }
        self.refresh()
    }

    /// Build a definition from the cache and store it, then re-sort.
    pub fn commit(&mut self) -> Result<()> {
        let started = Instant::now();
        let cache = loaded(&self.store, &mut self.cache, &mut self.context)?;

        let definition = self.store.create_definition(
            &self.context.workspaces,
            &cache.states,
            self.context.current_index,
        );
        self.store.store(&definition)?;
        cache.refresh();

        info!(
            path = %self.store.location().display(),
            states = cache.states.len(),
            workspaces = self.context.workspaces.len(),
            tables = self.context.workspaces.table_count(),
            "work list state committed"
        );
        metrics::commits().add(1, &[KeyValue::new("result", "ok")]);
        metrics::commit_duration_ms().record(started.elapsed().as_secs_f64() * 1000.0, &[]);
        Ok(())
    }

    /// Drop every state held in memory. Uncommitted changes are lost; the next
    /// access reloads from the store.
    pub fn discard(&mut self) {
        if let Some(cache) = self.cache.take() {
            info!(
                path = %self.store.location().display(),
                dropped = cache.states.len(),
                "work list state discarded"
            );
        }
    }

    /// Point the store at a new file stem; commit to write it there. States
    /// are loaded from the old location first so none are lost.
    pub fn rename(&mut self, new_name: &str) -> Result<()> {
        loaded(&self.store, &mut self.cache, &mut self.context)?;
        self.store.rename(new_name);
        debug!(path = %self.store.location().display(), "work list state renamed");
        Ok(())
    }
}

/// The loaded cache, reading the store first if needed.
fn loaded<'c, S: StateStore>(
    store: &S,
    cache: &'c mut Option<StateCache<S::State>>,
    context: &mut SessionContext,
) -> Result<&'c mut StateCache<S::State>> {
    let current = match cache.take() {
        Some(current) => current,
        None => {
            let persisted = store.read_states()?;
            debug!(
                path = %store.location().display(),
                states = persisted.states.len(),
                "work list state loaded"
            );
            context.workspaces.merge_entries(&persisted.workspaces);
            if !context.index_restored {
                context.current_index = persisted.current_index;
                context.index_restored = true;
            }
            StateCache::new(persisted.states)
        }
    };
    Ok(cache.insert(current))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::PathBuf;

    use super::*;
    use crate::model::{DataSourceIdentity, GdbTableIdentity, WorkItemIdentity, WorkspaceFactory};
    use crate::store::PersistedStates;

    /// Minimal format without status.
    #[derive(Debug, Clone, PartialEq)]
    struct VisitedState {
        oid: i64,
        visited: bool,
    }

    impl ItemState for VisitedState {
        fn oid(&self) -> i64 {
            self.oid
        }
        fn visited(&self) -> bool {
            self.visited
        }
        fn set_visited(&mut self, visited: bool) {
            self.visited = visited;
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        persisted: RefCell<Vec<VisitedState>>,
        reads: RefCell<usize>,
        path: PathBuf,
    }

    impl StateStore for MemoryStore {
        type State = VisitedState;
        type Definition = Vec<VisitedState>;

        fn read_states(&self) -> Result<PersistedStates<VisitedState>> {
            *self.reads.borrow_mut() += 1;
            Ok(PersistedStates {
                states: self.persisted.borrow().clone(),
                ..PersistedStates::default()
            })
        }

        fn create_state(&self, item: &WorkItem) -> VisitedState {
            VisitedState {
                oid: item.oid(),
                visited: item.visited,
            }
        }

        fn create_definition(
            &self,
            _workspaces: &WorkspaceMap,
            states: &[VisitedState],
            _current_index: Option<i32>,
        ) -> Vec<VisitedState> {
            states.to_vec()
        }

        fn store(&self, definition: &Vec<VisitedState>) -> Result<()> {
            *self.persisted.borrow_mut() = definition.clone();
            Ok(())
        }

        fn rename(&mut self, new_name: &str) {
            self.path = PathBuf::from(new_name);
        }

        fn location(&self) -> &Path {
            &self.path
        }
    }

    fn item(oid: i64, visited: bool) -> WorkItem {
        let ds = DataSourceIdentity::new("mem", WorkspaceFactory::Custom);
        let table = GdbTableIdentity::new(ds, 1, "Points");
        let mut item = WorkItem::new(WorkItemIdentity::new(table, oid), None);
        item.visited = visited;
        item
    }

    fn repo_with(states: Vec<VisitedState>) -> WorkItemStateRepository<MemoryStore> {
        let store = MemoryStore {
            persisted: RefCell::new(states),
            ..MemoryStore::default()
        };
        WorkItemStateRepository::new(store)
    }

    #[test]
    fn states_load_lazily_once() {
        let mut repo = repo_with(vec![VisitedState { oid: 1, visited: true }]);
        assert!(!repo.is_loaded());

        assert!(repo.lookup(1).unwrap().is_some());
        assert!(repo.lookup(2).unwrap().is_none());
        repo.refresh().unwrap();
        assert_eq!(*repo.store().reads.borrow(), 1);
    }

    #[test]
    fn single_update_is_not_visible_until_refresh() {
        let mut repo = repo_with(Vec::new());
        repo.update(&item(7, true)).unwrap();

        assert!(!repo.is_index_fresh());
        assert!(repo.lookup(7).unwrap().is_none());

        repo.refresh().unwrap();
        assert_eq!(repo.lookup(7).unwrap().map(|s| s.visited), Some(true));
    }

    #[test]
    fn repeated_update_before_refresh_keeps_one_state() {
        let mut repo = repo_with(Vec::new());
        repo.update(&item(7, true)).unwrap();
        repo.update(&item(7, false)).unwrap();

        assert_eq!(repo.states().unwrap().len(), 1);
        assert!(!repo.states().unwrap()[0].visited);
    }

    #[test]
    fn refresh_item_without_state_leaves_item_alone() {
        let mut repo = repo_with(vec![VisitedState { oid: 1, visited: true }]);

        let mut unseen = item(2, false);
        assert!(!repo.refresh_item(&mut unseen).unwrap());
        assert!(!unseen.visited);

        let mut seen = item(1, false);
        assert!(repo.refresh_item(&mut seen).unwrap());
        assert!(seen.visited);
    }

    #[test]
    fn update_tracks_the_items_table() {
        let mut repo = repo_with(Vec::new());
        let it = item(3, true);
        repo.update(&it).unwrap();
        assert!(repo.workspaces().contains(it.table()));
    }

    #[test]
    fn discard_forces_reload_and_drops_unsaved_state() {
        let mut repo = repo_with(vec![VisitedState { oid: 1, visited: false }]);
        repo.update_volatile_state([&item(5, true)]).unwrap();
        assert!(repo.lookup(5).unwrap().is_some());

        repo.discard();
        assert!(!repo.is_loaded());
        assert!(repo.lookup(5).unwrap().is_none());
        assert!(repo.lookup(1).unwrap().is_some());
        assert_eq!(*repo.store().reads.borrow(), 2);
    }

    #[test]
    fn commit_stores_and_reindexes() {
        let mut repo = repo_with(Vec::new());
        repo.update(&item(9, true)).unwrap();
        repo.commit().unwrap();

        assert!(repo.is_index_fresh());
        assert!(repo.lookup(9).unwrap().is_some());
        assert_eq!(
            *repo.store().persisted.borrow(),
            vec![VisitedState { oid: 9, visited: true }]
        );
    }

    #[test]
    fn explicit_current_index_wins_over_persisted() {
        let mut repo = repo_with(Vec::new());
        repo.set_current_index(Some(4));
        assert_eq!(repo.current_index().unwrap(), Some(4));
    }
}
