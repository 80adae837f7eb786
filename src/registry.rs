//! Registry of open work lists, indexed by name.
//!
//! Owned by whoever opens work lists and passed to the parts that look them
//! up. There is no process-wide instance.

use std::collections::BTreeMap;

use tracing::info;

use crate::error::{Error, Result};
use crate::source::RowSource;
use crate::store::StateStore;
use crate::worklist::WorkList;

pub struct WorkListRegistry<S: StateStore, R: RowSource> {
    work_lists: BTreeMap<String, WorkList<S, R>>,
}

impl<S: StateStore, R: RowSource> Default for WorkListRegistry<S, R> {
    fn default() -> Self {
        Self {
            work_lists: BTreeMap::new(),
        }
    }
}

impl<S: StateStore, R: RowSource> WorkListRegistry<S, R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the work list's unique name.
    pub fn add(&mut self, work_list: WorkList<S, R>) -> Result<()> {
        let name = work_list.name().to_string();
        if self.work_lists.contains_key(&name) {
            return Err(Error::DuplicateWorkList(name));
        }
        info!(work_list = %name, "work list registered");
        self.work_lists.insert(name, work_list);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&WorkList<S, R>> {
        self.work_lists.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut WorkList<S, R>> {
        self.work_lists.get_mut(name)
    }

    /// Unregister and hand back the work list. Nothing is committed.
    pub fn remove(&mut self, name: &str) -> Option<WorkList<S, R>> {
        let removed = self.work_lists.remove(name);
        if removed.is_some() {
            info!(work_list = %name, "work list removed");
        }
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.work_lists.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.work_lists.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.work_lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.work_lists.is_empty()
    }
}
