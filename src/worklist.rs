//! Navigable, filterable view over work items.
//!
//! A [`WorkList`] binds a state repository to a row source. Items are rebuilt
//! from rows on every load and decorated with their persisted state; the
//! visible sequence is re-filtered through visibility and area of interest on
//! every access. The cursor is a position in that filtered sequence, not a
//! stable identity, so it is re-checked against the current length on each
//! navigation.

use std::collections::HashMap;

use opentelemetry::KeyValue;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{Envelope, GdbTableIdentity, Status, Visibility, WorkItem, WorkItemIdentity};
use crate::repository::WorkItemStateRepository;
use crate::source::{QueryFilter, RowSource, SourceRow};
use crate::store::StateStore;
use crate::telemetry::metrics;

pub struct WorkList<S: StateStore, R: RowSource> {
    name: String,
    display_name: String,
    repository: WorkItemStateRepository<S>,
    source: R,
    items: Vec<WorkItem>,
    /// Position of each loaded item in `items`.
    positions: HashMap<WorkItemIdentity, usize>,
    visibility: Visibility,
    area_of_interest: Option<Envelope>,
    current_index: Option<usize>,
}

impl<S: StateStore, R: RowSource> WorkList<S, R> {
    /// Bind a repository and a row source. Reads the persisted cursor; rows
    /// are not fetched until [`load`](Self::load) or [`reload`](Self::reload).
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        mut repository: WorkItemStateRepository<S>,
        source: R,
    ) -> Result<Self> {
        let current_index = repository
            .current_index()?
            .and_then(|i| usize::try_from(i).ok());
        Ok(Self {
            name: name.into(),
            display_name: display_name.into(),
            repository,
            source,
            items: Vec::new(),
            positions: HashMap::new(),
            visibility: Visibility::default(),
            area_of_interest: None,
            current_index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn repository(&self) -> &WorkItemStateRepository<S> {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut WorkItemStateRepository<S> {
        &mut self.repository
    }

    pub fn source(&self) -> &R {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut R {
        &mut self.source
    }

    // ---- Loading ----

    /// Fetch rows matching `filter` from every source table and upsert them by
    /// identity. Returns the number of rows read.
    ///
    /// Fails with [`Error::MissingTable`] if a table that items were taken
    /// from is no longer offered by the source. When nothing is current yet,
    /// the first visible item becomes current.
    pub async fn load(&mut self, filter: &QueryFilter) -> Result<usize> {
        // states created by single updates must be visible to refresh_item
        self.repository.refresh()?;

        let tables = self.source.tables();
        if let Some(missing) = self
            .repository
            .workspaces()
            .table_identities()
            .into_iter()
            .find(|recorded| !tables.contains(recorded))
        {
            warn!(work_list = %self.name, table = %missing, "source table no longer available");
            return Err(Error::MissingTable(missing.to_string()));
        }

        let mut loaded = 0;
        for table in tables {
            let rows = self.source.fetch(&table, filter).await?;
            debug!(table = %table, rows = rows.len(), "rows fetched");
            for row in rows {
                let item = self.build_item(&table, row)?;
                self.upsert(item);
                loaded += 1;
            }
        }

        info!(work_list = %self.name, loaded, items = self.items.len(), "work items loaded");

        if self.current_index.is_none() && self.count() > 0 {
            self.go_to(Some(0), "first")?;
        }
        Ok(loaded)
    }

    /// Replace the snapshot with every row of every source table.
    pub async fn reload(&mut self) -> Result<usize> {
        self.items.clear();
        self.positions.clear();
        self.load(&QueryFilter::all()).await
    }

    fn build_item(&mut self, table: &GdbTableIdentity, row: SourceRow) -> Result<WorkItem> {
        let identity = WorkItemIdentity::new(table.clone(), row.oid);
        let mut item = WorkItem::new(identity, row.extent);
        if let Some(status) = row.status {
            item.status = status;
        }
        if let Some(description) = row.description {
            item.description = description;
        }
        self.repository.refresh_item(&mut item)?;
        Ok(item)
    }

    fn upsert(&mut self, item: WorkItem) {
        match self.positions.get(&item.identity) {
            Some(&position) => self.items[position] = item,
            None => {
                self.positions.insert(item.identity.clone(), self.items.len());
                self.items.push(item);
            }
        }
    }

    // ---- Filtering ----

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
    }

    pub fn area_of_interest(&self) -> Option<&Envelope> {
        self.area_of_interest.as_ref()
    }

    pub fn set_area_of_interest(&mut self, area: Option<Envelope>) {
        self.area_of_interest = area;
    }

    fn is_visible(&self, item: &WorkItem) -> bool {
        if !self.visibility.admits(item.status) {
            return false;
        }
        match (&self.area_of_interest, &item.extent) {
            (Some(area), Some(extent)) => area.intersects(extent),
            _ => true,
        }
    }

    /// The visible items, filtered fresh on every call.
    pub fn items(&self) -> impl Iterator<Item = &WorkItem> + '_ {
        self.items.iter().filter(|item| self.is_visible(item))
    }

    /// Every loaded item, ignoring visibility and area of interest.
    pub fn all_items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn count(&self) -> usize {
        self.items().count()
    }

    /// Union of the visible extents; `None` when no visible item has one.
    pub fn extent(&self) -> Option<Envelope> {
        self.items()
            .filter_map(|item| item.extent)
            .reduce(|acc, extent| acc.union(&extent))
    }

    /// Positions in `self.items` of the visible items, in order.
    fn visible_positions(&self) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| self.is_visible(item))
            .map(|(position, _)| position)
            .collect()
    }

    // ---- Navigation ----

    /// Cursor into the visible sequence. May be out of range after a filter
    /// change until the next navigation.
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current(&self) -> Option<&WorkItem> {
        self.items().nth(self.current_index?)
    }

    pub fn can_go_first(&self) -> bool {
        let n = self.count();
        n > 0 && self.current_index != Some(0)
    }

    pub fn can_go_next(&self) -> bool {
        let n = self.count();
        match self.current_index {
            Some(i) => i + 1 < n,
            None => n > 0,
        }
    }

    pub fn can_go_previous(&self) -> bool {
        let n = self.count();
        matches!(self.current_index, Some(i) if i > 0 && n > 0)
    }

    /// Is there an unvisited visible item with geometry other than the current one?
    pub fn can_go_nearest(&self) -> bool {
        let current = self.current_index;
        self.items()
            .enumerate()
            .any(|(i, item)| Some(i) != current && !item.visited && item.extent.is_some())
    }

    pub fn go_first(&mut self) -> Result<()> {
        let target = (self.count() > 0).then_some(0);
        self.go_to(target, "first")
    }

    /// Clamps at the last item, never wraps.
    pub fn go_next(&mut self) -> Result<()> {
        let n = self.count();
        let target = match (self.current_index, n) {
            (_, 0) => None,
            (Some(i), _) => Some((i + 1).min(n - 1)),
            (None, _) => Some(0),
        };
        self.go_to(target, "next")
    }

    /// Clamps at the first item.
    pub fn go_previous(&mut self) -> Result<()> {
        let n = self.count();
        let target = match (self.current_index, n) {
            (_, 0) => None,
            (Some(i), _) => Some(i.saturating_sub(1).min(n - 1)),
            (None, _) => Some(0),
        };
        self.go_to(target, "previous")
    }

    /// Move to the unvisited visible item whose extent centre is closest to
    /// `reference`. Returns false and stays put when there is none.
    pub fn go_nearest(&mut self, reference: &Envelope) -> Result<bool> {
        let current = self.current_index;
        let nearest = self
            .items()
            .enumerate()
            .filter(|(i, item)| Some(*i) != current && !item.visited)
            .filter_map(|(i, item)| {
                item.extent
                    .map(|extent| (i, extent.center_distance(reference)))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);

        match nearest {
            Some(target) => {
                self.go_to(Some(target), "nearest")?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Set the cursor and mark the landed item visited. Nothing moves if the
    /// state update fails.
    fn go_to(&mut self, target: Option<usize>, direction: &'static str) -> Result<()> {
        let landed = target.and_then(|index| self.visible_positions().get(index).copied());

        if let Some(position) = landed
            && !self.items[position].visited
        {
            let mut item = self.items[position].clone();
            item.visited = true;
            self.repository.update(&item)?;
            self.items[position] = item;
        }

        self.current_index = target;
        metrics::navigation().add(1, &[KeyValue::new("direction", direction)]);
        if let Some(position) = landed {
            debug!(work_list = %self.name, oid = self.items[position].oid(), direction, "navigated");
        }
        Ok(())
    }

    // ---- Volatile state ----

    /// Set the status of the loaded item with `identity`. Returns false if no
    /// such item is loaded.
    pub fn set_status(&mut self, identity: &WorkItemIdentity, status: Status) -> Result<bool> {
        self.modify(identity, |item| item.status = status)
    }

    pub fn set_visited(&mut self, identity: &WorkItemIdentity, visited: bool) -> Result<bool> {
        self.modify(identity, |item| item.visited = visited)
    }

    pub fn set_current_status(&mut self, status: Status) -> Result<bool> {
        match self.current().map(|item| item.identity.clone()) {
            Some(identity) => self.set_status(&identity, status),
            None => Ok(false),
        }
    }

    pub fn set_current_visited(&mut self, visited: bool) -> Result<bool> {
        match self.current().map(|item| item.identity.clone()) {
            Some(identity) => self.set_visited(&identity, visited),
            None => Ok(false),
        }
    }

    fn modify(&mut self, identity: &WorkItemIdentity, change: impl FnOnce(&mut WorkItem)) -> Result<bool> {
        let Some(&position) = self.positions.get(identity) else {
            return Ok(false);
        };
        let mut item = self.items[position].clone();
        change(&mut item);
        self.repository.update(&item)?;
        self.items[position] = item;
        Ok(true)
    }

    // ---- Transactions ----

    /// Persist every volatile state together with the cursor.
    pub fn commit(&mut self) -> Result<()> {
        let index = self.current_index.and_then(|i| i32::try_from(i).ok());
        self.repository.set_current_index(index);
        self.repository.commit()
    }

    /// Drop uncommitted state and rebuild the items from the last commit.
    pub async fn discard(&mut self) -> Result<usize> {
        self.repository.discard();
        self.reload().await
    }

    /// Change the display name and the definition file stem. Commit to write
    /// the file under its new name.
    pub fn rename(&mut self, new_name: &str) -> Result<()> {
        self.repository.rename(new_name)?;
        info!(work_list = %self.name, from = %self.display_name, to = new_name, "work list renamed");
        self.display_name = new_name.to_string();
        Ok(())
    }
}
