//! Host-facing query adapter.
//!
//! Renderers see a work list as a table of visible items. [`WorkListTable`]
//! answers ad-hoc queries over that table without touching any state.

use serde::Serialize;

use crate::definition::unique_table_id;
use crate::model::{Envelope, Status, WorkItem};
use crate::source::{QueryFilter, RowSource};
use crate::store::StateStore;
use crate::worklist::WorkList;

/// Column names, in row order.
pub const FIELDS: &[&str] = &[
    "oid",
    "table",
    "table_id",
    "status",
    "visited",
    "description",
    "extent",
];

/// One visible work item as a flat record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRow {
    pub oid: i64,
    pub table: String,
    pub table_id: i64,
    pub status: Status,
    pub visited: bool,
    pub description: String,
    pub extent: Option<Envelope>,
}

impl From<&WorkItem> for ItemRow {
    fn from(item: &WorkItem) -> Self {
        Self {
            oid: item.oid(),
            table: item.table().name.clone(),
            table_id: unique_table_id(item.table()),
            status: item.status,
            visited: item.visited,
            description: item.description.clone(),
            extent: item.extent,
        }
    }
}

/// Read-only table view over a work list's visible items.
pub struct WorkListTable<'a, S: StateStore, R: RowSource> {
    list: &'a WorkList<S, R>,
}

impl<'a, S: StateStore, R: RowSource> WorkListTable<'a, S, R> {
    pub fn new(list: &'a WorkList<S, R>) -> Self {
        Self { list }
    }

    pub fn name(&self) -> &str {
        self.list.name()
    }

    pub fn fields(&self) -> &'static [&'static str] {
        FIELDS
    }

    fn matching(&self, filter: &QueryFilter) -> impl Iterator<Item = &'a WorkItem> {
        self.list
            .items()
            .filter(move |item| filter.matches(item.oid(), item.extent.as_ref()))
    }

    pub fn search(&self, filter: &QueryFilter) -> Vec<ItemRow> {
        self.matching(filter).map(ItemRow::from).collect()
    }

    pub fn count(&self, filter: &QueryFilter) -> usize {
        self.matching(filter).count()
    }

    pub fn extent(&self) -> Option<Envelope> {
        self.list.extent()
    }
}
