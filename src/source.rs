//! Row retrieval from source tables.
//!
//! The work list never owns row data. It asks a [`RowSource`] for rows of the
//! tables it was built from and turns them into work items. Fetching may be
//! I/O-bound, so it is async.

use std::collections::BTreeMap;
use std::future::Future;

use crate::error::{Error, Result};
use crate::model::{Envelope, GdbTableIdentity, Status};

/// One raw row, reduced to what a work item needs.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub oid: i64,
    pub extent: Option<Envelope>,
    /// Status column of issue tables. `None` for plain feature tables.
    pub status: Option<Status>,
    pub description: Option<String>,
}

impl SourceRow {
    pub fn new(oid: i64, extent: Option<Envelope>) -> Self {
        Self {
            oid,
            extent,
            status: None,
            description: None,
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Attribute and spatial pre-filter. Empty matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilter {
    pub object_ids: Option<Vec<i64>>,
    pub extent: Option<Envelope>,
}

impl QueryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn object_ids(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            object_ids: Some(ids.into_iter().collect()),
            extent: None,
        }
    }

    pub fn within(extent: Envelope) -> Self {
        Self {
            object_ids: None,
            extent: Some(extent),
        }
    }

    /// A row without geometry never matches a spatial filter.
    pub fn matches(&self, oid: i64, extent: Option<&Envelope>) -> bool {
        if let Some(ids) = &self.object_ids
            && !ids.contains(&oid)
        {
            return false;
        }
        match (&self.extent, extent) {
            (Some(filter), Some(extent)) => filter.intersects(extent),
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

/// Where work item rows come from.
pub trait RowSource {
    /// The tables this source can read.
    fn tables(&self) -> Vec<GdbTableIdentity>;

    /// Rows of `table` matching `filter`. A table this source does not know is
    /// [`Error::MissingTable`].
    fn fetch(
        &self,
        table: &GdbTableIdentity,
        filter: &QueryFilter,
    ) -> impl Future<Output = Result<Vec<SourceRow>>> + Send;
}

/// Rows held in memory, per table. Used by tests and the CLI.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRowSource {
    tables: BTreeMap<GdbTableIdentity, Vec<SourceRow>>,
}

impl InMemoryRowSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table, possibly without rows.
    pub fn add_table(&mut self, table: GdbTableIdentity) {
        self.tables.entry(table).or_default();
    }

    /// Insert or replace the row with the same oid.
    pub fn insert(&mut self, table: &GdbTableIdentity, row: SourceRow) {
        let rows = self.tables.entry(table.clone()).or_default();
        match rows.iter_mut().find(|r| r.oid == row.oid) {
            Some(existing) => *existing = row,
            None => rows.push(row),
        }
    }

    pub fn remove(&mut self, table: &GdbTableIdentity, oid: i64) -> Option<SourceRow> {
        let rows = self.tables.get_mut(table)?;
        let position = rows.iter().position(|r| r.oid == oid)?;
        Some(rows.remove(position))
    }

    pub fn drop_table(&mut self, table: &GdbTableIdentity) -> bool {
        self.tables.remove(table).is_some()
    }
}

impl RowSource for InMemoryRowSource {
    fn tables(&self) -> Vec<GdbTableIdentity> {
        self.tables.keys().cloned().collect()
    }

    async fn fetch(&self, table: &GdbTableIdentity, filter: &QueryFilter) -> Result<Vec<SourceRow>> {
        let rows = self
            .tables
            .get(table)
            .ok_or_else(|| Error::MissingTable(table.to_string()))?;
        Ok(rows
            .iter()
            .filter(|row| filter.matches(row.oid, row.extent.as_ref()))
            .cloned()
            .collect())
    }
}
