//! Which source tables the items touched so far belong to.
//!
//! Populated incrementally on every state update and never pruned within a
//! session: a table stays recorded after its items are filtered out, so the
//! next commit still writes what is needed to reopen it.

use std::collections::{BTreeMap, BTreeSet};

use crate::definition::WorkspaceEntry;
use crate::model::{DataSourceIdentity, GdbTableIdentity, TableReference};

/// Data source -> tables. Ordered, so commits are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceMap {
    tables: BTreeMap<DataSourceIdentity, BTreeSet<TableReference>>,
}

impl WorkspaceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `table` under its data source. Returns true if it was new.
    pub fn track(&mut self, table: &GdbTableIdentity) -> bool {
        self.tables
            .entry(table.data_source.clone())
            .or_default()
            .insert(table.reference())
    }

    /// Merge entries read from a definition file.
    pub fn merge_entries(&mut self, entries: &[WorkspaceEntry]) {
        for entry in entries {
            let tables = self.tables.entry(entry.data_source()).or_default();
            tables.extend(entry.tables.iter().cloned());
        }
    }

    pub fn contains(&self, table: &GdbTableIdentity) -> bool {
        self.tables
            .get(&table.data_source)
            .is_some_and(|tables| tables.contains(&table.reference()))
    }

    /// Number of data sources.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table_count(&self) -> usize {
        self.tables.values().map(BTreeSet::len).sum()
    }

    /// Every recorded table, ordered by data source.
    pub fn table_identities(&self) -> Vec<GdbTableIdentity> {
        self.tables
            .iter()
            .flat_map(|(data_source, tables)| {
                tables
                    .iter()
                    .map(|table| GdbTableIdentity::new(data_source.clone(), table.id, table.name.clone()))
            })
            .collect()
    }

    /// Persistable form, one entry per data source.
    pub fn entries(&self) -> Vec<WorkspaceEntry> {
        self.tables
            .iter()
            .map(|(data_source, tables)| WorkspaceEntry {
                connection_string: data_source.connection_string.clone(),
                factory: data_source.factory,
                tables: tables.iter().cloned().collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WorkspaceFactory;

    fn table(conn: &str, id: i64, name: &str) -> GdbTableIdentity {
        GdbTableIdentity::new(DataSourceIdentity::new(conn, WorkspaceFactory::FileGdb), id, name)
    }

    #[test]
    fn track_groups_tables_by_data_source() {
        let mut map = WorkspaceMap::new();
        assert!(map.track(&table("b.gdb", 1, "Roads")));
        assert!(map.track(&table("a.gdb", 2, "Rivers")));
        assert!(map.track(&table("b.gdb", 3, "Bridges")));
        assert!(!map.track(&table("b.gdb", 1, "Roads")));

        assert_eq!(map.len(), 2);
        assert_eq!(map.table_count(), 3);

        let entries = map.entries();
        assert_eq!(entries[0].connection_string, "a.gdb");
        assert_eq!(entries[1].tables.len(), 2);
        assert_eq!(entries[1].tables[0].name, "Roads");
    }

    #[test]
    fn merge_keeps_previously_tracked_tables() {
        let mut map = WorkspaceMap::new();
        map.track(&table("a.gdb", 1, "Roads"));

        map.merge_entries(&[WorkspaceEntry {
            connection_string: "a.gdb".into(),
            factory: WorkspaceFactory::FileGdb,
            tables: vec![TableReference { id: 2, name: "Rivers".into() }],
        }]);

        assert!(map.contains(&table("a.gdb", 1, "Roads")));
        assert!(map.contains(&table("a.gdb", 2, "Rivers")));
        assert_eq!(map.table_count(), 2);
        assert_eq!(
            map.table_identities(),
            vec![table("a.gdb", 1, "Roads"), table("a.gdb", 2, "Rivers")]
        );
    }
}
