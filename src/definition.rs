//! The persisted work list definition and naming helpers.
//!
//! A definition is the file-level aggregate: name, type, cursor, the volatile
//! item states and the workspaces (data sources plus tables) needed to reopen
//! the source tables on the next load. It holds no live data-source handles.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    DataSourceIdentity, GdbTableIdentity, TableReference, WorkItemState, WorkspaceFactory,
};

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

/// The flavour of work list, which decides the file extension and where an
/// item's status comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkListKind {
    /// Hand-picked features. Status lives only in the definition file.
    Selection,
    /// Rows of an issue table. Status is a column of the source row.
    Issue,
}

impl WorkListKind {
    pub fn type_name(self) -> &'static str {
        match self {
            WorkListKind::Selection => "SelectionWorkList",
            WorkListKind::Issue => "IssueWorkList",
        }
    }

    pub fn from_type_name(type_name: &str) -> Result<Self> {
        match type_name {
            "SelectionWorkList" => Ok(WorkListKind::Selection),
            "IssueWorkList" => Ok(WorkListKind::Issue),
            other => Err(Error::UnknownKind(other.to_string())),
        }
    }

    pub fn file_extension(self) -> &'static str {
        match self {
            WorkListKind::Selection => "swl",
            WorkListKind::Issue => "iwl",
        }
    }
}

// ---------------------------------------------------------------------------
// Definition
// ---------------------------------------------------------------------------

/// One data source and the tables of it that items were taken from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceEntry {
    #[serde(rename = "ConnectionString")]
    pub connection_string: String,
    #[serde(rename = "WorkspaceFactory")]
    pub factory: WorkspaceFactory,
    #[serde(rename = "Tables", default)]
    pub tables: Vec<TableReference>,
}

impl WorkspaceEntry {
    pub fn data_source(&self) -> DataSourceIdentity {
        DataSourceIdentity::new(self.connection_string.clone(), self.factory)
    }
}

/// The serializable aggregate written to and read from the definition file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkListDefinition {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "DisplayName", default)]
    pub display_name: String,
    #[serde(rename = "TypeName")]
    pub type_name: String,
    /// -1 means no current item.
    #[serde(rename = "CurrentIndex", default = "no_current_index")]
    pub current_index: i32,
    #[serde(rename = "Items", default)]
    pub items: Vec<WorkItemState>,
    #[serde(rename = "Workspaces", default)]
    pub workspaces: Vec<WorkspaceEntry>,
}

fn no_current_index() -> i32 {
    -1
}

impl WorkListDefinition {
    /// A well-formed definition without any state.
    pub fn empty(name: impl Into<String>, display_name: impl Into<String>, kind: WorkListKind) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            type_name: kind.type_name().to_string(),
            current_index: -1,
            items: Vec::new(),
            workspaces: Vec::new(),
        }
    }

    pub fn kind(&self) -> Result<WorkListKind> {
        WorkListKind::from_type_name(&self.type_name)
    }

    pub fn current_index(&self) -> Option<i32> {
        (self.current_index >= 0).then_some(self.current_index)
    }

    pub fn set_current_index(&mut self, index: Option<i32>) {
        self.current_index = index.filter(|i| *i >= 0).unwrap_or(-1);
    }

    /// Every table recorded in the file, ready to be reopened.
    pub fn table_identities(&self) -> Vec<GdbTableIdentity> {
        self.workspaces
            .iter()
            .flat_map(|ws| {
                let data_source = ws.data_source();
                ws.tables
                    .iter()
                    .map(move |t| GdbTableIdentity::new(data_source.clone(), t.id, t.name.clone()))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

/// Path of the definition file for a work list.
pub fn definition_path(dir: &Path, name: &str, kind: WorkListKind) -> PathBuf {
    dir.join(format!("{name}.{}", kind.file_extension()))
}

/// Work list name from a file path, stripping directories and up to two
/// extensions (`dir/NAME.xml.wl` gives `NAME`).
pub fn get_name(path: &str) -> String {
    let file = path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    strip_extension(strip_extension(file)).to_string()
}

/// Work list name from a layer URI such as `worklist://localhost/NAME.swl?x`.
pub fn parse_name(layer_uri: &str) -> Result<String> {
    let Some((_, last)) = layer_uri.rsplit_once('/') else {
        return Err(Error::InvalidUri(layer_uri.to_string()));
    };
    let last = last.split(['?', '#']).next().unwrap_or_default();
    Ok(strip_extension(last).to_string())
}

fn strip_extension(file: &str) -> &str {
    match file.rfind('.') {
        Some(i) if i > 0 => &file[..i],
        _ => file,
    }
}

/// Table id that stays unique across workspaces and stable across processes.
///
/// Unregistered tables (`id < 0`) hash the name only so a moved workspace
/// still resolves.
pub fn unique_table_id(table: &GdbTableIdentity) -> i64 {
    let hash = hash_name(&table.name);
    if table.id < 0 {
        return hash;
    }
    hash.wrapping_mul(31).wrapping_add(table.id)
}

fn hash_name(text: &str) -> i64 {
    text.encode_utf16()
        .fold(23_i64, |hash, c| hash.wrapping_mul(31).wrapping_add(i64::from(c)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_name_strips_directories_and_two_extensions() {
        assert_eq!(get_name("C:\\work\\lists\\Roads.xml.wl"), "Roads");
        assert_eq!(get_name("/tmp/lists/Run to the Hills.swl"), "Run to the Hills");
        assert_eq!(get_name("plain"), "plain");
        assert_eq!(get_name(""), "");
    }

    #[test]
    fn parse_name_takes_last_uri_segment() {
        assert_eq!(
            parse_name("worklist://localhost/Buildings.iwl?unused&for#now").unwrap(),
            "Buildings"
        );
        assert!(matches!(parse_name("no-slash"), Err(Error::InvalidUri(_))));
    }

    #[test]
    fn unique_table_id_is_stable_and_id_sensitive() {
        let ds = DataSourceIdentity::new("C:/a.gdb", WorkspaceFactory::FileGdb);
        let unregistered = GdbTableIdentity::new(ds.clone(), -1, "ab");
        // 23 * 31 + 'a' = 810, 810 * 31 + 'b' = 25208
        assert_eq!(unique_table_id(&unregistered), 25208);

        let registered = GdbTableIdentity::new(ds, 4, "ab");
        assert_eq!(unique_table_id(&registered), 25208 * 31 + 4);
    }

    #[test]
    fn kind_round_trips_type_name() {
        for kind in [WorkListKind::Selection, WorkListKind::Issue] {
            assert_eq!(WorkListKind::from_type_name(kind.type_name()).unwrap(), kind);
        }
        assert!(matches!(
            WorkListKind::from_type_name("DbStatusWorkList"),
            Err(Error::UnknownKind(_))
        ));
    }

    #[test]
    fn negative_current_index_means_none() {
        let mut def = WorkListDefinition::empty("a", "A", WorkListKind::Selection);
        assert_eq!(def.current_index(), None);
        def.set_current_index(Some(3));
        assert_eq!(def.current_index, 3);
        def.set_current_index(None);
        assert_eq!(def.current_index, -1);
    }
}
