//! Persistence of work item states.
//!
//! [`StateStore`] is the seam between the state cache and a concrete
//! on-disk format. The cache owns lookup, indexing and bookkeeping; a store
//! only knows how to load states, build a definition and write it.

pub mod file;
pub mod json;
pub mod xml;

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::definition::{WorkListDefinition, WorkspaceEntry};
use crate::error::{Error, Result};
use crate::model::{ItemState, WorkItem, WorkItemState};
use crate::tracking::WorkspaceMap;

pub use self::file::{DefinitionFile, DocumentFormat, FileStateStore};
pub use self::json::JsonStateStore;
pub use self::xml::XmlStateStore;

/// Everything read back from a definition: states plus the context the cache
/// keeps next to them.
#[derive(Debug, Clone)]
pub struct PersistedStates<S> {
    pub states: Vec<S>,
    pub workspaces: Vec<WorkspaceEntry>,
    pub current_index: Option<i32>,
}

impl<S> Default for PersistedStates<S> {
    fn default() -> Self {
        Self {
            states: Vec::new(),
            workspaces: Vec::new(),
            current_index: None,
        }
    }
}

impl From<WorkListDefinition> for PersistedStates<WorkItemState> {
    fn from(definition: WorkListDefinition) -> Self {
        Self {
            current_index: definition.current_index(),
            states: definition.items,
            workspaces: definition.workspaces,
        }
    }
}

/// A persisted format for work item states.
pub trait StateStore {
    type State: ItemState;
    type Definition;

    /// Load states from the persisted form. A missing file yields no states.
    fn read_states(&self) -> Result<PersistedStates<Self::State>>;

    fn create_state(&self, item: &WorkItem) -> Self::State;

    fn create_definition(
        &self,
        workspaces: &WorkspaceMap,
        states: &[Self::State],
        current_index: Option<i32>,
    ) -> Self::Definition;

    fn store(&self, definition: &Self::Definition) -> Result<()>;

    /// Copy format-specific fields from a found state onto an item.
    fn refresh_core(&self, _item: &mut WorkItem, _state: &Self::State) {}

    /// Copy format-specific fields from an item onto its state.
    fn update_core(&self, _item: &WorkItem, _state: &mut Self::State) {}

    /// Point the store at a new file stem. Nothing is written until the next
    /// store.
    fn rename(&mut self, new_name: &str);

    fn location(&self) -> &Path;
}

impl<T: StateStore + ?Sized> StateStore for Box<T> {
    type State = T::State;
    type Definition = T::Definition;

    fn read_states(&self) -> Result<PersistedStates<Self::State>> {
        (**self).read_states()
    }

    fn create_state(&self, item: &WorkItem) -> Self::State {
        (**self).create_state(item)
    }

    fn create_definition(
        &self,
        workspaces: &WorkspaceMap,
        states: &[Self::State],
        current_index: Option<i32>,
    ) -> Self::Definition {
        (**self).create_definition(workspaces, states, current_index)
    }

    fn store(&self, definition: &Self::Definition) -> Result<()> {
        (**self).store(definition)
    }

    fn refresh_core(&self, item: &mut WorkItem, state: &Self::State) {
        (**self).refresh_core(item, state)
    }

    fn update_core(&self, item: &WorkItem, state: &mut Self::State) {
        (**self).update_core(item, state)
    }

    fn rename(&mut self, new_name: &str) {
        (**self).rename(new_name)
    }

    fn location(&self) -> &Path {
        (**self).location()
    }
}

/// A store chosen at runtime.
pub type DynStateStore =
    Box<dyn StateStore<State = WorkItemState, Definition = WorkListDefinition> + Send>;

// ---------------------------------------------------------------------------
// Format selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreFormat {
    #[default]
    Xml,
    Json,
}

impl std::str::FromStr for StoreFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xml" => Ok(StoreFormat::Xml),
            "json" => Ok(StoreFormat::Json),
            other => Err(format!("unknown definition format: {other}")),
        }
    }
}

impl StoreFormat {
    fn parse(self, path: &Path, text: &str) -> Result<WorkListDefinition> {
        match self {
            StoreFormat::Xml => xml::parse(path, text),
            StoreFormat::Json => json::parse(path, text),
        }
    }
}

pub fn open_store(format: StoreFormat, file: DefinitionFile) -> DynStateStore {
    match format {
        StoreFormat::Xml => Box::new(XmlStateStore::new(file)),
        StoreFormat::Json => Box::new(JsonStateStore::new(file)),
    }
}

/// Open a store for an existing definition file, taking name and kind from
/// its header.
pub fn open_existing(path: &Path, format: StoreFormat) -> Result<(DynStateStore, WorkListDefinition)> {
    let Some(definition) = read_definition(path, format)? else {
        return Err(Error::Read {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
        });
    };
    let kind = definition.kind()?;
    let file = DefinitionFile::at(path, &definition.name, &definition.display_name, kind);
    Ok((open_store(format, file), definition))
}

/// Read a whole definition; `None` if the file does not exist.
pub fn read_definition(path: &Path, format: StoreFormat) -> Result<Option<WorkListDefinition>> {
    match file::read_text(path)? {
        Some(text) => format.parse(path, &text).map(Some),
        None => Ok(None),
    }
}

/// Connection string of the issue file geodatabase an issue work list was
/// built from.
pub fn issue_geodatabase_path(path: &Path, format: StoreFormat) -> Result<Option<String>> {
    if path.extension().is_none_or(|ext| ext != "iwl") {
        debug!(path = %path.display(), "not an issue work list");
        return Ok(None);
    }

    let Some(definition) = read_definition(path, format)? else {
        return Ok(None);
    };

    let Some(first) = definition.workspaces.first() else {
        warn!(path = %path.display(), "no workspaces referenced, the work list might be empty");
        return Ok(None);
    };
    let result = first.connection_string.clone();

    if definition.workspaces.len() > 1 {
        info!(
            path = %path.display(),
            taken = %result,
            "several issue geodatabases referenced, taking the first"
        );
        return Ok(Some(result));
    }

    if !result.to_ascii_lowercase().ends_with(".gdb") {
        debug!(path = %path.display(), workspace = %result, "not an issue file geodatabase");
        return Ok(None);
    }

    Ok(Some(result))
}
