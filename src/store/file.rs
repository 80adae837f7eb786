//! Definition file location and raw I/O shared by all formats.

use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{PersistedStates, StateStore};
use crate::definition::{WorkListDefinition, WorkListKind, definition_path};
use crate::error::{Error, Result};
use crate::model::{WorkItem, WorkItemState};
use crate::tracking::WorkspaceMap;

/// Where a work list's definition lives and what goes into its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionFile {
    path: PathBuf,
    name: String,
    display_name: String,
    kind: WorkListKind,
}

impl DefinitionFile {
    /// File in `dir` named after the work list, with the kind's extension.
    pub fn new(dir: &Path, name: &str, display_name: &str, kind: WorkListKind) -> Self {
        Self::at(definition_path(dir, name, kind), name, display_name, kind)
    }

    /// File at an explicit path.
    pub fn at(path: impl Into<PathBuf>, name: &str, display_name: &str, kind: WorkListKind) -> Self {
        Self {
            path: path.into(),
            name: name.to_string(),
            display_name: display_name.to_string(),
            kind,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn kind(&self) -> WorkListKind {
        self.kind
    }

    /// Swap the file stem for `new_name`, keeping directory and extension.
    /// The file itself is not touched; the next commit writes the new path.
    pub fn rename(&mut self, new_name: &str) {
        let file_name = match self.path.extension() {
            Some(ext) => format!("{new_name}.{}", ext.to_string_lossy()),
            None => new_name.to_string(),
        };
        self.path = self.path.with_file_name(file_name);
        self.display_name = new_name.to_string();
    }

    /// Definition built from the cache content.
    pub fn build_definition(
        &self,
        workspaces: &WorkspaceMap,
        states: &[WorkItemState],
        current_index: Option<i32>,
    ) -> WorkListDefinition {
        let mut definition = WorkListDefinition::empty(&self.name, &self.display_name, self.kind);
        definition.set_current_index(current_index);
        definition.items = states.to_vec();
        definition.workspaces = workspaces.entries();
        definition
    }

    pub fn read_text(&self) -> Result<Option<String>> {
        read_text(&self.path)
    }

    pub fn write_atomic(&self, text: &str) -> Result<()> {
        write_atomic(&self.path, text)
    }
}

/// File content, or `None` if the file does not exist yet.
pub fn read_text(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no work list definition yet");
            Ok(None)
        }
        Err(source) => Err(Error::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write to a sibling temp file, then rename over the target.
pub fn write_atomic(path: &Path, text: &str) -> Result<()> {
    let write_err = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, text).map_err(write_err)?;
    std::fs::rename(&tmp, path).map_err(write_err)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Text encoding of a whole definition document.
pub trait DocumentFormat {
    fn parse(path: &Path, text: &str) -> Result<WorkListDefinition>;

    fn render(path: &Path, definition: &WorkListDefinition) -> Result<String>;
}

/// State store keeping the definition in a single file encoded with `F`.
#[derive(Debug)]
pub struct FileStateStore<F> {
    file: DefinitionFile,
    format: PhantomData<fn() -> F>,
}

impl<F> Clone for FileStateStore<F> {
    fn clone(&self) -> Self {
        Self::new(self.file.clone())
    }
}

impl<F> FileStateStore<F> {
    pub fn new(file: DefinitionFile) -> Self {
        Self {
            file,
            format: PhantomData,
        }
    }

    pub fn file(&self) -> &DefinitionFile {
        &self.file
    }
}

impl<F: DocumentFormat> StateStore for FileStateStore<F> {
    type State = WorkItemState;
    type Definition = WorkListDefinition;

    fn read_states(&self) -> Result<PersistedStates<WorkItemState>> {
        match self.file.read_text()? {
            Some(text) => Ok(F::parse(self.file.path(), &text)?.into()),
            None => Ok(PersistedStates::default()),
        }
    }

    fn create_state(&self, item: &WorkItem) -> WorkItemState {
        WorkItemState::new(item.oid(), item.visited, item.status)
    }

    fn create_definition(
        &self,
        workspaces: &WorkspaceMap,
        states: &[WorkItemState],
        current_index: Option<i32>,
    ) -> WorkListDefinition {
        self.file.build_definition(workspaces, states, current_index)
    }

    fn store(&self, definition: &WorkListDefinition) -> Result<()> {
        let text = F::render(self.file.path(), definition)?;
        self.file.write_atomic(&text)
    }

    /// The persisted status wins over the row status, for every kind.
    fn refresh_core(&self, item: &mut WorkItem, state: &WorkItemState) {
        item.status = state.status;
    }

    fn update_core(&self, item: &WorkItem, state: &mut WorkItemState) {
        state.status = item.status;
    }

    fn rename(&mut self, new_name: &str) {
        self.file.rename(new_name);
    }

    fn location(&self) -> &Path {
        self.file.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_replaces_stem_only() {
        let mut file = DefinitionFile::new(Path::new("/lists"), "stateRepo", "display", WorkListKind::Issue);
        assert_eq!(file.path(), Path::new("/lists/stateRepo.iwl"));

        file.rename("Run to the Hills");
        assert_eq!(file.path(), Path::new("/lists/Run to the Hills.iwl"));
        assert_eq!(file.display_name(), "Run to the Hills");
        assert_eq!(file.name(), "stateRepo");
    }

    #[test]
    fn issue_store_restores_the_persisted_status() {
        use crate::model::{DataSourceIdentity, GdbTableIdentity, Status, WorkItemIdentity, WorkspaceFactory};
        use crate::store::json::Json;

        let dir = tempfile::tempdir().unwrap();
        let file = DefinitionFile::new(dir.path(), "issues", "QA issues", WorkListKind::Issue);
        let store = FileStateStore::<Json>::new(file);

        let ds = DataSourceIdentity::new("C:/qa/issues.gdb", WorkspaceFactory::FileGdb);
        let table = GdbTableIdentity::new(ds, -1, "IssuePoints");
        let mut item = WorkItem::new(WorkItemIdentity::new(table, 4), None);
        assert_eq!(item.status, Status::Todo);

        store.refresh_core(&mut item, &WorkItemState::new(4, true, Status::Done));
        assert_eq!(item.status, Status::Done);
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let text = read_text(&dir.path().join("absent.swl")).unwrap();
        assert!(text.is_none());
    }

    #[test]
    fn write_atomic_creates_parent_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("list.swl");
        write_atomic(&path, "content").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "content");
        assert!(!dir.path().join("nested").join("list.swl.tmp").exists());
    }
}
