//! Integration tests for definition formats and file helpers.

use std::path::Path;

use worklist::definition::{WorkListDefinition, WorkListKind, WorkspaceEntry};
use worklist::error::Error;
use worklist::model::*;
use worklist::repository::WorkItemStateRepository;
use worklist::store::{self, DefinitionFile, JsonStateStore, StateStore, StoreFormat};

fn write_definition(path: &Path, format: StoreFormat, def: &WorkListDefinition) {
    let text = match format {
        StoreFormat::Xml => store::xml::render(path, def).unwrap(),
        StoreFormat::Json => store::json::render(path, def).unwrap(),
    };
    std::fs::write(path, text).unwrap();
}

fn issue_definition(connections: &[&str]) -> WorkListDefinition {
    let mut def = WorkListDefinition::empty("issues", "Issues", WorkListKind::Issue);
    for conn in connections {
        def.workspaces.push(WorkspaceEntry {
            connection_string: conn.to_string(),
            factory: WorkspaceFactory::FileGdb,
            tables: vec![TableReference { id: -1, name: "IssuePolygons".into() }],
        });
    }
    def
}

// ---------------------------------------------------------------------------
// JSON store
// ---------------------------------------------------------------------------

#[test]
fn json_store_round_trips_states_and_tables() {
    let dir = tempfile::tempdir().unwrap();
    let file = DefinitionFile::new(dir.path(), "roads", "Roads", WorkListKind::Selection);
    let ds = DataSourceIdentity::new("C:/data/roads.gdb", WorkspaceFactory::FileGdb);
    let table = GdbTableIdentity::new(ds, 3, "Roads");

    let mut repo = WorkItemStateRepository::new(JsonStateStore::new(file.clone()));
    let mut item = WorkItem::new(WorkItemIdentity::new(table.clone(), 42), None);
    item.visited = true;
    item.status = Status::Done;
    repo.update_volatile_state([&item]).unwrap();
    repo.commit().unwrap();

    let text = std::fs::read_to_string(file.path()).unwrap();
    assert!(text.contains(r#""OID": 42"#));
    assert!(text.contains(r#""WorkspaceFactory": "FileGDB""#));

    let def = store::read_definition(file.path(), StoreFormat::Json).unwrap().unwrap();
    assert_eq!(def.items, vec![WorkItemState::new(42, true, Status::Done)]);
    assert_eq!(def.table_identities(), vec![table]);
    assert_eq!(def.current_index(), None);
}

#[test]
fn both_formats_read_back_the_same_definition() {
    let dir = tempfile::tempdir().unwrap();
    let mut def = issue_definition(&["C:/qa/issues.gdb"]);
    def.items.push(WorkItemState::new(1, true, Status::Done));
    def.items.push(WorkItemState::new(2, false, Status::Todo));
    def.set_current_index(Some(1));

    for (format, name) in [(StoreFormat::Xml, "a.iwl"), (StoreFormat::Json, "b.iwl")] {
        let path = dir.path().join(name);
        write_definition(&path, format, &def);
        let read = store::read_definition(&path, format).unwrap().unwrap();
        assert_eq!(read, def);
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn malformed_file_is_an_error_naming_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.swl");
    std::fs::write(&path, "this is not xml").unwrap();

    let file = DefinitionFile::at(&path, "broken", "Broken", WorkListKind::Selection);
    let mut repo = WorkItemStateRepository::new(store::open_store(StoreFormat::Xml, file));

    match repo.states() {
        Err(Error::Malformed { path: reported, .. }) => assert_eq!(reported, path),
        Err(other) => panic!("expected Malformed, got {other:?}"),
        Ok(_) => panic!("expected Malformed, got states"),
    }
}

#[test]
fn open_existing_takes_header_and_rejects_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("issues.iwl");
    write_definition(&path, StoreFormat::Xml, &issue_definition(&["C:/qa/issues.gdb"]));

    let (opened, def) = store::open_existing(&path, StoreFormat::Xml).unwrap();
    assert_eq!(opened.location(), path);
    assert_eq!(def.kind().unwrap(), WorkListKind::Issue);

    let missing = store::open_existing(&dir.path().join("nope.iwl"), StoreFormat::Xml);
    assert!(matches!(missing, Err(Error::Read { .. })));
}

#[test]
fn unknown_type_name_is_rejected_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("odd.swl");
    let mut def = WorkListDefinition::empty("odd", "Odd", WorkListKind::Selection);
    def.type_name = "ProductionModelIssueWorkList".into();
    write_definition(&path, StoreFormat::Xml, &def);

    let result = store::open_existing(&path, StoreFormat::Xml);
    assert!(matches!(result, Err(Error::UnknownKind(name)) if name == "ProductionModelIssueWorkList"));
}

// ---------------------------------------------------------------------------
// Issue geodatabase
// ---------------------------------------------------------------------------

#[test]
fn issue_geodatabase_is_the_single_fgdb_workspace() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("issues.iwl");
    write_definition(&path, StoreFormat::Xml, &issue_definition(&["C:/qa/Issues.GDB"]));

    let gdb = store::issue_geodatabase_path(&path, StoreFormat::Xml).unwrap();
    assert_eq!(gdb.as_deref(), Some("C:/qa/Issues.GDB"));
}

#[test]
fn issue_geodatabase_takes_first_of_several() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("issues.iwl");
    write_definition(
        &path,
        StoreFormat::Xml,
        &issue_definition(&["C:/qa/first.gdb", "C:/qa/second.gdb"]),
    );

    let gdb = store::issue_geodatabase_path(&path, StoreFormat::Xml).unwrap();
    assert_eq!(gdb.as_deref(), Some("C:/qa/first.gdb"));
}

#[test]
fn issue_geodatabase_absent_cases() {
    let dir = tempfile::tempdir().unwrap();

    // not an issue work list
    let selection = dir.path().join("roads.swl");
    write_definition(&selection, StoreFormat::Xml, &issue_definition(&["C:/qa/issues.gdb"]));
    assert_eq!(store::issue_geodatabase_path(&selection, StoreFormat::Xml).unwrap(), None);

    // no file
    let missing = dir.path().join("missing.iwl");
    assert_eq!(store::issue_geodatabase_path(&missing, StoreFormat::Xml).unwrap(), None);

    // no workspaces
    let empty = dir.path().join("empty.iwl");
    write_definition(&empty, StoreFormat::Xml, &issue_definition(&[]));
    assert_eq!(store::issue_geodatabase_path(&empty, StoreFormat::Xml).unwrap(), None);

    // enterprise geodatabase
    let sde = dir.path().join("sde.iwl");
    write_definition(&sde, StoreFormat::Xml, &issue_definition(&["C:/conn/prod.sde"]));
    assert_eq!(store::issue_geodatabase_path(&sde, StoreFormat::Xml).unwrap(), None);
}

#[test]
fn format_parses_case_insensitively() {
    assert_eq!("XML".parse::<StoreFormat>().unwrap(), StoreFormat::Xml);
    assert_eq!("json".parse::<StoreFormat>().unwrap(), StoreFormat::Json);
    assert!("yaml".parse::<StoreFormat>().is_err());
}
