//! XML definition format.
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <WorkListDefinition>
//!   <Name>roads</Name>
//!   <DisplayName>Roads to check</DisplayName>
//!   <TypeName>SelectionWorkList</TypeName>
//!   <CurrentIndex>0</CurrentIndex>
//!   <Items>
//!     <Item OID="12" Visited="true" Status="Done"/>
//!   </Items>
//!   <Workspaces>
//!     <Workspace ConnectionString="C:/data/roads.gdb" WorkspaceFactory="FileGDB">
//!       <Table Id="3" Name="Roads"/>
//!     </Workspace>
//!   </Workspaces>
//! </WorkListDefinition>
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::file::{DocumentFormat, FileStateStore};
use crate::definition::{WorkListDefinition, WorkspaceEntry};
use crate::error::{Error, Result};
use crate::model::{Status, TableReference, WorkItemState, WorkspaceFactory};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

// ---------------------------------------------------------------------------
// Document shape
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "WorkListDefinition")]
struct XmlWorkListDefinition {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "DisplayName", default)]
    display_name: String,
    #[serde(rename = "TypeName")]
    type_name: String,
    #[serde(rename = "CurrentIndex", default = "no_current_index")]
    current_index: i32,
    #[serde(rename = "Items", default)]
    items: XmlItems,
    #[serde(rename = "Workspaces", default)]
    workspaces: XmlWorkspaces,
}

fn no_current_index() -> i32 {
    -1
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct XmlItems {
    #[serde(rename = "Item", default)]
    items: Vec<XmlWorkItemState>,
}

#[derive(Debug, Serialize, Deserialize)]
struct XmlWorkItemState {
    #[serde(rename = "@OID")]
    oid: i64,
    #[serde(rename = "@Visited")]
    visited: bool,
    #[serde(rename = "@Status")]
    status: Status,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct XmlWorkspaces {
    #[serde(rename = "Workspace", default)]
    workspaces: Vec<XmlWorkspace>,
}

#[derive(Debug, Serialize, Deserialize)]
struct XmlWorkspace {
    #[serde(rename = "@ConnectionString")]
    connection_string: String,
    #[serde(rename = "@WorkspaceFactory")]
    factory: WorkspaceFactory,
    #[serde(rename = "Table", default)]
    tables: Vec<XmlTableReference>,
}

#[derive(Debug, Serialize, Deserialize)]
struct XmlTableReference {
    #[serde(rename = "@Id")]
    id: i64,
    #[serde(rename = "@Name")]
    name: String,
}

impl From<&WorkListDefinition> for XmlWorkListDefinition {
    fn from(def: &WorkListDefinition) -> Self {
        Self {
            name: def.name.clone(),
            display_name: def.display_name.clone(),
            type_name: def.type_name.clone(),
            current_index: def.current_index,
            items: XmlItems {
                items: def
                    .items
                    .iter()
                    .map(|s| XmlWorkItemState {
                        oid: s.oid,
                        visited: s.visited,
                        status: s.status,
                    })
                    .collect(),
            },
            workspaces: XmlWorkspaces {
                workspaces: def
                    .workspaces
                    .iter()
                    .map(|ws| XmlWorkspace {
                        connection_string: ws.connection_string.clone(),
                        factory: ws.factory,
                        tables: ws
                            .tables
                            .iter()
                            .map(|t| XmlTableReference {
                                id: t.id,
                                name: t.name.clone(),
                            })
                            .collect(),
                    })
                    .collect(),
            },
        }
    }
}

impl From<XmlWorkListDefinition> for WorkListDefinition {
    fn from(xml: XmlWorkListDefinition) -> Self {
        Self {
            name: xml.name,
            display_name: xml.display_name,
            type_name: xml.type_name,
            current_index: xml.current_index,
            items: xml
                .items
                .items
                .into_iter()
                .map(|s| WorkItemState::new(s.oid, s.visited, s.status))
                .collect(),
            workspaces: xml
                .workspaces
                .workspaces
                .into_iter()
                .map(|ws| WorkspaceEntry {
                    connection_string: ws.connection_string,
                    factory: ws.factory,
                    tables: ws
                        .tables
                        .into_iter()
                        .map(|t| TableReference { id: t.id, name: t.name })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Parse XML definition text read from `path`.
pub fn parse(path: &Path, text: &str) -> Result<WorkListDefinition> {
    let xml: XmlWorkListDefinition =
        quick_xml::de::from_str(text).map_err(|e| Error::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    Ok(xml.into())
}

/// Render a definition as an indented XML document.
pub fn render(path: &Path, definition: &WorkListDefinition) -> Result<String> {
    let mut body = String::new();
    let mut serializer = quick_xml::se::Serializer::new(&mut body);
    serializer.indent(' ', 2);
    XmlWorkListDefinition::from(definition)
        .serialize(serializer)
        .map_err(|e| Error::Serialize {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    Ok(format!("{XML_DECLARATION}\n{body}\n"))
}

/// The XML document format.
#[derive(Debug, Clone, Copy, Default)]
pub struct Xml;

impl DocumentFormat for Xml {
    fn parse(path: &Path, text: &str) -> Result<WorkListDefinition> {
        parse(path, text)
    }

    fn render(path: &Path, definition: &WorkListDefinition) -> Result<String> {
        render(path, definition)
    }
}

/// State store writing the XML format.
pub type XmlStateStore = FileStateStore<Xml>;
