//! JSON definition format. Same document shape as XML, PascalCase keys.

use std::path::Path;

use super::file::{DocumentFormat, FileStateStore};
use crate::definition::WorkListDefinition;
use crate::error::{Error, Result};

pub fn parse(path: &Path, text: &str) -> Result<WorkListDefinition> {
    serde_json::from_str(text).map_err(|e| Error::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

pub fn render(path: &Path, definition: &WorkListDefinition) -> Result<String> {
    let mut text = serde_json::to_string_pretty(definition).map_err(|e| Error::Serialize {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    text.push('\n');
    Ok(text)
}

/// The JSON document format.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl DocumentFormat for Json {
    fn parse(path: &Path, text: &str) -> Result<WorkListDefinition> {
        parse(path, text)
    }

    fn render(path: &Path, definition: &WorkListDefinition) -> Result<String> {
        render(path, definition)
    }
}

/// State store writing the JSON format.
pub type JsonStateStore = FileStateStore<Json>;
