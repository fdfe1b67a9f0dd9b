use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::model::{MapCounts, MapDocument};

const INDENT: &[u8] = b"    ";

#[derive(Default)]
pub struct MapWriter {}

impl MapWriter {
    pub fn new() -> Self {
        Self {}
    }

    /// Loads a previously written document as untyped JSON.
    ///
    /// Any JSON object is accepted as is. A missing file yields `None`. A file
    /// that cannot be read, is not JSON, or holds JSON other than an object
    /// also yields `None` with a warning, so the run starts from a fresh
    /// document.
    pub fn read_existing(&self, path: &Path) -> Option<MapDocument> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Could not read existing output {:?}: {}", path, e);
                tracing::warn!("A new output file will be created");
                return None;
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(document)) => {
                tracing::info!("Found existing output {:?}, merging into it", path);
                Some(document)
            }
            Ok(other) => {
                tracing::warn!(
                    "Existing output {:?} is not a JSON object (found {})",
                    path,
                    json_kind(&other)
                );
                tracing::warn!("A new output file will be created");
                None
            }
            Err(e) => {
                tracing::warn!("Could not parse existing output {:?}: {}", path, e);
                tracing::warn!("A new output file will be created");
                None
            }
        }
    }

    /// Writes `document` as 4-space indented JSON.
    ///
    /// The document is staged in a temporary file in the target directory and
    /// renamed over `path`, so a failure leaves any previous file intact.
    pub fn write(&self, document: &MapDocument, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let staged = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
        {
            let mut writer = BufWriter::new(staged.as_file());
            let mut serializer =
                serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(INDENT));
            document.serialize(&mut serializer)?;
            writer.flush().map_err(|e| Error::io(staged.path(), e))?;
        }
        staged
            .persist(path)
            .map_err(|e| Error::io(path, e.error))?;

        tracing::info!("Wrote {} to {:?}", MapCounts::of_document(document), path);
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
