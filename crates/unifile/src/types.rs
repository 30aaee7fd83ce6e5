use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Open key-value metadata attached to every unit.
///
/// Ordered so that serialized rows are stable across runs.
pub type UnitMetadata = BTreeMap<String, serde_json::Value>;

/// Logical category of an extracted unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    File,
    Page,
    Slide,
    Sheet,
    Table,
    Image,
    Audio,
    Video,
    Frame,
    Chunk,
    Cell,
    Attachment,
    Segment,
    /// A typed text block (heading, paragraph, list item, code).
    Block,
}

impl UnitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitType::File => "file",
            UnitType::Page => "page",
            UnitType::Slide => "slide",
            UnitType::Sheet => "sheet",
            UnitType::Table => "table",
            UnitType::Image => "image",
            UnitType::Audio => "audio",
            UnitType::Video => "video",
            UnitType::Frame => "frame",
            UnitType::Chunk => "chunk",
            UnitType::Cell => "cell",
            UnitType::Attachment => "attachment",
            UnitType::Segment => "segment",
            UnitType::Block => "block",
        }
    }
}

impl std::fmt::Display for UnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Ok,
    Error,
}

impl UnitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Ok => "ok",
            UnitStatus::Error => "error",
        }
    }
}

/// The atomic extracted record.
///
/// Units are built only through [`Unit::ok`] and [`Unit::error`], which keep
/// `char_count` equal to the character length of `content` and always carry a
/// (possibly empty) metadata map. Once returned from an extractor a unit is not
/// mutated except by the dispatcher's metadata enrichment, which only adds keys.
///
/// Deserialized units go through the same rules: `char_count` is recomputed from
/// `content`, and `error` must be present exactly when `status` is `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawUnit")]
pub struct Unit {
    source_path: PathBuf,
    source_name: String,
    file_type: String,
    unit_type: UnitType,
    unit_id: String,
    content: String,
    char_count: usize,
    metadata: UnitMetadata,
    status: UnitStatus,
    error: Option<String>,
}

impl Unit {
    /// Create a successful unit for content extracted from `source`.
    pub fn ok(
        source: &Path,
        file_type: impl Into<String>,
        unit_type: UnitType,
        unit_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        let (source_path, source_name) = provenance(source);
        Self {
            source_path,
            source_name,
            file_type: file_type.into(),
            unit_type,
            unit_id: unit_id.into(),
            char_count: content.chars().count(),
            content,
            metadata: UnitMetadata::new(),
            status: UnitStatus::Ok,
            error: None,
        }
    }

    /// Create an error unit. Content is empty and `error` carries the message.
    pub fn error(
        source: &Path,
        file_type: impl Into<String>,
        unit_type: UnitType,
        unit_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let (source_path, source_name) = provenance(source);
        let message = message.into();
        Self {
            source_path,
            source_name,
            file_type: file_type.into(),
            unit_type,
            unit_id: unit_id.into(),
            content: String::new(),
            char_count: 0,
            metadata: UnitMetadata::new(),
            status: UnitStatus::Error,
            error: Some(if message.is_empty() { "unknown error".to_string() } else { message }),
        }
    }

    /// Error unit for a failure that hit the whole file rather than one part of it.
    pub fn file_failure(source: &Path, file_type: impl Into<String>, err: &crate::UnifileError) -> Self {
        Self::error(source, file_type, UnitType::File, "body", err.to_string()).with_metadata("exception", err.kind())
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_metadata_map(mut self, metadata: UnitMetadata) -> Self {
        self.metadata.extend(metadata);
        self
    }

    /// Insert a key only if it is not already present. Returns whether it was inserted.
    pub(crate) fn insert_metadata_if_absent(&mut self, key: &str, value: serde_json::Value) -> bool {
        if self.metadata.contains_key(key) {
            return false;
        }
        self.metadata.insert(key.to_string(), value);
        true
    }

    pub(crate) fn set_metadata(&mut self, key: &str, value: serde_json::Value) {
        self.metadata.insert(key.to_string(), value);
    }

    pub(crate) fn fill_file_type(&mut self, file_type: &str) {
        if self.file_type.is_empty() {
            self.file_type = file_type.to_string();
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn file_type(&self) -> &str {
        &self.file_type
    }

    pub fn unit_type(&self) -> UnitType {
        self.unit_type
    }

    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn char_count(&self) -> usize {
        self.char_count
    }

    pub fn metadata(&self) -> &UnitMetadata {
        &self.metadata
    }

    pub fn status(&self) -> UnitStatus {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_ok(&self) -> bool {
        self.status == UnitStatus::Ok
    }
}

#[derive(Deserialize)]
struct RawUnit {
    source_path: PathBuf,
    source_name: String,
    file_type: String,
    unit_type: UnitType,
    unit_id: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    metadata: UnitMetadata,
    status: UnitStatus,
    #[serde(default)]
    error: Option<String>,
}

impl TryFrom<RawUnit> for Unit {
    type Error = String;

    fn try_from(raw: RawUnit) -> std::result::Result<Self, Self::Error> {
        let error = match (raw.status, raw.error) {
            (UnitStatus::Ok, None) => None,
            (UnitStatus::Ok, Some(_)) => return Err("ok unit must not carry an error message".to_string()),
            (UnitStatus::Error, Some(message)) if !message.is_empty() => Some(message),
            (UnitStatus::Error, _) => return Err("error unit must carry an error message".to_string()),
        };
        Ok(Self {
            source_path: raw.source_path,
            source_name: raw.source_name,
            file_type: raw.file_type,
            unit_type: raw.unit_type,
            unit_id: raw.unit_id,
            char_count: raw.content.chars().count(),
            content: raw.content,
            metadata: raw.metadata,
            status: raw.status,
            error,
        })
    }
}

fn provenance(source: &Path) -> (PathBuf, String) {
    let absolute = std::path::absolute(source).unwrap_or_else(|_| source.to_path_buf());
    let name = absolute
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    (absolute, name)
}
