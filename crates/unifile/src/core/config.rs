//! Configuration loading and management.
//!
//! [`ExtractionConfig`] is the fully resolved, per-call snapshot that extractors see.
//! [`RuntimeOptions`] is its sparse counterpart: every field optional, used for call
//! arguments, persisted config files and environment overrides, and merged layer by
//! layer into a snapshot.

use crate::{Result, UnifileError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Environment variable names of the back-channel read by helper tools.
pub mod env_keys {
    pub const ENABLE_TABLES: &str = "UNIFILE_ENABLE_TABLES";
    pub const ENABLE_BLOCK_TYPES: &str = "UNIFILE_ENABLE_BLOCK_TYPES";
    pub const METADATA_MODE: &str = "UNIFILE_METADATA_MODE";
    pub const OCR_LANG: &str = "UNIFILE_OCR_LANG";
    pub const DISABLE_OCR: &str = "UNIFILE_DISABLE_PDF_OCR";
    pub const ASR_BACKEND: &str = "UNIFILE_ASR_BACKEND";
    pub const ASR_MODEL: &str = "UNIFILE_ASR_MODEL";
    pub const ASR_DEVICE: &str = "UNIFILE_ASR_DEVICE";
    pub const ASR_COMPUTE_TYPE: &str = "UNIFILE_ASR_COMPUTE_TYPE";
    pub const MEDIA_CHUNK_SECONDS: &str = "UNIFILE_MEDIA_CHUNK_SECONDS";
    pub const TABLE_CELLS: &str = "UNIFILE_TABLE_CELLS";
    pub const ARCHIVE_DEPTH: &str = "UNIFILE_ARCHIVE_DEPTH";
    pub const ARCHIVE_MAX_DEPTH: &str = "UNIFILE_ARCHIVE_MAX_DEPTH";
    pub const ARCHIVE_MAX_BYTES: &str = "UNIFILE_ARCHIVE_MAX_BYTES";
    pub const DETERMINISTIC: &str = "UNIFILE_DETERMINISTIC";

    /// Every name the mirror owns. Used to clear stale values.
    pub const ALL: [&str; 15] = [
        ENABLE_TABLES,
        ENABLE_BLOCK_TYPES,
        METADATA_MODE,
        OCR_LANG,
        DISABLE_OCR,
        ASR_BACKEND,
        ASR_MODEL,
        ASR_DEVICE,
        ASR_COMPUTE_TYPE,
        MEDIA_CHUNK_SECONDS,
        TABLE_CELLS,
        ARCHIVE_DEPTH,
        ARCHIVE_MAX_DEPTH,
        ARCHIVE_MAX_BYTES,
        DETERMINISTIC,
    ];
}

/// How much filesystem metadata the dispatcher merges into each unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataMode {
    #[default]
    Basic,
    Full,
}

impl MetadataMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataMode::Basic => "basic",
            MetadataMode::Full => "full",
        }
    }
}

impl std::str::FromStr for MetadataMode {
    type Err = UnifileError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(MetadataMode::Basic),
            "full" => Ok(MetadataMode::Full),
            other => Err(UnifileError::validation(format!(
                "Invalid metadata mode '{}': expected 'basic' or 'full'",
                other
            ))),
        }
    }
}

/// Resolved extraction settings for one dispatch.
///
/// # Example
///
/// ```rust
/// use unifile::core::config::ExtractionConfig;
///
/// let config = ExtractionConfig::default();
/// assert_eq!(config.ocr_language, "eng");
/// assert_eq!(config.archive_max_depth, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Emit table units for tabular sources
    #[serde(default = "default_true")]
    pub enable_tables: bool,

    /// Classify text blocks (heading, list item, code, paragraph)
    #[serde(default = "default_true")]
    pub enable_block_types: bool,

    #[serde(default)]
    pub metadata_mode: MetadataMode,

    /// Tesseract language code(s), e.g. `eng` or `eng+deu`
    #[serde(default = "default_eng")]
    pub ocr_language: String,

    #[serde(default)]
    pub disable_ocr: bool,

    #[serde(default = "default_asr_backend")]
    pub asr_backend: String,

    #[serde(default)]
    pub asr_model: Option<String>,

    #[serde(default)]
    pub asr_device: Option<String>,

    #[serde(default)]
    pub asr_compute_type: Option<String>,

    #[serde(default = "default_media_chunk_seconds")]
    pub media_chunk_seconds: u32,

    /// Emit one unit per table cell instead of one per table
    #[serde(default)]
    pub table_cells: bool,

    #[serde(default = "default_archive_max_depth")]
    pub archive_max_depth: usize,

    /// Upper bound on bytes unpacked from one archive
    #[serde(default = "default_archive_max_bytes")]
    pub archive_max_bytes: u64,

    #[serde(default)]
    pub deterministic: bool,

    /// Batch concurrency limit (None = num_cpus * 2)
    #[serde(default)]
    pub max_concurrent_extractions: Option<usize>,
}

fn default_true() -> bool {
    true
}

fn default_eng() -> String {
    "eng".to_string()
}

fn default_asr_backend() -> String {
    "auto".to_string()
}

fn default_media_chunk_seconds() -> u32 {
    30
}

fn default_archive_max_depth() -> usize {
    3
}

fn default_archive_max_bytes() -> u64 {
    1024 * 1024 * 1024
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            enable_tables: true,
            enable_block_types: true,
            metadata_mode: MetadataMode::Basic,
            ocr_language: default_eng(),
            disable_ocr: false,
            asr_backend: default_asr_backend(),
            asr_model: None,
            asr_device: None,
            asr_compute_type: None,
            media_chunk_seconds: default_media_chunk_seconds(),
            table_cells: false,
            archive_max_depth: default_archive_max_depth(),
            archive_max_bytes: default_archive_max_bytes(),
            deterministic: false,
            max_concurrent_extractions: None,
        }
    }
}

impl ExtractionConfig {
    /// Return a copy with every `Some` field of `overrides` applied.
    pub fn with_overrides(&self, overrides: &RuntimeOptions) -> Self {
        let mut config = self.clone();
        macro_rules! apply {
            ($($field:ident),*) => {
                $(if let Some(v) = &overrides.$field { config.$field = v.clone(); })*
            };
        }
        apply!(
            enable_tables,
            enable_block_types,
            metadata_mode,
            ocr_language,
            disable_ocr,
            asr_backend,
            media_chunk_seconds,
            table_cells,
            archive_max_depth,
            archive_max_bytes,
            deterministic
        );
        if overrides.asr_model.is_some() {
            config.asr_model = overrides.asr_model.clone();
        }
        if overrides.asr_device.is_some() {
            config.asr_device = overrides.asr_device.clone();
        }
        if overrides.asr_compute_type.is_some() {
            config.asr_compute_type = overrides.asr_compute_type.clone();
        }
        if overrides.max_concurrent_extractions.is_some() {
            config.max_concurrent_extractions = overrides.max_concurrent_extractions;
        }
        config
    }

    /// Reject values no extractor can work with.
    pub fn validate(&self) -> Result<()> {
        if self.ocr_language.trim().is_empty() {
            return Err(UnifileError::validation("ocr_language must not be empty"));
        }
        if self.asr_backend.trim().is_empty() {
            return Err(UnifileError::validation("asr_backend must not be empty"));
        }
        if self.media_chunk_seconds == 0 {
            return Err(UnifileError::validation("media_chunk_seconds must be greater than 0"));
        }
        if self.archive_max_bytes == 0 {
            return Err(UnifileError::validation("archive_max_bytes must be greater than 0"));
        }
        if self.max_concurrent_extractions == Some(0) {
            return Err(UnifileError::validation("max_concurrent_extractions must be greater than 0"));
        }
        Ok(())
    }

    /// Environment handed to helper processes for a dispatch at `depth`.
    ///
    /// `None` values mean "unset this variable".
    pub fn env_vars(&self, depth: usize) -> Vec<(&'static str, Option<String>)> {
        use env_keys::*;
        vec![
            (ENABLE_TABLES, Some(flag(self.enable_tables))),
            (ENABLE_BLOCK_TYPES, Some(flag(self.enable_block_types))),
            (METADATA_MODE, Some(self.metadata_mode.as_str().to_string())),
            (OCR_LANG, Some(self.ocr_language.clone())),
            (DISABLE_OCR, Some(flag(self.disable_ocr))),
            (ASR_BACKEND, Some(self.asr_backend.clone())),
            (ASR_MODEL, self.asr_model.clone()),
            (ASR_DEVICE, self.asr_device.clone()),
            (ASR_COMPUTE_TYPE, self.asr_compute_type.clone()),
            (MEDIA_CHUNK_SECONDS, Some(self.media_chunk_seconds.to_string())),
            (TABLE_CELLS, Some(flag(self.table_cells))),
            (ARCHIVE_DEPTH, Some(depth.to_string())),
            (ARCHIVE_MAX_DEPTH, Some(self.archive_max_depth.to_string())),
            (ARCHIVE_MAX_BYTES, Some(self.archive_max_bytes.to_string())),
            (DETERMINISTIC, Some(flag(self.deterministic))),
        ]
    }

    /// Build the settings subset an extractor declared it accepts.
    pub fn settings_for(&self, accepted: &[RuntimeOption]) -> ExtractorSettings {
        let mut values = BTreeMap::new();
        for option in accepted {
            let value = match option {
                RuntimeOption::EnableTables => Some(OptionValue::Bool(self.enable_tables)),
                RuntimeOption::EnableBlockTypes => Some(OptionValue::Bool(self.enable_block_types)),
                RuntimeOption::MetadataMode => Some(OptionValue::Text(self.metadata_mode.as_str().to_string())),
                RuntimeOption::OcrLanguage => Some(OptionValue::Text(self.ocr_language.clone())),
                RuntimeOption::DisableOcr => Some(OptionValue::Bool(self.disable_ocr)),
                RuntimeOption::AsrBackend => Some(OptionValue::Text(self.asr_backend.clone())),
                RuntimeOption::AsrModel => self.asr_model.clone().map(OptionValue::Text),
                RuntimeOption::AsrDevice => self.asr_device.clone().map(OptionValue::Text),
                RuntimeOption::AsrComputeType => self.asr_compute_type.clone().map(OptionValue::Text),
                RuntimeOption::MediaChunkSeconds => Some(OptionValue::Integer(u64::from(self.media_chunk_seconds))),
                RuntimeOption::TableCells => Some(OptionValue::Bool(self.table_cells)),
                RuntimeOption::Deterministic => Some(OptionValue::Bool(self.deterministic)),
            };
            if let Some(value) = value {
                values.insert(*option, value);
            }
        }
        ExtractorSettings { values }
    }
}

fn flag(value: bool) -> String {
    if value { "1".to_string() } else { "0".to_string() }
}

/// Sparse set of option overrides.
///
/// Used for explicit call arguments, persisted configuration files and the
/// environment layer. `None` means "no opinion, keep the lower layer's value".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeOptions {
    pub enable_tables: Option<bool>,
    pub enable_block_types: Option<bool>,
    pub metadata_mode: Option<MetadataMode>,
    pub ocr_language: Option<String>,
    pub disable_ocr: Option<bool>,
    pub asr_backend: Option<String>,
    pub asr_model: Option<String>,
    pub asr_device: Option<String>,
    pub asr_compute_type: Option<String>,
    pub media_chunk_seconds: Option<u32>,
    pub table_cells: Option<bool>,
    pub archive_max_depth: Option<usize>,
    pub archive_max_bytes: Option<u64>,
    pub deterministic: Option<bool>,
    pub max_concurrent_extractions: Option<usize>,
}

impl RuntimeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay `other` onto `self`; fields set in `other` win.
    pub fn merge(&mut self, other: &RuntimeOptions) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field.clone(); })*
            };
        }
        take!(
            enable_tables,
            enable_block_types,
            metadata_mode,
            ocr_language,
            disable_ocr,
            asr_backend,
            asr_model,
            asr_device,
            asr_compute_type,
            media_chunk_seconds,
            table_cells,
            archive_max_depth,
            archive_max_bytes,
            deterministic,
            max_concurrent_extractions
        );
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Read overrides from `UNIFILE_*` environment variables.
    ///
    /// Malformed values are skipped with a warning rather than failing the caller.
    /// The archive depth variable is not read; depth travels with the call.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        use env_keys::*;

        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let boolean = |key: &str| {
            let raw = lookup(key)?;
            let parsed = parse_flag(&raw);
            if parsed.is_none() {
                tracing::warn!(variable = key, value = %raw, "Ignoring unrecognized boolean value");
            }
            parsed
        };
        fn number<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Option<T> {
            let raw = raw?;
            match raw.trim().parse::<T>() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(variable = key, value = %raw, "Ignoring non-numeric value");
                    None
                }
            }
        }

        let metadata_mode = text(METADATA_MODE).and_then(|raw| match raw.parse::<MetadataMode>() {
            Ok(mode) => Some(mode),
            Err(_) => {
                tracing::warn!(variable = METADATA_MODE, value = %raw, "Ignoring unknown metadata mode");
                None
            }
        });

        Self {
            enable_tables: boolean(ENABLE_TABLES),
            enable_block_types: boolean(ENABLE_BLOCK_TYPES),
            metadata_mode,
            ocr_language: text(OCR_LANG),
            disable_ocr: boolean(DISABLE_OCR),
            asr_backend: text(ASR_BACKEND),
            asr_model: text(ASR_MODEL),
            asr_device: text(ASR_DEVICE),
            asr_compute_type: text(ASR_COMPUTE_TYPE),
            media_chunk_seconds: number(MEDIA_CHUNK_SECONDS, lookup(MEDIA_CHUNK_SECONDS)),
            table_cells: boolean(TABLE_CELLS),
            archive_max_depth: number(ARCHIVE_MAX_DEPTH, lookup(ARCHIVE_MAX_DEPTH)),
            archive_max_bytes: number(ARCHIVE_MAX_BYTES, lookup(ARCHIVE_MAX_BYTES)),
            deterministic: boolean(DETERMINISTIC),
            max_concurrent_extractions: None,
        }
    }

    /// Load overrides from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `UnifileError::Validation` if the file can't be read or is invalid TOML.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        toml::from_str(&content)
            .map_err(|e| UnifileError::validation(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))
    }

    /// Load overrides from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        serde_yaml_ng::from_str(&content)
            .map_err(|e| UnifileError::validation(format!("Invalid YAML in {}: {}", path.as_ref().display(), e)))
    }

    /// Load overrides from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        serde_json::from_str(&content)
            .map_err(|e| UnifileError::validation(format!("Invalid JSON in {}: {}", path.as_ref().display(), e)))
    }

    /// Load overrides from a file, picking the format by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "toml" => Self::from_toml_file(path),
            "yaml" | "yml" => Self::from_yaml_file(path),
            "json" => Self::from_json_file(path),
            _ => Err(UnifileError::validation(format!(
                "Unsupported config format '{}': expected .toml, .yaml, .yml or .json",
                path.display()
            ))),
        }
    }

    /// Discover a persisted configuration file.
    ///
    /// Searches for `unifile.toml`, `unifile.yaml`, `unifile.yml` and `unifile.json`
    /// in the current directory and then each parent directory.
    pub fn discover() -> Result<Option<Self>> {
        let mut current = std::env::current_dir().map_err(UnifileError::Io)?;

        loop {
            for name in ["unifile.toml", "unifile.yaml", "unifile.yml", "unifile.json"] {
                let candidate = current.join(name);
                if candidate.is_file() {
                    tracing::debug!(path = %candidate.display(), "Loading persisted configuration");
                    return Ok(Some(Self::from_file(candidate)?));
                }
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| UnifileError::validation(format!("Failed to read config file {}: {}", path.display(), e)))
}

pub(crate) fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Named options an extractor may declare it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeOption {
    EnableTables,
    EnableBlockTypes,
    MetadataMode,
    OcrLanguage,
    DisableOcr,
    AsrBackend,
    AsrModel,
    AsrDevice,
    AsrComputeType,
    MediaChunkSeconds,
    TableCells,
    Deterministic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Text(String),
    Integer(u64),
}

/// The subset of a snapshot handed to one extractor's `configure`.
///
/// Contains only options the extractor declared; unset optional values are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractorSettings {
    values: BTreeMap<RuntimeOption, OptionValue>,
}

impl ExtractorSettings {
    pub fn get(&self, option: RuntimeOption) -> Option<&OptionValue> {
        self.values.get(&option)
    }

    pub fn bool(&self, option: RuntimeOption) -> Option<bool> {
        match self.values.get(&option) {
            Some(OptionValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn text(&self, option: RuntimeOption) -> Option<&str> {
        match self.values.get(&option) {
            Some(OptionValue::Text(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn integer(&self, option: RuntimeOption) -> Option<u64> {
        match self.values.get(&option) {
            Some(OptionValue::Integer(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn options(&self) -> impl Iterator<Item = RuntimeOption> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ExtractionConfig::default();
        assert!(config.enable_tables);
        assert!(config.enable_block_types);
        assert_eq!(config.metadata_mode, MetadataMode::Basic);
        assert_eq!(config.asr_backend, "auto");
        assert_eq!(config.media_chunk_seconds, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_overrides_only_touches_set_fields() {
        let overrides = RuntimeOptions {
            ocr_language: Some("deu".to_string()),
            asr_model: Some("small".to_string()),
            ..Default::default()
        };
        let config = ExtractionConfig::default().with_overrides(&overrides);
        assert_eq!(config.ocr_language, "deu");
        assert_eq!(config.asr_model.as_deref(), Some("small"));
        assert!(config.enable_tables);
        assert_eq!(config.archive_max_depth, 3);
    }

    #[test]
    fn test_merge_later_wins() {
        let mut base = RuntimeOptions {
            enable_tables: Some(false),
            ocr_language: Some("eng".to_string()),
            ..Default::default()
        };
        base.merge(&RuntimeOptions {
            ocr_language: Some("spa".to_string()),
            ..Default::default()
        });
        assert_eq!(base.enable_tables, Some(false));
        assert_eq!(base.ocr_language.as_deref(), Some("spa"));
    }

    #[test]
    fn test_validate_rejects_zero_chunk_seconds() {
        let config = ExtractionConfig {
            media_chunk_seconds: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(UnifileError::Validation { .. })));
    }

    #[test]
    fn test_from_lookup_parses_and_skips_malformed() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (env_keys::ENABLE_TABLES, "0"),
            (env_keys::DISABLE_OCR, "yes"),
            (env_keys::METADATA_MODE, "FULL"),
            (env_keys::MEDIA_CHUNK_SECONDS, "abc"),
            (env_keys::ARCHIVE_MAX_DEPTH, "5"),
            (env_keys::DETERMINISTIC, "maybe"),
            (env_keys::ASR_MODEL, "  "),
        ]);
        let opts = RuntimeOptions::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(opts.enable_tables, Some(false));
        assert_eq!(opts.disable_ocr, Some(true));
        assert_eq!(opts.metadata_mode, Some(MetadataMode::Full));
        assert_eq!(opts.media_chunk_seconds, None);
        assert_eq!(opts.archive_max_depth, Some(5));
        assert_eq!(opts.deterministic, None);
        assert_eq!(opts.asr_model, None);
    }

    #[test]
    fn test_env_vars_include_depth_and_unset_optionals() {
        let config = ExtractionConfig::default();
        let vars = config.env_vars(2);
        let lookup: HashMap<_, _> = vars.into_iter().collect();
        assert_eq!(lookup[env_keys::ARCHIVE_DEPTH].as_deref(), Some("2"));
        assert_eq!(lookup[env_keys::OCR_LANG].as_deref(), Some("eng"));
        assert_eq!(lookup[env_keys::ASR_MODEL], None);
        assert_eq!(lookup.len(), env_keys::ALL.len());
    }

    #[test]
    fn test_settings_for_only_declared_options() {
        let config = ExtractionConfig {
            asr_device: None,
            ..Default::default()
        };
        let settings = config.settings_for(&[RuntimeOption::OcrLanguage, RuntimeOption::AsrDevice]);
        assert_eq!(settings.len(), 1);
        assert_eq!(settings.text(RuntimeOption::OcrLanguage), Some("eng"));
        assert_eq!(settings.bool(RuntimeOption::EnableTables), None);
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("unifile.toml");
        fs::write(
            &config_path,
            r#"
enable_tables = false
ocr_language = "fra"
metadata_mode = "full"
        "#,
        )
        .unwrap();

        let opts = RuntimeOptions::from_toml_file(&config_path).unwrap();
        assert_eq!(opts.enable_tables, Some(false));
        assert_eq!(opts.ocr_language.as_deref(), Some("fra"));
        assert_eq!(opts.metadata_mode, Some(MetadataMode::Full));
        assert_eq!(opts.asr_backend, None);
    }

    #[test]
    fn test_from_yaml_and_json_files() {
        let dir = tempdir().unwrap();
        let yaml = dir.path().join("unifile.yaml");
        fs::write(&yaml, "table_cells: true\narchive_max_depth: 1\n").unwrap();
        let json = dir.path().join("unifile.json");
        fs::write(&json, r#"{"asr_backend": "whisper", "media_chunk_seconds": 10}"#).unwrap();

        let from_yaml = RuntimeOptions::from_file(&yaml).unwrap();
        assert_eq!(from_yaml.table_cells, Some(true));
        assert_eq!(from_yaml.archive_max_depth, Some(1));

        let from_json = RuntimeOptions::from_file(&json).unwrap();
        assert_eq!(from_json.asr_backend.as_deref(), Some("whisper"));
        assert_eq!(from_json.media_chunk_seconds, Some(10));
    }

    #[test]
    fn test_invalid_toml_is_validation_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("unifile.toml");
        fs::write(&config_path, "enable_tables = [").unwrap();
        let err = RuntimeOptions::from_toml_file(&config_path).unwrap_err();
        assert!(matches!(err, UnifileError::Validation { .. }));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_unknown_config_extension_rejected() {
        assert!(RuntimeOptions::from_file("settings.ini").is_err());
    }

    #[test]
    #[serial_test::serial]
    fn test_discover_unifile_toml() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("unifile.toml"), "deterministic = true\n").unwrap();

        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(&nested).unwrap();

        let result = std::panic::catch_unwind(|| {
            let opts = RuntimeOptions::discover().unwrap();
            assert_eq!(opts.and_then(|o| o.deterministic), Some(true));
        });

        std::env::set_current_dir(&original_dir).unwrap();

        if let Err(e) = result {
            std::panic::resume_unwind(e);
        }
    }
}
