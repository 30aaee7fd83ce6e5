//! Error types for unifile.
//!
//! Two kinds of failure exist in the pipeline and they travel differently:
//!
//! - **Call-level failures** (`NotFound`, `UnsupportedType`, I/O errors, bad configuration)
//!   are returned as `Err(UnifileError)` and abort the dispatch that raised them.
//! - **Content-level failures** (one page, one archive member, one bad line) never become an
//!   `Err`. Extractors capture them as a [`Unit`](crate::types::Unit) with `status = error`
//!   so the rest of the document still yields output.
//!
//! `UnifileError::Io` always bubbles up unchanged.
//!
//! # Example
//!
//! ```rust
//! use unifile::{Result, UnifileError};
//!
//! fn read_config(path: &str) -> Result<String> {
//!     let raw = std::fs::read_to_string(path)?;
//!     if raw.trim().is_empty() {
//!         return Err(UnifileError::validation(format!("Config file is empty: {}", path)));
//!     }
//!     Ok(raw)
//! }
//! ```
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using `UnifileError`.
pub type Result<T> = std::result::Result<T, UnifileError>;

/// Main error type for all unifile operations.
#[derive(Debug, Error)]
pub enum UnifileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The input path does not exist or is not a regular file.
    #[error("Not a file: {}", path.display())]
    NotFound { path: PathBuf },

    /// No registered extractor handles this extension.
    #[error("Unsupported file extension '{extension}'. Supported: {}", supported.join(", "))]
    UnsupportedType { extension: String, supported: Vec<String> },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Parsing error: {message}")]
    Parsing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Manifest error: {message}")]
    Manifest {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Remote fetch error: {message}")]
    Remote {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Plugin error in '{plugin_name}': {message}")]
    Plugin { message: String, plugin_name: String },

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for UnifileError {
    fn from(err: serde_json::Error) -> Self {
        UnifileError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl UnifileError {
    error_constructor!(validation, Validation);
    error_constructor!(parsing, Parsing);
    error_constructor!(serialization, Serialization);
    error_constructor!(manifest, Manifest);
    error_constructor!(remote, Remote);

    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Short, stable name of the variant, used as the `exception` tag on error units.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::NotFound { .. } => "not_found",
            Self::UnsupportedType { .. } => "unsupported_type",
            Self::Validation { .. } => "validation",
            Self::Parsing { .. } => "parsing",
            Self::Serialization { .. } => "serialization",
            Self::Manifest { .. } => "manifest",
            Self::Remote { .. } => "remote",
            Self::Plugin { .. } => "plugin",
            Self::LockPoisoned(_) => "lock_poisoned",
            Self::Other(_) => "other",
        }
    }
}
