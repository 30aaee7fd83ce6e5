//! Unifile - one table for every file.
//!
//! Unifile turns documents, data files, images, media and archives into a single
//! table of extracted text units with a fixed ten-column schema. Extractors are
//! pluggable per file extension, archives are unpacked and their members extracted
//! recursively, and an append-only manifest skips content that was already seen.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use unifile::{extract_to_table, RuntimeOptions};
//!
//! # fn main() -> unifile::Result<()> {
//! let table = extract_to_table("notes.md", &RuntimeOptions::default())?;
//! for row in table.rows() {
//!     println!("{:?} {:?}: {:?}", row.unit_type, row.unit_id, row.content);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Core** (`core`): dispatch, batch fan-out, configuration layers and the runtime overlay
//! - **Plugins** (`plugins`): the [`Extractor`](plugins::Extractor) contract and the extension registry
//! - **Extractors** (`extractors`): built-in backends for text, JSON, CSV, XML, HTML, images, media and archives
//! - **Extraction** (`extraction`): format parsing helpers the extractors are built on
//! - **Manifest** (`manifest`): content-addressed deduplication log
//! - **Table** (`table`): canonical row schema
//!
//! # Features
//!
//! - `archives` (default): ZIP/TAR/gzip support for the recursive archive extractor
//! - `remote` (default): [`fetch_url`](remote::fetch_url) with retry and backoff

#![deny(unsafe_code)]

pub mod chunking;
pub mod core;
pub mod error;
pub mod extraction;
pub mod extractors;
pub mod manifest;
pub mod plugins;
#[cfg(feature = "remote")]
pub mod remote;
pub mod table;
pub mod types;

pub use error::{Result, UnifileError};
pub use types::{Unit, UnitMetadata, UnitStatus, UnitType};

pub use table::{CANONICAL_COLUMNS, Row, Table};

pub use core::batch::{extract_many, extract_many_sync};
pub use core::config::{ExtractionConfig, MetadataMode, RuntimeOption, RuntimeOptions};
pub use core::dispatch::{Dispatcher, ExtractionInput, extract_to_table, extract_to_table_with_manifest};
pub use core::overlay::{RuntimeOverlay, set_runtime_options};

pub use manifest::{Manifest, ManifestStatus};

pub use chunking::chunk_table;

#[cfg(feature = "remote")]
pub use remote::{FetchOptions, fetch_url};
