//! Core orchestration.
//!
//! - **Dispatch** (`dispatch`): resolve an input to an extractor and normalize its units
//! - **Batch** (`batch`): order-preserving concurrent dispatch over many paths
//! - **Configuration** (`config`, `overlay`): option layers, the process-wide overlay
//!   and its environment mirror
//! - **I/O** (`io`, `metadata`): path validation, scratch files, directory walks and
//!   filesystem metadata sniffing
//!
//! # Example
//!
//! ```rust,no_run
//! use unifile::core::dispatch::Dispatcher;
//! use unifile::core::config::RuntimeOptions;
//!
//! let dispatcher = Dispatcher::global();
//! let table = dispatcher.extract_to_table("report.csv", &RuntimeOptions::default(), None)?;
//! println!("{} rows", table.len());
//! # Ok::<(), unifile::UnifileError>(())
//! ```

pub mod batch;
pub mod config;
pub mod dispatch;
pub mod io;
pub mod metadata;
pub mod overlay;

pub use batch::{extract_many, extract_many_sync};
pub use config::{ExtractionConfig, ExtractorSettings, MetadataMode, OptionValue, RuntimeOption, RuntimeOptions};
pub use dispatch::{Dispatcher, ExtractionContext, ExtractionInput, extract_to_table, extract_to_table_with_manifest};
pub use overlay::{RuntimeOverlay, publish_env, set_runtime_options};
