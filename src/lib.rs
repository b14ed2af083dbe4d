//! MCAP Export Library
//!
//! A Rust library for decoding multi-channel MCAP telemetry logs and
//! re-exporting them as analyst-facing tables, with retryable background jobs
//! for recovery, parsing and conversion.
//!
//! # Features
//!
//! - **`cli`** (default): Build the command-line interface binary
//!
//! # Quick Start
//!
//! Read the summary and export a wide table:
//! ```rust,no_run
//! use mcap_export::{convert, ExportOptions, LogReader};
//! use std::path::Path;
//!
//! let reader = LogReader::open("run.mcap").unwrap();
//! let summary = reader.summary().unwrap();
//! println!("{} channels", summary.channels.len());
//!
//! let report = convert(
//!     Path::new("run.mcap"),
//!     Path::new("out/run.omni.csv"),
//!     "omni",
//!     &ExportOptions::default(),
//! )
//! .unwrap();
//! println!("{} rows x {} columns", report.rows, report.columns);
//! ```
//!
//! Run a recovery job whose parse continuation uses the repaired file:
//! ```rust,no_run
//! use mcap_export::{Orchestrator, PipelineRunner, RetryPolicy, SourceRef};
//! use std::sync::Arc;
//!
//! # async fn demo() -> mcap_export::Result<()> {
//! let orchestrator = Orchestrator::new(Arc::new(PipelineRunner::default()), RetryPolicy::default());
//! let id = orchestrator.submit_recovery(SourceRef::new("run.mcap"));
//! for (job, status) in orchestrator.run_chain(id).await? {
//!     println!("{job}: {}", status.status);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Public API
//!
//! ## Reading
//! - [`LogReader`] - Container access: summary and lazy message iteration
//! - [`parse_log`] - Summary plus role-mapped field extraction
//! - [`FieldRoles`] - Explicit field-path → role mapping
//!
//! ## Flattening and schema
//! - [`flatten`] - Payload tree → dotted path map, deep or shallow
//! - [`SchemaAccumulator`] - Sorted union of discovered field paths
//! - [`FieldProfile`] - Keep-all, keyword or none column filtering
//! - [`TimeAligner`] - Exact-timestamp join of long triples into wide rows
//!
//! ## Export
//! - [`convert`] - Container → omni / tvn / ld artifact
//! - [`FormatWriter`] - Sink shared by [`WideWriter`], [`LongWriter`] and [`PlaceholderWriter`]
//! - [`compute_export_path`] - Helper for consistent output naming
//!
//! ## Jobs
//! - [`Orchestrator`] - Retried, chained job execution with pollable status
//! - [`RepairTool`] - External container repair with a wall-clock bound
//! - [`Settings`] - Layered configuration

// Module declarations
pub mod align;
pub mod config;
pub mod conversion;
pub mod error;
pub mod export;
pub mod filters;
pub mod flatten;
pub mod jobs;
pub mod parser;
pub mod roles;
pub mod schema;
pub mod types;

// Re-export everything from modules for convenience
// Submodule names (`summary`, `types`) overlap; the item re-exports do not
#[allow(ambiguous_glob_reexports)]
pub use align::*;
#[allow(ambiguous_glob_reexports)]
pub use self::config::*;
#[allow(ambiguous_glob_reexports)]
pub use conversion::*;
#[allow(ambiguous_glob_reexports)]
pub use error::*;
#[allow(ambiguous_glob_reexports)]
pub use export::*;
#[allow(ambiguous_glob_reexports)]
pub use filters::*;
#[allow(ambiguous_glob_reexports)]
pub use flatten::*;
#[allow(ambiguous_glob_reexports)]
pub use jobs::*;
#[allow(ambiguous_glob_reexports)]
pub use parser::*;
#[allow(ambiguous_glob_reexports)]
pub use roles::*;
#[allow(ambiguous_glob_reexports)]
pub use schema::*;
#[allow(ambiguous_glob_reexports)]
pub use types::*;
