//! # qsplit - one document per Qualtrics respondent
//!
//! qsplit turns a Qualtrics CSV export into one JSON file per respondent,
//! keyed by each question's `ImportId`, and can feed every file through a
//! Typst template.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌────────────┐   ┌────────────┐   ┌────────────┐
//! │  CSV File  │──▶│   Parser   │──▶│  Metadata  │──▶│   Shaper   │──▶│    Emit    │
//! │ or stdin   │   │ (auto-enc) │   │ (rows 0-2) │   │ (per row)  │   │ NNN.json   │
//! └────────────┘   └────────────┘   └────────────┘   └────────────┘   └─────┬──────┘
//!                                                                           ▼
//!                                                                     ┌────────────┐
//!                                                                     │   Render   │
//!                                                                     │ NNN.typ/pdf│
//!                                                                     └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per component
//! - [`models`] - Column metadata and record sets
//! - [`parser`] - Input selection, decoding and CSV grid
//! - [`metadata`] - Header rows to column metadata
//! - [`shaper`] - Answer rows to record sets
//! - [`emit`] - JSON artifacts
//! - [`render`] - Typst template and compiler
//! - [`pipeline`] - End-to-end conversion
//! - [`logs`] - Progress logging

// Core modules
pub mod error;
pub mod logs;
pub mod models;

// Stages
pub mod emit;
pub mod metadata;
pub mod parser;
pub mod render;
pub mod shaper;

// Orchestration
pub mod pipeline;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{
    EmitError, MetadataError, PipelineError, PipelineResult, ReadError, RenderError, ShapeError,
};

pub use models::{ColumnMetadata, KeyCollision, Record, RecordSet};

pub use parser::{
    check_quotes, decode_content, default_delimiter, detect_encoding, parse_bytes_auto, parse_grid,
    read_grid, read_piped, Grid, InputSource, ParseResult, HEADER_ROWS,
};

pub use metadata::MetadataTable;

pub use shaper::{RecordShaper, ShapedRow};

pub use emit::{artifact_name, DocumentEmitter, DEFAULT_EXPORT_DIR};

pub use render::{TemplateRenderer, DEFAULT_BINDING, DEFAULT_COMPILER};

pub use pipeline::{convert, inspect, run, ColumnReport, ConvertOptions, ConvertSummary};
