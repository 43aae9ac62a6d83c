//! Error types for the qsplit conversion pipeline.
//!
//! One enum per component, wrapped by the top-level [`PipelineError`]:
//!
//! - [`ReadError`] - obtaining and decoding the CSV grid
//! - [`MetadataError`] - building the column metadata table
//! - [`ShapeError`] - turning data rows into record sets
//! - [`EmitError`] - writing JSON artifacts
//! - [`RenderError`] - Typst template and compiler boundary
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across component boundaries.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Tabular Reader Errors
// =============================================================================

/// Errors while obtaining the grid.
#[derive(Debug, Error)]
pub enum ReadError {
    /// No `--csvfile` given and stdin is an interactive terminal.
    #[error("no input file specified and nothing piped to STDIN")]
    NoInputProvided,

    /// The input is unreadable, is not delimited text, or has fewer than 3 rows.
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

impl ReadError {
    pub fn malformed(message: impl Into<String>) -> Self {
        ReadError::MalformedInput(message.into())
    }
}

// =============================================================================
// Column Metadata Errors
// =============================================================================

/// Errors while extracting per-column metadata from the header rows.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Row 2 cell is not a JSON object with a non-empty string `ImportId`.
    #[error("couldn't get qualtrics import id for column {column} from {raw:?}: {reason}")]
    InvalidColumnMetadata {
        column: usize,
        raw: String,
        reason: String,
    },

    /// A header row disagrees with row 0 on the number of columns.
    #[error("header row {row} has {found} columns, expected {expected}")]
    MisalignedHeader {
        row: usize,
        expected: usize,
        found: usize,
    },
}

// =============================================================================
// Record Shaper Errors
// =============================================================================

/// Errors while shaping data rows.
#[derive(Debug, Error)]
pub enum ShapeError {
    /// Data row width differs from the metadata table.
    #[error("row {row} has {found} columns, expected {expected}")]
    RowColumnMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },
}

// =============================================================================
// Document Emitter Errors
// =============================================================================

/// Errors while persisting artifacts.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("failed to write {}: {cause}", path.display())]
    WriteFailure { path: PathBuf, cause: String },
}

impl EmitError {
    pub fn write_failure(path: impl Into<PathBuf>, cause: impl ToString) -> Self {
        EmitError::WriteFailure {
            path: path.into(),
            cause: cause.to_string(),
        }
    }
}

// =============================================================================
// Template Renderer Errors
// =============================================================================

/// Errors at the Typst boundary.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Template (or the artifact it should load) is missing or unreadable.
    #[error("render input missing: {}: {cause}", path.display())]
    RenderInputMissing { path: PathBuf, cause: String },

    /// Binding name is not a Typst identifier.
    #[error("invalid binding name {0:?}")]
    InvalidBinding(String),

    /// Compiler could not be started.
    #[error("failed to run {program}: {cause}")]
    CompilerUnavailable { program: String, cause: String },

    /// Compiler exited non-zero; `stderr` is reproduced verbatim.
    #[error("Failed to run typst ({status}): {stderr}")]
    ExternalCompilerFailure { status: String, stderr: String },

    /// Writing the derived source failed.
    #[error(transparent)]
    Write(#[from] EmitError),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level error returned by [`crate::pipeline::run`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

pub type ReadResult<T> = Result<T, ReadError>;

pub type MetadataResult<T> = Result<T, MetadataError>;

pub type ShapeResult<T> = Result<T, ShapeError>;

pub type EmitResult<T> = Result<T, EmitError>;

pub type RenderResult<T> = Result<T, RenderError>;

pub type PipelineResult<T> = Result<T, PipelineError>;
