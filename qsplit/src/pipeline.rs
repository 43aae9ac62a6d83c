//! High-level conversion API: export in, one JSON (and optionally one PDF)
//! per respondent out.
//!
//! # Example
//!
//! ```rust,ignore
//! use qsplit::{run, ConvertOptions, InputSource};
//!
//! let options = ConvertOptions {
//!     input: InputSource::File("survey.csv".into()),
//!     template: Some("report.typ".into()),
//!     ..ConvertOptions::default()
//! };
//! let summary = run(&options)?;
//! println!("Wrote {} documents", summary.artifacts.len());
//! ```
//!
//! Every failure is fatal and returned as
//! [`PipelineError`](crate::error::PipelineError). Nothing is written until
//! the export has been read, its metadata extracted, every answer row checked
//! against it, and the template (if any) loaded.

use serde::Serialize;
use std::path::PathBuf;

use crate::emit::{artifact_name, DocumentEmitter, DEFAULT_EXPORT_DIR};
use crate::error::PipelineResult;
use crate::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::metadata::MetadataTable;
use crate::models::{ColumnMetadata, KeyCollision};
use crate::parser::{read_grid, Grid, InputSource, ParseResult};
use crate::render::{TemplateRenderer, DEFAULT_BINDING, DEFAULT_COMPILER};
use crate::shaper::{check_alignment, RecordShaper};

/// Settings for one conversion run, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Export to read
    pub input: InputSource,

    /// CSV delimiter (auto-detect if not specified)
    pub delimiter: Option<char>,

    /// Directory receiving `NNN.json` (and `NNN.typ`/`NNN.pdf`)
    pub export_dir: PathBuf,

    /// Typst template; rendering is skipped when absent
    pub template: Option<PathBuf>,

    /// Variable the derived Typst source binds the answers to
    pub binding: String,

    /// Typst executable
    pub compiler: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            input: InputSource::Stdin,
            delimiter: None,
            export_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
            template: None,
            binding: DEFAULT_BINDING.to_string(),
            compiler: DEFAULT_COMPILER.to_string(),
        }
    }
}

/// What a run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConvertSummary {
    /// Number of columns in the export
    pub columns: usize,
    /// JSON artifacts, in row order
    pub artifacts: Vec<PathBuf>,
    /// Compiled documents, in row order (empty without a template)
    pub rendered: Vec<PathBuf>,
    /// `ImportId`s shared by several columns
    pub collisions: Vec<KeyCollision>,
}

/// Column report for the `columns` command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnReport {
    pub encoding: String,
    pub delimiter: char,
    pub data_rows: usize,
    pub distinct_keys: usize,
    pub columns: Vec<ColumnMetadata>,
    pub collisions: Vec<KeyCollision>,
}

/// Read the export named by `options` and convert it.
pub fn run(options: &ConvertOptions) -> PipelineResult<ConvertSummary> {
    log_info(format!("📖 Reading {}...", options.input.describe()));
    let parsed = read_grid(&options.input, options.delimiter)?;
    print_parse_result(&parsed);

    convert(&parsed.grid, options)
}

/// Convert an already-read grid.
pub fn convert(grid: &Grid, options: &ConvertOptions) -> PipelineResult<ConvertSummary> {
    log_info("📋 Extracting column metadata...");
    let table = MetadataTable::extract(grid)?;
    log_success(format!(
        "{} columns, {} distinct ImportIds",
        table.len(),
        table.distinct_keys()
    ));

    let collisions = table.collisions();
    for collision in &collisions {
        log_warning(format!(
            "ImportId \"{}\" shared by columns {:?}; the last one wins",
            collision.key, collision.columns
        ));
    }

    check_alignment(grid, &table)?;

    let renderer = options
        .template
        .as_deref()
        .map(|path| {
            log_info(format!("📄 Using template: {}", path.display()));
            TemplateRenderer::from_file(path, options.binding.as_str(), options.compiler.as_str())
        })
        .transpose()?;

    let emitter = DocumentEmitter::new(&options.export_dir);
    emitter.prepare()?;

    log_info(format!(
        "⚙️  Writing {} documents to {}",
        grid.data_row_count(),
        emitter.export_dir().display()
    ));

    let mut summary = ConvertSummary {
        columns: table.len(),
        collisions,
        ..ConvertSummary::default()
    };

    for shaped in RecordShaper::new(grid, &table) {
        let shaped = shaped?;
        let path = emitter.emit(shaped.offset, &shaped.records)?;
        log_info_indent(format!("row {} → {}", shaped.row, path.display()), 1);
        summary.artifacts.push(path);

        if let Some(ref renderer) = renderer {
            let pdf = renderer.render(emitter.export_dir(), &artifact_name(shaped.offset))?;
            log_info_indent(format!("compiled {}", pdf.display()), 1);
            summary.rendered.push(pdf);
        }
    }

    log_success(format!("{} documents written", summary.artifacts.len()));
    Ok(summary)
}

/// Read the export and describe its columns without writing anything.
pub fn inspect(input: &InputSource, delimiter: Option<char>) -> PipelineResult<ColumnReport> {
    let parsed = read_grid(input, delimiter)?;
    let table = MetadataTable::extract(&parsed.grid)?;

    Ok(ColumnReport {
        encoding: parsed.encoding,
        delimiter: parsed.delimiter,
        data_rows: parsed.grid.data_row_count(),
        distinct_keys: table.distinct_keys(),
        collisions: table.collisions(),
        columns: table.columns().to_vec(),
    })
}

fn print_parse_result(parsed: &ParseResult) {
    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!(
        "Detected separator: '{}'",
        format_delimiter(parsed.delimiter)
    ));
    log_success(format!("Read {} answer rows", parsed.grid.data_row_count()));
    if parsed.lossy {
        log_warning("Some bytes could not be decoded and were replaced");
    }
}

/// Format delimiter for display
fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MetadataError, PipelineError, ReadError, RenderError, ShapeError};
    use crate::models::RecordSet;
    use serde_json::{json, Value};
    use std::fs;
    use tempfile::tempdir;

    const SCENARIO: &str = "Q1,Q2\n\
        What is your name?,What is your age?\n\
        \"{\"\"ImportId\"\":\"\"name\"\"}\",\"{\"\"ImportId\"\":\"\"age\"\"}\"\n\
        Alice,30\n";

    fn options_for(dir: &std::path::Path, csv: &str) -> ConvertOptions {
        let input = dir.join("export.csv");
        fs::write(&input, csv).unwrap();
        ConvertOptions {
            input: InputSource::File(input),
            export_dir: dir.join("exports"),
            ..ConvertOptions::default()
        }
    }

    fn read_json(path: &std::path::Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_default_options() {
        let opts = ConvertOptions::default();
        assert_eq!(opts.input, InputSource::Stdin);
        assert_eq!(opts.export_dir, PathBuf::from("./exports"));
        assert_eq!(opts.binding, "q");
        assert_eq!(opts.compiler, "typst");
        assert!(opts.template.is_none());
    }

    #[test]
    fn test_scenario_single_respondent() {
        let dir = tempdir().unwrap();
        let options = options_for(dir.path(), SCENARIO);

        let summary = run(&options).unwrap();

        assert_eq!(summary.columns, 2);
        assert_eq!(summary.artifacts, vec![dir.path().join("exports/000.json")]);
        assert!(summary.rendered.is_empty());
        assert_eq!(
            read_json(&summary.artifacts[0]),
            json!({
                "name": {"text": "What is your name?", "qualticsID": "Q1", "answer": "Alice"},
                "age": {"text": "What is your age?", "qualticsID": "Q2", "answer": "30"}
            })
        );
    }

    #[test]
    fn test_artifact_per_row_with_distinct_keys() {
        let dir = tempdir().unwrap();
        let mut csv = String::from(
            "Q1,Q2,Q3\nA,B,C\n\"{\"\"ImportId\"\":\"\"x\"\"}\",\"{\"\"ImportId\"\":\"\"y\"\"}\",\"{\"\"ImportId\"\":\"\"x\"\"}\"\n",
        );
        for i in 0..12 {
            csv.push_str(&format!("{i},b{i},c{i}\n"));
        }
        let options = options_for(dir.path(), &csv);

        let summary = run(&options).unwrap();

        assert_eq!(summary.artifacts.len(), 12);
        assert_eq!(
            summary.artifacts[11],
            dir.path().join("exports").join("011.json")
        );
        assert_eq!(summary.collisions.len(), 1);
        for (i, path) in summary.artifacts.iter().enumerate() {
            let set = RecordSet::from_json(&fs::read_to_string(path).unwrap()).unwrap();
            assert_eq!(set.len(), 2);
            assert_eq!(set.get("x").unwrap().answer, format!("c{i}"));
            assert_eq!(set.get("x").unwrap().qualtrics_id, "Q3");
        }
    }

    #[test]
    fn test_headers_only_succeeds_with_no_artifacts() {
        let dir = tempdir().unwrap();
        let csv = SCENARIO.lines().take(3).collect::<Vec<_>>().join("\n");
        let options = options_for(dir.path(), &csv);

        let summary = run(&options).unwrap();
        assert!(summary.artifacts.is_empty());
        assert_eq!(fs::read_dir(dir.path().join("exports")).unwrap().count(), 0);
    }

    #[test]
    fn test_short_export_leaves_no_export_dir() {
        let dir = tempdir().unwrap();
        let options = options_for(dir.path(), "Q1,Q2\nname,age\n");

        let err = run(&options).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Read(ReadError::MalformedInput(_))
        ));
        assert!(!dir.path().join("exports").exists());
    }

    #[test]
    fn test_invalid_import_id_writes_nothing() {
        let dir = tempdir().unwrap();
        let csv = "Q1,Q2\na,b\n\"{\"\"ImportId\"\":\"\"a\"\"}\",not-json\n1,2\n";
        let options = options_for(dir.path(), csv);

        let err = run(&options).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Metadata(MetadataError::InvalidColumnMetadata { column: 1, .. })
        ));
        assert!(!dir.path().join("exports").exists());
    }

    #[test]
    fn test_ragged_row_writes_nothing() {
        let dir = tempdir().unwrap();
        let csv = format!("{}Bob\n", SCENARIO);
        let options = options_for(dir.path(), &csv);

        let err = run(&options).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Shape(ShapeError::RowColumnMismatch { row: 4, .. })
        ));
        assert!(!dir.path().join("exports").exists());
    }

    #[test]
    fn test_missing_template_writes_nothing() {
        let dir = tempdir().unwrap();
        let mut options = options_for(dir.path(), SCENARIO);
        options.template = Some(dir.path().join("missing.typ"));

        let err = run(&options).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Render(RenderError::RenderInputMissing { .. })
        ));
        assert!(!dir.path().join("exports").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_compiler_failure_is_fatal() {
        let dir = tempdir().unwrap();
        let template = dir.path().join("report.typ");
        fs::write(&template, "#q.name.answer\n").unwrap();
        let mut options = options_for(dir.path(), SCENARIO);
        options.template = Some(template);
        options.compiler = "false".to_string();

        let err = run(&options).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Render(RenderError::ExternalCompilerFailure { .. })
        ));
        let derived = fs::read_to_string(dir.path().join("exports/000.typ")).unwrap();
        assert_eq!(derived, "#let q = json(\"000.json\")\n\n#q.name.answer\n");
    }

    #[test]
    fn test_inspect_reports_columns() {
        let dir = tempdir().unwrap();
        let options = options_for(dir.path(), SCENARIO);

        let report = inspect(&options.input, None).unwrap();
        assert_eq!(report.encoding, "utf-8");
        assert_eq!(report.delimiter, ',');
        assert_eq!(report.data_rows, 1);
        assert_eq!(report.distinct_keys, 2);
        assert_eq!(report.columns[0].stable_key, "name");
        assert!(report.collisions.is_empty());
        assert!(!dir.path().join("exports").exists());
    }
}
