//! Tabular reader: raw export bytes to an in-memory [`Grid`].
//!
//! Handles input selection (file or piped stdin), charset detection and
//! strict quoting. No Qualtrics-specific logic here beyond the three-row
//! minimum and the delimiter default.

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use std::io::{IsTerminal, Read};
use std::path::PathBuf;

use crate::error::{ReadError, ReadResult};

/// Rows 0..3 of an export describe the columns; everything after is answers.
pub const HEADER_ROWS: usize = 3;

/// Where the export comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InputSource {
    File(PathBuf),
    #[default]
    Stdin,
}

impl InputSource {
    /// A file when a path was given, stdin otherwise.
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map(InputSource::File).unwrap_or(InputSource::Stdin)
    }

    pub fn describe(&self) -> String {
        match self {
            InputSource::File(p) => p.display().to_string(),
            InputSource::Stdin => "<stdin>".to_string(),
        }
    }

    /// Read the whole source into memory.
    ///
    /// Stdin is only used when something is piped into it.
    pub fn read_bytes(&self) -> ReadResult<Vec<u8>> {
        match self {
            InputSource::File(path) => std::fs::read(path).map_err(|e| {
                ReadError::malformed(format!("error opening file {}: {}", path.display(), e))
            }),
            InputSource::Stdin => {
                let stdin = std::io::stdin();
                read_piped(stdin.is_terminal(), stdin.lock())
            }
        }
    }
}

/// Read everything piped into `reader`. An interactive terminal means
/// nothing was piped.
pub fn read_piped<R: Read>(is_terminal: bool, mut reader: R) -> ReadResult<Vec<u8>> {
    if is_terminal {
        return Err(ReadError::NoInputProvided);
    }
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| ReadError::malformed(format!("error reading stdin: {}", e)))?;
    Ok(bytes)
}

/// The full export as rows of cells.
///
/// Always holds at least [`HEADER_ROWS`] rows. Row lengths are not checked
/// here; see [`crate::metadata::MetadataTable::extract`] and
/// [`crate::shaper::RecordShaper`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<String>>) -> ReadResult<Self> {
        if rows.len() < HEADER_ROWS {
            return Err(ReadError::malformed(format!(
                "expected at least {} rows in a qualtrics export, found {}",
                HEADER_ROWS,
                rows.len()
            )));
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of columns declared by row 0.
    pub fn column_count(&self) -> usize {
        self.rows[0].len()
    }

    /// One of the three header rows.
    pub fn header(&self, row: usize) -> &[String] {
        debug_assert!(row < HEADER_ROWS);
        &self.rows[row]
    }

    pub fn data_row_count(&self) -> usize {
        self.rows.len() - HEADER_ROWS
    }

    /// Answer rows with their grid index.
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &[String])> + '_ {
        self.rows
            .iter()
            .enumerate()
            .skip(HEADER_ROWS)
            .map(|(i, row)| (i, row.as_slice()))
    }
}

/// Result of reading with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub grid: Grid,
    /// Detected encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Some bytes could not be decoded and were replaced
    pub lossy: bool,
}

/// Decoded text plus how it was obtained.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub content: String,
    pub encoding: &'static Encoding,
    pub lossy: bool,
}

/// Guess the charset of bytes without a BOM.
///
/// Valid UTF-8 is taken as is; anything else goes through chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let charset = chardet::detect(bytes).0;
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string. A byte-order mark wins over detection.
pub fn decode_content(bytes: &[u8]) -> Decoded {
    let (encoding, bom_len) = match Encoding::for_bom(bytes) {
        Some(found) => found,
        None => {
            let label = detect_encoding(bytes);
            (Encoding::for_label(label.as_bytes()).unwrap_or(UTF_8), 0)
        }
    };

    let (content, lossy) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
    Decoded {
        content: content.into_owned(),
        encoding,
        lossy,
    }
}

/// Delimiter used when none is given: Qualtrics writes its TSV exports as
/// UTF-16, everything else is comma separated.
pub fn default_delimiter(encoding: &'static Encoding) -> char {
    if encoding == UTF_16LE || encoding == UTF_16BE {
        '\t'
    } else {
        ','
    }
}

/// Reject quoting that the `csv` crate would silently repair: a `"` inside
/// an unquoted field, text after a closing quote, or a quoted field that
/// never closes.
///
/// Rows are counted like the grid counts them (blank lines skipped).
pub fn check_quotes(content: &str, delimiter: char) -> ReadResult<()> {
    let mut row = 0;
    let mut line = 1;
    let mut row_has_content = false;
    let mut field_start = true;
    let mut chars = content.chars().peekable();

    let malformed = |row: usize, line: usize, what: &str| {
        ReadError::malformed(format!("row {} (line {}): {}", row, line, what))
    };

    while let Some(c) = chars.next() {
        if field_start && c == '"' {
            let (start_row, start_line) = (row, line);
            row_has_content = true;
            loop {
                match chars.next() {
                    None => {
                        return Err(malformed(
                            start_row,
                            start_line,
                            "quoted field is never closed",
                        ))
                    }
                    Some('"') => match chars.peek().copied() {
                        Some('"') => {
                            chars.next();
                        }
                        None | Some('\n') | Some('\r') => break,
                        Some(next) if next == delimiter => break,
                        Some(_) => {
                            return Err(malformed(row, line, "text after closing quote"))
                        }
                    },
                    Some('\n') => line += 1,
                    Some(_) => {}
                }
            }
            field_start = false;
            continue;
        }

        match c {
            '"' => return Err(malformed(row, line, "bare \" in unquoted field")),
            '\n' => {
                if row_has_content {
                    row += 1;
                }
                line += 1;
                row_has_content = false;
                field_start = true;
            }
            '\r' => field_start = false,
            c if c == delimiter => {
                row_has_content = true;
                field_start = true;
            }
            _ => {
                row_has_content = true;
                field_start = false;
            }
        }
    }

    Ok(())
}

/// Parse delimited text into a grid.
///
/// Every line is a row (no header handling), cells are kept verbatim and
/// ragged rows are accepted. Empty lines are skipped. Quoting must pass
/// [`check_quotes`].
pub fn parse_grid(content: &str, delimiter: char) -> ReadResult<Grid> {
    let delimiter_byte = u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| {
            ReadError::malformed(format!(
                "delimiter {:?} is not a single ASCII character",
                delimiter
            ))
        })?;
    check_quotes(content, delimiter)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter_byte)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| ReadError::malformed(e.to_string()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Grid::new(rows)
}

/// Decode and parse raw export bytes.
pub fn parse_bytes_auto(bytes: &[u8], delimiter: Option<char>) -> ReadResult<ParseResult> {
    let decoded = decode_content(bytes);
    let delimiter = delimiter.unwrap_or_else(|| default_delimiter(decoded.encoding));
    let grid = parse_grid(&decoded.content, delimiter)?;

    Ok(ParseResult {
        grid,
        encoding: decoded.encoding.name().to_lowercase(),
        delimiter,
        lossy: decoded.lossy,
    })
}

/// Read and parse an export from its source.
pub fn read_grid(source: &InputSource, delimiter: Option<char>) -> ReadResult<ParseResult> {
    let bytes = source.read_bytes()?;
    parse_bytes_auto(&bytes, delimiter)
}
