//! Document emitter: writes one JSON artifact per respondent.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EmitError, EmitResult};
use crate::models::RecordSet;

/// Default export directory (relative to current dir)
pub const DEFAULT_EXPORT_DIR: &str = "./exports";

/// Artifact file name for an answer row: `000.json`, `001.json`, ...
pub fn artifact_name(offset: usize) -> String {
    format!("{:03}.json", offset)
}

/// Write `content` to `path` through a temporary sibling, then rename it
/// into place.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> EmitResult<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    fs::write(&tmp, content).map_err(|e| EmitError::write_failure(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        EmitError::write_failure(path, e)
    })
}

/// Writes record sets into an export directory.
#[derive(Debug, Clone)]
pub struct DocumentEmitter {
    export_dir: PathBuf,
}

impl DocumentEmitter {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
        }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Create the export directory (and parents) if needed.
    pub fn prepare(&self) -> EmitResult<()> {
        fs::create_dir_all(&self.export_dir)
            .map_err(|e| EmitError::write_failure(&self.export_dir, e))
    }

    /// Where the artifact for `offset` lives.
    pub fn artifact_path(&self, offset: usize) -> PathBuf {
        self.export_dir.join(artifact_name(offset))
    }

    /// Serialize `records` as pretty JSON to the artifact for `offset`.
    pub fn emit(&self, offset: usize, records: &RecordSet) -> EmitResult<PathBuf> {
        let path = self.artifact_path(offset);
        let json = records
            .to_json()
            .map_err(|e| EmitError::write_failure(&path, e))?;
        write_atomic(&path, json.as_bytes())?;
        Ok(path)
    }
}

impl Default for DocumentEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_EXPORT_DIR)
    }
}
