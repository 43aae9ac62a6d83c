//! Typst boundary: derive a per-respondent source from a template and compile it.
//!
//! For artifact `003.json` and binding `q` the derived `003.typ` is
//!
//! ```text
//! #let q = json("003.json")
//!
//! <template lines>
//! ```
//!
//! and `typst compile 003.typ` runs inside the export directory, so the
//! relative reference resolves next to the derived source.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::emit::write_atomic;
use crate::error::{RenderError, RenderResult};

/// Default name of the variable the template reads answers from.
pub const DEFAULT_BINDING: &str = "q";

/// Default compiler program.
pub const DEFAULT_COMPILER: &str = "typst";

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("identifier pattern is valid")
});

/// Check that `name` can be used after `#let`.
pub fn validate_binding(name: &str) -> RenderResult<()> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(RenderError::InvalidBinding(name.to_string()))
    }
}

/// Derived source file name for an artifact: `003.json` -> `003.typ`.
pub fn source_name(artifact: &str) -> String {
    let stem = artifact.strip_suffix(".json").unwrap_or(artifact);
    format!("{}.typ", stem)
}

/// Template plus compiler settings, loaded once per run.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    template: String,
    binding: String,
    compiler: String,
}

impl TemplateRenderer {
    /// Build a renderer from template text.
    pub fn new(
        template: impl Into<String>,
        binding: impl Into<String>,
        compiler: impl Into<String>,
    ) -> RenderResult<Self> {
        let binding = binding.into();
        validate_binding(&binding)?;
        Ok(Self {
            template: template.into(),
            binding,
            compiler: compiler.into(),
        })
    }

    /// Load the template file. A missing or unreadable file is
    /// `RenderInputMissing`.
    pub fn from_file(
        path: &Path,
        binding: impl Into<String>,
        compiler: impl Into<String>,
    ) -> RenderResult<Self> {
        let template = fs::read_to_string(path).map_err(|e| RenderError::RenderInputMissing {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })?;
        Self::new(template, binding, compiler)
    }

    pub fn compiler(&self) -> &str {
        &self.compiler
    }

    /// The template with the binding line prepended. Every template line is
    /// re-terminated with `\n`.
    pub fn derive_source(&self, artifact: &str) -> String {
        let mut source = format!("#let {} = json(\"{}\")\n\n", self.binding, artifact);
        source.reserve(self.template.len() + 1);
        for line in self.template.lines() {
            source.push_str(line);
            source.push('\n');
        }
        source
    }

    /// Write the derived source next to `artifact` in `export_dir`.
    ///
    /// Returns the derived file name (relative to `export_dir`).
    pub fn write_source(&self, export_dir: &Path, artifact: &str) -> RenderResult<String> {
        let artifact_path = export_dir.join(artifact);
        if !artifact_path.is_file() {
            return Err(RenderError::RenderInputMissing {
                path: artifact_path,
                cause: "artifact has not been written".to_string(),
            });
        }

        let name = source_name(artifact);
        write_atomic(&export_dir.join(&name), self.derive_source(artifact).as_bytes())?;
        Ok(name)
    }

    /// Run `<compiler> compile <source>` inside `export_dir`.
    ///
    /// Returns the path of the PDF the compiler produces by default.
    pub fn compile(&self, export_dir: &Path, source: &str) -> RenderResult<PathBuf> {
        let output = Command::new(&self.compiler)
            .arg("compile")
            .arg(source)
            .current_dir(export_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| RenderError::CompilerUnavailable {
                program: self.compiler.clone(),
                cause: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(RenderError::ExternalCompilerFailure {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(export_dir.join(Path::new(source).with_extension("pdf")))
    }

    /// Derive and compile the document for one artifact.
    pub fn render(&self, export_dir: &Path, artifact: &str) -> RenderResult<PathBuf> {
        let source = self.write_source(export_dir, artifact)?;
        self.compile(export_dir, &source)
    }
}
