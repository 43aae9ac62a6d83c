//! Progress logging for conversion runs.
//!
//! Entries go to stderr so stdout stays free for command output. The output
//! format is chosen once at startup with [`init`]; before that, text is used.

use chrono::Utc;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// How entries are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines with a glyph per level
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth for text output
    #[serde(default)]
    pub indent: u8,
    pub timestamp: String,
}

impl LogEntry {
    fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            indent: 0,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Render the entry in the given format (no trailing newline).
    pub fn render(&self, format: LogFormat) -> String {
        match format {
            LogFormat::Text => {
                let prefix = match self.level {
                    LogLevel::Info => "   ",
                    LogLevel::Success => "   ✓",
                    LogLevel::Warning => "   ⚠️",
                    LogLevel::Error => "   ❌",
                };
                let indent = "   ".repeat(self.indent as usize);
                format!("{}{} {}", indent, prefix, self.message)
            }
            LogFormat::Json => serde_json::to_string(self)
                .unwrap_or_else(|_| format!("{{\"message\":{:?}}}", self.message)),
        }
    }
}

static LOG_FORMAT: OnceCell<LogFormat> = OnceCell::new();

/// Select the output format. Only the first call has an effect.
pub fn init(format: LogFormat) {
    let _ = LOG_FORMAT.set(format);
}

fn format() -> LogFormat {
    LOG_FORMAT.get().copied().unwrap_or_default()
}

/// Write an entry to stderr
pub fn log(entry: LogEntry) {
    let line = entry.render(format());
    let _ = writeln!(std::io::stderr().lock(), "{}", line);
}

pub fn log_info(msg: impl Into<String>) {
    log(LogEntry::info(msg));
}

pub fn log_success(msg: impl Into<String>) {
    log(LogEntry::success(msg));
}

pub fn log_warning(msg: impl Into<String>) {
    log(LogEntry::warning(msg));
}

pub fn log_error(msg: impl Into<String>) {
    log(LogEntry::error(msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    log(LogEntry::info(msg).with_indent(indent));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_render_indents() {
        let entry = LogEntry::success("wrote 000.json").with_indent(1);
        assert_eq!(entry.render(LogFormat::Text), "      ✓ wrote 000.json");
    }

    #[test]
    fn test_json_render() {
        let entry = LogEntry::warning("duplicate ImportId");
        let line = entry.render(LogFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["level"], "warning");
        assert_eq!(parsed["message"], "duplicate ImportId");
        assert!(parsed["timestamp"].as_str().is_some());
    }
}
