//! Security Log
//!
//! Append-only record of every guard detection. Entries are created once
//! and written as single lines; nothing here reads them back.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// What the guard did when it found a match
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityEvent {
    /// User prompt refused before the loop started
    InputBlocked,
    /// Tool result redacted before the model saw it
    ToolSanitised,
    /// Final answer redacted before the caller saw it
    OutputSanitised,
}

impl SecurityEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            SecurityEvent::InputBlocked => "INPUT_BLOCKED",
            SecurityEvent::ToolSanitised => "TOOL_SANITISED",
            SecurityEvent::OutputSanitised => "OUTPUT_SANITISED",
        }
    }
}

impl std::fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detection
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SecurityLogEntry {
    /// UTC, whole seconds
    pub timestamp: DateTime<Utc>,
    pub event: SecurityEvent,
    /// Matched signature patterns, in signature order
    pub matched_patterns: Vec<String>,
    /// Free-text context (truncated prompt, tool name, ...)
    pub context: String,
}

impl SecurityLogEntry {
    pub fn new(event: SecurityEvent, matched_patterns: Vec<String>, context: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().trunc_subsecs(0),
            event,
            matched_patterns,
            context: context.into(),
        }
    }

    /// `[2024-05-01T12:00:00Z] INPUT_BLOCKED | patterns=["jailbreak"] | prompt="..."`
    pub fn to_line(&self) -> String {
        let patterns = serde_json::to_string(&self.matched_patterns)
            .unwrap_or_else(|_| String::from("[]"));
        format!(
            "[{}] {} | patterns={} | {}",
            self.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
            self.event,
            patterns,
            self.context.replace('\n', " "),
        )
    }
}

/// Where security entries go.
///
/// Errors are returned to the guard, which reports them to the operational
/// log and carries on with its verdict.
pub trait SecuritySink: Send + Sync {
    fn append(&self, entry: &SecurityLogEntry) -> std::io::Result<()>;
}

/// Appends one line per entry to a file, creating it if needed
pub struct FileSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SecuritySink for FileSink {
    fn append(&self, entry: &SecurityLogEntry) -> std::io::Result<()> {
        // Keep concurrent runs from interleaving partial lines.
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", entry.to_line())
    }
}

/// Keeps entries in memory (for development/testing)
#[derive(Default)]
pub struct MemorySink {
    entries: Mutex<Vec<SecurityLogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<SecurityLogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl SecuritySink for MemorySink {
    fn append(&self, entry: &SecurityLogEntry) -> std::io::Result<()> {
        self.entries
            .lock()
            .map_err(|_| std::io::Error::other("memory sink poisoned"))?
            .push(entry.clone());
        Ok(())
    }
}

/// Discards entries
pub struct NullSink;

impl SecuritySink for NullSink {
    fn append(&self, _entry: &SecurityLogEntry) -> std::io::Result<()> {
        Ok(())
    }
}
