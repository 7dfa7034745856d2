//! Output routing onto the shared text resource (the clipboard, in the app).
//!
//! `append` is a read-then-write pair with no coordination across casts: two
//! concurrent appends can lose one of the updates.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use spellcast_core::spell::OutputFormat;

/// Inserted between the existing text and appended output, even when the
/// existing text is empty.
pub const APPEND_SEPARATOR: &str = "\n\n";

/// Shared text owned by an external collaborator. Calls may block.
pub trait SharedText: Send + Sync {
    fn read_text(&self) -> std::io::Result<String>;

    fn write_text(&self, text: &str) -> std::io::Result<()>;
}

/// Apply the routing policy for `format` to `output`.
pub fn route_output(target: &dyn SharedText, format: OutputFormat, output: &str) -> std::io::Result<()> {
    match format {
        OutputFormat::Append => {
            let current = target.read_text()?;
            target.write_text(&format!("{current}{APPEND_SEPARATOR}{output}"))
        }
        OutputFormat::Text | OutputFormat::Json | OutputFormat::Replace => target.write_text(output),
    }
}

/// Pretty-print `stdout` when it parses as JSON; otherwise return it unchanged.
pub fn pretty_json(stdout: &str) -> String {
    serde_json::from_str::<serde_json::Value>(stdout)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| stdout.to_string())
}

/// Shared text backed by a plain file. A missing file reads as empty.
#[derive(Debug, Clone)]
pub struct FileSharedText {
    path: PathBuf,
}

impl FileSharedText {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SharedText for FileSharedText {
    fn read_text(&self) -> std::io::Result<String> {
        match std::fs::read_to_string(&self.path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            other => other,
        }
    }

    fn write_text(&self, text: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, text)
    }
}

/// In-process shared text.
#[derive(Debug, Default)]
pub struct MemorySharedText {
    text: Mutex<String>,
}

impl MemorySharedText {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            text: Mutex::new(initial.into()),
        }
    }

    pub fn get(&self) -> String {
        self.text
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl SharedText for MemorySharedText {
    fn read_text(&self) -> std::io::Result<String> {
        Ok(self.get())
    }

    fn write_text(&self, text: &str) -> std::io::Result<()> {
        *self
            .text
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = text.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_json_formats_valid_json() {
        assert_eq!(pretty_json(r#"{"a":1}"#), "{\n  \"a\": 1\n}");
        assert_eq!(pretty_json("not json"), "not json");
        assert_eq!(pretty_json(""), "");
    }

    #[test]
    fn test_replace_and_append() {
        let text = MemorySharedText::new("old");
        route_output(&text, OutputFormat::Replace, "new").unwrap();
        assert_eq!(text.get(), "new");
        route_output(&text, OutputFormat::Append, "more").unwrap();
        assert_eq!(text.get(), "new\n\nmore");
        route_output(&text, OutputFormat::Json, "{}").unwrap();
        assert_eq!(text.get(), "{}");
    }

    #[test]
    fn test_append_onto_empty_keeps_separator() {
        let text = MemorySharedText::default();
        route_output(&text, OutputFormat::Append, "first").unwrap();
        assert_eq!(text.get(), "\n\nfirst");
    }

    #[test]
    fn test_file_shared_text() {
        let dir = tempfile::tempdir().unwrap();
        let text = FileSharedText::new(dir.path().join("clip").join("board.txt"));
        assert_eq!(text.read_text().unwrap(), "");
        route_output(&text, OutputFormat::Append, "a").unwrap();
        route_output(&text, OutputFormat::Append, "b").unwrap();
        assert_eq!(text.read_text().unwrap(), "\n\na\n\nb");
    }
}
