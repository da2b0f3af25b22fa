//! File-backed accumulating training set.
//!
//! The store owns a single `.ts` file that is appended to indefinitely.
//! Mutation is read-modify-write within one call; callers that share a store
//! across tasks serialize access (the server holds it behind a mutex).

use crate::dataset::format::{self, FormatError, TsDocument};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Header tag that enumerates the known activity labels.
const CLASS_LABEL_TAG: &str = "@classLabel";

/// Handle to the dataset file.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    path: PathBuf,
}

impl DatasetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the whole dataset file.
    pub fn load(&self) -> Result<TsDocument, StoreError> {
        let text = std::fs::read_to_string(&self.path).map_err(StoreError::io)?;
        format::parse(&text).map_err(StoreError::Format)
    }

    /// Append one labeled sample line and register its label in the header.
    ///
    /// The sample lands as `<data>:<label>` on its own line, so the file's
    /// line count grows by exactly one. The header's label enumeration is
    /// then updated idempotently.
    pub fn append_sample(&self, data: &str, label: &str) -> Result<(), StoreError> {
        // Keep one sample per line even if the file lost its trailing newline.
        let bytes = std::fs::read(&self.path).map_err(StoreError::io)?;
        let needs_newline = !bytes.is_empty() && !bytes.ends_with(b"\n");

        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(StoreError::io)?;
        if needs_newline {
            file.write_all(b"\n").map_err(StoreError::io)?;
        }
        file.write_all(format!("{data}:{label}\n").as_bytes())
            .map_err(StoreError::io)?;
        drop(file);

        self.register_label(label)?;
        Ok(())
    }

    /// Add `label` to the `@classLabel` header line unless it is already
    /// present as an exact whitespace-delimited token.
    ///
    /// Returns `true` when the header was changed.
    pub fn register_label(&self, label: &str) -> Result<bool, StoreError> {
        let text = std::fs::read_to_string(&self.path).map_err(StoreError::io)?;
        let mut lines: Vec<String> = text.lines().map(|l| l.to_string()).collect();

        let idx = lines
            .iter()
            .position(|l| l.trim_start().starts_with(CLASS_LABEL_TAG))
            .ok_or(StoreError::MissingClassLabelLine)?;

        let mut tokens: Vec<&str> = lines[idx].split_whitespace().collect();
        if tokens.iter().skip(2).any(|&t| t == label) {
            return Ok(false);
        }

        let rewritten = if tokens.get(1) == Some(&"false") {
            // First label of a previously unlabeled dataset.
            format!("{CLASS_LABEL_TAG} true {label}")
        } else {
            tokens.push(label);
            tokens.join(" ")
        };
        lines[idx] = rewritten;

        let mut out = lines.join("\n");
        out.push('\n');
        std::fs::write(&self.path, out).map_err(StoreError::io)?;
        Ok(true)
    }

    /// Labels enumerated on the header's `@classLabel` line.
    pub fn known_labels(&self) -> Result<Vec<String>, StoreError> {
        let text = std::fs::read_to_string(&self.path).map_err(StoreError::io)?;
        let line = text
            .lines()
            .find(|l| l.trim_start().starts_with(CLASS_LABEL_TAG))
            .ok_or(StoreError::MissingClassLabelLine)?;
        Ok(line
            .split_whitespace()
            .skip(2)
            .map(|s| s.to_string())
            .collect())
    }

    /// Number of lines in the dataset file.
    pub fn line_count(&self) -> Result<usize, StoreError> {
        let text = std::fs::read_to_string(&self.path).map_err(StoreError::io)?;
        Ok(text.lines().count())
    }
}

/// Dataset store errors.
#[derive(Debug)]
pub enum StoreError {
    Io(String),
    Format(FormatError),
    MissingClassLabelLine,
}

impl StoreError {
    fn io(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "IO error: {e}"),
            StoreError::Format(e) => write!(f, "format error: {e}"),
            StoreError::MissingClassLabelLine => {
                write!(f, "dataset header has no {CLASS_LABEL_TAG} line")
            }
        }
    }
}

impl std::error::Error for StoreError {}
