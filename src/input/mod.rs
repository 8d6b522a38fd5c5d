//! Note Intake
//!
//! Collects debate-note files from paths or directories, classifies each by
//! filename, and caps raw text length before the pipeline sees it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::InputConfig;
use crate::types::{BriefError, NoteKind, Result};

/// One note file ready for the pipeline
#[derive(Debug, Clone)]
pub struct InputFile {
    pub path: PathBuf,
    pub kind: NoteKind,
    pub content: String,
}

impl InputFile {
    /// File name for provenance stamping
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Classify a note by filename. Substring match, case-insensitive;
/// unmatched files are still processed, just unlabeled.
pub fn detect_kind(path: &Path) -> NoteKind {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if name.contains("lecture") {
        NoteKind::Lecture
    } else if name.contains("round") {
        NoteKind::Round
    } else if name.contains("research") {
        NoteKind::Research
    } else {
        NoteKind::Other
    }
}

/// Expand the given paths into note files: files are taken as-is, directories
/// are scanned one level deep for recognized extensions. Returns an error
/// when nothing usable is found.
pub fn collect_inputs(paths: &[PathBuf], config: &InputConfig) -> Result<Vec<InputFile>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = fs::read_dir(path)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|p| p.is_file() && has_note_extension(p, config))
                .collect();
            entries.sort();
            for entry in entries {
                files.push(load_file(&entry, config)?);
            }
        } else if path.is_file() {
            files.push(load_file(path, config)?);
        } else {
            return Err(BriefError::Config(format!(
                "Input path does not exist: {}",
                path.display()
            )));
        }
    }

    if files.is_empty() {
        return Err(BriefError::Config(
            "No note files found in the given paths".to_string(),
        ));
    }

    Ok(files)
}

fn has_note_extension(path: &Path, config: &InputConfig) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            config.extensions.iter().any(|allowed| *allowed == ext)
        })
        .unwrap_or(false)
}

fn load_file(path: &Path, config: &InputConfig) -> Result<InputFile> {
    let mut content = fs::read_to_string(path)?;
    if content.chars().count() > config.max_chars {
        warn!(
            path = %path.display(),
            max_chars = config.max_chars,
            "Note exceeds length cap, truncating"
        );
        content = truncate_chars(&content, config.max_chars);
    }
    let kind = detect_kind(path);
    debug!(path = %path.display(), ?kind, "Collected note");
    Ok(InputFile {
        path: path.to_path_buf(),
        kind,
        content,
    })
}

/// Truncate to at most `max` characters, always on a char boundary
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
