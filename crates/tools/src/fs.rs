//! File system tools.
//!
//! Paths are `~`-expanded. Failures come back as [`FsError`], whose
//! `Display` is the human-readable message handed to the model; nothing here
//! panics on a bad path.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Maximum number of matches listed by `find_files`.
pub const MAX_FIND_RESULTS: usize = 50;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("Error: File '{0}' does not exist.")]
    FileNotFound(String),

    #[error("Error: Directory '{0}' does not exist.")]
    DirectoryNotFound(String),

    #[error("Error reading file: {0}")]
    Read(std::io::Error),

    #[error("Error writing file: {0}")]
    Write(std::io::Error),

    #[error("Error listing directory: {0}")]
    List(std::io::Error),

    #[error("Error finding files: {0}")]
    Find(String),
}

pub type FsResult = std::result::Result<String, FsError>;

pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FileTool;

impl FileTool {
    pub fn read_file(&self, file_path: &str) -> FsResult {
        let path = expand_path(file_path);
        if !path.exists() {
            return Err(FsError::FileNotFound(path.display().to_string()));
        }
        std::fs::read_to_string(&path).map_err(FsError::Read)
    }

    pub fn write_file(&self, file_path: &str, content: &str) -> FsResult {
        let path = expand_path(file_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!(dir = %parent.display(), "Creating parent directories");
                std::fs::create_dir_all(parent).map_err(FsError::Write)?;
            }
        }
        std::fs::write(&path, content).map_err(FsError::Write)?;
        Ok(format!("Successfully wrote to {}", path.display()))
    }

    pub fn list_dir(&self, dir: &str) -> FsResult {
        let path = expand_path(dir);
        if !path.exists() {
            return Err(FsError::DirectoryNotFound(path.display().to_string()));
        }

        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&path).map_err(FsError::List)? {
            let entry = entry.map_err(FsError::List)?;
            let kind = if entry.path().is_dir() { "DIR" } else { "FILE" };
            entries.push((entry.file_name().to_string_lossy().to_string(), kind));
        }

        if entries.is_empty() {
            return Ok("(Empty directory)".to_string());
        }

        entries.sort();
        Ok(entries
            .into_iter()
            .map(|(name, kind)| format!("[{kind}] {name}"))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    pub fn find_files(&self, pattern: &str, dir: &str) -> FsResult {
        let base = expand_path(dir);
        let search = format!(
            "{}/**/{}",
            glob::Pattern::escape(&base.to_string_lossy()),
            pattern
        );

        let mut matches: Vec<PathBuf> = glob::glob(&search)
            .map_err(|e| FsError::Find(e.to_string()))?
            .filter_map(|entry| entry.ok())
            .collect();
        matches.sort();

        if matches.is_empty() {
            return Ok(format!("No files found matching '{pattern}' in '{dir}'"));
        }

        let mut lines: Vec<String> = matches
            .iter()
            .take(MAX_FIND_RESULTS)
            .map(|m| relative_to(m, &base))
            .collect();
        if matches.len() > MAX_FIND_RESULTS {
            lines.push(format!(
                "... (and {} more)",
                matches.len() - MAX_FIND_RESULTS
            ));
        }
        Ok(lines.join("\n"))
    }
}

fn relative_to(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}
