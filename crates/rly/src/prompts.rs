//! Markdown prompt library.
//!
//! Serves a directory of `*.md` prompt templates read-only. Lookup names
//! are restricted to a single safe path segment so the API can never be
//! walked out of the prompt directory.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

/// Listing entry for one prompt file.
#[derive(Debug, Clone, Serialize)]
pub struct PromptEntry {
    pub name: String,
    pub filename: String,
}

/// Outcome of a prompt lookup.
#[derive(Debug)]
pub enum PromptLookup {
    Found(String),
    InvalidName,
    NotFound,
}

/// Read-only library of markdown prompts in one directory.
#[derive(Debug, Clone)]
pub struct PromptStore {
    dir: PathBuf,
}

impl PromptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// List every markdown prompt. A missing directory lists as empty.
    pub fn list(&self) -> Result<Vec<PromptEntry>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err).context("reading prompts directory"),
        };

        let mut prompts = Vec::new();
        for entry in entries {
            let entry = entry.context("reading prompts directory entry")?;
            let filename = entry.file_name().to_string_lossy().into_owned();
            if let Some(name) = filename.strip_suffix(".md") {
                let name = name.to_string();
                prompts.push(PromptEntry { name, filename });
            }
        }

        // Directory iteration order is platform-dependent.
        prompts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(prompts)
    }

    /// Load one prompt by name.
    pub fn load(&self, name: &str) -> Result<PromptLookup> {
        if !is_valid_name(name) {
            return Ok(PromptLookup::InvalidName);
        }

        let path = self.dir.join(format!("{name}.md"));
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(PromptLookup::Found(content.trim().to_string())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(PromptLookup::NotFound),
            Err(err) => Err(err).with_context(|| format!("reading prompt {}", path.display())),
        }
    }
}

/// Names are a single path segment: ASCII alphanumerics, `-` and `_`.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with_files(files: &[(&str, &str)]) -> (TempDir, PromptStore) {
        let tmp = TempDir::new().unwrap();
        for (name, content) in files {
            std::fs::write(tmp.path().join(name), content).unwrap();
        }
        let store = PromptStore::new(tmp.path());
        (tmp, store)
    }

    #[test]
    fn test_list_returns_sorted_markdown_files() {
        let (_tmp, store) = store_with_files(&[
            ("writing.md", "w"),
            ("coding.md", "c"),
            ("notes.txt", "ignored"),
        ]);

        let prompts = store.list().unwrap();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0].name, "coding");
        assert_eq!(prompts[0].filename, "coding.md");
        assert_eq!(prompts[1].name, "writing");
    }

    #[test]
    fn test_list_missing_directory_is_empty() {
        let store = PromptStore::new("/nonexistent/prompts/dir");
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_load_trims_content() {
        let (_tmp, store) = store_with_files(&[("coding.md", "\n# Coding\n\nBe precise.\n\n")]);

        match store.load("coding").unwrap() {
            PromptLookup::Found(content) => assert_eq!(content, "# Coding\n\nBe precise."),
            other => panic!("unexpected lookup: {other:?}"),
        }
    }

    #[test]
    fn test_load_missing_prompt() {
        let (_tmp, store) = store_with_files(&[]);
        assert!(matches!(store.load("absent").unwrap(), PromptLookup::NotFound));
    }

    #[test]
    fn test_load_rejects_unsafe_names() {
        let (_tmp, store) = store_with_files(&[("ok.md", "fine")]);
        for name in ["", "../ok", "a/b", "a b", "ok.md", ".hidden"] {
            assert!(
                matches!(store.load(name).unwrap(), PromptLookup::InvalidName),
                "name {name:?} should be invalid"
            );
        }
        assert!(matches!(store.load("ok").unwrap(), PromptLookup::Found(_)));
    }
}
