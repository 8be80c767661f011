//! In-memory staging area for generated files

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A generated file with content and mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    /// File content as bytes
    pub content: Vec<u8>,
    /// Unix mode bits
    pub permissions: u32,
}

impl File {
    /// Create a new file with content
    pub fn new(content: Vec<u8>) -> Self {
        Self {
            content,
            permissions: 0o644,
        }
    }

    /// Create a new file from string content
    pub fn from_string(content: &str) -> Self {
        Self::new(content.as_bytes().to_vec())
    }

    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = permissions;
        self
    }

    /// Content as text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }

    /// Get file size in bytes
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Files produced by one run, keyed by path relative to the output directory.
///
/// Paths iterate in sorted order so output is written deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryFS {
    files: BTreeMap<PathBuf, File>,
}

impl MemoryFS {
    /// Create a new empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P, file: File) {
        self.files.insert(path.as_ref().to_path_buf(), file);
    }

    /// Add or replace a file from string content
    pub fn add_file_string<P: AsRef<Path>>(&mut self, path: P, content: &str) {
        self.add_file(path, File::from_string(content));
    }

    pub fn get_file<P: AsRef<Path>>(&self, path: P) -> Option<&File> {
        self.files.get(path.as_ref())
    }

    pub fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        self.files.contains_key(path.as_ref())
    }

    /// List all file paths
    pub fn list_files(&self) -> Vec<PathBuf> {
        self.files.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over all files as (path, file) pairs
    pub fn files(&self) -> impl Iterator<Item = (&PathBuf, &File)> {
        self.files.iter()
    }
}
