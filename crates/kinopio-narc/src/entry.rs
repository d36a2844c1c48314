//! NARC archive entry.

use std::path::Path;

/// A file stored in a NARC archive.
///
/// Names are relative paths using `/` as the separator. The archive layer
/// attaches no meaning to them beyond exact string matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarcEntry {
    /// Path within the archive.
    name: String,
    /// File contents.
    data: Vec<u8>,
}

impl NarcEntry {
    /// Create a new entry.
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Get the file name/path.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the file contents.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replace the file contents, returning the previous ones.
    #[inline]
    pub fn set_data(&mut self, data: Vec<u8>) -> Vec<u8> {
        std::mem::replace(&mut self.data, data)
    }

    /// Consume the entry and return its contents.
    #[inline]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Size of the contents in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Get the file extension, if any.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.name).extension().and_then(|ext| ext.to_str())
    }
}
