//! The produced document container.

use std::fs;
use std::path::Path;

use crate::error::Result;

/// Bytes of a generated `.docx` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputContainer {
    bytes: Vec<u8>,
}

impl OutputContainer {
    /// Wrap serialized container bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Borrow the container bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Take the container bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the container is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Write the container to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, &self.bytes)?;
        Ok(())
    }
}

impl AsRef<[u8]> for OutputContainer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<OutputContainer> for Vec<u8> {
    fn from(output: OutputContainer) -> Self {
        output.bytes
    }
}
