//! DOCX container detection and validation.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Container format information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocxFormat {
    /// Name of the first entry in the archive (usually `[Content_Types].xml`)
    pub first_entry: Option<String>,
    /// Whether the archive has no entries at all
    pub empty: bool,
}

impl std::fmt::Display for DocxFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.first_entry {
            Some(name) => write!(f, "OOXML package (first part: {})", name),
            None => write!(f, "OOXML package"),
        }
    }
}

/// Zip local file header signature.
const LOCAL_HEADER_MAGIC: &[u8] = b"PK\x03\x04";
/// Zip end-of-central-directory signature (archive without entries).
const EMPTY_ARCHIVE_MAGIC: &[u8] = b"PK\x05\x06";
const LOCAL_HEADER_LEN: usize = 30;
const HEADER_PROBE_LEN: usize = 512;

/// Detect the container format from a file path.
///
/// # Example
/// ```no_run
/// use redocx::detect::detect_format_from_path;
///
/// let format = detect_format_from_path("template.docx").unwrap();
/// println!("{}", format);
/// ```
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<DocxFormat> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut header = Vec::with_capacity(HEADER_PROBE_LEN);
    reader
        .by_ref()
        .take(HEADER_PROBE_LEN as u64)
        .read_to_end(&mut header)?;
    detect_format_from_bytes(&header)
}

/// Detect the container format from the leading bytes of a file.
///
/// # Returns
/// * `Ok(DocxFormat)` if the data starts with a zip header
/// * `Err(Error::UnknownFormat)` otherwise
pub fn detect_format_from_bytes(data: &[u8]) -> Result<DocxFormat> {
    if data.starts_with(EMPTY_ARCHIVE_MAGIC) {
        return Ok(DocxFormat {
            first_entry: None,
            empty: true,
        });
    }

    if data.len() < LOCAL_HEADER_LEN || !data.starts_with(LOCAL_HEADER_MAGIC) {
        return Err(Error::UnknownFormat);
    }

    // File name length lives at offset 26 of the local header, the name right after it.
    let name_len = u16::from_le_bytes([data[26], data[27]]) as usize;
    let first_entry = data
        .get(LOCAL_HEADER_LEN..LOCAL_HEADER_LEN + name_len)
        .map(|name| String::from_utf8_lossy(name).into_owned());

    Ok(DocxFormat {
        first_entry,
        empty: false,
    })
}

/// Check if a file looks like a DOCX container.
pub fn is_docx<P: AsRef<Path>>(path: P) -> bool {
    detect_format_from_path(path).is_ok()
}

/// Check if bytes look like a DOCX container.
pub fn is_docx_bytes(data: &[u8]) -> bool {
    detect_format_from_bytes(data).is_ok()
}
