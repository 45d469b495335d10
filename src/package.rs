//! DOCX container reading and deterministic writing.
//!
//! A package is kept as the ordered list of its zip entries. Only the main
//! document part is ever rewritten; every other part is carried over byte for
//! byte when the package is serialized again.

use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};
use crate::xml::XmlDocument;

const ROOT_RELS: &str = "_rels/.rels";
const DEFAULT_MAIN_PART: &str = "word/document.xml";
const DEFAULT_STYLES_PART: &str = "word/styles.xml";
const REL_OFFICE_DOCUMENT: &str = "/officeDocument";
const REL_STYLES: &str = "/styles";
/// Upper bound on the buffer reserved from an entry's declared size.
const MAX_PREALLOC: usize = 1 << 20;

/// A single entry of the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Entry name inside the archive, e.g. `word/document.xml`
    pub name: String,
    /// Raw entry content
    pub data: Vec<u8>,
}

/// An opened `.docx` container.
#[derive(Debug, Clone)]
pub struct Package {
    parts: Vec<Part>,
    main_part: String,
    styles_part: String,
}

impl Package {
    /// Open a package from a file path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Read a package from any reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    /// Read a package from bytes.
    ///
    /// Any failure to decode the archive or one of its entries is reported
    /// as `TemplateInvalid`.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data)).map_err(invalid_container)?;
        let mut parts = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(invalid_container)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let declared = usize::try_from(entry.size()).unwrap_or(usize::MAX);
            let mut content = Vec::with_capacity(declared.min(MAX_PREALLOC));
            entry.read_to_end(&mut content).map_err(|e| {
                Error::TemplateInvalid(format!("part '{}': {}", name, e))
            })?;
            parts.push(Part {
                name,
                data: content,
            });
        }

        Self::from_parts(parts)
    }

    /// Build a package from already materialized parts.
    ///
    /// Fails with `TemplateInvalid` when the main document part cannot be found.
    pub fn from_parts(parts: Vec<Part>) -> Result<Self> {
        let mut package = Self {
            parts,
            main_part: String::new(),
            styles_part: String::new(),
        };

        package.main_part = package
            .find_related(ROOT_RELS, "", REL_OFFICE_DOCUMENT)
            .unwrap_or_else(|| DEFAULT_MAIN_PART.to_string());
        if package.part(&package.main_part).is_none() {
            return Err(Error::TemplateInvalid(format!(
                "main document part '{}' is missing",
                package.main_part
            )));
        }

        let main_rels = rels_path_for(&package.main_part);
        let main_dir = parent_dir(&package.main_part).to_string();
        package.styles_part = package
            .find_related(&main_rels, &main_dir, REL_STYLES)
            .unwrap_or_else(|| DEFAULT_STYLES_PART.to_string());

        log::debug!(
            "Package opened: {} parts, main={}, styles={}",
            package.parts.len(),
            package.main_part,
            package.styles_part
        );
        Ok(package)
    }

    /// Build a minimal package around a body and a style sheet.
    ///
    /// `document_xml` and `styles_xml` are complete part contents.
    pub fn from_document_xml(document_xml: &str, styles_xml: &str) -> Result<Self> {
        Self::from_parts(vec![
            Part {
                name: "[Content_Types].xml".into(),
                data: CONTENT_TYPES_XML.as_bytes().to_vec(),
            },
            Part {
                name: ROOT_RELS.into(),
                data: ROOT_RELS_XML.as_bytes().to_vec(),
            },
            Part {
                name: DEFAULT_MAIN_PART.into(),
                data: document_xml.as_bytes().to_vec(),
            },
            Part {
                name: "word/_rels/document.xml.rels".into(),
                data: DOCUMENT_RELS_XML.as_bytes().to_vec(),
            },
            Part {
                name: DEFAULT_STYLES_PART.into(),
                data: styles_xml.as_bytes().to_vec(),
            },
        ])
    }

    /// The built-in template used when no template is supplied.
    pub fn blank() -> Result<Self> {
        Self::from_document_xml(BLANK_DOCUMENT_XML, BLANK_STYLES_XML)
    }

    /// All parts in archive order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Names of all parts in archive order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.name.as_str())
    }

    /// Raw content of a part.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.data.as_slice())
    }

    /// Replace the content of a part, appending it when absent.
    pub fn replace_part(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|p| p.name == name) {
            Some(part) => part.data = data,
            None => self.parts.push(Part {
                name: name.to_string(),
                data,
            }),
        }
    }

    /// Name of the main document part.
    pub fn main_part_name(&self) -> &str {
        &self.main_part
    }

    /// Name of the style definitions part.
    pub fn styles_part_name(&self) -> &str {
        &self.styles_part
    }

    /// Parse the main document part.
    pub fn document_xml(&self) -> Result<XmlDocument> {
        let data = self.part(&self.main_part).ok_or_else(|| {
            Error::TemplateInvalid(format!("main document part '{}' is missing", self.main_part))
        })?;
        XmlDocument::parse(data)
    }

    /// Parse the style definitions part.
    pub fn styles_xml(&self) -> Result<XmlDocument> {
        let data = self.part(&self.styles_part).ok_or_else(|| {
            Error::TemplateInvalid(format!(
                "style definitions part '{}' is missing",
                self.styles_part
            ))
        })?;
        XmlDocument::parse(data)
    }

    /// Replace the main document part with a serialized tree.
    pub fn set_document_xml(&mut self, document: &XmlDocument) {
        let name = self.main_part.clone();
        self.replace_part(&name, document.to_bytes());
    }

    /// Serialize the package.
    ///
    /// Entries are written in their original order with deflate compression
    /// and a fixed timestamp, so equal packages give equal bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        for part in &self.parts {
            writer.start_file(part.name.as_str(), options)?;
            writer.write_all(&part.data)?;
        }

        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }

    /// Resolve the target of the first relationship of the given type.
    fn find_related(&self, rels_part: &str, base_dir: &str, type_suffix: &str) -> Option<String> {
        let data = self.part(rels_part)?;
        let rels = match XmlDocument::parse(data) {
            Ok(rels) => rels,
            Err(e) => {
                log::warn!("Ignoring unreadable relationships part {}: {}", rels_part, e);
                return None;
            }
        };

        let target = rels
            .root
            .children_named("Relationship")
            .filter(|r| r.attr("TargetMode") != Some("External"))
            .find(|r| r.attr("Type").is_some_and(|t| t.ends_with(type_suffix)))
            .and_then(|r| r.attr("Target"))
            .map(|target| resolve_target(base_dir, target));
        target
    }
}

fn invalid_container(err: zip::result::ZipError) -> Error {
    Error::TemplateInvalid(format!("container: {}", err))
}

/// Relationships part belonging to a part, e.g. `word/_rels/document.xml.rels`.
fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

fn parent_dir(part: &str) -> &str {
    part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    let (mut segments, rest): (Vec<&str>, &str) = match target.strip_prefix('/') {
        Some(absolute) => (Vec::new(), absolute),
        None => (
            base_dir.split('/').filter(|s| !s.is_empty()).collect(),
            target,
        ),
    };

    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const BLANK_DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr></w:body></w:document>"#;

const BLANK_STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style><w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:pPr><w:jc w:val="center"/></w:pPr><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:rPr><w:b/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Caption"><w:name w:val="caption"/><w:basedOn w:val="Normal"/><w:pPr><w:jc w:val="center"/></w:pPr></w:style><w:style w:type="paragraph" w:styleId="ListNumber"><w:name w:val="List Number"/><w:basedOn w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="Signature"><w:name w:val="Signature"/><w:basedOn w:val="Normal"/></w:style><w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/></w:style></w:styles>"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_package() {
        let pkg = Package::blank().unwrap();
        assert_eq!(pkg.main_part_name(), "word/document.xml");
        assert_eq!(pkg.styles_part_name(), "word/styles.xml");
        assert!(pkg.document_xml().is_ok());
        assert!(pkg.styles_xml().is_ok());
    }

    #[test]
    fn test_round_trip_preserves_parts() {
        let pkg = Package::blank().unwrap();
        let bytes = pkg.to_bytes().unwrap();
        let reopened = Package::from_bytes(&bytes).unwrap();
        assert_eq!(pkg.parts(), reopened.parts());
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let pkg = Package::blank().unwrap();
        assert_eq!(pkg.to_bytes().unwrap(), pkg.to_bytes().unwrap());
    }

    #[test]
    fn test_relationship_resolution() {
        let rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="/doc/main.xml"/></Relationships>"#;
        let main_rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="../shared/styles.xml"/></Relationships>"#;
        let pkg = Package::from_parts(vec![
            Part {
                name: ROOT_RELS.into(),
                data: rels.as_bytes().to_vec(),
            },
            Part {
                name: "doc/main.xml".into(),
                data: BLANK_DOCUMENT_XML.as_bytes().to_vec(),
            },
            Part {
                name: "doc/_rels/main.xml.rels".into(),
                data: main_rels.as_bytes().to_vec(),
            },
            Part {
                name: "shared/styles.xml".into(),
                data: BLANK_STYLES_XML.as_bytes().to_vec(),
            },
        ])
        .unwrap();

        assert_eq!(pkg.main_part_name(), "doc/main.xml");
        assert_eq!(pkg.styles_part_name(), "shared/styles.xml");
        assert!(pkg.styles_xml().is_ok());
    }

    #[test]
    fn test_missing_main_part() {
        let result = Package::from_parts(vec![Part {
            name: "[Content_Types].xml".into(),
            data: CONTENT_TYPES_XML.as_bytes().to_vec(),
        }]);
        assert!(matches!(result, Err(Error::TemplateInvalid(_))));
    }

    #[test]
    fn test_not_a_zip() {
        let result = Package::from_bytes(b"this is plain text, not a container");
        assert!(matches!(result, Err(Error::TemplateInvalid(_))));
    }

    /// Byte range of an entry's compressed data in a freshly written archive.
    fn entry_data_range(bytes: &[u8], name: &str) -> std::ops::Range<usize> {
        let name_at = (30..bytes.len() - name.len())
            .find(|&at| {
                &bytes[at..at + name.len()] == name.as_bytes()
                    && bytes[at - 30..at - 26] == *b"PK\x03\x04"
            })
            .unwrap();
        let header = name_at - 30;
        let le16 = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]) as usize;
        let le32 = |at: usize| {
            u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]) as usize
        };
        let start = name_at + le16(header + 26) + le16(header + 28);
        start..start + le32(header + 18)
    }

    #[test]
    fn test_corrupt_entry_is_template_invalid() {
        let mut bytes = Package::blank().unwrap().to_bytes().unwrap();
        let range = entry_data_range(&bytes, DEFAULT_MAIN_PART);
        assert!(range.len() > 4);
        let mid = range.start + range.len() / 2;
        bytes[mid] ^= 0xFF;
        bytes[mid + 1] ^= 0xFF;

        let err = Package::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::TemplateInvalid(_)), "got {:?}", err);
        assert_eq!(err.kind(), crate::error::ErrorKind::TemplateInvalid);
    }

    #[test]
    fn test_truncated_archive_is_template_invalid() {
        let bytes = Package::blank().unwrap().to_bytes().unwrap();
        let result = Package::from_bytes(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(Error::TemplateInvalid(_))));
    }

    #[test]
    fn test_replace_part() {
        let mut pkg = Package::blank().unwrap();
        pkg.replace_part("word/numbering.xml", b"<w:numbering/>".to_vec());
        assert_eq!(pkg.part("word/numbering.xml"), Some(&b"<w:numbering/>"[..]));
        pkg.replace_part("word/numbering.xml", b"<x/>".to_vec());
        assert_eq!(pkg.part("word/numbering.xml"), Some(&b"<x/>"[..]));
        assert_eq!(pkg.parts().len(), 6);
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("word", "styles.xml"), "word/styles.xml");
        assert_eq!(resolve_target("word", "/word/styles.xml"), "word/styles.xml");
        assert_eq!(resolve_target("a/b", "../c.xml"), "a/c.xml");
        assert_eq!(resolve_target("", "word/document.xml"), "word/document.xml");
    }
}
