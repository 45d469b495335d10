//! Plain-text and HTML previews of a produced document.

use quick_xml::escape::escape;

use crate::error::Result;
use crate::package::Package;
use crate::parser::{body_of, has_bottom_border, paragraph_text};
use crate::xml::{Element, XmlDocument};

/// Marker emitted for an empty paragraph carrying a bottom border.
pub const SECTION_UNDERLINE_MARKER: &str = "[SECTION_UNDERLINE]";

/// Plain-text preview of a container.
///
/// Paragraphs are separated by blank lines, table rows become tab-separated
/// lines.
pub fn to_preview_text(container: &[u8]) -> Result<String> {
    let package = Package::from_bytes(container)?;
    package_preview_text(&package)
}

/// Plain-text preview of an opened package.
pub fn package_preview_text(package: &Package) -> Result<String> {
    let document = package.document_xml()?;
    document_preview_text(&document)
}

/// Plain-text preview of a main document part.
pub fn document_preview_text(document: &XmlDocument) -> Result<String> {
    let body = body_of(document)?;
    let mut entries = Vec::new();
    collect_entries(body, &mut entries);
    Ok(entries.join("\n\n").trim().to_string())
}

fn collect_entries(parent: &Element, entries: &mut Vec<String>) {
    for child in parent.elements() {
        match child.local_name() {
            "p" => entries.push(paragraph_entry(child)),
            "tbl" => entries.push(table_entry(child)),
            "sdt" => {
                if let Some(content) = child.child("sdtContent") {
                    collect_entries(content, entries);
                }
            }
            "customXml" => collect_entries(child, entries),
            _ => {}
        }
    }
}

fn paragraph_entry(p: &Element) -> String {
    let text = paragraph_text(p);
    let text = text.trim();
    if text.is_empty() && has_bottom_border(p) {
        SECTION_UNDERLINE_MARKER.to_string()
    } else {
        text.to_string()
    }
}

fn table_entry(tbl: &Element) -> String {
    tbl.children_named("tr")
        .map(|tr| {
            tr.children_named("tc")
                .map(|tc| {
                    tc.children_named("p")
                        .map(|p| paragraph_text(p).trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect::<Vec<_>>()
                .join("\t")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// HTML preview of a plain-text preview: one escaped `<p>` per paragraph.
pub fn to_preview_html(preview: &str) -> String {
    let parts: Vec<String> = preview
        .split("\n\n")
        .map(|paragraph| {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                "<p><br></p>".to_string()
            } else {
                let lines: Vec<String> = paragraph
                    .lines()
                    .map(|line| escape(line).into_owned())
                    .collect();
                format!("<p>{}</p>", lines.join("<br>"))
            }
        })
        .collect();
    parts.join("\n")
}
