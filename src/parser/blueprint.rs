//! Body content → [`Blueprint`].

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::model::{BlockKind, BlockSlot, Blueprint, StyleCatalog, TableDescriptor};
use crate::package::Package;
use crate::xml::{Element, XmlDocument};

use super::classify::classify_paragraph;
use super::options::ExtractOptions;

/// Walks a template body and records one slot per paragraph.
#[derive(Debug, Clone, Default)]
pub struct BlueprintExtractor {
    options: ExtractOptions,
}

/// Cell coordinates of the paragraph being visited.
#[derive(Clone, Copy)]
struct CellPos<'a> {
    table_id: &'a str,
    row: usize,
    col: usize,
}

struct Walk<'c> {
    catalog: &'c StyleCatalog,
    default_style: String,
    options: &'c ExtractOptions,
    slots: Vec<BlockSlot>,
    tables: Vec<TableDescriptor>,
    used_ids: HashSet<String>,
    ignored: usize,
}

impl BlueprintExtractor {
    /// Create an extractor with the given options.
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// Extract the blueprint of a package.
    pub fn extract(&self, package: &Package, catalog: &StyleCatalog) -> Result<Blueprint> {
        let document = package.document_xml()?;
        self.extract_from_xml(&document, catalog)
    }

    /// Extract the blueprint of a parsed main document part.
    pub fn extract_from_xml(
        &self,
        document: &XmlDocument,
        catalog: &StyleCatalog,
    ) -> Result<Blueprint> {
        let body = body_of(document)?;

        let mut walk = Walk {
            catalog,
            default_style: catalog
                .default_paragraph_style()
                .map(|s| s.name.clone())
                .unwrap_or_else(|| "Normal".to_string()),
            options: &self.options,
            slots: Vec::new(),
            tables: Vec::new(),
            used_ids: HashSet::new(),
            ignored: 0,
        };
        walk.blocks(body, None);

        if walk.ignored > 0 {
            log::warn!(
                "Template has more than {} paragraphs; {} ignored",
                self.options.max_slots,
                walk.ignored
            );
        }
        log::debug!(
            "Blueprint extracted: {} slots, {} tables",
            walk.slots.len(),
            walk.tables.len()
        );
        Ok(Blueprint::new(walk.slots, walk.tables))
    }
}

impl Walk<'_> {
    /// Visit block-level content in document order.
    fn blocks(&mut self, parent: &Element, cell: Option<CellPos<'_>>) {
        for child in parent.elements() {
            match child.local_name() {
                "p" => self.paragraph(child, cell),
                "tbl" if cell.is_none() => self.table(child),
                "tbl" => log::debug!("Nested table inside a table cell skipped"),
                "sdt" => {
                    if let Some(content) = child.child("sdtContent") {
                        self.blocks(content, cell);
                    }
                }
                "customXml" => self.blocks(child, cell),
                _ => {}
            }
        }
    }

    fn paragraph(&mut self, p: &Element, cell: Option<CellPos<'_>>) {
        if self.slots.len() >= self.options.max_slots {
            self.ignored += 1;
            return;
        }

        let style_name = self.style_name_of(p);
        let text = paragraph_text(p);
        let kind = classify_paragraph(&style_name, &text, has_bottom_border(p), cell.is_some());
        let ordinal = self.slots.len() as u32 + 1;

        let mut slot = match cell {
            Some(pos) => BlockSlot::cell(ordinal, style_name, pos.table_id, pos.row, pos.col),
            None => BlockSlot::new(ordinal, style_name, kind),
        };
        slot.sample_text = self.sample_of(kind, &text);
        self.slots.push(slot);
    }

    fn table(&mut self, tbl: &Element) {
        let index = self.tables.len();
        let id = match tbl.child("tblPr").and_then(|pr| pr.child_val("tblCaption")) {
            Some(caption) if !caption.is_empty() && !self.used_ids.contains(caption) => {
                caption.to_string()
            }
            _ => format!("table_{}", index),
        };
        self.used_ids.insert(id.clone());

        let rows: Vec<&Element> = tbl.children_named("tr").collect();
        let cols = rows
            .iter()
            .map(|tr| tr.children_named("tc").count())
            .max()
            .unwrap_or(0);
        let style_name = tbl
            .child("tblPr")
            .and_then(|pr| pr.child_val("tblStyle"))
            .map(|sid| {
                self.catalog
                    .by_id(sid)
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|| sid.to_string())
            });

        self.tables.push(TableDescriptor {
            id: id.clone(),
            index,
            rows: rows.len(),
            cols,
            style_name,
        });

        for (r, tr) in rows.iter().enumerate() {
            for (c, tc) in tr.children_named("tc").enumerate() {
                let pos = CellPos {
                    table_id: &id,
                    row: r,
                    col: c,
                };
                self.blocks(tc, Some(pos));
            }
        }
    }

    fn style_name_of(&self, p: &Element) -> String {
        paragraph_style_id(p)
            .and_then(|id| {
                let found = self.catalog.by_id(id);
                if found.is_none() {
                    log::debug!("Paragraph style id '{}' not in catalog", id);
                }
                found
            })
            .map(|s| s.name.clone())
            .unwrap_or_else(|| self.default_style.clone())
    }

    fn sample_of(&self, kind: BlockKind, text: &str) -> Option<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        match kind {
            BlockKind::Line | BlockKind::SignatureLine => Some(trimmed.to_string()),
            BlockKind::SectionUnderline => None,
            _ if self.options.hint_len == 0 => None,
            _ => Some(hint(trimmed, self.options.hint_len)),
        }
    }
}

fn hint(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

/// The `w:body` element of a main document part.
pub(crate) fn body_of(document: &XmlDocument) -> Result<&Element> {
    if !document.root.is("document") {
        return Err(Error::TemplateInvalid(format!(
            "main document root is <{}>, expected <w:document>",
            document.root.name
        )));
    }
    document
        .root
        .child("body")
        .ok_or_else(|| Error::TemplateInvalid("main document has no body".into()))
}

/// Declared paragraph style id (`w:pPr/w:pStyle/@w:val`).
pub(crate) fn paragraph_style_id(p: &Element) -> Option<&str> {
    p.child("pPr").and_then(|ppr| ppr.child_val("pStyle"))
}

/// Whether the paragraph declares a bottom border.
pub(crate) fn has_bottom_border(p: &Element) -> bool {
    p.child("pPr")
        .and_then(|ppr| ppr.child("pBdr"))
        .and_then(|bdr| bdr.child("bottom"))
        .is_some_and(|bottom| bottom.attr("val") != Some("nil") && bottom.attr("val") != Some("none"))
}

/// Visible text of a paragraph; tabs and breaks become `\t` and `\n`.
pub(crate) fn paragraph_text(p: &Element) -> String {
    let mut out = String::new();
    collect_visible_text(p, &mut out);
    out
}

fn collect_visible_text(element: &Element, out: &mut String) {
    for child in element.elements() {
        match child.local_name() {
            "t" => out.push_str(&child.text()),
            "tab" => out.push('\t'),
            "br" if child.attr("type") == Some("page") => {}
            "br" | "cr" => out.push('\n'),
            "noBreakHyphen" => out.push('-'),
            "pPr" | "rPr" | "del" | "instrText" | "delText" => {}
            _ => collect_visible_text(child, out),
        }
    }
}
