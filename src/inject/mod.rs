//! Injection of filled blocks into a cleared copy of the template.
//!
//! The injector never computes indentation, numbering or spacing: every
//! paragraph references a named style from the template's catalog, and in
//! the default style-only strategy nothing else. Section properties and all
//! parts other than the main document are carried over unchanged.

mod resolve;
mod table;
mod text;

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{BlockKind, BlockSlot, Blueprint, FilledBlock, OutputContainer, StyleCatalog};
use crate::package::Package;
use crate::parser::{body_of, paragraph_text};
use crate::parser::classify::{is_separator_text, is_signature_line_text};
use crate::xml::{Element, Node, XmlDocument};

pub use resolve::{preferred_styles, Resolved, StyleResolver};
pub use table::TableBuilder;
pub use text::{
    render_checkboxes, runs_for_text, split_allegations, strip_enumerator, CHECKBOX_CHECKED,
    CHECKBOX_UNCHECKED,
};

/// How much formatting is written besides the style reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatStrategy {
    /// Style reference only
    #[default]
    StyleOnly,
    /// Also copy the aligned template paragraph's direct formatting and
    /// apply the alignment override table
    FormatCopy,
}

/// Options for injection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InjectOptions {
    /// Formatting strategy
    pub strategy: FormatStrategy,

    /// Last-resort style name (defaults to the catalog's default paragraph style)
    pub default_style: Option<String>,
}

impl InjectOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the formatting strategy.
    pub fn with_strategy(mut self, strategy: FormatStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Use the format-copy strategy.
    pub fn format_copy(mut self) -> Self {
        self.strategy = FormatStrategy::FormatCopy;
        self
    }

    /// Set the last-resort style.
    pub fn with_default_style(mut self, name: impl Into<String>) -> Self {
        self.default_style = Some(name.into());
        self
    }
}

/// Counters describing an injection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionStats {
    /// Paragraphs written at body level
    pub paragraphs: usize,
    /// Tables written
    pub tables: usize,
    /// Table cells that received content
    pub cells_filled: usize,
    /// Blocks that produced no output
    pub skipped: usize,
}

/// Result of an injection.
#[derive(Debug, Clone)]
pub struct Injection {
    /// The produced container
    pub document: OutputContainer,
    /// Counters
    pub stats: InjectionStats,
}

/// Inject blocks into a template.
///
/// See [`Injector::inject`].
pub fn inject(
    package: &Package,
    catalog: &StyleCatalog,
    blueprint: &Blueprint,
    blocks: &[FilledBlock],
    options: &InjectOptions,
) -> Result<Injection> {
    Injector::new(catalog, blueprint, options.clone()).inject(package, blocks)
}

/// One item of the new body, in output order.
enum BodyItem {
    Paragraph(Element),
    Table(String),
}

/// Writes filled blocks into a template.
pub struct Injector<'a> {
    catalog: &'a StyleCatalog,
    blueprint: &'a Blueprint,
    options: InjectOptions,
}

impl<'a> Injector<'a> {
    /// Create an injector for a template's catalog and blueprint.
    pub fn new(catalog: &'a StyleCatalog, blueprint: &'a Blueprint, options: InjectOptions) -> Self {
        Self {
            catalog,
            blueprint,
            options,
        }
    }

    /// Build the output container.
    ///
    /// Fails with `InjectionFailed` when a block references a table missing
    /// from the blueprint, a cell outside its table, a table-cell block has
    /// no table reference, or no style resolves. Nothing is emitted on
    /// failure.
    pub fn inject(&self, package: &Package, blocks: &[FilledBlock]) -> Result<Injection> {
        let document = package.document_xml()?;
        let body = body_of(&document)?;
        let template = TemplateBody::collect(body);

        let mut resolver =
            StyleResolver::new(self.catalog, self.blueprint, self.options.default_style.as_deref());
        let mut items: Vec<BodyItem> = Vec::new();
        let mut tables: BTreeMap<String, TableBuilder> = BTreeMap::new();
        let mut stats = InjectionStats::default();
        // page break waiting for the next emitted paragraph or table
        let mut page_break = false;

        for (i, block) in blocks.iter().enumerate() {
            let resolved = resolver.resolve(block)?;
            page_break |= block.page_break_before;

            if block.kind == BlockKind::TableCell {
                let (table_id, row, col) = self.cell_of(i, block)?;
                let builder = match tables.entry(table_id.clone()) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => {
                        let built = self.clone_table(&template, &table_id)?;
                        if std::mem::take(&mut page_break) {
                            items.push(BodyItem::Paragraph(page_break_paragraph()));
                        }
                        items.push(BodyItem::Table(table_id));
                        entry.insert(built)
                    }
                };
                if block.text.trim().is_empty() {
                    stats.skipped += 1;
                    continue;
                }
                let content = render_checkboxes(&block.text);
                let paragraph = self.paragraph(&resolved, &template, block.kind, &content);
                builder.place(row, col, paragraph)?;
                continue;
            }

            match self.text_for(block, resolved.slot) {
                Some(parts) => {
                    for content in parts {
                        let mut paragraph =
                            self.paragraph(&resolved, &template, block.kind, &content);
                        if std::mem::take(&mut page_break) {
                            paragraph.children.insert(1, Node::Element(page_break_run()));
                        }
                        items.push(BodyItem::Paragraph(paragraph));
                    }
                }
                None => stats.skipped += 1,
            }
        }

        if self.blueprint.is_empty() {
            trim_trailing_separators(&mut items);
        }

        let mut new_body = Element {
            name: body.name.clone(),
            attributes: body.attributes.clone(),
            children: Vec::with_capacity(items.len() + 1),
        };
        for item in items {
            match item {
                BodyItem::Paragraph(p) => {
                    stats.paragraphs += 1;
                    new_body.children.push(Node::Element(p));
                }
                BodyItem::Table(id) => {
                    if let Some(builder) = tables.remove(&id) {
                        stats.tables += 1;
                        stats.cells_filled += builder.cells_filled();
                        new_body.children.push(Node::Element(builder.into_element()));
                    }
                }
            }
        }
        if let Some(sect_pr) = body.child("sectPr") {
            new_body.children.push(Node::Element(sect_pr.clone()));
        }

        let output = replace_body(&document, new_body);
        let mut package = package.clone();
        package.set_document_xml(&output);
        let bytes = package.to_bytes()?;

        log::debug!(
            "Injected {} blocks: {} paragraphs, {} tables, {} cells, {} skipped",
            blocks.len(),
            stats.paragraphs,
            stats.tables,
            stats.cells_filled,
            stats.skipped
        );
        Ok(Injection {
            document: OutputContainer::new(bytes),
            stats,
        })
    }

    /// Cell address of a table-cell block, checked against the blueprint.
    fn cell_of(&self, i: usize, block: &FilledBlock) -> Result<(String, usize, usize)> {
        let (table_id, row, col) = match (&block.cell, block.slot_ref.and_then(|o| self.blueprint.slot(o))) {
            (Some(cell), _) => (cell.table_id.clone(), cell.row, cell.col),
            (None, Some(BlockSlot {
                table_id: Some(table_id),
                row: Some(row),
                col: Some(col),
                ..
            })) => (table_id.clone(), *row, *col),
            _ => {
                return Err(Error::InjectionFailed(format!(
                    "block {}: table_cell block has no table reference",
                    i
                )))
            }
        };

        let table = self.blueprint.table(&table_id).ok_or_else(|| {
            Error::InjectionFailed(format!(
                "block {}: table '{}' is not in the blueprint",
                i, table_id
            ))
        })?;
        if !table.contains_cell(row, col) {
            return Err(Error::InjectionFailed(format!(
                "block {}: cell ({}, {}) is outside table '{}'",
                i, row, col, table_id
            )));
        }
        Ok((table_id, row, col))
    }

    fn clone_table(&self, template: &TemplateBody<'_>, table_id: &str) -> Result<TableBuilder> {
        let descriptor = self.blueprint.table(table_id).ok_or_else(|| {
            Error::InjectionFailed(format!("table '{}' is not in the blueprint", table_id))
        })?;
        let element = template.tables.get(descriptor.index).ok_or_else(|| {
            Error::InjectionFailed(format!(
                "table '{}' (index {}) is not in the template body",
                table_id, descriptor.index
            ))
        })?;
        Ok(TableBuilder::from_template(
            descriptor,
            element,
            self.options.strategy == FormatStrategy::FormatCopy,
        ))
    }

    /// Paragraph texts of a non-table block, or `None` when it produces nothing.
    ///
    /// Every kind yields one paragraph except allegations, which yield one
    /// per hand-numbered item.
    fn text_for(&self, block: &FilledBlock, slot: Option<&BlockSlot>) -> Option<Vec<String>> {
        let text = block.text.trim();
        let sample = slot
            .filter(|s| s.kind == block.kind)
            .and_then(|s| s.sample_text.as_deref())
            .filter(|s| !s.is_empty());

        let single = match block.kind {
            BlockKind::SectionUnderline => Some(String::new()),
            BlockKind::Line => {
                if !text.is_empty() {
                    Some(render_checkboxes(text))
                } else {
                    sample.map(str::to_string)
                }
            }
            BlockKind::SignatureLine => {
                let is_line = is_signature_line_text(text) || is_separator_text(text);
                match sample {
                    Some(line) if text.is_empty() || is_line => Some(line.to_string()),
                    Some(line) => Some(format!("{}  {}", line, render_checkboxes(text))),
                    None if !text.is_empty() => Some(render_checkboxes(text)),
                    None => None,
                }
            }
            _ if text.is_empty() => None,
            BlockKind::Allegation => {
                let parts: Vec<String> = split_allegations(text)
                    .into_iter()
                    .map(|part| render_checkboxes(strip_enumerator(part)))
                    .filter(|part| !part.trim().is_empty())
                    .collect();
                return (!parts.is_empty()).then_some(parts);
            }
            _ => Some(render_checkboxes(text)),
        };
        single.map(|content| vec![content])
    }

    /// Build a paragraph referencing the resolved style.
    fn paragraph(
        &self,
        resolved: &Resolved<'_>,
        template: &TemplateBody<'_>,
        kind: BlockKind,
        content: &str,
    ) -> Element {
        let source = match self.options.strategy {
            FormatStrategy::StyleOnly => None,
            FormatStrategy::FormatCopy => resolved
                .slot
                .and_then(|s| template.paragraph(s.ordinal)),
        };

        let mut ppr = match source.and_then(|p| p.child("pPr")) {
            Some(original) => copy_paragraph_properties(original),
            None => Element::new("w:pPr"),
        };
        ppr.children.insert(
            0,
            Node::Element(Element::new("w:pStyle").with_attr("w:val", resolved.style.id.as_str())),
        );
        if self.options.strategy == FormatStrategy::FormatCopy {
            if let Some(value) = alignment_override(kind) {
                set_alignment(&mut ppr, value);
            }
        }

        let rpr = source
            .and_then(|p| p.child("r"))
            .and_then(|r| r.child("rPr"));

        let mut p = Element::new("w:p").with_child(ppr);
        for run in runs_for_text(content, rpr) {
            p = p.with_child(run);
        }
        p
    }
}

fn page_break_run() -> Element {
    Element::new("w:r").with_child(Element::new("w:br").with_attr("w:type", "page"))
}

/// Unstyled paragraph holding only a page break, used ahead of a table.
fn page_break_paragraph() -> Element {
    Element::new("w:p").with_child(page_break_run())
}

/// Template paragraphs and tables in blueprint walk order.
struct TemplateBody<'d> {
    paragraphs: Vec<&'d Element>,
    tables: Vec<&'d Element>,
}

impl<'d> TemplateBody<'d> {
    fn collect(body: &'d Element) -> Self {
        let mut collected = Self {
            paragraphs: Vec::new(),
            tables: Vec::new(),
        };
        collected.visit(body, false);
        collected
    }

    fn visit(&mut self, parent: &'d Element, in_table: bool) {
        for child in parent.elements() {
            match child.local_name() {
                "p" => self.paragraphs.push(child),
                "tbl" if !in_table => {
                    self.tables.push(child);
                    for tr in child.children_named("tr") {
                        for tc in tr.children_named("tc") {
                            self.visit(tc, true);
                        }
                    }
                }
                "sdt" => {
                    if let Some(content) = child.child("sdtContent") {
                        self.visit(content, in_table);
                    }
                }
                "customXml" => self.visit(child, in_table),
                _ => {}
            }
        }
    }

    /// Template paragraph behind a slot ordinal.
    fn paragraph(&self, ordinal: u32) -> Option<&'d Element> {
        let index = (ordinal as usize).checked_sub(1)?;
        self.paragraphs.get(index).copied()
    }
}

/// Direct paragraph formatting worth copying: everything except the style
/// reference, paragraph mark run properties, section breaks and revisions.
fn copy_paragraph_properties(original: &Element) -> Element {
    let mut ppr = original.clone();
    for local in ["pStyle", "rPr", "sectPr", "pPrChange"] {
        ppr.remove_children(local);
    }
    ppr
}

fn alignment_override(kind: BlockKind) -> Option<&'static str> {
    match kind {
        BlockKind::Heading | BlockKind::Caption => Some("center"),
        BlockKind::Paragraph | BlockKind::Allegation => Some("both"),
        BlockKind::Signature | BlockKind::Line | BlockKind::SignatureLine => Some("left"),
        BlockKind::SectionUnderline | BlockKind::TableCell => None,
    }
}

/// Set `w:jc`, keeping the schema order of paragraph properties.
fn set_alignment(ppr: &mut Element, value: &str) {
    const AFTER_JC: [&str; 9] = [
        "textDirection",
        "textAlignment",
        "textboxTightWrap",
        "outlineLvl",
        "divId",
        "cnfStyle",
        "rPr",
        "sectPr",
        "pPrChange",
    ];
    ppr.remove_children("jc");
    let position = ppr
        .children
        .iter()
        .position(|n| matches!(n, Node::Element(e) if AFTER_JC.contains(&e.local_name())))
        .unwrap_or(ppr.children.len());
    ppr.children.insert(
        position,
        Node::Element(Element::new("w:jc").with_attr("w:val", value)),
    );
}

/// Drop trailing blank and separator paragraphs (no-template path only).
fn trim_trailing_separators(items: &mut Vec<BodyItem>) {
    while let Some(BodyItem::Paragraph(p)) = items.last() {
        let text = paragraph_text(p);
        let t = text.trim();
        if t.is_empty() || t.starts_with(['-', '=', '_']) {
            items.pop();
        } else {
            break;
        }
    }
}

/// Copy of the document with its body replaced.
fn replace_body(document: &XmlDocument, new_body: Element) -> XmlDocument {
    let mut output = document.clone();
    let mut new_body = Some(new_body);
    for node in output.root.children.iter_mut() {
        if let Node::Element(e) = node {
            if e.is("body") {
                if let Some(body) = new_body.take() {
                    *e = body;
                }
            }
        }
    }
    output
}
