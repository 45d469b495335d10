//! Style resolution for filled blocks.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::model::{
    BlockKind, BlockSlot, Blueprint, FilledBlock, StyleCatalog, StyleDescriptor, StyleKind,
};
use crate::parser::classify_style_name;

/// Catalog names tried in order when no slot supplies a style.
pub fn preferred_styles(kind: BlockKind) -> &'static [&'static str] {
    match kind {
        BlockKind::Caption => &["Caption", "CaptionStyle", "Title"],
        BlockKind::Heading => &["Heading 1", "Title", "Titre 1", "Heading 2", "Subtitle"],
        BlockKind::Allegation => &["AllegationStyle", "List Number", "List Paragraph", "List", "Normal"],
        BlockKind::Signature => &["Signature", "SignatureStyle", "Closing", "Normal"],
        BlockKind::Line | BlockKind::SignatureLine | BlockKind::SectionUnderline => &["Normal"],
        BlockKind::Paragraph => &["Normal", "Body Text", "Paragraphe"],
        BlockKind::TableCell => &["Normal", "Table Contents"],
    }
}

/// Outcome of resolving one block.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    /// Style to reference
    pub style: &'a StyleDescriptor,
    /// Template slot the block is aligned with, if any
    pub slot: Option<&'a BlockSlot>,
}

/// Resolves the target style of each block in output order.
///
/// Stateful: the n-th block of a kind aligns with the n-th slot of that kind,
/// surplus blocks reuse the last slot of the kind.
pub struct StyleResolver<'a> {
    catalog: &'a StyleCatalog,
    blueprint: &'a Blueprint,
    default_style: Option<&'a StyleDescriptor>,
    seen: HashMap<BlockKind, usize>,
}

impl<'a> StyleResolver<'a> {
    /// Create a resolver. `default_style` names the last-resort style; when
    /// absent or not a paragraph style, the catalog default is used.
    pub fn new(
        catalog: &'a StyleCatalog,
        blueprint: &'a Blueprint,
        default_style: Option<&str>,
    ) -> Self {
        let configured = default_style.and_then(|name| {
            let found = catalog.paragraph_style(name);
            if found.is_none() {
                log::warn!("Configured default style '{}' is not in the template", name);
            }
            found
        });
        Self {
            catalog,
            blueprint,
            default_style: configured.or_else(|| catalog.default_paragraph_style()),
            seen: HashMap::new(),
        }
    }

    /// Resolve the style of the next block.
    pub fn resolve(&mut self, block: &FilledBlock) -> Result<Resolved<'a>> {
        let position = {
            let n = self.seen.entry(block.kind).or_insert(0);
            *n += 1;
            *n - 1
        };

        let catalog = self.catalog;
        let slot = self.aligned_slot(block, position);
        let style = slot
            .and_then(|s| catalog.paragraph_style(&s.style_name))
            .or_else(|| self.preferred(block.kind))
            .or(self.default_style)
            .ok_or_else(|| {
                Error::InjectionFailed(format!(
                    "no paragraph style available for {} blocks",
                    block.kind
                ))
            })?;

        Ok(Resolved { style, slot })
    }

    fn aligned_slot(&self, block: &FilledBlock, position: usize) -> Option<&'a BlockSlot> {
        let blueprint = self.blueprint;

        if let Some(slot) = block
            .slot_ref
            .and_then(|ordinal| blueprint.slot(ordinal))
            .filter(|s| s.kind == block.kind)
        {
            return Some(slot);
        }

        if block.kind == BlockKind::TableCell {
            let cell = block.cell.as_ref()?;
            return blueprint
                .cell_slot(&cell.table_id, cell.row, cell.col)
                .or_else(|| {
                    blueprint
                        .slots()
                        .iter()
                        .find(|s| s.table_id.as_deref() == Some(cell.table_id.as_str()))
                });
        }

        let mut of_kind = blueprint.slots_of_kind(block.kind);
        let mut last = None;
        for (i, slot) in of_kind.by_ref().enumerate() {
            if i == position {
                return Some(slot);
            }
            last = Some(slot);
        }
        last
    }

    fn preferred(&self, kind: BlockKind) -> Option<&'a StyleDescriptor> {
        let catalog = self.catalog;
        preferred_styles(kind)
            .iter()
            .find_map(|name| catalog.paragraph_style(name))
            .or_else(|| {
                // any paragraph style named after the kind
                if kind == BlockKind::TableCell {
                    return None;
                }
                catalog
                    .iter()
                    .find(|s| s.kind == StyleKind::Paragraph && classify_style_name(&s.name) == kind)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{StyleFormatting, TableDescriptor};

    fn style(name: &str, is_default: bool) -> StyleDescriptor {
        StyleDescriptor {
            id: name.replace(' ', ""),
            name: name.into(),
            kind: StyleKind::Paragraph,
            based_on: None,
            is_default,
            formatting: StyleFormatting::default(),
        }
    }

    fn catalog(names: &[&str]) -> StyleCatalog {
        StyleCatalog::from_descriptors(names.iter().map(|n| style(n, *n == "Normal")))
    }

    fn blueprint() -> Blueprint {
        Blueprint::new(
            vec![
                BlockSlot::new(1, "CaptionStyle", BlockKind::Caption),
                BlockSlot::new(2, "AllegationStyle", BlockKind::Allegation),
                BlockSlot::new(3, "AllegationAlt", BlockKind::Allegation),
                BlockSlot::new(4, "SignatureStyle", BlockKind::Signature),
                BlockSlot::cell(5, "CellStyle", "t", 0, 0),
            ],
            vec![TableDescriptor {
                id: "t".into(),
                index: 0,
                rows: 1,
                cols: 2,
                style_name: None,
            }],
        )
    }

    #[test]
    fn test_positional_alignment_and_surplus() {
        let cat = catalog(&[
            "Normal",
            "CaptionStyle",
            "AllegationStyle",
            "AllegationAlt",
            "SignatureStyle",
        ]);
        let bp = blueprint();
        let mut resolver = StyleResolver::new(&cat, &bp, None);

        let names: Vec<String> = [
            BlockKind::Caption,
            BlockKind::Allegation,
            BlockKind::Allegation,
            BlockKind::Allegation,
            BlockKind::Signature,
        ]
        .iter()
        .map(|k| {
            resolver
                .resolve(&FilledBlock::new(*k, "x"))
                .unwrap()
                .style
                .name
                .clone()
        })
        .collect();

        assert_eq!(
            names,
            vec![
                "CaptionStyle",
                "AllegationStyle",
                "AllegationAlt",
                "AllegationAlt",
                "SignatureStyle"
            ]
        );
    }

    #[test]
    fn test_slot_ref_wins_when_kind_matches() {
        let cat = catalog(&["Normal", "AllegationStyle", "AllegationAlt"]);
        let bp = blueprint();
        let mut resolver = StyleResolver::new(&cat, &bp, None);
        let block = FilledBlock::new(BlockKind::Allegation, "x").with_slot(3);
        let resolved = resolver.resolve(&block).unwrap();
        assert_eq!(resolved.style.name, "AllegationAlt");
        assert_eq!(resolved.slot.unwrap().ordinal, 3);

        // kind mismatch: slot ignored, positional used
        let block = FilledBlock::new(BlockKind::Allegation, "x").with_slot(1);
        let resolved = resolver.resolve(&block).unwrap();
        assert_eq!(resolved.slot.unwrap().ordinal, 3);
    }

    #[test]
    fn test_preference_list_then_default() {
        let cat = catalog(&["Normal", "List Number", "Heading 1"]);
        let bp = Blueprint::default();
        let mut resolver = StyleResolver::new(&cat, &bp, None);

        let allegation = resolver
            .resolve(&FilledBlock::new(BlockKind::Allegation, "x"))
            .unwrap();
        assert_eq!(allegation.style.name, "List Number");
        assert!(allegation.slot.is_none());

        let heading = resolver.resolve(&FilledBlock::new(BlockKind::Heading, "x")).unwrap();
        assert_eq!(heading.style.name, "Heading 1");

        let caption = resolver.resolve(&FilledBlock::new(BlockKind::Caption, "x")).unwrap();
        assert_eq!(caption.style.name, "Normal");
    }

    #[test]
    fn test_slot_style_missing_from_catalog_falls_through() {
        let cat = catalog(&["Normal"]);
        let bp = blueprint();
        let mut resolver = StyleResolver::new(&cat, &bp, None);
        let resolved = resolver
            .resolve(&FilledBlock::new(BlockKind::Caption, "x"))
            .unwrap();
        assert_eq!(resolved.style.name, "Normal");
        assert_eq!(resolved.slot.unwrap().ordinal, 1);
    }

    #[test]
    fn test_configured_default() {
        let cat = catalog(&["Normal", "Body"]);
        let bp = Blueprint::default();
        let mut resolver = StyleResolver::new(&cat, &bp, Some("Body"));
        let resolved = resolver.resolve(&FilledBlock::new(BlockKind::Caption, "x")).unwrap();
        assert_eq!(resolved.style.name, "Body");
    }

    #[test]
    fn test_nothing_resolves() {
        let cat = StyleCatalog::default();
        let bp = Blueprint::default();
        let mut resolver = StyleResolver::new(&cat, &bp, Some("Missing"));
        let result = resolver.resolve(&FilledBlock::new(BlockKind::Heading, "x"));
        assert!(matches!(result, Err(Error::InjectionFailed(_))));
    }

    #[test]
    fn test_table_cell_alignment() {
        let cat = catalog(&["Normal", "CellStyle"]);
        let bp = blueprint();
        let mut resolver = StyleResolver::new(&cat, &bp, None);
        let exact = resolver.resolve(&FilledBlock::cell("t", 0, 0, "x")).unwrap();
        assert_eq!(exact.style.name, "CellStyle");
        // no slot for (0,1): first slot of the table
        let sibling = resolver.resolve(&FilledBlock::cell("t", 0, 1, "x")).unwrap();
        assert_eq!(sibling.slot.unwrap().ordinal, 5);
    }
}
