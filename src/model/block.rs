//! Filled block types produced by a slot filler.

use super::BlockKind;
use serde::{Deserialize, Serialize};

/// Address of a table cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    /// Table identifier from the blueprint
    pub table_id: String,
    /// Zero-based row
    pub row: usize,
    /// Zero-based column
    pub col: usize,
}

impl CellRef {
    /// Create a cell reference.
    pub fn new(table_id: impl Into<String>, row: usize, col: usize) -> Self {
        Self {
            table_id: table_id.into(),
            row,
            col,
        }
    }
}

/// A block of literal text labelled with a kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilledBlock {
    /// Ordinal of the blueprint slot this block fills, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_ref: Option<u32>,

    /// Block kind
    pub kind: BlockKind,

    /// Literal text
    #[serde(default)]
    pub text: String,

    /// Target cell for table-cell blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell: Option<CellRef>,

    /// Start a new page before this block
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub page_break_before: bool,
}

impl FilledBlock {
    /// Create a block of the given kind.
    pub fn new(kind: BlockKind, text: impl Into<String>) -> Self {
        Self {
            slot_ref: None,
            kind,
            text: text.into(),
            cell: None,
            page_break_before: false,
        }
    }

    /// Create a table-cell block.
    pub fn cell(table_id: impl Into<String>, row: usize, col: usize, text: impl Into<String>) -> Self {
        Self {
            cell: Some(CellRef::new(table_id, row, col)),
            ..Self::new(BlockKind::TableCell, text)
        }
    }

    /// Bind the block to a slot ordinal.
    pub fn with_slot(mut self, ordinal: u32) -> Self {
        self.slot_ref = Some(ordinal);
        self
    }

    /// Start a new page before the block.
    pub fn with_page_break(mut self) -> Self {
        self.page_break_before = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let block = FilledBlock::new(BlockKind::Heading, "SUMMONS").with_slot(2);
        assert_eq!(block.slot_ref, Some(2));
        assert!(block.cell.is_none());

        let cell = FilledBlock::cell("caption_table", 0, 1, "Plaintiff");
        assert_eq!(cell.kind, BlockKind::TableCell);
        assert_eq!(cell.cell, Some(CellRef::new("caption_table", 0, 1)));
    }

    #[test]
    fn test_deserialize_minimal() {
        let block: FilledBlock = serde_json::from_str(r#"{"kind":"line"}"#).unwrap();
        assert_eq!(block.kind, BlockKind::Line);
        assert!(block.text.is_empty());
    }
}
