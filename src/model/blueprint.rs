//! Blueprint types: the structural model extracted from a template.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Structural kind of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Court caption or document caption
    Caption,
    /// Title or section heading
    Heading,
    /// Numbered allegation or enumerated point
    Allegation,
    /// Signature block text
    Signature,
    /// Separator line (dashes, dots, equals)
    Line,
    /// Underscore line to sign on
    SignatureLine,
    /// Empty paragraph drawn as a rule through its bottom border
    SectionUnderline,
    /// Body paragraph
    Paragraph,
    /// Paragraph inside a table cell
    TableCell,
}

impl BlockKind {
    /// All kinds in declaration order.
    pub const ALL: [BlockKind; 9] = [
        BlockKind::Caption,
        BlockKind::Heading,
        BlockKind::Allegation,
        BlockKind::Signature,
        BlockKind::Line,
        BlockKind::SignatureLine,
        BlockKind::SectionUnderline,
        BlockKind::Paragraph,
        BlockKind::TableCell,
    ];

    /// Serialized name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Caption => "caption",
            BlockKind::Heading => "heading",
            BlockKind::Allegation => "allegation",
            BlockKind::Signature => "signature",
            BlockKind::Line => "line",
            BlockKind::SignatureLine => "signature_line",
            BlockKind::SectionUnderline => "section_underline",
            BlockKind::Paragraph => "paragraph",
            BlockKind::TableCell => "table_cell",
        }
    }

    /// Kinds whose text is drawn characters rather than prose.
    pub fn is_line_like(&self) -> bool {
        matches!(
            self,
            BlockKind::Line | BlockKind::SignatureLine | BlockKind::SectionUnderline
        )
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        BlockKind::ALL
            .iter()
            .find(|k| k.as_str() == normalized)
            .copied()
            .ok_or_else(|| format!("unknown block kind '{}'", s))
    }
}

/// One structural unit of the template bound to a style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSlot {
    /// Position in the blueprint, starting at 1
    pub ordinal: u32,

    /// Declared style name
    pub style_name: String,

    /// Classified kind
    pub kind: BlockKind,

    /// Table identifier (table cells only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,

    /// Zero-based row (table cells only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,

    /// Zero-based column (table cells only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub col: Option<usize>,

    /// Verbatim text for line-like slots, a short hint otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_text: Option<String>,
}

impl BlockSlot {
    /// Create a non-table slot.
    pub fn new(ordinal: u32, style_name: impl Into<String>, kind: BlockKind) -> Self {
        Self {
            ordinal,
            style_name: style_name.into(),
            kind,
            table_id: None,
            row: None,
            col: None,
            sample_text: None,
        }
    }

    /// Create a table-cell slot.
    pub fn cell(
        ordinal: u32,
        style_name: impl Into<String>,
        table_id: impl Into<String>,
        row: usize,
        col: usize,
    ) -> Self {
        Self {
            table_id: Some(table_id.into()),
            row: Some(row),
            col: Some(col),
            ..Self::new(ordinal, style_name, BlockKind::TableCell)
        }
    }

    /// Attach sample text.
    pub fn with_sample(mut self, sample: impl Into<String>) -> Self {
        self.sample_text = Some(sample.into());
        self
    }
}

/// Side-index entry describing a template table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Table identifier referenced by slots and blocks
    pub id: String,

    /// Zero-based index of the table among the body's tables
    pub index: usize,

    /// Number of rows
    pub rows: usize,

    /// Number of columns (widest row)
    pub cols: usize,

    /// Table style name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_name: Option<String>,
}

impl TableDescriptor {
    /// Check whether a cell lies inside the table.
    pub fn contains_cell(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }
}

/// Ordered structural model of a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blueprint {
    slots: Vec<BlockSlot>,
    tables: Vec<TableDescriptor>,
}

impl Blueprint {
    /// Create a blueprint from slots and table descriptors.
    pub fn new(slots: Vec<BlockSlot>, tables: Vec<TableDescriptor>) -> Self {
        Self { slots, tables }
    }

    /// Slots in document order.
    pub fn slots(&self) -> &[BlockSlot] {
        &self.slots
    }

    /// Table side index.
    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }

    /// Slot with the given ordinal.
    pub fn slot(&self, ordinal: u32) -> Option<&BlockSlot> {
        self.slots
            .binary_search_by_key(&ordinal, |s| s.ordinal)
            .ok()
            .map(|i| &self.slots[i])
    }

    /// Table descriptor by identifier.
    pub fn table(&self, id: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.id == id)
    }

    /// Slots of one kind, in order.
    pub fn slots_of_kind(&self, kind: BlockKind) -> impl Iterator<Item = &BlockSlot> {
        self.slots.iter().filter(move |s| s.kind == kind)
    }

    /// First slot addressing a table cell.
    pub fn cell_slot(&self, table_id: &str, row: usize, col: usize) -> Option<&BlockSlot> {
        self.slots.iter().find(|s| {
            s.table_id.as_deref() == Some(table_id) && s.row == Some(row) && s.col == Some(col)
        })
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the blueprint has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Check the structural invariants: strictly increasing ordinals and
    /// table coordinates present exactly on table-cell slots.
    pub fn is_well_formed(&self) -> bool {
        let ordered = self.slots.windows(2).all(|w| w[0].ordinal < w[1].ordinal);
        let coordinates = self.slots.iter().all(|s| {
            let has_cell = s.table_id.is_some() && s.row.is_some() && s.col.is_some();
            let has_none = s.table_id.is_none() && s.row.is_none() && s.col.is_none();
            if s.kind == BlockKind::TableCell {
                has_cell
            } else {
                has_none
            }
        });
        ordered && coordinates
    }
}
