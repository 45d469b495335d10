//! Prompt text for language-model classifiers.
//!
//! The system prompt fixes the answer schema; the user prompt carries the
//! compact slot listing, the table index, an optional correction note and
//! the raw text.

use std::fmt::Write as _;

use crate::model::{BlockKind, BlockSlot};

use super::FillRequest;

/// Instructions that fix the answer format.
pub fn system_prompt() -> String {
    let kinds = BlockKind::ALL
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You segment raw text into blocks that follow the structure of a template document.\n\
         \n\
         Rules:\n\
         - Use only the provided raw text. Do not invent, summarize or reword anything.\n\
         - Emit one block per logical segment, in the order it should appear in the output.\n\
         - Label each block with one kind from: {kinds}.\n\
         - Set \"slot\" to the ordinal of the template slot the block fills when there is one.\n\
         - Allegations and enumerated points use kind allegation without their leading number; numbering comes from the template.\n\
         - Separator lines use kind line with the exact line characters as text.\n\
         - Signature underlines use kind signature_line; put an optional label in text.\n\
         - Section underlines use kind section_underline with empty text.\n\
         - Table content uses kind table_cell with table_id, row and col from the template tables.\n\
         - Checkboxes are written as [ ] or [x] inside text.\n\
         - Where the raw text starts a new page, emit {{\"kind\": \"page_break\"}} before the next block.\n\
         - Cover the entire raw text; never stop early.\n\
         \n\
         Reply with a JSON array only. Each element: \
         {{\"kind\": \"<kind>\", \"text\": \"<content>\", \"slot\": <ordinal or null>, \
         \"table_id\": \"<id or null>\", \"row\": <row or null>, \"col\": <col or null>}}."
    )
}

/// The request-specific prompt: slot listing, tables, correction and raw text.
pub fn user_prompt(request: &FillRequest) -> String {
    let mut out = String::new();

    out.push_str("Template slots (ordinal | kind | style | sample):\n");
    for slot in request.slots() {
        let _ = writeln!(out, "{}", slot_line(slot));
    }

    let tables = request.blueprint().tables();
    if !tables.is_empty() {
        out.push_str("\nTemplate tables (id | rows x cols):\n");
        for table in tables {
            let _ = writeln!(out, "{} | {}x{}", table.id, table.rows, table.cols);
        }
    }

    if !request.images().is_empty() {
        let _ = writeln!(
            out,
            "\n{} rendered template pages are attached; follow their layout.",
            request.images().len()
        );
    }

    if let Some(note) = request.correction() {
        let _ = writeln!(
            out,
            "\nYour previous answer was rejected: {}\nAnswer again and fix this problem.",
            note
        );
    }

    out.push_str("\nRaw text:\n");
    out.push_str(request.raw_text());
    out
}

fn slot_line(slot: &BlockSlot) -> String {
    let mut line = format!("{} | {} | {}", slot.ordinal, slot.kind, slot.style_name);
    if let (Some(table), Some(row), Some(col)) = (&slot.table_id, slot.row, slot.col) {
        let _ = write!(line, " | cell {}[{},{}]", table, row, col);
    }
    if let Some(sample) = &slot.sample_text {
        let _ = write!(line, " | {}", sample.replace('\n', " "));
    }
    line
}
