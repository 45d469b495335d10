//! Tolerant parsing and structural validation of classifier answers.

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::model::{BlockKind, Blueprint, CellRef, FilledBlock};
use crate::parser::classify_style_name;

/// Parse a classifier answer into blocks.
///
/// Accepts a JSON array of block objects or an object with a `blocks` array,
/// optionally wrapped in markdown code fences or surrounded by prose. Raw
/// control characters inside strings are escaped and an array cut off
/// mid-object is closed after its last complete element.
pub fn parse_response(raw: &str) -> Result<Vec<FilledBlock>> {
    let text = sanitize_control_chars(strip_code_fences(raw));
    let value = parse_lenient(&text)?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("blocks") {
            Some(Value::Array(items)) => items,
            _ => return Err(malformed("expected a JSON array of blocks")),
        },
        _ => return Err(malformed("expected a JSON array of blocks")),
    };

    let mut blocks = Vec::with_capacity(items.len());
    let mut page_break = false;
    for (i, item) in items.into_iter().enumerate() {
        let Value::Object(obj) = item else {
            return Err(malformed(format!("block {} is not an object", i)));
        };
        if is_page_break(&obj) {
            page_break = true;
            continue;
        }
        let mut block = block_from_object(i, &obj)?;
        block.page_break_before |= std::mem::take(&mut page_break);
        blocks.push(block);
    }
    if page_break {
        log::debug!("Trailing page break dropped");
    }
    log::debug!("Parsed {} blocks from classifier answer", blocks.len());
    Ok(blocks)
}

/// Check blocks against the blueprint they were produced for.
///
/// Fails with `ClassificationMalformed` when a block references a missing
/// slot, a missing table or a cell outside its table, or when a table-cell
/// block has no table reference.
pub fn validate_blocks(blocks: &[FilledBlock], blueprint: &Blueprint) -> Result<()> {
    for (i, block) in blocks.iter().enumerate() {
        let slot = match block.slot_ref {
            Some(ordinal) => Some(blueprint.slot(ordinal).ok_or_else(|| {
                malformed(format!(
                    "block {}: slot {} does not exist (template has {} slots)",
                    i,
                    ordinal,
                    blueprint.len()
                ))
            })?),
            None => None,
        };

        match (&block.cell, block.kind) {
            (Some(cell), BlockKind::TableCell) => {
                let table = blueprint.table(&cell.table_id).ok_or_else(|| {
                    malformed(format!(
                        "block {}: table '{}' does not exist in the template",
                        i, cell.table_id
                    ))
                })?;
                if !table.contains_cell(cell.row, cell.col) {
                    return Err(malformed(format!(
                        "block {}: cell ({}, {}) is outside table '{}' ({}x{})",
                        i, cell.row, cell.col, table.id, table.rows, table.cols
                    )));
                }
            }
            (None, BlockKind::TableCell) => {
                if !slot.is_some_and(|s| s.kind == BlockKind::TableCell) {
                    return Err(malformed(format!(
                        "block {}: table_cell block without table_id/row/col",
                        i
                    )));
                }
            }
            (Some(_), kind) => {
                return Err(malformed(format!(
                    "block {}: {} block must not address a table cell",
                    i, kind
                )));
            }
            (None, _) => {}
        }
    }
    Ok(())
}

fn malformed(msg: impl Into<String>) -> Error {
    Error::ClassificationMalformed(msg.into())
}

fn block_from_object(i: usize, obj: &Map<String, Value>) -> Result<FilledBlock> {
    let kind = match (obj.get("kind"), obj.get("block_type")) {
        (Some(Value::String(kind)), _) => kind
            .parse::<BlockKind>()
            .map_err(|e| malformed(format!("block {}: {}", i, e)))?,
        (None, Some(Value::String(legacy))) => legacy_kind(legacy),
        (None, None) => return Err(malformed(format!("block {}: missing kind", i))),
        _ => return Err(malformed(format!("block {}: kind must be a string", i))),
    };

    let text = match obj.get("text") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let slot_ref = match obj.get("slot_ref").or_else(|| obj.get("slot")) {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            v.as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| malformed(format!("block {}: slot must be a positive integer", i)))?,
        ),
    };

    let cell = match obj.get("cell") {
        Some(Value::Object(cell)) => cell_from_object(i, cell)?,
        _ => cell_from_object(i, obj)?,
    };

    let kind = if cell.is_some() {
        BlockKind::TableCell
    } else {
        kind
    };

    Ok(FilledBlock {
        slot_ref,
        kind,
        text,
        cell,
        page_break_before: obj
            .get("page_break_before")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

fn cell_from_object(i: usize, obj: &Map<String, Value>) -> Result<Option<CellRef>> {
    let table_id = match obj.get("table_id") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(n)) => format!("table_{}", n),
        Some(_) => return Err(malformed(format!("block {}: invalid table_id", i))),
    };
    let coord = |key: &str| {
        obj.get(key)
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .ok_or_else(|| malformed(format!("block {}: table_id without a valid {}", i, key)))
    };
    Ok(Some(CellRef {
        table_id,
        row: coord("row")?,
        col: coord("col")?,
    }))
}

/// Page break items mark the next block; they carry no content of their own.
fn is_page_break(obj: &Map<String, Value>) -> bool {
    obj.get("kind")
        .or_else(|| obj.get("block_type"))
        .and_then(Value::as_str)
        .is_some_and(|kind| {
            matches!(
                kind.trim().to_ascii_lowercase().as_str(),
                "page_break" | "pagebreak"
            )
        })
}

/// Map a legacy `block_type` value. Style names are classified by convention.
fn legacy_kind(value: &str) -> BlockKind {
    if let Ok(kind) = value.parse::<BlockKind>() {
        return kind;
    }
    match value.trim().to_ascii_lowercase().as_str() {
        "numbered" => BlockKind::Allegation,
        "section_header" => BlockKind::Heading,
        "wherefore" => BlockKind::Paragraph,
        _ => classify_style_name(value),
    }
}

fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // drop the info string (```json)
        text = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Escape raw control characters that appear inside JSON strings.
fn sanitize_control_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            } else if (c as u32) < 0x20 {
                match c {
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    _ => out.push(' '),
                }
                continue;
            }
        } else if c == '"' {
            in_string = true;
        }
        out.push(c);
    }
    out
}

fn parse_lenient(text: &str) -> Result<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }

    let Some(start) = text.find('[') else {
        return Err(malformed("answer contains no JSON array"));
    };
    let candidate = &text[start..];

    if let Some(end) = matching_bracket_end(candidate) {
        if let Ok(value) = serde_json::from_str::<Value>(&candidate[..end]) {
            return Ok(value);
        }
    }

    match recover_truncated(candidate) {
        Some(recovered) => {
            let value = serde_json::from_str::<Value>(&recovered)
                .map_err(|e| malformed(format!("unparseable answer: {}", e)))?;
            log::warn!("Classifier answer was truncated; kept the complete blocks");
            Ok(value)
        }
        None => Err(malformed("unparseable answer")),
    }
}

/// Byte offset just past the bracket closing the array that opens `text`.
fn matching_bracket_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Close an array cut off mid-element after its last complete object.
fn recover_truncated(text: &str) -> Option<String> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut last_complete = None;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.saturating_sub(1);
                if c == '}' && depth == 1 {
                    last_complete = Some(i + 1);
                }
            }
            _ => {}
        }
    }

    last_complete.map(|end| format!("{}]", &text[..end]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockSlot, TableDescriptor};

    fn blueprint() -> Blueprint {
        Blueprint::new(
            vec![
                BlockSlot::new(1, "CaptionStyle", BlockKind::Caption),
                BlockSlot::cell(2, "Normal", "caption_table", 0, 0),
            ],
            vec![TableDescriptor {
                id: "caption_table".into(),
                index: 0,
                rows: 1,
                cols: 2,
                style_name: None,
            }],
        )
    }

    #[test]
    fn test_plain_array() {
        let blocks = parse_response(
            r#"[{"kind":"heading","text":" SUMMONS "},{"kind":"allegation","text":"1. That","slot":3}]"#,
        )
        .unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "SUMMONS");
        assert_eq!(blocks[1].slot_ref, Some(3));
    }

    #[test]
    fn test_code_fences_and_prose() {
        let raw = "```json\n[{\"kind\":\"paragraph\",\"text\":\"a\"}]\n```";
        assert_eq!(parse_response(raw).unwrap().len(), 1);

        let raw = "Here are the blocks: [{\"kind\":\"line\",\"text\":\"---X\"}] Hope that helps!";
        assert_eq!(parse_response(raw).unwrap()[0].kind, BlockKind::Line);
    }

    #[test]
    fn test_object_with_blocks() {
        let raw = r#"{"blocks":[{"kind":"signature","text":"Jane Doe"}]}"#;
        assert_eq!(parse_response(raw).unwrap()[0].kind, BlockKind::Signature);
    }

    #[test]
    fn test_raw_control_characters() {
        let raw = "[{\"kind\":\"paragraph\",\"text\":\"line one\nline two\"}]";
        let blocks = parse_response(raw).unwrap();
        assert_eq!(blocks[0].text, "line one\nline two");
    }

    #[test]
    fn test_truncated_array_is_recovered() {
        let raw = r#"[{"kind":"heading","text":"A"},{"kind":"paragraph","text":"B"},{"kind":"para"#;
        let blocks = parse_response(raw).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].text, "B");
    }

    #[test]
    fn test_legacy_block_type() {
        let raw = r#"[{"block_type":"Heading 1","text":"T"},{"block_type":"page_break","text":""},{"block_type":"List Number","text":"x"},{"block_type":"signature_line","text":""}]"#;
        let kinds: Vec<BlockKind> = parse_response(raw).unwrap().iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![BlockKind::Heading, BlockKind::Allegation, BlockKind::SignatureLine]
        );
    }

    #[test]
    fn test_page_break_marks_next_block() {
        let raw = r#"[{"kind":"heading","text":"SUMMONS"},{"kind":"page_break","text":""},{"kind":"heading","text":"COMPLAINT"},{"block_type":"PageBreak"}]"#;
        let blocks = parse_response(raw).unwrap();
        assert_eq!(blocks.len(), 2);
        assert!(!blocks[0].page_break_before);
        assert!(blocks[1].page_break_before);
        assert_eq!(blocks[1].text, "COMPLAINT");
    }

    #[test]
    fn test_table_cell_fields() {
        let raw = r#"[{"kind":"table_cell","text":"Plaintiff","table_id":"caption_table","row":0,"col":1},{"kind":"paragraph","text":"v","cell":{"table_id":0,"row":1,"col":0}}]"#;
        let blocks = parse_response(raw).unwrap();
        assert_eq!(blocks[0].cell, Some(CellRef::new("caption_table", 0, 1)));
        assert_eq!(blocks[1].kind, BlockKind::TableCell);
        assert_eq!(blocks[1].cell, Some(CellRef::new("table_0", 1, 0)));
    }

    #[test]
    fn test_malformed_answers() {
        for raw in [
            "I cannot help with that.",
            r#"{"answer": 42}"#,
            r#"[{"kind":"banner","text":"x"}]"#,
            r#"[{"text":"no kind"}]"#,
            r#"["just a string"]"#,
            r#"[{"kind":"paragraph","slot":-1}]"#,
            r#"[{"kind":"table_cell","table_id":"t","row":0}]"#,
        ] {
            assert!(
                matches!(parse_response(raw), Err(Error::ClassificationMalformed(_))),
                "expected malformed: {}",
                raw
            );
        }
    }

    #[test]
    fn test_validate_accepts_sound_blocks() {
        let blocks = vec![
            FilledBlock::new(BlockKind::Caption, "SUPREME COURT").with_slot(1),
            FilledBlock::cell("caption_table", 0, 1, "Index No."),
            FilledBlock::new(BlockKind::TableCell, "Plaintiff").with_slot(2),
            FilledBlock::new(BlockKind::Paragraph, "no slot needed"),
        ];
        assert!(validate_blocks(&blocks, &blueprint()).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_references() {
        let bp = blueprint();
        let cases = vec![
            FilledBlock::new(BlockKind::Paragraph, "x").with_slot(7),
            FilledBlock::cell("other_table", 0, 0, "x"),
            FilledBlock::cell("caption_table", 3, 0, "x"),
            FilledBlock::new(BlockKind::TableCell, "x"),
            FilledBlock::new(BlockKind::TableCell, "x").with_slot(1),
        ];
        for block in cases {
            let result = validate_blocks(std::slice::from_ref(&block), &bp);
            assert!(
                matches!(result, Err(Error::ClassificationMalformed(_))),
                "expected rejection of {:?}",
                block
            );
        }
    }
}
