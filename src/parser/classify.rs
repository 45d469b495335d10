//! Style-name and text-shape classification.
//!
//! [`classify_style_name`] is a pure, total function from a style name to a
//! [`BlockKind`]; it never yields `TableCell`, which only table membership
//! decides. The text-shape detectors recognise drawn lines in templates that
//! use plain styles for them.

use crate::model::BlockKind;

/// Classify a style name by naming convention.
///
/// Names are split into lower-case tokens on non-alphanumeric characters and
/// camel-case boundaries, so `ListNumber`, `List Number` and `list_number`
/// classify alike.
pub fn classify_style_name(name: &str) -> BlockKind {
    let tokens = tokenize(name);
    let has = |word: &str| tokens.iter().any(|t| t == word);
    let has_any = |words: &[&str]| words.iter().any(|w| has(w));

    if has("caption") {
        BlockKind::Caption
    } else if has_any(&["signature", "sig"]) && has("line") {
        BlockKind::SignatureLine
    } else if has("underline") {
        BlockKind::SectionUnderline
    } else if has_any(&["line", "separator", "rule", "divider"]) {
        BlockKind::Line
    } else if has_any(&["signature", "sig"]) {
        BlockKind::Signature
    } else if has_any(&["heading", "title", "titre", "subtitle", "section"]) {
        BlockKind::Heading
    } else if has_any(&["allegation", "allegations", "numbered", "enumerated"])
        || (has("list") && has_any(&["number", "paragraph"]))
    {
        BlockKind::Allegation
    } else {
        BlockKind::Paragraph
    }
}

/// Split a style name into lower-case words.
fn tokenize(name: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = name.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            flush(&mut current, &mut tokens);
            continue;
        }
        if !current.is_empty() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let camel = c.is_uppercase()
                && (prev.is_lowercase() || (prev.is_uppercase() && next_lower));
            let digits = c.is_numeric() != prev.is_numeric();
            if camel || digits {
                flush(&mut current, &mut tokens);
            }
        }
        current.extend(c.to_lowercase());
    }
    flush(&mut current, &mut tokens);
    tokens
}

fn flush(current: &mut String, tokens: &mut Vec<String>) {
    if !current.is_empty() {
        tokens.push(std::mem::take(current));
    }
}

/// Whether paragraph text is a signature underline: underscores with at most
/// two other non-space characters.
pub fn is_signature_line_text(text: &str) -> bool {
    let t = text.trim();
    if t.chars().count() < 2 {
        return false;
    }
    let others = t.chars().filter(|&c| c != '_' && c != ' ').count();
    others == 0 || (others <= 2 && t.contains('_'))
}

/// Whether paragraph text is a separator line: dots, dashes, equals or
/// similar symbols, optionally ending in `X`.
pub fn is_separator_text(text: &str) -> bool {
    let t = text.trim();
    if t.chars().count() < 3 {
        return false;
    }
    let ends_with_x = t.ends_with('X') || t.ends_with('x');
    let mut has_symbol = false;

    for c in t.chars() {
        match c {
            ' ' | '\t' => {}
            '.' | '_' | '-' | '=' | ',' | '\u{00A0}' => has_symbol = true,
            'X' | 'x' if ends_with_x => {}
            c if c.is_alphanumeric() => return false,
            _ => has_symbol = true,
        }
    }
    has_symbol
}

/// Classify a paragraph by fixed precedence: table membership, style name,
/// text shape, then plain paragraph.
pub fn classify_paragraph(
    style_name: &str,
    text: &str,
    has_bottom_border: bool,
    in_table: bool,
) -> BlockKind {
    if in_table {
        return BlockKind::TableCell;
    }

    let by_name = classify_style_name(style_name);
    if by_name != BlockKind::Paragraph {
        return by_name;
    }

    if is_signature_line_text(text) {
        BlockKind::SignatureLine
    } else if is_separator_text(text) {
        BlockKind::Line
    } else if text.trim().is_empty() && has_bottom_border {
        BlockKind::SectionUnderline
    } else {
        BlockKind::Paragraph
    }
}
