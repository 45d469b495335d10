//! Text transformations applied at injection time and run construction.

use std::sync::OnceLock;

use regex::Regex;

use crate::xml::Element;

/// Unchecked checkbox glyph.
pub const CHECKBOX_UNCHECKED: char = '\u{2610}';
/// Checked checkbox glyph.
pub const CHECKBOX_CHECKED: char = '\u{2611}';

/// Replace inline checkbox markers with glyphs.
///
/// `[ ]` becomes ☐, `[x]` and `[X]` become ☑; every other character is kept.
pub fn render_checkboxes(text: &str) -> String {
    if !text.contains('[') {
        return text.to_string();
    }
    text.replace("[ ]", &CHECKBOX_UNCHECKED.to_string())
        .replace("[x]", &CHECKBOX_CHECKED.to_string())
        .replace("[X]", &CHECKBOX_CHECKED.to_string())
}

fn enumerator() -> &'static Regex {
    static ENUMERATOR: OnceLock<Regex> = OnceLock::new();
    ENUMERATOR.get_or_init(|| {
        Regex::new(r"^\s*(?:\d+|[a-z]|(?i:[ivxlc]+))[.)]\s*").unwrap()
    })
}

/// Remove one hand-typed leading enumerator (`1.`, `a)`, `iv.`).
pub fn strip_enumerator(text: &str) -> &str {
    match enumerator().find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    }
}

/// Split a block holding several hand-numbered items into one part per item.
///
/// A new part starts at every line that opens with an enumerator and at
/// every blank line. Other lines stay with the part above them. Enumerators
/// are left in place.
pub fn split_allegations(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start: Option<usize> = None;
    let mut end = 0;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        let content = line.trim_end_matches(['\r', '\n']);

        if content.trim().is_empty() {
            if let Some(s) = start.take() {
                parts.push(&text[s..end]);
            }
            continue;
        }
        if enumerator().is_match(content) {
            if let Some(s) = start.take() {
                parts.push(&text[s..end]);
            }
        }
        start.get_or_insert(line_start);
        end = line_start + content.len();
    }
    if let Some(s) = start {
        parts.push(&text[s..end]);
    }
    parts
}

/// Build runs for a text: newlines become breaks, tabs become tab elements.
///
/// `run_properties` is cloned into the run when given.
pub fn runs_for_text(text: &str, run_properties: Option<&Element>) -> Vec<Element> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut run = Element::new("w:r");
    if let Some(rpr) = run_properties {
        run = run.with_child(rpr.clone());
    }

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            run = run.with_child(Element::new("w:br"));
        }
        let line = line.strip_suffix('\r').unwrap_or(line);
        for (j, segment) in line.split('\t').enumerate() {
            if j > 0 {
                run = run.with_child(Element::new("w:tab"));
            }
            if !segment.is_empty() {
                run = run.with_child(
                    Element::new("w:t")
                        .with_attr("xml:space", "preserve")
                        .with_text(segment),
                );
            }
        }
    }
    vec![run]
}
