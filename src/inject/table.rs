//! Output tables cloned from template tables.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::model::TableDescriptor;
use crate::xml::{Element, Node};

/// A template table being filled: cloned structure, cleared cell content.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    id: String,
    element: Element,
    filled: BTreeSet<(usize, usize)>,
}

impl TableBuilder {
    /// Clone a template table and clear every cell.
    ///
    /// Cell properties, row properties, grid and table properties are kept.
    /// Each cell is left with one empty paragraph; with `keep_paragraph_format`
    /// that paragraph keeps the template's paragraph properties, otherwise
    /// only its style reference.
    pub fn from_template(
        descriptor: &TableDescriptor,
        template: &Element,
        keep_paragraph_format: bool,
    ) -> Self {
        let mut element = template.clone();
        for tr in element.elements_mut().filter(|e| e.is("tr")) {
            for tc in tr.elements_mut().filter(|e| e.is("tc")) {
                clear_cell(tc, keep_paragraph_format);
            }
        }
        Self {
            id: descriptor.id.clone(),
            element,
            filled: BTreeSet::new(),
        }
    }

    /// Table identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Place a paragraph into a cell. The first paragraph replaces the cell's
    /// placeholder; later ones are appended.
    pub fn place(&mut self, row: usize, col: usize, paragraph: Element) -> Result<()> {
        let id = &self.id;
        let outside = || {
            Error::InjectionFailed(format!(
                "cell ({}, {}) is outside table '{}'",
                row, col, id
            ))
        };

        let tc = self
            .element
            .elements_mut()
            .filter(|e| e.is("tr"))
            .nth(row)
            .ok_or_else(outside)?
            .elements_mut()
            .filter(|e| e.is("tc"))
            .nth(col)
            .ok_or_else(outside)?;

        if self.filled.insert((row, col)) {
            tc.children
                .retain(|n| !matches!(n, Node::Element(e) if e.is("p")));
        }
        tc.children.push(Node::Element(paragraph));
        Ok(())
    }

    /// Number of cells that received content.
    pub fn cells_filled(&self) -> usize {
        self.filled.len()
    }

    /// Finish and return the table element.
    pub fn into_element(self) -> Element {
        self.element
    }
}

fn clear_cell(tc: &mut Element, keep_paragraph_format: bool) {
    let placeholder_ppr = tc
        .child("p")
        .and_then(|p| p.child("pPr"))
        .map(|ppr| {
            if keep_paragraph_format {
                let mut ppr = ppr.clone();
                ppr.remove_children("rPr");
                ppr
            } else {
                let mut bare = Element::new(ppr.name.clone());
                if let Some(style) = ppr.child("pStyle") {
                    bare.children.push(Node::Element(style.clone()));
                }
                bare
            }
        })
        .filter(|ppr| !ppr.children.is_empty());

    tc.children
        .retain(|n| matches!(n, Node::Element(e) if e.is("tcPr")));

    let mut p = Element::new("w:p");
    if let Some(ppr) = placeholder_ppr {
        p = p.with_child(ppr);
    }
    tc.children.push(Node::Element(p));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::XmlDocument;

    const TABLE: &str = r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/><w:tblCaption w:val="caption_table"/></w:tblPr><w:tblGrid><w:gridCol w:w="4000"/><w:gridCol w:w="4000"/></w:tblGrid><w:tr><w:tc><w:tcPr><w:tcW w:w="4000"/></w:tcPr><w:p><w:pPr><w:pStyle w:val="CellText"/><w:jc w:val="right"/></w:pPr><w:r><w:t>OLD A</w:t></w:r></w:p><w:p><w:r><w:t>OLD B</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>OLD C</w:t></w:r></w:p></w:tc></w:tr><w:tr><w:tc><w:p/></w:tc><w:tc><w:p/></w:tc></w:tr></w:tbl>"#;

    fn descriptor() -> TableDescriptor {
        TableDescriptor {
            id: "caption_table".into(),
            index: 0,
            rows: 2,
            cols: 2,
            style_name: Some("Table Grid".into()),
        }
    }

    fn template() -> Element {
        XmlDocument::parse(TABLE.as_bytes()).unwrap().root
    }

    fn para(text: &str) -> Element {
        Element::new("w:p").with_child(
            Element::new("w:r").with_child(Element::new("w:t").with_text(text)),
        )
    }

    #[test]
    fn test_clone_clears_text_keeps_structure() {
        let table = TableBuilder::from_template(&descriptor(), &template(), false).into_element();
        let xml = table.to_xml();
        assert!(!xml.contains("OLD"));
        assert!(xml.contains("<w:tblGrid>"));
        assert!(xml.contains("<w:tcW w:w=\"4000\"/>"));
        assert!(xml.contains("<w:pPr><w:pStyle w:val=\"CellText\"/></w:pPr>"));
        assert!(!xml.contains("w:jc"));
        assert_eq!(table.children_named("tr").count(), 2);
    }

    #[test]
    fn test_keep_paragraph_format() {
        let table = TableBuilder::from_template(&descriptor(), &template(), true).into_element();
        assert!(table.to_xml().contains("<w:jc w:val=\"right\"/>"));
    }

    #[test]
    fn test_place_replaces_then_appends() {
        let mut builder = TableBuilder::from_template(&descriptor(), &template(), false);
        builder.place(0, 1, para("Index No.")).unwrap();
        builder.place(0, 1, para("2024-001")).unwrap();
        builder.place(1, 0, para("Plaintiff")).unwrap();
        assert_eq!(builder.cells_filled(), 2);

        let table = builder.into_element();
        let row0: Vec<&Element> = table.children_named("tr").collect();
        let cell = row0[0].children_named("tc").nth(1).unwrap();
        let texts: Vec<String> = cell.children_named("p").map(|p| p.text()).collect();
        assert_eq!(texts, vec!["Index No.", "2024-001"]);

        let untouched = row0[0].children_named("tc").next().unwrap();
        assert_eq!(untouched.children_named("p").count(), 1);
        assert_eq!(untouched.text(), "");
    }

    #[test]
    fn test_place_outside_table() {
        let mut builder = TableBuilder::from_template(&descriptor(), &template(), false);
        assert!(matches!(
            builder.place(2, 0, para("x")),
            Err(Error::InjectionFailed(_))
        ));
        assert!(matches!(
            builder.place(0, 5, para("x")),
            Err(Error::InjectionFailed(_))
        ));
    }
}
