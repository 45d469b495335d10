//! Shared template fixtures for integration tests.

#![allow(dead_code)]

use redocx::Package;

pub const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="CaptionStyle"><w:name w:val="CaptionStyle"/><w:basedOn w:val="Normal"/><w:pPr><w:jc w:val="center"/></w:pPr></w:style><w:style w:type="paragraph" w:styleId="AllegationStyle"><w:name w:val="AllegationStyle"/><w:basedOn w:val="Normal"/><w:pPr><w:numPr><w:numId w:val="1"/></w:numPr><w:ind w:left="720"/></w:pPr></w:style><w:style w:type="paragraph" w:styleId="SignatureStyle"><w:name w:val="SignatureStyle"/><w:basedOn w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/></w:style><w:style w:type="character" w:styleId="Strong"><w:name w:val="Strong"/><w:rPr><w:b/></w:rPr></w:style><w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/></w:style><w:style w:type="numbering" w:styleId="NoList"><w:name w:val="No List"/></w:style></w:styles>"#;

pub const SECT_PR: &str = r#"<w:sectPr><w:pgSz w:w="12240" w:h="20160"/><w:pgMar w:top="1800" w:right="1440" w:bottom="1800" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr>"#;

/// A paragraph with a style id and text.
pub fn para(style: &str, text: &str) -> String {
    format!(
        r#"<w:p><w:pPr><w:pStyle w:val="{}"/></w:pPr><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        style, text
    )
}

/// A table with a caption id and cell texts per row.
pub fn table(caption: &str, rows: &[&[&str]]) -> String {
    let rows: String = rows
        .iter()
        .map(|cells| {
            let cells: String = cells
                .iter()
                .map(|text| {
                    format!(
                        r#"<w:tc><w:tcPr><w:tcW w:w="4680" w:type="dxa"/></w:tcPr><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:tc>"#,
                        text
                    )
                })
                .collect();
            format!("<w:tr>{}</w:tr>", cells)
        })
        .collect();
    format!(
        r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/><w:tblCaption w:val="{}"/></w:tblPr><w:tblGrid><w:gridCol w:w="4680"/><w:gridCol w:w="4680"/></w:tblGrid>{}</w:tbl>"#,
        caption, rows
    )
}

/// Wrap body content into a complete package.
pub fn package(body: &str) -> Package {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}{}</w:body></w:document>"#,
        body, SECT_PR
    );
    Package::from_document_xml(&document, STYLES).expect("fixture package")
}

/// Wrap body content into container bytes.
pub fn template_bytes(body: &str) -> Vec<u8> {
    package(body).to_bytes().expect("fixture bytes")
}

/// Caption, allegation and signature paragraphs.
pub fn legal_template() -> Vec<u8> {
    template_bytes(
        &[
            para("CaptionStyle", "SUPREME COURT OF THE STATE OF NEW YORK"),
            para("AllegationStyle", "1. That the defendant resides in the county."),
            para("SignatureStyle", "Attorney for Plaintiff"),
        ]
        .concat(),
    )
}

/// A caption table followed by a heading and a body paragraph.
pub fn caption_table_template() -> Vec<u8> {
    template_bytes(
        &[
            table(
                "caption_table",
                &[&["JOHN DOE, Plaintiff,", "Index No."], &["-against-", ""]],
            ),
            para("Heading1", "VERIFIED COMPLAINT"),
            para("Normal", "Body text."),
        ]
        .concat(),
    )
}
