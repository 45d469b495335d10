//! Style definitions part → [`StyleCatalog`].

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::model::{StyleCatalog, StyleDescriptor, StyleFormatting, StyleKind};
use crate::package::Package;
use crate::xml::{Element, XmlDocument};

impl StyleCatalog {
    /// Load the style catalog of a package.
    ///
    /// Fails with `TemplateInvalid` when the style definitions are missing or
    /// cannot be parsed.
    pub fn load(package: &Package) -> Result<Self> {
        load_catalog(package)
    }
}

/// Load the style catalog of a package.
pub fn load_catalog(package: &Package) -> Result<StyleCatalog> {
    let styles = package.styles_xml()?;
    catalog_from_xml(&styles)
}

/// Build a catalog from a parsed style definitions part.
pub fn catalog_from_xml(styles: &XmlDocument) -> Result<StyleCatalog> {
    if !styles.root.is("styles") {
        return Err(Error::TemplateInvalid(format!(
            "style definitions root is <{}>, expected <w:styles>",
            styles.root.name
        )));
    }

    let mut descriptors = Vec::new();
    let mut parents: Vec<Option<String>> = Vec::new();
    let mut names_by_id: HashMap<String, String> = HashMap::new();

    for style in styles.root.children_named("style") {
        let kind = match style.attr("type") {
            None => StyleKind::Paragraph,
            Some(value) => match StyleKind::from_type_attr(value) {
                Some(kind) => kind,
                None => continue,
            },
        };

        let Some(id) = style.attr("styleId") else {
            log::warn!("Style definition without styleId skipped");
            continue;
        };

        let name = ui_name(style.child_val("name").unwrap_or(id));
        names_by_id.insert(id.to_string(), name.clone());
        parents.push(style.child_val("basedOn").map(str::to_string));
        descriptors.push(StyleDescriptor {
            id: id.to_string(),
            name,
            kind,
            based_on: None,
            is_default: style.attr("default").is_some_and(is_on),
            formatting: formatting_of(style),
        });
    }

    // basedOn references ids; expose the parent by name
    for (descriptor, parent) in descriptors.iter_mut().zip(parents) {
        descriptor.based_on = parent.map(|id| names_by_id.get(&id).cloned().unwrap_or(id));
    }

    let catalog = StyleCatalog::from_descriptors(descriptors);
    log::debug!("Style catalog loaded: {} styles", catalog.len());
    Ok(catalog)
}

fn formatting_of(style: &Element) -> StyleFormatting {
    StyleFormatting {
        paragraph_properties: style.child("pPr").map(Element::to_xml),
        run_properties: style.child("rPr").map(Element::to_xml),
    }
}

fn is_on(value: &str) -> bool {
    matches!(value, "1" | "true" | "on")
}

/// Map a stored built-in style name to the name shown in the user interface.
///
/// Word stores some built-in names in lower case (`heading 1`, `caption`).
pub fn ui_name(stored: &str) -> String {
    const BUILT_IN: &[(&str, &str)] = &[
        ("normal", "Normal"),
        ("title", "Title"),
        ("subtitle", "Subtitle"),
        ("caption", "Caption"),
        ("header", "Header"),
        ("footer", "Footer"),
        ("footnote text", "Footnote Text"),
        ("endnote text", "Endnote Text"),
        ("annotation text", "Comment Text"),
        ("body text", "Body Text"),
        ("list paragraph", "List Paragraph"),
        ("list number", "List Number"),
        ("list bullet", "List Bullet"),
        ("signature", "Signature"),
    ];

    if let Some((_, ui)) = BUILT_IN.iter().find(|(s, _)| *s == stored) {
        return ui.to_string();
    }
    for (prefix, ui_prefix) in [("heading ", "Heading "), ("toc ", "TOC "), ("index ", "Index ")] {
        if let Some(level) = stored.strip_prefix(prefix) {
            if !level.is_empty() && level.chars().all(|c| c.is_ascii_digit()) {
                return format!("{}{}", ui_prefix, level);
            }
        }
    }
    stored.to_string()
}
