//! Style definition types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of a style definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleKind {
    /// Paragraph style
    Paragraph,
    /// Character (run) style
    Character,
    /// Table style
    Table,
}

impl StyleKind {
    /// Parse the `w:type` attribute value. Numbering styles are not catalogued.
    pub fn from_type_attr(value: &str) -> Option<Self> {
        match value {
            "paragraph" => Some(StyleKind::Paragraph),
            "character" => Some(StyleKind::Character),
            "table" => Some(StyleKind::Table),
            _ => None,
        }
    }
}

/// Formatting inherited from a style definition, kept as raw property XML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleFormatting {
    /// Serialized `w:pPr` of the definition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paragraph_properties: Option<String>,

    /// Serialized `w:rPr` of the definition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_properties: Option<String>,
}

/// One named style of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleDescriptor {
    /// Style identifier referenced from content (`w:styleId`)
    pub id: String,

    /// Display name
    pub name: String,

    /// Style kind
    pub kind: StyleKind,

    /// Name of the parent style
    #[serde(skip_serializing_if = "Option::is_none")]
    pub based_on: Option<String>,

    /// Whether this is the default style of its kind
    pub is_default: bool,

    /// Opaque inherited formatting
    pub formatting: StyleFormatting,
}

/// Flat name → descriptor mapping of a template's styles.
///
/// Immutable once built; safe to share between threads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, StyleDescriptor>",
    into = "BTreeMap<String, StyleDescriptor>"
)]
pub struct StyleCatalog {
    styles: BTreeMap<String, StyleDescriptor>,
    ids: BTreeMap<String, String>,
}

impl From<BTreeMap<String, StyleDescriptor>> for StyleCatalog {
    fn from(styles: BTreeMap<String, StyleDescriptor>) -> Self {
        Self::from_descriptors(styles.into_values())
    }
}

impl From<StyleCatalog> for BTreeMap<String, StyleDescriptor> {
    fn from(catalog: StyleCatalog) -> Self {
        catalog.styles
    }
}

impl StyleCatalog {
    /// Build a catalog from descriptors. Later duplicates of a name are ignored.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = StyleDescriptor>) -> Self {
        let mut styles = BTreeMap::new();
        let mut ids = BTreeMap::new();
        for descriptor in descriptors {
            if styles.contains_key(&descriptor.name) {
                log::debug!("Duplicate style name '{}' ignored", descriptor.name);
                continue;
            }
            ids.insert(descriptor.id.clone(), descriptor.name.clone());
            styles.insert(descriptor.name.clone(), descriptor);
        }
        Self { styles, ids }
    }

    /// Get a style by name.
    pub fn get(&self, name: &str) -> Option<&StyleDescriptor> {
        self.styles.get(name)
    }

    /// Get a style by its identifier.
    pub fn by_id(&self, id: &str) -> Option<&StyleDescriptor> {
        self.ids.get(id).and_then(|name| self.styles.get(name))
    }

    /// Check whether a style name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.styles.contains_key(name)
    }

    /// Get a style by name only if it is a paragraph style.
    pub fn paragraph_style(&self, name: &str) -> Option<&StyleDescriptor> {
        self.get(name).filter(|s| s.kind == StyleKind::Paragraph)
    }

    /// The default paragraph style: the one flagged default, else `Normal`.
    pub fn default_paragraph_style(&self) -> Option<&StyleDescriptor> {
        self.styles
            .values()
            .find(|s| s.kind == StyleKind::Paragraph && s.is_default)
            .or_else(|| self.paragraph_style("Normal"))
    }

    /// Style names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.styles.keys().map(|k| k.as_str())
    }

    /// Iterate over descriptors in name order.
    pub fn iter(&self) -> impl Iterator<Item = &StyleDescriptor> {
        self.styles.values()
    }

    /// Number of styles.
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}
