//! Template parser: container → style catalog + blueprint.

use std::io::Read;
use std::path::Path;

use crate::detect::detect_format_from_path;
use crate::error::Result;
use crate::model::{Blueprint, StyleCatalog};
use crate::package::Package;

use super::blueprint::BlueprintExtractor;
use super::options::ExtractOptions;
use super::styles::load_catalog;

/// A parsed template: the container plus everything extracted from it.
#[derive(Debug, Clone)]
pub struct Template {
    /// The template container
    pub package: Package,
    /// Named styles
    pub catalog: StyleCatalog,
    /// Structural blueprint
    pub blueprint: Blueprint,
}

/// DOCX template parser.
pub struct TemplateParser {
    package: Package,
    options: ExtractOptions,
}

impl TemplateParser {
    /// Open a template file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ExtractOptions::default())
    }

    /// Open a template file with custom options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ExtractOptions) -> Result<Self> {
        let path = path.as_ref();

        // Verify it's a zip container before unpacking
        detect_format_from_path(path)?;

        let package = Package::open(path)?;
        Ok(Self { package, options })
    }

    /// Parse a template from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, ExtractOptions::default())
    }

    /// Parse a template from bytes with custom options.
    pub fn from_bytes_with_options(data: &[u8], options: ExtractOptions) -> Result<Self> {
        let package = Package::from_bytes(data)?;
        Ok(Self { package, options })
    }

    /// Parse a template from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_reader_with_options(reader, ExtractOptions::default())
    }

    /// Parse a template from a reader with custom options.
    pub fn from_reader_with_options<R: Read>(mut reader: R, options: ExtractOptions) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes_with_options(&data, options)
    }

    /// Wrap an already opened package.
    pub fn from_package(package: Package, options: ExtractOptions) -> Self {
        Self { package, options }
    }

    /// The underlying container.
    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Load the style catalog.
    pub fn styles(&self) -> Result<StyleCatalog> {
        load_catalog(&self.package)
    }

    /// Extract the blueprint using an already loaded catalog.
    pub fn blueprint(&self, catalog: &StyleCatalog) -> Result<Blueprint> {
        BlueprintExtractor::new(self.options.clone()).extract(&self.package, catalog)
    }

    /// Load the catalog and extract the blueprint.
    pub fn parse(self) -> Result<Template> {
        let catalog = self.styles()?;
        let blueprint = self.blueprint(&catalog)?;
        Ok(Template {
            package: self.package,
            catalog,
            blueprint,
        })
    }
}
