//! # redocx
//!
//! Template-driven DOCX reconstruction for Rust.
//!
//! This library reads a `.docx` template, extracts its named styles and a
//! structural blueprint of its body, and rebuilds a document from classified
//! text blocks by referencing those styles. Numbering, indentation and
//! spacing stay with the styles; the library never computes them.
//!
//! ## Quick Start
//!
//! ```no_run
//! use redocx::{parse_template, BlockKind, FilledBlock, InjectOptions};
//!
//! fn main() -> redocx::Result<()> {
//!     let template = parse_template("template.docx")?;
//!
//!     let blocks = vec![
//!         FilledBlock::new(BlockKind::Caption, "SUPREME COURT OF THE STATE OF NEW YORK"),
//!         FilledBlock::new(BlockKind::Allegation, "1. That the defendant resides in the county."),
//!     ];
//!     let injection = redocx::inject(
//!         &template.package,
//!         &template.catalog,
//!         &template.blueprint,
//!         &blocks,
//!         &InjectOptions::default(),
//!     )?;
//!     injection.document.save("output.docx")?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Style catalog**: every paragraph, character and table style by name
//! - **Blueprint**: ordered slots with kind, style and table coordinates
//! - **Slot filling**: a classifier contract with timeout and corrective retry
//! - **Style-only injection**: output paragraphs carry a style reference only
//! - **Template cache**: one extraction per template, shared across requests

pub mod cache;
pub mod dedup;
pub mod detect;
pub mod error;
pub mod filler;
pub mod inject;
pub mod model;
pub mod package;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod xml;

// Re-export commonly used types
pub use cache::{CacheStats, CachedTemplate, TemplateCache};
pub use dedup::DeduplicationFilter;
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_docx, DocxFormat};
pub use error::{Error, ErrorKind, Result};
pub use filler::{
    FillRequest, FixedFiller, PageImage, PageRasterizer, RetryPolicy, RetryingFiller, SlotFiller,
};
pub use inject::{inject, FormatStrategy, InjectOptions, Injection, InjectionStats, Injector};
pub use model::{
    BlockKind, BlockSlot, Blueprint, CellRef, FilledBlock, OutputContainer, StyleCatalog,
    StyleDescriptor, StyleKind, TableDescriptor,
};
pub use package::Package;
pub use parser::{classify_style_name, BlueprintExtractor, ExtractOptions, Template, TemplateParser};
pub use pipeline::{FormatOutput, FormatRequest, Pipeline, PipelineBuilder};
pub use render::JsonFormat;

use std::io::Read;
use std::path::Path;

/// Parse a template file into its package, style catalog and blueprint.
///
/// # Example
///
/// ```no_run
/// use redocx::parse_template;
///
/// let template = parse_template("template.docx").unwrap();
/// println!("Slots: {}", template.blueprint.len());
/// ```
pub fn parse_template<P: AsRef<Path>>(path: P) -> Result<Template> {
    TemplateParser::open(path)?.parse()
}

/// Parse a template file with custom extraction options.
pub fn parse_template_with_options<P: AsRef<Path>>(
    path: P,
    options: ExtractOptions,
) -> Result<Template> {
    TemplateParser::open_with_options(path, options)?.parse()
}

/// Parse a template from bytes.
pub fn parse_template_bytes(data: &[u8]) -> Result<Template> {
    TemplateParser::from_bytes(data)?.parse()
}

/// Parse a template from a reader.
pub fn parse_template_reader<R: Read>(reader: R) -> Result<Template> {
    TemplateParser::from_reader(reader)?.parse()
}

/// Load the style catalog of a template file.
///
/// # Example
///
/// ```no_run
/// use redocx::extract_styles;
///
/// let catalog = extract_styles("template.docx").unwrap();
/// for name in catalog.names() {
///     println!("{}", name);
/// }
/// ```
pub fn extract_styles<P: AsRef<Path>>(path: P) -> Result<StyleCatalog> {
    TemplateParser::open(path)?.styles()
}

/// Extract the blueprint of a template file.
pub fn extract_blueprint<P: AsRef<Path>>(path: P) -> Result<Blueprint> {
    let parser = TemplateParser::open(path)?;
    let catalog = parser.styles()?;
    parser.blueprint(&catalog)
}

/// Plain-text preview of a document file.
pub fn preview_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let package = Package::open(path)?;
    render::package_preview_text(&package)
}

/// Blueprint of a template file as JSON.
///
/// # Example
///
/// ```no_run
/// use redocx::{blueprint_json, JsonFormat};
///
/// let json = blueprint_json("template.docx", JsonFormat::Pretty).unwrap();
/// std::fs::write("blueprint.json", json).unwrap();
/// ```
pub fn blueprint_json<P: AsRef<Path>>(path: P, format: JsonFormat) -> Result<String> {
    let blueprint = extract_blueprint(path)?;
    render::to_json(&blueprint, format)
}

/// Builder for injecting already classified blocks into a template.
///
/// # Example
///
/// ```no_run
/// use redocx::{BlockKind, FilledBlock, Redocx};
///
/// let blocks = vec![FilledBlock::new(BlockKind::Heading, "COMPLAINT")];
/// Redocx::new()
///     .format_copy()
///     .with_default_style("Normal")
///     .template("template.docx")?
///     .inject(&blocks)?
///     .save("output.docx")?;
/// # Ok::<(), redocx::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Redocx {
    extract_options: ExtractOptions,
    inject_options: InjectOptions,
    dedup: Option<DeduplicationFilter>,
}

impl Redocx {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy direct formatting of aligned template paragraphs.
    pub fn format_copy(mut self) -> Self {
        self.inject_options = self.inject_options.format_copy();
        self
    }

    /// Set the last-resort style.
    pub fn with_default_style(mut self, name: impl Into<String>) -> Self {
        self.inject_options = self.inject_options.with_default_style(name);
        self
    }

    /// Set blueprint extraction options.
    pub fn with_extract_options(mut self, options: ExtractOptions) -> Self {
        self.extract_options = options;
        self
    }

    /// Drop repeated long blocks before injecting.
    pub fn with_dedup(mut self, filter: DeduplicationFilter) -> Self {
        self.dedup = Some(filter);
        self
    }

    /// Open a template file.
    pub fn template<P: AsRef<Path>>(self, path: P) -> Result<RedocxTemplate> {
        let template =
            TemplateParser::open_with_options(path, self.extract_options.clone())?.parse()?;
        Ok(self.wrap(template))
    }

    /// Open a template from bytes.
    pub fn template_bytes(self, data: &[u8]) -> Result<RedocxTemplate> {
        let template =
            TemplateParser::from_bytes_with_options(data, self.extract_options.clone())?.parse()?;
        Ok(self.wrap(template))
    }

    /// Use the built-in blank template.
    pub fn blank(self) -> Result<RedocxTemplate> {
        let template =
            TemplateParser::from_package(Package::blank()?, self.extract_options.clone()).parse()?;
        Ok(self.wrap(template))
    }

    fn wrap(self, template: Template) -> RedocxTemplate {
        RedocxTemplate {
            template,
            inject_options: self.inject_options,
            dedup: self.dedup,
        }
    }
}

/// A parsed template ready for injection.
#[derive(Debug, Clone)]
pub struct RedocxTemplate {
    template: Template,
    inject_options: InjectOptions,
    dedup: Option<DeduplicationFilter>,
}

impl RedocxTemplate {
    /// The parsed template.
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Style catalog of the template.
    pub fn styles(&self) -> &StyleCatalog {
        &self.template.catalog
    }

    /// Blueprint of the template.
    pub fn blueprint(&self) -> &Blueprint {
        &self.template.blueprint
    }

    /// Inject blocks and return the produced document.
    pub fn inject(&self, blocks: &[FilledBlock]) -> Result<OutputContainer> {
        Ok(self.inject_with_stats(blocks)?.document)
    }

    /// Inject blocks and return the document with its counters.
    pub fn inject_with_stats(&self, blocks: &[FilledBlock]) -> Result<Injection> {
        let filtered;
        let blocks = match &self.dedup {
            Some(filter) => {
                filtered = filter.filter(blocks.to_vec());
                filtered.as_slice()
            }
            None => blocks,
        };
        inject(
            &self.template.package,
            &self.template.catalog,
            &self.template.blueprint,
            blocks,
            &self.inject_options,
        )
    }
}
