//! Slot filling: the contract with the external classification engine.
//!
//! A [`SlotFiller`] receives the template's slot listing together with the
//! raw text and answers with an ordered list of [`FilledBlock`]s. The engine
//! itself lives outside this crate; this module provides the contract, a
//! retrying wrapper that enforces timeouts and corrective retries, tolerant
//! parsing of JSON answers, and the prompt text for language-model engines.

pub mod prompt;
mod response;
mod retry;

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::model::{BlockSlot, Blueprint, FilledBlock};

pub use response::{parse_response, validate_blocks};
pub use retry::{RetryPolicy, RetryingFiller};

/// A rasterized template page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// One-based page number
    pub page: u32,
    /// Encoded image bytes (PNG)
    pub data: Vec<u8>,
}

/// Everything a filler gets for one classification call.
///
/// Cheap to clone: the blueprint, text and images are shared.
#[derive(Debug, Clone)]
pub struct FillRequest {
    blueprint: Arc<Blueprint>,
    raw_text: Arc<str>,
    images: Arc<[PageImage]>,
    correction: Option<String>,
}

impl FillRequest {
    /// Create a request for a blueprint and raw input text.
    pub fn new(blueprint: Arc<Blueprint>, raw_text: impl Into<Arc<str>>) -> Self {
        Self {
            blueprint,
            raw_text: raw_text.into(),
            images: Arc::from(Vec::new()),
            correction: None,
        }
    }

    /// Attach rasterized template pages.
    pub fn with_images(mut self, images: Vec<PageImage>) -> Self {
        self.images = Arc::from(images);
        self
    }

    /// Attach a correction note for a corrective retry.
    pub fn with_correction(mut self, note: impl Into<String>) -> Self {
        self.correction = Some(note.into());
        self
    }

    /// The slot listing, in document order.
    pub fn slots(&self) -> &[BlockSlot] {
        self.blueprint.slots()
    }

    /// The blueprint the request was built from.
    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    /// Raw input text.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Rasterized template pages (may be empty).
    pub fn images(&self) -> &[PageImage] {
        &self.images
    }

    /// Validation message from a previous attempt, if any.
    pub fn correction(&self) -> Option<&str> {
        self.correction.as_deref()
    }
}

/// External classification engine.
///
/// Implementations return `ClassificationUnavailable` when the engine cannot
/// be reached and `ClassificationMalformed` when its answer is unusable.
/// Output order is the final document order; the number of blocks need not
/// match the number of slots.
pub trait SlotFiller: Send + Sync {
    /// Short name used in log messages.
    fn name(&self) -> &str;

    /// Classify the raw text of the request into blocks.
    fn fill(&self, request: &FillRequest) -> Result<Vec<FilledBlock>>;
}

impl<F: SlotFiller + ?Sized> SlotFiller for Arc<F> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fill(&self, request: &FillRequest) -> Result<Vec<FilledBlock>> {
        (**self).fill(request)
    }
}

/// Filler that answers every request with the same blocks.
///
/// Useful to replay a saved classification or in tests.
#[derive(Debug, Clone, Default)]
pub struct FixedFiller {
    blocks: Vec<FilledBlock>,
}

impl FixedFiller {
    /// Create a filler returning `blocks`.
    pub fn new(blocks: Vec<FilledBlock>) -> Self {
        Self { blocks }
    }

    /// Create a filler from a saved JSON answer.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(Self::new(parse_response(raw)?))
    }

    /// The blocks this filler returns.
    pub fn blocks(&self) -> &[FilledBlock] {
        &self.blocks
    }
}

impl SlotFiller for FixedFiller {
    fn name(&self) -> &str {
        "fixed"
    }

    fn fill(&self, _request: &FillRequest) -> Result<Vec<FilledBlock>> {
        Ok(self.blocks.clone())
    }
}

/// Optional visual context: renders template pages to images.
pub trait PageRasterizer: Send + Sync {
    /// Render the pages of a template container.
    fn rasterize(&self, template: &[u8], max_pages: usize) -> Result<Vec<PageImage>>;
}

/// Rasterize template pages, degrading to no images on failure.
pub fn rasterize_or_skip(
    rasterizer: Option<&dyn PageRasterizer>,
    template: &[u8],
    max_pages: usize,
) -> Vec<PageImage> {
    let Some(rasterizer) = rasterizer else {
        return Vec::new();
    };
    match rasterizer.rasterize(template, max_pages) {
        Ok(images) => {
            log::debug!("Rasterized {} template pages", images.len());
            images
        }
        Err(e) => {
            log::warn!("Template rasterization failed, continuing text-only: {}", e);
            Vec::new()
        }
    }
}

/// Default time budget for one classification call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub(crate) fn unavailable(filler: &str, detail: impl std::fmt::Display) -> Error {
    Error::ClassificationUnavailable(format!("{}: {}", filler, detail))
}
