//! End-to-end formatting: extract → fill → dedup → inject.

use std::sync::Arc;

use rayon::prelude::*;

use crate::cache::TemplateCache;
use crate::dedup::DeduplicationFilter;
use crate::error::{Error, Result};
use crate::filler::{rasterize_or_skip, FillRequest, PageRasterizer, RetryPolicy, RetryingFiller, SlotFiller};
use crate::inject::{InjectOptions, InjectionStats, Injector};
use crate::model::OutputContainer;
use crate::package::Package;
use crate::parser::ExtractOptions;
use crate::render;

/// Default number of template pages handed to the rasterizer.
pub const DEFAULT_MAX_PAGES: usize = 3;

/// One formatting request for [`Pipeline::run_batch`].
#[derive(Debug, Clone)]
pub struct FormatRequest {
    /// Template container bytes
    pub template: Vec<u8>,
    /// Raw input text
    pub raw_text: String,
}

impl FormatRequest {
    /// Create a request.
    pub fn new(template: Vec<u8>, raw_text: impl Into<String>) -> Self {
        Self {
            template,
            raw_text: raw_text.into(),
        }
    }
}

/// Result of a formatting request.
#[derive(Debug, Clone)]
pub struct FormatOutput {
    /// The produced document
    pub document: OutputContainer,
    /// Plain-text preview of the document
    pub preview: String,
    /// Injection counters
    pub stats: InjectionStats,
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    filler: Option<Arc<dyn SlotFiller>>,
    retry: RetryPolicy,
    dedup: DeduplicationFilter,
    inject: InjectOptions,
    extract: ExtractOptions,
    cache: Option<Arc<TemplateCache>>,
    rasterizer: Option<Arc<dyn PageRasterizer>>,
    max_pages: Option<usize>,
}

impl PipelineBuilder {
    /// Set the classification engine.
    pub fn filler(mut self, filler: impl SlotFiller + 'static) -> Self {
        self.filler = Some(Arc::new(filler));
        self
    }

    /// Set an already shared classification engine.
    pub fn shared_filler(mut self, filler: Arc<dyn SlotFiller>) -> Self {
        self.filler = Some(filler);
        self
    }

    /// Set the retry policy for classification calls.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Set the deduplication length threshold.
    pub fn dedup_threshold(mut self, min_len: usize) -> Self {
        self.dedup = self.dedup.with_threshold(min_len);
        self
    }

    /// Set injection options.
    pub fn inject_options(mut self, options: InjectOptions) -> Self {
        self.inject = options;
        self
    }

    /// Set blueprint extraction options.
    pub fn extract_options(mut self, options: ExtractOptions) -> Self {
        self.extract = options;
        self
    }

    /// Share a template cache with other pipelines.
    pub fn cache(mut self, cache: Arc<TemplateCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Provide rasterized template pages to the filler.
    pub fn rasterizer(mut self, rasterizer: impl PageRasterizer + 'static) -> Self {
        self.rasterizer = Some(Arc::new(rasterizer));
        self
    }

    /// Limit the number of rasterized pages.
    pub fn max_pages(mut self, pages: usize) -> Self {
        self.max_pages = Some(pages);
        self
    }

    /// Build the pipeline. A filler is required.
    pub fn build(self) -> Result<Pipeline> {
        let filler = self
            .filler
            .ok_or_else(|| Error::Other("pipeline has no slot filler".into()))?;
        Ok(Pipeline {
            filler: RetryingFiller::new(filler, self.retry),
            dedup: self.dedup,
            inject: self.inject,
            extract: self.extract,
            cache: self.cache.unwrap_or_default(),
            rasterizer: self.rasterizer,
            max_pages: self.max_pages.unwrap_or(DEFAULT_MAX_PAGES),
        })
    }
}

/// Synchronous formatting pipeline.
///
/// Each request runs its stages strictly in order; distinct requests may run
/// concurrently and share the template cache.
pub struct Pipeline {
    filler: RetryingFiller,
    dedup: DeduplicationFilter,
    inject: InjectOptions,
    extract: ExtractOptions,
    cache: Arc<TemplateCache>,
    rasterizer: Option<Arc<dyn PageRasterizer>>,
    max_pages: usize,
}

impl Pipeline {
    /// Start configuring a pipeline.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// The template cache used by this pipeline.
    pub fn cache(&self) -> &Arc<TemplateCache> {
        &self.cache
    }

    /// Format `raw_text` after the template in `template`.
    pub fn run(&self, template: &[u8], raw_text: &str) -> Result<FormatOutput> {
        let cached = self.cache.get_or_parse(template, &self.extract)?;

        let images = rasterize_or_skip(self.rasterizer.as_deref(), template, self.max_pages);
        let request = FillRequest::new(Arc::clone(&cached.blueprint), raw_text).with_images(images);
        let blocks = self.filler.fill(&request)?;
        let received = blocks.len();
        let blocks = self.dedup.filter(blocks);
        log::debug!(
            "Filler returned {} blocks, {} after deduplication",
            received,
            blocks.len()
        );

        let injection = Injector::new(&cached.catalog, &cached.blueprint, self.inject.clone())
            .inject(&cached.package, &blocks)?;
        let preview = render::to_preview_text(injection.document.as_bytes())?;

        Ok(FormatOutput {
            document: injection.document,
            preview,
            stats: injection.stats,
        })
    }

    /// Format `raw_text` without a template, using the built-in blank one.
    pub fn run_blank(&self, raw_text: &str) -> Result<FormatOutput> {
        let template = Package::blank()?.to_bytes()?;
        self.run(&template, raw_text)
    }

    /// Format independent requests concurrently. Results keep input order.
    pub fn run_batch(&self, requests: &[FormatRequest]) -> Vec<Result<FormatOutput>> {
        requests
            .par_iter()
            .map(|request| self.run(&request.template, &request.raw_text))
            .collect()
    }
}
