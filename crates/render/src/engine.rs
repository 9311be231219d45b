//! Render engine: owns the shared pieces behind both render modes

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use scrivener_config::{EngineConfig, RenderConfig};
use scrivener_ipc::RenderRequest;
use scrivener_sampler::{Sampler, SamplingError, SamplingMode, StrokeSample};
use tracing::{debug, info};

use crate::cache::TransformCache;
use crate::document::DocumentRenderer;
use crate::error::RenderError;
use crate::export::VectorToDocument;
use crate::geometry::GeometryNormalizer;
use crate::scheduler::{JobHandle, RenderScheduler, ScheduleError};
use crate::stream::{RenderStream, StreamRenderer};
use crate::validation::validate_request;

/// State shared between the engine and its running streams
pub(crate) struct RenderContext {
    pub(crate) normalizer: GeometryNormalizer,
    pub(crate) cache: TransformCache,
    pub(crate) scheduler: RenderScheduler,
    sampler: Arc<dyn Sampler>,
}

impl RenderContext {
    /// Queue one sampling call on the worker pool
    pub(crate) fn dispatch_sample(
        &self,
        line: String,
        bias: f32,
        mode: SamplingMode,
    ) -> JobHandle<Result<StrokeSample, SamplingError>> {
        let sampler = Arc::clone(&self.sampler);
        self.scheduler.dispatch(move || {
            sampler
                .sample(&line, bias, mode)
                .map(StrokeSample::trim_padding)
        })
    }
}

/// Wait for a dispatched sampling call
pub(crate) async fn await_sample(
    job: JobHandle<Result<StrokeSample, SamplingError>>,
) -> Result<StrokeSample, RenderError> {
    match job.join().await {
        Ok(result) => Ok(result?),
        Err(ScheduleError::Closed) => Err(RenderError::EngineClosed),
        Err(err) => Err(SamplingError::from(err).into()),
    }
}

/// Entry point for rendering handwriting.
///
/// Created with [`open`](Self::open) and torn down with [`close`](Self::close).
/// Both render modes share the same transform cache and worker pool.
pub struct RenderEngine {
    context: Arc<RenderContext>,
    stream_buffer: usize,
    open: AtomicBool,
}

impl std::fmt::Debug for RenderEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderEngine")
            .field("config", self.config())
            .field("workers", &self.context.scheduler.workers())
            .field("open", &self.is_open())
            .finish()
    }
}

impl RenderEngine {
    pub fn open(config: EngineConfig, sampler: Arc<dyn Sampler>) -> Result<Self, RenderError> {
        let normalizer = GeometryNormalizer::new(config.render)?;
        let cache = TransformCache::new(&config.cache);
        let scheduler = RenderScheduler::new(&config.scheduler);

        info!(
            "Render engine open: viewport {}x{}/line, {} workers, cache {} entries / {:?}",
            normalizer.config().viewport_width,
            normalizer.config().line_height,
            scheduler.workers(),
            config.cache.max_entries,
            config.cache.ttl
        );

        Ok(Self {
            context: Arc::new(RenderContext {
                normalizer,
                cache,
                scheduler,
                sampler,
            }),
            stream_buffer: config.scheduler.stream_buffer,
            open: AtomicBool::new(true),
        })
    }

    pub fn config(&self) -> &RenderConfig {
        self.context.normalizer.config()
    }

    pub fn cache(&self) -> &TransformCache {
        &self.context.cache
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), RenderError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(RenderError::EngineClosed)
        }
    }

    /// Render a whole request into one SVG document.
    ///
    /// Lines are sampled concurrently on the worker pool. Any failure aborts
    /// the render; no partial document is produced.
    pub async fn render_document(&self, request: &RenderRequest) -> Result<String, RenderError> {
        self.ensure_open()?;
        let modes = validate_request(request)?;
        info!(lines = request.line_count(), "Rendering document");

        let jobs: Vec<Option<_>> = request
            .lines
            .iter()
            .zip(&request.styles)
            .zip(modes)
            .map(|((line, style), mode)| {
                (!line.is_empty())
                    .then(|| self.context.dispatch_sample(line.clone(), style.bias, mode))
            })
            .collect();

        let mut samples = Vec::with_capacity(jobs.len());
        for (index, job) in jobs.into_iter().enumerate() {
            let sample = match job {
                Some(job) => await_sample(job).await?,
                None => StrokeSample::default(),
            };
            debug!(line = index, points = sample.len(), "Sampled line");
            samples.push(sample);
        }

        let renderer = DocumentRenderer::new(&self.context.normalizer).with_cache(&self.context.cache);
        Ok(renderer.render(&request.lines, &samples, &request.styles)?)
    }

    /// Start a streamed render. Must be called within a tokio runtime.
    ///
    /// Failures, including validation and a closed engine, arrive as an
    /// `Error` event inside the stream.
    pub fn render_stream(&self, request: RenderRequest) -> RenderStream {
        StreamRenderer::spawn(Arc::clone(&self.context), request, self.stream_buffer)
    }

    /// Render a document and pass it through `converter` on the worker pool
    pub async fn export(
        &self,
        request: &RenderRequest,
        converter: Arc<dyn VectorToDocument>,
    ) -> Result<Vec<u8>, RenderError> {
        let document = self.render_document(request).await?;
        self.convert(document, converter).await
    }

    /// Convert an already rendered document on the worker pool
    pub async fn convert(
        &self,
        document: String,
        converter: Arc<dyn VectorToDocument>,
    ) -> Result<Vec<u8>, RenderError> {
        self.ensure_open()?;
        debug!(media_type = converter.media_type(), "Converting document");
        match self
            .context
            .scheduler
            .run(move || converter.convert(&document))
            .await
        {
            Ok(result) => Ok(result?),
            Err(ScheduleError::Closed) => Err(RenderError::EngineClosed),
            Err(err) => Err(err.into()),
        }
    }

    /// Stop accepting work and drop cached geometry. Safe to call twice.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            self.context.scheduler.close();
            let stats = self.context.cache.stats();
            self.context.cache.clear();
            info!(
                hits = stats.hits,
                misses = stats.misses,
                "Render engine closed"
            );
        }
    }
}

impl Drop for RenderEngine {
    fn drop(&mut self) {
        self.close();
    }
}
