//! Scrivener - render handwriting from recorded stroke samples

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use scrivener_config::EngineConfig;
use scrivener_ipc::RenderRequest;
use scrivener_render::{DataUriConverter, RenderEngine, SvgPassthrough, VectorToDocument};
use scrivener_sampler::ReplaySampler;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::{Cli, OutputFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays clean for the document
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scrivener_render=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut sampler = ReplaySampler::from_path(&cli.samples)
        .with_context(|| format!("loading samples from {}", cli.samples.display()))?;
    if let Some(ms) = cli.latency_ms {
        sampler = sampler.with_latency(Duration::from_millis(ms));
    }

    let mut config = EngineConfig::from_env();
    if let Some(workers) = cli.workers {
        config.scheduler.workers = workers;
    }

    let engine = RenderEngine::open(config, Arc::new(sampler))?;
    let request = cli.build_request(engine.config())?;
    info!("Rendering {} lines", request.line_count());

    let result = if cli.stream {
        stream_frames(&engine, request, cli.output.as_deref()).await
    } else {
        render_batch(&engine, &request, cli.output_format(), cli.output.as_deref()).await
    };

    info!("Transform cache: {:?}", engine.cache().stats());
    engine.close();
    result
}

async fn render_batch(
    engine: &RenderEngine,
    request: &RenderRequest,
    format: OutputFormat,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let converter = converter_for(format)?;
    let bytes = engine.export(request, converter).await?;
    let mut out = open_output(output)?;
    out.write_all(&bytes)?;
    if matches!(format, OutputFormat::Svg | OutputFormat::DataUri) {
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

async fn stream_frames(
    engine: &RenderEngine,
    request: RenderRequest,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let mut out = open_output(output)?;
    let mut stream = engine.render_stream(request);
    let mut failed = None;

    while let Some(event) = stream.next_event().await {
        if let scrivener_ipc::RenderEvent::Error { message } = &event {
            failed = Some(message.clone());
        }
        out.write_all(event.to_frame()?.as_bytes())?;
        out.flush()?;
    }

    match failed {
        Some(message) => bail!("stream ended with an error: {message}"),
        None => Ok(()),
    }
}

fn converter_for(format: OutputFormat) -> anyhow::Result<Arc<dyn VectorToDocument>> {
    match format {
        OutputFormat::Svg => Ok(Arc::new(SvgPassthrough)),
        OutputFormat::DataUri => Ok(Arc::new(DataUriConverter)),
        #[cfg(feature = "raster")]
        OutputFormat::Png => Ok(Arc::new(scrivener_render::RasterConverter::default())),
        #[cfg(not(feature = "raster"))]
        OutputFormat::Png => bail!("PNG output needs the `raster` feature"),
        #[cfg(feature = "pdf")]
        OutputFormat::Pdf => Ok(Arc::new(scrivener_render::PdfConverter)),
        #[cfg(not(feature = "pdf"))]
        OutputFormat::Pdf => bail!("PDF output needs the `pdf` feature"),
    }
}

fn open_output(path: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            Ok(Box::new(std::io::BufWriter::new(file)))
        }
        None => Ok(Box::new(std::io::stdout().lock())),
    }
}
