use anyhow::{anyhow, Context, Result};
use brand_batch::{
    archive_file_name, create_generator, export_archive, export_completed, BatchEvent, BatchRunner,
    Config, EncodedImage, JobStatus, LogoPosition, PromptList,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

type LogFilterHandle = reload::Handle<EnvFilter, Registry>;

#[derive(Parser)]
#[command(name = "brand-batch")]
#[command(version, author = "TigreRoll")]
#[command(about = "Generate branded images in bulk with a logo on every result")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to brand-batch.toml search paths)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one image per prompt and export the results
    Generate {
        /// File with one prompt per line, or `-` for stdin
        #[arg(short, long, value_name = "FILE")]
        prompts: String,

        /// Output directory for images and batch_results.json
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Logo image to composite onto each result
        #[arg(long, value_name = "FILE")]
        logo: Option<PathBuf>,

        /// Logo corner: bottom-right, bottom-left, top-right, top-left
        #[arg(long)]
        position: Option<LogoPosition>,

        /// Logo width as a percentage of the image width (10-50)
        #[arg(long)]
        size: Option<f64>,

        /// Logo opacity in percent (0-100)
        #[arg(long)]
        opacity: Option<f64>,

        /// Send prompts without the configured brand guidelines
        #[arg(long)]
        no_brand: bool,

        /// Also pack the images into a ZIP archive in the output directory
        #[arg(long)]
        zip: bool,
    },
    /// Run the image generation HTTP proxy
    #[cfg(feature = "api")]
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the effective configuration, optionally saving it
    ShowConfig {
        /// Write the configuration to this file
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config loading logs, so the subscriber goes first
    let rust_log_set = std::env::var_os("RUST_LOG").is_some();
    let log_filter = init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if !rust_log_set && !cli.verbose {
        apply_log_level(&log_filter, &config.output.log_level);
    }

    match cli.command {
        Commands::Generate {
            prompts,
            output_dir,
            logo,
            position,
            size,
            opacity,
            no_brand,
            zip,
        } => {
            let mut config = config;
            if let Some(dir) = output_dir {
                config.output.base_dir = dir;
            }
            if let Some(path) = logo {
                config.logo.url = load_logo(&path).await?;
            }
            if let Some(position) = position {
                config.logo.position = position;
            }
            if let Some(size) = size {
                config.logo = config.logo.with_size(size);
            }
            if let Some(opacity) = opacity {
                config.logo = config.logo.with_opacity(opacity);
            }
            if no_brand {
                config.brand = Default::default();
            }
            if zip {
                config.output.write_zip = true;
            }

            run_generate(config, &prompts).await
        }
        #[cfg(feature = "api")]
        Commands::Serve { port } => {
            let generator = create_generator(&config.generation)?;
            let port = port.unwrap_or(config.api.port);
            brand_batch::api::ApiServer::new(generator, config.api.host.clone(), port)
                .start()
                .await
        }
        Commands::ShowConfig { save } => {
            println!("{}", config.summary());
            if let Some(path) = save {
                config.save(&path)?;
            }
            Ok(())
        }
    }
}

/// Install the global subscriber. Until the config is read the level comes
/// from `RUST_LOG`, `--verbose`, `BRAND_BATCH_LOG_LEVEL` or `info`.
fn init_logging(verbose: bool) -> LogFilterHandle {
    let level = if verbose {
        "debug".to_string()
    } else {
        std::env::var("BRAND_BATCH_LOG_LEVEL").unwrap_or_else(|_| "info".to_string())
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| level_filter(&level));

    let (filter, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
    handle
}

/// Switch to the configured level once the config file has been read
fn apply_log_level(handle: &LogFilterHandle, level: &str) {
    if let Err(e) = handle.reload(level_filter(level)) {
        warn!("Failed to apply log level '{}': {}", level, e);
    }
}

fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("brand_batch={},warn", level))
}

async fn read_prompts(source: &str) -> Result<String> {
    if source == "-" {
        let mut input = String::new();
        tokio::io::stdin()
            .read_to_string(&mut input)
            .await
            .context("Failed to read prompts from stdin")?;
        return Ok(input);
    }

    tokio::fs::read_to_string(source)
        .await
        .with_context(|| format!("Failed to read prompts file {}", source))
}

async fn load_logo(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read logo {}", path.display()))?;
    let logo = EncodedImage::from_bytes(bytes);
    if logo.mime_type == "application/octet-stream" {
        warn!("⚠️ Logo {} is not a recognised image format", path.display());
    }
    Ok(logo.to_data_uri())
}

async fn run_generate(config: Config, prompts_source: &str) -> Result<()> {
    config.validate()?;
    info!("🚀 brand-batch starting...");
    debug!("{}", config.summary());

    let text = read_prompts(prompts_source).await?;
    let prompts = PromptList::parse(&text).map(|prompt| config.brand.apply(prompt));
    if prompts.is_empty() {
        return Err(anyhow!("No prompts found in {}", prompts_source));
    }

    info!("📝 {} prompts loaded", prompts.len());
    info!("📂 Output directory: {}", config.output.base_dir.display());
    if config.logo.is_enabled() {
        info!(
            "🏷️ Logo: {} at {}% width, {}% opacity",
            config.logo.position, config.logo.size, config.logo.opacity
        );
    }

    let generator = create_generator(&config.generation)?;
    let runner = Arc::new(
        BatchRunner::new(generator, config.logo.clone().into_shared())
            .with_compositing(config.compositing.clone()),
    );

    let stopper = Arc::clone(&runner);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⏹️ Interrupt received, finishing the current image before stopping");
            stopper.stop();
        }
    });

    let start_time = std::time::Instant::now();
    let mut handle = runner.start_batch(prompts)?;

    while let Some(event) = handle.next_event().await {
        match event {
            BatchEvent::JobUpdated(job) if job.status == JobStatus::Failed => {
                error!(
                    "❌ {}: {}",
                    job.prompt,
                    job.error.as_deref().unwrap_or("unknown error")
                );
            }
            BatchEvent::Progress(status) => {
                debug!("📊 Progress: {:.0}%", status.progress() * 100.0);
            }
            BatchEvent::Stopped(status) => {
                warn!("🛑 Stopped with {} of {} images pending", status.remaining(), status.total);
            }
            _ => {}
        }
    }

    let report = handle.wait().await?;
    let duration = start_time.elapsed();

    let summary = export_completed(&report, &config.output.base_dir, config.output.write_results_json).await?;
    let archive = if config.output.write_zip {
        let path = config.output.base_dir.join(archive_file_name());
        Some(export_archive(&report, path).await?)
    } else {
        None
    };

    info!("🎉 Batch finished in {:.2}s", duration.as_secs_f64());
    info!("✅ Successful: {}", report.status.completed);
    info!("❌ Failed: {}", report.status.failed);
    for job in report.failed_jobs() {
        info!(
            "   - {}: {}",
            job.prompt,
            job.error.as_deref().unwrap_or("unknown error")
        );
    }
    info!("💾 Images written: {}", summary.images.len());
    if let Some(results) = &summary.results_file {
        info!("📄 Results: {}", results.display());
    }
    if let Some(archive) = &archive {
        info!("🗜️ Archive: {}", archive.archive.display());
    }

    Ok(())
}
