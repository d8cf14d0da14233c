// Gulpwatch command line interface
// Replays recorded perception sessions through the detector and manages configuration

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use gulpwatch_core::GulpwatchConfig;
use gulpwatch_eye::{event_channel, DetectionWorker, ReplayAdapter};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gulpwatch")]
#[command(about = "Drinking detection from hand, face and vessel observations", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level used when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the detector over a recorded JSON Lines session
    Replay {
        /// Recorded frames, one JSON object per line
        #[arg(long, short)]
        frames: PathBuf,

        /// Configuration file (JSON, TOML or YAML)
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Override the tick interval
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Also print the per-tick report for every frame
        #[arg(long)]
        reports: bool,
    },

    /// Print the default configuration
    Config {
        #[arg(long, value_enum, default_value = "toml")]
        format: ConfigFormat,
    },

    /// Load and validate a configuration file
    Validate {
        #[arg(long, short)]
        config: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

#[derive(Debug, Serialize)]
struct ReplaySummary {
    frames: u64,
    gulps: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.json);

    match cli.command {
        Commands::Replay {
            frames,
            config,
            interval_ms,
            reports,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(interval_ms) = interval_ms {
                config.pipeline.detection_interval_ms = interval_ms;
            }
            replay(config, &frames, reports, &mut std::io::stdout().lock()).await?;
        }
        Commands::Config { format } => {
            println!("{}", render_config(&GulpwatchConfig::default(), format)?);
        }
        Commands::Validate { config } => {
            load_config(Some(&config))?;
            println!("{}: ok", config.display());
        }
    }

    Ok(())
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gulpwatch_eye={level},gulpwatch={level}")));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Defaults, then the file if one is given, then `GULPWATCH_*` variables
fn load_config(path: Option<&Path>) -> anyhow::Result<GulpwatchConfig> {
    let mut config = match path {
        Some(path) => GulpwatchConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => GulpwatchConfig::default(),
    };
    config.apply_env();
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn render_config(config: &GulpwatchConfig, format: ConfigFormat) -> anyhow::Result<String> {
    let text = match format {
        ConfigFormat::Toml => config.to_toml_string()?,
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(text)
}

/// Tick reports can arrive every tick, so give them a deeper buffer
const REPORT_BUFFER_SIZE: usize = 4096;

async fn replay(
    config: GulpwatchConfig,
    frames: &Path,
    reports: bool,
    out: &mut impl Write,
) -> anyhow::Result<ReplaySummary> {
    if !frames.exists() {
        bail!("Recording not found: {}", frames.display());
    }

    let buffer_size = if reports {
        config.pipeline.event_buffer_size.max(REPORT_BUFFER_SIZE)
    } else {
        config.pipeline.event_buffer_size
    };
    let (sink, mut events) = event_channel(buffer_size);
    let sink = if reports { sink.with_reports() } else { sink };
    let worker = DetectionWorker::new(config)?;

    info!("Replaying {}", frames.display());
    worker
        .start(ReplayAdapter::from_path(frames), Arc::new(sink))
        .await?;

    // The channel closes once the worker task drops its sink
    while let Some(event) = events.recv().await {
        writeln!(out, "{}", serde_json::to_string(&event)?)?;
    }

    let summary = worker.wait().await?;
    if summary.ticks == 0 {
        warn!("Recording {} contained no frames", frames.display());
    }

    let summary = ReplaySummary {
        frames: summary.ticks,
        gulps: summary.gulps,
    };
    writeln!(out, "{}", serde_json::to_string(&summary)?)?;
    info!(frames = summary.frames, gulps = summary.gulps, "Replay finished");
    Ok(summary)
}
