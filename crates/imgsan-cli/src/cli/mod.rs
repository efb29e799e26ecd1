//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use imgsan_core::config;
use imgsan_core::images::ImageProcessor;
use imgsan_core::images::backend::{BackendKind, RuntimeEnv};
use imgsan_core::sanitize::SanitizeOptions;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

mod commands;

#[derive(Parser)]
#[command(name = "imgsan")]
#[command(version)]
#[command(about = "Normalize image payloads in agent tool results")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config.toml (default: $IMGSAN_HOME/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Force an image backend (native, external-tool)
    #[arg(long, global = true, value_name = "KIND")]
    backend: Option<BackendKind>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sanitize the images in a tool-result JSON document
    Sanitize {
        /// Input file ("-" for stdin)
        #[arg(default_value = "-")]
        input: String,

        /// Name of the tool that produced the result
        #[arg(long, default_value = "tool")]
        tool: String,

        /// File path the read tool was called with
        #[arg(long)]
        path: Option<String>,

        /// Override the maximum image side in pixels
        #[arg(long, value_name = "PX")]
        max_dimension: Option<u32>,
    },
    /// Print the MIME type detected from a file's bytes
    Sniff {
        file: PathBuf,
    },
    /// Print an image's pixel dimensions
    Probe {
        file: PathBuf,
    },
    /// Downscale an image to fit a square bounding box
    Resize {
        file: PathBuf,

        /// Output file
        #[arg(short, long)]
        out: PathBuf,

        /// Bounding box side in pixels (default: configured maximum)
        #[arg(long, value_name = "PX")]
        max_side: Option<u32>,

        /// Encoder quality, 1-100 (default: configured quality)
        #[arg(long)]
        quality: Option<u8>,
    },
    /// Print the image backend this process would use
    Backend,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Print the config file path
    Path,
    /// Print the default configuration as TOML
    Generate,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<config::Config> {
    match path {
        Some(path) => {
            let mut config = config::Config::load_from(path)?;
            config.apply_env_overrides(|key| std::env::var(key).ok())?;
            Ok(config)
        }
        None => config::Config::load(),
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli {
        command,
        config: config_path,
        backend,
        verbose: _,
    } = cli;

    if let Commands::Config { command } = command {
        return match command {
            ConfigCommands::Path => commands::config::path(config_path.as_deref()),
            ConfigCommands::Generate => commands::config::generate(),
        };
    }

    let mut config = load_config(config_path.as_ref()).context("load config")?;
    if backend.is_some() {
        config.images.backend = backend;
    }

    let processor = ImageProcessor::from_config(&config.images, &RuntimeEnv::detect());
    let opts = SanitizeOptions::from_config(&config.images);

    match command {
        Commands::Sanitize {
            input,
            tool,
            path,
            max_dimension,
        } => {
            let opts = match max_dimension {
                Some(px) => opts.with_max_dimension(px),
                None => opts,
            };
            commands::sanitize::run(&processor, &opts, &input, &tool, path.as_deref()).await
        }
        Commands::Sniff { file } => commands::inspect::sniff(&file),
        Commands::Probe { file } => commands::inspect::probe(&processor, &file).await,
        Commands::Resize {
            file,
            out,
            max_side,
            quality,
        } => {
            let max_side = max_side.unwrap_or(opts.max_dimension_px);
            let quality = quality.unwrap_or(config.images.jpeg_quality);
            commands::resize::run(&processor, &file, &out, max_side, quality).await
        }
        Commands::Backend => {
            println!("{}", processor.backend_kind());
            Ok(())
        }
        // Handled before the config is loaded.
        Commands::Config { .. } => Ok(()),
    }
}
