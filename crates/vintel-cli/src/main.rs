mod aggregate;
mod context;
mod input;
mod inspect;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "vintel")]
#[command(about = "Estimate a video audience's geography from comment signals")]
struct Cli {
    /// Aggregation tuning YAML (overrides VINTEL_CONFIG_PATH)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Gazetteer YAML (overrides VINTEL_LOCATIONS_PATH)
    #[arg(long, global = true)]
    locations: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Aggregate a signal file into ranked city and country estimates
    Aggregate {
        /// JSON file: an array of signals or an object with a `signals` array
        #[arg(long)]
        input: PathBuf,

        /// Cache key for the report (defaults to the file's `video_id` or stem)
        #[arg(long)]
        video_id: Option<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Skip the estimate cache even when VINTEL_CACHE_DIR is set
        #[arg(long)]
        no_cache: bool,
    },
    /// Check a signal file and list rejected records
    Validate {
        #[arg(long)]
        input: PathBuf,
    },
    /// Show how location strings resolve against the gazetteer
    Resolve {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Show the detected-language distribution of a signal file
    Languages {
        #[arg(long)]
        input: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
    Markdown,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let mut settings = vintel_core::load_app_settings();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(settings.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Some(path) = cli.config {
        settings.config_path = path;
    }
    if let Some(path) = cli.locations {
        settings.locations_path = path;
    }

    let Some(command) = cli.command else {
        println!("vintel: no command given; try `vintel --help`");
        return Ok(());
    };

    let load_context = || context::EngineContext::load(&settings);
    match command {
        Commands::Aggregate {
            input,
            video_id,
            format,
            no_cache,
        } => {
            let cache_dir = if no_cache {
                None
            } else {
                settings.cache_dir.as_deref()
            };
            aggregate::run_aggregate(
                &load_context()?,
                &input,
                video_id.as_deref(),
                format,
                cache_dir,
            )?;
        }
        Commands::Validate { input } => inspect::run_validate(&input)?,
        Commands::Resolve { text } => inspect::run_resolve(&load_context()?, &text),
        Commands::Languages { input } => inspect::run_languages(&load_context()?, &input)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests;
