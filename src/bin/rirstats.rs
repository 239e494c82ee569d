use clap::{Parser, Subcommand};
use rirstats::lens::utils::OutputFormat;
use rirstats::RirstatsConfig;
use tracing::Level;

mod commands;

use commands::datasets::DatasetsArgs;
use commands::ingest::IngestCommandArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.rirstats/rirstats.toml is used
    #[clap(short, long, global = true)]
    config: Option<String>,

    /// Print all diagnostics, including per-line trace output
    #[clap(long, global = true)]
    debug: bool,

    /// Raise verbosity above the configured level, once per -v (warnings, progress, debug, trace)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format: table, markdown, json, json-pretty
    #[clap(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import delegated statistics files from registries, local files or URLs
    Ingest(IngestCommandArgs),

    /// List the registries and where their latest files are published
    Registries,

    /// List imported datasets with declared and stored record counts
    Datasets(DatasetsArgs),

    /// Show the resolved configuration and database status
    Config,
}

fn main() {
    let cli = Cli::parse();

    let mut config = match RirstatsConfig::new(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {e}");
            std::process::exit(1);
        }
    };
    config.raise_verbosity(cli.verbose);

    let level = if cli.debug {
        Level::TRACE
    } else {
        config.log_level()
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Ingest(args) => commands::ingest::run(&config, args, cli.format),
        Commands::Registries => commands::registries::run(&config, cli.format),
        Commands::Datasets(args) => commands::datasets::run(&config, args, cli.format),
        Commands::Config => commands::config::run(&config, &cli.config, cli.format),
    };

    if let Err(e) = result {
        eprintln!("ERROR: {e:#}");
        std::process::exit(1);
    }
}
