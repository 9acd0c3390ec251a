//! wispgc - TTL-based compaction for ephemeral work-tracking records

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use wispgc::config::Config;
use wispgc_cli::commands::{CompactCommand, ConfigCommand, PolicyCommand, ReportCommand};
use wispgc_cli::error::CliResult;
use wispgc_cli::output::OutputFormat;

#[derive(Parser)]
#[command(name = "wispgc")]
#[command(about = "TTL-based lifecycle compaction for ephemeral work-tracking records")]
#[command(version)]
pub struct Cli {
    #[clap(long, short, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[clap(long, short = 'c', global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[clap(long, short = 'v', global = true, help = "Show each record decision")]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Run TTL-based compaction over ephemeral records")]
    Compact(CompactCommand),

    #[clap(about = "Generate and send the compaction digest")]
    Report(ReportCommand),

    #[clap(about = "Show the effective TTL policy")]
    Policy(PolicyCommand),

    #[clap(about = "Show the resolved configuration")]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Table
    };

    let config = Config::load(cli.config.as_deref())?;

    match &cli.command {
        Command::Compact(cmd) => cmd.execute(&config, format).await,
        Command::Report(cmd) => cmd.execute(&config, format).await,
        Command::Policy(cmd) => cmd.execute(&config, format).await,
        Command::Config(cmd) => cmd.execute(&config, format),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info,wispgc=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Logs go to stderr so JSON output stays parseable.
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
