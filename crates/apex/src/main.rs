use std::path::PathBuf;

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use miette::{miette, Result};
use tracing::warn;
use tracing_log::AsTrace;

mod commands;
mod dispatch;
mod logging;
mod settings;

use settings::Settings;

#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<commands::Commands>,

    /// Archives, manifests and textures to handle based on their contents
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Settings file, the executable path with a `.toml` extension by default
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

fn main() -> Result<()> {
    better_panic::install();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => path.clone(),
        None => Settings::default_path()?,
    };
    let settings = Settings::load(&config)?;

    let log_file = settings.generate_log.then(|| config.with_extension("log"));
    logging::init(cli.verbose.log_level_filter().as_trace(), log_file.as_deref())?;

    if let Err(err) = settings.save(&config) {
        warn!("settings were not saved: {err:?}");
    }

    match &cli.command {
        Some(command) => command.handle(&settings),
        None if !cli.files.is_empty() => commands::open::handle(&cli.files, &settings),
        None => Err(miette!("expected at least one file")),
    }
}
