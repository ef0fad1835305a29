mod classifier;
mod cli;
mod coerce;
mod error;
mod fmt;
mod ingest;
mod logging;
mod modeler;
mod models;
mod normalizer;
mod session;
mod settings;
mod tui;
mod views;
mod workbook;

use clap::{CommandFactory, Parser};

use cli::{Cli, Commands, ModelArgs};
use settings::load_settings;

fn main() {
    let cli = Cli::parse();
    let settings = load_settings();

    let env_level = std::env::var(logging::LOG_ENV).ok();
    let level = logging::resolve_level(
        cli.log_level.as_deref(),
        env_level.as_deref(),
        &settings.log_level,
    );
    if let Err(e) = logging::init(&level) {
        eprintln!("Warning: logging disabled: {e}");
    }

    let result = match cli.command {
        None => ModelArgs::default()
            .parameters(&settings)
            .and_then(|params| cli::dashboard::run(None, params)),
        Some(Commands::Dashboard { file, model }) => model
            .parameters(&settings)
            .and_then(|params| cli::dashboard::run(file, params)),
        Some(Commands::Report { command }) => cli::report::dispatch(command, &settings),
        Some(Commands::Config { command }) => cli::config::dispatch(command),
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "salesdash", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
