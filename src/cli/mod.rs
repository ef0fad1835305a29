pub mod config;
pub mod dashboard;
pub mod report;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::error::Result;
use crate::models::{ManagerSelection, ModelParameters};
use crate::settings::Settings;

#[derive(Parser)]
#[command(
    name = "salesdash",
    version,
    about = "Sales analytics dashboard for promo, cost and call reports."
)]
pub struct Cli {
    /// Log filter (error, warn, info, debug, trace or an EnvFilter directive)
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Scenario parameters shared by the dashboard and the reports. Unset
/// values come from the saved settings.
#[derive(Args, Debug, Clone, Default)]
pub struct ModelArgs {
    /// Average price per kilogram, 20000-60000
    #[arg(long)]
    pub price: Option<f64>,
    /// Traffic multiplier, 0.5-3.0
    #[arg(long)]
    pub traffic: Option<f64>,
    /// Conversion boost in percentage points, -5-10
    #[arg(long, allow_hyphen_values = true)]
    pub conv: Option<f64>,
    /// Restrict to a manager (repeatable; default: all)
    #[arg(long = "manager")]
    pub managers: Vec<String>,
}

impl ModelArgs {
    pub fn parameters(&self, settings: &Settings) -> Result<ModelParameters> {
        let saved = settings.model_parameters();
        ModelParameters::new(
            self.price.unwrap_or(saved.avg_price),
            self.traffic.unwrap_or(saved.traffic_mult),
            self.conv.unwrap_or(saved.conv_boost),
            ManagerSelection::from_names(self.managers.iter().cloned()),
        )
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the interactive dashboard (the default).
    Dashboard {
        /// Report file to open (.xlsx or .csv)
        file: Option<PathBuf>,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Print report tables to stdout.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// View or change saved defaults.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate a shell completion script.
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Headline KPIs and the model behind them.
    Kpi {
        file: PathBuf,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Monthly modeled revenue against expenses.
    Trend {
        file: PathBuf,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Write-off quantity by package weight.
    Weights {
        file: PathBuf,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Expenses by manager and category.
    Managers {
        file: PathBuf,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// How every sheet of the file was classified and read.
    Sheets { file: PathBuf },
    /// Every report above, one after another.
    All {
        file: PathBuf,
        #[command(flatten)]
        model: ModelArgs,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the saved settings.
    Show,
    /// Change one or more saved settings.
    Set {
        /// Default average price per kilogram
        #[arg(long)]
        price: Option<f64>,
        /// Default traffic multiplier
        #[arg(long)]
        traffic: Option<f64>,
        /// Default conversion boost
        #[arg(long, allow_hyphen_values = true)]
        conv: Option<f64>,
        /// Default log filter
        #[arg(long = "log-filter")]
        log_filter: Option<String>,
    },
    /// Restore the built-in defaults.
    Reset,
}
