use comfy_table::{Cell, Table};

use crate::cli::ConfigCommands;
use crate::error::Result;
use crate::fmt::money;
use crate::settings::{load_settings, save_settings, settings_file_exists, settings_path, Settings};

pub fn dispatch(cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(),
        ConfigCommands::Set {
            price,
            traffic,
            conv,
            log_filter,
        } => set(price, traffic, conv, log_filter),
        ConfigCommands::Reset => reset(),
    }
}

fn show() -> Result<()> {
    let settings = load_settings();
    let source = if settings_file_exists() {
        settings_path().display().to_string()
    } else {
        "built-in defaults".to_string()
    };
    println!("{}", format_settings(&settings, &source));
    Ok(())
}

fn set(
    price: Option<f64>,
    traffic: Option<f64>,
    conv: Option<f64>,
    log_filter: Option<String>,
) -> Result<()> {
    let mut settings = load_settings();
    if let Some(v) = price {
        settings.avg_price = v;
    }
    if let Some(v) = traffic {
        settings.traffic_mult = v;
    }
    if let Some(v) = conv {
        settings.conv_boost = v;
    }
    if let Some(v) = log_filter {
        settings.log_level = v;
    }
    save_settings(&settings)?;
    tracing::info!(path = %settings_path().display(), "settings saved");
    println!("Saved {}", settings_path().display());
    Ok(())
}

fn reset() -> Result<()> {
    save_settings(&Settings::default())?;
    println!("Settings restored to defaults.");
    Ok(())
}

pub fn format_settings(settings: &Settings, source: &str) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Setting", "Value"]);
    table.add_row(vec![Cell::new("Average price / kg"), Cell::new(money(settings.avg_price))]);
    table.add_row(vec![
        Cell::new("Traffic multiplier"),
        Cell::new(format!("x{:.1}", settings.traffic_mult)),
    ]);
    table.add_row(vec![
        Cell::new("Conversion boost"),
        Cell::new(format!("{:+.1} pp", settings.conv_boost)),
    ]);
    table.add_row(vec![Cell::new("Log level"), Cell::new(&settings.log_level)]);
    format!("Settings ({source})\n{table}")
}
