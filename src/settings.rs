use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{DashError, Result};
use crate::models::{ManagerSelection, ModelParameters, CONVERSION, PRICE, TRAFFIC};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_price")]
    pub avg_price: f64,
    #[serde(default = "default_traffic")]
    pub traffic_mult: f64,
    #[serde(default = "default_conversion")]
    pub conv_boost: f64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_price() -> f64 {
    PRICE.default
}

fn default_traffic() -> f64 {
    TRAFFIC.default
}

fn default_conversion() -> f64 {
    CONVERSION.default
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            avg_price: default_price(),
            traffic_mult: default_traffic(),
            conv_boost: default_conversion(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Model parameters seeded from the saved defaults, every manager selected.
    /// Out-of-range values saved by hand fall back to the built-in defaults.
    pub fn model_parameters(&self) -> ModelParameters {
        ModelParameters::new(
            self.avg_price,
            self.traffic_mult,
            self.conv_boost,
            ManagerSelection::All,
        )
        .unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        PRICE.validate(self.avg_price)?;
        TRAFFIC.validate(self.traffic_mult)?;
        CONVERSION.validate(self.conv_boost)?;
        if tracing_subscriber::EnvFilter::try_new(&self.log_level).is_err() {
            return Err(DashError::Settings(format!(
                "unrecognized log level: {}",
                self.log_level
            )));
        }
        Ok(())
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("salesdash")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    settings.validate()?;
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| DashError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn settings_file_exists() -> bool {
    settings_path().exists()
}
