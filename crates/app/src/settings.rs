//! Handles settings for the application. Configuration is written in
//! `settings.toml`, e.g.:
//!
//! ```toml
//! [app]
//! level = "info"
//!
//! database = { sqlite = "./umusanzu.db" }
//!
//! [sheets]
//! client_id = "..."
//! client_secret = "..."
//! access_token = "..."
//! refresh_token = "..."
//! ```

use config::{Config, ConfigError, File};
use serde::Deserialize;

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

/// Spreadsheet export credentials; the whole section is optional.
#[derive(Debug, Deserialize)]
pub struct Sheets {
    pub client_id: String,
    pub client_secret: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub spreadsheet_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub database: Database,
    pub sheets: Option<Sheets>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings"))
            .build()?;

        settings.try_deserialize()
    }
}
