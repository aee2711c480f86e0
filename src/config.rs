//! Configuration file support.
//!
//! Reads `~/.logscope/config.toml` when present; CLI flags override file
//! values, and everything has a sensible default.

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Base URL of the log backend
    pub api_url: Option<String>,

    /// Bearer token for authenticated platforms
    pub token: Option<String>,

    /// Default page size for the table view
    pub page_size: Option<usize>,
}

impl Config {
    pub fn path() -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        Some(home.join(".logscope").join("config.toml"))
    }

    /// Load the config file, falling back to defaults on any problem
    pub fn load() -> Self {
        Self::path()
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|content| Self::parse(&content))
            .unwrap_or_default()
    }

    pub fn parse(content: &str) -> Option<Self> {
        toml::from_str(content).ok()
    }

    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }
}
