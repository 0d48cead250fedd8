use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;
use crate::portal;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Portal root; page paths are joined onto it.
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Accept TLS 1.0 as the minimum protocol for servers that cannot negotiate
    /// anything newer. Off unless asked for.
    pub legacy_tls: bool,
}

impl Settings {
    /// Defaults, then the optional file, then `ALACARD_*` environment variables.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("base_url", portal::DEFAULT_BASE_URL)?
            .set_default("timeout_secs", 30_i64)?
            .set_default("user_agent", concat!("alacard/", env!("CARGO_PKG_VERSION")))?
            .set_default("legacy_tls", false)?;
        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }
        let settings: Settings = builder
            .add_source(Environment::with_prefix("ALACARD"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn url(&self, page: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), page)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: portal::DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            user_agent: concat!("alacard/", env!("CARGO_PKG_VERSION")).to_string(),
            legacy_tls: false,
        }
    }
}
