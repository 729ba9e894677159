//! Layered settings: built-in defaults, an optional file, then `NEUROSCAN__*` env vars.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Env var naming an optional settings file (format picked from its extension).
pub const CONFIG_FILE_ENV: &str = "NEUROSCAN_CONFIG_FILE";
const ENV_PREFIX: &str = "NEUROSCAN";

/// Google Drive direct-download endpoint; `confirm=t` skips the large-file interstitial.
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://drive.usercontent.google.com/download?id={id}&export=download&confirm=t";
pub const DEFAULT_ARTIFACT_ID: &str = "1aEc1Ni1mds5anu28giaiXkcM9_OOxV2y";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub model: ModelSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub bind: SocketAddr,
    pub body_limit_bytes: usize,
    /// `"*"` anywhere in the list means any origin.
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelSettings {
    pub path: PathBuf,
    pub artifact_id: String,
    pub url_template: String,
    #[serde(default)]
    pub sha256: Option<String>,
    pub warmup: bool,
}

impl ModelSettings {
    /// Empty pins are treated as unset so `NEUROSCAN__MODEL__SHA256=` disables verification.
    pub fn sha256_pin(&self) -> Option<&str> {
        self.sha256.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

impl ServerSettings {
    pub fn allows_any_origin(&self) -> bool { self.cors_allowed_origins.iter().any(|o| o.trim() == "*") }
}

fn builder_with_defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
    Ok(config::Config::builder()
        .set_default("server.bind", "0.0.0.0:8000")?
        .set_default("server.body_limit_bytes", 20_i64 * 1024 * 1024)?
        .set_default("server.cors_allowed_origins", vec!["*"])?
        .set_default("model.path", "best_model.onnx")?
        .set_default("model.artifact_id", DEFAULT_ARTIFACT_ID)?
        .set_default("model.url_template", DEFAULT_URL_TEMPLATE)?
        .set_default("model.warmup", true)?)
}

fn environment(vars: Option<HashMap<String, String>>) -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("server.cors_allowed_origins")
        .try_parsing(true)
        .source(vars)
}

fn build(file: Option<&Path>, vars: Option<HashMap<String, String>>) -> Result<Settings> {
    let mut builder = builder_with_defaults()?;
    if let Some(file) = file {
        builder = builder.add_source(config::File::from(file).required(false));
    }
    builder = builder.add_source(environment(vars));
    let cfg = builder.build().context("failed to assemble configuration")?;
    cfg.try_deserialize::<Settings>().context("invalid configuration")
}

/// Load settings for `service` from the process environment.
pub fn load_config(service: &str) -> Result<Settings> {
    let file = std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from);
    let settings = build(file.as_deref(), None)?;
    tracing::debug!(service, file = ?file, "configuration assembled");
    Ok(settings)
}
