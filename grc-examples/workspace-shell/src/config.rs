use anyhow::{anyhow, Result};
use grc_auth::AuthOptions;
use grc_core::{GrcConfig, ShellSettings};

/// Variables are read as `GRC__<SECTION>__<KEY>`, e.g.
/// `GRC__AUTH__JWT__SECRET` or `GRC__HTTP__PORT`.
pub const ENV_PREFIX: &str = "GRC__";

pub fn from_env() -> GrcConfig {
    let mut cfg = defaults();
    let loaded = cfg.load_env(ENV_PREFIX);
    tracing::debug!(loaded, "configuration read from environment");
    cfg
}

pub fn defaults() -> GrcConfig {
    let mut cfg = GrcConfig::new();
    cfg.set("http.host", "127.0.0.1");
    cfg.set("http.port", "3030");
    cfg
}

pub fn settings(cfg: &GrcConfig) -> ShellSettings {
    ShellSettings::from_snapshot(&cfg.snapshot())
}

pub fn auth(cfg: &GrcConfig) -> Result<AuthOptions> {
    let options = AuthOptions::from_snapshot(&cfg.snapshot());
    options
        .validate()
        .map_err(|e| anyhow!("invalid auth configuration: {e}"))?;
    Ok(options)
}
