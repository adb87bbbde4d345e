//! # Shell configuration
//!
//! A string key/value store with dotted keys (`paths.login`,
//! `features.premium_disabled`). Applications layer it however they like;
//! [`GrcConfig::load_env`] covers the common case:
//!
//! ```rust
//! use grc_core::GrcConfig;
//!
//! let mut config = GrcConfig::new();
//! config.set("http.port", "8080");
//! assert_eq!(config.snapshot().get_u16("http.port"), Some(8080));
//! ```
//!
//! ```bash
//! export GRC__FEATURES__PREMIUM_DISABLED=true   # features.premium_disabled
//! ```
//!
//! Typed views such as [`ShellSettings`] are read from a snapshot so a
//! running server never observes a half-applied change.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::guard::GuardPaths;

#[derive(Debug, Default)]
pub struct GrcConfig {
    values: HashMap<String, String>,
}

impl GrcConfig {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Import variables named `<prefix>SECTION__KEY` as `section.key`.
    ///
    /// Returns how many keys were set.
    pub fn load_env(&mut self, prefix: &str) -> usize {
        self.load_vars(prefix, std::env::vars())
    }

    pub fn load_vars<I>(&mut self, prefix: &str, vars: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut loaded = 0;
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                if stripped.is_empty() {
                    continue;
                }
                let normalized = stripped.to_lowercase().replace("__", ".");
                self.set(normalized, value);
                loaded += 1;
            }
        }
        loaded
    }

    pub fn snapshot(&self) -> GrcConfigSnapshot {
        GrcConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct GrcConfigSnapshot {
    map: HashMap<String, String>,
}

impl GrcConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_u16(&self, key: &str) -> Option<u16> {
        self.get(key).and_then(|v| v.trim().parse::<u16>().ok())
    }

    /// `true/false`, `1/0`, `yes/no`, `on/off`.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)?.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        }
    }
}

/// Typed shell settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSettings {
    pub premium_disabled: bool,
    pub threat_intel: bool,
    pub paths: GuardPaths,
    /// Where the workspace context is persisted; `None` keeps it in memory.
    pub storage_path: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    pub rpc_base_url: Option<String>,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            premium_disabled: false,
            threat_intel: true,
            paths: GuardPaths::default(),
            storage_path: None,
            host: "127.0.0.1".to_string(),
            port: 3030,
            rpc_base_url: None,
        }
    }
}

impl ShellSettings {
    pub fn from_snapshot(cfg: &GrcConfigSnapshot) -> Self {
        let d = Self::default();
        let path = |key: &str, default: String| {
            cfg.get_string(key)
                .filter(|p| p.starts_with('/'))
                .unwrap_or(default)
        };

        Self {
            premium_disabled: cfg.get_bool("features.premium_disabled").unwrap_or(d.premium_disabled),
            threat_intel: cfg.get_bool("features.threat_intel").unwrap_or(d.threat_intel),
            paths: GuardPaths {
                login: path("paths.login", d.paths.login),
                upgrade: path("paths.upgrade", d.paths.upgrade),
                clients: path("paths.clients", d.paths.clients),
                dashboard: path("paths.dashboard", d.paths.dashboard),
            },
            storage_path: cfg.get_string("storage.path").filter(|p| !p.is_empty()).map(PathBuf::from),
            host: cfg.get_string("http.host").unwrap_or(d.host),
            port: cfg.get_u16("http.port").unwrap_or(d.port),
            rpc_base_url: cfg
                .get_string("rpc.base_url")
                .map(|u| u.trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
