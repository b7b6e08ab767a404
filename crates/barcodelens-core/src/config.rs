// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service configuration.
//
// Settings come from an optional JSON file, then environment overrides.
// Missing keys in the file fall back to the defaults below.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BarcodelensError, Result};

/// Environment variable naming the JSON config file.
pub const CONFIG_PATH_VAR: &str = "BARCODELENS_CONFIG";

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "barcodelens.json";

/// Runtime settings for the scanning service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Address the HTTP front end binds to.
    pub bind_address: String,
    /// Port the HTTP front end listens on.
    pub port: u16,
    /// Base URL of the product database (no trailing slash needed).
    pub product_api_base: String,
    /// Origins allowed to call the service from a browser.
    pub allowed_origins: Vec<String>,
    /// Largest request body accepted, in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            port: 8000,
            product_api_base: "https://world.openfoodfacts.org".into(),
            allowed_origins: vec!["http://127.0.0.1:5500".into(), "localhost".into()],
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

impl ServiceConfig {
    /// Load settings from `path`. A missing file yields the defaults; an
    /// unreadable or malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config file from the environment, load it, and apply
    /// environment overrides.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        let mut config = Self::load(&path)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply `BARCODELENS_*` overrides fetched through `var`.
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(bind) = var("BARCODELENS_BIND") {
            self.bind_address = bind;
        }
        if let Some(port) = var("BARCODELENS_PORT") {
            self.port = port.trim().parse().map_err(|e| {
                BarcodelensError::Config(format!("BARCODELENS_PORT '{port}': {e}"))
            })?;
        }
        if let Some(base) = var("BARCODELENS_PRODUCT_API") {
            self.product_api_base = base;
        }
        if let Some(origins) = var("BARCODELENS_ALLOWED_ORIGINS") {
            self.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        self.validate()
    }

    /// The `host:port` string to bind.
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Whether a browser `Origin` header value is on the allow-list.
    pub fn origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }

    fn validate(&self) -> Result<()> {
        if self.product_api_base.trim().is_empty() {
            return Err(BarcodelensError::Config("product_api_base is empty".into()));
        }
        if self.max_upload_bytes == 0 {
            return Err(BarcodelensError::Config("max_upload_bytes must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServiceConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.socket_address(), "0.0.0.0:8000");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("barcodelens.json");
        std::fs::write(&path, r#"{"port": 9090, "allowed_origins": ["https://shop.example"]}"#)
            .unwrap();

        let config = ServiceConfig::load(&path).unwrap();
        assert_eq!(config.port, 9090);
        assert!(config.origin_allowed("https://shop.example"));
        assert!(!config.origin_allowed("localhost"));
        assert_eq!(config.product_api_base, "https://world.openfoodfacts.org");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("barcodelens.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            ServiceConfig::load(&path),
            Err(BarcodelensError::Serialization(_))
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = [
            ("BARCODELENS_PORT", "8123"),
            ("BARCODELENS_PRODUCT_API", "http://127.0.0.1:9999"),
            ("BARCODELENS_ALLOWED_ORIGINS", "http://a.test, ,http://b.test"),
        ]
        .into_iter()
        .collect();

        let mut config = ServiceConfig::default();
        config
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.port, 8123);
        assert_eq!(config.product_api_base, "http://127.0.0.1:9999");
        assert_eq!(config.allowed_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn bad_port_override_is_rejected() {
        let mut config = ServiceConfig::default();
        let result = config.apply_overrides(|name| {
            (name == "BARCODELENS_PORT").then(|| "eighty".to_string())
        });
        assert!(matches!(result, Err(BarcodelensError::Config(_))));
    }
}
