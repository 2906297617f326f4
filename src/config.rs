//! Engine Configuration
//!
//! Where correction tables live, the default sigma policy for stored-table
//! knobs, and the log filter. Loaded from YAML or JSON, with environment
//! overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::rwgt::SigmaPolicy;

/// Search path for correction-table files (platform path-list syntax).
pub const ENV_DATA_PATH: &str = "RWGT_DATA_PATH";
/// Log filter directive, e.g. `xsec_rwgt=debug`.
pub const ENV_LOG: &str = "RWGT_LOG";
/// Default sigma policy: `extrapolate`, `clamp` or `reject`.
pub const ENV_SIGMA_POLICY: &str = "RWGT_SIGMA_POLICY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub data_path: Vec<PathBuf>,
    pub sigma_policy: SigmaPolicy,
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_path: Vec::new(),
            sigma_policy: SigmaPolicy::default(),
            log_filter: "xsec_rwgt=info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with the environment.
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Read a `.yaml`/`.yml` or `.json` file; other extensions are tried as
    /// YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;

        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("parsing JSON config {}", path.display()))?,
            _ => serde_yaml::from_str(&content)
                .with_context(|| format!("parsing YAML config {}", path.display()))?,
        };
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            _ => serde_yaml::to_string(self)?,
        };
        std::fs::write(path, content).with_context(|| format!("writing config {}", path.display()))?;
        Ok(())
    }

    /// Environment values take precedence. Entries from `RWGT_DATA_PATH`
    /// are searched before the configured ones.
    pub fn apply_env(mut self) -> Self {
        if let Some(paths) = std::env::var_os(ENV_DATA_PATH) {
            let mut from_env: Vec<PathBuf> = std::env::split_paths(&paths)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            from_env.append(&mut self.data_path);
            self.data_path = from_env;
        }

        if let Ok(filter) = std::env::var(ENV_LOG) {
            if !filter.trim().is_empty() {
                self.log_filter = filter;
            }
        }

        if let Ok(policy) = std::env::var(ENV_SIGMA_POLICY) {
            match serde_yaml::from_str::<SigmaPolicy>(&policy) {
                Ok(p) => self.sigma_policy = p,
                Err(e) => warn!(value = %policy, error = %e, "Ignoring invalid {}", ENV_SIGMA_POLICY),
            }
        }
        self
    }
}
