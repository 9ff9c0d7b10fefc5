//! Configuration module
//!
//! Service endpoints and run settings, resolved from defaults, an optional
//! YAML/JSON file and environment variables (in increasing precedence).
//! Command line flags are applied on top by the caller.

mod env;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use env::{print_env_help, EnvConfig};

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8080/graphql";
pub const DEFAULT_USER_URL: &str = "http://localhost:8081";
pub const DEFAULT_PRODUCT_URL: &str = "http://localhost:8082";
pub const DEFAULT_ORDER_URL: &str = "http://localhost:8083";
pub const DEFAULT_PAYMENT_URL: &str = "http://localhost:8084";
pub const DEFAULT_RESULTS_DIR: &str = "benchmarks/results";

/// Base URLs of the services under test
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// GraphQL gateway endpoint (full URL, including path)
    pub gateway: String,
    pub user: String,
    pub product: String,
    pub order: String,
    pub payment: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            gateway: DEFAULT_GATEWAY_URL.to_string(),
            user: DEFAULT_USER_URL.to_string(),
            product: DEFAULT_PRODUCT_URL.to_string(),
            order: DEFAULT_ORDER_URL.to_string(),
            payment: DEFAULT_PAYMENT_URL.to_string(),
        }
    }
}

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub endpoints: Endpoints,

    /// Candidate user ids each iteration picks from
    pub user_ids: Vec<u64>,

    /// Directory holding snapshot files and the rendered report
    pub results_dir: PathBuf,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,

    /// Multiplier applied to every phase offset, duration and pause
    pub time_scale: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            user_ids: vec![1, 2, 3],
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            timeout_secs: 30,
            time_scale: 1.0,
        }
    }
}

impl AppConfig {
    /// Defaults, then the config file (explicit path or `BENCH_CONFIG`), then
    /// environment overrides
    pub fn resolve(path: Option<&Path>, env: &EnvConfig) -> Result<Self> {
        let file = path
            .map(Path::to_path_buf)
            .or_else(|| env.config_file.as_ref().map(PathBuf::from));

        let config = match file {
            Some(p) => Self::load(&p)?,
            None => Self::default(),
        };

        Ok(config.with_env(env))
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Self = if is_yaml(path) {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON config")?
        };

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Apply environment overrides
    pub fn with_env(mut self, env: &EnvConfig) -> Self {
        let overrides = [
            (&env.gateway_url, &mut self.endpoints.gateway),
            (&env.user_url, &mut self.endpoints.user),
            (&env.product_url, &mut self.endpoints.product),
            (&env.order_url, &mut self.endpoints.order),
            (&env.payment_url, &mut self.endpoints.payment),
        ];
        for (value, target) in overrides {
            if let Some(v) = value {
                *target = v.clone();
            }
        }

        if let Some(dir) = &env.results_dir {
            self.results_dir = PathBuf::from(dir);
        }
        if let Some(timeout) = env.timeout {
            self.timeout_secs = timeout;
        }
        self
    }

    /// Reject settings no run can work with
    pub fn validate(&self) -> Result<()> {
        if self.user_ids.is_empty() {
            bail!("user_ids must contain at least one id");
        }
        if !(self.time_scale.is_finite() && self.time_scale > 0.0) {
            bail!("time_scale must be a positive number, got {}", self.time_scale);
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be greater than zero");
        }
        Ok(())
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}
