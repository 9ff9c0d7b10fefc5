//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

pub const GATEWAY_URL: &str = "GATEWAY_URL";
pub const USER_URL: &str = "USER_URL";
pub const PRODUCT_URL: &str = "PRODUCT_URL";
pub const ORDER_URL: &str = "ORDER_URL";
pub const PAYMENT_URL: &str = "PAYMENT_URL";
pub const RESULTS_DIR: &str = "BENCH_RESULTS_DIR";
pub const TIMEOUT: &str = "BENCH_TIMEOUT";
pub const CONFIG: &str = "BENCH_CONFIG";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvConfig {
    pub gateway_url: Option<String>,
    pub user_url: Option<String>,
    pub product_url: Option<String>,
    pub order_url: Option<String>,
    pub payment_url: Option<String>,
    pub results_dir: Option<String>,
    /// Timeout in seconds from BENCH_TIMEOUT
    pub timeout: Option<u64>,
    /// Config file from BENCH_CONFIG
    pub config_file: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            gateway_url: get_env(GATEWAY_URL),
            user_url: get_env(USER_URL),
            product_url: get_env(PRODUCT_URL),
            order_url: get_env(ORDER_URL),
            payment_url: get_env(PAYMENT_URL),
            results_dir: get_env(RESULTS_DIR),
            timeout: get_env_parse(TIMEOUT),
            config_file: get_env(CONFIG),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        *self != Self::default()
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {GATEWAY_URL}:        {:?}", self.gateway_url);
        println!("  {USER_URL}:           {:?}", self.user_url);
        println!("  {PRODUCT_URL}:        {:?}", self.product_url);
        println!("  {ORDER_URL}:          {:?}", self.order_url);
        println!("  {PAYMENT_URL}:        {:?}", self.payment_url);
        println!("  {RESULTS_DIR}:  {:?}", self.results_dir);
        println!("  {TIMEOUT}:      {:?}", self.timeout);
        println!("  {CONFIG}:       {:?}", self.config_file);
    }
}

/// Non-empty environment variable
fn get_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.trim().parse().ok())
}

/// Builder for setting environment variables in tests
#[cfg(test)]
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

#[cfg(test)]
impl EnvBuilder {
    /// Create a new environment builder
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    fn set(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.push((key.to_string(), value.into()));
        self
    }

    pub fn gateway_url(self, url: impl Into<String>) -> Self {
        self.set(GATEWAY_URL, url)
    }

    pub fn user_url(self, url: impl Into<String>) -> Self {
        self.set(USER_URL, url)
    }

    pub fn results_dir(self, dir: impl Into<String>) -> Self {
        self.set(RESULTS_DIR, dir)
    }

    pub fn timeout(self, timeout: u64) -> Self {
        self.set(TIMEOUT, timeout.to_string())
    }

    /// Apply environment variables
    pub fn apply(self) {
        for (key, value) in self.vars {
            env::set_var(key, value);
        }
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        self.apply();

        EnvGuard { previous }
    }
}

#[cfg(test)]
impl Default for EnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that restores environment variables on drop
#[cfg(test)]
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

#[cfg(test)]
impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

/// Print all recognised environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {GATEWAY_URL}        GraphQL gateway endpoint (default: {})", super::DEFAULT_GATEWAY_URL);
    println!("  {USER_URL}           User service base URL (default: {})", super::DEFAULT_USER_URL);
    println!("  {PRODUCT_URL}        Product service base URL (default: {})", super::DEFAULT_PRODUCT_URL);
    println!("  {ORDER_URL}          Order service base URL (default: {})", super::DEFAULT_ORDER_URL);
    println!("  {PAYMENT_URL}        Payment service base URL (default: {})", super::DEFAULT_PAYMENT_URL);
    println!("  {RESULTS_DIR}  Snapshot and report directory (default: {})", super::DEFAULT_RESULTS_DIR);
    println!("  {TIMEOUT}      Request timeout in seconds");
    println!("  {CONFIG}       Path to a YAML or JSON configuration file");
    println!();
    println!("Example:");
    println!("  export {GATEWAY_URL}=http://10.0.0.100:8080/graphql");
    println!("  gateway-bench run graphql-aggregated");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::default();
        assert!(config.gateway_url.is_none());
        assert!(!config.has_any());
    }

    #[test]
    fn test_env_builder() {
        let _guard = EnvBuilder::new()
            .gateway_url("http://10.0.0.1:8080/graphql")
            .user_url("http://10.0.0.1:8081")
            .results_dir("/tmp/bench")
            .timeout(60)
            .apply_scoped();

        let config = EnvConfig::load();
        assert_eq!(
            config.gateway_url.as_deref(),
            Some("http://10.0.0.1:8080/graphql")
        );
        assert_eq!(config.user_url.as_deref(), Some("http://10.0.0.1:8081"));
        assert_eq!(config.results_dir.as_deref(), Some("/tmp/bench"));
        assert_eq!(config.timeout, Some(60));
        assert!(config.has_any());
    }
}
