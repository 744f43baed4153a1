//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use solana_sdk::commitment_config::CommitmentConfig;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub treasury: TreasuryConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub commitment: Commitment,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rpc_endpoint(),
            timeout_ms: default_timeout_ms(),
            commitment: Commitment::default(),
        }
    }
}

/// Commitment level a submitted transaction must reach before it counts as confirmed
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn to_commitment_config(self) -> CommitmentConfig {
        match self {
            Commitment::Processed => CommitmentConfig::processed(),
            Commitment::Confirmed => CommitmentConfig::confirmed(),
            Commitment::Finalized => CommitmentConfig::finalized(),
        }
    }
}

/// Treasury credential material
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TreasuryConfig {
    /// Base58 secret key, or a JSON byte array as written by `solana-keygen`
    #[serde(default)]
    pub private_key: Option<String>,
}

/// Settings for the demo driver
#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    #[serde(default = "default_funding_amount_sol")]
    pub funding_amount_sol: f64,
    #[serde(default = "default_min_treasury_balance_sol")]
    pub min_treasury_balance_sol: f64,
    /// Pause after each transfer before sampling balances
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Simulated worker activity between funding and closure
    #[serde(default = "default_activity_duration_ms")]
    pub activity_duration_ms: u64,
    /// Starting treasury balance for `--dry-run`
    #[serde(default = "default_dry_run_treasury_sol")]
    pub dry_run_treasury_sol: f64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            funding_amount_sol: default_funding_amount_sol(),
            min_treasury_balance_sol: default_min_treasury_balance_sol(),
            settle_delay_ms: default_settle_delay_ms(),
            activity_duration_ms: default_activity_duration_ms(),
            dry_run_treasury_sol: default_dry_run_treasury_sol(),
        }
    }
}

fn default_rpc_endpoint() -> String {
    "https://api.devnet.solana.com".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_funding_amount_sol() -> f64 {
    0.01
}

fn default_min_treasury_balance_sol() -> f64 {
    0.05
}

fn default_settle_delay_ms() -> u64 {
    1000
}

fn default_activity_duration_ms() -> u64 {
    3000
}

fn default_dry_run_treasury_sol() -> f64 {
    1.0
}

impl Config {
    /// Load configuration from file and environment variables
    ///
    /// `PRIVATE_KEY` and `RPC_URL` are honored on top of the prefixed
    /// variables so existing `.env` files keep working.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Start with defaults
            .set_default("rpc.endpoint", default_rpc_endpoint())?
            .set_default("rpc.timeout_ms", default_timeout_ms() as i64)?
            .set_default("rpc.commitment", "confirmed")?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix WORKER_POOL_)
            .add_source(
                config::Environment::with_prefix("WORKER_POOL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("treasury.private_key", std::env::var("PRIVATE_KEY").ok())?
            .set_override_option("rpc.endpoint", std::env::var("RPC_URL").ok())?
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let endpoint = url::Url::parse(&self.rpc.endpoint)
            .with_context(|| format!("Invalid rpc.endpoint: {}", self.rpc.endpoint))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            anyhow::bail!("rpc.endpoint must be an http(s) URL, got {}", endpoint.scheme());
        }

        if self.rpc.timeout_ms == 0 {
            anyhow::bail!("rpc.timeout_ms must be positive");
        }

        if !(self.demo.funding_amount_sol > 0.0) {
            anyhow::bail!("demo.funding_amount_sol must be positive");
        }

        if self.demo.min_treasury_balance_sol < 0.0 {
            anyhow::bail!("demo.min_treasury_balance_sol cannot be negative");
        }

        if !(self.demo.dry_run_treasury_sol > 0.0) {
            anyhow::bail!("demo.dry_run_treasury_sol must be positive");
        }

        if self.treasury.private_key.is_none() {
            tracing::warn!("No treasury private key configured (set PRIVATE_KEY)");
        }

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  RPC:
    endpoint: {}
    timeout: {}ms
    commitment: {:?}
  Treasury:
    private_key: {}
  Demo:
    funding_amount: {} SOL
    min_treasury_balance: {} SOL
    settle_delay: {}ms
    activity_duration: {}ms
    dry_run_treasury: {} SOL
"#,
            mask_url(&self.rpc.endpoint),
            self.rpc.timeout_ms,
            self.rpc.commitment,
            match &self.treasury.private_key {
                Some(key) if !key.trim().is_empty() => "***",
                _ => "(not set)",
            },
            self.demo.funding_amount_sol,
            self.demo.min_treasury_balance_sol,
            self.demo.settle_delay_ms,
            self.demo.activity_duration_ms,
            self.demo.dry_run_treasury_sol,
        )
    }
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            treasury: TreasuryConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.rpc.endpoint, "https://api.devnet.solana.com");
        assert_eq!(config.rpc.commitment, Commitment::Confirmed);
        assert_eq!(config.demo.funding_amount_sol, 0.01);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_commitment_deserialize() {
        let policy: Commitment = serde_json::from_str(r#""finalized""#).unwrap();
        assert_eq!(policy, Commitment::Finalized);
        assert_eq!(
            policy.to_commitment_config(),
            CommitmentConfig::finalized()
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[rpc]
timeout_ms = 5000
commitment = "processed"

[demo]
funding_amount_sol = 0.25
settle_delay_ms = 0
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.rpc.timeout_ms, 5000);
        assert_eq!(config.rpc.commitment, Commitment::Processed);
        assert_eq!(config.demo.funding_amount_sol, 0.25);
        assert_eq!(config.demo.settle_delay_ms, 0);
        // Untouched values fall back to defaults
        assert_eq!(config.demo.min_treasury_balance_sol, 0.05);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.rpc.endpoint = "ws://localhost:8900".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.demo.funding_amount_sol = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.demo.funding_amount_sol = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_masked_display_hides_secrets() {
        let mut config = Config::default();
        config.treasury.private_key = Some("supersecretkeymaterial".to_string());
        config.rpc.endpoint = "https://rpc.example.com?api-key=secret".to_string();

        let shown = config.masked_display();
        assert!(!shown.contains("supersecretkeymaterial"));
        assert!(!shown.contains("api-key=secret"));
        assert!(shown.contains("https://rpc.example.com?***"));
    }

    #[test]
    fn test_mask_url() {
        assert_eq!(
            mask_url("https://api.example.com?key=secret"),
            "https://api.example.com?***"
        );
        assert_eq!(
            mask_url("https://api.example.com"),
            "https://api.example.com"
        );
    }
}
