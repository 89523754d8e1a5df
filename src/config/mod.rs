use std::collections::HashMap;
use std::time::Duration;

use clap::Parser;

use crate::cosign::{CoSignSettings, ConfirmPolicy};
use crate::domain::{Network, SignerSlot};

/// Attestation oracle configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "cap-oracle")]
#[command(about = "Social-proof attestation and transaction co-signing service")]
pub struct Config {
    /// HTTP server listen address
    #[arg(long, default_value = "0.0.0.0:8080", env = "CAP_LISTEN_ADDR")]
    pub listen_addr: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, default_value = "false", env = "CAP_LOG_JSON")]
    pub log_json: bool,

    /// Service secret key as a JSON byte array (32-byte seed or 64-byte keypair)
    #[arg(long, env = "SOL_SECRET", hide_env_values = true)]
    pub signer_secret: Option<String>,

    /// Mainnet-beta RPC endpoint
    #[arg(long, default_value = "https://api.mainnet-beta.solana.com", env = "CAP_MAINNET_RPC_URL")]
    pub mainnet_rpc_url: String,

    /// Devnet RPC endpoint
    #[arg(long, default_value = "https://api.devnet.solana.com", env = "CAP_DEVNET_RPC_URL")]
    pub devnet_rpc_url: String,

    /// Testnet RPC endpoint
    #[arg(long, default_value = "https://api.testnet.solana.com", env = "CAP_TESTNET_RPC_URL")]
    pub testnet_rpc_url: String,

    /// Local validator RPC endpoint
    #[arg(long, default_value = "http://127.0.0.1:8899", env = "CAP_LOCALNET_RPC_URL")]
    pub localnet_rpc_url: String,

    /// Signature slot the service signs into
    #[arg(long, default_value = "0", env = "CAP_SIGNER_SLOT")]
    pub signer_slot: usize,

    /// Broadcast transactions after co-signing instead of returning them
    #[arg(long, default_value = "false", env = "CAP_BROADCAST_ON_CO_SIGN")]
    pub broadcast_on_co_sign: bool,

    /// Confirmation poll interval in milliseconds
    #[arg(long, default_value = "500", env = "CAP_CONFIRM_POLL_MS")]
    pub confirm_poll_ms: u64,

    /// Status checks before giving up on confirmation
    #[arg(long, default_value = "60", env = "CAP_CONFIRM_MAX_ATTEMPTS")]
    pub confirm_max_attempts: u32,

    /// RPC request timeout in seconds
    #[arg(long, default_value = "30", env = "CAP_RPC_TIMEOUT_SECS")]
    pub rpc_timeout_secs: u64,

    /// Enable graceful shutdown
    #[arg(long, default_value = "true", env = "CAP_GRACEFUL_SHUTDOWN")]
    pub graceful_shutdown: bool,

    /// CORS preflight cache lifetime in seconds
    #[arg(long, default_value = "86400", env = "CAP_CORS_MAX_AGE_SECS")]
    pub cors_max_age_secs: u64,
}

impl Config {
    /// Get confirmation poll interval as Duration.
    pub fn confirm_poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirm_poll_ms)
    }

    /// Get RPC request timeout as Duration.
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    /// Get CORS max age as Duration.
    pub fn cors_max_age(&self) -> Duration {
        Duration::from_secs(self.cors_max_age_secs)
    }

    /// Endpoint per network.
    pub fn rpc_urls(&self) -> HashMap<Network, String> {
        HashMap::from([
            (Network::MainnetBeta, self.mainnet_rpc_url.clone()),
            (Network::Devnet, self.devnet_rpc_url.clone()),
            (Network::Testnet, self.testnet_rpc_url.clone()),
            (Network::Localnet, self.localnet_rpc_url.clone()),
        ])
    }

    pub fn co_sign_settings(&self) -> CoSignSettings {
        CoSignSettings {
            service_slot: SignerSlot(self.signer_slot),
            broadcast_on_co_sign: self.broadcast_on_co_sign,
            confirm: ConfirmPolicy {
                poll_interval: self.confirm_poll_interval(),
                max_attempts: self.confirm_max_attempts,
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_addr: "0.0.0.0:8080".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            signer_secret: None,
            mainnet_rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            devnet_rpc_url: "https://api.devnet.solana.com".to_string(),
            testnet_rpc_url: "https://api.testnet.solana.com".to_string(),
            localnet_rpc_url: "http://127.0.0.1:8899".to_string(),
            signer_slot: 0,
            broadcast_on_co_sign: false,
            confirm_poll_ms: 500,
            confirm_max_attempts: 60,
            rpc_timeout_secs: 30,
            graceful_shutdown: true,
            cors_max_age_secs: 86400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.signer_slot, 0);
        assert!(!config.broadcast_on_co_sign);
        assert!(config.signer_secret.is_none());
    }

    #[test]
    fn test_defaults_match_parser() {
        let parsed = Config::try_parse_from(["cap-oracle"]).unwrap();
        let defaults = Config::default();

        assert_eq!(parsed.listen_addr, defaults.listen_addr);
        assert_eq!(parsed.devnet_rpc_url, defaults.devnet_rpc_url);
        assert_eq!(parsed.confirm_max_attempts, defaults.confirm_max_attempts);
        assert_eq!(parsed.cors_max_age_secs, defaults.cors_max_age_secs);
    }

    #[test]
    fn test_duration_helpers() {
        let config = Config {
            confirm_poll_ms: 250,
            rpc_timeout_secs: 10,
            cors_max_age_secs: 600,
            ..Default::default()
        };

        assert_eq!(config.confirm_poll_interval(), Duration::from_millis(250));
        assert_eq!(config.rpc_timeout(), Duration::from_secs(10));
        assert_eq!(config.cors_max_age(), Duration::from_secs(600));
    }

    #[test]
    fn test_co_sign_settings() {
        let config = Config {
            signer_slot: 1,
            broadcast_on_co_sign: true,
            confirm_max_attempts: 5,
            ..Default::default()
        };
        let settings = config.co_sign_settings();

        assert_eq!(settings.service_slot, SignerSlot(1));
        assert!(settings.broadcast_on_co_sign);
        assert_eq!(settings.confirm.max_attempts, 5);
        assert_eq!(config.rpc_urls()[&Network::Localnet], "http://127.0.0.1:8899");
    }
}
