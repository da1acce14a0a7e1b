use anyhow::{ Context, Result };
use serde::{ Deserialize, Serialize };
use std::fs;
use std::path::Path;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub rpc_urls: Vec<String>,
    pub contract: ContractConfig,
    pub settlement: SettlementConfig,
    pub database: DatabaseConfig,
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Exchange contract emitting OrdersMatched events
    pub address: String,
    /// Filter construction mode: "contract", "transfer" or "contract-transfer"
    pub monitor_mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// ERC-20 token whose transfer direction decides BUY/SELL
    pub token_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub filter_refresh_secs: u64,
    pub filter_poll_secs: u64,
    pub dedup_window_secs: u64,
    pub dedup_sweep_secs: u64,
    pub endpoint_quarantine_secs: u64,
    pub rpc_timeout_secs: u64,
    pub receipt_concurrency: usize,
    pub stats_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_urls: vec![
                "https://bsc-dataseed.bnbchain.org".to_string(),
                "https://bsc-dataseed1.defibit.io".to_string(),
                "https://bsc-dataseed1.ninicoin.io".to_string()
            ],
            contract: ContractConfig {
                address: String::new(),
                monitor_mode: "contract-transfer".to_string(),
            },
            settlement: SettlementConfig {
                // BSC USDT
                token_address: "0x55d398326f99059fF775485246999027B3197955".to_string(),
            },
            database: DatabaseConfig {
                path: "data/orders.db".to_string(),
            },
            monitor: MonitorConfig {
                filter_refresh_secs: 180, // 3 minutes
                filter_poll_secs: 2,
                dedup_window_secs: 60,
                dedup_sweep_secs: 30,
                endpoint_quarantine_secs: 300, // 5 minutes
                rpc_timeout_secs: 10,
                receipt_concurrency: 10,
                stats_interval_secs: 60,
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            let default_config = Self::default();
            default_config.save(path)?;
            return Err(
                anyhow::anyhow!(
                    "No config found - wrote defaults to {}. Set contract.address and restart.",
                    path
                )
            );
        }

        let content = fs
            ::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Self = serde_json
            ::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = serde_json
            ::to_string_pretty(self)
            .with_context(|| "Failed to serialize config")?;

        fs::write(path, content).with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.rpc_urls.is_empty() {
            return Err(anyhow::anyhow!("rpc_urls must list at least one endpoint"));
        }
        for url in &self.rpc_urls {
            Url::parse(url).with_context(|| format!("Invalid RPC url in config: {}", url))?;
        }
        if self.contract.address.is_empty() {
            return Err(anyhow::anyhow!("contract.address is required in config"));
        }
        if
            !matches!(
                self.contract.monitor_mode.as_str(),
                "contract" | "transfer" | "contract-transfer"
            )
        {
            return Err(
                anyhow::anyhow!(
                    "contract.monitor_mode must be one of: contract, transfer, contract-transfer"
                )
            );
        }
        if self.monitor.filter_refresh_secs == 0 {
            return Err(anyhow::anyhow!("monitor.filter_refresh_secs must be non-zero"));
        }
        if self.monitor.dedup_window_secs == 0 {
            return Err(anyhow::anyhow!("monitor.dedup_window_secs must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation_once_contract_is_set() {
        let mut config = Config::default();
        config.contract.address = "0x1234567890abcdef1234567890abcdef12345678".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_rpc_list_is_rejected() {
        let mut config = Config::default();
        config.contract.address = "0x1234567890abcdef1234567890abcdef12345678".to_string();
        config.rpc_urls.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_monitor_mode_is_rejected() {
        let mut config = Config::default();
        config.contract.address = "0x1234567890abcdef1234567890abcdef12345678".to_string();
        config.contract.monitor_mode = "everything".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let path_str = path.to_str().unwrap();

        let mut config = Config::default();
        config.contract.address = "0x1234567890abcdef1234567890abcdef12345678".to_string();
        config.save(path_str).unwrap();

        let loaded = Config::load(path_str).unwrap();
        assert_eq!(loaded.contract.address, config.contract.address);
        assert_eq!(loaded.monitor.filter_refresh_secs, 180);
    }
}
