//! Configuration types for the BOLD workspace

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::registry::{BranchContract, ProtocolContract};
use crate::{Address, CollateralSymbol, ConfigError, U256};

/// Block explorer used to build transaction links
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockExplorer {
    pub name: String,
    pub url: String,
}

impl Default for BlockExplorer {
    fn default() -> Self {
        Self {
            name: "Etherscan".to_string(),
            url: "https://etherscan.io".to_string(),
        }
    }
}

/// Chain connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// EIP-155 chain id
    pub id: u64,

    pub name: String,

    /// JSON-RPC endpoint, handed to the transport implementation
    #[serde(default)]
    pub rpc_url: String,

    #[serde(default)]
    pub block_explorer: BlockExplorer,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            id: 1,
            name: "Ethereum".to_string(),
            rpc_url: String::new(),
            block_explorer: BlockExplorer::default(),
        }
    }
}

/// One collateral branch as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchConfig {
    pub symbol: CollateralSymbol,

    /// Display name ("Ether", "Wrapped stETH", ...)
    pub name: String,

    pub contracts: HashMap<BranchContract, Address>,
}

/// Tunables with protocol defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolSettings {
    /// Confirmations awaited per transaction
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,

    /// Give up waiting for a receipt after this many seconds (0 disables the timeout)
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,

    /// Seed passed to `HintHelpers.getApproxHint`
    #[serde(default = "default_hint_seed")]
    pub hint_seed: u64,

    /// Slippage tolerance for swap quotes (0.05 = 5%)
    #[serde(default = "default_slippage_tolerance")]
    pub slippage_tolerance: f64,

    /// Default `maxIterations` for redemptions
    #[serde(default = "default_redemption_max_iterations")]
    pub redemption_max_iterations: u64,

    /// Gas compensation sent as value when opening a trove
    #[serde(default = "default_gas_compensation_wei")]
    pub gas_compensation_wei: u64,
}

fn default_confirmations() -> u64 {
    1
}

fn default_confirmation_timeout_secs() -> u64 {
    40 * 60
}

fn default_hint_seed() -> u64 {
    42
}

fn default_slippage_tolerance() -> f64 {
    0.05
}

fn default_redemption_max_iterations() -> u64 {
    10
}

fn default_gas_compensation_wei() -> u64 {
    crate::constants::ETH_GAS_COMPENSATION_WEI
}

impl ProtocolSettings {
    pub fn gas_compensation(&self) -> U256 {
        U256::from(self.gas_compensation_wei)
    }

    /// `None` when the timeout is disabled
    pub fn confirmation_timeout(&self) -> Option<std::time::Duration> {
        (self.confirmation_timeout_secs > 0)
            .then(|| std::time::Duration::from_secs(self.confirmation_timeout_secs))
    }
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            confirmations: default_confirmations(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            hint_seed: default_hint_seed(),
            slippage_tolerance: default_slippage_tolerance(),
            redemption_max_iterations: default_redemption_max_iterations(),
            gas_compensation_wei: default_gas_compensation_wei(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub chain: ChainConfig,

    /// Collateral branches in branch-id order
    pub branches: Vec<BranchConfig>,

    pub protocol_contracts: HashMap<ProtocolContract, Address>,

    #[serde(default)]
    pub settings: ProtocolSettings,
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Fully populated config with deterministic addresses, shared with registry tests
    pub(crate) fn sample_config() -> AppConfig {
        let symbols = [
            (CollateralSymbol::Eth, "Ether"),
            (CollateralSymbol::WstEth, "Wrapped stETH"),
            (CollateralSymbol::REth, "Rocket Pool ETH"),
        ];

        let branches = symbols
            .iter()
            .enumerate()
            .map(|(i, (symbol, name))| BranchConfig {
                symbol: *symbol,
                name: name.to_string(),
                contracts: BranchContract::ALL
                    .iter()
                    .enumerate()
                    .map(|(j, c)| (*c, Address::with_last_byte((0x10 * (i + 1) + j) as u8)))
                    .collect(),
            })
            .collect();

        let protocol_contracts = ProtocolContract::ALL
            .iter()
            .enumerate()
            .map(|(j, c)| (*c, Address::with_last_byte(0xa0 + j as u8)))
            .collect();

        AppConfig {
            chain: ChainConfig::default(),
            branches,
            protocol_contracts,
            settings: ProtocolSettings::default(),
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = ProtocolSettings::default();
        assert_eq!(settings.confirmations, 1);
        assert_eq!(settings.confirmation_timeout_secs, 2400);
        assert_eq!(settings.hint_seed, 42);
        assert_eq!(settings.redemption_max_iterations, 10);
        assert_eq!(
            settings.gas_compensation(),
            U256::from(37_500_000_000_000_000u64)
        );
    }

    #[test]
    fn test_settings_fill_missing_fields() {
        let settings: ProtocolSettings = serde_json::from_str(r#"{"hint_seed": 7}"#).unwrap();
        assert_eq!(settings.hint_seed, 7);
        assert_eq!(settings.confirmations, 1);
        assert!((settings.slippage_tolerance - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_zero_timeout_disables_it() {
        let settings = ProtocolSettings {
            confirmation_timeout_secs: 0,
            ..Default::default()
        };
        assert!(settings.confirmation_timeout().is_none());
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = sample_config();
        let json = serde_json::to_string(&config).unwrap();
        let parsed = AppConfig::from_json(&json).unwrap();
        assert_eq!(parsed.branches.len(), 3);
        assert_eq!(parsed.branches[1].symbol, CollateralSymbol::WstEth);
        assert_eq!(
            parsed.protocol_contracts[&ProtocolContract::BoldToken],
            config.protocol_contracts[&ProtocolContract::BoldToken]
        );
    }

    #[test]
    fn test_parse_minimal_json() {
        let json = r#"{
            "branches": [
                { "symbol": "ETH", "name": "Ether",
                  "contracts": { "BORROWER_OPERATIONS": "0x0000000000000000000000000000000000000001" } }
            ],
            "protocol_contracts": { "BOLD_TOKEN": "0x00000000000000000000000000000000000000b0" }
        }"#;
        let config = AppConfig::from_json(json).unwrap();
        assert_eq!(config.chain.id, 1);
        assert_eq!(config.settings.hint_seed, 42);
        assert_eq!(
            config.branches[0].contracts[&BranchContract::BorrowerOperations],
            Address::with_last_byte(1)
        );
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            AppConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
