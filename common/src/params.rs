//! Chain parameter snapshots consumed by the admission pipeline
//! Captured once at pipeline entry so every stage sees a consistent view

use crate::coin::DecCoin;
use crate::dec::Dec;
use crate::types::Denom;

/// EVM module parameters
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EvmParams {
    /// Denomination EVM balances are held in
    pub evm_denom: Denom,

    /// Contract creation allowed
    pub enable_create: bool,

    /// Contract calls allowed
    pub enable_call: bool,

    /// Accept signatures without replay protection
    pub allow_unprotected_txs: bool,
}

impl Default for EvmParams {
    fn default() -> Self {
        Self {
            evm_denom: crate::types::BASE_DENOM.to_string(),
            enable_create: true,
            enable_call: true,
            allow_unprotected_txs: false,
        }
    }
}

/// Fee-market (EIP-1559) parameters
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FeeMarketParams {
    /// Disable the base fee entirely
    pub no_base_fee: bool,

    /// Current protocol-set base fee, atomics per gas
    pub base_fee: u128,

    /// Height at which the fee market activates
    pub enable_height: u64,

    /// Consensus-wide minimum gas price
    pub min_gas_price: Dec,
}

impl Default for FeeMarketParams {
    fn default() -> Self {
        Self {
            no_base_fee: false,
            base_fee: 1_000_000_000,
            enable_height: 0,
            min_gas_price: Dec::zero(),
        }
    }
}

impl FeeMarketParams {
    /// The base fee in force at `height`, None before activation
    pub fn base_fee_at(&self, height: u64) -> Option<u128> {
        if self.no_base_fee || height < self.enable_height {
            None
        } else {
            Some(self.base_fee)
        }
    }
}

/// Hard-fork activation heights relevant to fee verification
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub homestead_block: u64,
    pub istanbul_block: u64,
    pub london_block: u64,
}

impl ChainConfig {
    pub fn is_homestead(&self, height: u64) -> bool {
        height >= self.homestead_block
    }

    pub fn is_istanbul(&self, height: u64) -> bool {
        height >= self.istanbul_block
    }

    pub fn is_london(&self, height: u64) -> bool {
        height >= self.london_block
    }
}

/// Node-local and policy options for the ante handler
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnteOptions {
    /// Message type URLs that may never be reached through authz wrappers
    pub disabled_authz_msgs: Vec<String>,

    /// Message type URLs rejected outright in plain Cosmos transactions
    pub rejected_msgs: Vec<String>,

    /// Node-local mempool minimum gas prices (CheckTx only)
    pub mempool_min_gas_prices: Vec<DecCoin>,

    /// CheckTx-mode ceiling recorded for a single tx's gas wanted; 0 = none
    pub max_tx_gas_wanted: u64,

    /// Minimum validator commission rate
    pub min_commission_rate: Dec,

    /// Cosmos chain id used in sign docs
    pub chain_id: String,
}

impl Default for AnteOptions {
    fn default() -> Self {
        Self {
            disabled_authz_msgs: vec![crate::msgs::TYPE_URL_ETHEREUM_TX.to_string()],
            rejected_msgs: vec![crate::msgs::TYPE_URL_ETHEREUM_TX.to_string()],
            mempool_min_gas_prices: Vec::new(),
            max_tx_gas_wanted: 0,
            min_commission_rate: Dec::from_atomics(50_000_000_000_000_000), // 5%
            chain_id: "aegis-1".to_string(),
        }
    }
}
