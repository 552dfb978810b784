//! Core type definitions for Aegis

/// A 20-byte account address, shared between the Cosmos and EVM address spaces
pub type Address = Vec<u8>;

/// Coin denomination name
pub type Denom = String;

/// The chain's single base denomination, 18 decimals, used for both staking
/// bonds and EVM balances
pub const BASE_DENOM: &str = "aaeg";

/// Address of the fee collector module account
pub const FEE_COLLECTOR: &str = "fee_collector";

/// Execution mode the pipeline is running under
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ExecMode {
    /// Mempool admission (ABCI CheckTx)
    Check,

    /// Mempool re-admission after a block commit
    ReCheck,

    /// Block execution (ABCI DeliverTx)
    Deliver,
}

impl ExecMode {
    pub fn is_check(&self) -> bool {
        matches!(self, Self::Check | Self::ReCheck)
    }

    pub fn is_recheck(&self) -> bool {
        matches!(self, Self::ReCheck)
    }
}

/// Block info, shared across multiple messages
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BlockInfo {
    /// Block height
    pub height: u64,

    /// Block time (UNIX seconds)
    pub time: u64,

    /// Block hash
    pub hash: Vec<u8>,

    /// Consensus block gas limit
    pub gas_limit: u64,
}

/// Render an address for logs and error messages
pub fn display_address(addr: &[u8]) -> String {
    format!("0x{}", hex::encode(addr))
}
