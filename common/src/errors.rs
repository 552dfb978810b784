//! Admission error taxonomy for the Aegis ante pipeline

use thiserror::Error;

/// Error returned when a transaction fails admission
/// The caller (mempool or block executor) sees a structured kind plus a
/// human-readable message; CheckTx failures reject from the mempool,
/// DeliverTx failures abort inclusion of that transaction only
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, Error)]
pub enum AnteError {
    /// Wrong envelope or account shape
    #[error("Invalid type: {0}")]
    InvalidType(String),

    /// Blocked message type or failed authorization check
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Fee below a required minimum or in the wrong denomination
    #[error("Insufficient fee: {0}")]
    InsufficientFee(String),

    /// Balance cannot cover value plus fee
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Delegation beyond a vesting account's vested balance
    #[error("Insufficient vested coins: {0}")]
    InsufficientVestedCoins(String),

    /// Spend beyond a vesting account's unlocked balance
    #[error("Insufficient unlocked coins: {0}")]
    InsufficientUnlockedCoins(String),

    /// Declared nonce does not match the account sequence
    #[error("Invalid sequence: expected {expected}, got {got}")]
    InvalidSequence { expected: u64, got: u64 },

    /// Account does not exist
    #[error("Unknown address: {0}")]
    UnknownAddress(String),

    /// Malformed envelope field
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Arithmetic overflow or otherwise invalid amounts
    #[error("Invalid coins: {0}")]
    InvalidCoins(String),

    /// Block gas limit exceeded
    #[error("Out of gas: {0}")]
    OutOfGas(String),

    /// Contract creation disabled by chain parameters
    #[error("EVM contract creation is disabled")]
    CreateDisabled,

    /// Contract calls disabled by chain parameters
    #[error("EVM contract calls are disabled")]
    CallDisabled,

    /// Extension options the router does not recognise
    #[error("Unknown extension options: {0}")]
    UnknownExtensionOptions(String),

    /// Recovered runtime fault inside the pipeline
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnteError {
    pub fn unknown_address(addr: &[u8]) -> Self {
        Self::UnknownAddress(crate::types::display_address(addr))
    }
}
