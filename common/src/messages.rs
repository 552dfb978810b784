//! Definition of Aegis bus messages

// We don't use these messages in the aegis_common crate itself
#![allow(dead_code)]

use crate::errors::AnteError;
use crate::params::{ChainConfig, EvmParams, FeeMarketParams};
use crate::tx::Tx;
use crate::types::BlockInfo;

/// Transactions submitted for admission
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct SubmittedTxsMessage {
    /// Decoded transaction envelopes, in block order
    pub txs: Vec<Tx>,
}

/// Chain parameters snapshot
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChainParamsMessage {
    pub evm: EvmParams,
    pub fee_market: FeeMarketParams,
    pub chain_config: ChainConfig,
}

/// Outcome of admitting one transaction
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum AdmissionStatus {
    /// Admitted, with the recorded priority and gas wanted
    Admitted { priority: i64, gas_wanted: u64 },

    /// Rejected with a typed error
    Rejected(AnteError),
}

/// Per-transaction admission results for a block of submissions
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct AdmissionResultMessage {
    pub results: Vec<AdmissionStatus>,
}

/// Chain-scoped message payloads
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum ChainMessage {
    SubmittedTxs(SubmittedTxsMessage),     // Transactions available
    ChainParams(ChainParamsMessage),       // Parameters updated
    Admission(AdmissionResultMessage),     // Admission results
}

// === Global message enum ===
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Message {
    None(()),                              // Just so we have a simple default

    // Generic messages, get out of jail free cards
    String(String),                        // Simple string
    JSON(serde_json::Value),               // JSON object

    // Chain messages
    Chain((BlockInfo, ChainMessage)),      // Chain event with block context
}

impl Default for Message {
    fn default() -> Self {
        Self::None(())
    }
}
