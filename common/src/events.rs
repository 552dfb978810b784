//! Typed events emitted by the admission pipeline for downstream indexing

/// Event type for fee payment
pub const EVENT_TYPE_TX_FEE: &str = "tx_fee";

/// Event type for an admitted Ethereum message
pub const EVENT_TYPE_ETHEREUM_TX: &str = "ethereum_tx";

pub const ATTR_FEE: &str = "fee";
pub const ATTR_FEE_PAYER: &str = "fee_payer";
pub const ATTR_ETH_TX_HASH: &str = "eth_tx_hash";
pub const ATTR_TX_INDEX: &str = "tx_index";

/// An indexed event
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Event {
    /// Event type
    pub kind: String,

    /// Key/value attributes
    pub attributes: Vec<(String, String)>,
}

impl Event {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            attributes: Vec::new(),
        }
    }

    pub fn attr(mut self, key: &str, value: &str) -> Self {
        self.attributes.push((key.to_string(), value.to_string()));
        self
    }

    /// Attribute value lookup, mainly for tests
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}
