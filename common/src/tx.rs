//! Transaction envelope
//! Immutable once handed to the admission pipeline

use crate::coin::Coins;
use crate::crypto::{PublicKey, Signature};
use crate::msgs::Msg;
use crate::types::Address;
use sha2::{Digest, Sha256};

/// Extension-option type URL marking an Ethereum-formatted transaction
pub const EXT_OPT_ETHEREUM_TX: &str = "/aegis.evm.v1.ExtensionOptionsEthereumTx";

/// Extension-option type URL marking an EIP-712-signed Cosmos transaction
pub const EXT_OPT_WEB3_TX: &str = "/aegis.types.v1.ExtensionOptionsWeb3Tx";

/// An opaque extension option, matched by type URL
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExtensionOption {
    pub type_url: String,
}

impl ExtensionOption {
    pub fn ethereum_tx() -> Self {
        Self {
            type_url: EXT_OPT_ETHEREUM_TX.to_string(),
        }
    }

    pub fn web3_tx() -> Self {
        Self {
            type_url: EXT_OPT_WEB3_TX.to_string(),
        }
    }
}

/// Declared fee: amount, gas limit and optional payer/granter overrides
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Fee {
    pub amount: Coins,
    pub gas_limit: u64,

    /// Explicit payer; defaults to the first signer
    pub payer: Option<Address>,

    /// Feegrant granter paying on the payer's behalf
    pub granter: Option<Address>,
}

/// Per-signer authentication info
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SignerInfo {
    pub pub_key: Option<PublicKey>,

    /// Declared sequence (nonce) for this signer
    pub sequence: u64,
}

#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AuthInfo {
    pub signer_infos: Vec<SignerInfo>,
    pub fee: Fee,
}

#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TxBody {
    /// Ordered message list
    pub messages: Vec<Msg>,

    pub memo: String,

    /// Block height after which the tx is invalid; 0 = no timeout
    pub timeout_height: u64,

    /// Markers selecting the admission chain (Ethereum / Web3 / none)
    pub extension_options: Vec<ExtensionOption>,
}

/// The transaction envelope
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tx {
    pub body: TxBody,
    pub auth_info: AuthInfo,
    pub signatures: Vec<Signature>,
}

impl Tx {
    /// The fee payer: explicit payer if set, else the first signer of the
    /// first message
    pub fn fee_payer(&self) -> Option<Address> {
        if let Some(payer) = &self.auth_info.fee.payer {
            return Some(payer.clone());
        }
        self.body.messages.first().and_then(|m| m.signers().into_iter().next())
    }

    /// Signing mode selected by the envelope's extension options
    pub fn first_extension_url(&self) -> Option<&str> {
        self.body.extension_options.first().map(|o| o.type_url.as_str())
    }
}

/// The document a Cosmos-mode signature commits to
#[derive(Debug, Clone, serde::Serialize)]
pub struct SignDoc<'a> {
    pub chain_id: &'a str,
    pub account_number: u64,
    pub sequence: u64,
    pub fee: &'a Fee,
    pub messages: &'a [Msg],
    pub memo: &'a str,
}

impl SignDoc<'_> {
    /// Canonical sign bytes: SHA-256 over the canonical JSON encoding
    pub fn direct_sign_hash(&self) -> Vec<u8> {
        let json = serde_json::to_vec(self).expect("SignDoc serializes");
        Sha256::digest(&json).to_vec()
    }

    /// EIP-712-wrapped sign bytes: the same document framed as typed data
    /// under the chain's signing domain before hashing
    pub fn eip712_sign_hash(&self) -> Vec<u8> {
        let json = serde_json::to_vec(self).expect("SignDoc serializes");
        let mut hasher = Sha256::new();
        hasher.update(b"\x19\x01");
        hasher.update(Sha256::digest(format!("Aegis(chain_id:{})", self.chain_id)));
        hasher.update(Sha256::digest(&json));
        hasher.finalize().to_vec()
    }
}
