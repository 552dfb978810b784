//! Transaction message model
//! Messages are polymorphic over a closed set of variants plus an opaque
//! catch-all; the canonical type URL is what admission policy matches on

use crate::coin::{Coin, Coins};
use crate::crypto::{PublicKey, Signature};
use crate::dec::Dec;
use crate::types::Address;
use sha2::{Digest, Sha256};

// Canonical type URLs
pub const TYPE_URL_SEND: &str = "/cosmos.bank.v1beta1.MsgSend";
pub const TYPE_URL_DELEGATE: &str = "/cosmos.staking.v1beta1.MsgDelegate";
pub const TYPE_URL_CREATE_VALIDATOR: &str = "/cosmos.staking.v1beta1.MsgCreateValidator";
pub const TYPE_URL_EDIT_VALIDATOR: &str = "/cosmos.staking.v1beta1.MsgEditValidator";
pub const TYPE_URL_GRANT: &str = "/cosmos.authz.v1beta1.MsgGrant";
pub const TYPE_URL_EXEC: &str = "/cosmos.authz.v1beta1.MsgExec";
pub const TYPE_URL_ETHEREUM_TX: &str = "/aegis.evm.v1.MsgEthereumTx";

#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MsgSend {
    pub from_address: Address,
    pub to_address: Address,
    pub amount: Coins,
}

#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MsgDelegate {
    pub delegator_address: Address,
    pub validator_address: Address,
    pub amount: Coin,
}

#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MsgCreateValidator {
    pub validator_address: Address,
    pub commission_rate: Dec,
    pub min_self_delegation: u128,
    pub value: Coin,
}

#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MsgEditValidator {
    pub validator_address: Address,

    /// None = leave the rate unchanged
    pub commission_rate: Option<Dec>,
}

/// A delegation of message-execution authority, restricted to one type URL
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Authorization {
    pub msg_type_url: String,
}

#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MsgGrant {
    pub granter: Address,
    pub grantee: Address,
    pub authorization: Authorization,

    /// Expiry (UNIX seconds), None = no expiry
    pub expiration: Option<u64>,
}

#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MsgExec {
    pub grantee: Address,
    pub msgs: Vec<Msg>,
}

/// Payload of an Ethereum-formatted transaction
/// Wire-level RLP encoding is handled by the codec, which also precomputes
/// the transaction hash carried here
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum EthTxData {
    Legacy(LegacyTx),
    DynamicFee(DynamicFeeTx),
}

#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LegacyTx {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,

    /// None = contract creation
    pub to: Option<Address>,
    pub value: u128,
    pub input: Vec<u8>,

    /// None = unprotected (no replay protection)
    pub chain_id: Option<u64>,
    pub pub_key: Option<PublicKey>,
    pub signature: Option<Signature>,

    /// Transaction hash, precomputed by the codec
    pub hash: Vec<u8>,
}

/// EIP-1559-style transaction with a fee cap and a priority tip cap
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DynamicFeeTx {
    pub nonce: u64,
    pub gas_fee_cap: u128,
    pub gas_tip_cap: u128,
    pub gas_limit: u64,
    pub to: Option<Address>,
    pub value: u128,
    pub input: Vec<u8>,
    pub chain_id: Option<u64>,
    pub pub_key: Option<PublicKey>,
    pub signature: Option<Signature>,
    pub hash: Vec<u8>,
}

impl EthTxData {
    pub fn nonce(&self) -> u64 {
        match self {
            Self::Legacy(tx) => tx.nonce,
            Self::DynamicFee(tx) => tx.nonce,
        }
    }

    pub fn gas_limit(&self) -> u64 {
        match self {
            Self::Legacy(tx) => tx.gas_limit,
            Self::DynamicFee(tx) => tx.gas_limit,
        }
    }

    /// Declared gas price - for dynamic-fee transactions this is the fee cap
    pub fn gas_price(&self) -> u128 {
        match self {
            Self::Legacy(tx) => tx.gas_price,
            Self::DynamicFee(tx) => tx.gas_fee_cap,
        }
    }

    pub fn to(&self) -> Option<&Address> {
        match self {
            Self::Legacy(tx) => tx.to.as_ref(),
            Self::DynamicFee(tx) => tx.to.as_ref(),
        }
    }

    pub fn value(&self) -> u128 {
        match self {
            Self::Legacy(tx) => tx.value,
            Self::DynamicFee(tx) => tx.value,
        }
    }

    pub fn input(&self) -> &[u8] {
        match self {
            Self::Legacy(tx) => &tx.input,
            Self::DynamicFee(tx) => &tx.input,
        }
    }

    pub fn chain_id(&self) -> Option<u64> {
        match self {
            Self::Legacy(tx) => tx.chain_id,
            Self::DynamicFee(tx) => tx.chain_id,
        }
    }

    /// True if the signature commits to a chain id
    pub fn is_protected(&self) -> bool {
        self.chain_id().is_some()
    }

    pub fn is_contract_creation(&self) -> bool {
        self.to().is_none()
    }

    pub fn pub_key(&self) -> Option<&PublicKey> {
        match self {
            Self::Legacy(tx) => tx.pub_key.as_ref(),
            Self::DynamicFee(tx) => tx.pub_key.as_ref(),
        }
    }

    pub fn signature(&self) -> Option<&Signature> {
        match self {
            Self::Legacy(tx) => tx.signature.as_ref(),
            Self::DynamicFee(tx) => tx.signature.as_ref(),
        }
    }

    pub fn hash(&self) -> &[u8] {
        match self {
            Self::Legacy(tx) => &tx.hash,
            Self::DynamicFee(tx) => &tx.hash,
        }
    }

    /// Digest the signature commits to: SHA-256 over the canonical JSON of
    /// the unsigned fields
    pub fn sign_hash(&self) -> Vec<u8> {
        let mut unsigned = self.clone();
        match &mut unsigned {
            Self::Legacy(tx) => {
                tx.pub_key = None;
                tx.signature = None;
                tx.hash.clear();
            }
            Self::DynamicFee(tx) => {
                tx.pub_key = None;
                tx.signature = None;
                tx.hash.clear();
            }
        }
        let json = serde_json::to_vec(&unsigned).expect("EthTxData serializes");
        Sha256::digest(&json).to_vec()
    }
}

/// An Ethereum transaction carried in a Cosmos envelope
/// `from` must be empty on the wire; the sender is recovered from the
/// signature during admission
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MsgEthereumTx {
    pub data: EthTxData,
    pub from: Option<Address>,
}

// === Global message enum ===
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Msg {
    Send(MsgSend),
    Delegate(MsgDelegate),
    CreateValidator(MsgCreateValidator),
    EditValidator(MsgEditValidator),
    Grant(MsgGrant),
    Exec(MsgExec),
    EthereumTx(MsgEthereumTx),

    /// A message type the pipeline has no special handling for
    Other { type_url: String },
}

impl Msg {
    /// Canonical type URL used for policy matching
    pub fn type_url(&self) -> &str {
        match self {
            Msg::Send(_) => TYPE_URL_SEND,
            Msg::Delegate(_) => TYPE_URL_DELEGATE,
            Msg::CreateValidator(_) => TYPE_URL_CREATE_VALIDATOR,
            Msg::EditValidator(_) => TYPE_URL_EDIT_VALIDATOR,
            Msg::Grant(_) => TYPE_URL_GRANT,
            Msg::Exec(_) => TYPE_URL_EXEC,
            Msg::EthereumTx(_) => TYPE_URL_ETHEREUM_TX,
            Msg::Other { type_url } => type_url,
        }
    }

    /// The addresses expected to have signed this message
    pub fn signers(&self) -> Vec<Address> {
        match self {
            Msg::Send(m) => vec![m.from_address.clone()],
            Msg::Delegate(m) => vec![m.delegator_address.clone()],
            Msg::CreateValidator(m) => vec![m.validator_address.clone()],
            Msg::EditValidator(m) => vec![m.validator_address.clone()],
            Msg::Grant(m) => vec![m.granter.clone()],
            Msg::Exec(m) => vec![m.grantee.clone()],
            Msg::EthereumTx(_) => Vec::new(),
            Msg::Other { .. } => Vec::new(),
        }
    }
}
