//! Shared test helpers: deterministic keys and transaction builders

use aegis_common::coin::{Coin, Coins};
use aegis_common::crypto::{keypair_from_seed, sign, PublicKey, Signature};
use aegis_common::msgs::{EthTxData, Msg, MsgEthereumTx, MsgSend};
use aegis_common::tx::{ExtensionOption, Fee, SignDoc, SignerInfo, Tx};
use aegis_common::types::{Address, BlockInfo};
use sha2::{Digest, Sha256};

/// A deterministic set of ed25519 keypairs for tests
pub struct Keyring {
    keys: Vec<([u8; 64], PublicKey)>,
}

impl Keyring {
    pub fn new() -> Self {
        let keys = (0u8..4).map(|i| keypair_from_seed(&[0x10 + i; 32])).collect();
        Self { keys }
    }

    pub fn pub_key(&self, index: usize) -> PublicKey {
        self.keys[index].1
    }

    pub fn address(&self, index: usize) -> Address {
        self.keys[index].1.address()
    }

    pub fn sign(&self, index: usize, message: &[u8]) -> Signature {
        sign(&self.keys[index].0, message)
    }
}

impl Default for Keyring {
    fn default() -> Self {
        Self::new()
    }
}

/// A block with a realistic gas budget
pub fn test_block() -> BlockInfo {
    BlockInfo {
        height: 1,
        time: 1_700_000_000,
        hash: vec![0xab; 32],
        gas_limit: 100_000_000,
    }
}

/// Gas limit declared by [`signed_send_tx`]
pub const SEND_TX_GAS: u64 = 100_000;

/// A fully signed single-message bank send from key `index`.
///
/// Signs for account number 0, so the sender must be the first account
/// created in the ledger under test.
pub fn signed_send_tx(
    keys: &Keyring,
    index: usize,
    to: &Address,
    fee_amount: u128,
    sequence: u64,
    chain_id: &str,
) -> Tx {
    signed_tx(
        keys,
        index,
        vec![Msg::Send(MsgSend {
            from_address: keys.address(index),
            to_address: to.clone(),
            amount: Coins::from_coin(Coin::new("aaeg", 1)),
        })],
        fee_amount,
        sequence,
        chain_id,
    )
}

/// A transaction carrying arbitrary messages, signed once by key `index`
/// for account number 0
pub fn signed_tx(
    keys: &Keyring,
    index: usize,
    messages: Vec<Msg>,
    fee_amount: u128,
    sequence: u64,
    chain_id: &str,
) -> Tx {
    let mut tx = Tx::default();
    tx.body.messages = messages;
    tx.auth_info.fee = Fee {
        amount: if fee_amount == 0 {
            Coins::new()
        } else {
            Coins::from_coin(Coin::new("aaeg", fee_amount))
        },
        gas_limit: SEND_TX_GAS,
        payer: None,
        granter: None,
    };
    tx.auth_info.signer_infos.push(SignerInfo {
        pub_key: Some(keys.pub_key(index)),
        sequence,
    });

    let doc = SignDoc {
        chain_id,
        account_number: 0,
        sequence,
        fee: &tx.auth_info.fee,
        messages: &tx.body.messages,
        memo: &tx.body.memo,
    };
    let signature = keys.sign(index, &doc.direct_sign_hash());
    tx.signatures.push(signature);
    tx
}

/// Sign an Ethereum payload with key `index` and stamp a codec-style hash
pub fn sign_eth_tx(keys: &Keyring, index: usize, mut data: EthTxData) -> EthTxData {
    let digest = data.sign_hash();
    let signature = keys.sign(index, &digest);
    let pub_key = keys.pub_key(index);
    match &mut data {
        EthTxData::Legacy(tx) => {
            tx.pub_key = Some(pub_key);
            tx.signature = Some(signature);
        }
        EthTxData::DynamicFee(tx) => {
            tx.pub_key = Some(pub_key);
            tx.signature = Some(signature);
        }
    }
    let hash = Sha256::digest(serde_json::to_vec(&data).expect("EthTxData serializes")).to_vec();
    match &mut data {
        EthTxData::Legacy(tx) => tx.hash = hash,
        EthTxData::DynamicFee(tx) => tx.hash = hash,
    }
    data
}

/// Wrap an Ethereum payload in its Cosmos envelope with a matching declared
/// fee and gas limit
pub fn eth_tx_envelope(data: EthTxData, denom: &str, fee_total: u128, gas_limit: u64) -> Tx {
    let mut tx = Tx::default();
    tx.body.extension_options = vec![ExtensionOption::ethereum_tx()];
    tx.body.messages.push(Msg::EthereumTx(MsgEthereumTx { data, from: None }));
    tx.auth_info.fee = Fee {
        amount: if fee_total == 0 {
            Coins::new()
        } else {
            Coins::from_coin(Coin::new(denom, fee_total))
        },
        gas_limit,
        payer: None,
        granter: None,
    };
    tx
}
