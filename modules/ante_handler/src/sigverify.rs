//! Signature verification and sequence handling
//! One signer, one expected next sequence; gas is charged per signature

use aegis_common::context::Context;
use aegis_common::crypto::{PublicKey, Signature};
use aegis_common::errors::AnteError;
use aegis_common::keepers::Ledger;
use aegis_common::msgs::EthTxData;
use aegis_common::tx::{SignDoc, Tx};
use aegis_common::types::{display_address, Address};

/// Cosmos-side signing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignMode {
    /// Canonical sign-doc digest
    Direct,

    /// Sign doc framed as EIP-712 typed data before digesting
    Eip712,
}

/// The chain-mandated signature scheme
/// A node embedding this pipeline can substitute its own implementation
pub trait TxSigner {
    /// Verify a Cosmos-mode signature over a sign-doc digest
    fn verify_cosmos(
        &self,
        mode: SignMode,
        digest: &[u8],
        pub_key: &PublicKey,
        signature: &Signature,
    ) -> bool;

    /// Recover the sender of an Ethereum-envelope transaction from its
    /// signature
    fn recover_eth(&self, data: &EthTxData) -> Result<Address, AnteError>;
}

/// Default signer: ed25519 over the mode's digest; Ethereum sender
/// recovery verifies the embedded signature and derives the address from
/// the public key
#[derive(Debug, Default, Clone)]
pub struct ChainSigner;

impl TxSigner for ChainSigner {
    fn verify_cosmos(
        &self,
        _mode: SignMode,
        digest: &[u8],
        pub_key: &PublicKey,
        signature: &Signature,
    ) -> bool {
        pub_key.verify(digest, signature)
    }

    fn recover_eth(&self, data: &EthTxData) -> Result<Address, AnteError> {
        let pub_key = data
            .pub_key()
            .ok_or_else(|| AnteError::Unauthorized("transaction is unsigned".to_string()))?;
        let signature = data
            .signature()
            .ok_or_else(|| AnteError::Unauthorized("transaction is unsigned".to_string()))?;
        if !pub_key.verify(data.sign_hash(), signature) {
            return Err(AnteError::Unauthorized(
                "couldn't retrieve sender address from the ethereum transaction: signature verification failed"
                    .to_string(),
            ));
        }
        Ok(pub_key.address())
    }
}

/// Verify every signature on a Cosmos transaction and increment each
/// signer's sequence.
///
/// The declared sequence must equal the account's current sequence exactly;
/// on success the sequence is left at old+1, on failure it is unchanged.
pub fn verify_signatures<S: Ledger>(
    ctx: &mut Context,
    state: &mut S,
    tx: &Tx,
    mode: SignMode,
    signer: &dyn TxSigner,
    chain_id: &str,
    simulate: bool,
) -> Result<(), AnteError> {
    let expected = expected_signers(tx);
    if tx.signatures.len() != expected.len() || tx.auth_info.signer_infos.len() != expected.len() {
        return Err(AnteError::Unauthorized(format!(
            "wrong number of signatures: expected {}, got {}",
            expected.len(),
            tx.signatures.len()
        )));
    }

    for ((address, info), signature) in
        expected.iter().zip(&tx.auth_info.signer_infos).zip(&tx.signatures)
    {
        let mut account =
            state.get_account(address).ok_or_else(|| AnteError::unknown_address(address))?;

        if info.sequence != account.sequence() {
            return Err(AnteError::InvalidSequence {
                expected: account.sequence(),
                got: info.sequence,
            });
        }

        // Charge for the verification work even under simulation
        ctx.gas_meter.consume(PublicKey::VERIFY_GAS_COST, "ante verify")?;

        let pub_key = info
            .pub_key
            .or(account.base().pub_key)
            .ok_or_else(|| {
                AnteError::InvalidRequest(format!(
                    "public key for {} not set",
                    display_address(address)
                ))
            })?;
        if &pub_key.address() != address {
            return Err(AnteError::Unauthorized(format!(
                "public key does not match signer {}",
                display_address(address)
            )));
        }

        if !simulate {
            let doc = SignDoc {
                chain_id,
                account_number: account.base().account_number,
                sequence: info.sequence,
                fee: &tx.auth_info.fee,
                messages: &tx.body.messages,
                memo: &tx.body.memo,
            };
            let digest = match mode {
                SignMode::Direct => doc.direct_sign_hash(),
                SignMode::Eip712 => doc.eip712_sign_hash(),
            };
            if !signer.verify_cosmos(mode, &digest, &pub_key, signature) {
                return Err(AnteError::Unauthorized(format!(
                    "signature verification failed for {}; verify correct account sequence and chain-id",
                    display_address(address)
                )));
            }
        }

        let base = account.base_mut();
        base.sequence += 1;
        if base.pub_key.is_none() {
            base.pub_key = Some(pub_key);
        }
        state.set_account(account);
    }

    Ok(())
}

/// Unique signer addresses across the message list, in first-use order
fn expected_signers(tx: &Tx) -> Vec<Address> {
    let mut signers: Vec<Address> = Vec::new();
    for msg in &tx.body.messages {
        for signer in msg.signers() {
            if !signers.contains(&signer) {
                signers.push(signer);
            }
        }
    }
    signers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory_ledger::InMemoryLedger;
    use aegis_common::keepers::AccountKeeper;
    use aegis_common::types::{BlockInfo, ExecMode};
    use aegis_test_utils::{signed_send_tx, Keyring};

    fn ctx() -> Context {
        Context::new(BlockInfo::default(), ExecMode::Deliver)
    }

    #[test]
    fn valid_signature_increments_the_sequence() {
        let keys = Keyring::new();
        let mut state = InMemoryLedger::new();
        let from = keys.address(0);
        state.new_account_with_address(&from);

        let tx = signed_send_tx(&keys, 0, &vec![2; 20], 5, 0, "aegis-1");
        let mut ctx = ctx();
        verify_signatures(&mut ctx, &mut state, &tx, SignMode::Direct, &ChainSigner, "aegis-1", false)
            .unwrap();
        assert_eq!(state.get_account(&from).unwrap().sequence(), 1);
        assert!(ctx.gas_meter.consumed() >= PublicKey::VERIFY_GAS_COST);
    }

    #[test]
    fn nonce_gap_or_replay_is_invalid_sequence() {
        let keys = Keyring::new();
        let mut state = InMemoryLedger::new();
        let from = keys.address(0);
        state.new_account_with_address(&from);

        // Declared sequence 3 against current sequence 0
        let tx = signed_send_tx(&keys, 0, &vec![2; 20], 5, 3, "aegis-1");
        let err = verify_signatures(
            &mut ctx(), &mut state, &tx, SignMode::Direct, &ChainSigner, "aegis-1", false,
        )
        .unwrap_err();
        assert_eq!(err, AnteError::InvalidSequence { expected: 0, got: 3 });
        assert_eq!(state.get_account(&from).unwrap().sequence(), 0);
    }

    #[test]
    fn wrong_chain_id_fails_verification() {
        let keys = Keyring::new();
        let mut state = InMemoryLedger::new();
        state.new_account_with_address(&keys.address(0));

        let tx = signed_send_tx(&keys, 0, &vec![2; 20], 5, 0, "other-chain");
        assert!(matches!(
            verify_signatures(
                &mut ctx(), &mut state, &tx, SignMode::Direct, &ChainSigner, "aegis-1", false,
            ),
            Err(AnteError::Unauthorized(_))
        ));
    }

    #[test]
    fn simulation_skips_signature_but_not_sequence_checks() {
        let keys = Keyring::new();
        let mut state = InMemoryLedger::new();
        let from = keys.address(0);
        state.new_account_with_address(&from);

        // Signed for the wrong chain, accepted under simulation
        let tx = signed_send_tx(&keys, 0, &vec![2; 20], 5, 0, "other-chain");
        verify_signatures(&mut ctx(), &mut state, &tx, SignMode::Direct, &ChainSigner, "aegis-1", true)
            .unwrap();
        assert_eq!(state.get_account(&from).unwrap().sequence(), 1);
    }

    #[test]
    fn missing_account_is_unknown_address() {
        let keys = Keyring::new();
        let mut state = InMemoryLedger::new();
        let tx = signed_send_tx(&keys, 0, &vec![2; 20], 5, 0, "aegis-1");
        assert!(matches!(
            verify_signatures(
                &mut ctx(), &mut state, &tx, SignMode::Direct, &ChainSigner, "aegis-1", false,
            ),
            Err(AnteError::UnknownAddress(_))
        ));
    }
}
