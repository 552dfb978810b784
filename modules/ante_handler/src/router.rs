//! Ante router
//! Classifies each transaction by its extension options and dispatches it
//! to the matching admission chain, converting panics into typed errors

use crate::cosmos::{self, Pipeline};
use crate::evm::{self, EvmPipeline};
use crate::sigverify::{SignMode, TxSigner};
use aegis_common::context::Context;
use aegis_common::errors::AnteError;
use aegis_common::keepers::Ledger;
use aegis_common::params::AnteOptions;
use aegis_common::tx::{Tx, EXT_OPT_ETHEREUM_TX, EXT_OPT_WEB3_TX};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

/// Which admission chain a transaction belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxClass {
    /// Ethereum-formatted transaction
    Evm,

    /// Cosmos transaction signed as EIP-712 typed data
    Eip712Cosmos,

    /// Plain Cosmos transaction
    Cosmos,
}

/// Classify a transaction by the first extension option
pub fn classify(tx: &Tx) -> Result<TxClass, AnteError> {
    match tx.first_extension_url() {
        Some(EXT_OPT_ETHEREUM_TX) => Ok(TxClass::Evm),
        Some(EXT_OPT_WEB3_TX) => Ok(TxClass::Eip712Cosmos),
        None => Ok(TxClass::Cosmos),
        Some(other) => Err(AnteError::UnknownExtensionOptions(other.to_string())),
    }
}

/// The pipeline's single entry point.
///
/// Runs the admission chain selected by the transaction's extension options.
/// On success the context carries the accumulated events, gas and priority;
/// on failure the caller must discard the whole per-transaction context.
/// A panic anywhere inside a chain is recovered into `AnteError::Internal`
/// rather than crashing the caller.
pub fn run_ante<S: Ledger>(
    ctx: &mut Context,
    state: &mut S,
    tx: &Tx,
    options: &AnteOptions,
    signer: &dyn TxSigner,
    simulate: bool,
) -> Result<(), AnteError> {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        route(ctx, state, tx, options, signer, simulate)
    }));
    match outcome {
        Ok(result) => result,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!("Admission pipeline panicked: {reason}");
            Err(AnteError::Internal(reason))
        }
    }
}

fn route<S: Ledger>(
    ctx: &mut Context,
    state: &mut S,
    tx: &Tx,
    options: &AnteOptions,
    signer: &dyn TxSigner,
    simulate: bool,
) -> Result<(), AnteError> {
    match classify(tx)? {
        TxClass::Evm => evm::run(&mut EvmPipeline {
            ctx,
            state,
            tx,
            options,
            signer,
            simulate,
        }),
        TxClass::Eip712Cosmos => cosmos::run(&mut Pipeline {
            ctx,
            state,
            tx,
            options,
            signer,
            sign_mode: SignMode::Eip712,
            simulate,
        }),
        TxClass::Cosmos => cosmos::run(&mut Pipeline {
            ctx,
            state,
            tx,
            options,
            signer,
            sign_mode: SignMode::Direct,
            simulate,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory_ledger::InMemoryLedger;
    use aegis_common::crypto::{PublicKey, Signature};
    use aegis_common::msgs::EthTxData;
    use aegis_common::tx::ExtensionOption;
    use aegis_common::types::ExecMode;
    use aegis_test_utils::test_block;

    #[test]
    fn classification_follows_the_first_extension_option() {
        let mut tx = Tx::default();
        assert_eq!(classify(&tx), Ok(TxClass::Cosmos));

        tx.body.extension_options = vec![ExtensionOption::ethereum_tx()];
        assert_eq!(classify(&tx), Ok(TxClass::Evm));

        tx.body.extension_options = vec![ExtensionOption::web3_tx()];
        assert_eq!(classify(&tx), Ok(TxClass::Eip712Cosmos));

        tx.body.extension_options = vec![ExtensionOption {
            type_url: "/something.else.v1.Marker".to_string(),
        }];
        assert_eq!(
            classify(&tx),
            Err(AnteError::UnknownExtensionOptions(
                "/something.else.v1.Marker".to_string()
            ))
        );
    }

    /// Signer that panics, standing in for an unexpected runtime fault deep
    /// inside a chain
    struct PanickingSigner;

    impl TxSigner for PanickingSigner {
        fn verify_cosmos(
            &self,
            _mode: SignMode,
            _digest: &[u8],
            _pub_key: &PublicKey,
            _signature: &Signature,
        ) -> bool {
            panic!("signer fault")
        }

        fn recover_eth(&self, _data: &EthTxData) -> Result<Vec<u8>, AnteError> {
            panic!("signer fault")
        }
    }

    #[test]
    fn a_panic_inside_a_chain_becomes_an_internal_error() {
        let mut state = InMemoryLedger::new();
        let mut ctx = Context::new(test_block(), ExecMode::Deliver);

        // A well-formed Ethereum envelope reaches sender recovery, where the
        // faulty signer panics
        let mut tx = Tx::default();
        tx.body.extension_options = vec![ExtensionOption::ethereum_tx()];
        tx.body.messages.push(aegis_common::msgs::Msg::EthereumTx(
            aegis_common::msgs::MsgEthereumTx {
                data: EthTxData::Legacy(aegis_common::msgs::LegacyTx {
                    gas_price: 1,
                    gas_limit: 21_000,
                    to: Some(vec![2; 20]),
                    chain_id: Some(1),
                    ..Default::default()
                }),
                from: None,
            },
        ));
        tx.auth_info.fee.gas_limit = 21_000;

        let result = run_ante(
            &mut ctx,
            &mut state,
            &tx,
            &AnteOptions::default(),
            &PanickingSigner,
            false,
        );
        assert!(matches!(result, Err(AnteError::Internal(_))));
    }
}
