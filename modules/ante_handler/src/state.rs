//! Admission state held by the bus module: the ledger view, chain
//! parameters and the per-block admission driver

use crate::in_memory_ledger::InMemoryLedger;
use crate::rewards::Speculative;
use crate::router;
use crate::sigverify::ChainSigner;
use crate::AnteHandlerConfig;
use aegis_common::context::Context;
use aegis_common::messages::{
    AdmissionResultMessage, AdmissionStatus, ChainParamsMessage, SubmittedTxsMessage,
};
use aegis_common::params::AnteOptions;
use aegis_common::types::{BlockInfo, ExecMode};
use std::sync::Arc;
use tracing::{debug, info};

pub struct State {
    pub config: Arc<AnteHandlerConfig>,
    ledger: InMemoryLedger,
    options: AnteOptions,
}

impl State {
    pub fn new(config: Arc<AnteHandlerConfig>) -> Self {
        Self {
            config,
            ledger: InMemoryLedger::new(),
            options: AnteOptions::default(),
        }
    }

    /// Absorb a chain parameters snapshot
    pub fn process_params(&mut self, blk: &BlockInfo, params: ChainParamsMessage) {
        info!("Chain parameters updated at height {}", blk.height);
        self.ledger.set_evm_params(params.evm);
        self.ledger.set_fee_market_params(params.fee_market);
        self.ledger.set_chain_config(params.chain_config);
    }

    /// Admit a block's worth of submitted transactions.
    ///
    /// Each transaction runs against a speculative branch of the ledger:
    /// admitted transactions commit their side effects (fee deduction,
    /// sequence increments, account creation), rejected ones leave the
    /// ledger untouched. Block-gas accounting carries across the batch.
    pub fn process_transactions(
        &mut self,
        blk: &BlockInfo,
        submitted: &SubmittedTxsMessage,
    ) -> AdmissionResultMessage {
        let mut results = AdmissionResultMessage::default();
        let mut block_gas_wanted = 0u64;

        for (index, tx) in submitted.txs.iter().enumerate() {
            let mut ctx = Context::new(blk.clone(), ExecMode::Check);
            ctx.tx_index = index as u64;
            ctx.block_gas_wanted = block_gas_wanted;

            let mut branch = Speculative::new(&mut self.ledger);
            let result = router::run_ante(
                &mut ctx,
                branch.state_mut(),
                tx,
                &self.options,
                &ChainSigner,
                false,
            );

            match result {
                Ok(()) => {
                    branch.commit();
                    block_gas_wanted = ctx.block_gas_wanted;
                    results.results.push(AdmissionStatus::Admitted {
                        priority: ctx.priority,
                        gas_wanted: tx.auth_info.fee.gas_limit,
                    });
                }
                Err(e) => {
                    branch.discard();
                    debug!("Transaction {index} rejected: {e}");
                    results.results.push(AdmissionStatus::Rejected(e));
                }
            }
        }

        results
    }
}
