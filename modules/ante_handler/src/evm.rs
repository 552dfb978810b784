//! EVM ante chain
//! Single-pass pipeline for Ethereum-formatted transactions: one shared
//! FeeContext, strict stage order, short-circuit on first error

use crate::fees::{self, FeeContext};
use crate::sigverify::TxSigner;
use crate::vesting::{self, ExpenseTrackers};
use aegis_common::coin::{Coin, Coins, DecCoin};
use aegis_common::context::Context;
use aegis_common::errors::AnteError;
use aegis_common::events::{
    Event, ATTR_ETH_TX_HASH, ATTR_FEE, ATTR_FEE_PAYER, ATTR_TX_INDEX, EVENT_TYPE_ETHEREUM_TX,
    EVENT_TYPE_TX_FEE,
};
use aegis_common::gas::{GasMeter, StorageGasConfig};
use aegis_common::keepers::Ledger;
use aegis_common::msgs::{EthTxData, Msg, MsgEthereumTx};
use aegis_common::params::AnteOptions;
use aegis_common::tx::Tx;
use aegis_common::types::{display_address, Address, FEE_COLLECTOR};
use tracing::debug;

/// Working state shared by the stages of one EVM admission run
pub struct EvmPipeline<'a, S: Ledger> {
    pub ctx: &'a mut Context,
    pub state: &'a mut S,
    pub tx: &'a Tx,
    pub options: &'a AnteOptions,
    pub signer: &'a dyn TxSigner,
    pub simulate: bool,
}

/// Run the EVM admission chain
pub fn run<S: Ledger>(p: &mut EvmPipeline<'_, S>) -> Result<(), AnteError> {
    validate_envelope(p.tx)?;

    // Stage 2: infinite gas meter and free storage gas - EVM gas accounting
    // is independent of the host chain's storage-gas accounting
    p.ctx.gas_meter = GasMeter::infinite();
    p.ctx.storage_gas = StorageGasConfig::free();
    let mut fee_ctx = FeeContext::new(p.ctx, p.state);
    let mut trackers = ExpenseTrackers::new();

    // Declared gas across messages, before any check-mode capping
    let mut declared_gas: u64 = 0;

    for msg in &p.tx.body.messages {
        let Msg::EthereumTx(eth) = msg else {
            return Err(AnteError::InvalidType(format!(
                "expected an Ethereum message, got {}",
                msg.type_url()
            )));
        };
        declared_gas = declared_gas.saturating_add(eth.data.gas_limit());
        admit_message(p, &mut fee_ctx, &mut trackers, eth)?;
    }

    cross_check_auth_info(p.tx, &fee_ctx, declared_gas)?;

    // Final block-gas accounting for this building pass
    p.ctx.block_gas_wanted = p.ctx.block_gas_wanted.saturating_add(fee_ctx.gas_wanted);
    if p.ctx.block_gas_wanted > p.ctx.block.gas_limit {
        return Err(AnteError::OutOfGas(format!(
            "block gas wanted {} exceeds block gas limit {}",
            p.ctx.block_gas_wanted, p.ctx.block.gas_limit
        )));
    }

    p.ctx.priority = if fee_ctx.min_priority == i64::MAX {
        0
    } else {
        fee_ctx.min_priority
    };
    debug!("EVM tx admitted with priority {}", p.ctx.priority);
    Ok(())
}

/// Stage 1: Cosmos-side envelope fields that must be empty for an Ethereum
/// transaction
fn validate_envelope(tx: &Tx) -> Result<(), AnteError> {
    if tx.body.messages.is_empty() {
        return Err(AnteError::InvalidRequest("transaction has no messages".to_string()));
    }
    if !tx.body.memo.is_empty() {
        return Err(AnteError::InvalidRequest(
            "memo must be empty for an Ethereum transaction".to_string(),
        ));
    }
    if tx.body.timeout_height != 0 {
        return Err(AnteError::InvalidRequest(
            "timeout height must be unset for an Ethereum transaction".to_string(),
        ));
    }
    if !tx.signatures.is_empty() || !tx.auth_info.signer_infos.is_empty() {
        return Err(AnteError::InvalidRequest(
            "an Ethereum transaction carries its signature in the message payload".to_string(),
        ));
    }
    if tx.auth_info.fee.payer.is_some() || tx.auth_info.fee.granter.is_some() {
        return Err(AnteError::InvalidRequest(
            "fee payer and granter must be unset for an Ethereum transaction".to_string(),
        ));
    }
    Ok(())
}

/// Stages 3-13 for one Ethereum message
fn admit_message<S: Ledger>(
    p: &mut EvmPipeline<'_, S>,
    fee_ctx: &mut FeeContext,
    trackers: &mut ExpenseTrackers,
    eth: &MsgEthereumTx,
) -> Result<(), AnteError> {
    let data = &eth.data;

    // Stage 3: node-local mempool minimum; retired once the base fee is in
    // force, and never enforced outside CheckTx or under simulation
    if !p.simulate && fee_ctx.base_fee.is_none() && p.ctx.mode.is_check() {
        check_mempool_fee(p.options, fee_ctx, data)?;
    }

    // Stage 4: consensus-wide minimum over the effective fee
    if !p.simulate {
        fees::check_global_fee_evm(data, fee_ctx)?;
    }

    // Stage 5: message and parameter validation
    if eth.from.is_some() {
        return Err(AnteError::InvalidRequest(
            "sender must be empty on the wire; it is recovered from the signature".to_string(),
        ));
    }
    if data.is_contract_creation() && !fee_ctx.evm_params.enable_create {
        return Err(AnteError::CreateDisabled);
    }
    if !data.is_contract_creation() && !fee_ctx.evm_params.enable_call {
        return Err(AnteError::CallDisabled);
    }

    // Stage 6: sender recovery
    if !data.is_protected() && !fee_ctx.evm_params.allow_unprotected_txs {
        return Err(AnteError::Unauthorized(
            "unprotected Ethereum transactions are not allowed on this chain".to_string(),
        ));
    }
    let sender = p.signer.recover_eth(data)?;

    // Stage 7: sender account and balance
    let account = match p.state.get_account(&sender) {
        Some(account) if account.is_contract() => {
            return Err(AnteError::InvalidType(format!(
                "sender {} is a contract account",
                display_address(&sender)
            )));
        }
        Some(account) => account,
        None => p.state.new_account_with_address(&sender),
    };
    check_sender_balance(p.state, &sender, data)?;

    // Stage 8: transferability under the VM's own transfer rule
    if let (EthTxData::DynamicFee(tx), Some(base_fee)) = (data, fee_ctx.base_fee) {
        if tx.gas_fee_cap < base_fee {
            return Err(AnteError::InsufficientFee(format!(
                "fee cap {} below base fee {base_fee}",
                tx.gas_fee_cap
            )));
        }
    }
    if !p.state.can_transfer(&sender, data.value()) {
        return Err(AnteError::InsufficientFunds(format!(
            "{} cannot transfer {}",
            display_address(&sender),
            data.value()
        )));
    }

    // Stage 9: vesting spend budget
    vesting::check_expense(
        p.state,
        &account,
        trackers,
        data.value(),
        &fee_ctx.evm_params.evm_denom,
        p.ctx.block.time,
    )?;

    // Stage 10: verified fee consumption
    let height = p.ctx.block.height;
    let fee = fees::verify_fee(
        data,
        fee_ctx.base_fee,
        fee_ctx.chain_config.is_homestead(height),
        fee_ctx.chain_config.is_istanbul(height),
    )?;
    if fee > 0 {
        let fee_coins = Coins::from_coin(Coin::new(&fee_ctx.evm_params.evm_denom, fee));
        p.state.send_coins_to_module(&sender, FEE_COLLECTOR, &fee_coins)?;
        p.ctx.emit(
            Event::new(EVENT_TYPE_TX_FEE)
                .attr(ATTR_FEE, &fee_coins.to_string())
                .attr(ATTR_FEE_PAYER, &display_address(&sender)),
        );
    }
    fee_ctx.fee_total = fee_ctx
        .fee_total
        .checked_add(fee)
        .ok_or_else(|| AnteError::InvalidCoins("cumulative fee overflows".to_string()))?;

    // Stage 11: nonce
    increment_nonce(p.state, &sender, data.nonce())?;

    // Stage 12: gas-wanted accounting against the block budget
    let mut gas_wanted = data.gas_limit();
    if p.ctx.mode.is_check()
        && p.options.max_tx_gas_wanted != 0
        && gas_wanted > p.options.max_tx_gas_wanted
    {
        gas_wanted = p.options.max_tx_gas_wanted;
    }
    if gas_wanted > p.ctx.block_gas_remaining().saturating_sub(fee_ctx.gas_wanted) {
        return Err(AnteError::OutOfGas(format!(
            "gas wanted {gas_wanted} exceeds remaining block gas"
        )));
    }
    fee_ctx.gas_wanted = fee_ctx.gas_wanted.saturating_add(gas_wanted);
    fee_ctx.min_priority = fee_ctx.min_priority.min(fees::eth_tx_priority(data, fee_ctx.base_fee));

    // Stage 13: indexed hash event for downstream consumers
    p.ctx.emit(
        Event::new(EVENT_TYPE_ETHEREUM_TX)
            .attr(ATTR_ETH_TX_HASH, &hex::encode(data.hash()))
            .attr(ATTR_TX_INDEX, &p.ctx.tx_index.to_string()),
    );
    Ok(())
}

fn check_mempool_fee(
    options: &AnteOptions,
    fee_ctx: &FeeContext,
    data: &EthTxData,
) -> Result<(), AnteError> {
    let min: Vec<DecCoin> = options
        .mempool_min_gas_prices
        .iter()
        .filter(|p| p.denom == fee_ctx.evm_params.evm_denom)
        .cloned()
        .collect();
    let fee = fees::effective_fee(data, fee_ctx.base_fee)?;
    let fee_coins = Coins::from_coin(Coin::new(&fee_ctx.evm_params.evm_denom, fee));
    fees::check_mempool_fee(&fee_coins, data.gas_limit(), &min)
}

/// The sender must afford value plus the worst-case fee (fee cap over the
/// whole gas limit)
fn check_sender_balance<S: Ledger>(
    state: &S,
    sender: &Address,
    data: &EthTxData,
) -> Result<(), AnteError> {
    let max_fee = data
        .gas_price()
        .checked_mul(data.gas_limit() as u128)
        .ok_or_else(|| AnteError::InvalidCoins("transaction cost overflows".to_string()))?;
    let cost = max_fee
        .checked_add(data.value())
        .ok_or_else(|| AnteError::InvalidCoins("transaction cost overflows".to_string()))?;
    let balance = state.evm_balance(sender);
    if balance < cost {
        return Err(AnteError::InsufficientFunds(format!(
            "sender {} has {balance}, needs {cost}",
            display_address(sender)
        )));
    }
    Ok(())
}

/// The declared nonce must equal the account's sequence exactly; the
/// sequence is left at old+1 on success and unchanged on failure
fn increment_nonce<S: Ledger>(
    state: &mut S,
    sender: &Address,
    nonce: u64,
) -> Result<(), AnteError> {
    let mut account =
        state.get_account(sender).ok_or_else(|| AnteError::unknown_address(sender))?;
    if nonce != account.sequence() {
        return Err(AnteError::InvalidSequence {
            expected: account.sequence(),
            got: nonce,
        });
    }
    account.base_mut().sequence += 1;
    state.set_account(account);
    Ok(())
}

/// The Cosmos envelope's declared fee and gas must match what the Ethereum
/// payload actually implies - defense against envelope/payload mismatch
fn cross_check_auth_info(tx: &Tx, fee_ctx: &FeeContext, declared_gas: u64) -> Result<(), AnteError> {
    let auth_fee = &tx.auth_info.fee;
    if auth_fee.gas_limit != declared_gas {
        return Err(AnteError::InvalidRequest(format!(
            "envelope gas limit {} does not match payload gas {declared_gas}",
            auth_fee.gas_limit
        )));
    }
    let expected = if fee_ctx.fee_total == 0 {
        Coins::new()
    } else {
        Coins::from_coin(Coin::new(&fee_ctx.evm_params.evm_denom, fee_ctx.fee_total))
    };
    if auth_fee.amount != expected {
        return Err(AnteError::InvalidRequest(format!(
            "envelope fee {} does not match payload fee {expected}",
            auth_fee.amount
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory_ledger::InMemoryLedger;
    use crate::sigverify::ChainSigner;
    use aegis_common::dec::Dec;
    use aegis_common::keepers::{AccountKeeper, BankKeeper};
    use aegis_common::msgs::LegacyTx;
    use aegis_common::params::{EvmParams, FeeMarketParams};
    use aegis_common::types::ExecMode;
    use aegis_test_utils::{eth_tx_envelope, sign_eth_tx, test_block, Keyring};

    const GAS: u64 = 21_000;
    const GAS_PRICE: u128 = 10;
    const FEE: u128 = GAS_PRICE * GAS as u128;

    fn free_market() -> FeeMarketParams {
        FeeMarketParams {
            no_base_fee: true,
            min_gas_price: Dec::zero(),
            ..Default::default()
        }
    }

    fn transfer(keys: &Keyring, nonce: u64, value: u128) -> EthTxData {
        sign_eth_tx(
            keys,
            0,
            EthTxData::Legacy(LegacyTx {
                nonce,
                gas_price: GAS_PRICE,
                gas_limit: GAS,
                to: Some(vec![2; 20]),
                value,
                chain_id: Some(1),
                ..Default::default()
            }),
        )
    }

    fn run_tx(
        state: &mut InMemoryLedger,
        tx: &Tx,
        mode: ExecMode,
        options: &AnteOptions,
    ) -> (Context, Result<(), AnteError>) {
        let mut ctx = Context::new(test_block(), mode);
        let mut pipeline = EvmPipeline {
            ctx: &mut ctx,
            state,
            tx,
            options,
            signer: &ChainSigner,
            simulate: false,
        };
        let result = run(&mut pipeline);
        (ctx, result)
    }

    #[test]
    fn a_funded_transfer_is_admitted() {
        let keys = Keyring::new();
        let mut state = InMemoryLedger::new();
        state.set_fee_market_params(free_market());
        let sender = keys.address(0);
        state.set_balance(&sender, "aaeg", FEE + 500);

        let data = transfer(&keys, 0, 500);
        let tx = eth_tx_envelope(data, "aaeg", FEE, GAS);
        let (ctx, result) = run_tx(&mut state, &tx, ExecMode::Deliver, &AnteOptions::default());
        result.unwrap();

        // Account was created, fee deducted, nonce advanced
        assert_eq!(state.get_account(&sender).unwrap().sequence(), 1);
        assert_eq!(state.get_balance(&sender, "aaeg").amount, 500);
        assert!(ctx.events.iter().any(|e| e.kind == EVENT_TYPE_ETHEREUM_TX));
        assert_eq!(ctx.block_gas_wanted, GAS);
    }

    #[test]
    fn balance_one_unit_short_is_insufficient_funds() {
        let keys = Keyring::new();
        let mut state = InMemoryLedger::new();
        state.set_fee_market_params(free_market());
        let sender = keys.address(0);

        // Exactly value + fee passes
        state.set_balance(&sender, "aaeg", FEE + 500);
        let tx = eth_tx_envelope(transfer(&keys, 0, 500), "aaeg", FEE, GAS);
        run_tx(&mut state, &tx, ExecMode::Deliver, &AnteOptions::default()).1.unwrap();

        // One short fails
        let mut state = InMemoryLedger::new();
        state.set_fee_market_params(free_market());
        state.set_balance(&sender, "aaeg", FEE + 499);
        let (_, result) = run_tx(&mut state, &tx, ExecMode::Deliver, &AnteOptions::default());
        assert!(matches!(result, Err(AnteError::InsufficientFunds(_))));
    }

    #[test]
    fn dirty_envelope_fields_are_rejected() {
        let keys = Keyring::new();
        let mut state = InMemoryLedger::new();
        state.set_fee_market_params(free_market());

        let mut tx = eth_tx_envelope(transfer(&keys, 0, 0), "aaeg", FEE, GAS);
        tx.body.memo = "hello".to_string();
        let (_, result) = run_tx(&mut state, &tx, ExecMode::Deliver, &AnteOptions::default());
        assert!(matches!(result, Err(AnteError::InvalidRequest(_))));
    }

    #[test]
    fn prefilled_sender_is_rejected() {
        let keys = Keyring::new();
        let mut state = InMemoryLedger::new();
        state.set_fee_market_params(free_market());
        state.set_balance(&keys.address(0), "aaeg", FEE);

        let mut tx = eth_tx_envelope(transfer(&keys, 0, 0), "aaeg", FEE, GAS);
        let Msg::EthereumTx(eth) = &mut tx.body.messages[0] else {
            unreachable!()
        };
        eth.from = Some(keys.address(0));
        let (_, result) = run_tx(&mut state, &tx, ExecMode::Deliver, &AnteOptions::default());
        assert!(matches!(result, Err(AnteError::InvalidRequest(_))));
    }

    #[test]
    fn disabled_contract_creation_is_policy_blocked() {
        let keys = Keyring::new();
        let mut state = InMemoryLedger::new();
        state.set_fee_market_params(free_market());
        state.set_evm_params(EvmParams {
            enable_create: false,
            ..Default::default()
        });
        state.set_balance(&keys.address(0), "aaeg", u128::MAX / 2);

        let create = sign_eth_tx(
            &keys,
            0,
            EthTxData::Legacy(LegacyTx {
                gas_price: GAS_PRICE,
                gas_limit: 60_000,
                to: None,
                chain_id: Some(1),
                ..Default::default()
            }),
        );
        let tx = eth_tx_envelope(create, "aaeg", GAS_PRICE * 60_000, 60_000);
        let (_, result) = run_tx(&mut state, &tx, ExecMode::Deliver, &AnteOptions::default());
        assert!(matches!(result, Err(AnteError::CreateDisabled)));
    }

    #[test]
    fn unprotected_signatures_need_explicit_permission() {
        let keys = Keyring::new();
        let mut state = InMemoryLedger::new();
        state.set_fee_market_params(free_market());
        state.set_balance(&keys.address(0), "aaeg", FEE);

        let unprotected = sign_eth_tx(
            &keys,
            0,
            EthTxData::Legacy(LegacyTx {
                gas_price: GAS_PRICE,
                gas_limit: GAS,
                to: Some(vec![2; 20]),
                chain_id: None,
                ..Default::default()
            }),
        );
        let tx = eth_tx_envelope(unprotected, "aaeg", FEE, GAS);
        let (_, result) = run_tx(&mut state, &tx, ExecMode::Deliver, &AnteOptions::default());
        assert!(matches!(result, Err(AnteError::Unauthorized(_))));

        state.set_evm_params(EvmParams {
            allow_unprotected_txs: true,
            ..Default::default()
        });
        let (_, result) = run_tx(&mut state, &tx, ExecMode::Deliver, &AnteOptions::default());
        result.unwrap();
    }

    #[test]
    fn wrong_nonce_is_invalid_sequence() {
        let keys = Keyring::new();
        let mut state = InMemoryLedger::new();
        state.set_fee_market_params(free_market());
        state.set_balance(&keys.address(0), "aaeg", FEE * 10);

        let tx = eth_tx_envelope(transfer(&keys, 7, 0), "aaeg", FEE, GAS);
        let (_, result) = run_tx(&mut state, &tx, ExecMode::Deliver, &AnteOptions::default());
        assert_eq!(result.unwrap_err(), AnteError::InvalidSequence { expected: 0, got: 7 });
    }

    #[test]
    fn envelope_fee_mismatch_is_rejected() {
        let keys = Keyring::new();
        let mut state = InMemoryLedger::new();
        state.set_fee_market_params(free_market());
        state.set_balance(&keys.address(0), "aaeg", FEE * 10);

        // Declared envelope fee disagrees with the payload's verified fee
        let tx = eth_tx_envelope(transfer(&keys, 0, 0), "aaeg", FEE - 1, GAS);
        let (_, result) = run_tx(&mut state, &tx, ExecMode::Deliver, &AnteOptions::default());
        assert!(matches!(result, Err(AnteError::InvalidRequest(_))));
    }

    #[test]
    fn gas_above_the_block_limit_is_out_of_gas() {
        let keys = Keyring::new();
        let mut state = InMemoryLedger::new();
        state.set_fee_market_params(free_market());
        state.set_balance(&keys.address(0), "aaeg", u128::MAX / 2);

        let big = sign_eth_tx(
            &keys,
            0,
            EthTxData::Legacy(LegacyTx {
                gas_price: GAS_PRICE,
                gas_limit: 200_000_000,
                to: Some(vec![2; 20]),
                chain_id: Some(1),
                ..Default::default()
            }),
        );
        let tx = eth_tx_envelope(big, "aaeg", GAS_PRICE * 200_000_000, 200_000_000);
        let (_, result) = run_tx(&mut state, &tx, ExecMode::Deliver, &AnteOptions::default());
        assert!(matches!(result, Err(AnteError::OutOfGas(_))));
    }

    #[test]
    fn check_mode_caps_recorded_gas_wanted() {
        let keys = Keyring::new();
        let mut state = InMemoryLedger::new();
        state.set_fee_market_params(free_market());
        state.set_balance(&keys.address(0), "aaeg", u128::MAX / 2);
        let options = AnteOptions {
            max_tx_gas_wanted: 25_000,
            ..Default::default()
        };

        let big = sign_eth_tx(
            &keys,
            0,
            EthTxData::Legacy(LegacyTx {
                gas_price: GAS_PRICE,
                gas_limit: 1_000_000,
                to: Some(vec![2; 20]),
                chain_id: Some(1),
                ..Default::default()
            }),
        );
        let tx = eth_tx_envelope(big, "aaeg", GAS_PRICE * 1_000_000, 1_000_000);
        let (ctx, result) = run_tx(&mut state, &tx, ExecMode::Check, &options);
        result.unwrap();
        assert_eq!(ctx.block_gas_wanted, 25_000);
    }

    #[test]
    fn fee_cap_below_base_fee_is_rejected() {
        let keys = Keyring::new();
        let mut state = InMemoryLedger::new();
        state.set_fee_market_params(FeeMarketParams {
            no_base_fee: false,
            base_fee: 100,
            enable_height: 0,
            min_gas_price: Dec::zero(),
        });
        state.set_balance(&keys.address(0), "aaeg", u128::MAX / 2);

        let low_cap = sign_eth_tx(
            &keys,
            0,
            EthTxData::DynamicFee(aegis_common::msgs::DynamicFeeTx {
                gas_fee_cap: 99,
                gas_tip_cap: 1,
                gas_limit: GAS,
                to: Some(vec![2; 20]),
                chain_id: Some(1),
                ..Default::default()
            }),
        );
        let tx = eth_tx_envelope(low_cap, "aaeg", 99 * GAS as u128, GAS);
        let (_, result) = run_tx(&mut state, &tx, ExecMode::Deliver, &AnteOptions::default());
        assert!(matches!(result, Err(AnteError::InsufficientFee(_))));
    }
}
