//! Cosmos ante chain
//! Ordered stage list for standard (non-EVM) transactions, executed by a
//! fixed driver loop that stops at the first violated stage

use crate::sigverify::{self, SignMode, TxSigner};
use crate::{authz, fee_deduct, fees, vesting};
use aegis_common::context::Context;
use aegis_common::errors::AnteError;
use aegis_common::gas::GasMeter;
use aegis_common::keepers::{AccountKeeper, Ledger};
use aegis_common::msgs::Msg;
use aegis_common::params::AnteOptions;
use aegis_common::tx::Tx;
use tracing::debug;

/// Working state shared by the stages of one admission run
pub struct Pipeline<'a, S: Ledger> {
    pub ctx: &'a mut Context,
    pub state: &'a mut S,
    pub tx: &'a Tx,
    pub options: &'a AnteOptions,
    pub signer: &'a dyn TxSigner,
    pub sign_mode: SignMode,
    pub simulate: bool,
}

type Stage<S> = fn(&mut Pipeline<'_, S>) -> Result<(), AnteError>;

/// Run the Cosmos admission chain
pub fn run<S: Ledger>(pipeline: &mut Pipeline<'_, S>) -> Result<(), AnteError> {
    let stages: [Stage<S>; 7] = [
        reject_messages,
        setup,
        check_fees,
        check_messages,
        verify_signatures,
        deduct_fee,
        assign_priority,
    ];
    for stage in stages {
        stage(pipeline)?;
    }
    Ok(())
}

/// Stage 1: messages on the reject list never enter through this chain
fn reject_messages<S: Ledger>(p: &mut Pipeline<'_, S>) -> Result<(), AnteError> {
    if p.tx.body.messages.is_empty() {
        return Err(AnteError::InvalidRequest("transaction has no messages".to_string()));
    }
    for msg in &p.tx.body.messages {
        if p.options.rejected_msgs.iter().any(|url| url == msg.type_url()) {
            return Err(AnteError::InvalidType(format!(
                "message type {} is not supported in a Cosmos transaction",
                msg.type_url()
            )));
        }
    }
    Ok(())
}

/// Stage 2: gas meter and envelope timing
fn setup<S: Ledger>(p: &mut Pipeline<'_, S>) -> Result<(), AnteError> {
    let timeout = p.tx.body.timeout_height;
    if timeout != 0 && p.ctx.block.height > timeout {
        return Err(AnteError::InvalidRequest(format!(
            "transaction timed out at height {timeout}, current {}",
            p.ctx.block.height
        )));
    }
    p.ctx.gas_meter = if p.simulate {
        GasMeter::infinite()
    } else {
        GasMeter::limited(p.tx.auth_info.fee.gas_limit)
    };
    Ok(())
}

/// Stage 3: node-local mempool minimum in CheckTx, global minimum always,
/// both relaxed under simulation
fn check_fees<S: Ledger>(p: &mut Pipeline<'_, S>) -> Result<(), AnteError> {
    if p.simulate {
        return Ok(());
    }
    let fee = &p.tx.auth_info.fee;
    if p.ctx.mode.is_check() {
        fees::check_mempool_fee(&fee.amount, fee.gas_limit, &p.options.mempool_min_gas_prices)?;
    }
    fees::check_global_fee_cosmos(
        &fee.amount,
        fee.gas_limit,
        p.state.fee_market_params().min_gas_price,
        &p.state.bond_denom(),
    )
}

/// Stage 4: per-message policy - validator commission floors, vesting
/// delegation limits (one authz-exec level deep) and the authz limiter
fn check_messages<S: Ledger>(p: &mut Pipeline<'_, S>) -> Result<(), AnteError> {
    for msg in &p.tx.body.messages {
        check_message(p, msg)?;
        if let Msg::Exec(exec) = msg {
            // One level of authz unwrapping for the per-message rules; the
            // depth limiter below covers arbitrary nesting
            for inner in &exec.msgs {
                check_message(p, inner)?;
            }
        }
    }
    authz::check_disabled_msgs(&p.tx.body.messages, &p.options.disabled_authz_msgs, true)
}

fn check_message<S: Ledger>(p: &Pipeline<'_, S>, msg: &Msg) -> Result<(), AnteError> {
    match msg {
        Msg::CreateValidator(m) => {
            if m.commission_rate < p.options.min_commission_rate {
                return Err(AnteError::InvalidRequest(format!(
                    "validator commission {} below chain minimum {}",
                    m.commission_rate, p.options.min_commission_rate
                )));
            }
        }
        Msg::EditValidator(m) => {
            if let Some(rate) = m.commission_rate {
                if rate < p.options.min_commission_rate {
                    return Err(AnteError::InvalidRequest(format!(
                        "validator commission {rate} below chain minimum {}",
                        p.options.min_commission_rate
                    )));
                }
            }
        }
        Msg::Delegate(m) => {
            if let Some(account) = p.state.get_account(&m.delegator_address) {
                vesting::check_delegation(
                    &account,
                    &std::iter::once(m.amount.clone()).collect(),
                    p.ctx.block.time,
                )?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Stage 5: signatures, public keys and sequences
fn verify_signatures<S: Ledger>(p: &mut Pipeline<'_, S>) -> Result<(), AnteError> {
    sigverify::verify_signatures(
        p.ctx,
        p.state,
        p.tx,
        p.sign_mode,
        p.signer,
        &p.options.chain_id,
        p.simulate,
    )
}

/// Stage 6: fee deduction with the staking-rewards fallback
fn deduct_fee<S: Ledger>(p: &mut Pipeline<'_, S>) -> Result<(), AnteError> {
    let fee = &p.tx.auth_info.fee;
    let payer = p
        .tx
        .fee_payer()
        .ok_or_else(|| AnteError::InvalidRequest("transaction has no fee payer".to_string()))?;
    fee_deduct::deduct(
        p.ctx,
        p.state,
        &fee.amount,
        &payer,
        fee.granter.as_ref(),
        &p.tx.body.messages,
    )
}

/// Stage 7: mempool ordering hint
fn assign_priority<S: Ledger>(p: &mut Pipeline<'_, S>) -> Result<(), AnteError> {
    let fee = &p.tx.auth_info.fee;
    p.ctx.priority = fees::cosmos_tx_priority(&fee.amount, fee.gas_limit);
    debug!("Cosmos tx admitted with priority {}", p.ctx.priority);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory_ledger::InMemoryLedger;
    use crate::sigverify::ChainSigner;
    use aegis_common::account::{Account, BaseAccount, ClawbackVestingAccount, Period};
    use aegis_common::coin::{Coin, Coins, DecCoin};
    use aegis_common::dec::Dec;
    use aegis_common::keepers::BankKeeper;
    use aegis_common::msgs::{
        EthTxData, LegacyTx, MsgCreateValidator, MsgDelegate, MsgEthereumTx, MsgExec,
    };
    use aegis_common::types::{BlockInfo, ExecMode};
    use aegis_test_utils::{signed_send_tx, signed_tx, Keyring};

    fn run_tx(
        state: &mut InMemoryLedger,
        tx: &Tx,
        mode: ExecMode,
        options: &AnteOptions,
    ) -> (Context, Result<(), AnteError>) {
        let mut ctx = Context::new(BlockInfo::default(), mode);
        let mut pipeline = Pipeline {
            ctx: &mut ctx,
            state,
            tx,
            options,
            signer: &ChainSigner,
            sign_mode: SignMode::Direct,
            simulate: false,
        };
        let result = run(&mut pipeline);
        (ctx, result)
    }

    fn funded_sender(keys: &Keyring, amount: u128) -> InMemoryLedger {
        let mut state = InMemoryLedger::new();
        let from = keys.address(0);
        state.new_account_with_address(&from);
        state.set_balance(&from, "aaeg", amount);
        state
    }

    #[test]
    fn a_valid_send_passes_every_stage() {
        let keys = Keyring::new();
        let mut state = funded_sender(&keys, 1_000_000);
        let tx = signed_send_tx(&keys, 0, &vec![2; 20], 100, 0, "aegis-1");

        let (ctx, result) = run_tx(&mut state, &tx, ExecMode::Deliver, &AnteOptions::default());
        result.unwrap();
        assert_eq!(state.get_account(&keys.address(0)).unwrap().sequence(), 1);
        // Fee of 100aaeg over 100000 gas floors at priority 1
        assert_eq!(ctx.priority, 1);
        assert!(!ctx.events.is_empty());
    }

    #[test]
    fn ethereum_message_is_rejected_outright() {
        let keys = Keyring::new();
        let mut state = funded_sender(&keys, 1_000_000);
        let mut tx = signed_send_tx(&keys, 0, &vec![2; 20], 100, 0, "aegis-1");
        tx.body.messages.push(Msg::EthereumTx(MsgEthereumTx {
            data: EthTxData::Legacy(LegacyTx::default()),
            from: None,
        }));

        let (_, result) = run_tx(&mut state, &tx, ExecMode::Deliver, &AnteOptions::default());
        assert!(matches!(result, Err(AnteError::InvalidType(_))));
        // Short-circuit before signature verification
        assert_eq!(state.get_account(&keys.address(0)).unwrap().sequence(), 0);
    }

    #[test]
    fn empty_transaction_is_invalid() {
        let mut state = InMemoryLedger::new();
        let (_, result) =
            run_tx(&mut state, &Tx::default(), ExecMode::Deliver, &AnteOptions::default());
        assert!(matches!(result, Err(AnteError::InvalidRequest(_))));
    }

    #[test]
    fn expired_timeout_height_fails() {
        let keys = Keyring::new();
        let mut state = funded_sender(&keys, 1_000_000);
        let mut tx = signed_send_tx(&keys, 0, &vec![2; 20], 100, 0, "aegis-1");
        tx.body.timeout_height = 1;

        let mut ctx = Context::new(
            BlockInfo {
                height: 10,
                ..Default::default()
            },
            ExecMode::Deliver,
        );
        let options = AnteOptions::default();
        let mut pipeline = Pipeline {
            ctx: &mut ctx,
            state: &mut state,
            tx: &tx,
            options: &options,
            signer: &ChainSigner,
            sign_mode: SignMode::Direct,
            simulate: false,
        };
        assert!(matches!(run(&mut pipeline), Err(AnteError::InvalidRequest(_))));
    }

    #[test]
    fn mempool_minimum_applies_only_in_check_mode() {
        let keys = Keyring::new();
        let price: Dec = "1".parse().unwrap();
        let options = AnteOptions {
            mempool_min_gas_prices: vec![DecCoin::new("aaeg", price)],
            ..Default::default()
        };

        // Fee of 100aaeg against 100000 gas is far below 1aaeg per gas
        let tx = signed_send_tx(&keys, 0, &vec![2; 20], 100, 0, "aegis-1");

        let mut state = funded_sender(&keys, 1_000_000);
        let (_, result) = run_tx(&mut state, &tx, ExecMode::Check, &options);
        assert!(matches!(result, Err(AnteError::InsufficientFee(_))));

        let mut state = funded_sender(&keys, 1_000_000);
        let (_, result) = run_tx(&mut state, &tx, ExecMode::Deliver, &options);
        result.unwrap();
    }

    #[test]
    fn low_commission_validator_is_refused() {
        let keys = Keyring::new();
        let mut state = funded_sender(&keys, 1_000_000);
        let mut tx = signed_send_tx(&keys, 0, &vec![2; 20], 100, 0, "aegis-1");
        tx.body.messages.push(Msg::CreateValidator(MsgCreateValidator {
            validator_address: keys.address(0),
            commission_rate: Dec::from_atomics(10_000_000_000_000_000), // 1%
            min_self_delegation: 1,
            value: Coin::new("aaeg", 1),
        }));

        let (_, result) = run_tx(&mut state, &tx, ExecMode::Deliver, &AnteOptions::default());
        assert!(matches!(result, Err(AnteError::InvalidRequest(_))));
    }

    #[test]
    fn exec_wrapped_delegation_is_checked_against_vesting() {
        let keys = Keyring::new();
        let mut state = InMemoryLedger::new();
        // Clawback account with nothing vested yet at block time 0
        state.set_account(Account::ClawbackVesting(ClawbackVestingAccount {
            base: BaseAccount {
                address: keys.address(0),
                pub_key: Some(keys.pub_key(0)),
                account_number: 0,
                sequence: 0,
            },
            funder: vec![9; 20],
            start_time: 0,
            lockup_periods: Vec::new(),
            vesting_periods: vec![Period {
                length_secs: 1_000_000,
                amount: Coins::from_coin(Coin::new("aaeg", 100)),
            }],
        }));

        let delegate = Msg::Delegate(MsgDelegate {
            delegator_address: keys.address(0),
            validator_address: vec![9; 20],
            amount: Coin::new("aaeg", 100),
        });
        let tx = signed_tx(
            &keys,
            0,
            vec![Msg::Exec(MsgExec {
                grantee: keys.address(0),
                msgs: vec![delegate],
            })],
            0,
            0,
            "aegis-1",
        );

        let (_, result) = run_tx(&mut state, &tx, ExecMode::Deliver, &AnteOptions::default());
        assert!(matches!(result, Err(AnteError::InsufficientVestedCoins(_))));
    }

    #[test]
    fn fee_is_deducted_and_priority_reflects_gas_price() {
        let keys = Keyring::new();
        let mut state = funded_sender(&keys, 1_000_000);
        // 300000aaeg over 100000 gas: 3 per gas
        let tx = signed_send_tx(&keys, 0, &vec![2; 20], 300_000, 0, "aegis-1");

        let (ctx, result) = run_tx(&mut state, &tx, ExecMode::Deliver, &AnteOptions::default());
        result.unwrap();
        assert_eq!(ctx.priority, 3);
        assert_eq!(state.get_balance(&keys.address(0), "aaeg").amount, 700_000);
    }
}
