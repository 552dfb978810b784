//! Fee arithmetic: minimum-fee checks, EIP-1559 effective prices,
//! intrinsic gas and mempool priority derivation

use aegis_common::coin::{Coin, Coins, DecCoin};
use aegis_common::context::Context;
use aegis_common::dec::Dec;
use aegis_common::errors::AnteError;
use aegis_common::keepers::{EvmKeeper, StakingKeeper};
use aegis_common::msgs::EthTxData;
use aegis_common::params::{ChainConfig, EvmParams, FeeMarketParams};
use aegis_common::types::Denom;

// Intrinsic gas constants, per the Ethereum yellow paper and EIP-2028
const TX_GAS: u64 = 21_000;
const TX_GAS_CONTRACT_CREATION: u64 = 53_000;
const TX_DATA_ZERO_GAS: u64 = 4;
const TX_DATA_NON_ZERO_GAS_FRONTIER: u64 = 68;
const TX_DATA_NON_ZERO_GAS_EIP2028: u64 = 16;

/// Divisor turning an effective tip into a mempool priority
const PRIORITY_REDUCTION: u128 = 1_000_000;

/// Per-transaction fee working state
/// Parameter and base-fee snapshots are captured once at pipeline entry so
/// every stage sees a consistent view; the accumulators are mutated stage
/// by stage and discarded at pipeline exit
#[derive(Debug, Clone)]
pub struct FeeContext {
    pub evm_params: EvmParams,
    pub fee_market: FeeMarketParams,
    pub chain_config: ChainConfig,

    /// Base fee in force at the current height, None before activation
    pub base_fee: Option<u128>,

    /// Staking bond denomination
    pub bond_denom: Denom,

    /// Cumulative gas wanted across this transaction's messages
    pub gas_wanted: u64,

    /// Cumulative verified fee, atomics of the EVM denom
    pub fee_total: u128,

    /// Minimum priority observed across messages
    pub min_priority: i64,
}

impl FeeContext {
    pub fn new<S: EvmKeeper + StakingKeeper>(ctx: &Context, state: &S) -> Self {
        let fee_market = state.fee_market_params();
        let base_fee = fee_market.base_fee_at(ctx.block.height);
        Self {
            evm_params: state.evm_params(),
            fee_market,
            chain_config: state.chain_config(),
            base_fee,
            bond_denom: state.bond_denom(),
            gas_wanted: 0,
            fee_total: 0,
            min_priority: i64::MAX,
        }
    }
}

/// Effective gas price under EIP-1559: min(tipCap + baseFee, feeCap) for
/// dynamic-fee transactions, the declared price otherwise
pub fn effective_gas_price(data: &EthTxData, base_fee: Option<u128>) -> u128 {
    match (data, base_fee) {
        (EthTxData::DynamicFee(tx), Some(base)) => {
            tx.gas_fee_cap.min(tx.gas_tip_cap.saturating_add(base))
        }
        _ => data.gas_price(),
    }
}

/// Effective fee = effective price x gas limit, overflow-checked
pub fn effective_fee(data: &EthTxData, base_fee: Option<u128>) -> Result<u128, AnteError> {
    effective_gas_price(data, base_fee)
        .checked_mul(data.gas_limit() as u128)
        .ok_or_else(|| AnteError::InvalidCoins("fee overflows".to_string()))
}

/// Fee required by a decimal gas price, rounded against the transaction
pub fn required_fee(price: Dec, gas_limit: u64) -> Result<u128, AnteError> {
    price
        .checked_mul_int_ceil(gas_limit as u128)
        .map_err(|e| AnteError::InvalidCoins(e.to_string()))
}

/// Intrinsic gas of an Ethereum transaction, homestead/istanbul-aware
pub fn intrinsic_gas(data: &EthTxData, homestead: bool, istanbul: bool) -> Result<u64, AnteError> {
    let mut gas = if data.is_contract_creation() && homestead {
        TX_GAS_CONTRACT_CREATION
    } else {
        TX_GAS
    };

    let non_zero_gas = if istanbul {
        TX_DATA_NON_ZERO_GAS_EIP2028
    } else {
        TX_DATA_NON_ZERO_GAS_FRONTIER
    };
    for byte in data.input() {
        let cost = if *byte == 0 { TX_DATA_ZERO_GAS } else { non_zero_gas };
        gas = gas
            .checked_add(cost)
            .ok_or_else(|| AnteError::OutOfGas("intrinsic gas overflows".to_string()))?;
    }
    Ok(gas)
}

/// Compute the verified fee for an Ethereum transaction: the gas limit must
/// cover intrinsic gas, and the fee is the effective price over the full
/// gas limit
pub fn verify_fee(
    data: &EthTxData,
    base_fee: Option<u128>,
    homestead: bool,
    istanbul: bool,
) -> Result<u128, AnteError> {
    let intrinsic = intrinsic_gas(data, homestead, istanbul)?;
    if data.gas_limit() < intrinsic {
        return Err(AnteError::OutOfGas(format!(
            "gas limit {} below intrinsic gas {intrinsic}",
            data.gas_limit()
        )));
    }
    effective_fee(data, base_fee)
}

/// Mempool priority of an Ethereum message: the effective tip over the base
/// fee, scaled down by the priority reduction
pub fn eth_tx_priority(data: &EthTxData, base_fee: Option<u128>) -> i64 {
    let price = effective_gas_price(data, base_fee);
    let tip = price.saturating_sub(base_fee.unwrap_or(0));
    (tip / PRIORITY_REDUCTION).min(i64::MAX as u128) as i64
}

/// Mempool priority of a Cosmos transaction: the smallest per-denomination
/// gas price across the declared fee coins, floored at 1 so a nonzero fee
/// never maps to zero priority
pub fn cosmos_tx_priority(fee: &Coins, gas_limit: u64) -> i64 {
    if gas_limit == 0 {
        return 0;
    }
    fee.iter()
        .map(|c| (c.amount / gas_limit as u128).clamp(1, i64::MAX as u128) as i64)
        .min()
        .unwrap_or(0)
}

/// Node-local mempool minimum-fee check for Cosmos transactions
/// Enforced only in CheckTx mode; the fee passes if it covers the
/// requirement in any configured denomination
pub fn check_mempool_fee(
    fee: &Coins,
    gas_limit: u64,
    min_gas_prices: &[DecCoin],
) -> Result<(), AnteError> {
    if min_gas_prices.is_empty() {
        return Ok(());
    }
    let required: Coins = min_gas_prices
        .iter()
        .map(|p| Ok(Coin::new(&p.denom, required_fee(p.amount, gas_limit)?)))
        .collect::<Result<Vec<_>, AnteError>>()?
        .into_iter()
        .collect();
    if required.is_zero() || fee.is_any_gte(&required) {
        Ok(())
    } else {
        Err(AnteError::InsufficientFee(format!(
            "got {fee}, required at least one of {required}"
        )))
    }
}

/// Consensus-wide minimum-fee check for an Ethereum transaction
pub fn check_global_fee_evm(
    data: &EthTxData,
    fee_ctx: &FeeContext,
) -> Result<(), AnteError> {
    let required = required_fee(fee_ctx.fee_market.min_gas_price, data.gas_limit())?;
    let fee = effective_fee(data, fee_ctx.base_fee)?;
    if fee < required {
        return Err(AnteError::InsufficientFee(format!(
            "effective fee {fee}{} below global minimum {required}{}",
            fee_ctx.evm_params.evm_denom, fee_ctx.evm_params.evm_denom
        )));
    }
    Ok(())
}

/// Consensus-wide minimum-fee check for a Cosmos transaction, applied in
/// the bond denomination
pub fn check_global_fee_cosmos(
    fee: &Coins,
    gas_limit: u64,
    min_gas_price: Dec,
    bond_denom: &str,
) -> Result<(), AnteError> {
    let required = required_fee(min_gas_price, gas_limit)?;
    if fee.amount_of(bond_denom) < required {
        return Err(AnteError::InsufficientFee(format!(
            "got {}{bond_denom}, required {required}{bond_denom}",
            fee.amount_of(bond_denom)
        )));
    }
    Ok(())
}
