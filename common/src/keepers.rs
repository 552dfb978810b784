//! Keeper traits - the external collaborators the admission pipeline
//! consumes. Persisted state layout belongs to the implementations; the
//! pipeline only assumes it is handed an already-isolated view.

use crate::account::Account;
use crate::coin::{Coin, Coins};
use crate::errors::AnteError;
use crate::msgs::Msg;
use crate::params::{ChainConfig, EvmParams, FeeMarketParams};
use crate::types::{Address, Denom};

/// A delegation from a delegator to a validator
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Delegation {
    pub delegator: Address,
    pub validator: Address,
    pub shares: u128,
}

pub trait AccountKeeper {
    fn get_account(&self, addr: &Address) -> Option<Account>;

    fn set_account(&mut self, account: Account);

    /// Create and persist a fresh base account
    fn new_account_with_address(&mut self, addr: &Address) -> Account;

    /// Address of a module account by name
    fn get_module_address(&self, name: &str) -> Address;
}

pub trait BankKeeper {
    fn get_balance(&self, addr: &Address, denom: &str) -> Coin;

    fn send_coins(
        &mut self,
        from: &Address,
        to: &Address,
        amount: &Coins,
    ) -> Result<(), AnteError>;

    fn send_coins_to_module(
        &mut self,
        from: &Address,
        module: &str,
        amount: &Coins,
    ) -> Result<(), AnteError>;

    fn burn_coins(&mut self, module: &str, amount: &Coins) -> Result<(), AnteError>;
}

pub trait DistributionKeeper {
    /// Withdraw accumulated rewards for one delegation, returning the coins
    /// credited to the delegator's balance
    fn withdraw_delegation_rewards(
        &mut self,
        delegator: &Address,
        validator: &Address,
    ) -> Result<Coins, AnteError>;
}

pub trait StakingKeeper {
    fn bond_denom(&self) -> Denom;

    /// The address's delegations in a deterministic order
    fn delegations(&self, delegator: &Address) -> Vec<Delegation>;
}

pub trait FeegrantKeeper {
    /// Check and record usage of a fee allowance
    fn use_granted_fees(
        &mut self,
        granter: &Address,
        grantee: &Address,
        fee: &Coins,
        msgs: &[Msg],
    ) -> Result<(), AnteError>;
}

pub trait EvmKeeper {
    fn evm_params(&self) -> EvmParams;

    fn fee_market_params(&self) -> FeeMarketParams;

    fn chain_config(&self) -> ChainConfig;

    /// Balance in the EVM's decimal scale (the base denom here)
    fn evm_balance(&self, addr: &Address) -> u128;

    /// Re-derives an EVM execution context and applies the VM's own
    /// transfer rule for `value` from `from`
    fn can_transfer(&self, from: &Address, value: u128) -> bool;
}

/// Everything the pipeline needs, in one isolated, clonable view
/// Clone is what lets the rewards claimer branch speculatively and commit
/// all-or-nothing
pub trait Ledger:
    AccountKeeper + BankKeeper + DistributionKeeper + StakingKeeper + FeegrantKeeper + EvmKeeper + Clone
{
}

impl<T> Ledger for T where
    T: AccountKeeper
        + BankKeeper
        + DistributionKeeper
        + StakingKeeper
        + FeegrantKeeper
        + EvmKeeper
        + Clone
{
}
