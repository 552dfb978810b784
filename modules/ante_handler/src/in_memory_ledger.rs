//! In-memory ledger
//! HashMap-backed implementation of the keeper traits, used by the bus
//! module's admission state and throughout the tests

use aegis_common::account::{Account, BaseAccount};
use aegis_common::coin::{Coin, Coins};
use aegis_common::errors::AnteError;
use aegis_common::keepers::{
    AccountKeeper, BankKeeper, Delegation, DistributionKeeper, EvmKeeper, FeegrantKeeper,
    StakingKeeper,
};
use aegis_common::msgs::Msg;
use aegis_common::params::{ChainConfig, EvmParams, FeeMarketParams};
use aegis_common::types::{display_address, Address, Denom, BASE_DENOM};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

/// Module account addresses are derived from the module name
pub fn module_address(name: &str) -> Address {
    let digest = Sha256::digest(name.as_bytes());
    digest[digest.len() - 20..].to_vec()
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct InMemoryLedger {
    accounts: HashMap<Address, Account>,
    balances: HashMap<(Address, Denom), u128>,

    /// Delegations ordered by validator address for deterministic iteration
    delegations: HashMap<Address, BTreeMap<Address, Delegation>>,

    /// Unclaimed rewards per (delegator, validator)
    outstanding_rewards: HashMap<(Address, Address), Coins>,

    /// Fee allowances per (granter, grantee), a running spend cap
    fee_allowances: HashMap<(Address, Address), Coins>,

    next_account_number: u64,
    bond_denom: Denom,
    evm_params: EvmParams,
    fee_market: FeeMarketParams,
    chain_config: ChainConfig,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            bond_denom: BASE_DENOM.to_string(),
            ..Default::default()
        }
    }

    pub fn set_balance(&mut self, addr: &Address, denom: &str, amount: u128) {
        self.balances.insert((addr.clone(), denom.to_string()), amount);
    }

    pub fn set_outstanding_rewards(&mut self, delegator: &Address, validator: &Address, coins: Coins) {
        self.delegations.entry(delegator.clone()).or_default().insert(
            validator.clone(),
            Delegation {
                delegator: delegator.clone(),
                validator: validator.clone(),
                shares: 1,
            },
        );
        self.outstanding_rewards.insert((delegator.clone(), validator.clone()), coins);
    }

    pub fn set_fee_allowance(&mut self, granter: &Address, grantee: &Address, allowance: Coins) {
        self.fee_allowances.insert((granter.clone(), grantee.clone()), allowance);
    }

    pub fn set_evm_params(&mut self, params: EvmParams) {
        self.evm_params = params;
    }

    pub fn set_fee_market_params(&mut self, params: FeeMarketParams) {
        self.fee_market = params;
    }

    pub fn set_chain_config(&mut self, config: ChainConfig) {
        self.chain_config = config;
    }

    fn credit(&mut self, addr: &Address, amount: &Coins) {
        for coin in amount.iter() {
            let entry = self.balances.entry((addr.clone(), coin.denom.clone())).or_insert(0);
            *entry = entry.saturating_add(coin.amount);
        }
    }

    fn debit(&mut self, addr: &Address, amount: &Coins) -> Result<(), AnteError> {
        // Check all denoms before mutating any
        for coin in amount.iter() {
            if self.get_balance(addr, &coin.denom).amount < coin.amount {
                return Err(AnteError::InsufficientFunds(format!(
                    "{} has {}, needs {coin}",
                    display_address(addr),
                    self.get_balance(addr, &coin.denom)
                )));
            }
        }
        for coin in amount.iter() {
            if let Some(balance) = self.balances.get_mut(&(addr.clone(), coin.denom.clone())) {
                *balance -= coin.amount;
            }
        }
        Ok(())
    }
}

impl AccountKeeper for InMemoryLedger {
    fn get_account(&self, addr: &Address) -> Option<Account> {
        self.accounts.get(addr).cloned()
    }

    fn set_account(&mut self, account: Account) {
        self.accounts.insert(account.address().clone(), account);
    }

    fn new_account_with_address(&mut self, addr: &Address) -> Account {
        let account = Account::Base(BaseAccount {
            address: addr.clone(),
            pub_key: None,
            account_number: self.next_account_number,
            sequence: 0,
        });
        self.next_account_number += 1;
        self.accounts.insert(addr.clone(), account.clone());
        account
    }

    fn get_module_address(&self, name: &str) -> Address {
        module_address(name)
    }
}

impl BankKeeper for InMemoryLedger {
    fn get_balance(&self, addr: &Address, denom: &str) -> Coin {
        let amount =
            self.balances.get(&(addr.clone(), denom.to_string())).copied().unwrap_or(0);
        Coin::new(denom, amount)
    }

    fn send_coins(&mut self, from: &Address, to: &Address, amount: &Coins) -> Result<(), AnteError> {
        self.debit(from, amount)?;
        self.credit(to, amount);
        Ok(())
    }

    fn send_coins_to_module(
        &mut self,
        from: &Address,
        module: &str,
        amount: &Coins,
    ) -> Result<(), AnteError> {
        let module_addr = self.get_module_address(module);
        self.send_coins(from, &module_addr, amount)
    }

    fn burn_coins(&mut self, module: &str, amount: &Coins) -> Result<(), AnteError> {
        let module_addr = self.get_module_address(module);
        self.debit(&module_addr, amount)
    }
}

impl DistributionKeeper for InMemoryLedger {
    fn withdraw_delegation_rewards(
        &mut self,
        delegator: &Address,
        validator: &Address,
    ) -> Result<Coins, AnteError> {
        let rewards = self
            .outstanding_rewards
            .remove(&(delegator.clone(), validator.clone()))
            .unwrap_or_default();
        self.credit(delegator, &rewards);
        Ok(rewards)
    }
}

impl StakingKeeper for InMemoryLedger {
    fn bond_denom(&self) -> Denom {
        self.bond_denom.clone()
    }

    fn delegations(&self, delegator: &Address) -> Vec<Delegation> {
        self.delegations
            .get(delegator)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl FeegrantKeeper for InMemoryLedger {
    fn use_granted_fees(
        &mut self,
        granter: &Address,
        grantee: &Address,
        fee: &Coins,
        _msgs: &[Msg],
    ) -> Result<(), AnteError> {
        let key = (granter.clone(), grantee.clone());
        let Some(allowance) = self.fee_allowances.get(&key) else {
            return Err(AnteError::Unauthorized(format!(
                "no fee allowance from {} to {}",
                display_address(granter),
                display_address(grantee)
            )));
        };
        let remaining = allowance.checked_sub(fee).map_err(|_| {
            AnteError::Unauthorized(format!(
                "fee allowance from {} exhausted: {allowance} left, {fee} requested",
                display_address(granter)
            ))
        })?;
        self.fee_allowances.insert(key, remaining);
        Ok(())
    }
}

impl EvmKeeper for InMemoryLedger {
    fn evm_params(&self) -> EvmParams {
        self.evm_params.clone()
    }

    fn fee_market_params(&self) -> FeeMarketParams {
        self.fee_market.clone()
    }

    fn chain_config(&self) -> ChainConfig {
        self.chain_config.clone()
    }

    fn evm_balance(&self, addr: &Address) -> u128 {
        self.get_balance(addr, &self.evm_params.evm_denom).amount
    }

    fn can_transfer(&self, from: &Address, value: u128) -> bool {
        self.evm_balance(from) >= value
    }
}
