//! Staking rewards claimer
//! Best-effort withdrawal of delegation rewards to cover a fee shortfall,
//! with all-or-nothing commit semantics

use aegis_common::coin::Coins;
use aegis_common::errors::AnteError;
use aegis_common::keepers::Ledger;
use aegis_common::types::{display_address, Address};
use tracing::debug;

/// A copy-on-write branch of the ledger
/// Mutations go to a clone of the base state; nothing reaches the real
/// state until an explicit commit
pub struct Speculative<'a, S: Clone> {
    base: &'a mut S,
    working: S,
}

impl<'a, S: Clone> Speculative<'a, S> {
    pub fn new(base: &'a mut S) -> Self {
        let working = base.clone();
        Self { base, working }
    }

    pub fn state(&self) -> &S {
        &self.working
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.working
    }

    /// Make the speculative mutations real
    pub fn commit(self) {
        *self.base = self.working;
    }

    /// Drop all speculative mutations
    pub fn discard(self) {}
}

/// Ensure `addr` holds at least `required` of the staking bond denom,
/// withdrawing delegation rewards to make up any shortfall.
///
/// Either exactly enough withdrawals to cover the shortfall are committed
/// and the call succeeds, or no withdrawal is committed at all and the call
/// fails - there is never a partial commit.
pub fn ensure_funds<S: Ledger>(
    state: &mut S,
    addr: &Address,
    required: &Coins,
) -> Result<(), AnteError> {
    if required.is_zero() {
        return Ok(());
    }

    let bond_denom = state.bond_denom();
    let required_amount = required.amount_of(&bond_denom);
    if required_amount == 0 {
        return Err(AnteError::InsufficientFee(format!(
            "fee {required} holds none of the staking denom {bond_denom}"
        )));
    }

    let balance = state.get_balance(addr, &bond_denom).amount;
    if balance >= required_amount {
        return Ok(());
    }
    let shortfall = required_amount - balance;

    let mut branch = Speculative::new(state);
    let delegations = branch.state().delegations(addr);
    let mut withdrawn: u128 = 0;
    for delegation in &delegations {
        // Stop as soon as the shortfall is covered - no more delegations
        // are touched than needed
        if withdrawn >= shortfall {
            break;
        }
        let rewards =
            branch.state_mut().withdraw_delegation_rewards(addr, &delegation.validator)?;
        withdrawn = withdrawn.saturating_add(rewards.amount_of(&bond_denom));
        debug!(
            "Withdrew {rewards} from validator {} for {}",
            display_address(&delegation.validator),
            display_address(addr)
        );
    }

    if withdrawn < shortfall {
        branch.discard();
        return Err(AnteError::InsufficientFee(format!(
            "insufficient staking rewards to cover transaction fees: short {shortfall}{bond_denom}, rewards {withdrawn}{bond_denom}"
        )));
    }

    branch.commit();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory_ledger::InMemoryLedger;
    use aegis_common::coin::Coin;
    use aegis_common::keepers::{BankKeeper, DistributionKeeper};

    fn coins(amount: u128) -> Coins {
        Coins::from_coin(Coin::new("aaeg", amount))
    }

    fn validator(n: u8) -> Address {
        vec![n; 20]
    }

    fn delegator() -> Address {
        vec![1; 20]
    }

    #[test]
    fn zero_requirement_is_trivially_satisfied() {
        let mut state = InMemoryLedger::new();
        assert!(ensure_funds(&mut state, &delegator(), &Coins::new()).is_ok());
    }

    #[test]
    fn wrong_denomination_fails() {
        let mut state = InMemoryLedger::new();
        let required = Coins::from_coin(Coin::new("uion", 10));
        assert!(matches!(
            ensure_funds(&mut state, &delegator(), &required),
            Err(AnteError::InsufficientFee(_))
        ));
    }

    #[test]
    fn sufficient_balance_touches_no_delegation() {
        let mut state = InMemoryLedger::new();
        state.set_balance(&delegator(), "aaeg", 100);
        state.set_outstanding_rewards(&delegator(), &validator(0x10), coins(50));
        let before = state.clone();

        assert!(ensure_funds(&mut state, &delegator(), &coins(100)).is_ok());
        assert_eq!(state, before);
    }

    #[test]
    fn withdraws_only_as_many_delegations_as_needed() {
        let mut state = InMemoryLedger::new();
        state.set_balance(&delegator(), "aaeg", 10);
        state.set_outstanding_rewards(&delegator(), &validator(0x10), coins(50));
        state.set_outstanding_rewards(&delegator(), &validator(0x20), coins(50));
        state.set_outstanding_rewards(&delegator(), &validator(0x30), coins(50));

        // Shortfall of 90 is covered by the first two delegations
        assert!(ensure_funds(&mut state, &delegator(), &coins(100)).is_ok());
        assert_eq!(state.get_balance(&delegator(), "aaeg").amount, 110);

        // Third delegation's rewards remain unclaimed
        let rewards =
            state.withdraw_delegation_rewards(&delegator(), &validator(0x30)).unwrap();
        assert_eq!(rewards.amount_of("aaeg"), 50);
    }

    #[test]
    fn exhausted_rewards_commit_nothing() {
        let mut state = InMemoryLedger::new();
        state.set_balance(&delegator(), "aaeg", 10);
        state.set_outstanding_rewards(&delegator(), &validator(0x10), coins(20));
        state.set_outstanding_rewards(&delegator(), &validator(0x20), coins(20));
        let before = state.clone();

        assert!(matches!(
            ensure_funds(&mut state, &delegator(), &coins(100)),
            Err(AnteError::InsufficientFee(_))
        ));
        // No partial withdrawal was ever committed
        assert_eq!(state, before);
    }
}
