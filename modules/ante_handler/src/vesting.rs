//! Vesting guard
//! Stops clawback-vesting accounts from spending or delegating more than
//! their currently spendable balance

use aegis_common::account::Account;
use aegis_common::coin::Coins;
use aegis_common::errors::AnteError;
use aegis_common::keepers::BankKeeper;
use aegis_common::types::{display_address, Address};
use std::collections::HashMap;

/// Running spend total for one vesting account within one transaction
/// The spendable snapshot is taken on first touch and never re-queried, so
/// several messages against the same account share one non-replenishing
/// budget
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseTracker {
    /// Spendable balance at first touch
    pub spendable: u128,

    /// Total promised so far
    pub spent: u128,
}

/// Per-transaction tracker map, keyed by address
/// Created lazily, passed explicitly so parallel admission runs share
/// nothing
pub type ExpenseTrackers = HashMap<Address, ExpenseTracker>;

/// Fail a delegation that exceeds the account's vested and unlocked coins
/// Vested coins still under a lockup period are not delegatable;
/// non-vesting accounts always pass
pub fn check_delegation(
    account: &Account,
    delegate_amount: &Coins,
    now: u64,
) -> Result<(), AnteError> {
    let Some(vesting) = account.as_clawback_vesting() else {
        return Ok(());
    };
    let vested = vesting.vested_coins(now);
    let locked = vesting.locked_coins(now);
    // Clamped at zero when locked coins exceed the vested amount
    let delegatable = vested.checked_sub(&locked).unwrap_or_default();
    if !delegatable.is_all_gte(delegate_amount) {
        return Err(AnteError::InsufficientVestedCoins(format!(
            "{} cannot delegate {delegate_amount}, delegatable {delegatable}",
            display_address(account.address())
        )));
    }
    Ok(())
}

/// Accumulate a promised expense against the account's spendable balance
/// Non-vesting accounts always pass
pub fn check_expense<S: BankKeeper>(
    state: &S,
    account: &Account,
    trackers: &mut ExpenseTrackers,
    added_expense: u128,
    denom: &str,
    now: u64,
) -> Result<(), AnteError> {
    let Some(vesting) = account.as_clawback_vesting() else {
        return Ok(());
    };
    let address = account.address().clone();

    let tracker = trackers.entry(address.clone()).or_insert_with(|| {
        let balance = state.get_balance(&address, denom).amount;
        let locked = vesting.locked_coins(now).amount_of(denom);
        ExpenseTracker {
            // Clamped at zero when locked coins exceed the balance
            spendable: balance.saturating_sub(locked),
            spent: 0,
        }
    });

    tracker.spent = tracker.spent.saturating_add(added_expense);
    if tracker.spent > tracker.spendable {
        return Err(AnteError::InsufficientUnlockedCoins(format!(
            "{} promised {} of spendable {}{denom}",
            display_address(&address),
            tracker.spent,
            tracker.spendable
        )));
    }
    Ok(())
}
