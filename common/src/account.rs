//! Account types, including clawback-vesting accounts
//! Vested, locked and spendable balances are pure functions of block time

use crate::coin::Coins;
use crate::crypto::PublicKey;
use crate::types::Address;

/// Basic account state shared by all account kinds
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BaseAccount {
    /// Account address
    pub address: Address,

    /// Public key, set on first signed transaction
    pub pub_key: Option<PublicKey>,

    /// Account number, assigned at creation
    pub account_number: u64,

    /// Sequence (nonce), incremented on every admitted transaction
    pub sequence: u64,
}

/// One step of a vesting or lockup schedule
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Period {
    /// Seconds after the previous period (or schedule start)
    pub length_secs: u64,

    /// Coins released when this period elapses
    pub amount: Coins,
}

/// A vesting account whose unvested funds can be clawed back by the funder
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClawbackVestingAccount {
    pub base: BaseAccount,

    /// Account that funded the schedule and may claw back unvested coins
    pub funder: Address,

    /// Schedule start (UNIX seconds)
    pub start_time: u64,

    /// Lockup schedule - coins stay transfer-locked until released
    pub lockup_periods: Vec<Period>,

    /// Vesting schedule - coins vest (become clawback-proof) as released
    pub vesting_periods: Vec<Period>,
}

/// Coins released by a period schedule at the given time
fn released(periods: &[Period], start_time: u64, now: u64) -> Coins {
    let mut coins = Coins::new();
    let mut elapsed_at = start_time;
    for period in periods {
        elapsed_at = elapsed_at.saturating_add(period.length_secs);
        if now < elapsed_at {
            break;
        }
        for coin in period.amount.iter() {
            coins.add(coin.clone());
        }
    }
    coins
}

fn total(periods: &[Period]) -> Coins {
    periods.iter().flat_map(|p| p.amount.iter().cloned()).collect()
}

impl ClawbackVestingAccount {
    /// Coins vested at `now`
    pub fn vested_coins(&self, now: u64) -> Coins {
        released(&self.vesting_periods, self.start_time, now)
    }

    /// Coins still subject to clawback at `now`
    pub fn unvested_coins(&self, now: u64) -> Coins {
        total(&self.vesting_periods).checked_sub(&self.vested_coins(now)).unwrap_or_default()
    }

    /// Coins still transfer-locked at `now`
    pub fn locked_coins(&self, now: u64) -> Coins {
        let unlocked = released(&self.lockup_periods, self.start_time, now);
        total(&self.lockup_periods).checked_sub(&unlocked).unwrap_or_default()
    }
}

/// A chain account
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Account {
    /// Ordinary externally-owned account
    Base(BaseAccount),

    /// Clawback vesting account
    ClawbackVesting(ClawbackVestingAccount),

    /// EVM contract account
    Contract {
        base: BaseAccount,
        code_hash: Vec<u8>,
    },

    /// Module-owned account (fee collector etc.)
    Module { base: BaseAccount, name: String },
}

impl Account {
    pub fn base(&self) -> &BaseAccount {
        match self {
            Account::Base(base) => base,
            Account::ClawbackVesting(acc) => &acc.base,
            Account::Contract { base, .. } => base,
            Account::Module { base, .. } => base,
        }
    }

    pub fn base_mut(&mut self) -> &mut BaseAccount {
        match self {
            Account::Base(base) => base,
            Account::ClawbackVesting(acc) => &mut acc.base,
            Account::Contract { base, .. } => base,
            Account::Module { base, .. } => base,
        }
    }

    pub fn address(&self) -> &Address {
        &self.base().address
    }

    pub fn sequence(&self) -> u64 {
        self.base().sequence
    }

    /// True for accounts carrying EVM code
    pub fn is_contract(&self) -> bool {
        matches!(self, Account::Contract { .. })
    }

    pub fn as_clawback_vesting(&self) -> Option<&ClawbackVestingAccount> {
        match self {
            Account::ClawbackVesting(acc) => Some(acc),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coin::Coin;

    fn schedule(amounts: &[(u64, u128)]) -> Vec<Period> {
        amounts
            .iter()
            .map(|(len, amt)| Period {
                length_secs: *len,
                amount: Coins::from_coin(Coin::new("aaeg", *amt)),
            })
            .collect()
    }

    fn account() -> ClawbackVestingAccount {
        ClawbackVestingAccount {
            start_time: 1000,
            // Cliff of 100s releasing half, then two quarters
            vesting_periods: schedule(&[(100, 500), (100, 250), (100, 250)]),
            // Single lockup releasing everything at 250s
            lockup_periods: schedule(&[(250, 1000)]),
            ..Default::default()
        }
    }

    #[test]
    fn vested_coins_follow_the_schedule() {
        let acc = account();
        assert_eq!(acc.vested_coins(1000).amount_of("aaeg"), 0);
        assert_eq!(acc.vested_coins(1099).amount_of("aaeg"), 0);
        assert_eq!(acc.vested_coins(1100).amount_of("aaeg"), 500);
        assert_eq!(acc.vested_coins(1200).amount_of("aaeg"), 750);
        assert_eq!(acc.vested_coins(5000).amount_of("aaeg"), 1000);
        assert_eq!(acc.unvested_coins(1200).amount_of("aaeg"), 250);
    }

    #[test]
    fn locked_coins_release_at_lockup_end() {
        let acc = account();
        assert_eq!(acc.locked_coins(1000).amount_of("aaeg"), 1000);
        assert_eq!(acc.locked_coins(1249).amount_of("aaeg"), 1000);
        assert_eq!(acc.locked_coins(1250).amount_of("aaeg"), 0);
    }
}
