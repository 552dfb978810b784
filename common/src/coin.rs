//! Coin and coin-set types
//! Amounts are u128 atomics in the coin's denomination (the base denom
//! carries 18 decimals)

use crate::dec::Dec;
use crate::types::Denom;
use anyhow::{bail, Result};
use std::fmt;

/// A single denominated amount
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Coin {
    pub denom: Denom,
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: &str, amount: u128) -> Self {
        Self {
            denom: denom.to_string(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// A set of coins, kept sorted by denom with unique denoms and no zero
/// amounts
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Coins(Vec<Coin>);

impl Coins {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build from a single coin, dropping it if zero
    pub fn from_coin(coin: Coin) -> Self {
        let mut coins = Self::new();
        coins.add(coin);
        coins
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.0.iter()
    }

    /// Amount of the given denom, zero if absent
    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0.iter().find(|c| c.denom == denom).map(|c| c.amount).unwrap_or(0)
    }

    /// Add a coin, merging with any existing amount of the same denom
    pub fn add(&mut self, coin: Coin) {
        if coin.amount == 0 {
            return;
        }
        match self.0.binary_search_by(|c| c.denom.cmp(&coin.denom)) {
            Ok(i) => self.0[i].amount = self.0[i].amount.saturating_add(coin.amount),
            Err(i) => self.0.insert(i, coin),
        }
    }

    /// Subtract a coin set, failing on underflow in any denom
    pub fn checked_sub(&self, other: &Coins) -> Result<Coins> {
        let mut result = self.clone();
        for coin in other.iter() {
            match result.0.binary_search_by(|c| c.denom.cmp(&coin.denom)) {
                Ok(i) => {
                    if result.0[i].amount < coin.amount {
                        bail!("Coin underflow - {} less {}", result.0[i], coin);
                    }
                    result.0[i].amount -= coin.amount;
                    if result.0[i].amount == 0 {
                        result.0.remove(i);
                    }
                }
                Err(_) => bail!("Coin underflow - no {} to subtract {}", coin.denom, coin),
            }
        }
        Ok(result)
    }

    /// True if every coin in `other` is covered by this set
    pub fn is_all_gte(&self, other: &Coins) -> bool {
        other.iter().all(|c| self.amount_of(&c.denom) >= c.amount)
    }

    /// True if any coin in `other` is covered by this set
    pub fn is_any_gte(&self, other: &Coins) -> bool {
        other.iter().any(|c| self.amount_of(&c.denom) >= c.amount)
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl FromIterator<Coin> for Coins {
    fn from_iter<T: IntoIterator<Item = Coin>>(iter: T) -> Self {
        let mut coins = Self::new();
        for coin in iter {
            coins.add(coin);
        }
        coins
    }
}

/// A decimal-valued coin, used for gas prices
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DecCoin {
    pub denom: Denom,
    pub amount: Dec,
}

impl DecCoin {
    pub fn new(denom: &str, amount: Dec) -> Self {
        Self {
            denom: denom.to_string(),
            amount,
        }
    }
}
