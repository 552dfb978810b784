//! Unsigned 18-decimal fixed-point arithmetic
//! Used for gas prices and commission rates, where exact decimal
//! comparisons are consensus-relevant

use anyhow::{anyhow, bail, Result};
use std::fmt;
use std::str::FromStr;

/// Number of decimal places carried by [`Dec`]
pub const DECIMAL_PLACES: u32 = 18;

/// Scaling factor, 10^18
const ONE: u128 = 1_000_000_000_000_000_000;

/// An unsigned fixed-point decimal with 18 decimal places, stored as scaled
/// atomics in a `u128`
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct Dec(u128);

impl Dec {
    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn one() -> Self {
        Self(ONE)
    }

    /// From a whole number
    pub fn from_int(n: u128) -> Result<Self> {
        Ok(Self(
            n.checked_mul(ONE).ok_or_else(|| anyhow!("Decimal overflow from integer {n}"))?,
        ))
    }

    /// From raw 10^-18 atomics
    pub const fn from_atomics(atomics: u128) -> Self {
        Self(atomics)
    }

    pub const fn atomics(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Result<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or_else(|| anyhow!("Decimal overflow in {self} + {other}"))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Multiply by an integer, rounding up
    /// Required-fee computations round against the transaction so a fee one
    /// atomic short of the requirement never passes
    pub fn checked_mul_int_ceil(self, n: u128) -> Result<u128> {
        let raw = self.0.checked_mul(n).ok_or_else(|| anyhow!("Decimal overflow in {self} * {n}"))?;
        Ok(raw.div_ceil(ONE))
    }

    /// Divide by an integer, truncating
    pub fn checked_div_int(self, n: u128) -> Result<Self> {
        if n == 0 {
            bail!("Decimal division by zero");
        }
        Ok(Self(self.0 / n))
    }

    /// Truncate to a whole number
    pub fn truncate(&self) -> u128 {
        self.0 / ONE
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / ONE;
        let frac = self.0 % ONE;
        if frac == 0 {
            write!(f, "{whole}")
        } else {
            let s = format!("{frac:018}");
            write!(f, "{}.{}", whole, s.trim_end_matches('0'))
        }
    }
}

impl FromStr for Dec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if frac.len() > DECIMAL_PLACES as usize {
            bail!("Too many decimal places in '{s}' (max {DECIMAL_PLACES})");
        }
        let whole: u128 = if whole.is_empty() { 0 } else { whole.parse()? };
        let mut atomics = whole.checked_mul(ONE).ok_or_else(|| anyhow!("Decimal overflow in '{s}'"))?;
        if !frac.is_empty() {
            let scale = 10u128.pow(DECIMAL_PLACES - frac.len() as u32);
            let frac: u128 = frac.parse()?;
            atomics = atomics
                .checked_add(frac * scale)
                .ok_or_else(|| anyhow!("Decimal overflow in '{s}'"))?;
        }
        Ok(Self(atomics))
    }
}
