//! Gas metering for the admission pipeline

use crate::errors::AnteError;

/// A gas meter, either limited or infinite
/// EVM transactions run under an infinite meter because EVM gas accounting
/// is independent of the host chain's storage-gas accounting
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GasMeter {
    /// None = infinite
    limit: Option<u64>,

    /// Gas consumed so far
    consumed: u64,
}

impl GasMeter {
    pub fn infinite() -> Self {
        Self {
            limit: None,
            consumed: 0,
        }
    }

    pub fn limited(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            consumed: 0,
        }
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Consume gas, failing once the limit is crossed
    pub fn consume(&mut self, amount: u64, descriptor: &str) -> Result<(), AnteError> {
        self.consumed = self.consumed.saturating_add(amount);
        if let Some(limit) = self.limit {
            if self.consumed > limit {
                return Err(AnteError::OutOfGas(format!(
                    "{descriptor}: consumed {} of {limit}",
                    self.consumed
                )));
            }
        }
        Ok(())
    }
}

impl Default for GasMeter {
    fn default() -> Self {
        Self::infinite()
    }
}

/// Per-operation storage gas costs charged by the host chain's KV store
/// Zeroed for EVM transactions
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StorageGasConfig {
    pub read_cost_flat: u64,
    pub read_cost_per_byte: u64,
    pub write_cost_flat: u64,
    pub write_cost_per_byte: u64,
}

impl StorageGasConfig {
    /// Default host-chain KV costs
    pub fn standard() -> Self {
        Self {
            read_cost_flat: 1000,
            read_cost_per_byte: 3,
            write_cost_flat: 2000,
            write_cost_per_byte: 30,
        }
    }

    /// Zero-cost config for EVM-mode execution
    pub fn free() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limited_meter_fails_past_limit() {
        let mut meter = GasMeter::limited(100);
        assert!(meter.consume(60, "first").is_ok());
        assert!(meter.consume(40, "second").is_ok());
        assert_eq!(meter.consumed(), 100);
        assert!(matches!(meter.consume(1, "third"), Err(AnteError::OutOfGas(_))));
    }

    #[test]
    fn infinite_meter_never_fails() {
        let mut meter = GasMeter::infinite();
        assert!(meter.consume(u64::MAX, "all of it").is_ok());
        assert!(meter.consume(u64::MAX, "more").is_ok());
    }
}
