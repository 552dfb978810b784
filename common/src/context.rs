//! Per-transaction admission context
//! Created at pipeline entry, mutated stage by stage, returned to the
//! caller on success

use crate::events::Event;
use crate::gas::{GasMeter, StorageGasConfig};
use crate::types::{BlockInfo, ExecMode};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Context {
    /// Block being checked/built against
    pub block: BlockInfo,

    /// CheckTx / ReCheckTx / DeliverTx
    pub mode: ExecMode,

    /// Gas meter for this transaction
    pub gas_meter: GasMeter,

    /// Storage gas cost table in force
    pub storage_gas: StorageGasConfig,

    /// Events emitted during admission
    pub events: Vec<Event>,

    /// Mempool ordering hint, set on success
    pub priority: i64,

    /// Gas wanted accumulated across the block-building pass so far
    pub block_gas_wanted: u64,

    /// Position of this transaction within the block
    pub tx_index: u64,
}

impl Context {
    pub fn new(block: BlockInfo, mode: ExecMode) -> Self {
        Self {
            block,
            mode,
            gas_meter: GasMeter::infinite(),
            storage_gas: StorageGasConfig::standard(),
            events: Vec::new(),
            priority: 0,
            block_gas_wanted: 0,
            tx_index: 0,
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Block gas remaining for this building pass
    pub fn block_gas_remaining(&self) -> u64 {
        self.block.gas_limit.saturating_sub(self.block_gas_wanted)
    }
}
