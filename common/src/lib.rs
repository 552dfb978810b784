// Aegis common library - main library exports

pub mod account;
pub mod coin;
pub mod context;
pub mod crypto;
pub mod dec;
pub mod errors;
pub mod events;
pub mod gas;
pub mod keepers;
pub mod messages;
pub mod msgs;
pub mod params;
pub mod tx;
pub mod types;

// Flattened re-exports
pub use self::coin::{Coin, Coins, DecCoin};
pub use self::dec::Dec;
pub use self::errors::AnteError;
pub use self::types::*;
