//! Fee deduction
//! Resolves the effective fee payer, deducts the fee (falling back to a
//! staking-rewards claim on shortfall) and emits the fee event

use crate::rewards;
use aegis_common::coin::Coins;
use aegis_common::context::Context;
use aegis_common::errors::AnteError;
use aegis_common::events::{Event, ATTR_FEE, ATTR_FEE_PAYER, EVENT_TYPE_TX_FEE};
use aegis_common::keepers::Ledger;
use aegis_common::msgs::Msg;
use aegis_common::types::{display_address, Address, FEE_COLLECTOR};

/// Deduct `fee` for a transaction whose declared payer is `payer`.
///
/// If a granter is set and differs from the payer, the feegrant allowance
/// is checked and its usage recorded, and the granter becomes the paying
/// account; a feegrant failure is surfaced verbatim, never retried against
/// the original payer.
pub fn deduct(
    ctx: &mut Context,
    state: &mut impl Ledger,
    fee: &Coins,
    payer: &Address,
    granter: Option<&Address>,
    msgs: &[Msg],
) -> Result<(), AnteError> {
    if fee.is_zero() {
        return Ok(());
    }

    let from = match granter {
        Some(granter) if granter != payer => {
            state.use_granted_fees(granter, payer, fee, msgs)?;
            granter.clone()
        }
        _ => payer.clone(),
    };

    if state.get_account(&from).is_none() {
        return Err(AnteError::unknown_address(&from));
    }

    // Direct deduction first; on shortfall, claim staking rewards once and
    // retry
    match state.send_coins_to_module(&from, FEE_COLLECTOR, fee) {
        Ok(()) => {}
        Err(AnteError::InsufficientFunds(_)) => {
            rewards::ensure_funds(state, &from, fee)?;
            state.send_coins_to_module(&from, FEE_COLLECTOR, fee)?;
        }
        Err(e) => return Err(e),
    }

    ctx.emit(
        Event::new(EVENT_TYPE_TX_FEE)
            .attr(ATTR_FEE, &fee.to_string())
            .attr(ATTR_FEE_PAYER, &display_address(&from)),
    );
    Ok(())
}
