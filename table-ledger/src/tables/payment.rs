//! Payment applicator
//!
//! The three payment modalities. Each credits the participant tracker and
//! then goes through [`ledger::apply_payment`], the single closure point.

use super::context::CommandContext;
use super::error::LedgerResult;
use super::{ledger, money, participants, registry, split};
use rust_decimal::Decimal;
use shared::sitting::{EventPayload, Modality, Owner};

/// What a payment did to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedPayment {
    pub amount: Decimal,
    pub sitting_closed: bool,
}

/// Pay one dish outright
pub fn pay_dish_order(ctx: &mut CommandContext<'_>, dish_id: &str) -> LedgerResult<AppliedPayment> {
    let dish = registry::mark_paid(ctx, dish_id)?;
    let amount = dish.line_total;

    ctx.record(EventPayload::DishPaid {
        dish_id: dish.dish_id.clone(),
        owner: dish.owner.clone(),
        amount,
    });

    // free dishes settle without moving money
    if amount.is_zero() {
        let sitting_closed = close_if_settled(ctx)?;
        return Ok(AppliedPayment {
            amount,
            sitting_closed,
        });
    }

    participants::credit_payment(ctx, &dish.owner, Modality::Individual, amount);
    let sitting_closed = ledger::apply_payment(ctx, amount)?;
    Ok(AppliedPayment {
        amount,
        sitting_closed,
    })
}

/// Close a zero-balance sitting once its last dish is paid
///
/// A payment of 0 never reaches [`ledger::apply_payment`], so a sitting
/// made only of free dishes closes here.
fn close_if_settled(ctx: &mut CommandContext<'_>) -> LedgerResult<bool> {
    let snapshot = &*ctx.snapshot;
    let settled = snapshot.is_open()
        && snapshot.remaining_amount.is_zero()
        && snapshot.dishes.iter().all(|d| d.is_paid());
    if settled {
        ledger::close(ctx)?;
    }
    Ok(settled)
}

/// Pay a free amount against the balance
///
/// Marks no dish as paid. The owner, when given, is credited.
pub fn pay_amount(
    ctx: &mut CommandContext<'_>,
    amount: Decimal,
    owner: Option<&Owner>,
) -> LedgerResult<AppliedPayment> {
    money::validate_payment_amount(amount)?;

    if let Some(owner) = owner {
        participants::credit_payment(ctx, owner, Modality::Amount, amount);
    }
    ctx.record(EventPayload::AmountPaid {
        owner: owner.cloned(),
        amount,
    });

    let sitting_closed = ledger::apply_payment(ctx, amount)?;
    Ok(AppliedPayment {
        amount,
        sitting_closed,
    })
}

/// Pay the owner's pending split share
pub fn pay_split_share(
    ctx: &mut CommandContext<'_>,
    owner: &Owner,
) -> LedgerResult<AppliedPayment> {
    let amount = split::settle_share(ctx, owner)?;

    ctx.record(EventPayload::SplitSharePaid {
        owner: owner.clone(),
        amount,
    });

    // placeholder share of someone who already paid their way
    if amount.is_zero() {
        return Ok(AppliedPayment {
            amount,
            sitting_closed: false,
        });
    }

    participants::credit_payment(ctx, owner, Modality::Split, amount);
    let sitting_closed = ledger::apply_payment(ctx, amount)?;
    Ok(AppliedPayment {
        amount,
        sitting_closed,
    })
}
