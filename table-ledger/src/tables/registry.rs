//! Dish order registry
//!
//! Dish orders of a sitting. Kitchen status and payment status are two
//! independent axes; only payment status affects the ledger.

use super::context::CommandContext;
use super::error::{LedgerError, LedgerResult};
use super::{ledger, money, participants};
use shared::sitting::{
    DishInput, DishOrder, EventPayload, KitchenStatus, Owner, PaymentStatus, SittingSnapshot,
};

/// Attach a new dish order to the sitting
///
/// Totals are recomputed before returning, so any later read in the same
/// command sees the new line total.
pub fn add_dish_order(
    ctx: &mut CommandContext<'_>,
    owner: &Owner,
    input: &DishInput,
) -> LedgerResult<DishOrder> {
    money::validate_dish_input(input)?;
    if !ctx.snapshot.is_open() {
        return Err(LedgerError::SittingClosed(ctx.snapshot.sitting_id.clone()));
    }

    let dish = DishOrder {
        dish_id: uuid::Uuid::new_v4().to_string(),
        sitting_id: ctx.snapshot.sitting_id.clone(),
        table_id: ctx.snapshot.table_id.clone(),
        item_name: input.item_name.trim().to_string(),
        quantity: input.quantity,
        unit_price: input.unit_price,
        extra_price: input.extra_price,
        line_total: money::line_total(input.quantity, input.unit_price, input.extra_price),
        kitchen_status: KitchenStatus::Pending,
        payment_status: PaymentStatus::NotPaid,
        owner: owner.clone(),
        images: input.images.clone(),
        custom_fields: input.custom_fields.clone(),
        created_at: ctx.now(),
        paid_at: None,
    };

    ctx.snapshot.dishes.push(dish.clone());
    ledger::recompute_totals(ctx.snapshot);
    ctx.record(EventPayload::DishOrderPlaced { dish: dish.clone() });
    participants::register_or_update(ctx, owner);

    tracing::debug!(
        table_id = %dish.table_id,
        dish_id = %dish.dish_id,
        line_total = %dish.line_total,
        total = %ctx.snapshot.total_amount,
        "Dish order placed"
    );
    Ok(dish)
}

/// Move a dish along the kitchen axis
///
/// Returns false when the dish already had that status.
pub fn update_kitchen_status(
    ctx: &mut CommandContext<'_>,
    dish_id: &str,
    status: KitchenStatus,
) -> LedgerResult<bool> {
    let dish = ctx
        .snapshot
        .dishes
        .iter_mut()
        .find(|d| d.dish_id == dish_id)
        .ok_or_else(|| LedgerError::DishNotFound(dish_id.to_string()))?;

    let from = dish.kitchen_status;
    if from == status {
        return Ok(false);
    }
    dish.kitchen_status = status;

    ctx.record(EventPayload::KitchenStatusChanged {
        dish_id: dish_id.to_string(),
        from,
        to: status,
    });
    Ok(true)
}

/// NotPaid → Paid, write-once
pub fn mark_paid(ctx: &mut CommandContext<'_>, dish_id: &str) -> LedgerResult<DishOrder> {
    let now = ctx.now();
    let dish = ctx
        .snapshot
        .dishes
        .iter_mut()
        .find(|d| d.dish_id == dish_id)
        .ok_or_else(|| LedgerError::DishNotFound(dish_id.to_string()))?;

    if dish.is_paid() {
        return Err(LedgerError::AlreadyPaid(dish_id.to_string()));
    }
    dish.payment_status = PaymentStatus::Paid;
    dish.paid_at = Some(now);
    Ok(dish.clone())
}

pub fn list(snapshot: &SittingSnapshot) -> Vec<DishOrder> {
    snapshot.dishes.clone()
}
