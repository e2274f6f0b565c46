//! Table account ledger
//!
//! total/paid/remaining of one sitting, and the only place a sitting
//! closes. Every payment modality ends in [`apply_payment`].

use super::context::CommandContext;
use super::error::{LedgerError, LedgerResult};
use super::{participants, split};
use rust_decimal::Decimal;
use shared::sitting::{EventPayload, SittingSnapshot, SittingStatus};

/// Re-derive total, item count and remaining from the dish orders
///
/// `paid_amount` is never touched here: it only grows through payments.
pub fn recompute_totals(snapshot: &mut SittingSnapshot) {
    snapshot.total_amount = snapshot.dishes.iter().map(|d| d.line_total).sum();
    snapshot.item_count = snapshot.dishes.len();
    snapshot.remaining_amount = snapshot.total_amount - snapshot.paid_amount;
}

/// Apply money to the sitting
///
/// Checked against the working copy the caller holds under the table lock.
/// Returns true when this payment closed the sitting.
pub fn apply_payment(ctx: &mut CommandContext<'_>, amount: Decimal) -> LedgerResult<bool> {
    let snapshot = &mut *ctx.snapshot;
    if !snapshot.is_open() {
        return Err(LedgerError::SittingClosed(snapshot.sitting_id.clone()));
    }
    if amount <= Decimal::ZERO {
        return Err(LedgerError::Validation(format!(
            "payment amount must be positive, got {}",
            amount
        )));
    }
    if amount > snapshot.remaining_amount {
        return Err(LedgerError::Overpayment {
            amount,
            remaining: snapshot.remaining_amount,
        });
    }

    snapshot.paid_amount += amount;
    recompute_totals(snapshot);

    if snapshot.remaining_amount.is_zero() {
        close(ctx)?;
        return Ok(true);
    }
    Ok(false)
}

/// Open → Closed
///
/// Purges participants and split shares. Fails on a sitting that is
/// already closed or still owes money, so a sitting can close only once.
pub fn close(ctx: &mut CommandContext<'_>) -> LedgerResult<()> {
    let now = ctx.now();
    let snapshot = &mut *ctx.snapshot;
    if !snapshot.is_open() {
        return Err(LedgerError::SittingClosed(snapshot.sitting_id.clone()));
    }
    if !snapshot.remaining_amount.is_zero() {
        return Err(LedgerError::Internal(format!(
            "sitting {} cannot close with {} outstanding",
            snapshot.sitting_id, snapshot.remaining_amount
        )));
    }

    snapshot.status = SittingStatus::Closed;
    snapshot.closed_at = Some(now);
    participants::clear(snapshot);
    split::clear(snapshot);
    let final_total = snapshot.total_amount;

    tracing::info!(
        table_id = %ctx.snapshot.table_id,
        sitting_id = %ctx.snapshot.sitting_id,
        total = %final_total,
        "Sitting closed"
    );
    ctx.record(EventPayload::SittingClosed { final_total });
    Ok(())
}
