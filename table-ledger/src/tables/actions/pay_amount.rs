//! PayAmount command handler
//!
//! Pure balance payment, not tied to any dish.

use crate::tables::context::CommandContext;
use crate::tables::error::LedgerResult;
use crate::tables::{money, payment};
use rust_decimal::Decimal;
use shared::sitting::{CommandOutcome, Owner};

use super::CommandHandler;

/// PayAmount action
#[derive(Debug, Clone)]
pub struct PayAmountAction {
    pub table_id: String,
    pub amount: Decimal,
    pub owner: Option<Owner>,
}

impl CommandHandler for PayAmountAction {
    fn validate(&self) -> LedgerResult<()> {
        money::validate_payment_amount(self.amount)
    }

    fn execute(&self, ctx: &mut CommandContext<'_>) -> LedgerResult<CommandOutcome> {
        let applied = payment::pay_amount(ctx, self.amount, self.owner.as_ref())?;
        tracing::info!(
            table_id = %self.table_id,
            amount = %applied.amount,
            remaining = %ctx.snapshot.remaining_amount,
            "Amount paid"
        );
        Ok(CommandOutcome {
            amount_applied: Some(applied.amount),
            sitting_closed: applied.sitting_closed,
            ..Default::default()
        })
    }
}
