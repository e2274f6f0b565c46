//! PayDish command handler

use crate::tables::context::CommandContext;
use crate::tables::error::LedgerResult;
use crate::tables::payment;
use shared::sitting::CommandOutcome;

use super::CommandHandler;

/// PayDish action
#[derive(Debug, Clone)]
pub struct PayDishAction {
    pub dish_id: String,
}

impl CommandHandler for PayDishAction {
    fn execute(&self, ctx: &mut CommandContext<'_>) -> LedgerResult<CommandOutcome> {
        let applied = payment::pay_dish_order(ctx, &self.dish_id)?;
        tracing::info!(
            dish_id = %self.dish_id,
            amount = %applied.amount,
            remaining = %ctx.snapshot.remaining_amount,
            "Dish paid"
        );
        Ok(CommandOutcome {
            dish_id: Some(self.dish_id.clone()),
            amount_applied: Some(applied.amount),
            sitting_closed: applied.sitting_closed,
            ..Default::default()
        })
    }
}
