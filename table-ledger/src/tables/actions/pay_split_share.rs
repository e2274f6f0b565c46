//! PaySplitShare command handler

use crate::tables::context::CommandContext;
use crate::tables::error::LedgerResult;
use crate::tables::payment;
use shared::sitting::{CommandOutcome, Owner};

use super::CommandHandler;

/// PaySplitShare action
#[derive(Debug, Clone)]
pub struct PaySplitShareAction {
    pub table_id: String,
    pub participant: Owner,
}

impl CommandHandler for PaySplitShareAction {
    fn execute(&self, ctx: &mut CommandContext<'_>) -> LedgerResult<CommandOutcome> {
        let applied = payment::pay_split_share(ctx, &self.participant)?;
        tracing::info!(
            table_id = %self.table_id,
            participant = %self.participant,
            amount = %applied.amount,
            remaining = %ctx.snapshot.remaining_amount,
            "Split share paid"
        );
        Ok(CommandOutcome {
            amount_applied: Some(applied.amount),
            sitting_closed: applied.sitting_closed,
            ..Default::default()
        })
    }
}
