//! PlaceDishOrder command handler
//!
//! Adds a dish to the table's open sitting. While a split is active the
//! new charge is redistributed over the pending participants.

use crate::tables::context::CommandContext;
use crate::tables::error::LedgerResult;
use crate::tables::split::{self, MaterialityPolicy};
use crate::tables::{money, registry};
use shared::sitting::{CommandOutcome, DishInput, Owner};

use super::CommandHandler;

/// PlaceDishOrder action
#[derive(Debug, Clone)]
pub struct PlaceDishOrderAction {
    pub table_id: String,
    pub owner: Owner,
    pub dish: DishInput,
    /// Injected by the manager from config
    pub policy: MaterialityPolicy,
}

impl CommandHandler for PlaceDishOrderAction {
    fn validate(&self) -> LedgerResult<()> {
        money::validate_dish_input(&self.dish)
    }

    fn execute(&self, ctx: &mut CommandContext<'_>) -> LedgerResult<CommandOutcome> {
        let dish = registry::add_dish_order(ctx, &self.owner, &self.dish)?;

        let redistribution = if ctx.snapshot.has_active_split() {
            tracing::debug!(table_id = %self.table_id, owner = %self.owner, "Split active, redistributing");
            Some(split::redistribute(ctx, &self.owner, &self.policy))
        } else {
            None
        };

        Ok(CommandOutcome {
            dish_id: Some(dish.dish_id),
            redistribution,
            ..Default::default()
        })
    }
}
