//! UpdateKitchenStatus command handler
//!
//! Kitchen progress only, never touches payment state.

use crate::tables::context::CommandContext;
use crate::tables::error::{LedgerError, LedgerResult};
use crate::tables::registry;
use shared::sitting::{CommandOutcome, KitchenStatus};

use super::CommandHandler;

/// UpdateKitchenStatus action
#[derive(Debug, Clone)]
pub struct UpdateKitchenStatusAction {
    pub dish_id: String,
    pub status: String,
}

impl UpdateKitchenStatusAction {
    fn parsed_status(&self) -> LedgerResult<KitchenStatus> {
        self.status.parse().map_err(LedgerError::Validation)
    }
}

impl CommandHandler for UpdateKitchenStatusAction {
    fn validate(&self) -> LedgerResult<()> {
        self.parsed_status().map(|_| ())
    }

    fn execute(&self, ctx: &mut CommandContext<'_>) -> LedgerResult<CommandOutcome> {
        let status = self.parsed_status()?;
        registry::update_kitchen_status(ctx, &self.dish_id, status)?;
        Ok(CommandOutcome {
            dish_id: Some(self.dish_id.clone()),
            ..Default::default()
        })
    }
}
