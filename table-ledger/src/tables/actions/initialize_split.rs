//! InitializeSplit command handler (均摊)

use crate::tables::context::CommandContext;
use crate::tables::error::{LedgerError, LedgerResult};
use crate::tables::{money, split};
use shared::sitting::{CommandOutcome, Owner};

use super::CommandHandler;

/// InitializeSplit action
#[derive(Debug, Clone)]
pub struct InitializeSplitAction {
    pub table_id: String,
    pub number_of_people: u32,
    pub participants: Vec<Owner>,
}

impl CommandHandler for InitializeSplitAction {
    fn validate(&self) -> LedgerResult<()> {
        money::validate_split_people(self.number_of_people)?;
        if self.participants.len() > self.number_of_people as usize {
            return Err(LedgerError::Validation(format!(
                "{} participants named for a split of {}",
                self.participants.len(),
                self.number_of_people
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &mut CommandContext<'_>) -> LedgerResult<CommandOutcome> {
        tracing::debug!(table_id = %self.table_id, "Initializing split");
        let report = split::initialize_split_bill(ctx, self.number_of_people, &self.participants)?;
        Ok(CommandOutcome {
            redistribution: Some(report),
            ..Default::default()
        })
    }
}
