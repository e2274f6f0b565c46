//! Command action implementations
//!
//! Each action implements the `CommandHandler` trait and handles
//! one specific command type against the working copy of a sitting.

use enum_dispatch::enum_dispatch;

use super::context::CommandContext;
use super::error::LedgerResult;
use super::split::MaterialityPolicy;
use shared::sitting::{CommandOutcome, TableCommandPayload};

mod initialize_split;
mod pay_amount;
mod pay_dish;
mod pay_split_share;
mod place_dish_order;
mod update_kitchen_status;

pub use initialize_split::InitializeSplitAction;
pub use pay_amount::PayAmountAction;
pub use pay_dish::PayDishAction;
pub use pay_split_share::PaySplitShareAction;
pub use place_dish_order::PlaceDishOrderAction;
pub use update_kitchen_status::UpdateKitchenStatusAction;

/// Command handler
#[enum_dispatch]
pub trait CommandHandler {
    /// Input checks that need no ledger state
    fn validate(&self) -> LedgerResult<()> {
        Ok(())
    }

    /// Apply the command to the working copy
    fn execute(&self, ctx: &mut CommandContext<'_>) -> LedgerResult<CommandOutcome>;
}

/// CommandAction enum - dispatches to concrete action implementations
#[enum_dispatch(CommandHandler)]
#[derive(Debug, Clone)]
pub enum CommandAction {
    PlaceDishOrder(PlaceDishOrderAction),
    PayDish(PayDishAction),
    PayAmount(PayAmountAction),
    InitializeSplit(InitializeSplitAction),
    PaySplitShare(PaySplitShareAction),
    UpdateKitchenStatus(UpdateKitchenStatusAction),
}

impl CommandAction {
    /// Build the action for a payload
    ///
    /// This is the ONLY place with a match on TableCommandPayload.
    pub fn new(payload: &TableCommandPayload, policy: MaterialityPolicy) -> Self {
        match payload {
            TableCommandPayload::PlaceDishOrder {
                table_id,
                owner,
                dish,
            } => CommandAction::PlaceDishOrder(PlaceDishOrderAction {
                table_id: table_id.clone(),
                owner: owner.clone(),
                dish: dish.clone(),
                policy,
            }),
            TableCommandPayload::PayDish { dish_id } => CommandAction::PayDish(PayDishAction {
                dish_id: dish_id.clone(),
            }),
            TableCommandPayload::PayAmount {
                table_id,
                amount,
                owner,
            } => CommandAction::PayAmount(PayAmountAction {
                table_id: table_id.clone(),
                amount: *amount,
                owner: owner.clone(),
            }),
            TableCommandPayload::InitializeSplit {
                table_id,
                number_of_people,
                participants,
            } => CommandAction::InitializeSplit(InitializeSplitAction {
                table_id: table_id.clone(),
                number_of_people: *number_of_people,
                participants: participants.clone(),
            }),
            TableCommandPayload::PaySplitShare {
                table_id,
                participant,
            } => CommandAction::PaySplitShare(PaySplitShareAction {
                table_id: table_id.clone(),
                participant: participant.clone(),
            }),
            TableCommandPayload::UpdateKitchenStatus { dish_id, status } => {
                CommandAction::UpdateKitchenStatus(UpdateKitchenStatusAction {
                    dish_id: dish_id.clone(),
                    status: status.clone(),
                })
            }
        }
    }
}
