//! Table commands - already authenticated/validated requests from the
//! request-handling layer

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{DishInput, Owner};

/// Table command
///
/// `command_id` is the idempotency boundary: a client retrying the same
/// physical payment resends the same command (same id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCommand {
    pub command_id: String,
    /// Client timestamp (Unix milliseconds)
    pub timestamp: i64,
    pub payload: TableCommandPayload,
}

impl TableCommand {
    /// New command with a fresh id
    pub fn new(payload: TableCommandPayload) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), payload)
    }

    pub fn with_id(command_id: impl Into<String>, payload: TableCommandPayload) -> Self {
        Self {
            command_id: command_id.into(),
            timestamp: crate::util::now_millis(),
            payload,
        }
    }
}

/// Command payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableCommandPayload {
    PlaceDishOrder {
        table_id: String,
        owner: Owner,
        dish: DishInput,
    },
    PayDish {
        dish_id: String,
    },
    PayAmount {
        table_id: String,
        amount: Decimal,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        owner: Option<Owner>,
    },
    InitializeSplit {
        table_id: String,
        number_of_people: u32,
        #[serde(default)]
        participants: Vec<Owner>,
    },
    PaySplitShare {
        table_id: String,
        participant: Owner,
    },
    UpdateKitchenStatus {
        dish_id: String,
        /// Raw status string, validated by the engine
        status: String,
    },
}

impl TableCommandPayload {
    /// Table the command targets, when the payload names it directly
    pub fn table_id(&self) -> Option<&str> {
        match self {
            TableCommandPayload::PlaceDishOrder { table_id, .. }
            | TableCommandPayload::PayAmount { table_id, .. }
            | TableCommandPayload::InitializeSplit { table_id, .. }
            | TableCommandPayload::PaySplitShare { table_id, .. } => Some(table_id),
            TableCommandPayload::PayDish { .. }
            | TableCommandPayload::UpdateKitchenStatus { .. } => None,
        }
    }

    /// Dish the command targets, for dish-addressed commands
    pub fn dish_id(&self) -> Option<&str> {
        match self {
            TableCommandPayload::PayDish { dish_id }
            | TableCommandPayload::UpdateKitchenStatus { dish_id, .. } => Some(dish_id),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TableCommandPayload::PlaceDishOrder { .. } => "place_dish_order",
            TableCommandPayload::PayDish { .. } => "pay_dish",
            TableCommandPayload::PayAmount { .. } => "pay_amount",
            TableCommandPayload::InitializeSplit { .. } => "initialize_split",
            TableCommandPayload::PaySplitShare { .. } => "pay_split_share",
            TableCommandPayload::UpdateKitchenStatus { .. } => "update_kitchen_status",
        }
    }
}
