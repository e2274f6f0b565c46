//! Sitting events - immutable audit records written with every commit

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{DishOrder, KitchenStatus, Owner};

/// Sitting event - immutable audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SittingEvent {
    /// Event unique ID
    pub event_id: String,
    /// Per-sitting sequence number (starts at 1)
    pub sequence: u64,
    pub sitting_id: String,
    pub table_id: String,
    /// Server timestamp (Unix milliseconds)
    pub timestamp: i64,
    /// Command that produced this event
    pub command_id: String,
    pub event_type: SittingEventType,
    pub payload: EventPayload,
}

/// Event type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SittingEventType {
    // Lifecycle
    SittingOpened,
    SittingClosed,

    // Dishes
    DishOrderPlaced,
    KitchenStatusChanged,

    // Participants
    ParticipantJoined,

    // Payments
    DishPaid,
    AmountPaid,
    SplitSharePaid,

    // Split
    SplitInitialized,
    SplitRedistributed,
}

impl std::fmt::Display for SittingEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SittingEventType::SittingOpened => write!(f, "SITTING_OPENED"),
            SittingEventType::SittingClosed => write!(f, "SITTING_CLOSED"),
            SittingEventType::DishOrderPlaced => write!(f, "DISH_ORDER_PLACED"),
            SittingEventType::KitchenStatusChanged => write!(f, "KITCHEN_STATUS_CHANGED"),
            SittingEventType::ParticipantJoined => write!(f, "PARTICIPANT_JOINED"),
            SittingEventType::DishPaid => write!(f, "DISH_PAID"),
            SittingEventType::AmountPaid => write!(f, "AMOUNT_PAID"),
            SittingEventType::SplitSharePaid => write!(f, "SPLIT_SHARE_PAID"),
            SittingEventType::SplitInitialized => write!(f, "SPLIT_INITIALIZED"),
            SittingEventType::SplitRedistributed => write!(f, "SPLIT_REDISTRIBUTED"),
        }
    }
}

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    // ========== Lifecycle ==========
    SittingOpened {},

    SittingClosed {
        final_total: Decimal,
    },

    // ========== Dishes ==========
    DishOrderPlaced {
        dish: DishOrder,
    },

    KitchenStatusChanged {
        dish_id: String,
        from: KitchenStatus,
        to: KitchenStatus,
    },

    // ========== Participants ==========
    ParticipantJoined {
        owner: Owner,
    },

    // ========== Payments ==========
    DishPaid {
        dish_id: String,
        owner: Owner,
        amount: Decimal,
    },

    AmountPaid {
        #[serde(skip_serializing_if = "Option::is_none")]
        owner: Option<Owner>,
        amount: Decimal,
    },

    SplitSharePaid {
        owner: Owner,
        amount: Decimal,
    },

    // ========== Split ==========
    SplitInitialized {
        number_of_people: u32,
        amount_per_person: Decimal,
        owners: Vec<Owner>,
    },

    SplitRedistributed {
        amount_per_person: Decimal,
        pending_owners: Vec<Owner>,
        #[serde(skip_serializing_if = "Option::is_none")]
        added_owner: Option<Owner>,
    },
}

impl EventPayload {
    pub fn event_type(&self) -> SittingEventType {
        match self {
            EventPayload::SittingOpened {} => SittingEventType::SittingOpened,
            EventPayload::SittingClosed { .. } => SittingEventType::SittingClosed,
            EventPayload::DishOrderPlaced { .. } => SittingEventType::DishOrderPlaced,
            EventPayload::KitchenStatusChanged { .. } => SittingEventType::KitchenStatusChanged,
            EventPayload::ParticipantJoined { .. } => SittingEventType::ParticipantJoined,
            EventPayload::DishPaid { .. } => SittingEventType::DishPaid,
            EventPayload::AmountPaid { .. } => SittingEventType::AmountPaid,
            EventPayload::SplitSharePaid { .. } => SittingEventType::SplitSharePaid,
            EventPayload::SplitInitialized { .. } => SittingEventType::SplitInitialized,
            EventPayload::SplitRedistributed { .. } => SittingEventType::SplitRedistributed,
        }
    }
}
