//! Shared types for the table ledger
//!
//! Data types exchanged between the ledger engine and its clients
//! (diner devices, kitchen display, admin dashboard): sitting snapshots,
//! dish orders, split shares, commands, command responses and realtime
//! notifications.

pub mod message;
pub mod sitting;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use message::{OrderUpdatedPayload, TableNotification};
pub use sitting::{
    CommandError, CommandErrorCode, CommandOutcome, CommandResponse, DishOrder, Owner,
    SittingSnapshot, SittingStatus, SittingSummary, TableCommand, TableCommandPayload,
};
