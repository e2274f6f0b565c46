//! Table sitting types
//!
//! - Commands: requests from the request-handling layer
//! - Events: audit records written for every committed change
//! - Snapshots: the current state of one sitting (ledger, dishes,
//!   participants, split shares)

pub mod command;
pub mod event;
pub mod snapshot;
pub mod types;

// Re-exports
pub use command::{TableCommand, TableCommandPayload};
pub use event::{EventPayload, SittingEvent, SittingEventType};
pub use snapshot::{
    Contributions, Participant, SittingSnapshot, SittingStatus, SittingSummary, SplitShare,
    SplitShareStatus, SplitStatus,
};
pub use types::*;
