//! Table account engine
//!
//! One sitting per table: dish orders, participants, the ledger, split
//! shares and the three payment modalities, driven by `TableLedgerManager`.

pub mod actions;
pub mod context;
pub mod error;
pub mod ledger;
pub mod manager;
pub mod money;
pub mod notifier;
pub mod participants;
pub mod payment;
pub mod registry;
pub mod split;
pub mod storage;

pub use error::{LedgerError, LedgerResult};
pub use manager::TableLedgerManager;
pub use notifier::{BroadcastNotifier, NotifyError, RealtimeNotifier};
pub use split::MaterialityPolicy;
pub use storage::{LedgerStorage, StorageError};
