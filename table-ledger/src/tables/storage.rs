//! redb-based storage layer for table sittings
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `sittings` | `table_id` | `SittingSnapshot` | Open sitting per table |
//! | `closed_sittings` | `sitting_id` | `SittingSnapshot` | Closed sittings (archive) |
//! | `dish_index` | `dish_id` | `DishLocation` | Routes dish-addressed commands |
//! | `events` | `(sitting_id, sequence)` | `SittingEvent` | Audit trail (append-only) |
//! | `processed_commands` | `command_id` | `CommandOutcome` | Idempotency |
//! | `sitting_commands` | `sitting_id` | `Vec<command_id>` | Commands committed per sitting |
//! | `retired_sittings` | `(closed_at, sitting_id)` | `()` | Closed sittings awaiting command cleanup |
//!
//! # Atomicity
//!
//! Every command commits all of its writes in one write transaction, so a
//! crash either keeps the whole command or none of it.
//!
//! # Command retention
//!
//! Command ids of a closed sitting stay replayable for the retention
//! window, then are dropped from `processed_commands` by a later closing
//! commit (or on startup).

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::{Deserialize, Serialize};
use shared::sitting::{CommandOutcome, EventPayload, SittingEvent, SittingSnapshot};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Open sittings: key = table_id, value = JSON-serialized SittingSnapshot
const SITTINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("sittings");

/// Closed sittings: key = sitting_id, value = JSON-serialized SittingSnapshot
const CLOSED_SITTINGS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("closed_sittings");

/// Dish index: key = dish_id, value = JSON-serialized DishLocation
const DISH_INDEX_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("dish_index");

/// Events: key = (sitting_id, sequence), value = JSON-serialized SittingEvent
const EVENTS_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("events");

/// Processed commands: key = command_id, value = JSON-serialized CommandOutcome
const PROCESSED_COMMANDS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("processed_commands");

/// Sitting commands: key = sitting_id, value = JSON-serialized Vec<command_id>
const SITTING_COMMANDS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("sitting_commands");

/// Retired sittings: key = (closed_at, sitting_id)
const RETIRED_SITTINGS_TABLE: TableDefinition<(u64, &str), ()> =
    TableDefinition::new("retired_sittings");

/// Default command retention after a sitting closes (24h)
const DEFAULT_COMMAND_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Where a dish lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DishLocation {
    pub table_id: String,
    pub sitting_id: String,
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub open_sittings: u64,
    pub closed_sittings: u64,
    pub events: u64,
    pub processed_commands: u64,
}

/// Sitting storage backed by redb
#[derive(Clone)]
pub struct LedgerStorage {
    db: Arc<Database>,
    command_retention_ms: u64,
}

impl LedgerStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate` by default: once `commit()`
    /// returns the data survives a power loss.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create all tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SITTINGS_TABLE)?;
            let _ = write_txn.open_table(CLOSED_SITTINGS_TABLE)?;
            let _ = write_txn.open_table(DISH_INDEX_TABLE)?;
            let _ = write_txn.open_table(EVENTS_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
            let _ = write_txn.open_table(SITTING_COMMANDS_TABLE)?;
            let _ = write_txn.open_table(RETIRED_SITTINGS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            command_retention_ms: DEFAULT_COMMAND_RETENTION.as_millis() as u64,
        })
    }

    /// How long a closed sitting's command ids keep replaying
    pub fn with_command_retention(mut self, retention: Duration) -> Self {
        self.command_retention_ms = retention.as_millis() as u64;
        self
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Command Commit ==========

    /// Persist everything one command produced, atomically
    pub fn commit(
        &self,
        command_id: &str,
        snapshot: &SittingSnapshot,
        events: &[SittingEvent],
        outcome: &CommandOutcome,
    ) -> StorageResult<()> {
        let txn = self.begin_write()?;
        self.store_snapshot(&txn, snapshot)?;
        for event in events {
            self.store_event(&txn, event)?;
            if let EventPayload::DishOrderPlaced { dish } = &event.payload {
                self.index_dish(&txn, &dish.dish_id, &snapshot.table_id, &snapshot.sitting_id)?;
            }
        }
        self.mark_command_processed(&txn, command_id, outcome)?;
        self.track_sitting_command(&txn, &snapshot.sitting_id, command_id)?;

        if !snapshot.is_open() {
            let now = shared::util::now_millis().max(0) as u64;
            let closed_at = snapshot.closed_at.map_or(now, |t| t.max(0) as u64);
            self.retire_sitting(&txn, &snapshot.sitting_id, closed_at)?;
            self.cleanup_expired_commands(&txn, now)?;
        }

        txn.commit()?;
        Ok(())
    }

    // ========== Command Idempotency ==========

    /// Outcome of a previously committed command
    pub fn get_processed_outcome(&self, command_id: &str) -> StorageResult<Option<CommandOutcome>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        match table.get(command_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Mark a command as processed, remembering its outcome
    pub fn mark_command_processed(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
        outcome: &CommandOutcome,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        let value = serde_json::to_vec(outcome)?;
        table.insert(command_id, value.as_slice())?;
        Ok(())
    }

    /// Remember which sitting a command belongs to
    fn track_sitting_command(
        &self,
        txn: &WriteTransaction,
        sitting_id: &str,
        command_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(SITTING_COMMANDS_TABLE)?;
        let mut command_ids: Vec<String> = match table.get(sitting_id)? {
            Some(value) => serde_json::from_slice(value.value())?,
            None => Vec::new(),
        };
        if !command_ids.iter().any(|id| id == command_id) {
            command_ids.push(command_id.to_string());
        }
        let value = serde_json::to_vec(&command_ids)?;
        table.insert(sitting_id, value.as_slice())?;
        Ok(())
    }

    /// Queue a closed sitting for command cleanup
    fn retire_sitting(
        &self,
        txn: &WriteTransaction,
        sitting_id: &str,
        closed_at: u64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(RETIRED_SITTINGS_TABLE)?;
        table.insert((closed_at, sitting_id), ())?;
        Ok(())
    }

    /// Drop command ids of sittings closed longer than the retention window
    ///
    /// Returns the number of command ids removed.
    fn cleanup_expired_commands(&self, txn: &WriteTransaction, now: u64) -> StorageResult<usize> {
        let cutoff = now.saturating_sub(self.command_retention_ms);

        let expired: Vec<(u64, String)> = {
            let retired = txn.open_table(RETIRED_SITTINGS_TABLE)?;
            let mut keys = Vec::new();
            for result in retired.range((0u64, "")..(cutoff.saturating_add(1), ""))? {
                let (key, _value) = result?;
                let (closed_at, sitting_id) = key.value();
                keys.push((closed_at, sitting_id.to_string()));
            }
            keys
        };
        if expired.is_empty() {
            return Ok(0);
        }

        let mut removed = 0;
        let mut tracked = txn.open_table(SITTING_COMMANDS_TABLE)?;
        let mut retired = txn.open_table(RETIRED_SITTINGS_TABLE)?;
        for (closed_at, sitting_id) in &expired {
            let command_ids: Vec<String> = match tracked.remove(sitting_id.as_str())? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => Vec::new(),
            };
            self.cleanup_command_ids(txn, &command_ids)?;
            retired.remove((*closed_at, sitting_id.as_str()))?;
            removed += command_ids.len();
        }

        tracing::debug!(
            sittings = expired.len(),
            commands = removed,
            "Cleaned up expired command ids"
        );
        Ok(removed)
    }

    /// Remove command ids from the idempotency table
    pub fn cleanup_command_ids(
        &self,
        txn: &WriteTransaction,
        command_ids: &[String],
    ) -> StorageResult<()> {
        if command_ids.is_empty() {
            return Ok(());
        }
        let mut table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        for command_id in command_ids {
            table.remove(command_id.as_str())?;
        }
        Ok(())
    }

    /// Run the expired command cleanup in its own transaction (startup)
    pub fn purge_expired_commands(&self) -> StorageResult<usize> {
        let txn = self.begin_write()?;
        let now = shared::util::now_millis().max(0) as u64;
        let removed = self.cleanup_expired_commands(&txn, now)?;
        txn.commit()?;
        Ok(removed)
    }

    // ========== Event Operations ==========

    /// Store an event
    pub fn store_event(&self, txn: &WriteTransaction, event: &SittingEvent) -> StorageResult<()> {
        let mut table = txn.open_table(EVENTS_TABLE)?;
        let key = (event.sitting_id.as_str(), event.sequence);
        let value = serde_json::to_vec(event)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// Get all events for a sitting, in sequence order
    pub fn get_events_for_sitting(&self, sitting_id: &str) -> StorageResult<Vec<SittingEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let mut events = Vec::new();
        let range_start = (sitting_id, 0u64);
        let range_end = (sitting_id, u64::MAX);

        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            let event: SittingEvent = serde_json::from_slice(value.value())?;
            events.push(event);
        }

        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    // ========== Snapshot Operations ==========

    /// Store a snapshot
    ///
    /// Open sittings live under their table. A closed sitting moves to the
    /// archive and frees the table slot, unless another sitting already
    /// holds it.
    pub fn store_snapshot(
        &self,
        txn: &WriteTransaction,
        snapshot: &SittingSnapshot,
    ) -> StorageResult<()> {
        let value = serde_json::to_vec(snapshot)?;
        let mut open = txn.open_table(SITTINGS_TABLE)?;

        if snapshot.is_open() {
            open.insert(snapshot.table_id.as_str(), value.as_slice())?;
            return Ok(());
        }

        let holds_slot = match open.get(snapshot.table_id.as_str())? {
            Some(current) => {
                let current: SittingSnapshot = serde_json::from_slice(current.value())?;
                current.sitting_id == snapshot.sitting_id
            }
            None => false,
        };
        if holds_slot {
            open.remove(snapshot.table_id.as_str())?;
        }

        let mut closed = txn.open_table(CLOSED_SITTINGS_TABLE)?;
        closed.insert(snapshot.sitting_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Open sitting of a table
    pub fn get_open_sitting(&self, table_id: &str) -> StorageResult<Option<SittingSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SITTINGS_TABLE)?;

        match table.get(table_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All open sittings (used to restore state on startup)
    pub fn get_open_sittings(&self) -> StorageResult<Vec<SittingSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SITTINGS_TABLE)?;

        let mut snapshots = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let snapshot: SittingSnapshot = serde_json::from_slice(value.value())?;
            snapshots.push(snapshot);
        }

        Ok(snapshots)
    }

    /// Archived sitting by id
    pub fn get_closed_sitting(&self, sitting_id: &str) -> StorageResult<Option<SittingSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CLOSED_SITTINGS_TABLE)?;

        match table.get(sitting_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    // ========== Dish Index ==========

    fn index_dish(
        &self,
        txn: &WriteTransaction,
        dish_id: &str,
        table_id: &str,
        sitting_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(DISH_INDEX_TABLE)?;
        let location = DishLocation {
            table_id: table_id.to_string(),
            sitting_id: sitting_id.to_string(),
        };
        let value = serde_json::to_vec(&location)?;
        table.insert(dish_id, value.as_slice())?;
        Ok(())
    }

    /// Locate a dish by id
    pub fn find_dish(&self, dish_id: &str) -> StorageResult<Option<DishLocation>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DISH_INDEX_TABLE)?;

        match table.get(dish_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    // ========== Stats ==========

    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        use redb::ReadableTableMetadata;

        let read_txn = self.db.begin_read()?;
        Ok(StorageStats {
            open_sittings: read_txn.open_table(SITTINGS_TABLE)?.len()?,
            closed_sittings: read_txn.open_table(CLOSED_SITTINGS_TABLE)?.len()?,
            events: read_txn.open_table(EVENTS_TABLE)?.len()?,
            processed_commands: read_txn.open_table(PROCESSED_COMMANDS_TABLE)?.len()?,
        })
    }
}
