//! TableLedgerManager - per-table command processing
//!
//! This module handles:
//! - Per-table serialization (one writer per table, tables independent)
//! - Command validation and idempotency
//! - Persistence to redb (one transaction per command)
//! - Publishing committed snapshots for lock-free reads
//! - Realtime notification after commit
//!
//! # Command Flow
//!
//! ```text
//! execute(cmd)
//!     ├─ 1. Idempotency check (command_id)
//!     ├─ 2. Validate input
//!     ├─ 3. Resolve table (dish commands via dish index)
//!     ├─ 4. Acquire table lock (bounded by lock timeout)
//!     ├─ 5. Idempotency re-check under lock
//!     ├─ 6. Load working copy of the sitting
//!     ├─ 7. Execute action on the working copy
//!     ├─ 8. Commit snapshot + events + outcome (blocking pool)
//!     ├─ 9. Publish snapshot, release lock
//!     └─ 10. Notify
//! ```
//!
//! A command that fails, or whose future is dropped, before step 8 leaves
//! storage and the published state untouched. Steps 8-9 run on tokio's
//! blocking pool and own the table lock, so once started they finish even
//! if the caller goes away.

use super::actions::{CommandAction, CommandHandler};
use super::context::CommandContext;
use super::error::{LedgerError, LedgerResult};
use super::notifier::{self, BroadcastNotifier, RealtimeNotifier};
use super::split::MaterialityPolicy;
use super::storage::{DishLocation, LedgerStorage};
use crate::core::LedgerConfig;
use dashmap::DashMap;
use shared::message::TableNotification;
use shared::sitting::{
    CommandOutcome, CommandResponse, DishOrder, EventPayload, Participant, SittingEvent,
    SittingSnapshot, SittingSummary, SplitStatus, TableCommand, TableCommandPayload,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};

/// Where a command runs
struct Target {
    table_id: String,
    dish: Option<DishLocation>,
}

/// TableLedgerManager for command processing
pub struct TableLedgerManager {
    storage: LedgerStorage,
    policy: MaterialityPolicy,
    lock_timeout: Duration,
    /// One write lock per table
    locks: DashMap<String, Arc<Mutex<()>>>,
    /// Last committed open sitting per table
    sittings: Arc<DashMap<String, SittingSnapshot>>,
    broadcast: Arc<BroadcastNotifier>,
    notifiers: Vec<Arc<dyn RealtimeNotifier>>,
}

impl std::fmt::Debug for TableLedgerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableLedgerManager")
            .field("storage", &"<LedgerStorage>")
            .field("policy", &self.policy)
            .field("lock_timeout", &self.lock_timeout)
            .field("open_sittings", &self.sittings.len())
            .field("notifiers", &self.notifiers.len())
            .finish()
    }
}

impl TableLedgerManager {
    /// Open the redb file under the configured work dir
    pub fn new(config: &LedgerConfig) -> LedgerResult<Self> {
        std::fs::create_dir_all(&config.work_dir).map_err(|e| {
            LedgerError::Internal(format!(
                "failed to create work dir {}: {}",
                config.work_dir, e
            ))
        })?;
        let storage = LedgerStorage::open(config.db_path())?;
        Self::with_storage(storage, config)
    }

    /// Create a manager over existing storage, restoring open sittings
    pub fn with_storage(storage: LedgerStorage, config: &LedgerConfig) -> LedgerResult<Self> {
        let storage = storage.with_command_retention(config.command_retention());
        let purged = storage.purge_expired_commands()?;
        if purged > 0 {
            tracing::info!(purged, "Expired command ids cleaned up");
        }

        let sittings = Arc::new(DashMap::new());
        let restored = storage.get_open_sittings()?;
        let count = restored.len();
        for snapshot in restored {
            sittings.insert(snapshot.table_id.clone(), snapshot);
        }
        if count > 0 {
            tracing::info!(restored = count, "Open sittings restored from storage");
        }

        let broadcast = Arc::new(BroadcastNotifier::new(config.event_channel_capacity));
        let notifiers: Vec<Arc<dyn RealtimeNotifier>> = vec![broadcast.clone()];

        tracing::info!(
            threshold = %config.materiality_threshold,
            lock_timeout_ms = config.lock_timeout_ms,
            command_retention_secs = config.command_retention_secs,
            "TableLedgerManager started"
        );

        Ok(Self {
            storage,
            policy: MaterialityPolicy::new(config.materiality_threshold),
            lock_timeout: config.lock_timeout(),
            locks: DashMap::new(),
            sittings,
            broadcast,
            notifiers,
        })
    }

    /// Register an additional notifier (e.g. a websocket fan-out)
    pub fn add_notifier(&mut self, notifier: Arc<dyn RealtimeNotifier>) {
        self.notifiers.push(notifier);
    }

    /// Subscribe to notification broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<TableNotification> {
        self.broadcast.subscribe()
    }

    /// Get storage reference
    pub fn storage(&self) -> &LedgerStorage {
        &self.storage
    }

    pub fn policy(&self) -> MaterialityPolicy {
        self.policy
    }

    // ========== Commands ==========

    /// Execute a command and return the wire response
    pub async fn execute_command(&self, cmd: TableCommand) -> CommandResponse {
        let command_id = cmd.command_id.clone();
        match self.execute(cmd).await {
            Ok(outcome) => CommandResponse::success(command_id, outcome),
            Err(err) => CommandResponse::error(command_id, err.into()),
        }
    }

    /// Execute a command
    pub async fn execute(&self, cmd: TableCommand) -> LedgerResult<CommandOutcome> {
        tracing::debug!(
            command_id = %cmd.command_id,
            command = cmd.payload.name(),
            "Processing command"
        );

        // 1. Idempotency check (before lock)
        if let Some(outcome) = self.storage.get_processed_outcome(&cmd.command_id)? {
            tracing::warn!(command_id = %cmd.command_id, "Duplicate command, replaying outcome");
            return Ok(outcome);
        }

        // 2. Validate input
        let action = CommandAction::new(&cmd.payload, self.policy);
        action.validate()?;

        // 3. Resolve table
        let target = self.resolve_target(&cmd.payload)?;

        // 4. Acquire table lock
        let lock = self.table_lock(&target.table_id);
        let guard = tokio::time::timeout(self.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| {
                tracing::warn!(table_id = %target.table_id, "Timed out waiting for table lock");
                LedgerError::Busy(target.table_id.clone())
            })?;

        // 5. A retry may have committed while we waited
        if let Some(outcome) = self.storage.get_processed_outcome(&cmd.command_id)? {
            tracing::warn!(command_id = %cmd.command_id, "Duplicate command, replaying outcome");
            return Ok(outcome);
        }

        // 6-7. Working copy → action
        let (working, events, outcome) = match self.prepare(&cmd, &action, &target) {
            Ok(prepared) => prepared,
            Err(err) => {
                drop(guard);
                tracing::info!(
                    command_id = %cmd.command_id,
                    table_id = %target.table_id,
                    error = %err,
                    "Command rejected"
                );
                return Err(err);
            }
        };

        // 8-9. Commit → publish; the redb write blocks, the lock goes with it
        let storage = self.storage.clone();
        let sittings = self.sittings.clone();
        let command_id = cmd.command_id.clone();
        let (snapshot, events, outcome) = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            storage.commit(&command_id, &working, &events, &outcome)?;
            publish(&sittings, &working);
            Ok::<_, LedgerError>((working, events, outcome))
        })
        .await
        .map_err(|e| LedgerError::Internal(format!("commit task failed: {}", e)))??;

        tracing::info!(
            command_id = %cmd.command_id,
            table_id = %snapshot.table_id,
            sitting_id = %snapshot.sitting_id,
            remaining = %snapshot.remaining_amount,
            event_count = events.len(),
            "Command processed successfully"
        );

        // 10. Notify (best effort)
        self.notify(&snapshot, &events, &outcome).await;
        Ok(outcome)
    }

    /// Run the action against a working copy, with the table lock held
    fn prepare(
        &self,
        cmd: &TableCommand,
        action: &CommandAction,
        target: &Target,
    ) -> LedgerResult<(SittingSnapshot, Vec<SittingEvent>, CommandOutcome)> {
        let now = shared::util::now_millis();
        let (mut working, opened) = self.load_working_copy(&cmd.payload, target, now)?;

        let mut ctx = CommandContext::new(&mut working, &cmd.command_id, now);
        if opened {
            ctx.record(EventPayload::SittingOpened {});
        }
        let mut outcome = action.execute(&mut ctx)?;
        let events = ctx.into_events();

        outcome.sitting_id = Some(working.sitting_id.clone());
        outcome.summary = Some(working.summary());
        Ok((working, events, outcome))
    }

    fn resolve_target(&self, payload: &TableCommandPayload) -> LedgerResult<Target> {
        if let Some(table_id) = payload.table_id() {
            if table_id.trim().is_empty() {
                return Err(LedgerError::Validation("table_id must not be empty".into()));
            }
            return Ok(Target {
                table_id: table_id.to_string(),
                dish: None,
            });
        }

        let dish_id = payload
            .dish_id()
            .ok_or_else(|| LedgerError::Internal("command names neither table nor dish".into()))?;
        let location = self
            .storage
            .find_dish(dish_id)?
            .ok_or_else(|| LedgerError::DishNotFound(dish_id.to_string()))?;
        Ok(Target {
            table_id: location.table_id.clone(),
            dish: Some(location),
        })
    }

    /// Clone of the state the command works on; true when freshly opened
    ///
    /// Called with the table lock held.
    fn load_working_copy(
        &self,
        payload: &TableCommandPayload,
        target: &Target,
        now: i64,
    ) -> LedgerResult<(SittingSnapshot, bool)> {
        let open = self.sittings.get(&target.table_id).map(|s| s.clone());

        match payload {
            TableCommandPayload::PlaceDishOrder { .. } => Ok(match open {
                Some(snapshot) => (snapshot, false),
                None => {
                    let sitting_id = uuid::Uuid::new_v4().to_string();
                    tracing::info!(
                        table_id = %target.table_id,
                        sitting_id = %sitting_id,
                        "Opening sitting"
                    );
                    (
                        SittingSnapshot::new(sitting_id, target.table_id.clone(), now),
                        true,
                    )
                }
            }),
            TableCommandPayload::PayAmount { .. }
            | TableCommandPayload::InitializeSplit { .. }
            | TableCommandPayload::PaySplitShare { .. } => open
                .map(|snapshot| (snapshot, false))
                .ok_or_else(|| LedgerError::NoActiveSitting(target.table_id.clone())),
            TableCommandPayload::PayDish { dish_id } => {
                let location = target
                    .dish
                    .as_ref()
                    .ok_or_else(|| LedgerError::DishNotFound(dish_id.clone()))?;
                if let Some(snapshot) = open.filter(|s| s.sitting_id == location.sitting_id) {
                    return Ok((snapshot, false));
                }
                // the dish's sitting is over
                let closed = self.storage.get_closed_sitting(&location.sitting_id)?;
                match closed.as_ref().and_then(|s| s.find_dish(dish_id)) {
                    Some(dish) if dish.is_paid() => Err(LedgerError::AlreadyPaid(dish_id.clone())),
                    _ => Err(LedgerError::NoActiveSitting(target.table_id.clone())),
                }
            }
            TableCommandPayload::UpdateKitchenStatus { dish_id, .. } => {
                let location = target
                    .dish
                    .as_ref()
                    .ok_or_else(|| LedgerError::DishNotFound(dish_id.clone()))?;
                if let Some(snapshot) = open.filter(|s| s.sitting_id == location.sitting_id) {
                    return Ok((snapshot, false));
                }
                // kitchen work continues after the bill is settled
                self.storage
                    .get_closed_sitting(&location.sitting_id)?
                    .map(|snapshot| (snapshot, false))
                    .ok_or_else(|| LedgerError::SittingNotFound(location.sitting_id.clone()))
            }
        }
    }

    fn table_lock(&self, table_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(table_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn notify(
        &self,
        snapshot: &SittingSnapshot,
        events: &[SittingEvent],
        outcome: &CommandOutcome,
    ) {
        let notifications = notifier::build_notifications(snapshot, events, outcome);
        for notifier in &self.notifiers {
            for notification in &notifications {
                if let Err(e) = notifier.notify(notification.clone()).await {
                    tracing::warn!(
                        table_id = %snapshot.table_id,
                        notification = %notification,
                        error = %e,
                        "Notification delivery failed"
                    );
                }
            }
        }
    }

    // ========== Queries ==========

    /// Ledger view of the table's open sitting; `None` when the table has no bill
    pub fn get_summary(&self, table_id: &str) -> Option<SittingSummary> {
        self.sittings.get(table_id).map(|s| s.summary())
    }

    /// Full open sitting of a table
    pub fn get_snapshot(&self, table_id: &str) -> Option<SittingSnapshot> {
        self.sittings.get(table_id).map(|s| s.clone())
    }

    /// Active split of the table, if any
    pub fn get_split_status(&self, table_id: &str) -> Option<SplitStatus> {
        self.sittings.get(table_id).and_then(|s| s.split_status())
    }

    /// Dish orders of the open sitting (empty when none)
    pub fn list_dish_orders(&self, table_id: &str) -> Vec<DishOrder> {
        self.sittings
            .get(table_id)
            .map(|s| super::registry::list(&s))
            .unwrap_or_default()
    }

    /// Participants of the open sitting (empty when none)
    pub fn list_participants(&self, table_id: &str) -> Vec<Participant> {
        self.sittings
            .get(table_id)
            .map(|s| super::participants::list(&s))
            .unwrap_or_default()
    }

    /// Summaries of every open sitting
    pub fn get_open_sittings(&self) -> Vec<SittingSummary> {
        let mut summaries: Vec<_> = self.sittings.iter().map(|s| s.summary()).collect();
        summaries.sort_by(|a, b| a.table_id.cmp(&b.table_id));
        summaries
    }

    /// Audit trail of a sitting, open or closed
    pub fn get_sitting_events(&self, sitting_id: &str) -> LedgerResult<Vec<SittingEvent>> {
        Ok(self.storage.get_events_for_sitting(sitting_id)?)
    }

    /// Closed sitting from history
    pub fn get_closed_sitting(&self, sitting_id: &str) -> LedgerResult<Option<SittingSnapshot>> {
        Ok(self.storage.get_closed_sitting(sitting_id)?)
    }
}

/// Swap in the committed state
fn publish(sittings: &DashMap<String, SittingSnapshot>, snapshot: &SittingSnapshot) {
    if snapshot.is_open() {
        sittings.insert(snapshot.table_id.clone(), snapshot.clone());
    } else {
        sittings.remove_if(&snapshot.table_id, |_, s| s.sitting_id == snapshot.sitting_id);
    }
}

#[cfg(test)]
mod tests;
