//! Realtime notifier
//!
//! Post-commit notifications for connected clients. Delivery is best
//! effort: the ledger state is already committed when a notifier runs and
//! a failure here is only logged.

use async_trait::async_trait;
use shared::message::{OrderUpdatedPayload, TableNotification};
use shared::sitting::{CommandOutcome, EventPayload, SittingEvent, SittingSnapshot};
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification channel closed")]
    Closed,

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Receiver of post-commit table notifications
#[async_trait]
pub trait RealtimeNotifier: Send + Sync {
    async fn notify(&self, notification: TableNotification) -> Result<(), NotifyError>;
}

/// In-process fan-out on a tokio broadcast channel
pub struct BroadcastNotifier {
    tx: broadcast::Sender<TableNotification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TableNotification> {
        self.tx.subscribe()
    }
}

impl std::fmt::Debug for BroadcastNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastNotifier")
            .field("receivers", &self.tx.receiver_count())
            .finish()
    }
}

#[async_trait]
impl RealtimeNotifier for BroadcastNotifier {
    async fn notify(&self, notification: TableNotification) -> Result<(), NotifyError> {
        // nobody listening is not a failure
        if self.tx.send(notification).is_err() {
            tracing::trace!("Notification dropped: no active receivers");
        }
        Ok(())
    }
}

/// Notifications for one committed command, in delivery order
///
/// `dish.created` per new dish, one `order.updated` when money or dishes
/// moved, `split.updated` when shares changed, then `table.fullRefresh` on
/// closure or kitchen progress.
pub fn build_notifications(
    snapshot: &SittingSnapshot,
    events: &[SittingEvent],
    outcome: &CommandOutcome,
) -> Vec<TableNotification> {
    let table_id = &snapshot.table_id;
    let mut notifications = Vec::new();
    let mut ledger_changed = false;
    let mut share_paid = false;
    let mut refresh_reason = None;

    for event in events {
        match &event.payload {
            EventPayload::DishOrderPlaced { dish } => {
                notifications.push(TableNotification::DishCreated {
                    table_id: table_id.clone(),
                    dish: dish.clone(),
                });
                ledger_changed = true;
            }
            EventPayload::DishPaid { .. } | EventPayload::AmountPaid { .. } => {
                ledger_changed = true;
            }
            EventPayload::SplitSharePaid { .. } => {
                ledger_changed = true;
                share_paid = true;
            }
            EventPayload::SittingClosed { .. } => {
                ledger_changed = true;
                refresh_reason = Some("sitting_closed");
            }
            EventPayload::KitchenStatusChanged { .. } => {
                refresh_reason.get_or_insert("kitchen_status");
            }
            EventPayload::SittingOpened {}
            | EventPayload::ParticipantJoined { .. }
            | EventPayload::SplitInitialized { .. }
            | EventPayload::SplitRedistributed { .. } => {}
        }
    }

    if ledger_changed {
        notifications.push(TableNotification::OrderUpdated(OrderUpdatedPayload::from(
            &snapshot.summary(),
        )));
    }

    if let Some(report) = &outcome.redistribution {
        notifications.push(TableNotification::SplitUpdated {
            table_id: table_id.clone(),
            amount_per_person: report.amount_per_person,
            pending_count: report.pending_count,
            redistributed: report.redistributed,
        });
    } else if share_paid && let Some(status) = snapshot.split_status() {
        notifications.push(TableNotification::SplitUpdated {
            table_id: table_id.clone(),
            amount_per_person: None,
            pending_count: status.pending_count,
            redistributed: false,
        });
    }

    if let Some(reason) = refresh_reason {
        notifications.push(TableNotification::TableFullRefresh {
            table_id: table_id.clone(),
            reason: reason.to_string(),
        });
    }

    notifications
}
