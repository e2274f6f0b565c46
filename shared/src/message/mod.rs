//! 实时通知消息类型
//!
//! Post-commit notifications the ledger hands to the realtime fan-out
//! layer. Each carries enough summary data for a client to redraw its
//! view without another fetch.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::sitting::{DishOrder, SittingStatus, SittingSummary};

/// Ledger figures sent with `order.updated`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdatedPayload {
    pub table_id: String,
    pub sitting_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub paid_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub remaining_amount: Decimal,
    pub no_items: usize,
    pub status: SittingStatus,
}

impl From<&SittingSummary> for OrderUpdatedPayload {
    fn from(summary: &SittingSummary) -> Self {
        Self {
            table_id: summary.table_id.clone(),
            sitting_id: summary.sitting_id.clone(),
            total_amount: summary.total_amount,
            paid_amount: summary.paid_amount,
            remaining_amount: summary.remaining_amount,
            no_items: summary.item_count,
            status: summary.status,
        }
    }
}

/// Realtime notification (服务端 -> 客户端)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum TableNotification {
    /// A dish order was placed
    #[serde(rename = "dish.created")]
    DishCreated { table_id: String, dish: DishOrder },

    /// Ledger totals changed
    #[serde(rename = "order.updated")]
    OrderUpdated(OrderUpdatedPayload),

    /// Clients should reload the whole table view
    #[serde(rename = "table.fullRefresh")]
    TableFullRefresh { table_id: String, reason: String },

    /// Split shares were (re)computed
    #[serde(rename = "split.updated")]
    SplitUpdated {
        table_id: String,
        #[serde(with = "rust_decimal::serde::float_option")]
        amount_per_person: Option<Decimal>,
        pending_count: usize,
        redistributed: bool,
    },
}

impl TableNotification {
    pub fn table_id(&self) -> &str {
        match self {
            TableNotification::DishCreated { table_id, .. }
            | TableNotification::TableFullRefresh { table_id, .. }
            | TableNotification::SplitUpdated { table_id, .. } => table_id,
            TableNotification::OrderUpdated(payload) => &payload.table_id,
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            TableNotification::DishCreated { .. } => "dish.created",
            TableNotification::OrderUpdated(_) => "order.updated",
            TableNotification::TableFullRefresh { .. } => "table.fullRefresh",
            TableNotification::SplitUpdated { .. } => "split.updated",
        }
    }
}

impl fmt::Display for TableNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.event_name(), self.table_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_updated_wire_shape() {
        let n = TableNotification::OrderUpdated(OrderUpdatedPayload {
            table_id: "t-1".into(),
            sitting_id: "s-1".into(),
            total_amount: Decimal::new(9000, 2),
            paid_amount: Decimal::new(5000, 2),
            remaining_amount: Decimal::new(4000, 2),
            no_items: 3,
            status: SittingStatus::Open,
        });
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["event"], "order.updated");
        assert_eq!(json["data"]["totalAmount"], 90.0);
        assert_eq!(json["data"]["remainingAmount"], 40.0);
        assert_eq!(json["data"]["noItems"], 3);
        assert_eq!(json["data"]["status"], "open");
    }

    #[test]
    fn test_full_refresh_name() {
        let n = TableNotification::TableFullRefresh {
            table_id: "t-2".into(),
            reason: "sitting_closed".into(),
        };
        assert_eq!(n.to_string(), "table.fullRefresh@t-2");
    }
}
