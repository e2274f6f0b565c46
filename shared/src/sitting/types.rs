//! Shared value types for table sittings

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::snapshot::SittingSummary;

// ============================================================================
// Owner
// ============================================================================

/// Who placed a dish order (or who a payment is attributed to)
///
/// Owners are compared by identity: two `GuestName("Ana")` values are the
/// same diner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Owner {
    /// Registered user id
    User(String),
    /// Anonymous guest id (issued by the identity layer)
    Guest(String),
    /// Freeform display name typed by a guest
    GuestName(String),
}

impl Owner {
    pub fn user(id: impl Into<String>) -> Self {
        Owner::User(id.into())
    }

    pub fn guest(id: impl Into<String>) -> Self {
        Owner::Guest(id.into())
    }

    pub fn named(name: impl Into<String>) -> Self {
        Owner::GuestName(name.into())
    }

    /// Stable string key, used for logging and storage indices
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Raw id or name without the kind prefix
    pub fn id(&self) -> &str {
        match self {
            Owner::User(id) | Owner::Guest(id) | Owner::GuestName(id) => id,
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::User(id) => write!(f, "user:{}", id),
            Owner::Guest(id) => write!(f, "guest:{}", id),
            Owner::GuestName(name) => write!(f, "name:{}", name),
        }
    }
}

// ============================================================================
// Dish Order
// ============================================================================

/// 出餐状态 - independent of payment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum KitchenStatus {
    #[default]
    Pending,
    Cooking,
    Delivered,
}

impl FromStr for KitchenStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(KitchenStatus::Pending),
            "cooking" => Ok(KitchenStatus::Cooking),
            "delivered" => Ok(KitchenStatus::Delivered),
            other => Err(format!(
                "kitchen status must be one of pending, cooking, delivered; got '{}'",
                other
            )),
        }
    }
}

impl fmt::Display for KitchenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KitchenStatus::Pending => write!(f, "pending"),
            KitchenStatus::Cooking => write!(f, "cooking"),
            KitchenStatus::Delivered => write!(f, "delivered"),
        }
    }
}

/// Payment status of a single dish. Only ever moves `NotPaid → Paid`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    NotPaid,
    Paid,
}

/// The three ways money is applied to a sitting
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    /// One dish paid outright
    Individual,
    /// Free amount against the running balance
    Amount,
    /// Pre-computed equal share of a split bill
    Split,
}

/// Dish order input - what the order-placement request carries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DishInput {
    pub item_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    /// Price of extras (toppings, sides) per unit
    #[serde(default)]
    pub extra_price: Decimal,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<serde_json::Value>,
}

impl DishInput {
    pub fn new(item_name: impl Into<String>, quantity: i32, unit_price: Decimal) -> Self {
        Self {
            item_name: item_name.into(),
            quantity,
            unit_price,
            extra_price: Decimal::ZERO,
            images: Vec::new(),
            custom_fields: None,
        }
    }

    pub fn with_extra(mut self, extra_price: Decimal) -> Self {
        self.extra_price = extra_price;
        self
    }
}

/// Dish order record attached to one sitting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DishOrder {
    pub dish_id: String,
    pub sitting_id: String,
    pub table_id: String,
    pub item_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub extra_price: Decimal,
    /// quantity × (unit_price + extra_price), rounded to cents
    pub line_total: Decimal,
    pub kitchen_status: KitchenStatus,
    pub payment_status: PaymentStatus,
    pub owner: Owner,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<serde_json::Value>,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<i64>,
}

impl DishOrder {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}

// ============================================================================
// Command Response
// ============================================================================

/// Result of a split redistribution, relayed to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedistributionReport {
    /// Whether any share was recomputed
    pub redistributed: bool,
    /// New expected amount per pending participant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_per_person: Option<Decimal>,
    pub pending_count: usize,
    /// Owner newly brought into the division by this order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_owner: Option<Owner>,
}

impl RedistributionReport {
    pub fn skipped() -> Self {
        Self {
            redistributed: false,
            amount_per_person: None,
            pending_count: 0,
            added_owner: None,
        }
    }
}

/// Successful command outcome
///
/// Stored per command id so that a retried command returns exactly what the
/// first attempt returned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CommandOutcome {
    /// Dish id created by `PlaceDishOrder`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dish_id: Option<String>,
    /// Sitting the command acted on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sitting_id: Option<String>,
    /// Ledger state right after the command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SittingSummary>,
    /// Money applied to the ledger by this command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_applied: Option<Decimal>,
    /// Split figure after `InitializeSplit` or a redistribution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redistribution: Option<RedistributionReport>,
    /// True when this command brought the balance to zero
    #[serde(default)]
    pub sitting_closed: bool,
}

/// Command response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// The command ID this responds to
    pub command_id: String,
    /// Whether the command succeeded
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CommandOutcome>,
    /// Error details if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
}

impl CommandResponse {
    pub fn success(command_id: String, outcome: CommandOutcome) -> Self {
        Self {
            command_id,
            success: true,
            outcome: Some(outcome),
            error: None,
        }
    }

    pub fn error(command_id: String, error: CommandError) -> Self {
        Self {
            command_id,
            success: false,
            outcome: None,
            error: Some(error),
        }
    }
}

/// Command error
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandError {
    pub code: CommandErrorCode,
    pub message: String,
    /// Current remaining balance, where the violated rule depends on it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_amount: Option<Decimal>,
}

impl CommandError {
    pub fn new(code: CommandErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            remaining_amount: None,
        }
    }

    pub fn with_remaining(mut self, remaining: Decimal) -> Self {
        self.remaining_amount = Some(remaining);
        self
    }
}

/// Command error codes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandErrorCode {
    ValidationFailed,
    DishNotFound,
    SittingNotFound,
    Overpayment,
    AlreadyPaid,
    NoPendingShare,
    NoActiveSitting,
    SittingClosed,
    InternalError,
    // Storage errors
    StorageFull,
    OutOfMemory,
    StorageCorrupted,
    SystemBusy,
}
