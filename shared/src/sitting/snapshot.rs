//! Sitting snapshot - the committed state of one table account

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{DishOrder, Modality, Owner};

/// Sitting lifecycle. `Open → Closed` is the only transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SittingStatus {
    #[default]
    Open,
    Closed,
}

// ============================================================================
// Participants
// ============================================================================

/// Running totals a participant contributed, one per modality
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Contributions {
    pub total_paid_individual: Decimal,
    pub total_paid_amount: Decimal,
    pub total_paid_split: Decimal,
}

impl Contributions {
    pub fn credit(&mut self, modality: Modality, amount: Decimal) {
        match modality {
            Modality::Individual => self.total_paid_individual += amount,
            Modality::Amount => self.total_paid_amount += amount,
            Modality::Split => self.total_paid_split += amount,
        }
    }

    /// Sum across all modalities
    pub fn total(&self) -> Decimal {
        self.total_paid_individual + self.total_paid_amount + self.total_paid_split
    }
}

/// One distinct diner known to a sitting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Participant {
    pub owner: Owner,
    #[serde(flatten)]
    pub contributions: Contributions,
    pub joined_at: i64,
    pub updated_at: i64,
}

impl Participant {
    pub fn new(owner: Owner, now: i64) -> Self {
        Self {
            owner,
            contributions: Contributions::default(),
            joined_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// Split shares
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SplitShareStatus {
    #[default]
    Pending,
    Paid,
}

/// One participant's slice of an active bill division
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplitShare {
    pub owner: Owner,
    pub expected_amount: Decimal,
    #[serde(default)]
    pub amount_paid: Decimal,
    pub status: SplitShareStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<i64>,
    /// Sitting total at the last (re)division, kept for audit
    pub original_total: Decimal,
}

impl SplitShare {
    pub fn is_pending(&self) -> bool {
        self.status == SplitShareStatus::Pending
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Sitting snapshot - one open dining session's account for a table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SittingSnapshot {
    pub sitting_id: String,
    pub table_id: String,
    pub status: SittingStatus,
    /// Dish orders in placement order
    pub dishes: Vec<DishOrder>,
    /// Participants in order of first dish order
    #[serde(default)]
    pub participants: Vec<Participant>,
    /// Active split division (empty when no split is active)
    #[serde(default)]
    pub split_shares: Vec<SplitShare>,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub remaining_amount: Decimal,
    pub item_count: usize,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<i64>,
    /// Sequence of the last audit event written for this sitting
    pub last_sequence: u64,
}

impl SittingSnapshot {
    /// Create an empty open sitting for a table
    pub fn new(sitting_id: String, table_id: String, now: i64) -> Self {
        Self {
            sitting_id,
            table_id,
            status: SittingStatus::Open,
            dishes: Vec::new(),
            participants: Vec::new(),
            split_shares: Vec::new(),
            total_amount: Decimal::ZERO,
            paid_amount: Decimal::ZERO,
            remaining_amount: Decimal::ZERO,
            item_count: 0,
            created_at: now,
            updated_at: now,
            closed_at: None,
            last_sequence: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == SittingStatus::Open
    }

    pub fn has_active_split(&self) -> bool {
        !self.split_shares.is_empty()
    }

    pub fn find_dish(&self, dish_id: &str) -> Option<&DishOrder> {
        self.dishes.iter().find(|d| d.dish_id == dish_id)
    }

    pub fn find_participant(&self, owner: &Owner) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.owner == owner)
    }

    pub fn summary(&self) -> SittingSummary {
        SittingSummary {
            sitting_id: self.sitting_id.clone(),
            table_id: self.table_id.clone(),
            status: self.status,
            total_amount: self.total_amount,
            paid_amount: self.paid_amount,
            remaining_amount: self.remaining_amount,
            item_count: self.item_count,
            created_at: self.created_at,
        }
    }

    /// Split overlay, if a division is active
    pub fn split_status(&self) -> Option<SplitStatus> {
        if !self.has_active_split() {
            return None;
        }
        Some(SplitStatus {
            sitting_id: self.sitting_id.clone(),
            table_id: self.table_id.clone(),
            shares: self.split_shares.clone(),
            pending_count: self.split_shares.iter().filter(|s| s.is_pending()).count(),
            remaining_amount: self.remaining_amount,
        })
    }
}

/// Ledger view of a sitting (`getSummary`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SittingSummary {
    pub sitting_id: String,
    pub table_id: String,
    pub status: SittingStatus,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub remaining_amount: Decimal,
    pub item_count: usize,
    pub created_at: i64,
}

/// Split view of a sitting (`getSplitStatus`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplitStatus {
    pub sitting_id: String,
    pub table_id: String,
    pub shares: Vec<SplitShare>,
    pub pending_count: usize,
    pub remaining_amount: Decimal,
}
