//! Split-bill coordinator
//!
//! An optional overlay on the ledger: one share per participant in the
//! division. `initialize_split_bill` replaces the whole set, `redistribute`
//! recomputes pending shares in place when a new charge arrives, and
//! closure purges everything.

use super::context::CommandContext;
use super::error::{LedgerError, LedgerResult};
use super::money;
use rust_decimal::Decimal;
use shared::sitting::{
    EventPayload, Owner, Participant, RedistributionReport, SittingSnapshot, SplitShare,
    SplitShareStatus,
};
use std::collections::HashSet;

/// Who counts as having paid their own way outside the split
///
/// A participant whose contribution across every modality reached the
/// threshold is left out of redistribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialityPolicy {
    threshold: Decimal,
}

impl MaterialityPolicy {
    pub fn new(threshold: Decimal) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> Decimal {
        self.threshold
    }

    pub fn is_material_contribution(&self, participant: &Participant) -> bool {
        participant.contributions.total() >= self.threshold
    }
}

impl Default for MaterialityPolicy {
    fn default() -> Self {
        Self::new(Decimal::TEN)
    }
}

fn pending_share(owner: Owner, expected_amount: Decimal, original_total: Decimal) -> SplitShare {
    SplitShare {
        owner,
        expected_amount,
        amount_paid: Decimal::ZERO,
        status: SplitShareStatus::Pending,
        paid_at: None,
        original_total,
    }
}

/// Fill the head count with `Guest N` owners for anyone not named
fn fill_owners(number_of_people: usize, named: &[Owner]) -> LedgerResult<Vec<Owner>> {
    if named.len() > number_of_people {
        return Err(LedgerError::Validation(format!(
            "{} participants named for a split of {}",
            named.len(),
            number_of_people
        )));
    }

    let mut seen = HashSet::new();
    for owner in named {
        if !seen.insert(owner) {
            return Err(LedgerError::Validation(format!(
                "participant {} listed twice",
                owner
            )));
        }
    }

    let mut owners = named.to_vec();
    let mut n = 1;
    while owners.len() < number_of_people {
        let guest = Owner::named(format!("Guest {}", n));
        if !owners.contains(&guest) {
            owners.push(guest);
        }
        n += 1;
    }
    Ok(owners)
}

/// Divide the remaining balance into equal shares
///
/// Divides what is still owed, not the total, so nobody who already paid
/// is charged again. Any previous division is discarded.
pub fn initialize_split_bill(
    ctx: &mut CommandContext<'_>,
    number_of_people: u32,
    participants: &[Owner],
) -> LedgerResult<RedistributionReport> {
    money::validate_split_people(number_of_people)?;
    let owners = fill_owners(number_of_people as usize, participants)?;

    if !ctx.snapshot.is_open() {
        return Err(LedgerError::SittingClosed(ctx.snapshot.sitting_id.clone()));
    }
    let remaining = ctx.snapshot.remaining_amount;
    if remaining <= Decimal::ZERO {
        return Err(LedgerError::Validation(
            "nothing left to split on this sitting".into(),
        ));
    }

    let amount_per_person = money::per_person(remaining, owners.len());
    let total = ctx.snapshot.total_amount;
    ctx.snapshot.split_shares = owners
        .iter()
        .map(|owner| pending_share(owner.clone(), amount_per_person, total))
        .collect();

    ctx.record(EventPayload::SplitInitialized {
        number_of_people,
        amount_per_person,
        owners: owners.clone(),
    });

    tracing::info!(
        table_id = %ctx.snapshot.table_id,
        sitting_id = %ctx.snapshot.sitting_id,
        number_of_people,
        amount_per_person = %amount_per_person,
        "Split initialized"
    );

    Ok(RedistributionReport {
        redistributed: true,
        amount_per_person: Some(amount_per_person),
        pending_count: owners.len(),
        added_owner: None,
    })
}

/// Recompute pending shares after a new charge
///
/// Only the owner who just ordered may join a running division. Pending
/// shares of material contributors keep their figure.
pub fn redistribute(
    ctx: &mut CommandContext<'_>,
    triggering_owner: &Owner,
    policy: &MaterialityPolicy,
) -> RedistributionReport {
    if !ctx.snapshot.has_active_split() {
        return RedistributionReport::skipped();
    }

    let snapshot = &mut *ctx.snapshot;
    let total = snapshot.total_amount;

    let represented = snapshot
        .split_shares
        .iter()
        .any(|s| &s.owner == triggering_owner);
    let has_ordered = snapshot.dishes.iter().any(|d| &d.owner == triggering_owner);
    let added_owner = if !represented && has_ordered {
        snapshot
            .split_shares
            .push(pending_share(triggering_owner.clone(), Decimal::ZERO, total));
        Some(triggering_owner.clone())
    } else {
        None
    };

    let pending: Vec<usize> = snapshot
        .split_shares
        .iter()
        .enumerate()
        .filter(|(_, share)| share.is_pending())
        .filter(|(_, share)| {
            !snapshot
                .find_participant(&share.owner)
                .is_some_and(|p| policy.is_material_contribution(p))
        })
        .map(|(i, _)| i)
        .collect();

    if pending.is_empty() {
        tracing::debug!(
            table_id = %snapshot.table_id,
            "Split redistribution skipped, no pending participants"
        );
        return RedistributionReport {
            redistributed: false,
            amount_per_person: None,
            pending_count: 0,
            added_owner,
        };
    }

    let amount_per_person = money::per_person(snapshot.remaining_amount, pending.len());
    let mut pending_owners = Vec::with_capacity(pending.len());
    for &i in &pending {
        let share = &mut snapshot.split_shares[i];
        share.expected_amount = amount_per_person;
        share.original_total = total;
        pending_owners.push(share.owner.clone());
    }

    tracing::info!(
        table_id = %snapshot.table_id,
        sitting_id = %snapshot.sitting_id,
        pending = pending.len(),
        amount_per_person = %amount_per_person,
        remaining = %snapshot.remaining_amount,
        "Split redistributed"
    );

    ctx.record(EventPayload::SplitRedistributed {
        amount_per_person,
        pending_owners,
        added_owner: added_owner.clone(),
    });

    RedistributionReport {
        redistributed: true,
        amount_per_person: Some(amount_per_person),
        pending_count: pending.len(),
        added_owner,
    }
}

/// Settle the owner's pending share and return what it charges
///
/// The last pending share takes the whole remaining balance so rounding
/// residue is absorbed there. No share ever charges more than is owed.
pub fn settle_share(ctx: &mut CommandContext<'_>, owner: &Owner) -> LedgerResult<Decimal> {
    let now = ctx.now();
    let snapshot = &mut *ctx.snapshot;
    let remaining = snapshot.remaining_amount;
    let pending_count = snapshot
        .split_shares
        .iter()
        .filter(|s| s.is_pending())
        .count();

    let share = snapshot
        .split_shares
        .iter_mut()
        .find(|s| &s.owner == owner && s.is_pending())
        .ok_or_else(|| LedgerError::NoPendingShare(owner.key()))?;

    let amount = if pending_count == 1 {
        remaining
    } else {
        share.expected_amount.min(remaining)
    };

    share.status = SplitShareStatus::Paid;
    share.amount_paid = amount;
    share.paid_at = Some(now);
    Ok(amount)
}

/// Called by ledger closure
pub fn clear(snapshot: &mut SittingSnapshot) {
    snapshot.split_shares.clear();
}
