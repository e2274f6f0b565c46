//! Active participant tracker
//!
//! One row per distinct owner known to a sitting, with what they paid per
//! modality. Rows live inside the sitting snapshot and are purged when the
//! sitting closes.

use super::context::CommandContext;
use rust_decimal::Decimal;
use shared::sitting::{EventPayload, Modality, Owner, Participant, SittingSnapshot};

/// Idempotent upsert keyed by owner identity
///
/// Returns true when the owner is new to the sitting.
pub fn register_or_update(ctx: &mut CommandContext<'_>, owner: &Owner) -> bool {
    let now = ctx.now();
    if let Some(existing) = ctx
        .snapshot
        .participants
        .iter_mut()
        .find(|p| &p.owner == owner)
    {
        existing.updated_at = now;
        return false;
    }

    ctx.snapshot
        .participants
        .push(Participant::new(owner.clone(), now));
    ctx.record(EventPayload::ParticipantJoined {
        owner: owner.clone(),
    });
    true
}

/// Add a payment to the owner's running total for `modality`
pub fn credit_payment(
    ctx: &mut CommandContext<'_>,
    owner: &Owner,
    modality: Modality,
    amount: Decimal,
) {
    register_or_update(ctx, owner);
    let now = ctx.now();
    if let Some(participant) = ctx
        .snapshot
        .participants
        .iter_mut()
        .find(|p| &p.owner == owner)
    {
        participant.contributions.credit(modality, amount);
        participant.updated_at = now;
    }
}

/// Total contributed by `owner` across all modalities
pub fn contribution_of(snapshot: &SittingSnapshot, owner: &Owner) -> Decimal {
    snapshot
        .find_participant(owner)
        .map(|p| p.contributions.total())
        .unwrap_or(Decimal::ZERO)
}

pub fn list(snapshot: &SittingSnapshot) -> Vec<Participant> {
    snapshot.participants.clone()
}

/// Called once, by ledger closure
pub fn clear(snapshot: &mut SittingSnapshot) {
    snapshot.participants.clear();
}
