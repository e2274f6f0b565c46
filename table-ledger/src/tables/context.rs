//! Command execution context
//!
//! Actions mutate a working copy of the sitting through this context and
//! record one audit event per state change. Nothing becomes visible until
//! the manager commits the working copy.

use shared::sitting::{EventPayload, SittingEvent, SittingSnapshot};

pub struct CommandContext<'a> {
    pub snapshot: &'a mut SittingSnapshot,
    command_id: &'a str,
    now: i64,
    events: Vec<SittingEvent>,
}

impl<'a> CommandContext<'a> {
    pub fn new(snapshot: &'a mut SittingSnapshot, command_id: &'a str, now: i64) -> Self {
        Self {
            snapshot,
            command_id,
            now,
            events: Vec::new(),
        }
    }

    /// Server timestamp of this command (Unix milliseconds)
    pub fn now(&self) -> i64 {
        self.now
    }

    pub fn command_id(&self) -> &str {
        self.command_id
    }

    /// Append an audit event, allocating the next per-sitting sequence
    pub fn record(&mut self, payload: EventPayload) {
        let sequence = self.snapshot.last_sequence + 1;
        self.snapshot.last_sequence = sequence;
        self.snapshot.updated_at = self.now;

        self.events.push(SittingEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            sequence,
            sitting_id: self.snapshot.sitting_id.clone(),
            table_id: self.snapshot.table_id.clone(),
            timestamp: self.now,
            command_id: self.command_id.to_string(),
            event_type: payload.event_type(),
            payload,
        });
    }

    pub fn events(&self) -> &[SittingEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<SittingEvent> {
        self.events
    }
}
