//! In-memory ticket store
//!
//! Rows are owned exclusively for the duration of one mutation through
//! [`TicketStore::with_ticket`]; there is no cross-ticket ordering and no
//! per-ticket lock held across operations.

use crate::error::EngineError;
use crate::types::{AgentId, Ticket, TicketId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Ticket persistence backed by a concurrent map
#[derive(Debug, Default)]
pub struct TicketStore {
    tickets: DashMap<TicketId, Ticket>,
}

impl TicketStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist a new ticket
    pub fn insert(&self, ticket: Ticket) {
        self.tickets.insert(ticket.id, ticket);
    }

    /// Fetch a ticket by id
    #[must_use]
    pub fn get(&self, id: TicketId) -> Option<Ticket> {
        self.tickets.get(&id).map(|t| t.value().clone())
    }

    /// Mutate one ticket under its row lock
    ///
    /// The closure runs with exclusive access to the row; an `Err` from the
    /// closure leaves whatever it already wrote (callers validate before
    /// mutating).
    ///
    /// # Errors
    /// - `EngineError::TicketNotFound`
    /// - whatever the closure returns
    pub fn with_ticket<R>(
        &self,
        id: TicketId,
        f: impl FnOnce(&mut Ticket) -> Result<R, EngineError>,
    ) -> Result<R, EngineError> {
        let mut entry = self
            .tickets
            .get_mut(&id)
            .ok_or(EngineError::TicketNotFound(id))?;
        f(entry.value_mut())
    }

    /// Ids of non-terminal tickets assigned to `agent`
    #[must_use]
    pub fn assigned_to(&self, agent: AgentId) -> Vec<TicketId> {
        self.tickets
            .iter()
            .filter(|t| !t.is_terminal() && t.assigned_agent_id == Some(agent))
            .map(|t| t.id)
            .collect()
    }

    /// Ids of unbreached non-terminal tickets whose deadline has passed
    #[must_use]
    pub fn breach_candidates(&self, now: DateTime<Utc>) -> Vec<TicketId> {
        self.tickets
            .iter()
            .filter(|t| !t.sla_breached && !t.is_terminal() && t.sla_due_at < now)
            .map(|t| t.id)
            .collect()
    }

    /// Visit every ticket read-only
    pub fn for_each(&self, mut f: impl FnMut(&Ticket)) {
        for entry in self.tickets.iter() {
            f(entry.value());
        }
    }

    /// Number of stored tickets
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    /// Whether the store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}
