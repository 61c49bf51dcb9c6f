//! Error types for the triage engine
//!
//! All engine mutations fail synchronously with a specific kind and a
//! human-readable message. Notification and audit failures are never
//! surfaced here; collaborators log and swallow them.

use crate::types::{AgentId, TicketId, TicketStatus};

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Ticket id does not resolve
    #[error("ticket not found: {0}")]
    TicketNotFound(TicketId),

    /// Agent id does not resolve
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// Status change forbidden by the transition table
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status
        from: TicketStatus,
        /// Requested status
        to: TicketStatus,
    },

    /// Action attempted on a resolved or closed ticket
    #[error("ticket {0} is in a terminal state")]
    TicketTerminal(TicketId),

    /// Target agent exists but is deactivated
    #[error("agent {0} is inactive")]
    InactiveAgent(AgentId),

    /// Target agent has no remaining load budget
    #[error("agent {agent} has no capacity (max: {max_load})")]
    NoCapacity {
        /// The saturated agent
        agent: AgentId,
        /// Its capacity
        max_load: u32,
    },

    /// Malformed input reaching the engine
    #[error("validation failed: {0}")]
    Validation(String),
}

/// Error kind classification, independent of the concrete variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Ticket or agent id does not resolve
    NotFound,
    /// Action forbidden by the ticket's state
    InvalidTransition,
    /// Target agent is deactivated
    InactiveAgent,
    /// Target agent is at capacity
    NoCapacity,
    /// Malformed input
    Validation,
}

impl EngineError {
    /// Classify this error
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TicketNotFound(_) | Self::AgentNotFound(_) => ErrorKind::NotFound,
            Self::InvalidTransition { .. } | Self::TicketTerminal(_) => {
                ErrorKind::InvalidTransition
            }
            Self::InactiveAgent(_) => ErrorKind::InactiveAgent,
            Self::NoCapacity { .. } => ErrorKind::NoCapacity,
            Self::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Check for the not-found kind
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
