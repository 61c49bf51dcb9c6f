//! Ticket status transition table
//!
//! The single source of truth for which status changes are legal. Reopen is
//! a named transition here, not conditional logic buried in the reply
//! handler.

use crate::error::EngineError;
use crate::types::TicketStatus;

/// Why a ticket left a terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReopenReason {
    /// A message arrived on a resolved ticket
    Reply,
    /// An explicit status change back to open
    StatusChange,
}

impl std::fmt::Display for ReopenReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReopenReason::Reply => f.write_str("new reply"),
            ReopenReason::StatusChange => f.write_str("status change"),
        }
    }
}

/// Validates a status transition.
pub fn validate_transition(from: TicketStatus, to: TicketStatus) -> Result<(), EngineError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(EngineError::InvalidTransition { from, to })
    }
}

/// Legal target statuses from `from`.
///
/// Terminal states exit only through the reopen transition back to `Open`;
/// a resolved ticket may additionally be closed without reopening.
pub fn allowed_transitions(from: TicketStatus) -> Vec<TicketStatus> {
    use TicketStatus::*;
    match from {
        Open => vec![InProgress, Resolved, Closed],
        InProgress => vec![Open, Resolved, Closed],
        Resolved => vec![Open, Closed],
        Closed => vec![Open],
    }
}

/// Whether `from -> to` is the reopen transition
#[inline]
#[must_use]
pub fn is_reopen(from: TicketStatus, to: TicketStatus) -> bool {
    from.is_terminal() && to == TicketStatus::Open
}

fn allowed(from: TicketStatus, to: TicketStatus) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
