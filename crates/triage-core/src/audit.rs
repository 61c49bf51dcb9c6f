//! Audit sink collaborator contract
//!
//! Every mutation emits one structured event. The sink is write-only and
//! best-effort: implementations log their own failures and never propagate
//! them to the mutating caller.

use crate::types::{ActorRef, AgentId, TicketId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What an audit event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TargetRef {
    /// A ticket
    Ticket(TicketId),
    /// An agent
    Agent(AgentId),
}

impl std::fmt::Display for TargetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetRef::Ticket(id) => write!(f, "ticket {id}"),
            TargetRef::Agent(id) => write!(f, "agent {id}"),
        }
    }
}

/// Structured audit event
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// Machine-readable action name, e.g. `ticket.status_changed`
    pub action: String,
    /// Who performed the action
    pub actor: ActorRef,
    /// What the action applied to
    pub target: TargetRef,
    /// Human-readable summary
    pub description: String,
    /// Before/after values and context
    pub metadata: serde_json::Value,
    /// When the action happened
    pub at: DateTime<Utc>,
}

impl AuditEvent {
    /// Create a new audit event with empty metadata
    #[inline]
    #[must_use]
    pub fn new(
        action: impl Into<String>,
        actor: ActorRef,
        target: TargetRef,
        description: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            action: action.into(),
            actor,
            target,
            description: description.into(),
            metadata: serde_json::Value::Null,
            at,
        }
    }

    /// With before/after metadata
    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Write-only audit event sink
#[async_trait::async_trait]
pub trait AuditSink: Send + Sync + std::fmt::Debug {
    /// Record one event; implementations swallow and log their own failures
    async fn record(&self, event: AuditEvent);
}

/// Default sink that emits events to the tracing subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait::async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) {
        tracing::info!(
            action = %event.action,
            actor = %event.actor,
            target = %event.target,
            "{}",
            event.description
        );
    }
}
