//! Ticket state machine and engine front door
//!
//! Owns every ticket mutation after intake: creation with auto-assignment,
//! replies (including the reopen-on-reply transition), explicit status
//! changes with SLA and load bookkeeping, and priority changes with deadline
//! recomputation. All mutations append a system note to the ticket and emit
//! one structured audit event.

use crate::audit::{AuditEvent, AuditSink, TargetRef, TracingAuditSink};
use crate::classify::{Classifier, GeneralClassifier};
use crate::clock::{Clock, SystemClock};
use crate::error::EngineError;
use crate::notify::{EmailKind, LoggingNotifier, Notifier};
use crate::registry::AgentRegistry;
use crate::router::AssignmentRouter;
use crate::state::{self, ReopenReason};
use crate::store::TicketStore;
use crate::types::{
    ActorRef, AgentId, AgentSpec, EngineConfig, NewTicket, Priority, Ticket, TicketId,
    TicketMessage, TicketStatus,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Aggregate counters over the ticket population
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// All tickets
    pub total: usize,
    /// Open tickets
    pub open: usize,
    /// In-progress tickets
    pub in_progress: usize,
    /// Resolved tickets
    pub resolved: usize,
    /// Closed tickets
    pub closed: usize,
    /// Tickets with the breach flag set
    pub breached: usize,
    /// Non-terminal tickets without an assignee
    pub unassigned: usize,
}

/// The ticket lifecycle and agent assignment engine
#[derive(Debug)]
pub struct TicketEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    store: TicketStore,
    registry: Arc<AgentRegistry>,
    router: AssignmentRouter,
    notifier: Arc<dyn Notifier>,
    audit: Arc<dyn AuditSink>,
}

impl TicketEngine {
    /// Create an engine with default collaborators
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let registry = Arc::new(AgentRegistry::new());
        let router = AssignmentRouter::new(
            Arc::clone(&registry),
            Arc::new(GeneralClassifier),
            config.max_assign_attempts,
        );
        Self {
            config,
            clock: Arc::new(SystemClock),
            store: TicketStore::new(),
            registry,
            router,
            notifier: Arc::new(LoggingNotifier),
            audit: Arc::new(TracingAuditSink),
        }
    }

    /// With an injected clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// With a notification dispatcher
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// With an audit sink
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// With a classifier
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.router = AssignmentRouter::new(
            Arc::clone(&self.registry),
            classifier,
            self.config.max_assign_attempts,
        );
        self
    }

    /// Engine configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The agent registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Fetch a ticket by id
    #[must_use]
    pub fn ticket(&self, id: TicketId) -> Option<Ticket> {
        self.store.get(id)
    }

    /// Aggregate counters over the ticket population
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        let mut stats = EngineStats::default();
        self.store.for_each(|t| {
            stats.total += 1;
            match t.status {
                TicketStatus::Open => stats.open += 1,
                TicketStatus::InProgress => stats.in_progress += 1,
                TicketStatus::Resolved => stats.resolved += 1,
                TicketStatus::Closed => stats.closed += 1,
            }
            if t.sla_breached {
                stats.breached += 1;
            }
            if t.assigned_agent_id.is_none() && !t.is_terminal() {
                stats.unassigned += 1;
            }
        });
        stats
    }

    /// Register an agent
    ///
    /// # Errors
    /// - `EngineError::Validation` for a rejected spec
    pub async fn register_agent(&self, spec: AgentSpec) -> Result<AgentId, EngineError> {
        let name = spec.name.clone();
        let id = self.registry.register(spec)?;
        self.audit
            .record(AuditEvent::new(
                "agent.registered",
                ActorRef::System,
                TargetRef::Agent(id),
                format!("Agent {name} registered"),
                self.clock.now(),
            ))
            .await;
        Ok(id)
    }

    /// Create a ticket from an intake payload
    ///
    /// The ticket enters `Open` with its SLA deadline derived from the
    /// priority, and auto-assignment runs before the first persist.
    ///
    /// # Errors
    /// - `EngineError::Validation` for a blank subject or malformed address
    pub async fn create_ticket(&self, intake: NewTicket) -> Result<Ticket, EngineError> {
        if intake.subject.trim().is_empty() {
            return Err(EngineError::Validation("subject is empty".to_string()));
        }
        if !intake.customer_email.contains('@') {
            return Err(EngineError::Validation(format!(
                "malformed customer email: {}",
                intake.customer_email
            )));
        }

        let now = self.clock.now();
        let category = self.router.resolve_category(
            intake.category.as_deref(),
            &format!("{} {}", intake.subject, intake.body),
        );

        let mut ticket = Ticket {
            id: TicketId::new(),
            subject: intake.subject,
            body: intake.body.clone(),
            customer_ref: intake.customer_ref.clone(),
            customer_email: intake.customer_email,
            status: TicketStatus::Open,
            priority: intake.priority,
            category: category.clone(),
            assigned_agent_id: None,
            sla_due_at: self.config.sla.due_from(intake.priority, now),
            sla_breached: false,
            resolved_at: None,
            needs_manual_review: false,
            reopen_count: 0,
            reopened_at: None,
            first_response_at: None,
            messages: vec![TicketMessage {
                author: ActorRef::Customer(intake.customer_ref.clone()),
                body: intake.body,
                at: now,
            }],
            created_at: now,
            updated_at: now,
        };

        // Assignment runs before the first persist; the slot is reserved
        // atomically so the counter and the row can only diverge if the
        // insert below fails, which the in-memory store cannot do.
        let assigned = self.router.reserve_agent(&category, None);
        if let Some(agent) = &assigned {
            ticket.assigned_agent_id = Some(agent.id);
            ticket.push_system_note(now, format!("Auto-assigned to agent {}", agent.name));
        }

        self.store.insert(ticket.clone());
        tracing::info!(ticket = %ticket.id, %category, priority = %ticket.priority, "ticket created");

        self.audit
            .record(
                AuditEvent::new(
                    "ticket.created",
                    ActorRef::Customer(intake.customer_ref),
                    TargetRef::Ticket(ticket.id),
                    format!("Ticket created with priority {}", ticket.priority),
                    now,
                )
                .with_metadata(json!({
                    "category": category,
                    "priority": ticket.priority.as_str(),
                    "assigned_agent": ticket.assigned_agent_id.map(|a| a.to_string()),
                    "sla_due_at": ticket.sla_due_at.to_rfc3339(),
                })),
            )
            .await;

        if let Some(email) = assigned.as_ref().and_then(|a| a.email.as_deref()) {
            self.send_email_logged(EmailKind::Assigned, email, &ticket)
                .await;
        }

        Ok(ticket)
    }

    /// Append a customer or agent message
    ///
    /// A message on a resolved ticket runs the reopen-on-reply transition
    /// first and leaves the ticket back in the open queue; a reply on a live
    /// ticket moves it to `InProgress`. The first agent-authored message sets
    /// `first_response_at`.
    ///
    /// # Errors
    /// - `EngineError::TicketNotFound`
    /// - `EngineError::InvalidTransition` for a closed ticket
    /// - `EngineError::Validation` for an empty body
    pub async fn add_message(
        &self,
        id: TicketId,
        author: ActorRef,
        body: impl Into<String>,
    ) -> Result<Ticket, EngineError> {
        let body = body.into();
        if body.trim().is_empty() {
            return Err(EngineError::Validation("message body is empty".to_string()));
        }

        let now = self.clock.now();
        let mut reopened = false;
        let ticket = self.store.with_ticket(id, |t| {
            match t.status {
                TicketStatus::Closed => {
                    return Err(EngineError::InvalidTransition {
                        from: TicketStatus::Closed,
                        to: TicketStatus::InProgress,
                    })
                }
                TicketStatus::Resolved => {
                    self.apply_reopen(t, now, ReopenReason::Reply);
                    reopened = true;
                }
                _ => {}
            }

            t.messages.push(TicketMessage {
                author: author.clone(),
                body,
                at: now,
            });
            if author.is_agent() && t.first_response_at.is_none() {
                t.first_response_at = Some(now);
            }
            // A reopened ticket goes back to the open queue; a reply on a
            // live ticket marks it as being worked
            if !reopened {
                t.status = TicketStatus::InProgress;
            }
            t.updated_at = now;
            Ok(t.clone())
        })?;

        self.audit
            .record(
                AuditEvent::new(
                    "ticket.message_added",
                    author,
                    TargetRef::Ticket(id),
                    "Message added".to_string(),
                    now,
                )
                .with_metadata(json!({ "reopened": reopened })),
            )
            .await;

        Ok(ticket)
    }

    /// Change a ticket's status
    ///
    /// Entering a terminal state stamps `resolved_at`, releases the assigned
    /// agent's load exactly once and clears the manual-review flag; leaving a
    /// terminal state runs the reopen transition.
    ///
    /// # Errors
    /// - `EngineError::TicketNotFound`
    /// - `EngineError::InvalidTransition` per the transition table
    pub async fn set_status(
        &self,
        id: TicketId,
        to: TicketStatus,
        actor: ActorRef,
    ) -> Result<Ticket, EngineError> {
        let now = self.clock.now();
        let mut from_status = TicketStatus::Open;
        let mut released: Option<AgentId> = None;

        let ticket = self.store.with_ticket(id, |t| {
            let from = t.status;
            state::validate_transition(from, to)?;
            from_status = from;

            if state::is_reopen(from, to) {
                self.apply_reopen(t, now, ReopenReason::StatusChange);
            } else if to.is_terminal() && !from.is_terminal() {
                t.status = to;
                t.resolved_at = Some(now);
                t.needs_manual_review = false;
                if let Some(agent) = t.assigned_agent_id {
                    if let Err(e) = self.registry.decrement_load(agent) {
                        tracing::warn!(ticket = %id, agent = %agent, error = %e, "load release failed");
                    }
                    released = Some(agent);
                }
                t.push_system_note(now, format!("Ticket {to} by {actor}"));
            } else {
                t.status = to;
                t.push_system_note(now, format!("Status changed to {to} by {actor}"));
            }
            t.updated_at = now;
            Ok(t.clone())
        })?;

        self.audit
            .record(
                AuditEvent::new(
                    "ticket.status_changed",
                    actor,
                    TargetRef::Ticket(id),
                    format!("Status changed from {from_status} to {to}"),
                    now,
                )
                .with_metadata(json!({
                    "from": from_status.as_str(),
                    "to": to.as_str(),
                    "released_agent": released.map(|a| a.to_string()),
                })),
            )
            .await;

        if to == TicketStatus::Resolved && !from_status.is_terminal() {
            let recipient = ticket.customer_email.clone();
            self.send_email_logged(EmailKind::Resolved, &recipient, &ticket)
                .await;
        }

        Ok(ticket)
    }

    /// Change a ticket's priority
    ///
    /// On a non-terminal ticket a real change recomputes the SLA deadline
    /// from now and clears the breach flag when the fresh deadline is in the
    /// future. Terminal tickets keep their SLA fields untouched.
    ///
    /// # Errors
    /// - `EngineError::TicketNotFound`
    pub async fn set_priority(
        &self,
        id: TicketId,
        to: Priority,
        actor: ActorRef,
    ) -> Result<Ticket, EngineError> {
        let now = self.clock.now();
        let mut old_priority = None;

        let ticket = self.store.with_ticket(id, |t| {
            if t.priority == to {
                return Ok(t.clone());
            }
            let old = t.priority;
            old_priority = Some(old);
            t.priority = to;
            if !t.status.is_terminal() {
                t.sla_due_at = self.config.sla.due_from(to, now);
                if t.sla_due_at > now {
                    t.sla_breached = false;
                }
            }
            t.push_system_note(now, format!("Priority changed from {old} to {to} by {actor}"));
            t.updated_at = now;
            Ok(t.clone())
        })?;

        if let Some(old) = old_priority {
            self.audit
                .record(
                    AuditEvent::new(
                        "ticket.priority_changed",
                        actor,
                        TargetRef::Ticket(id),
                        format!("Priority changed from {old} to {to}"),
                        now,
                    )
                    .with_metadata(json!({
                        "from": old.as_str(),
                        "to": to.as_str(),
                        "sla_due_at": ticket.sla_due_at.to_rfc3339(),
                    })),
                )
                .await;
        }

        Ok(ticket)
    }

    /// Set or clear the manual-review flag (external AI-failure signal)
    ///
    /// # Errors
    /// - `EngineError::TicketNotFound`
    pub async fn set_manual_review(
        &self,
        id: TicketId,
        needed: bool,
    ) -> Result<Ticket, EngineError> {
        let now = self.clock.now();
        let ticket = self.store.with_ticket(id, |t| {
            t.needs_manual_review = needed;
            if needed {
                t.push_system_note(now, "Flagged for manual review");
            }
            t.updated_at = now;
            Ok(t.clone())
        })?;

        self.audit
            .record(AuditEvent::new(
                "ticket.manual_review",
                ActorRef::System,
                TargetRef::Ticket(id),
                format!("Manual review flag set to {needed}"),
                now,
            ))
            .await;

        Ok(ticket)
    }

    /// Reopen bookkeeping shared by the reply and status-change paths
    ///
    /// The assigned agent's load was released on resolution, so it is
    /// re-acquired here with an unconditional increment.
    pub(crate) fn apply_reopen(&self, t: &mut Ticket, now: DateTime<Utc>, reason: ReopenReason) {
        t.status = TicketStatus::Open;
        t.sla_due_at = self.config.sla.due_from(t.priority, now);
        t.resolved_at = None;
        if let Some(agent) = t.assigned_agent_id {
            if let Err(e) = self.registry.increment_load(agent) {
                tracing::warn!(ticket = %t.id, agent = %agent, error = %e, "reopen could not re-acquire load");
            }
        }
        t.reopen_count += 1;
        t.reopened_at = Some(now);
        if t.sla_due_at > now {
            t.sla_breached = false;
        }
        t.push_system_note(now, format!("Ticket reopened ({reason})"));
    }

    pub(crate) async fn send_email_logged(
        &self,
        kind: EmailKind,
        recipient: &str,
        ticket: &Ticket,
    ) -> bool {
        let delivered = self.notifier.send_email(kind, recipient, ticket).await;
        if !delivered {
            tracing::warn!(%kind, %recipient, ticket = %ticket.id, "email delivery failed");
        }
        delivered
    }

    pub(crate) fn store(&self) -> &TicketStore {
        &self.store
    }

    pub(crate) fn router(&self) -> &AssignmentRouter {
        &self.router
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub(crate) fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub(crate) fn audit_sink(&self) -> &Arc<dyn AuditSink> {
        &self.audit
    }
}

impl Default for TicketEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_validates_intake() {
        let engine = TicketEngine::default();

        let blank = NewTicket::new("  ", "body", "c-1", "c@example.com");
        assert!(engine.create_ticket(blank).await.is_err());

        let bad_email = NewTicket::new("subject", "body", "c-1", "not-an-email");
        assert!(engine.create_ticket(bad_email).await.is_err());
    }

    #[tokio::test]
    async fn create_without_agents_stays_unassigned() {
        let engine = TicketEngine::default();
        let ticket = engine
            .create_ticket(NewTicket::new("printer", "it is on fire", "c-1", "c@example.com"))
            .await
            .unwrap();

        assert_eq!(ticket.status, TicketStatus::Open);
        assert!(ticket.assigned_agent_id.is_none());
        assert_eq!(ticket.category, crate::types::GENERAL_CATEGORY);
    }

    #[tokio::test]
    async fn create_assigns_and_increments_load() {
        let engine = TicketEngine::default();
        let agent = engine.register_agent(AgentSpec::new("alice")).await.unwrap();

        let ticket = engine
            .create_ticket(NewTicket::new("subject", "body", "c-1", "c@example.com"))
            .await
            .unwrap();

        assert_eq!(ticket.assigned_agent_id, Some(agent));
        assert_eq!(engine.registry().get(agent).unwrap().current_load, 1);
        // Auto-assignment leaves a system note
        assert!(ticket
            .messages
            .iter()
            .any(|m| m.author == ActorRef::System && m.body.contains("Auto-assigned")));
    }

    #[tokio::test]
    async fn message_on_closed_ticket_rejected() {
        let engine = TicketEngine::default();
        let ticket = engine
            .create_ticket(NewTicket::new("subject", "body", "c-1", "c@example.com"))
            .await
            .unwrap();
        engine
            .set_status(ticket.id, TicketStatus::Closed, ActorRef::System)
            .await
            .unwrap();

        let err = engine
            .add_message(ticket.id, ActorRef::Customer("c-1".to_string()), "hello?")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidTransition);
    }

    #[tokio::test]
    async fn stats_reflect_population() {
        let engine = TicketEngine::default();
        let a = engine
            .create_ticket(NewTicket::new("one", "body", "c-1", "c@example.com"))
            .await
            .unwrap();
        engine
            .create_ticket(NewTicket::new("two", "body", "c-2", "c@example.com"))
            .await
            .unwrap();
        engine
            .set_status(a.id, TicketStatus::Resolved, ActorRef::System)
            .await
            .unwrap();

        let stats = engine.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.open, 1);
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.unassigned, 1);
    }
}
