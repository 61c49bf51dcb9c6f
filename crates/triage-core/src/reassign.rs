//! Reassignment coordinator
//!
//! Moves ticket ownership between agents while keeping both load counters
//! consistent: single manual reassignments, and the mass sweep that runs
//! when an agent is deactivated.

use crate::audit::{AuditEvent, TargetRef};
use crate::engine::TicketEngine;
use crate::error::EngineError;
use crate::notify::EmailKind;
use crate::types::{ActorRef, AgentId, TicketId};
use serde::Serialize;
use serde_json::json;

/// Outcome of a mass reassignment, per ticket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReassignmentReport {
    /// Tickets moved to a new agent
    pub reassigned: Vec<(TicketId, AgentId)>,
    /// Tickets left without an assignee
    pub unassigned: Vec<TicketId>,
}

impl ReassignmentReport {
    /// Number of tickets processed
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.reassigned.len() + self.unassigned.len()
    }
}

impl TicketEngine {
    /// Move a ticket from one agent to another
    ///
    /// The target is checked fresh: it must be active and below capacity,
    /// and the slot is taken with an atomic conditional increment, so a
    /// rejected reassignment leaves both loads and the assignment untouched.
    ///
    /// # Errors
    /// - `EngineError::TicketNotFound` / `EngineError::AgentNotFound`
    /// - `EngineError::TicketTerminal` for a resolved or closed ticket
    /// - `EngineError::InactiveAgent` / `EngineError::NoCapacity`
    pub async fn manual_reassign(
        &self,
        ticket_id: TicketId,
        from: AgentId,
        to: AgentId,
        actor: ActorRef,
    ) -> Result<crate::types::Ticket, EngineError> {
        let now = self.clock().now();
        let from_agent = self
            .registry()
            .get(from)
            .ok_or(EngineError::AgentNotFound(from))?;
        let to_agent = self
            .registry()
            .get(to)
            .ok_or(EngineError::AgentNotFound(to))?;

        let ticket = self.store().with_ticket(ticket_id, |t| {
            if t.is_terminal() {
                return Err(EngineError::TicketTerminal(ticket_id));
            }

            self.registry().try_reserve(to)?;
            if let Err(e) = self.registry().decrement_load(from) {
                tracing::warn!(ticket = %ticket_id, agent = %from, error = %e, "source load release failed");
            }

            t.assigned_agent_id = Some(to);
            t.push_system_note(
                now,
                format!(
                    "Reassigned from agent {} to agent {}",
                    from_agent.name, to_agent.name
                ),
            );
            t.updated_at = now;
            Ok(t.clone())
        })?;

        self.audit_sink()
            .record(
                AuditEvent::new(
                    "ticket.reassigned",
                    actor,
                    TargetRef::Ticket(ticket_id),
                    format!("Reassigned from {} to {}", from_agent.name, to_agent.name),
                    now,
                )
                .with_metadata(json!({
                    "from_agent": from.to_string(),
                    "to_agent": to.to_string(),
                })),
            )
            .await;

        if let Some(email) = to_agent.email.as_deref() {
            self.send_email_logged(EmailKind::Assigned, email, &ticket)
                .await;
        }

        Ok(ticket)
    }

    /// Reroute every non-terminal ticket held by an agent
    ///
    /// Each ticket goes back through the router with the agent excluded;
    /// tickets with no available replacement are left unassigned. The
    /// agent's load is then reset to zero unconditionally, whatever the
    /// per-ticket bookkeeping said: a deactivated agent must end at zero.
    ///
    /// # Errors
    /// - `EngineError::AgentNotFound`
    pub async fn reassign_agent_tickets(
        &self,
        agent_id: AgentId,
    ) -> Result<ReassignmentReport, EngineError> {
        let agent = self
            .registry()
            .get(agent_id)
            .ok_or(EngineError::AgentNotFound(agent_id))?;
        let now = self.clock().now();
        let mut report = ReassignmentReport::default();

        for ticket_id in self.store().assigned_to(agent_id) {
            let outcome = self.store().with_ticket(ticket_id, |t| {
                if t.is_terminal() || t.assigned_agent_id != Some(agent_id) {
                    return Ok(None);
                }
                match self.router().reserve_agent(&t.category, Some(agent_id)) {
                    Some(new_agent) => {
                        t.assigned_agent_id = Some(new_agent.id);
                        t.push_system_note(
                            now,
                            format!("Reassigned to agent {} from {}", new_agent.name, agent.name),
                        );
                        t.updated_at = now;
                        Ok(Some(Some(new_agent.id)))
                    }
                    None => {
                        t.assigned_agent_id = None;
                        t.push_system_note(
                            now,
                            format!("Unassigned: no agent available to replace {}", agent.name),
                        );
                        t.updated_at = now;
                        Ok(Some(None))
                    }
                }
            });

            match outcome {
                Ok(Some(Some(new_agent))) => {
                    report.reassigned.push((ticket_id, new_agent));
                    self.audit_sink()
                        .record(
                            AuditEvent::new(
                                "ticket.reassigned",
                                ActorRef::System,
                                TargetRef::Ticket(ticket_id),
                                format!("Reassigned away from {}", agent.name),
                                now,
                            )
                            .with_metadata(json!({
                                "from_agent": agent_id.to_string(),
                                "to_agent": new_agent.to_string(),
                            })),
                        )
                        .await;
                }
                Ok(Some(None)) => {
                    report.unassigned.push(ticket_id);
                    self.audit_sink()
                        .record(AuditEvent::new(
                            "ticket.unassigned",
                            ActorRef::System,
                            TargetRef::Ticket(ticket_id),
                            format!("Unassigned after {} left the pool", agent.name),
                            now,
                        ))
                        .await;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(ticket = %ticket_id, error = %e, "reassignment skipped");
                }
            }
        }

        self.registry().reset_load(agent_id)?;
        tracing::info!(
            agent = %agent_id,
            reassigned = report.reassigned.len(),
            unassigned = report.unassigned.len(),
            "agent tickets rerouted"
        );
        Ok(report)
    }

    /// Deactivate an agent and reroute its tickets
    ///
    /// The active flag flips first so the router can no longer pick the
    /// agent while the sweep runs.
    ///
    /// # Errors
    /// - `EngineError::AgentNotFound`
    pub async fn deactivate_agent(
        &self,
        agent_id: AgentId,
    ) -> Result<ReassignmentReport, EngineError> {
        self.registry().set_active(agent_id, false)?;
        self.audit_sink()
            .record(AuditEvent::new(
                "agent.deactivated",
                ActorRef::System,
                TargetRef::Agent(agent_id),
                "Agent deactivated".to_string(),
                self.clock().now(),
            ))
            .await;
        self.reassign_agent_tickets(agent_id).await
    }
}
