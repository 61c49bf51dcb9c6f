//! SLA breach sweeper
//!
//! A periodic background task that flags overdue tickets and fires breach
//! notifications. The sweeper only touches breach state, never assignment
//! state. It runs once at startup and then on a fixed interval; sweeps
//! never overlap because a single task awaits each sweep before the next
//! tick, and missed ticks are delayed rather than skipped (queue-next).

use crate::audit::{AuditEvent, TargetRef};
use crate::engine::TicketEngine;
use crate::notify::EmailKind;
use crate::rate_limit::NotifyThrottle;
use crate::types::{ActorRef, Ticket, TicketId};
use serde_json::json;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Candidates scanned
    pub scanned: usize,
    /// Tickets newly flagged breached
    pub breached: Vec<TicketId>,
    /// Breach notifications attempted
    pub notifications_attempted: usize,
    /// Breach notifications that ultimately failed
    pub notifications_failed: usize,
}

/// Periodic SLA breach scanner
#[derive(Debug)]
pub struct SlaSweeper {
    engine: Arc<TicketEngine>,
    interval: std::time::Duration,
    throttle: NotifyThrottle,
}

impl SlaSweeper {
    /// Create a sweeper over `engine`, configured from the engine's config
    #[must_use]
    pub fn new(engine: Arc<TicketEngine>) -> Self {
        let config = engine.config();
        let throttle = NotifyThrottle::new(
            Arc::clone(engine.clock()),
            std::time::Duration::from_secs(config.notify_min_interval_secs),
            config.notify_cache_capacity,
        );
        let interval = config.sweep_interval();
        Self {
            engine,
            interval,
            throttle,
        }
    }

    /// With a custom interval
    #[must_use]
    pub fn with_interval(mut self, interval: std::time::Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run one sweep: flag every overdue unbreached non-terminal ticket and
    /// fire its notifications
    pub async fn run_once(&self) -> SweepReport {
        let now = self.engine.clock().now();
        let candidates = self.engine.store().breach_candidates(now);
        let mut report = SweepReport {
            scanned: candidates.len(),
            ..SweepReport::default()
        };

        for id in candidates {
            // Re-check under the row lock; the candidate list is stale by now
            let flagged = self
                .engine
                .store()
                .with_ticket(id, |t| {
                    if t.sla_breached || t.is_terminal() || t.sla_due_at >= now {
                        return Ok(None);
                    }
                    t.sla_breached = true;
                    t.push_system_note(
                        now,
                        format!("SLA deadline {} missed", t.sla_due_at.to_rfc3339()),
                    );
                    t.updated_at = now;
                    Ok(Some(t.clone()))
                })
                .unwrap_or_default();

            let Some(ticket) = flagged else { continue };
            tracing::warn!(ticket = %id, due = %ticket.sla_due_at, "SLA breached");
            report.breached.push(id);

            self.engine
                .audit_sink()
                .record(
                    AuditEvent::new(
                        "ticket.sla_breached",
                        ActorRef::System,
                        TargetRef::Ticket(id),
                        format!("SLA deadline {} missed", ticket.sla_due_at.to_rfc3339()),
                        now,
                    )
                    .with_metadata(json!({
                        "priority": ticket.priority.as_str(),
                        "assigned_agent": ticket.assigned_agent_id.map(|a| a.to_string()),
                    })),
                )
                .await;

            self.notify_breach(&ticket, &mut report).await;
        }

        tracing::debug!(
            scanned = report.scanned,
            breached = report.breached.len(),
            "sweep finished"
        );
        report
    }

    /// Spawn the periodic loop; runs until the handle is aborted
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            // First tick completes immediately: one sweep at startup
            ticker.tick().await;
            let report = self.run_once().await;
            if !report.breached.is_empty() {
                tracing::info!(breached = report.breached.len(), "sweep flagged breaches");
            }
        }
    }

    /// Fire the customer notification, and the agent notification when an
    /// agent is assigned and contactable. Failures are logged, never fatal.
    async fn notify_breach(&self, ticket: &Ticket, report: &mut SweepReport) {
        if self.throttle.allow(&throttle_key(ticket.id, &ticket.customer_email)) {
            report.notifications_attempted += 1;
            if !self
                .engine
                .send_email_logged(EmailKind::SlaBreached, &ticket.customer_email, ticket)
                .await
            {
                report.notifications_failed += 1;
            }
        }

        if let Some(agent_id) = ticket.assigned_agent_id {
            if let Some(email) = self
                .engine
                .registry()
                .get(agent_id)
                .and_then(|a| a.email)
            {
                if self.throttle.allow(&throttle_key(ticket.id, &email)) {
                    report.notifications_attempted += 1;
                    if !self
                        .engine
                        .send_email_logged(EmailKind::SlaBreached, &email, ticket)
                        .await
                    {
                        report.notifications_failed += 1;
                    }
                }
            }
        }

        let delivered = self
            .engine
            .notifier()
            .notify(
                "sla.breached",
                json!({
                    "ticket_id": ticket.id.to_string(),
                    "priority": ticket.priority.as_str(),
                    "due_at": ticket.sla_due_at.to_rfc3339(),
                }),
            )
            .await;
        if !delivered {
            tracing::warn!(ticket = %ticket.id, "breach webhook delivery failed");
        }
    }
}

fn throttle_key(ticket: TicketId, recipient: &str) -> String {
    format!("{ticket}:{recipient}")
}
