//! Testing utilities for the triage workspace
//!
//! Shared test helpers, fixtures, and fakes: a manual clock, recording
//! collaborator implementations, and engine setup shortcuts.

#![allow(missing_docs)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use triage_core::audit::AuditEvent;
use triage_core::notify::EmailKind;
use triage_core::{
    AgentSpec, AuditSink, Clock, EngineConfig, NewTicket, Notifier, Priority, Ticket, TicketEngine,
};

/// Clock driven entirely by the test
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    /// Start at a fixed, readable epoch
    pub fn new() -> Arc<Self> {
        Self::starting_at(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap())
    }

    pub fn starting_at(at: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: RwLock::new(at),
        })
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write();
        *now += by;
    }

    pub fn advance_hours(&self, hours: i64) {
        self.advance(Duration::hours(hours));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

/// Email captured by [`RecordingNotifier`]
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub kind: EmailKind,
    pub recipient: String,
    pub ticket_id: triage_core::TicketId,
}

/// Notifier that records every call; optionally fails the first N deliveries
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<(String, serde_json::Value)>>,
    pub emails: Mutex<Vec<SentEmail>>,
    fail_remaining: AtomicU32,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next `n` deliveries (events and emails alike) fail
    pub fn fail_next(&self, n: u32) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    pub fn email_count(&self) -> usize {
        self.emails.lock().len()
    }

    pub fn emails_of_kind(&self, kind: EmailKind) -> Vec<SentEmail> {
        self.emails
            .lock()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    fn take_failure(&self) -> bool {
        self.fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &str, payload: serde_json::Value) -> bool {
        self.events.lock().push((event.to_string(), payload));
        !self.take_failure()
    }

    async fn send_email(&self, kind: EmailKind, recipient: &str, ticket: &Ticket) -> bool {
        self.emails.lock().push(SentEmail {
            kind,
            recipient: recipient.to_string(),
            ticket_id: ticket.id,
        });
        !self.take_failure()
    }
}

/// Audit sink that records every event
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    pub events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAuditSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn actions(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.action.clone()).collect()
    }

    pub fn count_of(&self, action: &str) -> usize {
        self.events.lock().iter().filter(|e| e.action == action).count()
    }
}

#[async_trait::async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}

/// Engine wired to a manual clock and recording collaborators
pub struct TestEngine {
    pub engine: Arc<TicketEngine>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub audit: Arc<RecordingAuditSink>,
}

pub fn setup_engine() -> TestEngine {
    setup_engine_with_config(EngineConfig::new())
}

pub fn setup_engine_with_config(config: EngineConfig) -> TestEngine {
    let clock = ManualClock::new();
    let notifier = RecordingNotifier::new();
    let audit = RecordingAuditSink::new();
    let engine = Arc::new(
        TicketEngine::new(config)
            .with_clock(clock.clone())
            .with_notifier(notifier.clone())
            .with_audit(audit.clone()),
    );
    TestEngine {
        engine,
        clock,
        notifier,
        audit,
    }
}

/// A billing-category intake payload
pub fn billing_ticket(priority: Priority) -> NewTicket {
    NewTicket::new(
        "Invoice charged twice",
        "My card was charged twice for the same invoice.",
        "cust-100",
        "customer@example.com",
    )
    .with_category("billing")
    .with_priority(priority)
}

/// A billing specialist spec
pub fn billing_agent(max_load: u32) -> AgentSpec {
    AgentSpec::new("billing-bob")
        .with_email("bob@example.com")
        .with_categories(["billing"])
        .with_max_load(max_load)
}

/// A generalist spec
pub fn generalist_agent(max_load: u32) -> AgentSpec {
    AgentSpec::new("general-gail")
        .with_email("gail@example.com")
        .with_max_load(max_load)
}
