//! SLA sweeper integration tests: breach detection, notification fan-out,
//! idempotence, and throttle behavior, all on a manual clock.

use std::sync::Arc;
use triage_core::notify::EmailKind;
use triage_core::{ActorRef, Priority, SlaSweeper, TicketStatus};
use triage_test_utils::{billing_agent, billing_ticket, setup_engine, TestEngine};

fn sweeper(t: &TestEngine) -> SlaSweeper {
    SlaSweeper::new(Arc::clone(&t.engine))
}

#[tokio::test]
async fn overdue_ticket_is_flagged_and_notified() {
    let t = setup_engine();
    let agent = t.engine.register_agent(billing_agent(5)).await.unwrap();
    let ticket = t
        .engine
        .create_ticket(billing_ticket(Priority::Urgent))
        .await
        .unwrap();
    assert_eq!(ticket.assigned_agent_id, Some(agent));

    // One minute past the 8 hour window
    t.clock.advance(chrono::Duration::hours(8) + chrono::Duration::minutes(1));
    let report = sweeper(&t).run_once().await;

    assert_eq!(report.breached, vec![ticket.id]);
    assert_eq!(report.notifications_attempted, 2);
    assert_eq!(report.notifications_failed, 0);
    assert!(t.engine.ticket(ticket.id).unwrap().sla_breached);

    // One email to the customer, one to the assigned agent
    let breach_mails = t.notifier.emails_of_kind(EmailKind::SlaBreached);
    assert_eq!(breach_mails.len(), 2);
    assert!(breach_mails
        .iter()
        .any(|m| m.recipient == "customer@example.com"));
    assert!(breach_mails.iter().any(|m| m.recipient == "bob@example.com"));
    assert_eq!(t.audit.count_of("ticket.sla_breached"), 1);
}

#[tokio::test]
async fn unassigned_ticket_notifies_customer_only() {
    let t = setup_engine();
    let ticket = t
        .engine
        .create_ticket(billing_ticket(Priority::Urgent))
        .await
        .unwrap();
    assert_eq!(ticket.assigned_agent_id, None);

    t.clock.advance_hours(9);
    let report = sweeper(&t).run_once().await;

    assert_eq!(report.breached, vec![ticket.id]);
    assert_eq!(report.notifications_attempted, 1);
    assert_eq!(t.notifier.emails_of_kind(EmailKind::SlaBreached).len(), 1);
}

#[tokio::test]
async fn second_sweep_is_idempotent() {
    let t = setup_engine();
    t.engine
        .create_ticket(billing_ticket(Priority::Urgent))
        .await
        .unwrap();

    t.clock.advance_hours(9);
    let first = sweeper(&t).run_once().await;
    assert_eq!(first.breached.len(), 1);

    let second = sweeper(&t).run_once().await;
    assert!(second.breached.is_empty());
    assert_eq!(second.scanned, 0);
    assert_eq!(t.notifier.emails_of_kind(EmailKind::SlaBreached).len(), 1);
}

#[tokio::test]
async fn terminal_and_future_tickets_are_skipped() {
    let t = setup_engine();
    let resolved = t
        .engine
        .create_ticket(billing_ticket(Priority::Urgent))
        .await
        .unwrap();
    t.engine
        .set_status(resolved.id, TicketStatus::Resolved, ActorRef::System)
        .await
        .unwrap();
    let fresh = t
        .engine
        .create_ticket(billing_ticket(Priority::Low))
        .await
        .unwrap();

    t.clock.advance_hours(9);
    let report = sweeper(&t).run_once().await;

    assert!(report.breached.is_empty());
    assert!(!t.engine.ticket(resolved.id).unwrap().sla_breached);
    assert!(!t.engine.ticket(fresh.id).unwrap().sla_breached);
}

#[tokio::test]
async fn notification_failure_is_not_fatal() {
    let t = setup_engine();
    t.engine
        .create_ticket(billing_ticket(Priority::Urgent))
        .await
        .unwrap();

    t.clock.advance_hours(9);
    t.notifier.fail_next(10);
    let report = sweeper(&t).run_once().await;

    // The breach sticks even though every delivery failed
    assert_eq!(report.breached.len(), 1);
    assert_eq!(report.notifications_attempted, 1);
    assert_eq!(report.notifications_failed, 1);
}

#[tokio::test]
async fn breach_cleared_by_priority_change_can_breach_again() {
    let t = setup_engine();
    let ticket = t
        .engine
        .create_ticket(billing_ticket(Priority::Urgent))
        .await
        .unwrap();

    t.clock.advance_hours(9);
    sweeper(&t).run_once().await;
    assert!(t.engine.ticket(ticket.id).unwrap().sla_breached);

    // Priority change pushes the deadline out and clears the flag
    t.engine
        .set_priority(ticket.id, Priority::Low, ActorRef::System)
        .await
        .unwrap();
    assert!(!t.engine.ticket(ticket.id).unwrap().sla_breached);

    // Past the new deadline the ticket breaches again, with fresh
    // notifications (the throttle interval has long elapsed)
    t.clock.advance_hours(73);
    let report = sweeper(&t).run_once().await;
    assert_eq!(report.breached, vec![ticket.id]);
    assert_eq!(t.notifier.emails_of_kind(EmailKind::SlaBreached).len(), 2);
}

#[tokio::test]
async fn spawned_sweeper_runs_immediately() {
    let t = setup_engine();
    t.engine
        .create_ticket(billing_ticket(Priority::Urgent))
        .await
        .unwrap();
    t.clock.advance_hours(9);

    let handle = sweeper(&t)
        .with_interval(std::time::Duration::from_secs(3600))
        .spawn();

    // The first tick fires at startup; poll briefly for its effect
    for _ in 0..50 {
        if t.notifier.email_count() > 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    handle.abort();

    assert_eq!(t.notifier.emails_of_kind(EmailKind::SlaBreached).len(), 1);
}
