//! Reassignment coordinator integration tests: manual moves, rejection
//! semantics, and the mass sweep on agent deactivation.

use triage_core::{ActorRef, AgentSpec, ErrorKind, Priority, TicketStatus};
use triage_test_utils::{billing_agent, billing_ticket, generalist_agent, setup_engine};

#[tokio::test]
async fn manual_reassign_moves_load_and_ownership() {
    let t = setup_engine();
    let from = t.engine.register_agent(billing_agent(5)).await.unwrap();
    let to = t.engine.register_agent(generalist_agent(5)).await.unwrap();

    let ticket = t
        .engine
        .create_ticket(billing_ticket(Priority::Medium))
        .await
        .unwrap();
    assert_eq!(ticket.assigned_agent_id, Some(from));

    let ticket = t
        .engine
        .manual_reassign(ticket.id, from, to, ActorRef::System)
        .await
        .unwrap();

    assert_eq!(ticket.assigned_agent_id, Some(to));
    assert_eq!(t.engine.registry().get(from).unwrap().current_load, 0);
    assert_eq!(t.engine.registry().get(to).unwrap().current_load, 1);
    assert!(ticket
        .messages
        .iter()
        .any(|m| m.body.contains("Reassigned from agent")));
}

#[tokio::test]
async fn manual_reassign_rejects_saturated_target() {
    let t = setup_engine();
    let from = t.engine.register_agent(billing_agent(5)).await.unwrap();
    let to = t.engine.register_agent(generalist_agent(1)).await.unwrap();
    t.engine.registry().increment_load(to).unwrap();

    let ticket = t
        .engine
        .create_ticket(billing_ticket(Priority::Medium))
        .await
        .unwrap();

    let err = t
        .engine
        .manual_reassign(ticket.id, from, to, ActorRef::System)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoCapacity);

    // Nothing moved
    assert_eq!(
        t.engine.ticket(ticket.id).unwrap().assigned_agent_id,
        Some(from)
    );
    assert_eq!(t.engine.registry().get(from).unwrap().current_load, 1);
    assert_eq!(t.engine.registry().get(to).unwrap().current_load, 1);
}

#[tokio::test]
async fn manual_reassign_rejects_inactive_target() {
    let t = setup_engine();
    let from = t.engine.register_agent(billing_agent(5)).await.unwrap();
    let to = t.engine.register_agent(generalist_agent(5)).await.unwrap();
    t.engine.registry().set_active(to, false).unwrap();

    let ticket = t
        .engine
        .create_ticket(billing_ticket(Priority::Medium))
        .await
        .unwrap();

    let err = t
        .engine
        .manual_reassign(ticket.id, from, to, ActorRef::System)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InactiveAgent);

    assert_eq!(
        t.engine.ticket(ticket.id).unwrap().assigned_agent_id,
        Some(from)
    );
    assert_eq!(t.engine.registry().get(from).unwrap().current_load, 1);
    assert_eq!(t.engine.registry().get(to).unwrap().current_load, 0);
}

#[tokio::test]
async fn manual_reassign_rejects_terminal_ticket() {
    let t = setup_engine();
    let from = t.engine.register_agent(billing_agent(5)).await.unwrap();
    let to = t.engine.register_agent(generalist_agent(5)).await.unwrap();

    let ticket = t
        .engine
        .create_ticket(billing_ticket(Priority::Medium))
        .await
        .unwrap();
    t.engine
        .set_status(ticket.id, TicketStatus::Resolved, ActorRef::Agent(from))
        .await
        .unwrap();

    let err = t
        .engine
        .manual_reassign(ticket.id, from, to, ActorRef::System)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    assert_eq!(t.engine.registry().get(to).unwrap().current_load, 0);
}

#[tokio::test]
async fn deactivation_reassigns_to_generalist() {
    let t = setup_engine();
    // Agent A: billing specialist, capacity 1, holding one open billing ticket
    let a = t
        .engine
        .register_agent(
            AgentSpec::new("a")
                .with_categories(["billing"])
                .with_max_load(1),
        )
        .await
        .unwrap();
    let ticket = t
        .engine
        .create_ticket(billing_ticket(Priority::Medium))
        .await
        .unwrap();
    assert_eq!(ticket.assigned_agent_id, Some(a));

    // Agent B: active generalist with spare capacity
    let b = t.engine.register_agent(generalist_agent(5)).await.unwrap();

    let report = t.engine.deactivate_agent(a).await.unwrap();

    assert_eq!(report.reassigned, vec![(ticket.id, b)]);
    assert!(report.unassigned.is_empty());
    assert_eq!(t.engine.registry().get(b).unwrap().current_load, 1);
    assert_eq!(t.engine.registry().get(a).unwrap().current_load, 0);
    assert_eq!(t.engine.ticket(ticket.id).unwrap().assigned_agent_id, Some(b));
}

#[tokio::test]
async fn deactivation_unassigns_when_no_agent_available() {
    let t = setup_engine();
    let a = t.engine.register_agent(billing_agent(5)).await.unwrap();
    let ticket = t
        .engine
        .create_ticket(billing_ticket(Priority::Medium))
        .await
        .unwrap();

    let report = t.engine.deactivate_agent(a).await.unwrap();

    assert!(report.reassigned.is_empty());
    assert_eq!(report.unassigned, vec![ticket.id]);
    let stored = t.engine.ticket(ticket.id).unwrap();
    assert_eq!(stored.assigned_agent_id, None);
    assert!(stored
        .messages
        .iter()
        .any(|m| m.body.contains("Unassigned")));
    assert_eq!(t.engine.registry().get(a).unwrap().current_load, 0);
}

#[tokio::test]
async fn deactivation_skips_terminal_tickets() {
    let t = setup_engine();
    let a = t.engine.register_agent(billing_agent(5)).await.unwrap();
    let b = t.engine.register_agent(generalist_agent(5)).await.unwrap();

    let open = t
        .engine
        .create_ticket(billing_ticket(Priority::Medium))
        .await
        .unwrap();
    let resolved = t
        .engine
        .create_ticket(billing_ticket(Priority::Medium))
        .await
        .unwrap();
    t.engine
        .set_status(resolved.id, TicketStatus::Resolved, ActorRef::Agent(a))
        .await
        .unwrap();

    let report = t.engine.deactivate_agent(a).await.unwrap();

    assert_eq!(report.total(), 1);
    assert_eq!(report.reassigned, vec![(open.id, b)]);
    // The resolved ticket keeps its historical assignee
    assert_eq!(
        t.engine.ticket(resolved.id).unwrap().assigned_agent_id,
        Some(a)
    );
}

#[tokio::test]
async fn deactivated_agent_never_chosen_for_new_tickets() {
    let t = setup_engine();
    let a = t.engine.register_agent(billing_agent(5)).await.unwrap();
    t.engine.deactivate_agent(a).await.unwrap();

    let ticket = t
        .engine
        .create_ticket(billing_ticket(Priority::Medium))
        .await
        .unwrap();
    assert_eq!(ticket.assigned_agent_id, None);
}
