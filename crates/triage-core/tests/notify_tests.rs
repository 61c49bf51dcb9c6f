//! Retry contract tests for the notification dispatcher wrapper, run on
//! tokio's paused clock so no real time passes.

use std::sync::Arc;
use triage_core::notify::EmailKind;
use triage_core::{Notifier, Priority, RetryingNotifier};
use triage_test_utils::{billing_ticket, setup_engine, RecordingNotifier};

async fn sample_ticket() -> triage_core::Ticket {
    let t = setup_engine();
    t.engine
        .create_ticket(billing_ticket(Priority::Medium))
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn retries_until_success() {
    let inner = RecordingNotifier::new();
    inner.fail_next(2);
    let notifier = RetryingNotifier::new(Arc::clone(&inner));
    let ticket = sample_ticket().await;

    let start = tokio::time::Instant::now();
    let delivered = notifier
        .send_email(EmailKind::SlaBreached, "c@example.com", &ticket)
        .await;

    assert!(delivered);
    assert_eq!(inner.email_count(), 3);
    // Backoff slept 1s then 2s before the successful third attempt
    assert!(start.elapsed() >= std::time::Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_three_attempts() {
    let inner = RecordingNotifier::new();
    inner.fail_next(10);
    let notifier = RetryingNotifier::new(Arc::clone(&inner));

    let delivered = notifier
        .notify("sla.breached", serde_json::json!({ "k": "v" }))
        .await;

    assert!(!delivered);
    assert_eq!(inner.events.lock().len(), 3);
}

#[tokio::test]
async fn first_success_skips_backoff() {
    let inner = RecordingNotifier::new();
    let notifier = RetryingNotifier::new(Arc::clone(&inner));
    let ticket = sample_ticket().await;

    let delivered = notifier
        .send_email(EmailKind::Resolved, "c@example.com", &ticket)
        .await;

    assert!(delivered);
    assert_eq!(inner.email_count(), 1);
}
