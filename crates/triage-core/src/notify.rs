//! Notification dispatcher contract and retry policy
//!
//! The engine fires notifications and continues; delivery mechanics live
//! outside. [`RetryingNotifier`] supplies the bounded retry contract that
//! dispatcher implementations are expected to honor: 3 attempts with
//! exponential backoff starting at one second, then give up and log.

use crate::types::Ticket;
use std::time::Duration;

/// Email templates the engine can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    /// Ticket assigned to an agent
    Assigned,
    /// Ticket resolved
    Resolved,
    /// SLA deadline missed
    SlaBreached,
}

impl EmailKind {
    /// Stable template name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailKind::Assigned => "assigned",
            EmailKind::Resolved => "resolved",
            EmailKind::SlaBreached => "sla-breached",
        }
    }
}

impl std::fmt::Display for EmailKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded retry policy for notification delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total delivery attempts
    pub attempts: u32,
    /// Delay before the second attempt; doubles each attempt after that
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Backoff delay after the given zero-based failed attempt, `None` once
    /// the attempt budget is spent
    #[inline]
    #[must_use]
    pub fn backoff(&self, failed_attempt: u32) -> Option<Duration> {
        if failed_attempt + 1 >= self.attempts {
            None
        } else {
            Some(self.base_delay * 2u32.saturating_pow(failed_attempt))
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Fire-and-continue notification dispatcher
///
/// Both methods are best-effort: the returned flag reports whether delivery
/// ultimately succeeded, and callers log rather than propagate a `false`.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Deliver a webhook-style event
    async fn notify(&self, event: &str, payload: serde_json::Value) -> bool;

    /// Deliver a templated email about a ticket
    async fn send_email(&self, kind: EmailKind, recipient: &str, ticket: &Ticket) -> bool;
}

#[async_trait::async_trait]
impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    async fn notify(&self, event: &str, payload: serde_json::Value) -> bool {
        (**self).notify(event, payload).await
    }

    async fn send_email(&self, kind: EmailKind, recipient: &str, ticket: &Ticket) -> bool {
        (**self).send_email(kind, recipient, ticket).await
    }
}

/// Default dispatcher that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait::async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(&self, event: &str, payload: serde_json::Value) -> bool {
        tracing::info!(%event, %payload, "notification dispatched");
        true
    }

    async fn send_email(&self, kind: EmailKind, recipient: &str, ticket: &Ticket) -> bool {
        tracing::info!(%kind, %recipient, ticket = %ticket.id, "email dispatched");
        true
    }
}

/// Wraps any dispatcher with the bounded retry contract
#[derive(Debug)]
pub struct RetryingNotifier<N> {
    inner: N,
    policy: RetryPolicy,
}

impl<N> RetryingNotifier<N> {
    /// Wrap `inner` with the default 3x / 1s / 2s / 4s policy
    #[inline]
    #[must_use]
    pub fn new(inner: N) -> Self {
        Self {
            inner,
            policy: RetryPolicy::default(),
        }
    }

    /// With a custom retry policy
    #[inline]
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[async_trait::async_trait]
impl<N: Notifier> Notifier for RetryingNotifier<N> {
    async fn notify(&self, event: &str, payload: serde_json::Value) -> bool {
        for attempt in 0..self.policy.attempts {
            if self.inner.notify(event, payload.clone()).await {
                return true;
            }
            tracing::warn!(%event, attempt, "notification attempt failed");
            match self.policy.backoff(attempt) {
                Some(delay) => tokio::time::sleep(delay).await,
                None => break,
            }
        }
        tracing::error!(%event, attempts = self.policy.attempts, "notification given up");
        false
    }

    async fn send_email(&self, kind: EmailKind, recipient: &str, ticket: &Ticket) -> bool {
        for attempt in 0..self.policy.attempts {
            if self.inner.send_email(kind, recipient, ticket).await {
                return true;
            }
            tracing::warn!(%kind, %recipient, attempt, "email attempt failed");
            match self.policy.backoff(attempt) {
                Some(delay) => tokio::time::sleep(delay).await,
                None => break,
            }
        }
        tracing::error!(%kind, %recipient, attempts = self.policy.attempts, "email given up");
        false
    }
}
