//! Core types for the triage engine
//!
//! Defines the fundamental types shared across the engine:
//! - Ticket and agent identities
//! - Ticket status, priority, and the SLA policy table
//! - Engine configuration
//! - Conversation messages and actor references

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Reserved wildcard category served by generalist agents.
pub const GENERAL_CATEGORY: &str = "general";

/// Unique ticket identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TicketId(pub Ulid);

impl TicketId {
    /// Generate new ticket ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TicketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique agent identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub Ulid);

impl AgentId {
    /// Generate new agent ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ticket priority, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Routine request
    Low,
    /// Default priority
    Medium,
    /// Degraded service
    High,
    /// Outage or blocking issue
    Urgent,
}

impl Priority {
    /// Stable string form used in notes and payloads
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket lifecycle status
///
/// `Resolved` and `Closed` are terminal; a ticket leaves them only through
/// the reopen transition back to `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TicketStatus {
    /// Awaiting first attention
    Open,
    /// Being worked
    InProgress,
    /// Terminal: answered
    Resolved,
    /// Terminal: archived
    Closed,
}

impl TicketStatus {
    /// Whether this status is terminal
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Resolved | TicketStatus::Closed)
    }

    /// Stable string form used in notes and payloads
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in-progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SLA response windows per priority, in hours
///
/// The table is configuration, not code; the defaults below are the
/// documented reference values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaPolicy {
    /// Window for `Priority::Low`
    pub low_hours: u64,
    /// Window for `Priority::Medium`
    pub medium_hours: u64,
    /// Window for `Priority::High`
    pub high_hours: u64,
    /// Window for `Priority::Urgent`
    pub urgent_hours: u64,
}

impl SlaPolicy {
    /// Response window in hours for a priority
    #[inline]
    #[must_use]
    pub fn hours_for(&self, priority: Priority) -> u64 {
        match priority {
            Priority::Low => self.low_hours,
            Priority::Medium => self.medium_hours,
            Priority::High => self.high_hours,
            Priority::Urgent => self.urgent_hours,
        }
    }

    /// Deadline for a ticket of `priority` entering the queue at `at`
    #[inline]
    #[must_use]
    pub fn due_from(&self, priority: Priority, at: DateTime<Utc>) -> DateTime<Utc> {
        at + Duration::hours(self.hours_for(priority) as i64)
    }
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self {
            low_hours: 72,
            medium_hours: 48,
            high_hours: 24,
            urgent_hours: 8,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// SLA window table
    pub sla: SlaPolicy,
    /// Sweep interval for the SLA breach scan, in seconds
    pub sweep_interval_secs: u64,
    /// Minimum interval between breach notifications to the same
    /// ticket/recipient pair, in seconds
    pub notify_min_interval_secs: u64,
    /// Bound on the notification throttle map
    pub notify_cache_capacity: usize,
    /// Attempts at find-then-reserve before giving up on auto-assignment
    pub max_assign_attempts: u32,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With an SLA policy table
    #[inline]
    #[must_use]
    pub fn with_sla(mut self, sla: SlaPolicy) -> Self {
        self.sla = sla;
        self
    }

    /// With a sweep interval in seconds
    #[inline]
    #[must_use]
    pub fn with_sweep_interval_secs(mut self, secs: u64) -> Self {
        self.sweep_interval_secs = secs;
        self
    }

    /// With a breach-notification throttle interval in seconds
    #[inline]
    #[must_use]
    pub fn with_notify_min_interval_secs(mut self, secs: u64) -> Self {
        self.notify_min_interval_secs = secs;
        self
    }

    /// Sweep interval as a [`std::time::Duration`]
    #[inline]
    #[must_use]
    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sla: SlaPolicy::default(),
            sweep_interval_secs: 300,
            notify_min_interval_secs: 3600,
            notify_cache_capacity: 1024,
            max_assign_attempts: 8,
        }
    }
}

/// Who performed an action: a customer, an agent, or the engine itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorRef {
    /// External customer, by opaque reference
    Customer(String),
    /// Registered agent
    Agent(AgentId),
    /// The engine (auto-assignment, sweeper, mass reassignment)
    System,
}

impl ActorRef {
    /// Whether this actor is an agent
    #[inline]
    #[must_use]
    pub fn is_agent(&self) -> bool {
        matches!(self, ActorRef::Agent(_))
    }
}

impl std::fmt::Display for ActorRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActorRef::Customer(reference) => write!(f, "customer {reference}"),
            ActorRef::Agent(id) => write!(f, "agent {id}"),
            ActorRef::System => f.write_str("system"),
        }
    }
}

/// One entry in a ticket's conversation, including system notes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketMessage {
    /// Author of the entry
    pub author: ActorRef,
    /// Message body
    pub body: String,
    /// When the entry was recorded
    pub at: DateTime<Utc>,
}

/// Intake payload for a new ticket
///
/// The surrounding application validates and constructs this; the engine
/// owns everything that happens afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTicket {
    /// Short summary line
    pub subject: String,
    /// Full problem description
    pub body: String,
    /// Opaque customer reference
    pub customer_ref: String,
    /// Requester address for notifications
    pub customer_email: String,
    /// Routing category; classified from the text when absent
    pub category: Option<String>,
    /// Requested priority
    pub priority: Priority,
}

impl NewTicket {
    /// Create a new intake payload
    #[inline]
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        body: impl Into<String>,
        customer_ref: impl Into<String>,
        customer_email: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            customer_ref: customer_ref.into(),
            customer_email: customer_email.into(),
            category: None,
            priority: Priority::default(),
        }
    }

    /// With an explicit category
    #[inline]
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// With a priority
    #[inline]
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// A support ticket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket identifier
    pub id: TicketId,
    /// Short summary line
    pub subject: String,
    /// Full problem description
    pub body: String,
    /// Opaque customer reference
    pub customer_ref: String,
    /// Requester address for notifications
    pub customer_email: String,
    /// Lifecycle status
    pub status: TicketStatus,
    /// Current priority
    pub priority: Priority,
    /// Routing category
    pub category: String,
    /// Owning agent, at most one at any instant
    pub assigned_agent_id: Option<AgentId>,
    /// SLA deadline derived from priority
    pub sla_due_at: DateTime<Utc>,
    /// Set by the sweeper once the deadline passes while non-terminal
    pub sla_breached: bool,
    /// Set exactly on entering a terminal state, cleared on reopen
    pub resolved_at: Option<DateTime<Utc>>,
    /// Flagged by the external AI-failure signal
    pub needs_manual_review: bool,
    /// Number of times the ticket was reopened
    pub reopen_count: u32,
    /// Last reopen time
    pub reopened_at: Option<DateTime<Utc>>,
    /// First agent-authored reply time
    pub first_response_at: Option<DateTime<Utc>>,
    /// Conversation plus system notes, append-only
    pub messages: Vec<TicketMessage>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Whether the ticket is in a terminal state
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Append a system note to the conversation
    #[inline]
    pub fn push_system_note(&mut self, at: DateTime<Utc>, body: impl Into<String>) {
        self.messages.push(TicketMessage {
            author: ActorRef::System,
            body: body.into(),
            at,
        });
    }
}

/// Registration payload for a new agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Display name
    pub name: String,
    /// Contactable address, if any
    pub email: Option<String>,
    /// Categories this agent serves
    pub categories: Vec<String>,
    /// Capacity: maximum concurrent non-terminal tickets
    pub max_load: u32,
}

impl AgentSpec {
    /// Create a new agent spec serving only the general category
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
            categories: vec![GENERAL_CATEGORY.to_string()],
            max_load: 5,
        }
    }

    /// With a contact address
    #[inline]
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// With served categories
    #[inline]
    #[must_use]
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// With a capacity
    #[inline]
    #[must_use]
    pub fn with_max_load(mut self, max_load: u32) -> Self {
        self.max_load = max_load;
        self
    }
}

/// Point-in-time view of an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// Agent identifier
    pub id: AgentId,
    /// Display name
    pub name: String,
    /// Contactable address, if any
    pub email: Option<String>,
    /// Categories this agent serves
    pub categories: Vec<String>,
    /// Whether the agent is eligible for new work
    pub is_active: bool,
    /// Capacity
    pub max_load: u32,
    /// Utilization at snapshot time
    pub current_load: u32,
}

impl AgentSnapshot {
    /// Whether the agent had spare capacity at snapshot time
    #[inline]
    #[must_use]
    pub fn has_capacity(&self) -> bool {
        self.current_load < self.max_load
    }

    /// Whether the agent serves `category`
    #[inline]
    #[must_use]
    pub fn serves(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}
