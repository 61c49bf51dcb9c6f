//! Triage Core - Ticket lifecycle & agent assignment engine
//!
//! The component that:
//! - Moves tickets through their lifecycle states
//! - Computes and recalculates SLA deadlines
//! - Routes tickets to agents under a capacity constraint
//! - Keeps agent load counters consistent under concurrent mutation
//! - Sweeps for SLA breaches on a fixed interval
//!
//! # Example
//!
//! ```rust,ignore
//! use triage_core::{AgentSpec, EngineConfig, NewTicket, TicketEngine};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = TicketEngine::new(EngineConfig::new());
//! engine.register_agent(AgentSpec::new("alice")).await?;
//!
//! let ticket = engine
//!     .create_ticket(NewTicket::new("Login broken", "Cannot sign in", "c-42", "c@example.com"))
//!     .await?;
//!
//! println!("Ticket {} due at {}", ticket.id, ticket.sla_due_at);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod audit;
pub mod classify;
pub mod clock;
pub mod engine;
pub mod error;
pub mod notify;
pub mod rate_limit;
pub mod reassign;
pub mod registry;
pub mod router;
pub mod state;
pub mod store;
pub mod sweeper;
pub mod types;

// Re-exports for convenience
pub use audit::{AuditEvent, AuditSink, TargetRef, TracingAuditSink};
pub use classify::{Classifier, GeneralClassifier, KeywordClassifier};
pub use clock::{Clock, SystemClock};
pub use engine::{EngineStats, TicketEngine};
pub use error::{EngineError, ErrorKind};
pub use notify::{EmailKind, LoggingNotifier, Notifier, RetryPolicy, RetryingNotifier};
pub use rate_limit::NotifyThrottle;
pub use reassign::ReassignmentReport;
pub use registry::AgentRegistry;
pub use router::AssignmentRouter;
pub use state::{allowed_transitions, validate_transition, ReopenReason};
pub use sweeper::{SlaSweeper, SweepReport};
pub use types::{
    ActorRef, AgentId, AgentSnapshot, AgentSpec, EngineConfig, NewTicket, Priority, SlaPolicy,
    Ticket, TicketId, TicketMessage, TicketStatus, GENERAL_CATEGORY,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the triage engine
    pub use crate::{
        ActorRef, AgentId, AgentSpec, EngineConfig, EngineError, NewTicket, Priority, SlaSweeper,
        Ticket, TicketEngine, TicketId, TicketStatus,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
