//! Random-traffic simulator for the triage engine
//!
//! Generates a seeded stream of ticket operations, applies them to a live
//! engine on a manual clock, and checks engine invariants after every
//! operation. Expected rejections (closed-ticket replies, saturated
//! targets) are counted, not flagged; anything else is a violation.

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;
use triage_core::{
    ActorRef, AgentId, AgentSpec, EngineConfig, EngineStats, ErrorKind, NewTicket, Priority,
    SlaSweeper, TicketEngine, TicketId, TicketStatus,
};
use triage_test_utils::ManualClock;

const CATEGORIES: &[&str] = &["billing", "account", "outage", "general"];

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Total operations to execute
    pub total_operations: u64,
    /// Agents registered before traffic starts
    pub agents: usize,
    /// Stop at the first violation
    pub stop_on_first_violation: bool,
    /// Engine configuration under test
    pub engine: EngineConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            total_operations: 1000,
            agents: 8,
            stop_on_first_violation: false,
            engine: EngineConfig::default(),
        }
    }
}

/// Operations the simulator can generate
#[derive(Debug, Clone)]
enum SimulatedOperation {
    CreateTicket(Priority),
    CustomerReply(TicketId),
    AgentReply(TicketId),
    SetStatus(TicketId, TicketStatus),
    ChangePriority(TicketId, Priority),
    Reassign(TicketId, AgentId),
    DeactivateAgent(AgentId),
    Sweep,
    AdvanceClock(i64),
}

/// A violation detected during simulation
#[derive(Debug, Clone)]
pub enum Violation {
    /// An agent's counter disagrees with its actual assignment count
    LoadMismatch {
        agent: AgentId,
        counter: u32,
        actual: u32,
    },
    /// `resolved_at` presence disagrees with the terminal status
    TerminalMismatch { ticket: TicketId },
    /// An overdue non-terminal ticket survived a sweep unflagged
    MissedBreach { ticket: TicketId },
    /// An operation failed with an unexpected error
    UnexpectedError { operation: String, error: String },
}

/// Simulation outcome
#[derive(Debug, Default)]
pub struct SimulationReport {
    /// Operations executed
    pub executed: u64,
    /// Expected rejections (invalid transitions, saturated targets)
    pub rejected: u64,
    /// Violations found
    pub violations: Vec<Violation>,
    /// Final engine counters
    pub stats: EngineStats,
}

/// Run one simulation to completion
pub async fn run_simulator(config: SimulatorConfig) -> SimulationReport {
    let clock = ManualClock::new();
    let engine = Arc::new(TicketEngine::new(config.engine.clone()).with_clock(clock.clone()));
    let sweeper = SlaSweeper::new(Arc::clone(&engine));
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut agents = Vec::new();
    for i in 0..config.agents.max(1) {
        let category = CATEGORIES[i % CATEGORIES.len()];
        let spec = AgentSpec::new(format!("agent-{i}"))
            .with_email(format!("agent-{i}@example.com"))
            .with_categories([category, "general"])
            .with_max_load(rng.gen_range(1..6));
        agents.push(engine.register_agent(spec).await.expect("valid spec"));
    }

    let mut tickets: Vec<TicketId> = Vec::new();
    let mut report = SimulationReport::default();

    for _ in 0..config.total_operations {
        let op = generate_operation(&mut rng, &tickets, &agents);
        report.executed += 1;

        match apply_operation(&engine, &sweeper, &clock, &op, &mut tickets).await {
            Ok(()) => {}
            Err(e) if expected_rejection(&e) => report.rejected += 1,
            Err(e) => report.violations.push(Violation::UnexpectedError {
                operation: format!("{op:?}"),
                error: e.to_string(),
            }),
        }

        check_invariants(
            &engine,
            &clock,
            &tickets,
            matches!(op, SimulatedOperation::Sweep),
            &mut report,
        );
        if config.stop_on_first_violation && !report.violations.is_empty() {
            break;
        }
    }

    report.stats = engine.stats();
    report
}

fn generate_operation(
    rng: &mut StdRng,
    tickets: &[TicketId],
    agents: &[AgentId],
) -> SimulatedOperation {
    let pick_ticket = |rng: &mut StdRng| tickets[rng.gen_range(0..tickets.len())];
    let pick_agent = |rng: &mut StdRng| agents[rng.gen_range(0..agents.len())];

    if tickets.is_empty() {
        return SimulatedOperation::CreateTicket(random_priority(rng));
    }

    match rng.gen_range(0..100u32) {
        0..=24 => SimulatedOperation::CreateTicket(random_priority(rng)),
        25..=39 => SimulatedOperation::CustomerReply(pick_ticket(rng)),
        40..=54 => SimulatedOperation::AgentReply(pick_ticket(rng)),
        55..=69 => SimulatedOperation::SetStatus(pick_ticket(rng), random_status(rng)),
        70..=79 => SimulatedOperation::ChangePriority(pick_ticket(rng), random_priority(rng)),
        80..=86 => SimulatedOperation::Reassign(pick_ticket(rng), pick_agent(rng)),
        87..=89 => SimulatedOperation::DeactivateAgent(pick_agent(rng)),
        90..=94 => SimulatedOperation::Sweep,
        _ => SimulatedOperation::AdvanceClock(rng.gen_range(1..600)),
    }
}

async fn apply_operation(
    engine: &Arc<TicketEngine>,
    sweeper: &SlaSweeper,
    clock: &ManualClock,
    op: &SimulatedOperation,
    tickets: &mut Vec<TicketId>,
) -> Result<(), triage_core::EngineError> {
    match op {
        SimulatedOperation::CreateTicket(priority) => {
            let n = tickets.len();
            let ticket = engine
                .create_ticket(
                    NewTicket::new(
                        format!("ticket-{n}"),
                        "simulated traffic",
                        format!("cust-{n}"),
                        format!("cust-{n}@example.com"),
                    )
                    .with_priority(*priority),
                )
                .await?;
            tickets.push(ticket.id);
        }
        SimulatedOperation::CustomerReply(id) => {
            engine
                .add_message(*id, ActorRef::Customer("sim".to_string()), "customer reply")
                .await?;
        }
        SimulatedOperation::AgentReply(id) => {
            let author = engine
                .ticket(*id)
                .and_then(|t| t.assigned_agent_id)
                .map(ActorRef::Agent)
                .unwrap_or(ActorRef::System);
            engine.add_message(*id, author, "agent reply").await?;
        }
        SimulatedOperation::SetStatus(id, to) => {
            engine.set_status(*id, *to, ActorRef::System).await?;
        }
        SimulatedOperation::ChangePriority(id, to) => {
            engine.set_priority(*id, *to, ActorRef::System).await?;
        }
        SimulatedOperation::Reassign(id, to) => {
            let Some(from) = engine.ticket(*id).and_then(|t| t.assigned_agent_id) else {
                return Ok(());
            };
            engine
                .manual_reassign(*id, from, *to, ActorRef::System)
                .await?;
        }
        SimulatedOperation::DeactivateAgent(id) => {
            engine.deactivate_agent(*id).await?;
            // Bring the agent back so the pool does not drain over a long run
            engine.registry().set_active(*id, true)?;
        }
        SimulatedOperation::Sweep => {
            sweeper.run_once().await;
        }
        SimulatedOperation::AdvanceClock(minutes) => {
            clock.advance(chrono::Duration::minutes(*minutes));
        }
    }
    Ok(())
}

fn expected_rejection(e: &triage_core::EngineError) -> bool {
    matches!(
        e.kind(),
        ErrorKind::InvalidTransition | ErrorKind::NoCapacity | ErrorKind::InactiveAgent
    )
}

fn check_invariants(
    engine: &Arc<TicketEngine>,
    clock: &ManualClock,
    tickets: &[TicketId],
    after_sweep: bool,
    report: &mut SimulationReport,
) {
    use triage_core::Clock;

    let mut assigned_counts: std::collections::HashMap<AgentId, u32> =
        std::collections::HashMap::new();
    let now = clock.now();

    for id in tickets {
        let Some(t) = engine.ticket(*id) else { continue };
        if t.resolved_at.is_some() != t.status.is_terminal() {
            report.violations.push(Violation::TerminalMismatch { ticket: t.id });
        }
        if after_sweep && !t.status.is_terminal() && !t.sla_breached && t.sla_due_at < now {
            report.violations.push(Violation::MissedBreach { ticket: t.id });
        }
        if !t.status.is_terminal() {
            if let Some(agent) = t.assigned_agent_id {
                *assigned_counts.entry(agent).or_insert(0) += 1;
            }
        }
    }

    for agent in engine.registry().snapshots() {
        let actual = assigned_counts.get(&agent.id).copied().unwrap_or(0);
        if agent.current_load != actual {
            report.violations.push(Violation::LoadMismatch {
                agent: agent.id,
                counter: agent.current_load,
                actual,
            });
        }
    }
}

fn random_priority(rng: &mut StdRng) -> Priority {
    match rng.gen_range(0..4u8) {
        0 => Priority::Low,
        1 => Priority::Medium,
        2 => Priority::High,
        _ => Priority::Urgent,
    }
}

fn random_status(rng: &mut StdRng) -> TicketStatus {
    match rng.gen_range(0..4u8) {
        0 => TicketStatus::Open,
        1 => TicketStatus::InProgress,
        2 => TicketStatus::Resolved,
        _ => TicketStatus::Closed,
    }
}
