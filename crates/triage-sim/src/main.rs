//! Triage traffic simulator binary
//!
//! Drives the engine with a seeded stream of random ticket operations and
//! reports invariant violations. Reproducible by seed.

mod simulator;

use anyhow::{Context, Result};
use clap::Parser;
use simulator::{run_simulator, SimulatorConfig};
use triage_core::EngineConfig;

#[derive(Debug, Parser)]
#[command(name = "triage-sim", version, about = "Triage engine traffic simulator")]
struct Cli {
    /// Number of operations to simulate
    #[arg(long, default_value_t = 1000)]
    ops: u64,

    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Agents registered before traffic starts
    #[arg(long, default_value_t = 8)]
    agents: usize,

    /// Optional TOML engine configuration file
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Stop simulation on first violation
    #[arg(long)]
    stop_on_violation: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let engine_config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str::<EngineConfig>(&raw)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    let config = SimulatorConfig {
        seed: cli.seed,
        total_operations: cli.ops,
        agents: cli.agents,
        stop_on_first_violation: cli.stop_on_violation,
        engine: engine_config,
    };

    tracing::info!(seed = config.seed, ops = config.total_operations, "simulation starting");
    let report = run_simulator(config).await;

    println!("operations executed: {}", report.executed);
    println!("expected rejections: {}", report.rejected);
    println!(
        "tickets: {} total, {} open, {} in-progress, {} resolved, {} closed",
        report.stats.total,
        report.stats.open,
        report.stats.in_progress,
        report.stats.resolved,
        report.stats.closed
    );
    println!(
        "breached: {}, unassigned: {}",
        report.stats.breached, report.stats.unassigned
    );

    if report.violations.is_empty() {
        println!("no violations");
        Ok(())
    } else {
        for violation in &report.violations {
            eprintln!("violation: {violation:?}");
        }
        anyhow::bail!("{} violation(s) detected", report.violations.len());
    }
}
