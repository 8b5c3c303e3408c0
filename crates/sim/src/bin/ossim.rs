//! ossim -- multithreaded CPU scheduling simulator.
//!
//! Usage: `ossim <CPUS> [-l | -r <TIMESLICE>]`
//!
//! - default: FIFO
//! - `-l`: longest remaining time first
//! - `-r <TIMESLICE>`: round-robin with a timeslice in ticks

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use ossim_scheduler::PolicyKind;
use ossim_sim::{SimConfig, Simulation, Workload};

// ── CLI ─────────────────────────────────────────────────────────────

/// Multithreaded CPU scheduling simulator.
#[derive(Parser, Debug)]
#[command(name = "ossim", version, about)]
struct Cli {
    /// Number of simulated CPUs.
    #[arg(env = "OSSIM_CPUS")]
    cpus: Option<usize>,

    /// Longest-remaining-time-first scheduler.
    #[arg(short = 'l', conflicts_with = "timeslice")]
    lrtf: bool,

    /// Round-robin scheduler with the given timeslice in ticks.
    ///
    /// Policy flags are command-line only; the environment never picks one.
    #[arg(short = 'r', value_name = "TIMESLICE")]
    timeslice: Option<u32>,

    /// Path to a TOML simulation config.
    #[arg(long, env = "OSSIM_CONFIG")]
    config: Option<PathBuf>,

    /// Path to a TOML workload (`[[process]]` tables). Built-in mix if absent.
    #[arg(long, env = "OSSIM_WORKLOAD")]
    workload: Option<PathBuf>,

    /// Tick length in milliseconds.
    #[arg(long, env = "OSSIM_TICK_MS")]
    tick_ms: Option<u64>,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
}

/// Merge the config file (if any) with command-line overrides.
fn resolve_config(cli: &Cli) -> anyhow::Result<SimConfig> {
    let mut config = match &cli.config {
        Some(path) => SimConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SimConfig::default(),
    };

    if let Some(cpus) = cli.cpus {
        config.scheduler.cpu_count = cpus;
    }
    if cli.lrtf {
        config.scheduler.policy = PolicyKind::Lrtf;
        config.scheduler.timeslice = None;
    } else if let Some(slice) = cli.timeslice {
        config.scheduler.policy = PolicyKind::RoundRobin;
        config.scheduler.timeslice = Some(slice);
    }
    if let Some(tick_ms) = cli.tick_ms {
        config.tick_ms = tick_ms;
    }
    Ok(config)
}

// ── main ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    let workload = match &cli.workload {
        Some(path) => Workload::from_file(path)
            .with_context(|| format!("loading workload {}", path.display()))?,
        None => Workload::default(),
    };

    let simulation = Simulation::new(config, workload).context("invalid configuration")?;
    info!(config = ?simulation.config(), "configuration loaded");

    let report = simulation.run().context("simulation aborted")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }
    Ok(())
}
