#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a colony headlessly.

mod demo;

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::PathBuf,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use colony_core::{Event, ResourceKind};
use colony_simulation::{Colony, ColonyConfig};
use colony_system_agents::AgentConfig;
use colony_system_navigation::Dispatch;
use colony_world::query;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const REPORT_INTERVAL: u64 = 100;

#[derive(Parser, Debug)]
#[command(name = "colony")]
#[command(about = "Run a grid colony simulation without a renderer")]
struct Args {
    /// Width of the grid in cells
    #[arg(long, default_value_t = 32, value_parser = clap::value_parser!(u32).range(i64::from(demo::MIN_COLUMNS)..))]
    columns: u32,

    /// Height of the grid in cells
    #[arg(long, default_value_t = 24, value_parser = clap::value_parser!(u32).range(i64::from(demo::MIN_ROWS)..))]
    rows: u32,

    /// Number of ticks to simulate
    #[arg(short, long, default_value_t = 600)]
    ticks: u64,

    /// Wall-clock length of one tick in milliseconds
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,

    /// Factor applied to every tick before it reaches the world
    #[arg(long, default_value_t = 1.0, value_parser = non_negative)]
    time_multiplier: f32,

    /// Number of workers spawned in the demo colony
    #[arg(short, long, default_value_t = 3)]
    agents: u32,

    /// Seed of the demo layout (random if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Worker speed in cells per second
    #[arg(long, default_value_t = 2.0, value_parser = non_negative)]
    speed: f32,

    /// Energy spent per second of work
    #[arg(long, default_value_t = 5.0, value_parser = non_negative)]
    energy_drain: f32,

    /// Run navigation work on the calling thread
    #[arg(long)]
    inline: bool,

    /// Resume from a snapshot instead of building the demo colony
    #[arg(long)]
    load: Option<PathBuf>,

    /// Write a snapshot after the last tick
    #[arg(long)]
    save: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> ColonyConfig {
        let dispatch = if self.inline {
            Dispatch::Inline
        } else {
            Dispatch::Background
        };
        ColonyConfig::new(self.columns, self.rows)
            .with_time_multiplier(self.time_multiplier)
            .with_dispatch(dispatch)
            .with_agents(AgentConfig::new(self.speed, self.energy_drain))
    }
}

fn non_negative(raw: &str) -> Result<f32, String> {
    let value: f32 = raw
        .parse()
        .map_err(|err| format!("`{raw}` is not a number: {err}"))?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(format!("`{raw}` must be a finite number of at least 0"))
    }
}

/// Counters accumulated over a run.
#[derive(Debug, Default)]
struct Summary {
    jobs_created: usize,
    jobs_completed: usize,
    rejections: usize,
    rebuilds: usize,
}

impl Summary {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::JobCreated { job, kind, cell, .. } => {
                    self.jobs_created += 1;
                    debug!(job = job.get(), ?kind, ?cell, "job created");
                }
                Event::JobCompleted { job } => {
                    self.jobs_completed += 1;
                    debug!(job = job.get(), "job completed");
                }
                Event::PlacementRejected { .. } => self.rejections += 1,
                Event::NavigationRebuilt { .. } => self.rebuilds += 1,
                _ => {}
            }
        }
    }
}

/// Entry point for the colony command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    run(&args)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn run(args: &Args) -> Result<()> {
    let config = args.config();
    let mut summary = Summary::default();
    let mut colony = match &args.load {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open snapshot {}", path.display()))?;
            let mut events = Vec::new();
            let colony = Colony::load(config, BufReader::new(file), &mut events)
                .with_context(|| format!("failed to restore snapshot {}", path.display()))?;
            summary.record(&events);
            colony
        }
        None => {
            let seed = args.seed.unwrap_or_else(rand::random);
            info!(seed, "building demo colony");
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut colony = Colony::new(config);
            let mut events = Vec::new();
            demo::populate(&mut colony, &mut rng, args.agents, &mut events);
            summary.record(&events);
            colony
        }
    };
    info!(
        columns = query::grid(colony.world()).columns(),
        rows = query::grid(colony.world()).rows(),
        agents = colony.agents().len(),
        pending = query::jobs(colony.world()).len(),
        "colony ready"
    );

    let dt = Duration::from_millis(args.tick_ms);
    for tick in 1..=args.ticks {
        let mut events = Vec::new();
        colony.tick(dt, &mut events);
        summary.record(&events);
        if tick % REPORT_INTERVAL == 0 {
            let world = colony.world();
            info!(
                tick,
                pending = query::jobs(world).len(),
                agents = colony.agents().len(),
                "progress"
            );
        }
    }

    let inventory = query::inventory(colony.world());
    info!(
        created = summary.jobs_created,
        completed = summary.jobs_completed,
        rejected = summary.rejections,
        rebuilds = summary.rebuilds,
        "run finished"
    );
    info!(
        wood = inventory.amount(ResourceKind::Wood),
        stone = inventory.amount(ResourceKind::Stone),
        planks = inventory.amount(ResourceKind::Planks),
        food = inventory.amount(ResourceKind::Food),
        "inventory"
    );

    if let Some(path) = &args.save {
        let file = File::create(path)
            .with_context(|| format!("failed to create snapshot {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        colony
            .save(&mut writer)
            .with_context(|| format!("failed to write snapshot {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("failed to flush snapshot {}", path.display()))?;
        info!(path = %path.display(), "snapshot saved");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_map_onto_the_colony_config() {
        let args = Args::try_parse_from(["colony"]).expect("defaults parse");
        let config = args.config();
        assert_eq!((config.columns, config.rows), (32, 24));
        assert_eq!(config.time_multiplier, 1.0);
        assert_eq!(config.dispatch, Dispatch::Background);
    }

    #[test]
    fn negative_rates_are_rejected() {
        for flag in ["--speed", "--energy-drain", "--time-multiplier"] {
            let negative = format!("{flag}=-1.5");
            assert!(
                Args::try_parse_from(["colony", negative.as_str()]).is_err(),
                "{flag} accepted a negative value"
            );
        }
        assert!(Args::try_parse_from(["colony", "--speed", "fast"]).is_err());
        let args = Args::try_parse_from(["colony", "--speed", "0.5", "--inline"])
            .expect("valid flags parse");
        assert_eq!(args.speed, 0.5);
        assert_eq!(args.config().dispatch, Dispatch::Inline);
    }
}
