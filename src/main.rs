use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{debug, warn};
use tracing_subscriber::{fmt, EnvFilter};

use strips_planner::strips::world;
use strips_planner::{Outcome, Planner, PlannerConfig, SearchReport, TextObserver, World};

#[derive(Parser)]
#[command(name = "strips")]
#[command(about = "Find a plan for a STRIPS domain file", version)]
struct Cli {
    /// Domain file with the initial state, goal state and actions
    domain: PathBuf,

    /// Deepest precondition recursion before a branch is abandoned
    #[arg(long, default_value_t = PlannerConfig::default().max_depth)]
    max_depth: usize,

    /// Search calls allowed before giving up
    #[arg(long, default_value_t = PlannerConfig::default().max_expansions)]
    max_expansions: usize,

    /// Print the search report as JSON
    #[arg(long)]
    json: bool,

    /// Print every search step to stderr
    #[arg(long)]
    trace: bool,

    /// Like --trace, but wait for enter after each step ('c' runs to the end)
    #[arg(long)]
    step: bool,

    /// Verbose logging, repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt().with_env_filter(filter).with_target(false).with_writer(io::stderr).init();

    let world = match World::from_file(&cli.domain) {
        Ok(world) => world,
        Err(e @ world::Error::Parse { .. }) => {
            eprintln!("{}", e);
            return Ok(ExitCode::from(2));
        }
        Err(e) => return Err(e).context("Unable to load domain"),
    };

    if world.goal_reached() {
        if cli.json {
            let report = SearchReport { plan: Some(Vec::new()), expansions: 0, outcome: Outcome::Solved };
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("Goal already reached");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = PlannerConfig { max_depth: cli.max_depth, max_expansions: cli.max_expansions };
    let report = if cli.trace || cli.step {
        let mut observer = TextObserver::new(io::stderr(), io::stdin().lock(), cli.step);
        let report = Planner::new(&world).with_config(config).with_observer(&mut observer).search();
        if let Some(e) = observer.take_error() {
            warn!(error = %e, "trace output failed");
        }
        report
    } else {
        Planner::new(&world).with_config(config).search()
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    match &report.plan {
        Some(plan) => {
            debug!(valid = world.validates(plan), steps = plan.len(), "replayed plan from the initial state");
            if !cli.json {
                println!("Solved! Plan:");
                for action in plan {
                    println!("{}", action);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        None => {
            if !cli.json {
                println!("No solution found");
            }
            Ok(ExitCode::from(1))
        }
    }
}
