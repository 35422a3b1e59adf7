use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{Level, event};

use dinersim::config::{ConfigFile, DinnerConfig, DurationRange};
use dinersim::dinner::{DinnerSimulation, DinnerStatistics};

#[derive(Parser)]
#[command(
    name = "dinersim",
    about = "Runs one dinner simulation and reports who ate how much"
)]
struct Cli {
    /// JSON config file; the flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of visitors at the table
    #[arg(long)]
    visitors: Option<u32>,

    /// Number of waiters on the floor
    #[arg(long)]
    waiters: Option<u32>,

    /// Portions in the pot
    #[arg(long)]
    portions: Option<u64>,

    /// Per-order serving delay, in milliseconds
    #[arg(long)]
    serving_ms: Option<u64>,

    /// Discussion pause range, in milliseconds
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"])]
    discussion_ms: Option<Vec<u64>>,

    /// Eating pause range, in milliseconds
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"])]
    eating_ms: Option<Vec<u64>>,

    /// Wall-clock budget in seconds; the dinner is cut off past it
    #[arg(long)]
    max_seconds: Option<u64>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_thread_ids(true)
        .with_ansi(false)
        .init();

    let config = build_config(&cli)?;
    let simulation = DinnerSimulation::new(config)?;

    let started = Instant::now();
    tokio::select! {
        statistics = run(&simulation, cli.max_seconds) => {
            print_statistics(&statistics);
        }
        _ = tokio::signal::ctrl_c() => {
            event!(Level::WARN, "dinner interrupted from the terminal");
            let statistics = simulation.statistics(started.elapsed(), true);
            print_statistics(&statistics);
        }
    }

    Ok(())
}

async fn run(simulation: &DinnerSimulation, max_seconds: Option<u64>) -> DinnerStatistics {
    match max_seconds {
        Some(seconds) => simulation.run_until(Duration::from_secs(seconds)).await,
        None => simulation.run().await,
    }
}

fn build_config(cli: &Cli) -> Result<DinnerConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            let file: ConfigFile = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse config file {}", path.display()))?;
            DinnerConfig::from(file)
        }
        None => DinnerConfig::default(),
    };

    if let Some(visitors) = cli.visitors {
        config.visitors = visitors;
    }
    if let Some(waiters) = cli.waiters {
        config.waiters = waiters;
    }
    if let Some(portions) = cli.portions {
        config.portions = portions;
    }
    if let Some(serving_ms) = cli.serving_ms {
        config.serving_delay = Duration::from_millis(serving_ms);
    }
    if let Some(range) = &cli.discussion_ms {
        config.discussion_range = DurationRange::from_millis(range[0], range[1]);
    }
    if let Some(range) = &cli.eating_ms {
        config.eating_range = DurationRange::from_millis(range[0], range[1]);
    }

    config.validate()?;
    Ok(config)
}

fn print_statistics(statistics: &DinnerStatistics) {
    event!(Level::INFO, "------------------ Dinner statistics ------------------");
    event!(Level::INFO, "duration: {:?}", statistics.duration);
    if statistics.interrupted {
        event!(Level::WARN, "the dinner was cut off before the pot emptied");
    }
    event!(
        Level::INFO,
        "remaining portions in the kitchen: {}",
        statistics.remaining_portions
    );
    let mut by_visitor: Vec<_> = statistics.eaten_by_visitor.iter().collect();
    by_visitor.sort();
    for (visitor, eaten) in by_visitor {
        event!(Level::INFO, "visitor {}: {} portions were eaten", visitor, eaten);
    }
}
