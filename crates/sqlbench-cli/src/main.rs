//! sqlbench command-line runner.
//!
//! Runs the scenario cross-product against a database and prints the
//! report. Exit codes: 0 clean, 1 a scenario recorded errors, 2 the run
//! itself failed.

mod formatter;

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use formatter::OutputFormat;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sqlbench::config::{
    DEFAULT_DSN, DEFAULT_ITERATIONS, DEFAULT_MAX_CONSECUTIVE_ERRORS, DEFAULT_WARMUP,
};
use sqlbench::{
    fixtures, ConnectionMode, QueryShape, RunConfig, ScenarioRegistry, StrategyKind, Suite,
    MAX_LIMIT,
};

/// Query-strategy benchmark runner
#[derive(Parser, Debug)]
#[command(name = "sqlbench")]
#[command(version, about = "Compare SQL access strategies against one query", long_about = None)]
pub struct Args {
    /// Connection string, `<user>@<transport>(<address>)/<database>`.
    #[arg(long, default_value = DEFAULT_DSN)]
    pub dsn: String,

    /// Timed iterations per scenario.
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    pub iterations: u64,

    /// Untimed warmup iterations per scenario.
    #[arg(long, default_value_t = DEFAULT_WARMUP)]
    pub warmup: u64,

    /// Result-set limits to run, comma separated.
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "1,100,1000,10000",
        value_parser = clap::value_parser!(u64).range(..=MAX_LIMIT)
    )]
    pub limit_set: Vec<u64>,

    /// Strategies to include, comma separated (default: all).
    #[arg(long, value_delimiter = ',')]
    pub strategies: Vec<StrategyKind>,

    /// Query shapes to include, comma separated.
    #[arg(long, value_delimiter = ',', default_value = "tickets")]
    pub shapes: Vec<QueryShape>,

    /// Consecutive failures tolerated before a scenario stops early.
    #[arg(long, default_value_t = DEFAULT_MAX_CONSECUTIVE_ERRORS)]
    pub max_consecutive_errors: u32,

    /// Open a fresh connection inside every timed iteration.
    #[arg(long)]
    pub reconnect: bool,

    /// Recreate the tickets table with this many generated rows first.
    #[arg(long, value_name = "ROWS")]
    pub seed: Option<usize>,

    /// Output format.
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,
}

impl Args {
    /// Convert command-line arguments to runner configuration.
    pub fn to_config(&self) -> RunConfig {
        let mode = if self.reconnect {
            ConnectionMode::ReopenPerIteration
        } else {
            ConnectionMode::Reuse
        };

        RunConfig::new(self.iterations, self.warmup)
            .with_max_consecutive_errors(self.max_consecutive_errors)
            .with_connection_mode(mode)
    }

    /// Build the scenario registry from the selected strategies, shapes and limits.
    pub fn registry(&self) -> ScenarioRegistry {
        let strategies = if self.strategies.is_empty() {
            StrategyKind::ALL.to_vec()
        } else {
            self.strategies.clone()
        };
        ScenarioRegistry::new(&strategies, &self.shapes, &self.limit_set)
    }
}

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries only the report.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sqlbench=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let outcome = run(args, &mut std::io::stdout().lock());
    if let Err(e) = &outcome {
        eprintln!("Error: {}", e);
    }

    ExitCode::from(exit_status(&outcome))
}

type RunOutcome = Result<bool, Box<dyn std::error::Error>>;

/// 0 for a clean run, 1 when any scenario recorded errors, 2 when the run failed.
fn exit_status(outcome: &RunOutcome) -> u8 {
    match outcome {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(_) => 2,
    }
}

/// Run the suite and write the report; returns whether it was error-free.
fn run(args: Args, out: &mut impl Write) -> RunOutcome {
    let config = args.to_config();
    let registry = args.registry();

    tracing::info!(
        dsn = %args.dsn,
        scenarios = registry.len(),
        iterations = config.iterations,
        warmup = config.warmup,
        mode = ?config.connection_mode,
        "starting benchmark run"
    );

    let suite = Suite::new(&args.dsn, config, registry)?;

    // Kept open for the whole run.
    let _seeded = match args.seed {
        Some(rows) => Some(fixtures::seed(&args.dsn, rows)?),
        None => None,
    };

    let collector = suite.run()?;
    let formatter = formatter::create_formatter(args.format);
    writeln!(out, "{}", formatter.format_report(&collector.report(), collector.failures()))?;

    Ok(!collector.has_errors())
}
