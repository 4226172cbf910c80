//! Benchmark runner.
//!
//! Drives one scenario: open, prepare, warm up, then time the steady-state
//! iterations. Only the timed loop is measured.

use std::hint::black_box;
use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};

use crate::config::{ConnectionConfig, ConnectionMode, RunConfig};
use crate::connection;
use crate::error::{Error, Result};
use crate::query::QueryShape;
use crate::registry::Scenario;
use crate::strategy::{Strategy, StrategyKind};

/// Error messages kept per result; the count is always exact.
pub const MAX_RECORDED_ERRORS: usize = 8;

/// Outcome of running one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkResult {
    #[serde(rename = "scenario")]
    pub scenario_label: String,
    pub strategy: StrategyKind,
    pub shape: QueryShape,
    pub limit: u64,
    /// Timed iterations attempted.
    pub iterations: u64,
    /// Timed iterations that succeeded.
    pub successful_iterations: u64,
    #[serde(rename = "nanos_per_iteration", serialize_with = "as_nanos")]
    pub elapsed_per_iteration: Duration,
    /// Rows returned across all successful timed iterations.
    pub rows_returned: u64,
    /// Failed executions, warmup included.
    pub error_count: u64,
    /// Stopped early by the consecutive-error guard.
    pub aborted: bool,
    pub errors: Vec<String>,
}

impl BenchmarkResult {
    /// Rows one successful iteration returned, if any succeeded.
    pub fn rows_per_iteration(&self) -> Option<u64> {
        (self.successful_iterations > 0).then(|| self.rows_returned / self.successful_iterations)
    }

    /// Iterations per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed_per_iteration.as_secs_f64();
        if secs > 0.0 {
            1.0 / secs
        } else {
            0.0
        }
    }

    /// Mean latency in microseconds.
    pub fn micros_per_iteration(&self) -> f64 {
        self.elapsed_per_iteration.as_nanos() as f64 / 1_000.0
    }
}

fn as_nanos<S: Serializer>(duration: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX))
}

/// Accumulates iteration outcomes for one scenario.
struct Tally<'a> {
    label: &'a str,
    max_consecutive: u32,
    consecutive: u32,
    error_count: u64,
    successful: u64,
    rows: u64,
    errors: Vec<String>,
}

impl<'a> Tally<'a> {
    fn new(label: &'a str, max_consecutive: u32) -> Self {
        Self {
            label,
            max_consecutive,
            consecutive: 0,
            error_count: 0,
            successful: 0,
            rows: 0,
            errors: Vec::new(),
        }
    }

    /// Record a timed success.
    fn success(&mut self, rows: usize) {
        self.consecutive = 0;
        self.successful += 1;
        self.rows += rows as u64;
    }

    /// Record a failure; returns true once the guard trips.
    fn failure(&mut self, err: &Error) -> bool {
        self.consecutive += 1;
        self.error_count += 1;
        if self.errors.len() < MAX_RECORDED_ERRORS {
            self.errors.push(err.to_string());
        }
        tracing::warn!(
            scenario = self.label,
            consecutive = self.consecutive,
            error = %err,
            "iteration failed"
        );
        self.consecutive > self.max_consecutive
    }
}

/// Runs scenarios with a fixed [`RunConfig`].
#[derive(Debug, Clone, Default)]
pub struct Runner {
    config: RunConfig,
}

impl Runner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run a scenario against the database behind `dsn`.
    ///
    /// Connection and prepare failures are returned as errors; execution
    /// failures are counted in the result.
    pub fn run(&self, scenario: &Scenario, dsn: &str) -> Result<BenchmarkResult> {
        let conn_config = ConnectionConfig::new(dsn, scenario.strategy().driver_kind())
            .with_busy_timeout(self.config.busy_timeout);

        match self.config.connection_mode {
            ConnectionMode::Reuse => self.run_reusing(scenario, &conn_config),
            ConnectionMode::ReopenPerIteration => self.run_reopening(scenario, &conn_config),
        }
    }

    fn bind(&self, scenario: &Scenario, conn_config: &ConnectionConfig) -> Result<Strategy> {
        let conn = connection::open(conn_config)?;
        scenario
            .strategy()
            .prepare(conn, scenario.shape(), scenario.limit())
    }

    fn run_reusing(&self, scenario: &Scenario, conn_config: &ConnectionConfig) -> Result<BenchmarkResult> {
        let mut strategy = self.bind(scenario, conn_config)?;
        let mut tally = Tally::new(scenario.label(), self.config.max_consecutive_errors);

        tracing::debug!(scenario = scenario.label(), warmup = self.config.warmup, "warming up");
        let mut aborted = false;
        for _ in 0..self.config.warmup {
            if let Err(err) = strategy.execute() {
                if tally.failure(&err) {
                    aborted = true;
                    break;
                }
            }
        }

        let mut attempted = 0;
        let mut elapsed = Duration::ZERO;
        if !aborted {
            tally.consecutive = 0;
            let start = Instant::now();
            while attempted < self.config.iterations {
                attempted += 1;
                match strategy.execute() {
                    Ok(outcome) => tally.success(black_box(outcome).row_count()),
                    Err(err) => {
                        if tally.failure(&err) {
                            aborted = true;
                            break;
                        }
                    }
                }
            }
            elapsed = start.elapsed();
        }

        let result = self.finish(scenario, tally, attempted, elapsed, aborted);
        Ok(keep_after_close(result, strategy.close()))
    }

    fn run_reopening(
        &self,
        scenario: &Scenario,
        conn_config: &ConnectionConfig,
    ) -> Result<BenchmarkResult> {
        // Open once up front so an unreachable database stays fatal.
        self.bind(scenario, conn_config)?.close()?;

        let mut tally = Tally::new(scenario.label(), self.config.max_consecutive_errors);
        let once = || -> Result<usize> {
            let mut strategy = self.bind(scenario, conn_config)?;
            let rows = strategy.execute()?.row_count();
            strategy.close()?;
            Ok(rows)
        };

        let mut aborted = false;
        for _ in 0..self.config.warmup {
            if let Err(err) = once() {
                if tally.failure(&err) {
                    aborted = true;
                    break;
                }
            }
        }

        let mut attempted = 0;
        let mut elapsed = Duration::ZERO;
        if !aborted {
            tally.consecutive = 0;
            let start = Instant::now();
            while attempted < self.config.iterations {
                attempted += 1;
                match once() {
                    Ok(rows) => tally.success(black_box(rows)),
                    Err(err) => {
                        if tally.failure(&err) {
                            aborted = true;
                            break;
                        }
                    }
                }
            }
            elapsed = start.elapsed();
        }

        Ok(self.finish(scenario, tally, attempted, elapsed, aborted))
    }

    fn finish(
        &self,
        scenario: &Scenario,
        tally: Tally<'_>,
        attempted: u64,
        elapsed: Duration,
        aborted: bool,
    ) -> BenchmarkResult {
        let elapsed_per_iteration = if attempted == 0 {
            Duration::ZERO
        } else {
            let nanos = elapsed.as_nanos() / u128::from(attempted);
            Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
        };

        let result = BenchmarkResult {
            scenario_label: scenario.label().to_string(),
            strategy: scenario.strategy(),
            shape: scenario.shape(),
            limit: scenario.limit(),
            iterations: attempted,
            successful_iterations: tally.successful,
            elapsed_per_iteration,
            rows_returned: tally.rows,
            error_count: tally.error_count,
            aborted,
            errors: tally.errors,
        };

        tracing::info!(
            scenario = %result.scenario_label,
            iterations = result.iterations,
            micros_per_iter = result.micros_per_iteration(),
            rows = result.rows_returned,
            errors = result.error_count,
            aborted = result.aborted,
            "scenario complete"
        );

        result
    }
}

/// A failed close is noted on an otherwise complete result.
fn keep_after_close(mut result: BenchmarkResult, closed: Result<()>) -> BenchmarkResult {
    if let Err(err) = closed {
        tracing::error!(
            scenario = %result.scenario_label,
            error = %err,
            "failed to close connection"
        );
        if result.errors.len() < MAX_RECORDED_ERRORS {
            result.errors.push(err.to_string());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::query::MAX_LIMIT;
    use crate::strategy::{Binding, Library};

    fn seeded_dsn(dir: &tempfile::TempDir, rows: usize) -> String {
        let path = dir.path().join("tickets.db");
        let conn = fixtures::create_database(&path).unwrap();
        fixtures::setup_schema(&conn).unwrap();
        fixtures::populate(&conn, &fixtures::generate_tickets(rows)).unwrap();
        format!("bench@file({})/tickets", dir.path().display())
    }

    #[test]
    fn test_zero_iterations() {
        let dir = tempfile::tempdir().unwrap();
        let dsn = seeded_dsn(&dir, 30);
        let runner = Runner::new(RunConfig::new(0, 0));

        let scenario = Scenario::new(StrategyKind::ReusedPreparedStatement, QueryShape::Tickets, 10);
        let result = runner.run(&scenario, &dsn).unwrap();

        assert_eq!(result.iterations, 0);
        assert_eq!(result.elapsed_per_iteration, Duration::ZERO);
        assert_eq!(result.error_count, 0);
        assert_eq!(result.rows_per_iteration(), None);
        assert_eq!(result.throughput(), 0.0);
    }

    #[test]
    fn test_rows_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let dsn = seeded_dsn(&dir, 300);
        let runner = Runner::new(RunConfig::new(5, 2));

        let scenario = Scenario::new(StrategyKind::NoArgQuery, QueryShape::Ids, 10);
        let result = runner.run(&scenario, &dsn).unwrap();

        assert_eq!(result.iterations, 5);
        assert_eq!(result.successful_iterations, 5);
        assert_eq!(result.rows_returned, 50);
        assert_eq!(result.rows_per_iteration(), Some(10));
        assert!(!result.aborted);
    }

    #[test]
    fn test_consecutive_errors_abort() {
        let dir = tempfile::tempdir().unwrap();
        fixtures::create_database(&dir.path().join("tickets.db")).unwrap();
        let dsn = format!("bench@file({})/tickets", dir.path().display());

        let runner = Runner::new(RunConfig::new(1_000, 0).with_max_consecutive_errors(3));
        let scenario = Scenario::new(StrategyKind::NoArgQuery, QueryShape::Tickets, 1);
        let result = runner.run(&scenario, &dsn).unwrap();

        assert!(result.aborted);
        assert_eq!(result.error_count, 4);
        assert_eq!(result.iterations, 4);
        assert_eq!(result.successful_iterations, 0);
        assert_eq!(result.errors.len(), 4);
        assert!(result.errors[0].contains("no such table"));
    }

    #[test]
    fn test_missing_database_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let dsn = format!("bench@file({})/absent", dir.path().display());
        let runner = Runner::new(RunConfig::new(10, 0));

        for mode in [ConnectionMode::Reuse, ConnectionMode::ReopenPerIteration] {
            let runner = Runner::new(runner.config().clone().with_connection_mode(mode));
            let scenario = Scenario::new(StrategyKind::NoArgQuery, QueryShape::Tickets, 1);
            assert!(matches!(
                runner.run(&scenario, &dsn),
                Err(Error::Connection(_))
            ));
        }
    }

    #[test]
    fn test_reopen_per_iteration_matches_reuse() {
        let dir = tempfile::tempdir().unwrap();
        let dsn = seeded_dsn(&dir, 300);
        let scenario = Scenario::new(
            StrategyKind::LibrarySelectInto(Library::Sqlx, Binding::Args),
            QueryShape::Tickets,
            20,
        );

        let reuse = Runner::new(RunConfig::new(3, 1)).run(&scenario, &dsn).unwrap();
        let reopen = Runner::new(
            RunConfig::new(3, 1).with_connection_mode(ConnectionMode::ReopenPerIteration),
        )
        .run(&scenario, &dsn)
        .unwrap();

        assert_eq!(reuse.rows_returned, reopen.rows_returned);
        assert_eq!(reopen.error_count, 0);
    }

    #[test]
    fn test_close_failure_keeps_result() {
        let dir = tempfile::tempdir().unwrap();
        let dsn = seeded_dsn(&dir, 30);
        let runner = Runner::new(RunConfig::new(4, 0));
        let scenario = Scenario::new(StrategyKind::NoArgQuery, QueryShape::Ids, 5);
        let result = runner.run(&scenario, &dsn).unwrap();

        let kept = keep_after_close(
            result.clone(),
            Err(Error::Connection("database is locked".to_string())),
        );
        assert_eq!(kept.iterations, result.iterations);
        assert_eq!(kept.rows_returned, result.rows_returned);
        assert_eq!(kept.error_count, result.error_count);
        assert_eq!(kept.errors, ["connection error: database is locked"]);

        assert_eq!(keep_after_close(result.clone(), Ok(())), result);
    }

    #[test]
    fn test_limit_beyond_sql_integer_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let dsn = seeded_dsn(&dir, 30);
        let runner = Runner::new(RunConfig::new(1, 0));

        for strategy in StrategyKind::ALL {
            let scenario = Scenario::new(strategy, QueryShape::Tickets, u64::MAX);
            assert!(
                matches!(runner.run(&scenario, &dsn), Err(Error::Config(_))),
                "{}",
                strategy
            );
        }

        let largest = Scenario::new(StrategyKind::NoArgQuery, QueryShape::Ids, MAX_LIMIT);
        assert_eq!(runner.run(&largest, &dsn).unwrap().error_count, 0);
    }

    #[test]
    fn test_builder_only_returns_no_rows() {
        let runner = Runner::new(RunConfig::new(10, 0));
        let scenario = Scenario::new(StrategyKind::QueryBuilderOnly, QueryShape::Tickets, 100);
        // The builder never opens the database, so it need not exist.
        let result = runner.run(&scenario, "bench@file(/nonexistent)/tickets").unwrap();

        assert_eq!(result.iterations, 10);
        assert_eq!(result.rows_returned, 0);
        assert_eq!(result.error_count, 0);
    }
}
