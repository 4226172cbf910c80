//! End-to-end run of a scenario registry.

use std::time::Duration;

use crate::backends::builder;
use crate::backends::DriverConnection;
use crate::collector::ResultCollector;
use crate::config::{Dsn, RunConfig};
use crate::error::{Error, Result};
use crate::query::{QueryShape, MAX_LIMIT};
use crate::registry::ScenarioRegistry;
use crate::runner::Runner;
use crate::strategy::StrategyKind;

/// A registry, a database and the runner settings to apply to both.
#[derive(Debug, Clone)]
pub struct Suite {
    dsn: String,
    registry: ScenarioRegistry,
    runner: Runner,
    verify_builder_sql: bool,
}

impl Suite {
    /// Create a suite; a malformed DSN or an out-of-range limit fails here,
    /// before any scenario runs.
    pub fn new(dsn: impl Into<String>, config: RunConfig, registry: ScenarioRegistry) -> Result<Self> {
        let dsn = dsn.into();
        Dsn::parse(&dsn)?;
        if let Some(scenario) = registry.iter().find(|s| s.limit() > MAX_LIMIT) {
            return Err(Error::Config(format!(
                "scenario {}: limit exceeds {}",
                scenario.label(),
                MAX_LIMIT
            )));
        }
        Ok(Self {
            dsn,
            registry,
            runner: Runner::new(config),
            verify_builder_sql: true,
        })
    }

    /// Enable or disable executing the builder's SQL after the run.
    pub fn with_builder_verification(mut self, enabled: bool) -> Self {
        self.verify_builder_sql = enabled;
        self
    }

    pub fn registry(&self) -> &ScenarioRegistry {
        &self.registry
    }

    /// Run every scenario in registry order.
    ///
    /// Fatal scenario errors are recorded and the run continues. A row
    /// count disagreement between strategies fails the whole run.
    pub fn run(&self) -> Result<ResultCollector> {
        let mut collector = ResultCollector::new();

        for scenario in self.registry.iter() {
            tracing::debug!(scenario = scenario.label(), "running scenario");
            match self.runner.run(scenario, &self.dsn) {
                Ok(result) => collector.record(result),
                Err(err) => {
                    tracing::error!(scenario = scenario.label(), error = %err, "scenario failed");
                    collector.record_failure(scenario.label(), &err);
                }
            }
        }

        collector.verify_row_counts()?;

        if self.verify_builder_sql {
            // Only where the database answered for the same query.
            let reachable = |shape: QueryShape, limit: u64| {
                collector.results().iter().any(|r| {
                    r.strategy.executes()
                        && r.shape == shape
                        && r.limit == limit
                        && r.successful_iterations > 0
                })
            };
            for scenario in self.registry.iter() {
                if scenario.strategy() == StrategyKind::QueryBuilderOnly
                    && reachable(scenario.shape(), scenario.limit())
                {
                    verify_builder_sql(
                        &self.dsn,
                        scenario.shape(),
                        scenario.limit(),
                        self.runner.config().busy_timeout,
                    )?;
                }
            }
        }

        Ok(collector)
    }
}

/// Execute the builder's SQL directly and compare its row count with the
/// reused prepared statement's.
pub fn verify_builder_sql(
    dsn: &str,
    shape: QueryShape,
    limit: u64,
    busy_timeout: Duration,
) -> Result<()> {
    let path = Dsn::parse(dsn)?.database_path()?;
    let conn = DriverConnection::open(&path, busy_timeout)?;
    let exec_err = |e: rusqlite::Error| Error::Execution(e.to_string());

    let built = builder::select(shape, limit)?;
    let built_rows = conn.query(&built.sql, &built.args, shape).map_err(exec_err)?.len() as u64;
    let prepared_rows = conn
        .query_cached(shape.parameterized_sql(), &shape.args(limit), shape)
        .map_err(exec_err)?
        .len() as u64;
    conn.close()?;

    if built_rows != prepared_rows {
        return Err(Error::ReportMismatch {
            query: format!("{} limit {}", shape, limit),
            left: StrategyKind::QueryBuilderOnly.to_string(),
            left_rows: built_rows,
            right: StrategyKind::ReusedPreparedStatement.to_string(),
            right_rows: prepared_rows,
        });
    }

    tracing::debug!(shape = %shape, limit, rows = built_rows, "builder SQL verified");
    Ok(())
}
