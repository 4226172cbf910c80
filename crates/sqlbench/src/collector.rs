//! Result collector.
//!
//! Append-only log of scenario outcomes plus the post-run sanity check that
//! every executing strategy saw the same number of rows.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::query::QueryShape;
use crate::runner::BenchmarkResult;

/// A scenario that ended with a fatal error instead of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioFailure {
    #[serde(rename = "scenario")]
    pub scenario_label: String,
    pub error: String,
}

/// Collects results in the order scenarios ran.
#[derive(Debug, Clone, Default)]
pub struct ResultCollector {
    results: Vec<BenchmarkResult>,
    failures: Vec<ScenarioFailure>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: BenchmarkResult) {
        self.results.push(result);
    }

    pub fn record_failure(&mut self, scenario_label: impl Into<String>, error: &Error) {
        self.failures.push(ScenarioFailure {
            scenario_label: scenario_label.into(),
            error: error.to_string(),
        });
    }

    /// Results sorted by scenario label.
    pub fn report(&self) -> Vec<BenchmarkResult> {
        let mut report = self.results.clone();
        report.sort_by(|a, b| a.scenario_label.cmp(&b.scenario_label));
        report
    }

    /// Results in the order they were recorded.
    pub fn results(&self) -> &[BenchmarkResult] {
        &self.results
    }

    pub fn failures(&self) -> &[ScenarioFailure] {
        &self.failures
    }

    /// Whether any scenario failed or counted an error.
    pub fn has_errors(&self) -> bool {
        !self.failures.is_empty() || self.results.iter().any(|r| r.error_count > 0)
    }

    /// Check that every executing strategy returned the same row count for
    /// each (shape, limit) pair.
    ///
    /// Results without a successful iteration carry no row count and are
    /// skipped.
    pub fn verify_row_counts(&self) -> Result<()> {
        let mut seen: BTreeMap<(QueryShape, u64), (&str, u64)> = BTreeMap::new();

        for result in &self.results {
            if !result.strategy.executes() {
                continue;
            }
            let Some(rows) = result.rows_per_iteration() else {
                continue;
            };

            match seen.get(&(result.shape, result.limit)) {
                None => {
                    seen.insert(
                        (result.shape, result.limit),
                        (result.scenario_label.as_str(), rows),
                    );
                }
                Some(&(first, first_rows)) if first_rows != rows => {
                    return Err(Error::ReportMismatch {
                        query: format!("{} limit {}", result.shape, result.limit),
                        left: first.to_string(),
                        left_rows: first_rows,
                        right: result.scenario_label.clone(),
                        right_rows: rows,
                    });
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}
