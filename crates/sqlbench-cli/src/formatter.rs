//! Output formatters for benchmark reports.

use clap::ValueEnum;
use comfy_table::{Cell, CellAlignment, Table};
use sqlbench::{BenchmarkResult, ScenarioFailure};

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format a report: results in label order, then scenarios that never produced one.
    fn format_report(&self, results: &[BenchmarkResult], failures: &[ScenarioFailure]) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_report(&self, results: &[BenchmarkResult], failures: &[ScenarioFailure]) -> String {
        let mut table = Table::new();
        table.set_header(vec![
            "Scenario", "Iterations", "µs/iter", "ops/s", "Rows/iter", "Errors",
        ]);

        for result in results {
            table.add_row(vec![
                Cell::new(&result.scenario_label),
                Cell::new(result.iterations).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.2}", result.micros_per_iteration()))
                    .set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.0}", result.throughput())).set_alignment(CellAlignment::Right),
                Cell::new(rows_cell(result)).set_alignment(CellAlignment::Right),
                Cell::new(errors_cell(result)).set_alignment(CellAlignment::Right),
            ]);
        }

        let mut output = format!("{}\n{} scenario(s)", table, results.len());

        if !failures.is_empty() {
            let mut failed = Table::new();
            failed.set_header(vec!["Failed scenario", "Error"]);
            for failure in failures {
                failed.add_row(vec![&failure.scenario_label, &failure.error]);
            }
            output.push_str(&format!("\n\n{}", failed));
        }

        output
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_report(&self, results: &[BenchmarkResult], failures: &[ScenarioFailure]) -> String {
        serde_json::to_string_pretty(&serde_json::json!({
            "results": results,
            "failures": failures,
        }))
        .unwrap_or_else(|_| "{}".to_string())
    }
}

/// CSV formatter.
///
/// Failed scenarios appear as rows with empty timings and the error text.
pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format_report(&self, results: &[BenchmarkResult], failures: &[ScenarioFailure]) -> String {
        let mut output = String::from(
            "scenario,strategy,shape,limit,iterations,nanos_per_iteration,rows_returned,error_count,aborted,error\n",
        );

        for r in results {
            output.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},\"{}\"\n",
                r.scenario_label,
                r.strategy,
                r.shape,
                r.limit,
                r.iterations,
                r.elapsed_per_iteration.as_nanos(),
                r.rows_returned,
                r.error_count,
                r.aborted,
                escape_csv(r.errors.first().map(String::as_str).unwrap_or("")),
            ));
        }

        for f in failures {
            output.push_str(&format!(
                "{},,,,,,,,,\"{}\"\n",
                f.scenario_label,
                escape_csv(&f.error)
            ));
        }

        output
    }
}

fn rows_cell(result: &BenchmarkResult) -> String {
    match result.rows_per_iteration() {
        Some(rows) => rows.to_string(),
        None => "-".to_string(),
    }
}

fn errors_cell(result: &BenchmarkResult) -> String {
    if result.aborted {
        format!("{} (aborted)", result.error_count)
    } else {
        result.error_count.to_string()
    }
}

/// Escape a string for CSV.
fn escape_csv(s: &str) -> String {
    s.replace('"', "\"\"")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sqlbench::{QueryShape, StrategyKind};

    use super::*;

    fn result(label: &str, errors: Vec<String>) -> BenchmarkResult {
        BenchmarkResult {
            scenario_label: label.to_string(),
            strategy: StrategyKind::NoArgQuery,
            shape: QueryShape::Tickets,
            limit: 100,
            iterations: 10,
            successful_iterations: 10,
            elapsed_per_iteration: Duration::from_micros(250),
            rows_returned: 1000,
            error_count: errors.len() as u64,
            aborted: false,
            errors,
        }
    }

    fn failure() -> ScenarioFailure {
        ScenarioFailure {
            scenario_label: "reused-prepared-1".to_string(),
            error: "prepare error: no such table: tickets".to_string(),
        }
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("hello"), "hello");
        assert_eq!(escape_csv("say \"hi\""), "say \"\"hi\"\"");
    }

    #[test]
    fn test_table_lists_results_and_failures() {
        let out = TableFormatter.format_report(&[result("no-arg-100", vec![])], &[failure()]);
        assert!(out.contains("no-arg-100"));
        assert!(out.contains("250.00"));
        assert!(out.contains("1 scenario(s)"));
        assert!(out.contains("reused-prepared-1"));
        assert!(out.contains("no such table"));
    }

    #[test]
    fn test_json_is_parseable() {
        let out = JsonFormatter.format_report(&[result("no-arg-100", vec![])], &[failure()]);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value["results"][0]["scenario"], "no-arg-100");
        assert_eq!(value["results"][0]["strategy"], "no-arg");
        assert_eq!(value["results"][0]["shape"], "tickets");
        assert_eq!(value["results"][0]["nanos_per_iteration"], 250_000);
        assert_eq!(value["results"][0]["rows_returned"], 1000);
        assert_eq!(value["failures"][0]["scenario"], "reused-prepared-1");
    }

    #[test]
    fn test_csv_one_line_per_scenario() {
        let errors = vec!["execution error: \"boom\"".to_string()];
        let out = CsvFormatter.format_report(&[result("no-arg-100", errors)], &[failure()]);
        let lines: Vec<_> = out.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("scenario,strategy"));
        assert!(lines[1].starts_with("no-arg-100,no-arg,tickets,100,10,250000,1000,1,false,"));
        assert!(lines[1].contains("\"\"boom\"\""));
        assert!(lines[2].starts_with("reused-prepared-1,,,"));
    }

    #[test]
    fn test_create_formatter() {
        let results = [result("no-arg-100", vec![])];
        for format in [OutputFormat::Table, OutputFormat::Json, OutputFormat::Csv] {
            let out = create_formatter(format).format_report(&results, &[]);
            assert!(out.contains("no-arg-100"), "{}", format);
        }
    }
}
