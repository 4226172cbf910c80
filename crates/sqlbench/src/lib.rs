//! Query-strategy benchmarking harness.
//!
//! Compares ways of issuing the same SQL query against a database:
//!
//! - **no-arg**: literal SQL, no bound arguments
//! - **throwaway-prepared**: placeholders, statement prepared per call
//! - **reused-prepared**: placeholders, one statement prepared up front
//! - **sqlx-select** / **sqlx-select-args**: `sqlx::query_as` into structs,
//!   literal SQL or bound arguments
//! - **sea-query-select** / **sea-query-select-args**: sea-query built
//!   statement with values inlined or bound, rows mapped into structs
//! - **builder-only**: sea-query statement construction without execution
//!
//! A [`ScenarioRegistry`] crosses strategies with query shapes and limits, a
//! [`Runner`] times each scenario on its own connection, and a
//! [`ResultCollector`] gathers the results and checks that every strategy
//! saw the same rows.

pub mod backends;
pub mod collector;
pub mod config;
pub mod connection;
pub mod error;
pub mod fixtures;
pub mod query;
pub mod registry;
pub mod runner;
pub mod strategy;
pub mod suite;

pub use backends::rows::{RowSet, Ticket};
pub use backends::BuiltQuery;
pub use collector::{ResultCollector, ScenarioFailure};
pub use config::{ConnectionConfig, ConnectionMode, DriverKind, Dsn, RunConfig, Transport};
pub use connection::Connection;
pub use error::{Error, Result};
pub use query::{QueryShape, Value, MAX_LIMIT};
pub use registry::{Scenario, ScenarioRegistry};
pub use runner::{BenchmarkResult, Runner};
pub use strategy::{Binding, Library, Outcome, Strategy, StrategyKind};
pub use suite::Suite;
