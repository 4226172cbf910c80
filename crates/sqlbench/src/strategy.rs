//! Query strategies.
//!
//! A [`StrategyKind`] names one way of reaching the database. Binding it to
//! an open [`Connection`] and a query yields a [`Strategy`], which does any
//! one-time preparation up front and then executes on demand.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::backends::builder::{self, BuiltQuery};
use crate::backends::rows::RowSet;
use crate::config::DriverKind;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::query::{QueryShape, Value, MAX_LIMIT};

/// Library behind a library-mediated select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Library {
    /// `sqlx::query_as` into structs.
    Sqlx,
    /// sea-query statement mapped into structs by the driver.
    SeaQuery,
}

/// How a library select carries its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Binding {
    /// Every value written into the SQL text.
    Inline,
    /// Values sent as bound arguments.
    Args,
}

/// The access patterns under comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "&'static str")]
pub enum StrategyKind {
    /// Literal SQL, no arguments.
    NoArgQuery,
    /// Placeholders bound to a statement prepared and discarded per call.
    ThrowawayPreparedQuery,
    /// Placeholders bound to one statement prepared before timing.
    ReusedPreparedStatement,
    /// A library's select-into-structs convenience call.
    LibrarySelectInto(Library, Binding),
    /// SQL text and arguments built but never executed.
    QueryBuilderOnly,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 8] = [
        StrategyKind::NoArgQuery,
        StrategyKind::ThrowawayPreparedQuery,
        StrategyKind::ReusedPreparedStatement,
        StrategyKind::LibrarySelectInto(Library::Sqlx, Binding::Inline),
        StrategyKind::LibrarySelectInto(Library::Sqlx, Binding::Args),
        StrategyKind::LibrarySelectInto(Library::SeaQuery, Binding::Inline),
        StrategyKind::LibrarySelectInto(Library::SeaQuery, Binding::Args),
        StrategyKind::QueryBuilderOnly,
    ];

    /// Stable name used in labels and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::NoArgQuery => "no-arg",
            StrategyKind::ThrowawayPreparedQuery => "throwaway-prepared",
            StrategyKind::ReusedPreparedStatement => "reused-prepared",
            StrategyKind::LibrarySelectInto(Library::Sqlx, Binding::Inline) => "sqlx-select",
            StrategyKind::LibrarySelectInto(Library::Sqlx, Binding::Args) => "sqlx-select-args",
            StrategyKind::LibrarySelectInto(Library::SeaQuery, Binding::Inline) => {
                "sea-query-select"
            }
            StrategyKind::LibrarySelectInto(Library::SeaQuery, Binding::Args) => {
                "sea-query-select-args"
            }
            StrategyKind::QueryBuilderOnly => "builder-only",
        }
    }

    /// Handle kind the connection provider must supply.
    pub fn driver_kind(&self) -> DriverKind {
        match self {
            StrategyKind::NoArgQuery | StrategyKind::ThrowawayPreparedQuery => DriverKind::RawQuery,
            StrategyKind::ReusedPreparedStatement => DriverKind::PreparedStatement,
            StrategyKind::LibrarySelectInto(Library::Sqlx, _) => DriverKind::LibraryA,
            StrategyKind::LibrarySelectInto(Library::SeaQuery, _) => DriverKind::LibraryB,
            StrategyKind::QueryBuilderOnly => DriverKind::QueryBuilder,
        }
    }

    /// Whether the strategy round-trips to the database.
    pub fn executes(&self) -> bool {
        !matches!(self, StrategyKind::QueryBuilderOnly)
    }

    /// Bind this strategy to an open connection and a query.
    ///
    /// Only [`StrategyKind::ReusedPreparedStatement`] does work here: its
    /// statement is compiled into the driver cache, and a failure is a
    /// [`Error::Prepare`].
    pub fn prepare(self, conn: Connection, shape: QueryShape, limit: u64) -> Result<Strategy> {
        if limit > MAX_LIMIT {
            return Err(Error::Config(format!(
                "limit {} exceeds the largest SQL integer {}",
                limit, MAX_LIMIT
            )));
        }

        let compatible = matches!(
            (self.driver_kind(), &conn),
            (
                DriverKind::RawQuery | DriverKind::PreparedStatement | DriverKind::LibraryB,
                Connection::Driver(_)
            ) | (DriverKind::LibraryA, Connection::Sqlx(_))
                | (DriverKind::QueryBuilder, Connection::Detached)
        );
        if !compatible {
            return Err(Error::Config(format!(
                "strategy {} cannot run on a {} connection",
                self,
                conn.kind_name()
            )));
        }

        let (sql, args) = match self {
            StrategyKind::NoArgQuery
            | StrategyKind::LibrarySelectInto(Library::Sqlx, Binding::Inline) => {
                (shape.literal_sql(limit), Vec::new())
            }
            StrategyKind::ThrowawayPreparedQuery
            | StrategyKind::ReusedPreparedStatement
            | StrategyKind::LibrarySelectInto(Library::Sqlx, Binding::Args) => {
                (shape.parameterized_sql().to_string(), shape.args(limit))
            }
            // Built per execution; building is part of what these measure.
            StrategyKind::LibrarySelectInto(Library::SeaQuery, _)
            | StrategyKind::QueryBuilderOnly => (String::new(), Vec::new()),
        };

        if let (StrategyKind::ReusedPreparedStatement, Connection::Driver(driver)) = (self, &conn) {
            driver
                .prepare_cached(&sql)
                .map_err(|e| Error::Prepare(format!("{}: {}", sql, e)))?;
            tracing::debug!(sql = %sql, "statement prepared");
        }

        Ok(Strategy {
            kind: self,
            shape,
            limit,
            sql,
            args,
            conn,
        })
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<StrategyKind> for &'static str {
    fn from(kind: StrategyKind) -> Self {
        kind.name()
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| {
                let known: Vec<_> = StrategyKind::ALL.iter().map(|k| k.name()).collect();
                Error::Config(format!(
                    "unknown strategy `{}` (expected one of: {})",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// What one execution produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Rows scanned from the database.
    Rows(RowSet),
    /// A statement built without touching the database.
    Statement(BuiltQuery),
}

impl Outcome {
    /// Rows returned; zero for a built statement.
    pub fn row_count(&self) -> usize {
        match self {
            Outcome::Rows(rows) => rows.len(),
            Outcome::Statement(_) => 0,
        }
    }
}

/// A strategy bound to its connection and query, ready to run.
pub struct Strategy {
    kind: StrategyKind,
    shape: QueryShape,
    limit: u64,
    sql: String,
    args: Vec<Value>,
    conn: Connection,
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    /// SQL sent on every execution, empty when it is built per execution.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Arguments bound on every execution.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Run the query once.
    pub fn execute(&mut self) -> Result<Outcome> {
        let shape = self.shape;
        let exec_err = |e: &dyn fmt::Display| Error::Execution(e.to_string());

        match (self.kind, &mut self.conn) {
            (
                StrategyKind::NoArgQuery | StrategyKind::ThrowawayPreparedQuery,
                Connection::Driver(conn),
            ) => conn
                .query(&self.sql, &self.args, shape)
                .map(Outcome::Rows)
                .map_err(|e| exec_err(&e)),
            (StrategyKind::ReusedPreparedStatement, Connection::Driver(conn)) => conn
                .query_cached(&self.sql, &self.args, shape)
                .map(Outcome::Rows)
                .map_err(|e| exec_err(&e)),
            (StrategyKind::LibrarySelectInto(Library::Sqlx, _), Connection::Sqlx(conn)) => conn
                .select(&self.sql, &self.args, shape)
                .map(Outcome::Rows)
                .map_err(|e| exec_err(&e)),
            (
                StrategyKind::LibrarySelectInto(Library::SeaQuery, Binding::Inline),
                Connection::Driver(conn),
            ) => {
                let sql = builder::select_inline(shape, self.limit);
                conn.query(&sql, &[], shape)
                    .map(Outcome::Rows)
                    .map_err(|e| exec_err(&e))
            }
            (
                StrategyKind::LibrarySelectInto(Library::SeaQuery, Binding::Args),
                Connection::Driver(conn),
            ) => {
                let built = builder::select(shape, self.limit)?;
                conn.query(&built.sql, &built.args, shape)
                    .map(Outcome::Rows)
                    .map_err(|e| exec_err(&e))
            }
            (StrategyKind::QueryBuilderOnly, _) => {
                builder::select(shape, self.limit).map(Outcome::Statement)
            }
            (kind, conn) => Err(Error::Config(format!(
                "strategy {} cannot run on a {} connection",
                kind,
                conn.kind_name()
            ))),
        }
    }

    /// Release the connection.
    pub fn close(self) -> Result<()> {
        self.conn.close()
    }
}
