//! sqlx adapter ("library A").
//!
//! sqlx is async; each connection carries a private current-thread runtime
//! and every call blocks the caller on it, so the measured latency is the
//! full round trip as seen by synchronous code.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use tokio::runtime::{Builder, Runtime};

use crate::error::{Error, Result};
use crate::query::{QueryShape, Value};

use super::rows::{RowSet, Ticket};

/// A single sqlx SQLite connection and the runtime that drives it.
pub struct SqlxConnection {
    conn: SqliteConnection,
    rt: Runtime,
}

impl SqlxConnection {
    /// Open an existing database file.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let rt = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Connection(format!("failed to create runtime: {}", e)))?;

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(false)
            .busy_timeout(busy_timeout)
            .disable_statement_logging();

        let conn = rt.block_on(options.connect()).map_err(|e| {
            Error::Connection(format!("failed to open {}: {}", path.display(), e))
        })?;

        Ok(Self { conn, rt })
    }

    /// Select rows straight into structs with `query_as` / `query_scalar`.
    pub fn select(
        &mut self,
        sql: &str,
        args: &[Value],
        shape: QueryShape,
    ) -> std::result::Result<RowSet, sqlx::Error> {
        let Self { conn, rt } = self;

        rt.block_on(async {
            match shape {
                QueryShape::Tickets => {
                    let mut query = sqlx::query_as::<_, Ticket>(sql);
                    for arg in args {
                        query = match arg {
                            Value::Int(v) => query.bind(*v),
                            Value::Text(s) => query.bind(s.as_str()),
                        };
                    }
                    query.fetch_all(&mut *conn).await.map(RowSet::Tickets)
                }
                QueryShape::Ids => {
                    let mut query = sqlx::query_scalar::<_, i64>(sql);
                    for arg in args {
                        query = match arg {
                            Value::Int(v) => query.bind(*v),
                            Value::Text(s) => query.bind(s.as_str()),
                        };
                    }
                    query.fetch_all(&mut *conn).await.map(RowSet::Ids)
                }
            }
        })
    }

    /// Close the connection gracefully.
    pub fn close(self) -> Result<()> {
        let Self { conn, rt } = self;
        rt.block_on(conn.close())
            .map_err(|e| Error::Connection(format!("failed to close connection: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_select_matches_driver_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickets.db");
        let seed = fixtures::create_database(&path).unwrap();
        fixtures::setup_schema(&seed).unwrap();
        let tickets = fixtures::generate_tickets(120);
        fixtures::populate(&seed, &tickets).unwrap();

        let mut conn = SqlxConnection::open(&path, Duration::from_secs(1)).unwrap();
        let expected = tickets
            .iter()
            .filter(|t| t.subdomain_id == 1 && (t.state == "open" || t.state == "spam"))
            .count();

        let rows = conn
            .select(
                QueryShape::Tickets.parameterized_sql(),
                &QueryShape::Tickets.args(10_000),
                QueryShape::Tickets,
            )
            .unwrap();
        assert_eq!(rows.len(), expected);

        let ids = conn
            .select(
                QueryShape::Ids.parameterized_sql(),
                &QueryShape::Ids.args(3),
                QueryShape::Ids,
            )
            .unwrap();
        assert_eq!(ids.len(), 3);

        conn.close().unwrap();
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = SqlxConnection::open(&dir.path().join("absent.db"), Duration::from_secs(1));
        assert!(matches!(result, Err(Error::Connection(_))));
    }
}
