//! Raw driver adapter (rusqlite).
//!
//! Covers the no-argument query, the throwaway prepared statement and the
//! reused prepared statement. Reuse goes through the connection's statement
//! cache, which keeps the compiled statement alive between executions.

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags, Statement};

use crate::error::{Error, Result};
use crate::query::{QueryShape, Value};

use super::rows::{RowSet, Ticket};

/// Statements kept by the driver's statement cache.
const STATEMENT_CACHE_CAPACITY: usize = 16;

/// An open rusqlite connection.
pub struct DriverConnection {
    conn: Connection,
}

impl DriverConnection {
    /// Open an existing database file read-write.
    ///
    /// A missing file is an error rather than a fresh empty database.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(|e| {
            Error::Connection(format!("failed to open {}: {}", path.display(), e))
        })?;

        conn.busy_timeout(busy_timeout)
            .map_err(|e| Error::Connection(e.to_string()))?;
        conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);

        // Opening is lazy; touch the header so a non-database file fails here.
        conn.query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0))
            .map_err(|e| {
                Error::Connection(format!("failed to read {}: {}", path.display(), e))
            })?;

        Ok(Self { conn })
    }

    /// Wrap an already open connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Access the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Prepare, execute and discard a statement.
    pub fn query(&self, sql: &str, args: &[Value], shape: QueryShape) -> rusqlite::Result<RowSet> {
        let mut stmt = self.conn.prepare(sql)?;
        collect_rows(&mut stmt, args, shape)
    }

    /// Execute through the statement cache, preparing only on a miss.
    pub fn query_cached(
        &self,
        sql: &str,
        args: &[Value],
        shape: QueryShape,
    ) -> rusqlite::Result<RowSet> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        collect_rows(&mut stmt, args, shape)
    }

    /// Compile a statement into the cache without executing it.
    pub fn prepare_cached(&self, sql: &str) -> rusqlite::Result<()> {
        self.conn.prepare_cached(sql).map(drop)
    }

    /// Close the connection, reporting any error the driver raises.
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| Error::Connection(format!("failed to close connection: {}", e)))
    }
}

/// Scan every row of a statement into a [`RowSet`].
fn collect_rows(stmt: &mut Statement<'_>, args: &[Value], shape: QueryShape) -> rusqlite::Result<RowSet> {
    let params = rusqlite::params_from_iter(args.iter());
    match shape {
        QueryShape::Tickets => stmt
            .query_map(params, |row| {
                Ok(Ticket {
                    id: row.get(0)?,
                    subject: row.get(1)?,
                    state: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map(RowSet::Tickets),
        QueryShape::Ids => stmt
            .query_map(params, |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map(RowSet::Ids),
    }
}
