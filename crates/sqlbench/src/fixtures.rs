//! Test data generation for benchmarks.
//!
//! This module provides the `tickets` schema and consistent data generators
//! for benchmark reproducibility.

use std::path::Path;

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::{params, Connection, OpenFlags};

use crate::config::Dsn;
use crate::error::{Error, Result};

/// Schema of the benchmarked table.
pub const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS tickets (
        id INTEGER PRIMARY KEY,
        subdomain_id INTEGER NOT NULL,
        subject TEXT NOT NULL,
        state TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_tickets_subdomain_state ON tickets(subdomain_id, state);
"#;

/// Ticket row as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketData {
    pub id: i64,
    pub subdomain_id: i64,
    pub subject: String,
    pub state: String,
}

impl TicketData {
    pub fn new(id: i64, subdomain_id: i64, subject: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            id,
            subdomain_id,
            subject: subject.into(),
            state: state.into(),
        }
    }
}

/// Generate tickets spread over three subdomains and five states.
pub fn generate_tickets(count: usize) -> Vec<TicketData> {
    const SEED: u64 = 12345;
    let mut rng = StdRng::seed_from_u64(SEED);

    let states = ["open", "spam", "pending", "solved", "closed"];

    (0..count)
        .map(|i| {
            let subdomain_id = 1 + (i % 3) as i64;
            let state = states[rng.gen_range(0..states.len())];
            let suffix: String = (0..12).map(|_| rng.sample(Alphanumeric) as char).collect();
            TicketData::new(
                i as i64 + 1,
                subdomain_id,
                format!("Ticket {} {}", i + 1, suffix),
                state,
            )
        })
        .collect()
}

/// Open a database file, creating it if it does not exist.
pub fn create_database(path: &Path) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    Connection::open_with_flags(path, flags)
        .map_err(|e| Error::Connection(format!("failed to create {}: {}", path.display(), e)))
}

/// Create the `tickets` table and its index.
pub fn setup_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .map_err(|e| Error::Execution(format!("failed to create schema: {}", e)))
}

/// Insert tickets in a single transaction.
pub fn populate(conn: &Connection, tickets: &[TicketData]) -> Result<()> {
    let insert = || -> rusqlite::Result<()> {
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO tickets (id, subdomain_id, subject, state) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for ticket in tickets {
                stmt.execute(params![
                    ticket.id,
                    ticket.subdomain_id,
                    &ticket.subject,
                    &ticket.state
                ])?;
            }
        }
        tx.commit()
    };

    insert().map_err(|e| Error::Execution(format!("failed to populate tickets: {}", e)))
}

/// Recreate the `tickets` table behind a DSN and fill it with generated rows.
///
/// Returns the open seeding connection.
pub fn seed(dsn: &str, rows: usize) -> Result<Connection> {
    let path = Dsn::parse(dsn)?.database_path()?;
    let conn = create_database(&path)?;

    conn.execute_batch("DROP TABLE IF EXISTS tickets;")
        .map_err(|e| Error::Execution(format!("failed to drop tickets: {}", e)))?;
    setup_schema(&conn)?;
    populate(&conn, &generate_tickets(rows))?;

    tracing::info!(database = %path.display(), rows, "seeded tickets");
    Ok(conn)
}
