//! Adapters over the data-access libraries under test.
//!
//! Each adapter exposes the same capability shapes (raw query, select into
//! structs, build without executing) so strategies stay thin.

pub mod builder;
pub mod driver;
pub mod sqlx_sqlite;

pub use builder::BuiltQuery;
pub use driver::DriverConnection;
pub use sqlx_sqlite::SqlxConnection;

/// Common row types returned by every adapter.
pub mod rows {
    /// Ticket row for the `tickets` query shape.
    #[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
    pub struct Ticket {
        pub id: i64,
        pub subject: String,
        pub state: String,
    }

    /// Rows scanned from one execution.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RowSet {
        Tickets(Vec<Ticket>),
        Ids(Vec<i64>),
    }

    impl RowSet {
        pub fn len(&self) -> usize {
            match self {
                RowSet::Tickets(rows) => rows.len(),
                RowSet::Ids(rows) => rows.len(),
            }
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }
}
