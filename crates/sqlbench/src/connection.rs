//! Connection provider.
//!
//! A [`Connection`] is owned by the scope that opened it and released when
//! dropped; [`Connection::close`] surfaces close errors explicitly.

use crate::backends::{DriverConnection, SqlxConnection};
use crate::config::{ConnectionConfig, DriverKind, Dsn};
use crate::error::Result;

/// An open handle of the kind a strategy asked for.
pub enum Connection {
    /// rusqlite connection.
    Driver(DriverConnection),
    /// sqlx connection.
    Sqlx(SqlxConnection),
    /// No database behind it; the builder-only strategy needs none.
    Detached,
}

impl Connection {
    /// Short name of the handle kind, for logs and errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Connection::Driver(_) => "driver",
            Connection::Sqlx(_) => "sqlx",
            Connection::Detached => "detached",
        }
    }

    /// Release the handle.
    pub fn close(self) -> Result<()> {
        match self {
            Connection::Driver(conn) => conn.close(),
            Connection::Sqlx(conn) => conn.close(),
            Connection::Detached => Ok(()),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Connection").field(&self.kind_name()).finish()
    }
}

/// Open a handle for the configured driver kind.
///
/// The DSN is validated for every kind, including the builder-only one.
pub fn open(config: &ConnectionConfig) -> Result<Connection> {
    let dsn = Dsn::parse(config.dsn())?;

    if config.driver_kind() == DriverKind::QueryBuilder {
        return Ok(Connection::Detached);
    }

    let path = dsn.database_path()?;
    tracing::debug!(
        database = %path.display(),
        driver = ?config.driver_kind(),
        "opening connection"
    );

    match config.driver_kind() {
        DriverKind::RawQuery | DriverKind::PreparedStatement | DriverKind::LibraryB => {
            DriverConnection::open(&path, config.busy_timeout()).map(Connection::Driver)
        }
        DriverKind::LibraryA => {
            SqlxConnection::open(&path, config.busy_timeout()).map(Connection::Sqlx)
        }
        DriverKind::QueryBuilder => Ok(Connection::Detached),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::fixtures;

    #[test]
    fn test_malformed_dsn_fails_for_every_kind() {
        for kind in [
            DriverKind::RawQuery,
            DriverKind::PreparedStatement,
            DriverKind::LibraryA,
            DriverKind::LibraryB,
            DriverKind::QueryBuilder,
        ] {
            let result = open(&ConnectionConfig::new("definitely-not-a-dsn", kind));
            assert!(matches!(result, Err(Error::Connection(_))), "{:?}", kind);
        }
    }

    #[test]
    fn test_builder_gets_detached_handle() {
        let conn = open(&ConnectionConfig::new(
            "bench@file(/nonexistent)/tickets",
            DriverKind::QueryBuilder,
        ))
        .unwrap();
        assert!(matches!(conn, Connection::Detached));
        conn.close().unwrap();
    }

    #[test]
    fn test_unsupported_transport() {
        let result = open(&ConnectionConfig::new(
            "root@tcp(127.0.0.1:3306)/bench",
            DriverKind::RawQuery,
        ));
        assert!(matches!(result, Err(Error::Connection(_))));
    }

    #[test]
    fn test_open_each_kind() {
        let dir = tempfile::tempdir().unwrap();
        fixtures::create_database(&dir.path().join("tickets.db")).unwrap();
        let dsn = format!("bench@file({})/tickets", dir.path().display());

        let driver = open(&ConnectionConfig::new(&dsn, DriverKind::RawQuery)).unwrap();
        assert_eq!(driver.kind_name(), "driver");
        driver.close().unwrap();

        let sqlx = open(&ConnectionConfig::new(&dsn, DriverKind::LibraryA)).unwrap();
        assert_eq!(sqlx.kind_name(), "sqlx");
        sqlx.close().unwrap();
    }
}
