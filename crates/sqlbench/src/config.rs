//! Harness configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default connection string: `tickets.db` in the working directory.
pub const DEFAULT_DSN: &str = "bench@file(.)/tickets";

/// Default number of timed iterations per scenario.
pub const DEFAULT_ITERATIONS: u64 = 1000;

/// Default number of untimed warmup iterations per scenario.
pub const DEFAULT_WARMUP: u64 = 10;

/// Default result-set limits.
pub const DEFAULT_LIMITS: [u64; 4] = [1, 100, 1000, 10_000];

/// Default consecutive failures tolerated before a scenario stops early.
pub const DEFAULT_MAX_CONSECUTIVE_ERRORS: u32 = 5;

/// Default SQLite busy timeout.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Kind of handle a strategy needs from the connection provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverKind {
    /// Plain driver connection, statements prepared per call.
    RawQuery,
    /// Driver connection with a statement cache.
    PreparedStatement,
    /// sqlx connection.
    LibraryA,
    /// Driver connection fed by sea-query statements.
    LibraryB,
    /// No database handle at all.
    QueryBuilder,
}

/// How a database is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Local database file, `<address>/<database>.db`.
    File,
    /// Any transport the harness cannot open.
    Unsupported(String),
}

impl Transport {
    fn as_str(&self) -> &str {
        match self {
            Transport::File => "file",
            Transport::Unsupported(name) => name,
        }
    }
}

/// Parsed `<user>@<transport>(<address>)/<database>` connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dsn {
    pub user: String,
    pub transport: Transport,
    pub address: String,
    pub database: String,
}

impl Dsn {
    /// Parse a connection string.
    pub fn parse(dsn: &str) -> Result<Self> {
        dsn.parse()
    }

    /// Path of the database file for the `file` transport.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.transport {
            Transport::File => {
                let dir = if self.address.is_empty() { "." } else { &self.address };
                Ok(PathBuf::from(dir).join(format!("{}.db", self.database)))
            }
            Transport::Unsupported(name) => Err(Error::Connection(format!(
                "unsupported transport `{}` in `{}`",
                name, self
            ))),
        }
    }
}

impl FromStr for Dsn {
    type Err = Error;

    fn from_str(dsn: &str) -> Result<Self> {
        let malformed = |reason: &str| Error::Connection(format!("malformed DSN `{}`: {}", dsn, reason));

        let (user, rest) = dsn
            .split_once('@')
            .ok_or_else(|| malformed("expected `<user>@<transport>(<address>)/<database>`"))?;

        let open = rest
            .find('(')
            .ok_or_else(|| malformed("missing `(` after transport"))?;
        let transport = &rest[..open];
        if transport.is_empty() || !transport.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(malformed("transport must be a non-empty alphanumeric name"));
        }

        // Addresses may contain '/', so split on the last ")/".
        let close = rest
            .rfind(")/")
            .filter(|&close| close > open)
            .ok_or_else(|| malformed("missing `)/` before database name"))?;
        let address = &rest[open + 1..close];
        let database = &rest[close + 2..];
        if database.is_empty() || database.contains('/') {
            return Err(malformed("database name must be non-empty and contain no `/`"));
        }

        let transport = match transport {
            "file" => Transport::File,
            other => Transport::Unsupported(other.to_string()),
        };

        Ok(Self {
            user: user.to_string(),
            transport,
            address: address.to_string(),
            database: database.to_string(),
        })
    }
}

impl fmt::Display for Dsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}({})/{}",
            self.user,
            self.transport.as_str(),
            self.address,
            self.database
        )
    }
}

/// What the connection provider needs to open a handle.
///
/// Immutable once constructed.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    dsn: String,
    driver_kind: DriverKind,
    busy_timeout: Duration,
}

impl ConnectionConfig {
    /// Create a configuration for the given DSN and driver kind.
    pub fn new(dsn: impl Into<String>, driver_kind: DriverKind) -> Self {
        Self {
            dsn: dsn.into(),
            driver_kind,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Set the busy timeout applied to driver connections.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    pub fn driver_kind(&self) -> DriverKind {
        self.driver_kind
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }
}

/// Whether a scenario keeps one connection or reopens it every iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionMode {
    /// One connection for warmup and all timed iterations.
    #[default]
    Reuse,
    /// Open, prepare, execute and close inside every timed iteration.
    ReopenPerIteration,
}

/// Runner configuration shared by every scenario of a run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Timed iterations per scenario.
    pub iterations: u64,

    /// Untimed warmup iterations per scenario.
    pub warmup: u64,

    /// Consecutive failures tolerated before stopping early.
    pub max_consecutive_errors: u32,

    /// Connection handling inside a scenario.
    pub connection_mode: ConnectionMode,

    /// Busy timeout for driver connections.
    pub busy_timeout: Duration,
}

impl RunConfig {
    /// Create a configuration with the given iteration and warmup counts.
    pub fn new(iterations: u64, warmup: u64) -> Self {
        Self {
            iterations,
            warmup,
            ..Self::default()
        }
    }

    /// Set the consecutive-error threshold.
    pub fn with_max_consecutive_errors(mut self, max: u32) -> Self {
        self.max_consecutive_errors = max;
        self
    }

    /// Set the connection mode.
    pub fn with_connection_mode(mut self, mode: ConnectionMode) -> Self {
        self.connection_mode = mode;
        self
    }

    /// Set the busy timeout.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            warmup: DEFAULT_WARMUP,
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
            connection_mode: ConnectionMode::Reuse,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}
