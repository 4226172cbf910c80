//! Canonical query catalogue.
//!
//! Every strategy draws its SQL from here so that all of them express the
//! same logical query for a given shape and limit.

use std::fmt;

use rusqlite::types::{ToSqlOutput, ValueRef};
use serde::Serialize;

/// Subdomain every benchmark query filters on.
pub const SUBDOMAIN_ID: i64 = 1;

/// Ticket states matched by the [`QueryShape::Tickets`] predicate.
pub const MATCHED_STATES: [&str; 2] = ["open", "spam"];

/// Largest limit every strategy can express; SQLite integers are `i64`.
pub const MAX_LIMIT: u64 = i64::MAX as u64;

/// A bound query argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Text(String),
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl rusqlite::ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Value::Int(v) => Ok(ToSqlOutput::Owned(rusqlite::types::Value::Integer(*v))),
            Value::Text(s) => Ok(ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes()))),
        }
    }
}

/// The logical queries the harness benchmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryShape {
    /// `id, subject, state` of open or spam tickets in the subdomain.
    Tickets,
    /// `id` of every ticket in the subdomain.
    Ids,
}

impl QueryShape {
    pub const ALL: [QueryShape; 2] = [QueryShape::Tickets, QueryShape::Ids];

    pub fn name(&self) -> &'static str {
        match self {
            QueryShape::Tickets => "tickets",
            QueryShape::Ids => "ids",
        }
    }

    /// SQL with every value inlined.
    pub fn literal_sql(&self, limit: u64) -> String {
        match self {
            QueryShape::Tickets => format!(
                "SELECT id, subject, state FROM tickets WHERE subdomain_id = {} AND (state = '{}' OR state = '{}') LIMIT {}",
                SUBDOMAIN_ID, MATCHED_STATES[0], MATCHED_STATES[1], limit
            ),
            QueryShape::Ids => format!(
                "SELECT id FROM tickets WHERE subdomain_id = {} LIMIT {}",
                SUBDOMAIN_ID, limit
            ),
        }
    }

    /// SQL with `?` placeholders, bound with [`QueryShape::args`].
    pub fn parameterized_sql(&self) -> &'static str {
        match self {
            QueryShape::Tickets => {
                "SELECT id, subject, state FROM tickets WHERE subdomain_id = ? AND (state = ? OR state = ?) LIMIT ?"
            }
            QueryShape::Ids => "SELECT id FROM tickets WHERE subdomain_id = ? LIMIT ?",
        }
    }

    /// Arguments for [`QueryShape::parameterized_sql`].
    pub fn args(&self, limit: u64) -> Vec<Value> {
        let limit = Value::Int(i64::try_from(limit).unwrap_or(i64::MAX));
        match self {
            QueryShape::Tickets => vec![
                SUBDOMAIN_ID.into(),
                MATCHED_STATES[0].into(),
                MATCHED_STATES[1].into(),
                limit,
            ],
            QueryShape::Ids => vec![SUBDOMAIN_ID.into(), limit],
        }
    }
}

impl fmt::Display for QueryShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for QueryShape {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        QueryShape::ALL
            .into_iter()
            .find(|shape| shape.name() == s)
            .ok_or_else(|| crate::Error::Config(format!("unknown query shape `{}`", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_sql() {
        assert_eq!(
            QueryShape::Tickets.literal_sql(100),
            "SELECT id, subject, state FROM tickets WHERE subdomain_id = 1 AND (state = 'open' OR state = 'spam') LIMIT 100"
        );
        assert_eq!(
            QueryShape::Ids.literal_sql(1),
            "SELECT id FROM tickets WHERE subdomain_id = 1 LIMIT 1"
        );
    }

    #[test]
    fn test_placeholders_match_args() {
        for shape in QueryShape::ALL {
            let placeholders = shape.parameterized_sql().matches('?').count();
            assert_eq!(placeholders, shape.args(10).len(), "{}", shape);
        }
    }

    #[test]
    fn test_ticket_args() {
        assert_eq!(
            QueryShape::Tickets.args(1000),
            vec![
                Value::Int(1),
                Value::Text("open".into()),
                Value::Text("spam".into()),
                Value::Int(1000)
            ]
        );
    }

    #[test]
    fn test_shape_from_str() {
        assert_eq!("ids".parse::<QueryShape>().unwrap(), QueryShape::Ids);
        assert!("everything".parse::<QueryShape>().is_err());
    }
}
