//! sea-query adapter ("library B" and the builder-only strategy).
//!
//! Statements are built with sea-query's SQLite backend, either with the
//! predicate values bound or with every value inlined. LIMIT is always
//! rendered inline so the argument list holds only the predicate values.

use sea_query::{Alias, Cond, Expr, Order, Query, SelectStatement, SqliteQueryBuilder};

use crate::error::{Error, Result};
use crate::query::{QueryShape, Value, MATCHED_STATES, SUBDOMAIN_ID};

/// SQL text plus its bound arguments, as produced by a builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub sql: String,
    pub args: Vec<Value>,
}

/// Build the benchmark query for a shape and limit.
pub fn select(shape: QueryShape, limit: u64) -> Result<BuiltQuery> {
    let (sql, values) = statement(shape).build(SqliteQueryBuilder);

    Ok(BuiltQuery {
        sql: format!("{} LIMIT {}", sql, limit),
        args: convert_values(values)?,
    })
}

/// Build the benchmark query with every value written into the SQL text.
pub fn select_inline(shape: QueryShape, limit: u64) -> String {
    format!("{} LIMIT {}", statement(shape).to_string(SqliteQueryBuilder), limit)
}

fn statement(shape: QueryShape) -> SelectStatement {
    let mut select = Query::select();

    match shape {
        QueryShape::Tickets => {
            select.columns([Alias::new("id"), Alias::new("subject"), Alias::new("state")]);
        }
        QueryShape::Ids => {
            select.column(Alias::new("id"));
        }
    }

    let mut cond = Cond::all().add(Expr::col(Alias::new("subdomain_id")).eq(SUBDOMAIN_ID));
    if shape == QueryShape::Tickets {
        cond = cond.add(
            Cond::any()
                .add(Expr::col(Alias::new("state")).eq(MATCHED_STATES[0]))
                .add(Expr::col(Alias::new("state")).eq(MATCHED_STATES[1])),
        );
    }

    select.from(Alias::new("tickets")).cond_where(cond);
    select
}

/// Build a statement exercising most of the builder surface.
///
/// Never executed; it measures construction cost only.
pub fn complex_select() -> Result<BuiltQuery> {
    let (sql, values) = Query::select()
        .columns([
            Alias::new("a"),
            Alias::new("b"),
            Alias::new("z"),
            Alias::new("y"),
            Alias::new("x"),
        ])
        .distinct()
        .from(Alias::new("c"))
        .cond_where(
            Cond::all()
                .add(
                    Cond::any()
                        .add(Expr::col(Alias::new("d")).eq(1))
                        .add(Expr::col(Alias::new("e")).eq("wat")),
                )
                .add(Expr::col(Alias::new("f")).eq(2))
                .add(Expr::col(Alias::new("x")).eq("hi"))
                .add(Expr::col(Alias::new("g")).eq(3))
                .add(Expr::col(Alias::new("h")).is_in([1, 2, 3])),
        )
        .group_by_columns([Alias::new("i"), Alias::new("ii"), Alias::new("iii")])
        .and_having(Expr::cust("j = k"))
        .and_having(Expr::col(Alias::new("jj")).eq(1))
        .and_having(Expr::col(Alias::new("jjj")).eq(2))
        .order_by(Alias::new("l"), Order::Asc)
        .order_by(Alias::new("l"), Order::Asc)
        .order_by(Alias::new("l"), Order::Asc)
        .limit(7)
        .offset(8)
        .build(SqliteQueryBuilder);

    Ok(BuiltQuery {
        sql,
        args: convert_values(values)?,
    })
}

fn convert_values(values: sea_query::Values) -> Result<Vec<Value>> {
    values.0.into_iter().map(convert_value).collect()
}

fn convert_value(value: sea_query::Value) -> Result<Value> {
    use sea_query::Value as Sea;

    let int = |v: Option<i64>| v.map(Value::Int);
    let converted = match value {
        Sea::TinyInt(v) => int(v.map(i64::from)),
        Sea::SmallInt(v) => int(v.map(i64::from)),
        Sea::Int(v) => int(v.map(i64::from)),
        Sea::BigInt(v) => int(v),
        Sea::TinyUnsigned(v) => int(v.map(i64::from)),
        Sea::SmallUnsigned(v) => int(v.map(i64::from)),
        Sea::Unsigned(v) => int(v.map(i64::from)),
        Sea::BigUnsigned(v) => int(v.and_then(|v| i64::try_from(v).ok())),
        Sea::String(v) => v.map(|s| Value::Text(*s)),
        other => {
            return Err(Error::Execution(format!(
                "unsupported builder value {:?}",
                other
            )))
        }
    };

    converted.ok_or_else(|| Error::Execution("NULL or out-of-range builder value".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_select_args() {
        let built = select(QueryShape::Tickets, 10_000).unwrap();
        assert_eq!(
            built.args,
            vec![
                Value::Int(1),
                Value::Text("open".into()),
                Value::Text("spam".into())
            ]
        );
        assert_eq!(built.sql.matches('?').count(), 3);
        assert!(built.sql.starts_with("SELECT"));
        assert!(built.sql.contains("\"tickets\""));
        assert!(built.sql.ends_with(" LIMIT 10000"));
    }

    #[test]
    fn test_ids_select() {
        let built = select(QueryShape::Ids, 1).unwrap();
        assert_eq!(built.args, vec![Value::Int(1)]);
        assert!(!built.sql.contains("\"state\""));
        assert!(built.sql.ends_with(" LIMIT 1"));
    }

    #[test]
    fn test_inline_select_has_no_placeholders() {
        let sql = select_inline(QueryShape::Tickets, 100);
        assert!(!sql.contains('?'));
        assert!(sql.contains("'open'"));
        assert!(sql.contains("'spam'"));
        assert!(sql.ends_with(" LIMIT 100"));

        assert!(!select_inline(QueryShape::Ids, 1).contains("state"));
    }

    #[test]
    fn test_builder_is_deterministic() {
        assert_eq!(
            select(QueryShape::Tickets, 100).unwrap(),
            select(QueryShape::Tickets, 100).unwrap()
        );
    }

    #[test]
    fn test_complex_select() {
        let built = complex_select().unwrap();
        assert!(built.sql.starts_with("SELECT DISTINCT"));
        assert!(built.sql.contains("GROUP BY"));
        assert!(built.sql.contains("HAVING"));
        assert!(built.sql.contains("ORDER BY"));
        // d, e, f, x, g, h (3), jj, jjj, limit, offset
        assert_eq!(built.args.len(), 12);
        assert_eq!(built.sql.matches('?').count(), built.args.len());
    }
}
