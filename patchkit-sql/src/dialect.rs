use sea_query::{PostgresQueryBuilder, SchemaStatementBuilder, SqliteQueryBuilder};
use sea_query_binder::{SqlxBinder, SqlxValues};

use crate::value::Value;

/// SQL flavour spoken by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Renders a query statement with bound parameters.
    pub fn build<S: SqlxBinder>(self, statement: &S) -> (String, SqlxValues) {
        match self {
            Dialect::Postgres => statement.build_sqlx(PostgresQueryBuilder),
            Dialect::Sqlite => statement.build_sqlx(SqliteQueryBuilder),
        }
    }

    /// Renders a DDL statement.
    pub fn schema<S: SchemaStatementBuilder>(self, statement: &S) -> String {
        match self {
            Dialect::Postgres => statement.to_string(PostgresQueryBuilder),
            Dialect::Sqlite => statement.to_string(SqliteQueryBuilder),
        }
    }

    /// Renders a value as an inline SQL literal, for use in DDL such as
    /// `DEFAULT` clauses where parameters cannot be bound.
    pub fn literal(self, value: &Value) -> String {
        match value {
            Value::Null(_) => "NULL".to_owned(),
            Value::Bool(v) => match (self, v) {
                (Dialect::Postgres, true) => "TRUE".to_owned(),
                (Dialect::Postgres, false) => "FALSE".to_owned(),
                (Dialect::Sqlite, true) => "1".to_owned(),
                (Dialect::Sqlite, false) => "0".to_owned(),
            },
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Text(v) => quote_literal(v),
            Value::Uuid(v) => match self {
                Dialect::Postgres => format!("'{v}'::uuid"),
                Dialect::Sqlite => format!("X'{}'", hex(v.as_bytes())),
            },
            Value::Timestamp(v) => quote_literal(&v.to_rfc3339()),
            Value::Bytes(v) => match self {
                Dialect::Postgres => format!("'\\x{}'::bytea", hex(v)),
                Dialect::Sqlite => format!("X'{}'", hex(v)),
            },
        }
    }
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Double-quotes an identifier, escaping embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
