/// Errors raised while talking to the database or decoding what it returned.
#[derive(Debug, thiserror::Error)]
pub enum SqlError {
    #[error("sqlx: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("sea_query: {0}")]
    Query(#[from] sea_query::error::Error),

    /// The row has no column with this name.
    #[error("column `{0}` not found in row")]
    MissingColumn(String),

    /// The column holds a value of another type than the one requested.
    #[error("column `{column}`: expected {expected}, found {found}")]
    Decode {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The table or the column does not exist in the target database.
    #[error("table `{table}` has no column `{column}`")]
    NoSuchColumn { table: String, column: String },

    /// SQLite cannot alter the column in place and the table rebuild is not safe.
    #[error("cannot rebuild table `{table}`: {reason}")]
    Rebuild { table: String, reason: String },

    #[error("a column default filled in batches cannot be null")]
    NullDefault,

    #[error("batch size must be greater than zero")]
    InvalidBatchSize,
}

pub type Result<T> = std::result::Result<T, SqlError>;
