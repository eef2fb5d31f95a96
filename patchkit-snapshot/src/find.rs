use std::marker::PhantomData;

use patchkit_sql::{Backend, Value};
use sea_query::{Alias, Asterisk, Cond, Expr, Func, IntoCondition, Order, Query, SelectStatement};

use crate::error::{Result, SnapshotError};
use crate::session::{select_columns, Session};
use crate::snapshot::{Loaded, Snapshot};

fn value(value: impl Into<Value>) -> sea_query::Value {
    let value: Value = value.into();
    value.into()
}

/// Query over the rows of a snapshot, built by [`Session::find`].
///
/// ```no_run
/// # use patchkit_snapshot::{snapshot, v1::V1, Session};
/// # snapshot! { pub struct CityLocation: V1 => "city_location" { pub city: String } }
/// # async fn run(session: &mut Session<sqlx::Sqlite>) -> patchkit_snapshot::Result<()> {
/// let cities = session
///     .find::<CityLocation>()
///     .eq("state", "SP")
///     .order_by("id")
///     .all()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct Find<'s, DB: Backend, T: Snapshot> {
    session: &'s mut Session<DB>,
    condition: Cond,
    order: Vec<(String, Order)>,
    limit: Option<u64>,
    snapshot: PhantomData<fn() -> T>,
}

impl<'s, DB: Backend, T: Snapshot> Find<'s, DB, T> {
    pub(crate) fn new(session: &'s mut Session<DB>) -> Self {
        Self {
            session,
            condition: Cond::all(),
            order: Vec::new(),
            limit: None,
            snapshot: PhantomData,
        }
    }

    pub fn eq(self, column: &str, v: impl Into<Value>) -> Self {
        let expr = Expr::col(Alias::new(column)).eq(value(v));

        self.filter(expr)
    }

    pub fn ne(self, column: &str, v: impl Into<Value>) -> Self {
        let expr = Expr::col(Alias::new(column)).ne(value(v));

        self.filter(expr)
    }

    pub fn is_null(self, column: &str) -> Self {
        let expr = Expr::col(Alias::new(column)).is_null();

        self.filter(expr)
    }

    pub fn not_null(self, column: &str) -> Self {
        let expr = Expr::col(Alias::new(column)).is_not_null();

        self.filter(expr)
    }

    /// Adds an arbitrary condition, combined with the others by `AND`.
    pub fn filter(mut self, condition: impl IntoCondition) -> Self {
        self.condition = self.condition.add(condition.into_condition());
        self
    }

    pub fn order_by(mut self, column: &str) -> Self {
        self.order.push((column.to_owned(), Order::Asc));
        self
    }

    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.order.push((column.to_owned(), Order::Desc));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    fn statement(&self, limit: Option<u64>) -> SelectStatement {
        let mut statement = Query::select();
        statement
            .columns(select_columns::<T>().into_iter().map(Alias::new))
            .from(Alias::new(T::TABLE))
            .cond_where(self.condition.clone());

        for (column, order) in &self.order {
            statement.order_by(Alias::new(column), order.clone());
        }

        if let Some(limit) = limit {
            statement.limit(limit);
        }

        statement
    }

    async fn load(self, limit: Option<u64>) -> Result<Vec<Loaded<T>>> {
        self.session.check::<T>()?;

        let statement = self.statement(limit);
        let records = self.session.fetch_all(&statement).await?;

        records
            .iter()
            .map(|record| self.session.track::<T>(record))
            .collect()
    }

    pub async fn all(self) -> Result<Vec<Loaded<T>>> {
        let limit = self.limit;

        self.load(limit).await
    }

    /// The only matching row, an error when there is none or more than one.
    pub async fn one(self) -> Result<Loaded<T>> {
        let mut rows = self.load(Some(2)).await?;

        match rows.len() {
            0 => Err(SnapshotError::NotFound {
                table: T::TABLE,
                key: None,
            }),
            1 => Ok(rows.remove(0)),
            _ => Err(SnapshotError::MultipleRows { table: T::TABLE }),
        }
    }

    pub async fn first(self) -> Result<Option<Loaded<T>>> {
        Ok(self.load(Some(1)).await?.into_iter().next())
    }

    pub async fn count(self) -> Result<u64> {
        self.session.check::<T>()?;

        let statement = Query::select()
            .expr(Func::count(Expr::col(Asterisk)))
            .from(Alias::new(T::TABLE))
            .cond_where(self.condition.clone())
            .to_owned();

        let count = match self.session.fetch_optional(&statement).await? {
            Some(record) => record.first::<i64>()?,
            None => 0,
        };

        Ok(count.max(0) as u64)
    }
}
