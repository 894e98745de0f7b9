//! The connection boundary.
//!
//! An [`Executor`] runs a [`CompiledStatement`] and hands back a
//! [`RowCursor`]: the ordered column header plus a forward-only sequence of
//! rows. The query engine never retries and never inspects dialect-specific
//! errors; it surfaces whatever the executor reports.

mod config;
mod instrumented;
#[cfg(feature = "postgres")]
mod postgres;

pub use config::ExecutorConfig;
pub use instrumented::InstrumentedExecutor;

use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::query::CompiledStatement;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// One row of a result: values in header order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl RawRow {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value of a header column (`inv_id`, `join_1.inv_id`).
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

type RowIter = Box<dyn Iterator<Item = OrmResult<Vec<Value>>> + Send>;

/// Forward-only rows plus their column header.
pub struct RowCursor {
    columns: Arc<[String]>,
    rows: RowIter,
}

impl RowCursor {
    pub fn new<I>(columns: impl Into<Arc<[String]>>, rows: I) -> Self
    where
        I: IntoIterator<Item = OrmResult<Vec<Value>>>,
        I::IntoIter: Send + 'static,
    {
        Self {
            columns: columns.into(),
            rows: Box::new(rows.into_iter()),
        }
    }

    /// Cursor over rows that are already decoded.
    pub fn from_rows(columns: impl Into<Arc<[String]>>, rows: Vec<Vec<Value>>) -> Self {
        Self::new(columns, rows.into_iter().map(Ok))
    }

    /// Cursor with a header and no rows.
    pub fn empty(columns: impl Into<Arc<[String]>>) -> Self {
        Self::from_rows(columns, Vec::new())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn header(&self) -> Arc<[String]> {
        Arc::clone(&self.columns)
    }
}

impl Iterator for RowCursor {
    type Item = OrmResult<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let values = self.rows.next()?;
        Some(values.map(|values| RawRow::new(Arc::clone(&self.columns), values)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl fmt::Debug for RowCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowCursor")
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

/// Runs compiled statements.
///
/// Implementations decide the dialect the engine compiles for. Errors must
/// already be sorted into [`OrmError::Connection`](crate::OrmError::Connection),
/// [`OrmError::Syntax`](crate::OrmError::Syntax) or
/// [`OrmError::Database`](crate::OrmError::Database).
pub trait Executor: Send + Sync {
    fn dialect(&self) -> &dyn Dialect;

    /// Run `stmt` and return its rows.
    fn fetch(
        &self,
        stmt: &CompiledStatement,
    ) -> impl std::future::Future<Output = OrmResult<RowCursor>> + Send;
}

impl<X: Executor> Executor for &X {
    fn dialect(&self) -> &dyn Dialect {
        (**self).dialect()
    }

    fn fetch(
        &self,
        stmt: &CompiledStatement,
    ) -> impl std::future::Future<Output = OrmResult<RowCursor>> + Send {
        (**self).fetch(stmt)
    }
}

impl<X: Executor> Executor for Arc<X> {
    fn dialect(&self) -> &dyn Dialect {
        (**self).dialect()
    }

    fn fetch(
        &self,
        stmt: &CompiledStatement,
    ) -> impl std::future::Future<Output = OrmResult<RowCursor>> + Send {
        (**self).fetch(stmt)
    }
}
