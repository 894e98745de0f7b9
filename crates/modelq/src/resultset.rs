//! Query results.
//!
//! [`Resultset::load`] hydrates every row before returning, so a decode
//! failure never yields a partial result. That is what query execution uses.
//!
//! [`Resultset::open`] keeps the cursor unbuffered instead. The first call
//! that needs random access (`count`, `to_array`, `iter`, `get`) drains the
//! cursor through the hydrator exactly once, and `into_iter` streams entities
//! one row at a time.

use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::executor::RowCursor;
use crate::hydrate::Hydrator;
use crate::query::AliasMap;
use std::fmt;
use std::sync::Arc;

enum State<E> {
    Unbuffered(RowCursor),
    Buffered(Vec<E>),
    Failed(String),
}

/// Entities produced by one query execution.
pub struct Resultset<E: Entity> {
    columns: Arc<[String]>,
    hydrator: Hydrator<E>,
    state: State<E>,
}

impl<E: Entity> Resultset<E> {
    /// Plan hydration for `cursor` and wrap it, failing with
    /// [`OrmError::UnresolvedRelation`] before any row is read.
    pub fn open(cursor: RowCursor, aliases: &AliasMap) -> OrmResult<Self> {
        let hydrator = Hydrator::plan(cursor.columns(), aliases)?;
        Ok(Self {
            columns: cursor.header(),
            hydrator,
            state: State::Unbuffered(cursor),
        })
    }

    /// Plan and hydrate every row of `cursor`.
    ///
    /// Any relation or decode error is returned here and no resultset is
    /// produced.
    pub fn load(cursor: RowCursor, aliases: &AliasMap) -> OrmResult<Self> {
        let mut resultset = Self::open(cursor, aliases)?;
        resultset.buffer()?;
        Ok(resultset)
    }

    fn buffer(&mut self) -> OrmResult<&Vec<E>> {
        let state = std::mem::replace(&mut self.state, State::Failed(String::new()));
        self.state = match state {
            State::Unbuffered(cursor) => {
                let hydrated = cursor
                    .map(|row| row.and_then(|row| self.hydrator.hydrate(&row)))
                    .collect::<OrmResult<Vec<E>>>();
                match hydrated {
                    Ok(entities) => {
                        tracing::trace!(
                            target: "modelq.hydrate",
                            entity = E::NAME,
                            rows = entities.len(),
                            "resultset buffered"
                        );
                        State::Buffered(entities)
                    }
                    Err(err) => {
                        self.state = State::Failed(err.to_string());
                        return Err(err);
                    }
                }
            }
            terminal => terminal,
        };
        match &self.state {
            State::Buffered(entities) => Ok(entities),
            State::Failed(message) => Err(OrmError::ResultsetFailed(message.clone())),
            State::Unbuffered(_) => Err(OrmError::ResultsetFailed("cursor not drained".into())),
        }
    }

    /// Number of entities. Buffers on first call.
    pub fn count(&mut self) -> OrmResult<usize> {
        self.buffer().map(Vec::len)
    }

    /// All entities in row order. Idempotent; never re-executes.
    pub fn to_array(&mut self) -> OrmResult<&[E]> {
        self.buffer().map(Vec::as_slice)
    }

    /// Restartable iteration over the buffered entities.
    pub fn iter(&mut self) -> OrmResult<std::slice::Iter<'_, E>> {
        self.buffer().map(|v| v.iter())
    }

    pub fn get(&mut self, index: usize) -> OrmResult<Option<&E>> {
        self.buffer().map(|v| v.get(index))
    }

    pub fn first(&mut self) -> OrmResult<Option<&E>> {
        self.get(0)
    }

    /// Buffer and take ownership of the entities.
    pub fn into_vec(mut self) -> OrmResult<Vec<E>> {
        self.buffer()?;
        match self.state {
            State::Buffered(entities) => Ok(entities),
            State::Failed(message) => Err(OrmError::ResultsetFailed(message)),
            State::Unbuffered(_) => Err(OrmError::ResultsetFailed("cursor not drained".into())),
        }
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self.state, State::Buffered(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, State::Failed(_))
    }

    /// Result column header as returned by the executor.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl<E: Entity> fmt::Debug for Resultset<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            State::Unbuffered(_) => "unbuffered".to_string(),
            State::Buffered(v) => format!("buffered({})", v.len()),
            State::Failed(m) => format!("failed({m})"),
        };
        f.debug_struct("Resultset")
            .field("entity", &E::NAME)
            .field("columns", &self.columns)
            .field("state", &state)
            .finish()
    }
}

/// Single-pass stream of entities, produced by [`Resultset::into_iter`].
///
/// Iteration stops after the first error.
pub struct IntoIter<E: Entity> {
    inner: Inner<E>,
}

enum Inner<E: Entity> {
    Streaming(RowCursor, Hydrator<E>),
    Buffered(std::vec::IntoIter<E>),
    Failed(Option<String>),
    Done,
}

impl<E: Entity> Iterator for IntoIter<E> {
    type Item = OrmResult<E>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            Inner::Streaming(cursor, hydrator) => {
                let item = cursor.next()?.and_then(|row| hydrator.hydrate(&row));
                if item.is_err() {
                    self.inner = Inner::Done;
                }
                Some(item)
            }
            Inner::Buffered(entities) => entities.next().map(Ok),
            Inner::Failed(message) => message.take().map(|m| Err(OrmError::ResultsetFailed(m))),
            Inner::Done => None,
        }
    }
}

impl<E: Entity> IntoIterator for Resultset<E> {
    type Item = OrmResult<E>;
    type IntoIter = IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        let inner = match self.state {
            State::Unbuffered(cursor) => Inner::Streaming(cursor, self.hydrator),
            State::Buffered(entities) => Inner::Buffered(entities.into_iter()),
            State::Failed(message) => Inner::Failed(Some(message)),
        };
        IntoIter { inner }
    }
}
