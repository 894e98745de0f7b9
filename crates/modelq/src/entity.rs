//! Typed entities and their relationship declarations.

use crate::error::OrmResult;
use crate::hydrate::RowSlice;
use crate::query::QueryBuilder;
use std::fmt;
use std::sync::Arc;

/// A typed domain object backed by one table.
///
/// The schema is fixed at compile time: `hydrate` maps row-column names to
/// struct fields explicitly, and `relations` declares which join aliases
/// may be wired into the entity.
///
/// # Example
///
/// ```
/// use modelq::{Entity, OrmResult, RelationMap, RowSlice};
///
/// #[derive(Debug)]
/// struct Invoice {
///     inv_id: i64,
///     inv_title: Option<String>,
/// }
///
/// impl Entity for Invoice {
///     const NAME: &'static str = "Invoices";
///     const TABLE: &'static str = "co_invoices";
///
///     fn hydrate(row: &RowSlice<'_>) -> OrmResult<Self> {
///         Ok(Self {
///             inv_id: row.get("inv_id")?,
///             inv_title: row.get("inv_title")?,
///         })
///     }
/// }
///
/// #[derive(Debug)]
/// struct Customer {
///     cst_id: i64,
///     invoice: Option<Invoice>,
/// }
///
/// impl Entity for Customer {
///     const NAME: &'static str = "Customers";
///     const TABLE: &'static str = "co_customers";
///
///     fn hydrate(row: &RowSlice<'_>) -> OrmResult<Self> {
///         Ok(Self { cst_id: row.get("cst_id")?, invoice: None })
///     }
///
///     fn relations() -> RelationMap<Self> {
///         RelationMap::new()
///             .has_one::<Invoice>("invoice", |c: &mut Customer, inv| c.invoice = Some(inv))
///     }
/// }
/// ```
pub trait Entity: Sized + Send + 'static {
    /// Entity name, also the root alias in projections (`Customers.*`).
    const NAME: &'static str;

    /// Backing table.
    const TABLE: &'static str;

    /// Build an instance from the row slice belonging to this entity's alias.
    fn hydrate(row: &RowSlice<'_>) -> OrmResult<Self>;

    /// Relationship declarations, keyed by name.
    fn relations() -> RelationMap<Self> {
        RelationMap::new()
    }

    /// Start a query targeting this entity.
    fn query() -> QueryBuilder<Self> {
        QueryBuilder::new()
    }
}

/// One-to-one or one-to-many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// What a relationship name resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationInfo {
    pub cardinality: Cardinality,
    /// [`Entity::NAME`] of the related type.
    pub target: &'static str,
}

type AttachFn<P> = dyn Fn(&mut P, &RowSlice<'_>) -> OrmResult<()> + Send + Sync;

/// A single relationship declaration on entity `P`.
pub struct Relation<P> {
    name: &'static str,
    info: RelationInfo,
    attach: Arc<AttachFn<P>>,
}

impl<P> Relation<P> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn info(&self) -> RelationInfo {
        self.info
    }

    /// Hydrate the related entity from `slice` and wire it into `parent`.
    pub(crate) fn attach(&self, parent: &mut P, slice: &RowSlice<'_>) -> OrmResult<()> {
        (self.attach)(parent, slice)
    }
}

impl<P> Clone for Relation<P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            info: self.info,
            attach: Arc::clone(&self.attach),
        }
    }
}

impl<P> fmt::Debug for Relation<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("name", &self.name)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Ordered set of relationship declarations for entity `P`.
pub struct RelationMap<P> {
    relations: Vec<Relation<P>>,
}

impl<P> Default for RelationMap<P> {
    fn default() -> Self {
        Self {
            relations: Vec::new(),
        }
    }
}

impl<P> Clone for RelationMap<P> {
    fn clone(&self) -> Self {
        Self {
            relations: self.relations.clone(),
        }
    }
}

impl<P> fmt::Debug for RelationMap<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.relations).finish()
    }
}

impl<P: 'static> RelationMap<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a singular relationship: each hydrated `C` overwrites the
    /// attribute through `set`.
    pub fn has_one<C: Entity>(self, name: &'static str, set: fn(&mut P, C)) -> Self {
        self.declare::<C>(name, Cardinality::One, set)
    }

    /// Declare a plural relationship: each hydrated `C` is appended through
    /// `push`.
    pub fn has_many<C: Entity>(self, name: &'static str, push: fn(&mut P, C)) -> Self {
        self.declare::<C>(name, Cardinality::Many, push)
    }

    fn declare<C: Entity>(
        mut self,
        name: &'static str,
        cardinality: Cardinality,
        wire: fn(&mut P, C),
    ) -> Self {
        let attach = move |parent: &mut P, slice: &RowSlice<'_>| -> OrmResult<()> {
            let child = C::hydrate(slice)?;
            wire(parent, child);
            Ok(())
        };
        let relation = Relation {
            name,
            info: RelationInfo {
                cardinality,
                target: C::NAME,
            },
            attach: Arc::new(attach),
        };
        // Later declarations with the same name win.
        self.relations.retain(|r| r.name != name);
        self.relations.push(relation);
        self
    }

    /// Resolve a relationship by name.
    pub fn resolve(&self, name: &str) -> Option<RelationInfo> {
        self.get(name).map(Relation::info)
    }

    pub fn get(&self, name: &str) -> Option<&Relation<P>> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.relations.iter().position(|r| r.name == name)
    }

    pub(crate) fn at(&self, index: usize) -> &Relation<P> {
        &self.relations[index]
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.relations.iter().map(|r| r.name)
    }
}
