//! Row hydration: raw rows into entities with wired relationships.
//!
//! A [`Hydrator`] is planned once per execution from the cursor header and
//! the statement's [`AliasMap`]. Planning partitions the header by `alias.`
//! prefix and resolves every joined alias to a relationship declared on the
//! root entity, so resolution failures surface before any row is read.

use crate::entity::Entity;
use crate::entity::RelationMap;
use crate::error::{OrmError, OrmResult};
use crate::executor::RawRow;
use crate::query::AliasMap;
use crate::value::{FromValue, Value};

/// Column of a row slice: unprefixed name and position in the full row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SliceField {
    name: String,
    index: usize,
}

/// The part of one raw row that belongs to a single alias.
///
/// Field names are unprefixed: a joined slice for `join_1` exposes the header
/// column `join_1.inv_id` as `inv_id`.
#[derive(Debug, Clone, Copy)]
pub struct RowSlice<'r> {
    alias: &'r str,
    joined: bool,
    fields: &'r [SliceField],
    values: &'r [Value],
}

impl<'r> RowSlice<'r> {
    fn field(&self, name: &str) -> Option<&'r SliceField> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn label(&self, name: &str) -> String {
        if self.joined {
            format!("{}.{}", self.alias, name)
        } else {
            name.to_string()
        }
    }

    /// Typed access to a projected column.
    pub fn get<T: FromValue>(&self, name: &str) -> OrmResult<T> {
        match self.field(name) {
            Some(field) => T::from_value(&self.values[field.index], &self.label(name)),
            None => Err(OrmError::decode(self.label(name), "column not in projection")),
        }
    }

    /// Like [`get`](Self::get), but a column missing from a partial
    /// projection yields `Ok(None)`.
    pub fn try_get<T: FromValue>(&self, name: &str) -> OrmResult<Option<T>> {
        match self.field(name) {
            Some(field) => T::from_value(&self.values[field.index], &self.label(name)).map(Some),
            None => Ok(None),
        }
    }

    pub fn value(&self, name: &str) -> Option<&'r Value> {
        self.field(name).map(|f| &self.values[f.index])
    }

    /// `true` when the column is projected and NULL.
    pub fn is_null(&self, name: &str) -> bool {
        self.value(name).is_some_and(Value::is_null)
    }

    /// Alias this slice belongs to (the entity name for the root slice).
    pub fn alias(&self) -> &'r str {
        self.alias
    }

    pub fn columns(&self) -> impl Iterator<Item = &'r str> + 'r {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// No left-join match: every value in the slice is NULL.
    fn all_null(&self) -> bool {
        self.fields.iter().all(|f| self.values[f.index].is_null())
    }
}

#[derive(Debug)]
struct JoinSlot {
    alias: String,
    relation: usize,
    fields: Vec<SliceField>,
}

/// Precomputed mapping from header positions to entity slices.
#[derive(Debug)]
pub struct Hydrator<E: Entity> {
    relations: RelationMap<E>,
    width: usize,
    root: Vec<SliceField>,
    joins: Vec<JoinSlot>,
}

impl<E: Entity> Hydrator<E> {
    /// Plan hydration for `columns`.
    ///
    /// Fails with [`OrmError::UnresolvedRelation`] when a prefixed column
    /// names an alias the query never declared, or a join alias that has no
    /// matching relationship on `E`.
    pub fn plan(columns: &[String], aliases: &AliasMap) -> OrmResult<Self> {
        let relations = E::relations();
        let mut root = Vec::new();
        let mut joins: Vec<JoinSlot> = Vec::new();

        for (index, column) in columns.iter().enumerate() {
            let (prefix, name) = match column.split_once('.') {
                Some((prefix, name)) => (prefix, name),
                None => ("", column.as_str()),
            };
            let target = aliases.get(prefix).ok_or_else(|| {
                OrmError::unresolved(E::NAME, prefix, "column prefix is not a query alias")
            })?;
            if target.is_root() {
                root.push(SliceField {
                    name: name.to_string(),
                    index,
                });
                continue;
            }

            let field = SliceField {
                name: name.to_string(),
                index,
            };
            if let Some(slot) = joins.iter_mut().find(|s| s.alias == prefix) {
                slot.fields.push(field);
                continue;
            }

            let relation = relations.position(&target.relation).ok_or_else(|| {
                OrmError::unresolved(
                    E::NAME,
                    prefix,
                    format!("no relationship named '{}'", target.relation),
                )
            })?;
            let info = relations.at(relation).info();
            if info.target != target.entity {
                return Err(OrmError::unresolved(
                    E::NAME,
                    prefix,
                    format!(
                        "relationship '{}' targets '{}' but the join selects '{}'",
                        target.relation, info.target, target.entity
                    ),
                ));
            }
            joins.push(JoinSlot {
                alias: prefix.to_string(),
                relation,
                fields: vec![field],
            });
        }

        tracing::trace!(
            target: "modelq.hydrate",
            entity = E::NAME,
            width = columns.len(),
            root_fields = root.len(),
            joins = ?joins.iter().map(|s| s.alias.as_str()).collect::<Vec<_>>(),
            "hydration plan"
        );

        Ok(Self {
            relations,
            width: columns.len(),
            root,
            joins,
        })
    }

    /// Build one root entity from one raw row and wire its joined slices.
    pub fn hydrate(&self, row: &RawRow) -> OrmResult<E> {
        let values = row.values();
        if values.len() != self.width {
            return Err(OrmError::decode(
                E::NAME,
                format!(
                    "row has {} values but the header has {} columns",
                    values.len(),
                    self.width
                ),
            ));
        }

        let mut entity = E::hydrate(&RowSlice {
            alias: E::NAME,
            joined: false,
            fields: &self.root,
            values,
        })?;

        for slot in &self.joins {
            let slice = RowSlice {
                alias: &slot.alias,
                joined: true,
                fields: &slot.fields,
                values,
            };
            if slice.all_null() {
                continue;
            }
            self.relations.at(slot.relation).attach(&mut entity, &slice)?;
        }
        Ok(entity)
    }

    /// Join aliases that will be wired, in header order.
    pub fn join_aliases(&self) -> impl Iterator<Item = &str> {
        self.joins.iter().map(|s| s.alias.as_str())
    }
}
