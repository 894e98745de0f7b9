//! Declarative model queries.
//!
//! [`QueryBuilder`] collects a projection, joins, conditions and pagination
//! for one root entity. [`QueryBuilder::compile`] turns that description into
//! a [`CompiledStatement`] for a given [`Dialect`](crate::Dialect): wildcards
//! are expanded from column metadata, joined columns are prefixed with their
//! alias (`join_1.inv_id`), and placeholders are numbered in statement order.

mod alias;
mod builder;
mod column_ref;
mod compile;
mod expr;
mod fragment;

pub use alias::{AliasMap, AliasTarget};
pub use builder::{JoinSpec, Order, QueryBuilder};
pub use column_ref::ColumnRef;
pub use compile::{CompiledStatement, OutputColumn};
pub use expr::Expr;
