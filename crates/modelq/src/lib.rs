//! # modelq
//!
//! A model query engine: declarative queries over typed entities, compiled
//! per SQL dialect, executed through an explicit [`Executor`], and hydrated
//! back into entities with their joined relations wired in.
//!
//! ## Pieces
//!
//! - **Column metadata**: [`ColumnDescriptor`] values served by a
//!   [`MetadataProvider`] ([`MemoryMetadata`], or loaded from Postgres with
//!   [`introspect::load_metadata`]).
//! - **Queries**: [`Entity::query`] returns a [`QueryBuilder`]. Every
//!   mutator validates at the call.
//! - **Dialects**: [`MySql`], [`Postgres`] and [`Sqlite`] differ only in
//!   quoting, placeholders, pagination and join keywords.
//! - **Execution**: [`ModelManager`] pairs metadata with an executor. The
//!   only `.await` in a query is at the executor boundary.
//! - **Results**: execution returns a fully hydrated [`Resultset`], or the
//!   first error.
//!
//! ```ignore
//! use modelq::prelude::*;
//!
//! let pool = modelq::create_pool(&database_url)?;
//! let metadata = modelq::introspect::load_metadata(
//!     &*pool.get().await?, "public", &["co_customers", "co_invoices"],
//! ).await?;
//! let manager = ModelManager::new(metadata, pool)
//!     .instrumented(ExecutorConfig::new().timeout(Duration::from_secs(5)));
//!
//! let mut query = Customer::query();
//! query
//!     .left_join::<Invoice>("Customers.cst_id = join_1.inv_cst_id", "join_1")?
//!     .columns(&["Customers.*", "join_1.*"])?
//!     .limit(20, 0)?;
//! let mut customers = manager.find(&query).await?;
//! for customer in customers.iter()? {
//!     println!("{} {:?}", customer.cst_id, customer.invoice);
//! }
//! ```

pub mod column;
pub mod dialect;
pub mod entity;
pub mod error;
pub mod executor;
pub mod hydrate;
pub mod ident;
pub mod manager;
pub mod metadata;
pub mod prelude;
pub mod query;
pub mod resultset;
pub mod value;

#[cfg(feature = "postgres")]
pub mod introspect;

#[cfg(feature = "pool")]
pub mod pool;

pub use column::{BindType, ColumnDescriptor, ColumnDescriptorBuilder, ColumnType};
pub use dialect::{Dialect, JoinType, MySql, PlaceholderStyle, Postgres, Sqlite};
pub use entity::{Cardinality, Entity, Relation, RelationInfo, RelationMap};
pub use error::{OrmError, OrmResult};
pub use executor::{Executor, ExecutorConfig, InstrumentedExecutor, RawRow, RowCursor};
pub use hydrate::{Hydrator, RowSlice};
pub use ident::Ident;
pub use manager::ModelManager;
pub use metadata::{MemoryMetadata, MetadataProvider};
pub use query::{
    AliasMap, AliasTarget, ColumnRef, CompiledStatement, Expr, JoinSpec, Order, OutputColumn,
    QueryBuilder,
};
pub use resultset::Resultset;
pub use value::{FromValue, Value};

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};
