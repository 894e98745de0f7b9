//! Convenient imports for typical `modelq` usage.
//!
//! ```ignore
//! use modelq::prelude::*;
//! ```

pub use crate::{
    Entity, Executor, ExecutorConfig, Expr, JoinType, MemoryMetadata, MetadataProvider,
    ModelManager, Order, OrmError, OrmResult, QueryBuilder, RelationMap, Resultset, RowSlice,
    Value,
};

#[cfg(feature = "pool")]
pub use crate::{create_pool, create_pool_with_config};
