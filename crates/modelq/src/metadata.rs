//! Column metadata providers.

use crate::column::ColumnDescriptor;
use crate::error::{OrmError, OrmResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Read-only source of column descriptors.
///
/// Implementations must return columns in table-definition order. The query
/// engine calls this while compiling, so it must not perform I/O; load
/// metadata up front (see [`crate::introspect`]) and serve it from memory.
pub trait MetadataProvider: Send + Sync {
    /// Describe the columns of `table`, or fail with [`OrmError::Metadata`].
    fn describe_columns(&self, table: &str) -> OrmResult<Arc<[ColumnDescriptor]>>;
}

impl<P: MetadataProvider + ?Sized> MetadataProvider for Arc<P> {
    fn describe_columns(&self, table: &str) -> OrmResult<Arc<[ColumnDescriptor]>> {
        (**self).describe_columns(table)
    }
}

impl<P: MetadataProvider + ?Sized> MetadataProvider for &P {
    fn describe_columns(&self, table: &str) -> OrmResult<Arc<[ColumnDescriptor]>> {
        (**self).describe_columns(table)
    }
}

/// In-memory table registry.
///
/// # Example
///
/// ```
/// use modelq::{ColumnDescriptor, ColumnType, MemoryMetadata, MetadataProvider};
///
/// let metadata = MemoryMetadata::new().with_table(
///     "co_customers",
///     vec![
///         ColumnDescriptor::builder("cst_id", ColumnType::Integer).primary(true).build()?,
///         ColumnDescriptor::builder("cst_name_last", ColumnType::Varchar).size(100).build()?,
///     ],
/// )?;
/// assert_eq!(metadata.describe_columns("co_customers")?.len(), 2);
/// # Ok::<(), modelq::OrmError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryMetadata {
    tables: HashMap<String, Arc<[ColumnDescriptor]>>,
}

impl MemoryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a table. Column names must be unique.
    pub fn register(
        &mut self,
        table: impl Into<String>,
        columns: Vec<ColumnDescriptor>,
    ) -> OrmResult<()> {
        let table = table.into();
        {
            let mut seen = HashSet::with_capacity(columns.len());
            for col in &columns {
                if !seen.insert(col.name()) {
                    return Err(OrmError::descriptor(
                        col.name(),
                        format!("duplicate column in table '{table}'"),
                    ));
                }
            }
        }
        self.tables.insert(table, columns.into());
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_table(
        mut self,
        table: impl Into<String>,
        columns: Vec<ColumnDescriptor>,
    ) -> OrmResult<Self> {
        self.register(table, columns)?;
        Ok(self)
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn column(&self, table: &str, name: &str) -> Option<&ColumnDescriptor> {
        self.tables
            .get(table)
            .and_then(|cols| cols.iter().find(|c| c.name() == name))
    }

    /// Primary key column names, in table order.
    pub fn primary_key(&self, table: &str) -> Vec<&str> {
        self.tables
            .get(table)
            .map(|cols| {
                cols.iter()
                    .filter(|c| c.is_primary())
                    .map(ColumnDescriptor::name)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

impl MetadataProvider for MemoryMetadata {
    fn describe_columns(&self, table: &str) -> OrmResult<Arc<[ColumnDescriptor]>> {
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| OrmError::Metadata(format!("no column metadata for table '{table}'")))
    }
}
