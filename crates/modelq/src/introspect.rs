//! Postgres schema introspection into [`MemoryMetadata`].
//!
//! Reads `information_schema` once at startup. The query engine itself never
//! touches the catalog; it only sees the loaded descriptors.

use crate::column::{ColumnDescriptor, ColumnType};
use crate::error::{OrmError, OrmResult};
use crate::metadata::MemoryMetadata;
use tokio_postgres::Row;

const COLUMNS_SQL: &str = r#"
SELECT
  c.column_name::text AS column_name,
  c.data_type::text AS data_type,
  c.udt_name::text AS udt_name,
  (c.is_nullable = 'YES') AS nullable,
  c.column_default::text AS default_expr,
  c.character_maximum_length::int4 AS char_length,
  c.numeric_precision::int4 AS numeric_precision,
  c.numeric_scale::int4 AS numeric_scale,
  (c.is_identity = 'YES') AS is_identity,
  EXISTS (
    SELECT 1
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage k
      ON k.constraint_schema = tc.constraint_schema
     AND k.constraint_name = tc.constraint_name
    WHERE tc.constraint_type = 'PRIMARY KEY'
      AND tc.table_schema = c.table_schema
      AND tc.table_name = c.table_name
      AND k.column_name = c.column_name
  ) AS is_primary,
  pg_catalog.col_description(
    format('%I.%I', c.table_schema, c.table_name)::regclass,
    c.ordinal_position::int4
  ) AS comment
FROM information_schema.columns c
WHERE c.table_schema = $1
  AND c.table_name = $2
ORDER BY c.ordinal_position
"#;

fn column<T>(row: &Row, name: &str) -> OrmResult<T>
where
    T: for<'a> tokio_postgres::types::FromSql<'a>,
{
    row.try_get(name)
        .map_err(|e| OrmError::decode(name, e.to_string()))
}

fn to_size(value: Option<i32>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

/// Build a descriptor from one `information_schema.columns` row.
fn descriptor_from_row(row: &Row) -> OrmResult<ColumnDescriptor> {
    let name: String = column(row, "column_name")?;
    let data_type: String = column(row, "data_type")?;
    let udt_name: String = column(row, "udt_name")?;
    let nullable: bool = column(row, "nullable")?;
    let default_expr: Option<String> = column(row, "default_expr")?;
    let is_identity: bool = column(row, "is_identity")?;
    let is_primary: bool = column(row, "is_primary")?;
    let comment: Option<String> = column(row, "comment")?;

    let column_type = data_type
        .parse::<ColumnType>()
        .or_else(|_| udt_name.parse::<ColumnType>())
        .map_err(|_| {
            OrmError::descriptor(
                &name,
                format!("unsupported column type '{data_type}' ({udt_name})"),
            )
        })?;

    let serial = default_expr
        .as_deref()
        .is_some_and(|d| d.starts_with("nextval("));
    let auto_increment = column_type.is_integer() && (is_identity || serial);

    let mut builder = ColumnDescriptor::builder(&name, column_type)
        .nullable(nullable)
        .primary(is_primary)
        .auto_increment(auto_increment);

    if column_type == ColumnType::Decimal {
        if let Some(precision) = to_size(column(row, "numeric_precision")?) {
            builder = builder.size(precision);
            if let Some(scale) = to_size(column(row, "numeric_scale")?) {
                builder = builder.scale(scale);
            }
        }
    } else if let Some(length) = to_size(column(row, "char_length")?) {
        builder = builder.size(length);
    }

    if let Some(default) = default_expr.filter(|_| !serial) {
        builder = builder.default_value(default);
    }
    if let Some(comment) = comment {
        builder = builder.comment(comment);
    }
    builder.build()
}

/// Describe `schema.table` in ordinal order. Fails with
/// [`OrmError::Metadata`] if the table has no visible columns.
pub async fn describe_table(
    client: &tokio_postgres::Client,
    schema: &str,
    table: &str,
) -> OrmResult<Vec<ColumnDescriptor>> {
    let rows = client
        .query(COLUMNS_SQL, &[&schema, &table])
        .await
        .map_err(OrmError::from_db_error)?;
    if rows.is_empty() {
        return Err(OrmError::Metadata(format!(
            "table '{schema}.{table}' not found or has no columns"
        )));
    }
    let columns = rows
        .iter()
        .map(descriptor_from_row)
        .collect::<OrmResult<Vec<_>>>()?;
    tracing::debug!(
        target: "modelq.metadata",
        schema,
        table,
        columns = columns.len(),
        "introspected table"
    );
    Ok(columns)
}

/// Load `tables` from `schema` into a fresh [`MemoryMetadata`], keyed by
/// bare table name.
pub async fn load_metadata(
    client: &tokio_postgres::Client,
    schema: &str,
    tables: &[&str],
) -> OrmResult<MemoryMetadata> {
    let mut metadata = MemoryMetadata::new();
    for table in tables {
        let columns = describe_table(client, schema, table).await?;
        metadata.register(*table, columns)?;
    }
    Ok(metadata)
}
