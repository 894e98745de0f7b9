//! Column metadata.
//!
//! A [`ColumnDescriptor`] is an immutable description of one table column,
//! created once at metadata-load time and read-only afterwards.
//!
//! ```
//! use modelq::{ColumnDescriptor, ColumnType};
//!
//! let id = ColumnDescriptor::builder("inv_id", ColumnType::Integer)
//!     .size(10)
//!     .unsigned(true)
//!     .primary(true)
//!     .auto_increment(true)
//!     .build()?;
//! assert!(id.is_unsigned());
//! # Ok::<(), modelq::OrmError>(())
//! ```

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::fmt;
use std::str::FromStr;

/// Abstract column type, independent of any dialect's spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    TinyInteger,
    SmallInteger,
    MediumInteger,
    Integer,
    BigInteger,
    Decimal,
    Float,
    Double,
    Boolean,
    Char,
    Varchar,
    Text,
    Date,
    Time,
    DateTime,
    Timestamp,
    Json,
    Jsonb,
    Blob,
    Uuid,
    Enum,
}

impl ColumnType {
    /// Every supported type, in declaration order.
    pub const ALL: [ColumnType; 21] = [
        ColumnType::TinyInteger,
        ColumnType::SmallInteger,
        ColumnType::MediumInteger,
        ColumnType::Integer,
        ColumnType::BigInteger,
        ColumnType::Decimal,
        ColumnType::Float,
        ColumnType::Double,
        ColumnType::Boolean,
        ColumnType::Char,
        ColumnType::Varchar,
        ColumnType::Text,
        ColumnType::Date,
        ColumnType::Time,
        ColumnType::DateTime,
        ColumnType::Timestamp,
        ColumnType::Json,
        ColumnType::Jsonb,
        ColumnType::Blob,
        ColumnType::Uuid,
        ColumnType::Enum,
    ];

    /// Integer family. Only these may be `unsigned` or `auto_increment`.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ColumnType::TinyInteger
                | ColumnType::SmallInteger
                | ColumnType::MediumInteger
                | ColumnType::Integer
                | ColumnType::BigInteger
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer()
            || matches!(
                self,
                ColumnType::Decimal | ColumnType::Float | ColumnType::Double
            )
    }

    pub fn is_text(self) -> bool {
        matches!(
            self,
            ColumnType::Char | ColumnType::Varchar | ColumnType::Text | ColumnType::Enum
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::TinyInteger => "tinyint",
            ColumnType::SmallInteger => "smallint",
            ColumnType::MediumInteger => "mediumint",
            ColumnType::Integer => "integer",
            ColumnType::BigInteger => "bigint",
            ColumnType::Decimal => "decimal",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::Boolean => "boolean",
            ColumnType::Char => "char",
            ColumnType::Varchar => "varchar",
            ColumnType::Text => "text",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::DateTime => "datetime",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Json => "json",
            ColumnType::Jsonb => "jsonb",
            ColumnType::Blob => "blob",
            ColumnType::Uuid => "uuid",
            ColumnType::Enum => "enum",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = OrmError;

    /// Parse a SQL type name as reported by `information_schema` or a
    /// column definition. Length/precision suffixes (`varchar(32)`) and
    /// trailing modifiers (`unsigned`, `with time zone`) are ignored.
    fn from_str(s: &str) -> OrmResult<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let base = lower.split('(').next().unwrap_or_default().trim();
        let ty = match base {
            "tinyint" | "int1" => ColumnType::TinyInteger,
            "smallint" | "int2" | "smallserial" => ColumnType::SmallInteger,
            "mediumint" | "int3" => ColumnType::MediumInteger,
            "int" | "integer" | "int4" | "serial" => ColumnType::Integer,
            "bigint" | "int8" | "bigserial" => ColumnType::BigInteger,
            "decimal" | "numeric" | "money" => ColumnType::Decimal,
            "float" | "real" | "float4" => ColumnType::Float,
            "double" | "double precision" | "float8" => ColumnType::Double,
            "bool" | "boolean" | "bit" => ColumnType::Boolean,
            "char" | "character" | "bpchar" => ColumnType::Char,
            "varchar" | "character varying" | "nvarchar" => ColumnType::Varchar,
            "text" | "tinytext" | "mediumtext" | "longtext" | "clob" | "name" => ColumnType::Text,
            "date" => ColumnType::Date,
            "time" | "time without time zone" | "time with time zone" | "timetz" => {
                ColumnType::Time
            }
            "datetime" | "timestamp without time zone" => ColumnType::DateTime,
            "timestamp" | "timestamp with time zone" | "timestamptz" => ColumnType::Timestamp,
            "json" => ColumnType::Json,
            "jsonb" => ColumnType::Jsonb,
            "blob" | "tinyblob" | "mediumblob" | "longblob" | "bytea" | "binary" | "varbinary" => {
                ColumnType::Blob
            }
            "uuid" => ColumnType::Uuid,
            "enum" | "user-defined" => ColumnType::Enum,
            other => {
                // "int unsigned", "bigint unsigned zerofill", ...
                let first = other.split_whitespace().next().unwrap_or_default();
                if first != other && !first.is_empty() {
                    return first.parse();
                }
                return Err(OrmError::Metadata(format!("unknown column type '{s}'")));
            }
        };
        Ok(ty)
    }
}

/// How values of a column are bound as parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindType {
    Int,
    Str,
    Decimal,
    Bool,
    Blob,
}

/// Immutable description of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    name: String,
    column_type: ColumnType,
    size: Option<u32>,
    scale: Option<u32>,
    unsigned: bool,
    nullable: bool,
    default: Option<Value>,
    primary: bool,
    auto_increment: bool,
    comment: Option<String>,
}

impl ColumnDescriptor {
    /// Start building a descriptor. Columns are nullable by default.
    pub fn builder(name: impl Into<String>, column_type: ColumnType) -> ColumnDescriptorBuilder {
        ColumnDescriptorBuilder {
            name: name.into(),
            column_type,
            size: None,
            scale: None,
            unsigned: false,
            nullable: true,
            default: None,
            primary: false,
            auto_increment: false,
            comment: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn size(&self) -> Option<u32> {
        self.size
    }

    pub fn scale(&self) -> Option<u32> {
        self.scale
    }

    pub fn is_unsigned(&self) -> bool {
        self.unsigned
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Column default, if the schema declares one.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn is_numeric(&self) -> bool {
        self.column_type.is_numeric()
    }

    pub fn bind_type(&self) -> BindType {
        match self.column_type {
            t if t.is_integer() => BindType::Int,
            ColumnType::Decimal | ColumnType::Float | ColumnType::Double => BindType::Decimal,
            ColumnType::Boolean => BindType::Bool,
            ColumnType::Blob => BindType::Blob,
            _ => BindType::Str,
        }
    }
}

/// Builder for [`ColumnDescriptor`]; validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
#[must_use]
pub struct ColumnDescriptorBuilder {
    name: String,
    column_type: ColumnType,
    size: Option<u32>,
    scale: Option<u32>,
    unsigned: bool,
    nullable: bool,
    default: Option<Value>,
    primary: bool,
    auto_increment: bool,
    comment: Option<String>,
}

impl ColumnDescriptorBuilder {
    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn unsigned(mut self, unsigned: bool) -> Self {
        self.unsigned = unsigned;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Shorthand for `nullable(false)`.
    pub fn not_null(self) -> Self {
        self.nullable(false)
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.default = (!value.is_null()).then_some(value);
        self
    }

    /// Primary key columns are never nullable.
    pub fn primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        if primary {
            self.nullable = false;
        }
        self
    }

    pub fn auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = auto_increment;
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn build(self) -> OrmResult<ColumnDescriptor> {
        if self.name.trim().is_empty() {
            return Err(OrmError::descriptor("", "column name cannot be empty"));
        }
        if self.unsigned && !self.column_type.is_integer() {
            return Err(OrmError::descriptor(
                &self.name,
                format!("unsigned is only valid for integer types, not {}", self.column_type),
            ));
        }
        if self.auto_increment && !self.column_type.is_integer() {
            return Err(OrmError::descriptor(
                &self.name,
                format!("auto_increment requires an integer type, not {}", self.column_type),
            ));
        }
        match (self.size, self.scale) {
            (None, Some(_)) => {
                return Err(OrmError::descriptor(&self.name, "scale requires a size"));
            }
            (Some(size), Some(scale)) if scale > size => {
                return Err(OrmError::descriptor(
                    &self.name,
                    format!("scale {scale} exceeds size {size}"),
                ));
            }
            _ => {}
        }

        Ok(ColumnDescriptor {
            name: self.name,
            column_type: self.column_type,
            size: self.size,
            scale: self.scale,
            unsigned: self.unsigned,
            nullable: self.nullable,
            default: self.default,
            primary: self.primary,
            auto_increment: self.auto_increment,
            comment: self.comment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_round_trips_for_every_integer_type() {
        for ty in ColumnType::ALL.into_iter().filter(|t| t.is_integer()) {
            for unsigned in [false, true] {
                let col = ColumnDescriptor::builder("c", ty)
                    .unsigned(unsigned)
                    .build()
                    .unwrap();
                assert_eq!(col.is_unsigned(), unsigned, "{ty}");
            }
        }
    }

    #[test]
    fn non_integer_types_reject_unsigned_but_accept_signed() {
        for ty in ColumnType::ALL.into_iter().filter(|t| !t.is_integer()) {
            let err = ColumnDescriptor::builder("c", ty)
                .unsigned(true)
                .build()
                .unwrap_err();
            assert!(matches!(err, OrmError::InvalidDescriptor { .. }), "{ty}");

            let col = ColumnDescriptor::builder("c", ty).build().unwrap();
            assert!(!col.is_unsigned());
        }
    }

    #[test]
    fn scale_rules() {
        assert!(
            ColumnDescriptor::builder("total", ColumnType::Decimal)
                .scale(2)
                .build()
                .is_err()
        );
        assert!(
            ColumnDescriptor::builder("total", ColumnType::Decimal)
                .size(2)
                .scale(4)
                .build()
                .is_err()
        );
        let col = ColumnDescriptor::builder("total", ColumnType::Decimal)
            .size(10)
            .scale(2)
            .build()
            .unwrap();
        assert_eq!(col.size(), Some(10));
        assert_eq!(col.scale(), Some(2));
        assert_eq!(col.bind_type(), BindType::Decimal);
    }

    #[test]
    fn primary_implies_not_null() {
        let col = ColumnDescriptor::builder("id", ColumnType::BigInteger)
            .primary(true)
            .build()
            .unwrap();
        assert!(col.is_primary());
        assert!(!col.is_nullable());
    }

    #[test]
    fn null_default_is_no_default() {
        let col = ColumnDescriptor::builder("title", ColumnType::Varchar)
            .default_value(Value::Null)
            .build()
            .unwrap();
        assert!(!col.has_default());

        let col = ColumnDescriptor::builder("flag", ColumnType::TinyInteger)
            .default_value(1)
            .build()
            .unwrap();
        assert_eq!(col.default_value(), Some(&Value::Int(1)));
    }

    #[test]
    fn auto_increment_requires_integer() {
        assert!(
            ColumnDescriptor::builder("id", ColumnType::Varchar)
                .auto_increment(true)
                .build()
                .is_err()
        );
    }

    #[test]
    fn parse_type_names() {
        assert_eq!("int(10) unsigned".parse::<ColumnType>().unwrap(), ColumnType::Integer);
        assert_eq!("character varying".parse::<ColumnType>().unwrap(), ColumnType::Varchar);
        assert_eq!(
            "timestamp with time zone".parse::<ColumnType>().unwrap(),
            ColumnType::Timestamp
        );
        assert_eq!("NUMERIC(10,2)".parse::<ColumnType>().unwrap(), ColumnType::Decimal);
        assert_eq!("bytea".parse::<ColumnType>().unwrap(), ColumnType::Blob);
        assert!("geometry".parse::<ColumnType>().is_err());
    }
}
