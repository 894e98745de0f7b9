//! Error types for modelq

use thiserror::Error;

/// Result type alias for modelq operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for metadata, query building, execution and hydration.
#[derive(Debug, Error)]
pub enum OrmError {
    /// Column metadata combination that cannot exist (e.g. unsigned text)
    #[error("Invalid column descriptor '{column}': {message}")]
    InvalidDescriptor { column: String, message: String },

    /// Projection references an unknown alias/column or is malformed
    #[error("Invalid projection: {0}")]
    InvalidProjection(String),

    /// Join alias declared twice in one query
    #[error("Duplicate alias: {0}")]
    DuplicateAlias(String),

    /// Negative limit or offset
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// Condition template and parameters do not line up
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    /// Metadata provider has no description for a table
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Connection lost, refused, or timed out
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement rejected by the server as malformed
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// Any other server-reported error
    #[error("Database error [{code}]: {message}")]
    Database { code: String, message: String },

    /// Join alias with no matching relationship declaration
    #[error("Unresolved relation '{alias}' on entity '{entity}': {message}")]
    UnresolvedRelation {
        entity: String,
        alias: String,
        message: String,
    },

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// The resultset failed while buffering and holds no data
    #[error("Resultset failed: {0}")]
    ResultsetFailed(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),
}

impl OrmError {
    /// Create a descriptor error for a specific column
    pub fn descriptor(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a projection error
    pub fn projection(message: impl Into<String>) -> Self {
        Self::InvalidProjection(message.into())
    }

    /// Create a condition error
    pub fn condition(message: impl Into<String>) -> Self {
        Self::InvalidCondition(message.into())
    }

    /// Create an unresolved relation error
    pub fn unresolved(
        entity: impl Into<String>,
        alias: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::UnresolvedRelation {
            entity: entity.into(),
            alias: alias.into(),
            message: message.into(),
        }
    }

    /// Builder-time misuse: never retried, always a programming error.
    pub fn is_builder_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidProjection(_)
                | Self::DuplicateAlias(_)
                | Self::InvalidRange(_)
                | Self::InvalidCondition(_)
        )
    }

    /// Check if this is a connection error (including timeouts)
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Check if this is a syntax error
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax(_))
    }

    /// Sort a tokio_postgres error into `Connection`, `Syntax` or `Database`.
    #[cfg(feature = "postgres")]
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let code = db_err.code().code();
            let message = db_err.message().to_string();
            // SQLSTATE class 42: syntax error or access rule violation.
            if code.starts_with("42") {
                return Self::Syntax(format!("{code}: {message}"));
            }
            // Class 08: connection exception. Class 57: operator intervention.
            if code.starts_with("08") || code.starts_with("57") {
                return Self::Connection(format!("{code}: {message}"));
            }
            return Self::Database {
                code: code.to_string(),
                message,
            };
        }
        Self::Connection(err.to_string())
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    /// Checkout only fails in the backend while opening or recycling a
    /// connection, so backend failures and timeouts are
    /// [`Connection`](Self::Connection) errors. A closed or misconfigured
    /// pool stays [`Pool`](Self::Pool).
    fn from(err: deadpool_postgres::PoolError) -> Self {
        use deadpool_postgres::PoolError;
        match err {
            PoolError::Backend(e) => Self::Connection(e.to_string()),
            PoolError::Timeout(kind) => Self::Connection(format!("pool timed out ({kind:?})")),
            other => Self::Pool(other.to_string()),
        }
    }
}
