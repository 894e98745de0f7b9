use super::config::ExecutorConfig;
use super::{Executor, RowCursor};
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::query::CompiledStatement;
use std::time::Instant;
use tracing::Level;

/// Truncate to at most `max_bytes`, backing off to a char boundary.
fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// An executor wrapper that applies a timeout and emits `tracing` events
/// under the `modelq.sql` target.
///
/// The statement is logged **before** it runs, at the configured level.
/// Queries slower than the threshold and failed queries are logged at WARN
/// regardless of `logging_enabled`.
#[derive(Debug, Clone)]
pub struct InstrumentedExecutor<X> {
    inner: X,
    config: ExecutorConfig,
}

impl<X: Executor> InstrumentedExecutor<X> {
    pub fn new(inner: X) -> Self {
        Self {
            inner,
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn inner(&self) -> &X {
        &self.inner
    }

    pub fn into_inner(self) -> X {
        self.inner
    }

    fn truncate_sql(&self, sql: &str) -> String {
        match self.config.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    fn emit(&self, stmt: &CompiledStatement, sql: &str) {
        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        emit_at_level!(
            self.config.log_level,
            target: "modelq.sql",
            dialect = stmt.dialect,
            param_count = stmt.params.len(),
            sql = %sql,
        );
    }

    async fn fetch_inner(&self, stmt: &CompiledStatement) -> OrmResult<RowCursor> {
        let sql = self.truncate_sql(&stmt.sql);
        if self.config.logging_enabled {
            self.emit(stmt, &sql);
        }

        let start = Instant::now();
        let result = match self.config.query_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, self.inner.fetch(stmt)).await {
                Ok(result) => result,
                Err(_) => Err(OrmError::Connection(format!(
                    "query timed out after {timeout:?}"
                ))),
            },
            None => self.inner.fetch(stmt).await,
        };
        let elapsed = start.elapsed();

        match &result {
            Err(err) => tracing::warn!(
                target: "modelq.sql",
                dialect = stmt.dialect,
                duration_ms = elapsed.as_millis() as u64,
                error = %err,
                sql = %sql,
                "query failed"
            ),
            Ok(_) => {
                if let Some(threshold) = self.config.slow_query_threshold {
                    if elapsed > threshold {
                        tracing::warn!(
                            target: "modelq.sql",
                            dialect = stmt.dialect,
                            duration_ms = elapsed.as_millis() as u64,
                            threshold_ms = threshold.as_millis() as u64,
                            sql = %sql,
                            "slow query"
                        );
                    }
                }
            }
        }
        result
    }
}

impl<X: Executor> Executor for InstrumentedExecutor<X> {
    fn dialect(&self) -> &dyn Dialect {
        self.inner.dialect()
    }

    async fn fetch(&self, stmt: &CompiledStatement) -> OrmResult<RowCursor> {
        self.fetch_inner(stmt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Postgres;
    use crate::query::AliasMap;
    use std::time::Duration;

    struct Sleepy(Duration);

    impl Executor for Sleepy {
        fn dialect(&self) -> &dyn Dialect {
            &Postgres
        }

        async fn fetch(&self, _stmt: &CompiledStatement) -> OrmResult<RowCursor> {
            tokio::time::sleep(self.0).await;
            Ok(RowCursor::empty(vec!["id".to_string()]))
        }
    }

    fn statement() -> CompiledStatement {
        CompiledStatement {
            sql: "SELECT 1".into(),
            params: Vec::new(),
            param_names: Vec::new(),
            columns: Vec::new(),
            alias_map: AliasMap::new("Ones", "ones"),
            limit: None,
            offset: 0,
            dialect: "postgres",
        }
    }

    #[tokio::test]
    async fn timeout_is_connection_error() {
        let exec = InstrumentedExecutor::new(Sleepy(Duration::from_millis(200)))
            .with_config(ExecutorConfig::new().timeout(Duration::from_millis(10)));
        let err = exec.fetch(&statement()).await.unwrap_err();
        assert!(err.is_connection(), "{err}");
    }

    #[tokio::test]
    async fn passes_through_within_timeout() {
        let exec = InstrumentedExecutor::new(Sleepy(Duration::ZERO))
            .with_config(ExecutorConfig::new().timeout(Duration::from_secs(5)));
        let cursor = exec.fetch(&statement()).await.unwrap();
        assert_eq!(cursor.columns(), ["id"]);
        assert_eq!(exec.dialect().name(), "postgres");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_sql_bytes("héllo", 2), "h");
        assert_eq!(truncate_sql_bytes("abc", 10), "abc");
        let exec = InstrumentedExecutor::new(Sleepy(Duration::ZERO))
            .with_config(ExecutorConfig::new().max_sql_length(3));
        assert_eq!(exec.truncate_sql("SELECT 1"), "SEL...");
    }
}
