use std::time::Duration;
use tracing::Level;

/// Configuration for [`InstrumentedExecutor`](super::InstrumentedExecutor).
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Query timeout duration. Expiry surfaces as a connection error.
    pub query_timeout: Option<Duration>,
    /// Slow query threshold for warnings.
    pub slow_query_threshold: Option<Duration>,
    /// Tracing event level for statement logging.
    pub log_level: Level,
    /// Truncate logged SQL (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
    /// Whether to log statements before they run.
    pub logging_enabled: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            query_timeout: None,
            slow_query_threshold: None,
            log_level: Level::DEBUG,
            max_sql_length: Some(200),
            logging_enabled: true,
        }
    }
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set query timeout.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.query_timeout = Some(duration);
        self
    }

    /// Set slow query threshold.
    pub fn slow_threshold(mut self, duration: Duration) -> Self {
        self.slow_query_threshold = Some(duration);
        self
    }

    /// Override the tracing event level.
    pub fn log_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    /// Disable statement logging. Slow-query and failure warnings still fire.
    pub fn no_logging(mut self) -> Self {
        self.logging_enabled = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = ExecutorConfig::new()
            .timeout(Duration::from_secs(5))
            .slow_threshold(Duration::from_millis(250))
            .log_level(Level::INFO)
            .no_truncate()
            .no_logging();
        assert_eq!(config.query_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.slow_query_threshold, Some(Duration::from_millis(250)));
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.max_sql_length, None);
        assert!(!config.logging_enabled);

        let defaults = ExecutorConfig::default();
        assert_eq!(defaults.max_sql_length, Some(200));
        assert!(defaults.logging_enabled);
    }
}
