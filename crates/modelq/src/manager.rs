//! Explicit wiring of metadata and executor.

use crate::entity::Entity;
use crate::error::OrmResult;
use crate::executor::{Executor, ExecutorConfig, InstrumentedExecutor};
use crate::metadata::MetadataProvider;
use crate::query::QueryBuilder;
use crate::resultset::Resultset;
use std::fmt;
use std::sync::Arc;

/// Pairs a [`MetadataProvider`] with an [`Executor`].
///
/// There is no global registry: every query runs against the manager it is
/// given.
///
/// ```no_run
/// # async fn demo(client: tokio_postgres::Client) -> modelq::OrmResult<()> {
/// use modelq::{MemoryMetadata, ModelManager};
///
/// let manager = ModelManager::new(MemoryMetadata::new(), client);
/// # let _ = manager;
/// # Ok(())
/// # }
/// ```
pub struct ModelManager<X> {
    metadata: Arc<dyn MetadataProvider>,
    executor: X,
}

impl<X: Executor> ModelManager<X> {
    pub fn new(metadata: impl MetadataProvider + 'static, executor: X) -> Self {
        Self {
            metadata: Arc::new(metadata),
            executor,
        }
    }

    /// Share one metadata provider across several managers.
    pub fn with_shared_metadata(metadata: Arc<dyn MetadataProvider>, executor: X) -> Self {
        Self { metadata, executor }
    }

    pub fn executor(&self) -> &X {
        &self.executor
    }

    pub fn metadata(&self) -> &dyn MetadataProvider {
        &*self.metadata
    }

    pub fn shared_metadata(&self) -> Arc<dyn MetadataProvider> {
        Arc::clone(&self.metadata)
    }

    /// Wrap the executor with logging and a timeout.
    pub fn instrumented(self, config: ExecutorConfig) -> ModelManager<InstrumentedExecutor<X>> {
        ModelManager {
            metadata: self.metadata,
            executor: InstrumentedExecutor::new(self.executor).with_config(config),
        }
    }

    /// Run `query` against this manager.
    pub async fn find<E: Entity>(&self, query: &QueryBuilder<E>) -> OrmResult<Resultset<E>> {
        query.execute(self).await
    }

    /// Run `E::query()` with no further criteria.
    pub async fn find_all<E: Entity>(&self) -> OrmResult<Resultset<E>> {
        E::query().execute(self).await
    }
}

impl<X> fmt::Debug for ModelManager<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelManager")
            .field("executor", &std::any::type_name::<X>())
            .finish_non_exhaustive()
    }
}
