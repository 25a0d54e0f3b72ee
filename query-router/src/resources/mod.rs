//! Long-lived per-tenant resources
//!
//! Every resource kind has its own [`ResourceRegistry`], keyed by the
//! sanitized [`TenantKey`]. Construction goes through the retry policy here;
//! the registries themselves never retry.

pub mod agent;
pub mod database;
pub mod registry;
pub mod search;

pub use agent::SqlAgentSession;
pub use database::TenantDatabase;
pub use registry::{ResourceRegistry, TenantKey};
pub use search::{IndexKind, SearchHit, SearchIndexClient};

use std::path::PathBuf;
use std::sync::Arc;

use crate::ai::ChatModel;
use crate::config::{Config, SearchSettings};
use crate::error::RouterError;
use crate::retry::{with_retry, RetryPolicy};

pub struct TenantResources {
    data_dir: PathBuf,
    search: SearchSettings,
    model: Arc<dyn ChatModel>,
    policy: RetryPolicy,
    databases: ResourceRegistry<TenantDatabase>,
    document_indexes: ResourceRegistry<SearchIndexClient>,
    image_indexes: ResourceRegistry<SearchIndexClient>,
    sql_agents: ResourceRegistry<SqlAgentSession>,
}

impl TenantResources {
    pub fn new(config: &Config, model: Arc<dyn ChatModel>) -> Self {
        Self {
            data_dir: config.tenant_data_dir.clone(),
            search: config.search.clone(),
            model,
            policy: config.retry,
            databases: ResourceRegistry::new("tenant database"),
            document_indexes: ResourceRegistry::new(IndexKind::Documents.as_str()),
            image_indexes: ResourceRegistry::new(IndexKind::Images.as_str()),
            sql_agents: ResourceRegistry::new("sql agent"),
        }
    }

    pub async fn database(&self, key: &TenantKey) -> Result<Arc<TenantDatabase>, RouterError> {
        with_retry(&self.policy, self.databases.kind(), || {
            self.databases
                .get_or_create(key, || async { TenantDatabase::open(&self.data_dir, key) })
        })
        .await
    }

    pub async fn index(&self, key: &TenantKey, kind: IndexKind) -> Result<Arc<SearchIndexClient>, RouterError> {
        let registry = match kind {
            IndexKind::Documents => &self.document_indexes,
            IndexKind::Images => &self.image_indexes,
        };
        with_retry(&self.policy, registry.kind(), || {
            registry.get_or_create(key, || SearchIndexClient::connect(&self.search, key, kind))
        })
        .await
    }

    pub async fn sql_agent(&self, key: &TenantKey) -> Result<Arc<SqlAgentSession>, RouterError> {
        if let Some(agent) = self.sql_agents.get(key) {
            return Ok(agent);
        }

        let database = self.database(key).await?;
        with_retry(&self.policy, self.sql_agents.kind(), || {
            let database = Arc::clone(&database);
            self.sql_agents.get_or_create(key, || async move {
                SqlAgentSession::build(Arc::clone(&self.model), database)
            })
        })
        .await
    }

    /// Constructed resources per kind, for the health endpoint
    pub fn counts(&self) -> [(&'static str, usize); 4] {
        [
            (self.databases.kind(), self.databases.len()),
            (self.document_indexes.kind(), self.document_indexes.len()),
            (self.image_indexes.kind(), self.image_indexes.len()),
            (self.sql_agents.kind(), self.sql_agents.len()),
        ]
    }
}
