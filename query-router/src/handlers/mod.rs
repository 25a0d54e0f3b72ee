//! Category handlers
//!
//! Each handler answers one classified sub-query for a tenant. Failures of
//! their own collaborators are reported as a failed [`ExecutionResult`] with a
//! reason rather than as an error.

pub mod location;
pub mod search;
pub mod structured;

use std::sync::Arc;

use async_trait::async_trait;
use strum::IntoEnumIterator;

use crate::ai::ChatModel;
use crate::db::{Database, StatusStore};
use crate::error::RouterError;
use crate::query::{Category, ExecutionResult, HandlerTable, QueryHandler};
use crate::resources::{IndexKind, TenantResources};
use crate::retry::RetryPolicy;

pub use location::LocationMetadataHandler;
pub use search::SearchHandler;
pub use structured::StructuredDataHandler;

pub const OUT_OF_SCOPE_ANSWER: &str = "The query is out of scope for this project.";

/// Shared collaborators handed to every handler
#[derive(Clone)]
pub struct HandlerDeps {
    pub resources: Arc<TenantResources>,
    pub model: Arc<dyn ChatModel>,
    pub db: Arc<Database>,
    pub policy: RetryPolicy,
}

/// Register a handler for every category
pub fn default_handler_table(deps: &HandlerDeps) -> Result<HandlerTable, RouterError> {
    let mut builder = HandlerTable::builder();

    for category in Category::iter() {
        let handler: Arc<dyn QueryHandler> = match category {
            Category::StructuredData => Arc::new(StructuredDataHandler::new(
                Arc::clone(&deps.resources),
                deps.policy,
            )),
            Category::Document | Category::GeneralKnowledge => Arc::new(SearchHandler::new(
                category,
                IndexKind::Documents,
                Arc::clone(&deps.resources),
                Arc::clone(&deps.model),
                Arc::clone(&deps.db) as Arc<dyn StatusStore>,
                deps.policy,
            )),
            Category::Image => Arc::new(SearchHandler::new(
                category,
                IndexKind::Images,
                Arc::clone(&deps.resources),
                Arc::clone(&deps.model),
                Arc::clone(&deps.db) as Arc<dyn StatusStore>,
                deps.policy,
            )),
            Category::LocationMetadata => Arc::new(LocationMetadataHandler::new(
                Arc::clone(&deps.model),
                Arc::clone(&deps.db),
                deps.policy,
            )),
            Category::OutOfScope => Arc::new(OutOfScopeHandler),
        };
        builder = builder.register(category, handler);
    }

    builder.build()
}

/// Turn a handler's own outcome into the dispatch contract
pub(crate) fn to_execution(category: Category, tenant: &str, outcome: Result<String, RouterError>) -> ExecutionResult {
    match outcome {
        Ok(answer) => ExecutionResult::answered(answer),
        Err(e) => {
            log::warn!("[HANDLER] {} failed for tenant '{}': {}", category, tenant, e);
            ExecutionResult::failed(format!("Failure in {} handler: {}", category, e))
        }
    }
}

pub struct OutOfScopeHandler;

#[async_trait]
impl QueryHandler for OutOfScopeHandler {
    async fn handle(&self, _tenant: &str, _query: &str) -> Result<ExecutionResult, RouterError> {
        Ok(ExecutionResult::answered(OUT_OF_SCOPE_ANSWER))
    }
}
