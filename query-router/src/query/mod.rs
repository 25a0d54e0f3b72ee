//! Query pipeline: rewrite, classify, aggregate, dispatch

pub mod aggregator;
pub mod category;
pub mod classifier;
pub mod dispatcher;
pub mod rewriter;
pub mod types;

pub use aggregator::aggregate;
pub use category::{Category, GENERAL_TENANT};
pub use classifier::QueryClassifier;
pub use dispatcher::{handler_fn, Dispatcher, HandlerTable, QueryHandler};
pub use rewriter::ContextRewriter;
pub use types::{AggregatedBatch, ExecutionResult};

use serde::Serialize;

use crate::error::RouterError;
use crate::models::ChatMessage;
use crate::resources::TenantKey;

/// Everything a routed request produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutedAnswer {
    /// The query after context rewriting
    pub query: String,
    pub sub_queries: AggregatedBatch,
    pub answers: Vec<String>,
}

pub struct QueryRouter {
    rewriter: ContextRewriter,
    classifier: QueryClassifier,
    dispatcher: Dispatcher,
}

impl QueryRouter {
    pub fn new(rewriter: ContextRewriter, classifier: QueryClassifier, dispatcher: Dispatcher) -> Self {
        Self {
            rewriter,
            classifier,
            dispatcher,
        }
    }

    /// Answer `raw_query` for `tenant`, all or nothing.
    ///
    /// `history` is the recent chat, oldest first; it may be empty.
    pub async fn route(
        &self,
        tenant: &str,
        raw_query: &str,
        history: &[ChatMessage],
    ) -> Result<RoutedAnswer, RouterError> {
        let key = TenantKey::parse(tenant)?;
        let query = self.rewriter.rewrite(history, raw_query).await;

        let classified = self.classifier.classify(&query).await?;
        if classified.is_empty() {
            log::info!("[ROUTER] No actionable content in '{}' for {}", query, key);
            return Ok(RoutedAnswer {
                query,
                sub_queries: Vec::new(),
                answers: Vec::new(),
            });
        }

        let batch = aggregate(classified);
        let single = match batch.as_slice() {
            [only] => Some(only.category),
            _ => None,
        };

        let outcome = self.dispatcher.execute(batch.clone(), key.as_str()).await?;
        let answers = outcome.into_answers(single)?;

        Ok(RoutedAnswer {
            query,
            sub_queries: batch,
            answers,
        })
    }
}
