//! Dispatch of classified queries to category handlers
//!
//! A batch of one is handled inline on the calling task. Larger batches fan
//! out onto tokio tasks bounded by a semaphore and fan back in; the first
//! failure fails the whole batch.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use strum::IntoEnumIterator;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::category::Category;
use super::types::{AggregatedBatch, ExecutionResult};
use crate::error::RouterError;

/// Answers one classified sub-query for a tenant.
///
/// `Ok` with a failed [`ExecutionResult`] and `Err` are treated the same by
/// the multi-item path.
#[async_trait]
pub trait QueryHandler: Send + Sync {
    async fn handle(&self, tenant: &str, query: &str) -> Result<ExecutionResult, RouterError>;
}

/// Adapts an async closure into a [`QueryHandler`]
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> QueryHandler for FnHandler<F>
where
    F: Fn(String, String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ExecutionResult, RouterError>> + Send,
{
    async fn handle(&self, tenant: &str, query: &str) -> Result<ExecutionResult, RouterError> {
        (self.0)(tenant.to_string(), query.to_string()).await
    }
}

pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn QueryHandler>
where
    F: Fn(String, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ExecutionResult, RouterError>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Category -> handler mapping, fixed at startup
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<Category, Arc<dyn QueryHandler>>,
}

impl HandlerTable {
    pub fn builder() -> HandlerTableBuilder {
        HandlerTableBuilder::default()
    }

    pub fn get(&self, category: Category) -> Result<Arc<dyn QueryHandler>, RouterError> {
        self.handlers
            .get(&category)
            .cloned()
            .ok_or_else(|| RouterError::UnknownCategory(category.to_string()))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }
}

#[derive(Default)]
pub struct HandlerTableBuilder {
    handlers: HashMap<Category, Arc<dyn QueryHandler>>,
}

impl HandlerTableBuilder {
    pub fn register(mut self, category: Category, handler: Arc<dyn QueryHandler>) -> Self {
        self.handlers.insert(category, handler);
        self
    }

    /// Finish registration; every category must have a handler
    pub fn build(self) -> Result<HandlerTable, RouterError> {
        if let Some(missing) = Category::iter().find(|c| !self.handlers.contains_key(c)) {
            return Err(RouterError::UnknownCategory(missing.to_string()));
        }
        Ok(self.build_partial())
    }

    /// Finish registration without the completeness check
    pub fn build_partial(self) -> HandlerTable {
        HandlerTable {
            handlers: self.handlers,
        }
    }
}

/// What [`Dispatcher::execute`] produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The single handler's result, passed through unchanged
    Single(ExecutionResult),
    /// Answers of every task in submission order
    Multi(Vec<String>),
}

impl DispatchOutcome {
    /// Answers as a list, turning a failed single result into an error
    pub fn into_answers(self, category: Option<Category>) -> Result<Vec<String>, RouterError> {
        match self {
            DispatchOutcome::Single(result) => result.into_result().map(|a| vec![a]).map_err(|reason| {
                RouterError::handler_failure(
                    category.map(|c| c.to_string()).unwrap_or_default(),
                    reason,
                )
            }),
            DispatchOutcome::Multi(answers) => Ok(answers),
        }
    }
}

pub struct Dispatcher {
    handlers: HandlerTable,
    max_workers: usize,
}

impl Dispatcher {
    pub fn new(handlers: HandlerTable, max_workers: usize) -> Self {
        Self {
            handlers,
            max_workers: max_workers.max(1),
        }
    }

    pub async fn execute(
        &self,
        batch: AggregatedBatch,
        tenant: &str,
    ) -> Result<DispatchOutcome, RouterError> {
        if batch.len() == 1 {
            let query = &batch[0];
            let handler = self.handlers.get(query.category)?;
            let tenant = query.category.fixed_tenant().unwrap_or(tenant);
            log::info!("[DISPATCH] {} -> {} (inline)", tenant, query.category);
            return handler.handle(tenant, &query.text).await.map(DispatchOutcome::Single);
        }

        // Resolve every handler before anything runs
        let mut resolved = Vec::with_capacity(batch.len());
        for query in batch {
            resolved.push((self.handlers.get(query.category)?, query));
        }

        let total = resolved.len();
        let permits = Arc::new(Semaphore::new(self.max_workers));
        let mut tasks = JoinSet::new();

        for (index, (handler, query)) in resolved.into_iter().enumerate() {
            let permits = Arc::clone(&permits);
            let tenant = query.category.fixed_tenant().unwrap_or(tenant).to_string();
            tasks.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => handler.handle(&tenant, &query.text).await,
                    Err(e) => Err(RouterError::handler_failure(query.category.to_string(), e.to_string())),
                };
                (index, query.category, result)
            });
        }

        log::info!("[DISPATCH] {} -> {} tasks (max {} concurrent)", tenant, total, self.max_workers);

        let mut answers: Vec<Option<String>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok((index, category, Ok(result))) => match result.into_result() {
                    Ok(answer) => {
                        answers[index] = Some(answer);
                        continue;
                    }
                    Err(reason) => RouterError::handler_failure(category.to_string(), reason),
                },
                Ok((_, _, Err(e @ RouterError::HandlerFailure { .. }))) => e,
                Ok((_, category, Err(e))) => RouterError::handler_failure(category.to_string(), e.to_string()),
                Err(e) => RouterError::handler_failure("unknown", format!("task failed: {}", e)),
            };

            // Remaining tasks run to completion; their results are dropped
            tasks.detach_all();
            log::error!("[DISPATCH] {} aborting batch: {}", tenant, failure);
            return Err(failure);
        }

        Ok(DispatchOutcome::Multi(answers.into_iter().flatten().collect()))
    }
}
