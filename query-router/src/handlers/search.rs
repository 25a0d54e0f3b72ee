use std::sync::Arc;

use async_trait::async_trait;

use super::to_execution;
use crate::ai::{ChatModel, Message};
use crate::db::StatusStore;
use crate::error::RouterError;
use crate::models::STATUS_DELETED;
use crate::query::{Category, ExecutionResult, QueryHandler};
use crate::resources::{IndexKind, SearchHit, TenantKey, TenantResources};
use crate::retry::{with_retry, RetryPolicy};

pub const NO_RESULTS_ANSWER: &str = "No results found!";

const ANSWER_PROMPT: &str = "You are an assistant for a real-estate project. Answer the user's \
question using only the context below. If the context does not contain the answer, say that the \
information is not available. Be concise.\n\nContext:\n";

/// Retrieval-augmented answers from a tenant's document or image index
pub struct SearchHandler {
    category: Category,
    kind: IndexKind,
    resources: Arc<TenantResources>,
    model: Arc<dyn ChatModel>,
    status: Arc<dyn StatusStore>,
    policy: RetryPolicy,
}

impl SearchHandler {
    pub fn new(
        category: Category,
        kind: IndexKind,
        resources: Arc<TenantResources>,
        model: Arc<dyn ChatModel>,
        status: Arc<dyn StatusStore>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            category,
            kind,
            resources,
            model,
            status,
            policy,
        }
    }

    async fn answer(&self, tenant: &str, query: &str) -> Result<String, RouterError> {
        let key = TenantKey::parse(tenant)?;
        let index = self.resources.index(&key, self.kind).await?;
        let hits = with_retry(&self.policy, index.index_name(), || index.search(query)).await?;
        let hits = live_hits(self.status.as_ref(), &key, hits)?;

        if hits.is_empty() {
            log::info!("[SEARCH] No passages for '{}' in {}", query, index.index_name());
            return Ok(NO_RESULTS_ANSWER.to_string());
        }

        let messages = vec![
            Message::system(format!("{}{}", ANSWER_PROMPT, build_context(&hits))),
            Message::user(query),
        ];
        with_retry(&self.policy, "search answer", || self.model.complete(messages.clone(), false)).await
    }
}

#[async_trait]
impl QueryHandler for SearchHandler {
    async fn handle(&self, tenant: &str, query: &str) -> Result<ExecutionResult, RouterError> {
        let outcome = self.answer(tenant, query).await;
        Ok(to_execution(self.category, tenant, outcome))
    }
}

/// Drop passages whose source file was deleted
fn live_hits(status: &dyn StatusStore, key: &TenantKey, hits: Vec<SearchHit>) -> Result<Vec<SearchHit>, RouterError> {
    let mut live = Vec::with_capacity(hits.len());
    for hit in hits {
        if let Some(file_id) = hit.file_id.as_deref() {
            let deleted = status
                .find_file(key.as_str(), file_id)?
                .is_some_and(|f| f.status == STATUS_DELETED);
            if deleted {
                continue;
            }
        }
        live.push(hit);
    }
    Ok(live)
}

fn build_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| hit.content.trim())
        .filter(|content| !content.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn hit(content: &str, file_id: Option<&str>) -> SearchHit {
        SearchHit {
            content: content.to_string(),
            file_id: file_id.map(str::to_string),
            file_name: None,
            score: 1.0,
        }
    }

    #[test]
    fn test_deleted_files_are_filtered() {
        let db = Database::in_memory().unwrap();
        let key = TenantKey::parse("proj42").unwrap();
        db.update_file_status("proj42", "old", STATUS_DELETED, None).unwrap();
        db.update_file_status("proj42", "new", "indexed", None).unwrap();

        let hits = vec![
            hit("Old brochure", Some("old")),
            hit("New brochure", Some("new")),
            hit("Untracked", None),
            hit("Unknown file", Some("missing")),
        ];
        let live = live_hits(&db, &key, hits).unwrap();
        let contents: Vec<&str> = live.iter().map(|h| h.content.as_str()).collect();
        assert_eq!(contents, vec!["New brochure", "Untracked", "Unknown file"]);
    }

    #[test]
    fn test_build_context_skips_blank_passages() {
        let hits = vec![hit(" Pool on the roof. ", None), hit("   ", None), hit("Gym on level 2.", None)];
        assert_eq!(build_context(&hits), "Pool on the roof.\nGym on level 2.");
    }
}
