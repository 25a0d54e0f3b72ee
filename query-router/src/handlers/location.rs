use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use strum::IntoEnumIterator;

use super::to_execution;
use crate::ai::{strip_code_fence, ChatModel, Message};
use crate::db::Database;
use crate::error::RouterError;
use crate::models::MetadataCategory;
use crate::query::{Category, ExecutionResult, QueryHandler};
use crate::resources::TenantKey;
use crate::retry::{with_retry, RetryPolicy};

const ANSWER_PROMPT: &str = "You answer questions about the surroundings of a real-estate project \
(air quality, schools, hospitals, landmarks, restaurants, shopping, distances) using only the \
project data given with the question. If the data does not contain the answer, reply \
'No results found!'.";

#[derive(Debug, Deserialize)]
struct PickedCategory {
    category: String,
}

/// Answers location questions from stored project metadata
pub struct LocationMetadataHandler {
    model: Arc<dyn ChatModel>,
    db: Arc<Database>,
    policy: RetryPolicy,
}

impl LocationMetadataHandler {
    pub fn new(model: Arc<dyn ChatModel>, db: Arc<Database>, policy: RetryPolicy) -> Self {
        Self { model, db, policy }
    }

    async fn pick_category(&self, query: &str) -> Result<MetadataCategory, RouterError> {
        let names = MetadataCategory::iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let system = format!(
            "Identify which kind of location data the user query is about, one of: {}. \
             Respond with a JSON object: {{\"category\": \"<category>\"}}. No explanation.",
            names
        );

        with_retry(&self.policy, "metadata category", || async {
            let content = self
                .model
                .complete(vec![Message::system(system.as_str()), Message::user(query)], true)
                .await?;
            let picked: PickedCategory = serde_json::from_str(strip_code_fence(&content))
                .map_err(|e| RouterError::retryable(format!("malformed category reply: {}", e)))?;
            MetadataCategory::from_str(picked.category.trim())
                .map_err(|_| RouterError::retryable(format!("unknown metadata category '{}'", picked.category)))
        })
        .await
    }

    async fn answer(&self, tenant: &str, query: &str) -> Result<String, RouterError> {
        let key = TenantKey::parse(tenant)?;
        let category = self.pick_category(query).await?;
        log::info!("[METADATA] '{}' -> {}", query, category);

        let data = self
            .db
            .get_project_metadata(key.as_str(), category)?
            .ok_or_else(|| RouterError::upstream(format!("no {} data stored for project '{}'", category, key)))?;

        let user = format!("{}\n\nProject data ({}):\n{}", query, category, data);
        with_retry(&self.policy, "metadata answer", || {
            self.model
                .complete(vec![Message::system(ANSWER_PROMPT), Message::user(user.as_str())], false)
        })
        .await
    }
}

#[async_trait]
impl QueryHandler for LocationMetadataHandler {
    async fn handle(&self, tenant: &str, query: &str) -> Result<ExecutionResult, RouterError> {
        let outcome = self.answer(tenant, query).await;
        Ok(to_execution(Category::LocationMetadata, tenant, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedModel;
    use serde_json::json;

    fn db_with_schools() -> Arc<Database> {
        let db = Database::in_memory().unwrap();
        db.set_project_metadata(
            "proj42",
            MetadataCategory::Education,
            &json!([{"name": "Green Valley School", "distance_km": 0.8}]),
        )
        .unwrap();
        Arc::new(db)
    }

    #[tokio::test]
    async fn test_answers_from_stored_metadata() {
        let model = ScriptedModel::replying(&[
            r#"{"category": "education"}"#,
            "Yes, Green Valley School is 0.8 km away.",
        ]);
        let handler = LocationMetadataHandler::new(model.clone(), db_with_schools(), RetryPolicy::immediate(2));

        let result = handler.handle("proj42", "Is unit 103 near a school?").await.unwrap();
        assert_eq!(result.answer(), Some("Yes, Green Valley School is 0.8 km away."));
        assert!(model.user_message(1).unwrap().contains("Green Valley School"));
    }

    #[tokio::test]
    async fn test_unknown_category_is_retried() {
        let model = ScriptedModel::replying(&[
            r#"{"category": "schools"}"#,
            r#"{"category": "education"}"#,
            "Green Valley School.",
        ]);
        let handler = LocationMetadataHandler::new(model.clone(), db_with_schools(), RetryPolicy::immediate(3));

        let result = handler.handle("proj42", "Nearest school?").await.unwrap();
        assert!(result.is_success());
        assert_eq!(model.calls(), 3);
    }

    #[tokio::test]
    async fn test_missing_metadata_is_a_failure() {
        let model = ScriptedModel::replying(&[r#"{"category": "healthcare"}"#]);
        let handler = LocationMetadataHandler::new(model.clone(), db_with_schools(), RetryPolicy::immediate(2));

        let result = handler.handle("proj42", "Is there a hospital nearby?").await.unwrap();
        assert!(!result.is_success());
        assert!(result.failure_reason().unwrap().contains("healthcare"));
        assert_eq!(model.calls(), 1);
    }
}
