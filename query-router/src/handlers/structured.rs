use std::sync::Arc;

use async_trait::async_trait;

use super::to_execution;
use crate::error::RouterError;
use crate::query::{Category, ExecutionResult, QueryHandler};
use crate::resources::{TenantKey, TenantResources};
use crate::retry::{with_retry, RetryPolicy};

/// Answers unit-level questions with the tenant's SQL agent
pub struct StructuredDataHandler {
    resources: Arc<TenantResources>,
    policy: RetryPolicy,
}

impl StructuredDataHandler {
    pub fn new(resources: Arc<TenantResources>, policy: RetryPolicy) -> Self {
        Self { resources, policy }
    }

    async fn answer(&self, tenant: &str, query: &str) -> Result<String, RouterError> {
        let key = TenantKey::parse(tenant)?;
        let agent = self.resources.sql_agent(&key).await?;
        with_retry(&self.policy, "sql agent", || agent.answer(query)).await
    }
}

#[async_trait]
impl QueryHandler for StructuredDataHandler {
    async fn handle(&self, tenant: &str, query: &str) -> Result<ExecutionResult, RouterError> {
        let outcome = self.answer(tenant, query).await;
        Ok(to_execution(Category::StructuredData, tenant, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedModel;
    use crate::config::Config;
    use crate::resources::TenantDatabase;
    use tempfile::TempDir;

    fn resources(dir: &TempDir, model: Arc<ScriptedModel>) -> Arc<TenantResources> {
        let data_dir = dir.path().to_string_lossy().into_owned();
        let config = Config::from_lookup(|key| (key == "TENANT_DATA_DIR").then(|| data_dir.clone())).unwrap();
        Arc::new(TenantResources::new(&config, model))
    }

    fn seed_units(dir: &TempDir) {
        let key = TenantKey::parse("proj42").unwrap();
        let db = TenantDatabase::open(dir.path(), &key).unwrap();
        db.seed(
            "CREATE TABLE units (unit TEXT, price INTEGER);
             INSERT INTO units VALUES ('103', 500000);",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_answers_from_tenant_database() {
        let dir = TempDir::new().unwrap();
        seed_units(&dir);
        let model = ScriptedModel::replying(&[
            r#"{"sql": "SELECT price FROM units WHERE unit = '103'"}"#,
            "Unit 103 is priced at $500,000.",
        ]);
        let handler = StructuredDataHandler::new(resources(&dir, model), RetryPolicy::immediate(1));

        let result = handler.handle("proj42", "What is the price of unit 103?").await.unwrap();
        assert_eq!(result.answer(), Some("Unit 103 is priced at $500,000."));
    }

    #[tokio::test]
    async fn test_write_statement_is_a_failure() {
        let dir = TempDir::new().unwrap();
        seed_units(&dir);
        let model = ScriptedModel::replying(&[r#"{"sql": "UPDATE units SET price = 1"}"#]);
        let handler = StructuredDataHandler::new(resources(&dir, model.clone()), RetryPolicy::immediate(3));

        let result = handler.handle("proj42", "Make unit 103 free").await.unwrap();
        assert!(!result.is_success());
        assert!(result.failure_reason().unwrap().contains("SELECT"));
        // terminal, so not retried
        assert_eq!(model.calls(), 1);
    }
}
