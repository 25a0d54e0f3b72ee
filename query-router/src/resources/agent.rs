//! SQL agent session bound to one tenant database

use std::sync::Arc;

use serde::Deserialize;

use super::database::TenantDatabase;
use crate::ai::{strip_code_fence, ChatModel, Message};
use crate::error::RouterError;

#[derive(Debug, Deserialize)]
struct GeneratedSql {
    sql: String,
}

pub struct SqlAgentSession {
    model: Arc<dyn ChatModel>,
    database: Arc<TenantDatabase>,
}

impl SqlAgentSession {
    /// Bind `model` to `database`; the database must be readable
    pub fn build(model: Arc<dyn ChatModel>, database: Arc<TenantDatabase>) -> Result<Self, RouterError> {
        if database.schema_description()?.is_empty() {
            log::warn!("[SQL_AGENT] Tenant '{}' has no tables yet", database.key());
        }
        Ok(Self { model, database })
    }

    /// Current tables of the tenant database, read on every call
    pub fn schema(&self) -> Result<String, RouterError> {
        self.database.schema_description()
    }

    /// Answer `question` with one read-only query over the tenant data
    pub async fn answer(&self, question: &str) -> Result<String, RouterError> {
        let sql = self.generate_sql(question).await?;
        log::info!("[SQL_AGENT] {} -> {}", self.database.key(), sql);

        let rows = self.database.run_select(&sql)?;

        let system = "You answer questions about a real-estate project from SQL query results. \
                      Use only the rows given. If they do not contain the answer, say so plainly.";
        let user = format!(
            "Question: {}\n\nSQL: {}\n\nRows:\n{}",
            question,
            sql,
            rows.to_prompt_text()
        );
        self.model
            .complete(vec![Message::system(system), Message::user(user)], false)
            .await
    }

    async fn generate_sql(&self, question: &str) -> Result<String, RouterError> {
        let schema = self.schema()?;
        let system = format!(
            "You write SQLite queries. The database has these tables:\n{}\n\n\
             Write a single SELECT statement that answers the user's question. \
             Never modify data. Respond with a JSON object: {{\"sql\": \"<statement>\"}}.",
            schema
        );
        let content = self
            .model
            .complete(vec![Message::system(system), Message::user(question)], true)
            .await?;

        let parsed: GeneratedSql = serde_json::from_str(strip_code_fence(&content))
            .map_err(|e| RouterError::upstream(format!("malformed SQL reply: {}", e)))?;

        let sql = parsed.sql.trim().trim_end_matches(';').trim().to_string();
        let head = sql.split_whitespace().next().unwrap_or_default().to_ascii_uppercase();
        if head != "SELECT" && head != "WITH" {
            return Err(RouterError::upstream(format!("only SELECT statements are allowed, got: {}", sql)));
        }
        Ok(sql)
    }
}
