//! Query decomposition and classification
//!
//! A single model call splits a raw request into the fewest self-contained
//! sub-queries and assigns each one a [`Category`]. The model must answer with
//!
//! ```text
//! { "result": [ { "query": "...", "category": "..." }, ... ] }
//! ```
//!
//! Anything else (transport failure, bad JSON, an unknown category) is a
//! [`RouterError::Classification`], which the retry policy treats as transient.

use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Deserialize;
use strum::IntoEnumIterator;

use super::category::Category;
use super::types::ClassifiedQuery;
use crate::ai::{strip_code_fence, ChatModel, Message};
use crate::error::RouterError;
use crate::retry::{with_retry, RetryPolicy};

static SYSTEM_PROMPT: Lazy<String> = Lazy::new(build_system_prompt);

#[derive(Debug, Deserialize)]
struct RawClassification {
    result: Vec<RawSubQuery>,
}

#[derive(Debug, Deserialize)]
struct RawSubQuery {
    query: String,
    category: String,
}

pub struct QueryClassifier {
    model: Arc<dyn ChatModel>,
    policy: RetryPolicy,
}

impl QueryClassifier {
    pub fn new(model: Arc<dyn ChatModel>, policy: RetryPolicy) -> Self {
        Self { model, policy }
    }

    /// Split `raw_query` into classified sub-queries.
    ///
    /// A blank request, or a model reply with an empty `result`, yields an
    /// empty list rather than an error.
    pub async fn classify(&self, raw_query: &str) -> Result<Vec<ClassifiedQuery>, RouterError> {
        let raw_query = raw_query.trim();
        if raw_query.is_empty() {
            return Ok(Vec::new());
        }

        let queries = with_retry(&self.policy, "classify", || self.classify_once(raw_query)).await?;

        log::info!(
            "[CLASSIFIER] '{}' -> {} sub-queries: {}",
            raw_query,
            queries.len(),
            queries
                .iter()
                .map(|q| format!("{} ({})", q.text, q.category))
                .collect::<Vec<_>>()
                .join(" | ")
        );

        Ok(queries)
    }

    async fn classify_once(&self, raw_query: &str) -> Result<Vec<ClassifiedQuery>, RouterError> {
        let messages = vec![
            Message::system(SYSTEM_PROMPT.as_str()),
            Message::user(raw_query),
        ];

        let content = self
            .model
            .complete(messages, true)
            .await
            .map_err(|e| RouterError::classification(format!("classification call failed: {}", e)))?;

        parse_classification(&content)
    }
}

/// Parse the model's reply into classified sub-queries
pub fn parse_classification(content: &str) -> Result<Vec<ClassifiedQuery>, RouterError> {
    let raw: RawClassification = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| RouterError::classification(format!("malformed classification: {}", e)))?;

    raw.result
        .into_iter()
        .map(|item| {
            let text = item.query.trim();
            if text.is_empty() {
                return Err(RouterError::classification("sub-query with empty text"));
            }
            let category = Category::from_str(item.category.trim()).map_err(|_| {
                RouterError::classification(format!("unknown category '{}'", item.category))
            })?;
            Ok(ClassifiedQuery::new(text, category))
        })
        .collect()
}

fn build_system_prompt() -> String {
    let mut prompt = String::from(
        "Analyze the given query and break it down into granular, self-sufficient queries only \
         when necessary for independent handling. Combine closely related parts of the query \
         when they share context; do not over-split. Each resulting query must be understandable \
         on its own: replace pronouns and implicit references with the entity they refer to \
         (for example \"Is it near a school?\" after \"What is the price of unit 103?\" becomes \
         \"Is unit 103 near a school?\").\n\n\
         Then classify each query into exactly one of the following categories:\n",
    );

    for category in Category::iter() {
        prompt.push_str(&format!("\n- '{}' if {}.\n", category, category.description()));
        prompt.push_str("  Some example queries:\n");
        for (i, example) in category.examples().iter().enumerate() {
            prompt.push_str(&format!("  {}. {}\n", i + 1, example));
        }
    }

    prompt.push_str(
        "\nRespond with a JSON object in the following format:\n\
         {\n  \"result\": [\n    { \"query\": \"<self-sufficient query>\", \"category\": \"<category>\" }\n  ]\n}\n\
         If the input carries no actionable question, respond with {\"result\": []}.\n\
         Do not provide any explanation or additional information in your response.",
    );
    prompt
}
