//! Per-request query types

use serde::{Deserialize, Serialize};

use super::category::Category;

/// One self-contained sub-query and the category it was assigned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedQuery {
    pub text: String,
    pub category: Category,
}

impl ClassifiedQuery {
    pub fn new(text: impl Into<String>, category: Category) -> Self {
        Self {
            text: text.into(),
            category,
        }
    }
}

/// Dispatch units produced by the aggregator
pub type AggregatedBatch = Vec<ClassifiedQuery>;

/// Outcome of one handler invocation.
///
/// Exactly one of `answer` / `failure_reason` is set, matching `success`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_reason: Option<String>,
}

impl ExecutionResult {
    pub fn answered(answer: impl Into<String>) -> Self {
        Self {
            success: true,
            answer: Some(answer.into()),
            failure_reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            answer: None,
            failure_reason: Some(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Split into the answer or the failure reason
    pub fn into_result(self) -> Result<String, String> {
        if self.success {
            Ok(self.answer.unwrap_or_default())
        } else {
            Err(self.failure_reason.unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_result_invariant() {
        let ok = ExecutionResult::answered("42");
        assert!(ok.is_success());
        assert_eq!(ok.answer(), Some("42"));
        assert_eq!(ok.failure_reason(), None);

        let err = ExecutionResult::failed("index missing");
        assert!(!err.is_success());
        assert_eq!(err.answer(), None);
        assert_eq!(err.into_result(), Err("index missing".to_string()));
    }

    #[test]
    fn test_failed_result_serialization_omits_answer() {
        let json = serde_json::to_value(ExecutionResult::failed("boom")).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("answer").is_none());
        assert_eq!(json["failure_reason"], "boom");
    }
}
