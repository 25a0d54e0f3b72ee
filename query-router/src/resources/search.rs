//! Search-index accessor for a tenant's documents or image descriptions

use std::time::Duration;

use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::registry::TenantKey;
use crate::config::SearchSettings;
use crate::error::RouterError;
use crate::retry;

const API_VERSION: &str = "2023-11-01";

/// Which corpus of a tenant an index holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Documents,
    Images,
}

impl IndexKind {
    /// Index names allow only lowercase letters, digits and single inner dashes
    pub fn index_name(&self, key: &TenantKey) -> String {
        let mut base = String::with_capacity(key.as_str().len());
        for c in key.as_str().chars() {
            let c = if c == '_' { '-' } else { c.to_ascii_lowercase() };
            if c == '-' && (base.is_empty() || base.ends_with('-')) {
                continue;
            }
            base.push(c);
        }
        let base = base.trim_end_matches('-');
        match self {
            IndexKind::Documents => base.to_string(),
            IndexKind::Images => format!("{}-images", base),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Documents => "document index",
            IndexKind::Images => "image index",
        }
    }
}

/// One retrieved passage
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchHit {
    pub content: String,
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(rename = "@search.score", default)]
    pub score: f64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    value: Vec<SearchHit>,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    search: &'a str,
    top: usize,
    select: &'static str,
}

pub struct SearchIndexClient {
    client: Client,
    endpoint: String,
    index: String,
    top_k: usize,
}

impl SearchIndexClient {
    /// Connect to the tenant's index, creating it on the service when missing
    pub async fn connect(settings: &SearchSettings, key: &TenantKey, kind: IndexKind) -> Result<Self, RouterError> {
        let mut headers = header::HeaderMap::new();
        if let Some(api_key) = settings.api_key.as_deref() {
            let value = header::HeaderValue::from_str(api_key)
                .map_err(|e| RouterError::Config(format!("Invalid search API key: {}", e)))?;
            headers.insert("api-key", value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RouterError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let this = Self {
            client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            index: kind.index_name(key),
            top_k: settings.top_k.max(1),
        };
        this.ensure_index().await?;
        Ok(this)
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    fn index_url(&self) -> String {
        format!("{}/indexes/{}?api-version={}", self.endpoint, self.index, API_VERSION)
    }

    async fn ensure_index(&self) -> Result<(), RouterError> {
        let response = self
            .client
            .get(self.index_url())
            .send()
            .await
            .map_err(|e| retry::from_reqwest_error("Search index lookup failed", e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status != StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(retry::from_status("Search index lookup", status.as_u16(), &body));
        }

        log::info!("[SEARCH] Index '{}' not found, creating it", self.index);
        let definition = json!({
            "name": self.index,
            "fields": [
                { "name": "id", "type": "Edm.String", "key": true },
                { "name": "content", "type": "Edm.String", "searchable": true },
                { "name": "file_id", "type": "Edm.String", "filterable": true },
                { "name": "file_name", "type": "Edm.String" }
            ]
        });

        let response = self
            .client
            .put(self.index_url())
            .json(&definition)
            .send()
            .await
            .map_err(|e| retry::from_reqwest_error("Search index creation failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(retry::from_status("Search index creation", status.as_u16(), &body));
        }
        Ok(())
    }

    /// Top passages for `query`, best first
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, RouterError> {
        let url = format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.endpoint, self.index, API_VERSION
        );
        let request = SearchRequest {
            search: query,
            top: self.top_k,
            select: "content,file_id,file_name",
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| retry::from_reqwest_error("Search request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(retry::from_status("Search", status.as_u16(), &body));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| RouterError::upstream(format!("Failed to parse search response: {}", e)))?;

        log::debug!("[SEARCH] '{}' -> {} hits in {}", query, parsed.value.len(), self.index);
        Ok(parsed.value)
    }
}
