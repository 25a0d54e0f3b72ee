pub mod files;
pub mod health;
pub mod metadata;
pub mod query;

use actix_web::HttpResponse;

use crate::resources::TenantKey;

/// Sanitized key for a project id taken from the path, or a 400 response
pub(crate) fn tenant_key(project_id: &str) -> Result<TenantKey, HttpResponse> {
    TenantKey::parse(project_id).map_err(|e| {
        HttpResponse::BadRequest().json(serde_json::json!({
            "error": e.to_string()
        }))
    })
}

pub(crate) fn storage_error(context: &str, e: impl std::fmt::Display) -> HttpResponse {
    log::error!("{}: {}", context, e);
    HttpResponse::InternalServerError().json(serde_json::json!({
        "error": format!("Database error: {}", e)
    }))
}

#[cfg(test)]
pub(crate) fn test_state(
    replies: &[&str],
    table: crate::query::HandlerTable,
) -> actix_web::web::Data<crate::AppState> {
    use crate::ai::testing::ScriptedModel;
    use crate::config::Config;
    use crate::db::Database;
    use crate::query::{ContextRewriter, Dispatcher, QueryClassifier, QueryRouter};
    use crate::resources::TenantResources;
    use crate::retry::RetryPolicy;
    use std::sync::Arc;

    let model = ScriptedModel::replying(replies);
    let config = Config::from_lookup(|_| None).unwrap();
    let router = QueryRouter::new(
        ContextRewriter::new(model.clone(), RetryPolicy::immediate(1)),
        QueryClassifier::new(model.clone(), RetryPolicy::immediate(1)),
        Dispatcher::new(table, 2),
    );

    actix_web::web::Data::new(crate::AppState {
        db: Arc::new(Database::in_memory().unwrap()),
        resources: Arc::new(TenantResources::new(&config, model)),
        router: Arc::new(router),
        config,
    })
}
