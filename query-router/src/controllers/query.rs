use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::ChatRole;
use crate::query::rewriter::HISTORY_WINDOW;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/run_user_query/query").route(web::post().to(run_user_query)));
}

#[derive(Debug, Deserialize)]
pub struct UserQueryRequest {
    pub project_id: String,
    pub query: String,
    #[serde(default)]
    pub chat_id: Option<String>,
}

/// Accepts the request as a form or as JSON
async fn run_user_query(
    data: web::Data<AppState>,
    body: web::Either<web::Json<UserQueryRequest>, web::Form<UserQueryRequest>>,
) -> impl Responder {
    let request = match body {
        web::Either::Left(json) => json.into_inner(),
        web::Either::Right(form) => form.into_inner(),
    };
    let request_id = Uuid::new_v4().to_string();
    let chat_id = request.chat_id.as_deref().filter(|id| !id.trim().is_empty());

    log::info!(
        "[QUERY] {} project={} chat={:?} query='{}'",
        request_id,
        request.project_id,
        chat_id,
        request.query
    );

    let history = match chat_id {
        Some(chat_id) => data
            .db
            .get_recent_chat_messages(chat_id, HISTORY_WINDOW)
            .unwrap_or_else(|e| {
                log::warn!("[QUERY] {} could not load chat history: {}", request_id, e);
                Vec::new()
            }),
        None => Vec::new(),
    };

    match data.router.route(&request.project_id, &request.query, &history).await {
        Ok(routed) => {
            log::info!(
                "[QUERY] {} answered {} sub-queries",
                request_id,
                routed.sub_queries.len()
            );

            if let Some(chat_id) = chat_id {
                let saved = data
                    .db
                    .add_chat_message(chat_id, ChatRole::User, &request.query)
                    .and_then(|_| data.db.add_chat_message(chat_id, ChatRole::Bot, &routed.answers.join("\n")));
                if let Err(e) = saved {
                    log::warn!("[QUERY] {} could not save chat history: {}", request_id, e);
                }
            }

            HttpResponse::Ok().json(serde_json::json!({
                "message": format!("Query {} ran successfully on {} database.", request.query, request.project_id),
                "request_id": request_id,
                "result": routed.answers
            }))
        }
        Err(e) => {
            log::error!("[QUERY] {} failed: {}", request_id, e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "message": format!("Error running query {} on {} database: {}", request.query, request.project_id, e),
                "request_id": request_id
            }))
        }
    }
}
