use std::str::FromStr;

use actix_web::{web, HttpResponse, Responder};

use super::{storage_error, tenant_key};
use crate::models::MetadataCategory;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/metadata/{project_id}/{category}")
            .route(web::get().to(get_metadata))
            .route(web::put().to(put_metadata)),
    );
}

fn parse_category(raw: &str) -> Result<MetadataCategory, HttpResponse> {
    MetadataCategory::from_str(raw).map_err(|_| {
        HttpResponse::BadRequest().json(serde_json::json!({
            "error": format!("Unknown metadata category: {}", raw)
        }))
    })
}

async fn get_metadata(data: web::Data<AppState>, path: web::Path<(String, String)>) -> impl Responder {
    let (project_id, category) = path.into_inner();
    let (key, category) = match (tenant_key(&project_id), parse_category(&category)) {
        (Ok(key), Ok(category)) => (key, category),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    match data.db.get_project_metadata(key.as_str(), category) {
        Ok(Some(value)) => HttpResponse::Ok().json(value),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("No {} data for project {}", category, project_id)
        })),
        Err(e) => storage_error("Failed to get metadata", e),
    }
}

async fn put_metadata(
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Json<serde_json::Value>,
) -> impl Responder {
    let (project_id, category) = path.into_inner();
    let (key, category) = match (tenant_key(&project_id), parse_category(&category)) {
        (Ok(key), Ok(category)) => (key, category),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    match data.db.set_project_metadata(key.as_str(), category, &body) {
        Ok(()) => {
            log::info!("Stored {} metadata for project {}", category, key);
            HttpResponse::Ok().json(serde_json::json!({
                "message": format!("Stored {} data for project {}", category, project_id)
            }))
        }
        Err(e) => storage_error("Failed to store metadata", e),
    }
}
