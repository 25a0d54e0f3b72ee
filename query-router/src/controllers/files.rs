use actix_web::{web, HttpResponse, Responder};

use super::{storage_error, tenant_key};
use crate::db::StatusStore;
use crate::models::UpdateFileStatusRequest;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/files/{project_id}").route(web::get().to(list_files)));
    cfg.service(
        web::resource("/api/files/{project_id}/{file_id}")
            .route(web::get().to(get_file))
            .route(web::put().to(update_file))
            .route(web::delete().to(delete_file)),
    );
}

async fn list_files(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let key = match tenant_key(&path.into_inner()) {
        Ok(key) => key,
        Err(resp) => return resp,
    };

    match data.db.list_project_files(key.as_str()) {
        Ok(files) => HttpResponse::Ok().json(files),
        Err(e) => storage_error("Failed to list files", e),
    }
}

async fn get_file(data: web::Data<AppState>, path: web::Path<(String, String)>) -> impl Responder {
    let (project_id, file_id) = path.into_inner();
    let key = match tenant_key(&project_id) {
        Ok(key) => key,
        Err(resp) => return resp,
    };

    match data.db.find_file(key.as_str(), &file_id) {
        Ok(Some(file)) => HttpResponse::Ok().json(file),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("File {} not found in project {}", file_id, project_id)
        })),
        Err(e) => storage_error("Failed to get file", e),
    }
}

async fn update_file(
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Json<UpdateFileStatusRequest>,
) -> impl Responder {
    let (project_id, file_id) = path.into_inner();
    let key = match tenant_key(&project_id) {
        Ok(key) => key,
        Err(resp) => return resp,
    };

    match data
        .db
        .update_file_status(key.as_str(), &file_id, &body.status, body.file_name.as_deref())
    {
        Ok(file) => HttpResponse::Ok().json(file),
        Err(e) => storage_error("Failed to update file status", e),
    }
}

async fn delete_file(data: web::Data<AppState>, path: web::Path<(String, String)>) -> impl Responder {
    let (project_id, file_id) = path.into_inner();
    let key = match tenant_key(&project_id) {
        Ok(key) => key,
        Err(resp) => return resp,
    };

    match data.db.delete_file(key.as_str(), &file_id) {
        Ok(true) => {
            log::info!("Deleted file {} from project {}", file_id, key);
            HttpResponse::Ok().json(serde_json::json!({
                "message": format!("File {} deleted", file_id)
            }))
        }
        Ok(false) => HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("File {} not found in project {}", file_id, project_id)
        })),
        Err(e) => storage_error("Failed to delete file", e),
    }
}
