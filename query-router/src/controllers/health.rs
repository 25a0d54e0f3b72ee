use actix_web::{web, HttpResponse, Responder};

use crate::AppState;

/// Version from Cargo.toml, available at compile time
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/health").route(web::get().to(health_check)));
    cfg.service(web::resource("/api/version").route(web::get().to(get_version)));
}

async fn health_check(data: web::Data<AppState>) -> impl Responder {
    let resources: serde_json::Map<String, serde_json::Value> = data
        .resources
        .counts()
        .into_iter()
        .map(|(kind, count)| (kind.to_string(), count.into()))
        .collect();

    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "version": VERSION,
        "dispatch_max_workers": data.config.dispatch_max_workers,
        "resources": resources
    }))
}

async fn get_version() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "version": VERSION
    }))
}
