use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;

mod ai;
mod config;
mod controllers;
mod db;
mod error;
mod handlers;
mod models;
mod query;
mod resources;
mod retry;

use ai::{ChatModel, OpenAiChatClient};
use config::Config;
use db::Database;
use handlers::HandlerDeps;
use query::{ContextRewriter, Dispatcher, QueryClassifier, QueryRouter};
use resources::TenantResources;

pub struct AppState {
    pub db: Arc<Database>,
    pub config: Config,
    pub router: Arc<QueryRouter>,
    pub resources: Arc<TenantResources>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env().expect("Invalid configuration");
    let port = config.port;

    log::info!("Initializing database at {}", config.database_url);
    let db = Database::new(&config.database_url).expect("Failed to initialize database");
    let db = Arc::new(db);

    let client = OpenAiChatClient::new(&config.llm).expect("Failed to create LLM client");
    log::info!("Using model {} at {}", client.model(), config.llm.endpoint);
    let model: Arc<dyn ChatModel> = Arc::new(client);

    log::info!("Tenant data directory: {}", config.tenant_data_dir.display());
    let resources = Arc::new(TenantResources::new(&config, Arc::clone(&model)));

    let deps = HandlerDeps {
        resources: Arc::clone(&resources),
        model: Arc::clone(&model),
        db: Arc::clone(&db),
        policy: config.retry,
    };
    let handler_table = handlers::default_handler_table(&deps).expect("Handler table is incomplete");
    log::info!("Registered {} category handlers", handler_table.len());

    let router = Arc::new(QueryRouter::new(
        ContextRewriter::new(Arc::clone(&model), config.retry),
        QueryClassifier::new(Arc::clone(&model), config.retry),
        Dispatcher::new(handler_table, config.dispatch_max_workers),
    ));
    log::info!(
        "Retry policy: {} attempts, {:?}..{:?}; dispatch pool of {}",
        config.retry.max_attempts,
        config.retry.min_delay,
        config.retry.max_delay,
        config.dispatch_max_workers
    );

    log::info!("Starting query router on port {}", port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(AppState {
                db: Arc::clone(&db),
                config: config.clone(),
                router: Arc::clone(&router),
                resources: Arc::clone(&resources),
            }))
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config)
            .configure(controllers::query::config)
            .configure(controllers::files::config)
            .configure(controllers::metadata::config)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
