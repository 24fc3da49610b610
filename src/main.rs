use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;
use std::sync::Arc;

mod api;
mod config;
mod db;
mod docs;
mod engine;
mod error;
mod model;
mod routes;
mod store;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::engine::identity::IdentityResolver;
use crate::engine::{ClockEngine, SystemClock};
use crate::store::mysql::MySqlStore;
use crate::utils::face_cache::{self, FaceCache};
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Attendance clock is running"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "attendance.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(addr = %config.server_addr, prefix = %config.api_prefix, "Server starting...");

    let pool = init_db(&config.database_url).await?;
    let store = Arc::new(MySqlStore::new(pool));

    let faces = FaceCache::new(store.clone(), config.face_cache_ttl());
    let resolver = IdentityResolver::new(store.clone(), faces.clone(), config.face_policy());
    let engine = Data::new(ClockEngine::new(
        resolver,
        store.clone(),
        store,
        Arc::new(SystemClock),
        config.clock_policy(),
    ));

    actix_web::rt::spawn(async move {
        if let Err(e) = face_cache::warmup_face_cache(&faces).await {
            tracing::warn!(error = %e, "Failed to warm up face cache");
        }
    });

    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(engine.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
