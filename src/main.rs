// src/main.rs
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use log::{error, info};

use yatube_api::config::{self, Settings, StorageKind};
use yatube_api::fixtures::Fixtures;
use yatube_api::repositories::{MemoryStore, PgStore, Store};
use yatube_api::services::media_service::MediaStorage;
use yatube_api::{AppState, routes};

async fn build_store(settings: &Settings) -> anyhow::Result<Arc<dyn Store>> {
    match (settings.storage, &settings.postgres) {
        (StorageKind::Postgres, Some(pg)) => {
            info!("Using PostgreSQL at {}/{}", pg.host, pg.dbname);
            let store = PgStore::new(config::get_pg_pool(pg)?);
            store.migrate().await?;
            Ok(Arc::new(store))
        }
        _ => {
            info!("Using in-memory storage");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };
    info!("JWT secret loaded ({})", settings.jwt_secret_summary());

    let store = match build_store(&settings).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to set up storage: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Some(path) = &settings.fixtures {
        let loaded = match Fixtures::read(path).await {
            Ok(fixtures) => fixtures.load(store.as_ref()).await,
            Err(e) => Err(e),
        };
        if let Err(e) = loaded {
            error!("Failed to load fixtures: {:#}", e);
            std::process::exit(1);
        }
    }

    let media = MediaStorage::new(settings.media_root.clone(), &settings.media_url);
    let media_url = media.url_prefix().to_string();
    let state = web::Data::new(AppState {
        store,
        media,
        jwt_secret: settings.jwt_secret.clone(),
    });

    let allowed_origins = settings.allowed_origins.clone();
    let bind_address = format!("0.0.0.0:{}", settings.port);
    info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                "authorization",
                "content-type",
                "accept",
                "x-requested-with"
            ])
            .supports_credentials()
            .max_age(3600);

        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(|cfg| routes(cfg, &media_url))
    })
    .bind(&bind_address)?
    .run()
    .await
}
