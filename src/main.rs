// Import from library crate
use printkart::config::AppConfig;
use printkart::errors::{json_error_handler, query_error_handler};
use printkart::services::{BlobStore, Mailer, OtpService};
use printkart::{db, routes};

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env();

    // Initialize database
    let db = db::init_db(&config)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to initialize database: {}", e)))?;
    if let Err(e) = db::ensure_indexes(&db).await {
        log::error!("Failed to create indexes: {}", e);
    }

    let store = BlobStore::from_config(&config).map_err(|e| std::io::Error::other(e.to_string()))?;
    let mailer = Mailer::from_config(&config);
    let otp = OtpService::new(config.redis_url.clone());

    log::info!("🚀 Starting server at {}:{}", config.host, config.port);
    log::info!("📁 Storage backend: {}", store.backend_name());
    log::info!("🔒 CORS allowed origins: {:?}", config.cors_origins);

    let bind = (config.host.clone(), config.port);
    let config = web::Data::new(config);
    let db = web::Data::new(db);
    let store = web::Data::new(store);
    let mailer = web::Data::new(mailer);
    let otp = web::Data::new(otp);

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        // Empty list means any origin
        if config.cors_origins.is_empty() {
            cors = cors.allow_any_origin();
        } else {
            for origin in &config.cors_origins {
                cors = cors.allowed_origin(origin);
            }
            cors = cors.supports_credentials();
        }

        App::new()
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .app_data(config.clone())
            .app_data(db.clone())
            .app_data(store.clone())
            .app_data(mailer.clone())
            .app_data(otp.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::QueryConfig::default().error_handler(query_error_handler))
            .configure(routes::configure)
    })
    .bind(bind)?
    .run()
    .await
}
