// Common test utilities for server integration tests
#![allow(dead_code, unused_macros)]

use std::env;
use std::time::Duration;

use mongodb::bson::doc;
use mongodb::{Client, Database};
use printkart::config::{AppConfig, JwtSettings};
use printkart::models::Role;
use printkart::utils::create_token;

/// Get MongoDB URL from environment or use default
pub fn get_mongodb_url() -> String {
    env::var("MONGODB_URI").unwrap_or_else(|_| {
        let port = env::var("MONGODB_PORT").unwrap_or_else(|_| "27017".to_string());
        format!("mongodb://127.0.0.1:{}", port)
    })
}

/// Get Redis URL from environment or use default
pub fn get_redis_url() -> String {
    env::var("REDIS_URL").unwrap_or_else(|_| {
        let port = env::var("REDIS_PORT").unwrap_or_else(|_| "6379".to_string());
        format!("redis://127.0.0.1:{}", port)
    })
}

pub fn test_config() -> AppConfig {
    AppConfig::for_tests()
}

/// A client that never connects unless a query runs; auth and validation
/// failures are answered before any query.
pub async fn lazy_db() -> Database {
    let client = Client::with_uri_str("mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200")
        .await
        .expect("lazy client");
    client.database("printkart_unreachable")
}

/// A fresh database on a live MongoDB, or None when none is running
pub async fn live_db() -> Option<Database> {
    let uri = format!("{}/?serverSelectionTimeoutMS=1000", get_mongodb_url().trim_end_matches('/'));
    let client = Client::with_uri_str(&uri).await.ok()?;
    let ping = tokio::time::timeout(
        Duration::from_secs(3),
        client.database("admin").run_command(doc! { "ping": 1 }),
    )
    .await;

    match ping {
        Ok(Ok(_)) => {
            let name = format!("printkart_test_{}", uuid::Uuid::new_v4().simple());
            Some(client.database(&name))
        }
        _ => {
            println!("⚠️  MongoDB not available at {}", get_mongodb_url());
            println!("   This is expected if MongoDB is not running");
            None
        }
    }
}

/// A Redis connection, or None when no server is running
pub async fn live_redis() -> Option<redis::aio::MultiplexedConnection> {
    let client = redis::Client::open(get_redis_url().as_str()).ok()?;
    let conn = tokio::time::timeout(Duration::from_secs(3), client.get_multiplexed_async_connection()).await;
    match conn {
        Ok(Ok(conn)) => Some(conn),
        _ => {
            println!("⚠️  Redis not available at {}", get_redis_url());
            println!("   This is expected if Redis is not running");
            None
        }
    }
}

pub fn token_for(role: Role) -> String {
    let config = test_config();
    create_token("64b7f0c2a1b2c3d4e5f60718", role, &config.jwt).expect("token")
}

pub fn expired_token() -> String {
    let settings = JwtSettings {
        secret: test_config().jwt.secret,
        expiration_secs: -120,
    };
    create_token("64b7f0c2a1b2c3d4e5f60718", Role::User, &settings).expect("token")
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

/// Full route table over the lazy database, or over the given one
macro_rules! test_app {
    () => {{
        let db = common::lazy_db().await;
        test_app!(db)
    }};
    ($db:expr) => {{
        let config = common::test_config();
        let store = printkart::services::BlobStore::from_config(&config).expect("store");
        let mailer = printkart::services::Mailer::from_config(&config);
        let otp = printkart::services::OtpService::new(config.redis_url.clone());
        let db: mongodb::Database = $db;

        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new(config))
                .app_data(actix_web::web::Data::new(db))
                .app_data(actix_web::web::Data::new(store))
                .app_data(actix_web::web::Data::new(mailer))
                .app_data(actix_web::web::Data::new(otp))
                .app_data(
                    actix_web::web::JsonConfig::default()
                        .error_handler(printkart::errors::json_error_handler),
                )
                .configure(printkart::routes::configure),
        )
        .await
    }};
}
