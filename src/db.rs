use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client, Database, IndexModel};

use crate::config::AppConfig;

pub const USERS: &str = "users";
pub const LISTINGS: &str = "sellbooks";
pub const BOOK_ORDERS: &str = "orderedbooks";
pub const PRINT_ORDERS: &str = "prints";
pub const COUPONS: &str = "coupons";
pub const COUPON_REDEMPTIONS: &str = "couponstatuses";
pub const LOCATIONS: &str = "locations";
pub const PAPERS: &str = "papers";

pub async fn init_db(config: &AppConfig) -> Result<Database, mongodb::error::Error> {
    let client = Client::with_uri_str(&config.mongodb_uri).await?;

    // Ping the database to verify connection
    client
        .database("admin")
        .run_command(doc! {"ping": 1})
        .await?;

    log::info!("Successfully connected to MongoDB ({})", config.database_name);

    Ok(client.database(&config.database_name))
}

fn unique_index(keys: mongodb::bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

/// Unique indexes backing duplicate-user and coupon-reuse checks
pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let users = db.collection::<mongodb::bson::Document>(USERS);
    users.create_index(unique_index(doc! { "email": 1 })).await?;
    users.create_index(unique_index(doc! { "mobile_number": 1 })).await?;

    db.collection::<mongodb::bson::Document>(COUPONS)
        .create_index(unique_index(doc! { "code": 1 }))
        .await?;

    db.collection::<mongodb::bson::Document>(COUPON_REDEMPTIONS)
        .create_index(unique_index(doc! { "user_id": 1, "code": 1 }))
        .await?;

    db.collection::<mongodb::bson::Document>(LISTINGS)
        .create_index(IndexModel::builder().keys(doc! { "user_id": 1 }).build())
        .await?;
    db.collection::<mongodb::bson::Document>(PRINT_ORDERS)
        .create_index(IndexModel::builder().keys(doc! { "user_id": 1, "order_date": -1 }).build())
        .await?;

    log::info!("MongoDB indexes ensured");
    Ok(())
}

/// True when a write failed because of a unique index
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == 11000,
        ErrorKind::Command(e) => e.code == 11000,
        _ => false,
    }
}
