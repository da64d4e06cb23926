pub mod admin;
pub mod books;
pub mod coupons;
pub mod form;
pub mod health;
pub mod locations;
pub mod prints;
pub mod uploads;
pub mod users;

pub use health::health;

use std::collections::HashMap;

use futures::StreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::{Cursor, Database};
use serde::de::DeserializeOwned;

use crate::db::{LISTINGS, USERS};
use crate::errors::{ApiError, ApiResult};
use crate::models::{Listing, User, UserSummary};

/// The authenticated user's document; 404 once the account is gone
pub(crate) async fn load_user(db: &Database, user_id: &str) -> ApiResult<User> {
    let oid = ObjectId::parse_str(user_id).map_err(|_| ApiError::not_found("User not found"))?;
    db.collection::<User>(USERS)
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

pub(crate) async fn collect_all<T>(mut cursor: Cursor<T>) -> ApiResult<Vec<T>>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let mut items = Vec::new();
    while let Some(result) = cursor.next().await {
        items.push(result?);
    }
    Ok(items)
}

fn object_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<ObjectId> {
    let mut oids: Vec<ObjectId> = ids
        .into_iter()
        .filter_map(|id| ObjectId::parse_str(id).ok())
        .collect();
    oids.sort();
    oids.dedup();
    oids
}

/// Contact summaries keyed by user id, fetched in one query
pub(crate) async fn user_summaries<'a>(
    db: &Database,
    ids: impl IntoIterator<Item = &'a str>,
) -> ApiResult<HashMap<String, UserSummary>> {
    let oids = object_ids(ids);
    if oids.is_empty() {
        return Ok(HashMap::new());
    }
    let cursor = db
        .collection::<User>(USERS)
        .find(doc! { "_id": { "$in": oids } })
        .await?;
    Ok(collect_all(cursor)
        .await?
        .iter()
        .map(|user| (user.id_hex(), UserSummary::from(user)))
        .collect())
}

/// Listings keyed by id, fetched in one query
pub(crate) async fn listings_by_id<'a>(
    db: &Database,
    ids: impl IntoIterator<Item = &'a str>,
) -> ApiResult<HashMap<String, Listing>> {
    let oids = object_ids(ids);
    if oids.is_empty() {
        return Ok(HashMap::new());
    }
    let cursor = db
        .collection::<Listing>(LISTINGS)
        .find(doc! { "_id": { "$in": oids } })
        .await?;
    Ok(collect_all(cursor)
        .await?
        .into_iter()
        .filter_map(|listing| listing.id.map(|oid| (oid.to_hex(), listing)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_ids_skip_garbage_and_duplicates() {
        let a = ObjectId::new().to_hex();
        let ids = object_ids([a.as_str(), "not-an-id", a.as_str()]);
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].to_hex(), a);
    }
}
