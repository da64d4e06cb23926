/// Saved delivery addresses
use actix_web::{web, HttpResponse};
use mongodb::bson::doc;
use mongodb::Database;
use serde_json::json;
use validator::Validate;

use crate::db::LOCATIONS;
use crate::errors::{ApiError, ApiResult};
use crate::handlers::{collect_all, load_user};
use crate::models::{AddLocationRequest, Location, LocationResponse, User, UserSummary};
use crate::utils::parse_object_id;

fn or_profile(value: &Option<String>, fallback: &str) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn build_location(user: &User, req: &AddLocationRequest) -> Location {
    Location {
        id: None,
        user_id: user.id_hex(),
        name: or_profile(&req.name, &user.fullname),
        mobilenumber: or_profile(&req.mobilenumber, &user.mobile_number),
        state: req.state.trim().to_string(),
        district: req.district.trim().to_string(),
        pincode: req.pincode.trim().to_string(),
        address: req.address.trim().to_string(),
        landmark: req
            .landmark
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string),
    }
}

/// Save a delivery address; name and mobile default to the profile
pub async fn add_location(
    db: web::Data<Database>,
    user_id: web::ReqData<String>,
    req: web::Json<AddLocationRequest>,
) -> ApiResult<HttpResponse> {
    req.validate()?;
    let user = load_user(&db, &user_id).await?;

    let mut location = build_location(&user, &req);
    let result = db.collection::<Location>(LOCATIONS).insert_one(&location).await?;
    location.id = result.inserted_id.as_object_id();

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Location added",
        "location": LocationResponse::from(location),
    })))
}

/// The user's saved addresses
pub async fn my_locations(
    db: web::Data<Database>,
    user_id: web::ReqData<String>,
) -> ApiResult<HttpResponse> {
    let user = load_user(&db, &user_id).await?;

    let cursor = db
        .collection::<Location>(LOCATIONS)
        .find(doc! { "user_id": user_id.as_str() })
        .await?;
    let locations: Vec<LocationResponse> = collect_all(cursor)
        .await?
        .into_iter()
        .map(LocationResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "user": UserSummary::from(&user),
        "locations": locations,
    })))
}

/// Remove one of the user's addresses
pub async fn delete_location(
    db: web::Data<Database>,
    user_id: web::ReqData<String>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let oid = parse_object_id(&path, "location")?;
    let locations = db.collection::<Location>(LOCATIONS);

    let location = locations
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| ApiError::not_found("Location not found"))?;
    if location.user_id != *user_id {
        return Err(ApiError::forbidden("You can only delete your own locations"));
    }

    locations.delete_one(doc! { "_id": oid }).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Location deleted" })))
}
