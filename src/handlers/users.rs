/// Account handlers: register, login, profile, password reset and "my ..." listings
use actix_web::{web, HttpResponse};
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::ReturnDocument;
use mongodb::Database;
use serde_json::json;
use validator::Validate;

use crate::config::AppConfig;
use crate::db::{self, BOOK_ORDERS, LISTINGS, PRINT_ORDERS, USERS};
use crate::errors::{ApiError, ApiResult};
use crate::handlers::{collect_all, listings_by_id, load_user, user_summaries};
use crate::models::{
    BookOrder, BookOrderResponse, ForgotPasswordRequest, Listing, ListingResponse, LoginRequest,
    PrintOrder, PrintOrderResponse, RegisterRequest, ResetPasswordRequest, UpdateProfileRequest,
    timestamps, User, UserResponse, UserSummary,
};
use crate::services::{Mailer, OtpService};
use crate::utils::{create_token, Identifier};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

fn parse_identifier(raw: &str) -> ApiResult<Identifier> {
    Identifier::parse(raw)
        .ok_or_else(|| ApiError::bad_request("Enter a valid email or 10-digit mobile number"))
}

/// Register a new account
pub async fn register(
    db: web::Data<Database>,
    req: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    req.validate()?;

    let email = req.email.trim().to_lowercase();
    let mobile_number = req.mobile_number.trim().to_string();
    let users = db.collection::<User>(USERS);

    let existing = users
        .find_one(doc! { "$or": [{ "email": &email }, { "mobile_number": &mobile_number }] })
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("User already exists"));
    }

    let password_hash = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)?;
    let mut user = User::new(req.fullname.trim().to_string(), mobile_number, email, password_hash);

    match users.insert_one(&user).await {
        Ok(result) => user.id = result.inserted_id.as_object_id(),
        // Lost a race against a concurrent registration
        Err(e) if db::is_duplicate_key(&e) => return Err(ApiError::conflict("User already exists")),
        Err(e) => return Err(e.into()),
    }

    log::info!("👤 New user registered: {}", user.email);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "User registered successfully",
        "user": UserResponse::from(user),
    })))
}

/// Login with email or mobile number
pub async fn login(
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    req: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    req.validate()?;
    let identifier = parse_identifier(&req.identifier)?;

    let user = db
        .collection::<User>(USERS)
        .find_one(identifier.user_filter())
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !bcrypt::verify(&req.password, &user.password_hash)? {
        log::warn!("Failed login for {}", user.email);
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let token = create_token(&user.id_hex(), user.role, &config.jwt)?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "token": token,
        "user": UserResponse::from(user),
    })))
}

/// Current user's profile
pub async fn me(db: web::Data<Database>, user_id: web::ReqData<String>) -> ApiResult<HttpResponse> {
    let user = load_user(&db, &user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "user": UserResponse::from(user) })))
}

fn profile_update(req: &UpdateProfileRequest) -> Document {
    let mut set = Document::new();
    let fields = [
        ("fullname", &req.fullname),
        ("birthday", &req.birthday),
        ("location", &req.location),
        ("college", &req.college),
        ("year", &req.year),
        ("branch", &req.branch),
        ("rollno", &req.rollno),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            set.insert(name, value.trim());
        }
    }
    set
}

/// Update optional profile fields
pub async fn update_me(
    db: web::Data<Database>,
    user_id: web::ReqData<String>,
    req: web::Json<UpdateProfileRequest>,
) -> ApiResult<HttpResponse> {
    req.validate()?;

    let mut set = profile_update(&req);
    if set.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }
    set.insert("updated_at", timestamps::now());

    let oid = ObjectId::parse_str(user_id.as_str()).map_err(|_| ApiError::not_found("User not found"))?;
    let user = db
        .collection::<User>(USERS)
        .find_one_and_update(doc! { "_id": oid }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Profile updated",
        "user": UserResponse::from(user),
    })))
}

/// Email a reset code. Unknown accounts get the same answer as known ones.
pub async fn forgot_password(
    db: web::Data<Database>,
    mailer: web::Data<Mailer>,
    otp: web::Data<OtpService>,
    req: web::Json<ForgotPasswordRequest>,
) -> ApiResult<HttpResponse> {
    req.validate()?;
    let identifier = parse_identifier(&req.identifier)?;

    match db.collection::<User>(USERS).find_one(identifier.user_filter()).await? {
        Some(user) => {
            if let Err(e) = otp.send_reset_otp(&mailer, &user.email).await {
                log::error!("Failed to send reset OTP to {}: {}", user.email, e);
                return Err(ApiError::Upstream(e));
            }
        }
        None => log::info!("Password reset requested for unknown identifier"),
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "If the account exists, a reset code has been sent to its email",
    })))
}

/// Set a new password using the emailed code
pub async fn reset_password(
    db: web::Data<Database>,
    otp: web::Data<OtpService>,
    req: web::Json<ResetPasswordRequest>,
) -> ApiResult<HttpResponse> {
    req.validate()?;
    let identifier = parse_identifier(&req.identifier)?;

    let users = db.collection::<User>(USERS);
    let user = users
        .find_one(identifier.user_filter())
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let valid = otp.verify_otp(&user.email, &req.otp).await.map_err(|e| {
        log::error!("OTP verification failed for {}: {}", user.email, e);
        ApiError::Upstream(e)
    })?;
    if !valid {
        return Err(ApiError::Unauthorized("Invalid or expired OTP".to_string()));
    }

    let password_hash = bcrypt::hash(&req.new_password, bcrypt::DEFAULT_COST)?;
    users
        .update_one(
            doc! { "_id": user.id },
            doc! { "$set": {
                "password_hash": password_hash,
                "updated_at": timestamps::now(),
            } },
        )
        .await?;

    log::info!("🔑 Password reset for {}", user.email);
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Password updated successfully" })))
}

/// The user's print orders, newest first
pub async fn my_print_orders(
    db: web::Data<Database>,
    user_id: web::ReqData<String>,
) -> ApiResult<HttpResponse> {
    let user = load_user(&db, &user_id).await?;
    let summary = UserSummary::from(&user);

    let cursor = db
        .collection::<PrintOrder>(PRINT_ORDERS)
        .find(doc! { "user_id": user_id.as_str() })
        .sort(doc! { "order_date": -1 })
        .await?;

    let orders: Vec<PrintOrderResponse> = collect_all(cursor)
        .await?
        .into_iter()
        .map(|order| PrintOrderResponse::new(order, Some(summary.clone())))
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": orders.len(),
        "user": summary,
        "data": orders,
    })))
}

/// Books the user has listed
pub async fn my_sold_books(
    db: web::Data<Database>,
    user_id: web::ReqData<String>,
) -> ApiResult<HttpResponse> {
    let user = load_user(&db, &user_id).await?;
    let summary = UserSummary::from(&user);

    let cursor = db
        .collection::<Listing>(LISTINGS)
        .find(doc! { "user_id": user_id.as_str() })
        .sort(doc! { "created_at": -1 })
        .await?;

    let books: Vec<ListingResponse> = collect_all(cursor)
        .await?
        .into_iter()
        .map(|listing| ListingResponse::new(listing, Some(summary.clone())))
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": books.len(),
        "user": summary,
        "data": books,
    })))
}

/// Books the user has bought
pub async fn my_book_orders(
    db: web::Data<Database>,
    user_id: web::ReqData<String>,
) -> ApiResult<HttpResponse> {
    let cursor = db
        .collection::<BookOrder>(BOOK_ORDERS)
        .find(doc! { "buyer_id": user_id.as_str() })
        .sort(doc! { "created_at": -1 })
        .await?;
    let orders = collect_all(cursor).await?;

    let books = listings_by_id(&db, orders.iter().map(|o| o.book_id.as_str())).await?;
    let sellers = user_summaries(&db, orders.iter().map(|o| o.seller_id.as_str())).await?;

    let data: Vec<BookOrderResponse> = orders
        .into_iter()
        .map(|order| {
            let book_name = books.get(&order.book_id).map(|b| b.name.clone());
            let seller = sellers.get(&order.seller_id).cloned();
            BookOrderResponse::new(order, book_name).with_parties(None, seller)
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": data.len(),
        "data": data,
    })))
}
